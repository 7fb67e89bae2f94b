use chrono::{NaiveTime, Utc};
use sea_orm::*;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{groups, schedules, teachers};

pub struct ScheduleService;

#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub group_id: i32,
    pub teacher_id: i32,
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject: String,
    pub room: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleChanges {
    pub group_id: Option<i32>,
    pub teacher_id: Option<i32>,
    pub day_of_week: Option<i32>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub subject: Option<String>,
    pub room: Option<String>,
}

pub fn validate_slot(day_of_week: i32, start_time: NaiveTime, end_time: NaiveTime) -> AppResult<()> {
    if !(0..=6).contains(&day_of_week) {
        return Err(AppError::validation("day_of_week must be between 0 (Sunday) and 6 (Saturday)"));
    }
    if start_time >= end_time {
        return Err(AppError::validation("start_time must be before end_time"));
    }
    Ok(())
}

async fn ensure_refs(db: &DatabaseConnection, group_id: i32, teacher_id: i32) -> AppResult<()> {
    if groups::Entity::find_by_id(group_id).one(db).await?.is_none() {
        return Err(AppError::not_found("Group"));
    }
    if teachers::Entity::find_by_id(teacher_id).one(db).await?.is_none() {
        return Err(AppError::not_found("Teacher"));
    }
    Ok(())
}

impl ScheduleService {
    pub async fn create(db: &DatabaseConnection, input: NewSchedule) -> AppResult<schedules::Model> {
        validate_slot(input.day_of_week, input.start_time, input.end_time)?;
        ensure_refs(db, input.group_id, input.teacher_id).await?;

        let schedule = schedules::ActiveModel {
            group_id: Set(input.group_id),
            teacher_id: Set(input.teacher_id),
            day_of_week: Set(input.day_of_week),
            start_time: Set(input.start_time),
            end_time: Set(input.end_time),
            subject: Set(input.subject),
            room: Set(input.room),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(schedule_id = schedule.id, group_id = schedule.group_id, "schedule entry created");
        Ok(schedule)
    }

    pub async fn get(db: &DatabaseConnection, schedule_id: i32) -> AppResult<schedules::Model> {
        schedules::Entity::find_by_id(schedule_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Schedule"))
    }

    pub async fn update(
        db: &DatabaseConnection,
        schedule_id: i32,
        changes: ScheduleChanges,
    ) -> AppResult<schedules::Model> {
        let schedule = Self::get(db, schedule_id).await?;

        let group_id = changes.group_id.unwrap_or(schedule.group_id);
        let teacher_id = changes.teacher_id.unwrap_or(schedule.teacher_id);
        let day_of_week = changes.day_of_week.unwrap_or(schedule.day_of_week);
        let start_time = changes.start_time.unwrap_or(schedule.start_time);
        let end_time = changes.end_time.unwrap_or(schedule.end_time);
        validate_slot(day_of_week, start_time, end_time)?;
        ensure_refs(db, group_id, teacher_id).await?;

        let mut active: schedules::ActiveModel = schedule.into();
        active.group_id = Set(group_id);
        active.teacher_id = Set(teacher_id);
        active.day_of_week = Set(day_of_week);
        active.start_time = Set(start_time);
        active.end_time = Set(end_time);
        if let Some(subject) = changes.subject {
            active.subject = Set(subject);
        }
        if changes.room.is_some() {
            active.room = Set(changes.room);
        }
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(db).await?)
    }

    pub async fn delete(db: &DatabaseConnection, schedule_id: i32) -> AppResult<()> {
        let result = schedules::Entity::delete_by_id(schedule_id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found("Schedule"));
        }
        info!(schedule_id, "schedule entry deleted");
        Ok(())
    }

    pub async fn list(
        db: &DatabaseConnection,
        group_id: Option<i32>,
        teacher_id: Option<i32>,
    ) -> Result<Vec<schedules::Model>, DbErr> {
        let mut query = schedules::Entity::find();
        if let Some(group_id) = group_id {
            query = query.filter(schedules::Column::GroupId.eq(group_id));
        }
        if let Some(teacher_id) = teacher_id {
            query = query.filter(schedules::Column::TeacherId.eq(teacher_id));
        }
        query
            .order_by_asc(schedules::Column::DayOfWeek)
            .order_by_asc(schedules::Column::StartTime)
            .all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_slot_validation() {
        assert!(validate_slot(1, at(9, 0), at(10, 30)).is_ok());
        assert!(validate_slot(7, at(9, 0), at(10, 30)).is_err());
        assert!(validate_slot(-1, at(9, 0), at(10, 30)).is_err());
        assert!(validate_slot(3, at(10, 0), at(10, 0)).is_err());
        assert!(validate_slot(3, at(11, 0), at(10, 0)).is_err());
    }
}
