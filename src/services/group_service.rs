use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::*;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::dto::GroupOverview;
use crate::models::{attendance, grades, groups, payments, schedules, students, teachers};

pub struct GroupService;

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub subject: String,
    pub teacher_id: i32,
    pub monthly_price: Decimal,
    pub description: Option<String>,
    pub max_students: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct GroupChanges {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub teacher_id: Option<i32>,
    pub monthly_price: Option<Decimal>,
    pub description: Option<String>,
    pub max_students: Option<i32>,
    pub is_active: Option<bool>,
}

pub const DEFAULT_MAX_STUDENTS: i32 = 30;

fn check_price(price: Decimal) -> AppResult<()> {
    if price.is_sign_negative() {
        return Err(AppError::validation("monthly_price cannot be negative"));
    }
    Ok(())
}

async fn ensure_teacher(db: &DatabaseConnection, teacher_id: i32) -> AppResult<teachers::Model> {
    teachers::Entity::find_by_id(teacher_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Teacher"))
}

impl GroupService {
    pub async fn create(db: &DatabaseConnection, input: NewGroup) -> AppResult<groups::Model> {
        check_price(input.monthly_price)?;
        ensure_teacher(db, input.teacher_id).await?;

        let group = groups::ActiveModel {
            name: Set(input.name),
            subject: Set(input.subject),
            teacher_id: Set(input.teacher_id),
            monthly_price: Set(input.monthly_price),
            description: Set(input.description),
            max_students: Set(input.max_students.unwrap_or(DEFAULT_MAX_STUDENTS)),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(group_id = group.id, teacher_id = group.teacher_id, "group created");
        Ok(group)
    }

    pub async fn get(db: &DatabaseConnection, group_id: i32) -> AppResult<groups::Model> {
        groups::Entity::find_by_id(group_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Group"))
    }

    pub async fn update(db: &DatabaseConnection, group_id: i32, changes: GroupChanges) -> AppResult<groups::Model> {
        let group = Self::get(db, group_id).await?;
        let mut active: groups::ActiveModel = group.into();

        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(subject) = changes.subject {
            active.subject = Set(subject);
        }
        if let Some(teacher_id) = changes.teacher_id {
            ensure_teacher(db, teacher_id).await?;
            active.teacher_id = Set(teacher_id);
        }
        if let Some(price) = changes.monthly_price {
            check_price(price)?;
            active.monthly_price = Set(price);
        }
        if changes.description.is_some() {
            active.description = Set(changes.description);
        }
        if let Some(max_students) = changes.max_students {
            active.max_students = Set(max_students);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(db).await?)
    }

    /// Deletes a group nothing references any more.
    pub async fn delete(db: &DatabaseConnection, group_id: i32) -> AppResult<()> {
        let group = Self::get(db, group_id).await?;

        let dependents = [
            ("students", students::Entity::find().filter(students::Column::GroupId.eq(group.id)).count(db).await?),
            ("schedules", schedules::Entity::find().filter(schedules::Column::GroupId.eq(group.id)).count(db).await?),
            ("attendance records", attendance::Entity::find().filter(attendance::Column::GroupId.eq(group.id)).count(db).await?),
            ("grades", grades::Entity::find().filter(grades::Column::GroupId.eq(group.id)).count(db).await?),
            ("payments", payments::Entity::find().filter(payments::Column::GroupId.eq(group.id)).count(db).await?),
        ];
        if let Some((what, count)) = dependents.iter().find(|(_, count)| *count > 0) {
            return Err(AppError::conflict(format!(
                "Group still has {} {}; move or remove them first",
                count, what
            )));
        }

        groups::Entity::delete_by_id(group.id).exec(db).await?;
        info!(group_id, "group deleted");
        Ok(())
    }

    pub async fn student_count(db: &DatabaseConnection, group_id: i32) -> Result<usize, DbErr> {
        let count = students::Entity::find()
            .filter(students::Column::GroupId.eq(group_id))
            .filter(students::Column::IsActive.eq(true))
            .count(db)
            .await?;
        Ok(count as usize)
    }

    pub async fn overview(db: &DatabaseConnection, group: groups::Model) -> Result<GroupOverview, DbErr> {
        let count = Self::student_count(db, group.id).await?;
        Ok(GroupOverview::new(group, count))
    }

    /// Groups with occupancy, optionally restricted to one teacher.
    pub async fn list(
        db: &DatabaseConnection,
        teacher_id: Option<i32>,
        active_only: bool,
    ) -> Result<Vec<GroupOverview>, DbErr> {
        let mut query = groups::Entity::find();
        if let Some(teacher_id) = teacher_id {
            query = query.filter(groups::Column::TeacherId.eq(teacher_id));
        }
        if active_only {
            query = query.filter(groups::Column::IsActive.eq(true));
        }

        let mut overviews = Vec::new();
        for group in query.order_by_asc(groups::Column::Name).all(db).await? {
            overviews.push(Self::overview(db, group).await?);
        }
        Ok(overviews)
    }
}
