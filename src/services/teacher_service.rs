use chrono::Utc;
use sea_orm::*;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{groups, schedules, teachers};

pub struct TeacherService;

#[derive(Debug, Clone, Default)]
pub struct TeacherChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub specialization: Option<String>,
    pub experience_years: Option<i32>,
    pub bio: Option<String>,
    pub is_active: Option<bool>,
}

impl TeacherService {
    pub async fn get(db: &DatabaseConnection, teacher_id: i32) -> AppResult<teachers::Model> {
        teachers::Entity::find_by_id(teacher_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Teacher"))
    }

    pub async fn list(db: &DatabaseConnection, active_only: bool) -> Result<Vec<teachers::Model>, DbErr> {
        let mut query = teachers::Entity::find();
        if active_only {
            query = query.filter(teachers::Column::IsActive.eq(true));
        }
        query
            .order_by_asc(teachers::Column::LastName)
            .order_by_asc(teachers::Column::FirstName)
            .all(db)
            .await
    }

    pub async fn update(
        db: &DatabaseConnection,
        teacher_id: i32,
        changes: TeacherChanges,
    ) -> AppResult<teachers::Model> {
        let teacher = Self::get(db, teacher_id).await?;
        let mut active: teachers::ActiveModel = teacher.into();

        if let Some(first_name) = changes.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(last_name);
        }
        if changes.phone.is_some() {
            active.phone = Set(changes.phone);
        }
        if changes.email.is_some() {
            active.email = Set(changes.email);
        }
        if changes.specialization.is_some() {
            active.specialization = Set(changes.specialization);
        }
        if let Some(years) = changes.experience_years {
            active.experience_years = Set(years);
        }
        if changes.bio.is_some() {
            active.bio = Set(changes.bio);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(db).await?)
    }

    /// Removes a teacher profile. Refused while groups or schedule entries
    /// still reference it; the user account is left untouched.
    pub async fn delete(db: &DatabaseConnection, teacher_id: i32) -> AppResult<()> {
        let teacher = Self::get(db, teacher_id).await?;

        let group_count = groups::Entity::find()
            .filter(groups::Column::TeacherId.eq(teacher.id))
            .count(db)
            .await?;
        if group_count > 0 {
            return Err(AppError::conflict(format!(
                "Teacher still owns {} group(s); reassign or delete them first",
                group_count
            )));
        }

        let schedule_count = schedules::Entity::find()
            .filter(schedules::Column::TeacherId.eq(teacher.id))
            .count(db)
            .await?;
        if schedule_count > 0 {
            return Err(AppError::conflict(format!(
                "Teacher still has {} schedule entries",
                schedule_count
            )));
        }

        teachers::Entity::delete_by_id(teacher.id).exec(db).await?;
        info!(teacher_id, "teacher profile deleted");
        Ok(())
    }
}
