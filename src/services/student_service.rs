use chrono::{NaiveDate, Utc};
use sea_orm::*;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::users::Role;
use crate::models::{groups, students, users};
use crate::services::group_service::GroupService;

pub struct StudentService;

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub parent_id: i32,
    pub group_id: i32,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StudentChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub parent_id: Option<i32>,
    pub group_id: Option<i32>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub group_id: Option<i32>,
    pub parent_id: Option<i32>,
    pub skip: u64,
    /// `None` lists every matching student.
    pub limit: Option<u64>,
}

async fn ensure_parent(db: &DatabaseConnection, parent_id: i32) -> AppResult<users::Model> {
    let parent = users::Entity::find_by_id(parent_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Parent"))?;
    if parent.role != Role::Parent {
        return Err(AppError::validation(format!("User {} is not a parent", parent_id)));
    }
    Ok(parent)
}

/// The group must exist, be active and have a free seat.
async fn ensure_open_group(db: &DatabaseConnection, group_id: i32) -> AppResult<groups::Model> {
    let group = GroupService::get(db, group_id).await?;
    if !group.is_active {
        return Err(AppError::validation(format!("Group {} is not active", group_id)));
    }
    let enrolled = GroupService::student_count(db, group.id).await?;
    if enrolled >= group.max_students.max(0) as usize {
        return Err(AppError::conflict(format!("Group {} is full", group_id)));
    }
    Ok(group)
}

impl StudentService {
    pub async fn create(db: &DatabaseConnection, input: NewStudent) -> AppResult<students::Model> {
        ensure_parent(db, input.parent_id).await?;
        ensure_open_group(db, input.group_id).await?;

        let student = students::ActiveModel {
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            date_of_birth: Set(input.date_of_birth),
            parent_id: Set(input.parent_id),
            group_id: Set(input.group_id),
            phone: Set(input.phone),
            address: Set(input.address),
            notes: Set(input.notes),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(student_id = student.id, group_id = student.group_id, parent_id = student.parent_id, "student enrolled");
        Ok(student)
    }

    pub async fn get(db: &DatabaseConnection, student_id: i32) -> AppResult<students::Model> {
        students::Entity::find_by_id(student_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Student"))
    }

    pub async fn update(db: &DatabaseConnection, student_id: i32, changes: StudentChanges) -> AppResult<students::Model> {
        let student = Self::get(db, student_id).await?;
        let current_group = student.group_id;
        let mut active: students::ActiveModel = student.into();

        if let Some(first_name) = changes.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(last_name);
        }
        if changes.date_of_birth.is_some() {
            active.date_of_birth = Set(changes.date_of_birth);
        }
        if let Some(parent_id) = changes.parent_id {
            ensure_parent(db, parent_id).await?;
            active.parent_id = Set(parent_id);
        }
        if let Some(group_id) = changes.group_id.filter(|id| *id != current_group) {
            ensure_open_group(db, group_id).await?;
            active.group_id = Set(group_id);
        }
        if changes.phone.is_some() {
            active.phone = Set(changes.phone);
        }
        if changes.address.is_some() {
            active.address = Set(changes.address);
        }
        if changes.notes.is_some() {
            active.notes = Set(changes.notes);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(db).await?)
    }

    pub async fn list(db: &DatabaseConnection, filter: StudentFilter) -> Result<Vec<students::Model>, DbErr> {
        let mut query = students::Entity::find();
        if let Some(group_id) = filter.group_id {
            query = query.filter(students::Column::GroupId.eq(group_id));
        }
        if let Some(parent_id) = filter.parent_id {
            query = query.filter(students::Column::ParentId.eq(parent_id));
        }
        let query = query
            .order_by_asc(students::Column::LastName)
            .order_by_asc(students::Column::FirstName);
        // Without a limit the listing is complete and `skip` does not apply:
        // SQLite rejects an OFFSET that has no LIMIT.
        match filter.limit {
            Some(limit) => query.offset(filter.skip).limit(limit).all(db).await,
            None => query.all(db).await,
        }
    }
}
