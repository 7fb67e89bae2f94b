// Role-scoped visibility
//
// Every read or write that touches a group or a student goes through `Scope`
// so the ownership rules live in one place:
//   admin   -> everything
//   teacher -> groups whose teacher_id is their profile, and those groups' students
//   parent  -> students whose parent_id is their user id (read-only)
// A row that exists outside the caller's scope is Forbidden; a missing row is NotFound.

use sea_orm::*;

use crate::error::{AppError, AppResult};
use crate::models::{groups, students, teachers};

#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    Admin,
    Teacher { teacher_id: i32 },
    Parent { user_id: i32 },
}

impl Scope {
    pub fn owns_group(&self, group: &groups::Model) -> bool {
        match self {
            Scope::Admin => true,
            Scope::Teacher { teacher_id } => group.teacher_id == *teacher_id,
            Scope::Parent { .. } => false,
        }
    }

    /// Loads a group the caller may act on.
    pub async fn group(&self, db: &DatabaseConnection, group_id: i32) -> AppResult<groups::Model> {
        let group = groups::Entity::find_by_id(group_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Group"))?;

        if !self.owns_group(&group) {
            return Err(AppError::forbidden("Access denied to this group"));
        }
        Ok(group)
    }

    /// Condition selecting the students visible to the caller.
    pub async fn student_condition(&self, db: &DatabaseConnection) -> AppResult<Condition> {
        let condition = match self {
            Scope::Admin => Condition::all(),
            Scope::Parent { user_id } => Condition::all().add(students::Column::ParentId.eq(*user_id)),
            Scope::Teacher { teacher_id } => {
                let group_ids: Vec<i32> = groups::Entity::find()
                    .select_only()
                    .column(groups::Column::Id)
                    .filter(groups::Column::TeacherId.eq(*teacher_id))
                    .into_tuple()
                    .all(db)
                    .await?;
                Condition::all().add(students::Column::GroupId.is_in(group_ids))
            }
        };
        Ok(condition)
    }

    pub async fn students(&self, db: &DatabaseConnection) -> AppResult<Vec<students::Model>> {
        Ok(students::Entity::find()
            .filter(self.student_condition(db).await?)
            .order_by_asc(students::Column::LastName)
            .order_by_asc(students::Column::FirstName)
            .all(db)
            .await?)
    }

    /// Loads a student the caller may read.
    pub async fn student(&self, db: &DatabaseConnection, student_id: i32) -> AppResult<students::Model> {
        let student = students::Entity::find_by_id(student_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Student"))?;

        let allowed = match self {
            Scope::Admin => true,
            Scope::Parent { user_id } => student.parent_id == *user_id,
            Scope::Teacher { teacher_id } => groups::Entity::find_by_id(student.group_id)
                .one(db)
                .await?
                .is_some_and(|g| g.teacher_id == *teacher_id),
        };

        if !allowed {
            return Err(AppError::forbidden("Access denied to this student"));
        }
        Ok(student)
    }
}

pub async fn teacher_profile(db: &DatabaseConnection, user_id: i32) -> AppResult<teachers::Model> {
    teachers::Entity::find()
        .filter(teachers::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Teacher profile"))
}

/// Loads an active student and checks it is enrolled in `group_id`.
pub async fn enrolled_student<C: ConnectionTrait>(
    db: &C,
    student_id: i32,
    group_id: i32,
) -> AppResult<students::Model> {
    let student = students::Entity::find_by_id(student_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Student"))?;

    if student.group_id != group_id {
        return Err(AppError::validation(format!(
            "Student {} is not enrolled in group {}",
            student_id, group_id
        )));
    }
    if !student.is_active {
        return Err(AppError::validation(format!("Student {} is not active", student_id)));
    }
    Ok(student)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn group(teacher_id: i32) -> groups::Model {
        groups::Model {
            id: 7,
            name: "English B1".into(),
            subject: "English".into(),
            teacher_id,
            monthly_price: Decimal::new(200_000, 0),
            description: None,
            max_students: 12,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_group_ownership() {
        assert!(Scope::Admin.owns_group(&group(3)));
        assert!(Scope::Teacher { teacher_id: 3 }.owns_group(&group(3)));
        assert!(!Scope::Teacher { teacher_id: 4 }.owns_group(&group(3)));
        assert!(!Scope::Parent { user_id: 3 }.owns_group(&group(3)));
    }
}
