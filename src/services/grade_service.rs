use chrono::{NaiveDate, Utc};
use sea_orm::*;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{grades, students};
use crate::services::access;

pub struct GradeService;

#[derive(Debug, Clone)]
pub struct NewGrade {
    pub student_id: i32,
    pub group_id: i32,
    pub value: f64,
    pub max_value: Option<f64>,
    pub grade_type: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub comment: Option<String>,
    pub date_given: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct GradeChanges {
    pub value: Option<f64>,
    pub max_value: Option<f64>,
    pub grade_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub comment: Option<String>,
    pub date_given: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct GradeFilter {
    pub student_id: Option<i32>,
    pub grade_type: Option<String>,
    pub limit: u64,
}

/// Checks a grade against its scale and the configured ceiling.
/// Returns the scale to store.
pub fn validate_grade(value: f64, max_value: Option<f64>, configured_max: f64) -> AppResult<f64> {
    let max_value = max_value.unwrap_or(configured_max);

    if !max_value.is_finite() || max_value <= 0.0 {
        return Err(AppError::validation("max_value must be greater than 0"));
    }
    if max_value > configured_max {
        return Err(AppError::validation(format!(
            "max_value cannot exceed {}",
            configured_max
        )));
    }
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::validation("Grade value cannot be negative"));
    }
    if value > max_value {
        return Err(AppError::validation(format!(
            "Grade value {} exceeds the maximum of {}",
            value, max_value
        )));
    }
    Ok(max_value)
}

impl GradeService {
    /// Stores a grade for a student enrolled in `group_id`.
    /// Group ownership is checked by the caller.
    pub async fn create(
        db: &DatabaseConnection,
        given_by: i32,
        configured_max: f64,
        input: NewGrade,
    ) -> AppResult<(grades::Model, students::Model)> {
        let max_value = validate_grade(input.value, input.max_value, configured_max)?;
        let grade_type = input.grade_type.trim().to_lowercase();
        if grade_type.is_empty() {
            return Err(AppError::validation("grade_type is required"));
        }
        let student = access::enrolled_student(db, input.student_id, input.group_id).await?;

        let grade = grades::ActiveModel {
            student_id: Set(input.student_id),
            group_id: Set(input.group_id),
            value: Set(input.value),
            max_value: Set(max_value),
            grade_type: Set(grade_type),
            title: Set(input.title),
            description: Set(input.description),
            comment: Set(input.comment),
            date_given: Set(input.date_given.unwrap_or_else(|| Utc::now().date_naive())),
            given_by: Set(given_by),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(grade_id = grade.id, student_id = grade.student_id, given_by, "grade recorded");
        Ok((grade, student))
    }

    pub async fn get(db: &DatabaseConnection, grade_id: i32) -> AppResult<grades::Model> {
        grades::Entity::find_by_id(grade_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Grade"))
    }

    pub async fn update(
        db: &DatabaseConnection,
        grade: grades::Model,
        configured_max: f64,
        changes: GradeChanges,
    ) -> AppResult<grades::Model> {
        let value = changes.value.unwrap_or(grade.value);
        let max_value = validate_grade(value, Some(changes.max_value.unwrap_or(grade.max_value)), configured_max)?;

        let mut active: grades::ActiveModel = grade.into();
        active.value = Set(value);
        active.max_value = Set(max_value);
        if let Some(grade_type) = changes.grade_type {
            let grade_type = grade_type.trim().to_lowercase();
            if grade_type.is_empty() {
                return Err(AppError::validation("grade_type is required"));
            }
            active.grade_type = Set(grade_type);
        }
        if changes.title.is_some() {
            active.title = Set(changes.title);
        }
        if changes.description.is_some() {
            active.description = Set(changes.description);
        }
        if changes.comment.is_some() {
            active.comment = Set(changes.comment);
        }
        if let Some(date_given) = changes.date_given {
            active.date_given = Set(date_given);
        }
        active.updated_at = Set(Some(Utc::now()));

        Ok(active.update(db).await?)
    }

    pub async fn delete(db: &DatabaseConnection, grade: grades::Model) -> AppResult<()> {
        let grade_id = grade.id;
        grades::Entity::delete_by_id(grade_id).exec(db).await?;
        info!(grade_id, "grade deleted");
        Ok(())
    }

    pub async fn for_group(
        db: &DatabaseConnection,
        group_id: i32,
        filter: GradeFilter,
    ) -> Result<Vec<grades::Model>, DbErr> {
        let mut query = grades::Entity::find().filter(grades::Column::GroupId.eq(group_id));
        if let Some(student_id) = filter.student_id {
            query = query.filter(grades::Column::StudentId.eq(student_id));
        }
        if let Some(grade_type) = filter.grade_type {
            query = query.filter(grades::Column::GradeType.eq(grade_type.trim().to_lowercase()));
        }
        query
            .order_by_desc(grades::Column::DateGiven)
            .order_by_desc(grades::Column::Id)
            .limit(filter.limit)
            .all(db)
            .await
    }

    pub async fn for_student(
        db: &DatabaseConnection,
        student_id: i32,
        grade_type: Option<String>,
        limit: u64,
    ) -> Result<Vec<grades::Model>, DbErr> {
        let mut query = grades::Entity::find().filter(grades::Column::StudentId.eq(student_id));
        if let Some(grade_type) = grade_type {
            query = query.filter(grades::Column::GradeType.eq(grade_type.trim().to_lowercase()));
        }
        query
            .order_by_desc(grades::Column::DateGiven)
            .order_by_desc(grades::Column::Id)
            .limit(limit)
            .all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scale_is_configured_max() {
        assert_eq!(validate_grade(4.0, None, 5.0).unwrap(), 5.0);
    }

    #[test]
    fn test_value_above_configured_max_is_rejected() {
        assert!(matches!(validate_grade(6.0, None, 5.0), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_scale_above_configured_max_is_rejected() {
        assert!(validate_grade(6.0, Some(10.0), 5.0).is_err());
    }

    #[test]
    fn test_smaller_scale_is_allowed() {
        assert_eq!(validate_grade(2.0, Some(3.0), 5.0).unwrap(), 3.0);
        assert!(validate_grade(3.5, Some(3.0), 5.0).is_err());
    }

    #[test]
    fn test_negative_and_zero_scale() {
        assert!(validate_grade(-1.0, None, 5.0).is_err());
        assert!(validate_grade(0.0, Some(0.0), 5.0).is_err());
        assert_eq!(validate_grade(0.0, None, 5.0).unwrap(), 5.0);
    }
}
