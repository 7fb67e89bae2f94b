use std::collections::BTreeMap;

use sea_orm::*;

use crate::models::attendance::{self, AttendanceStatus};
use crate::models::dto::{AttendanceSummary, GradeStats};
use crate::models::grades;

pub struct StatsService;

impl StatsService {
    pub fn attendance_summary(records: &[attendance::Model]) -> AttendanceSummary {
        let count = |status: AttendanceStatus| records.iter().filter(|r| r.status == status).count();

        let total_classes = records.len();
        let present_count = count(AttendanceStatus::Present);
        let attendance_percentage = if total_classes == 0 {
            0.0
        } else {
            round_to(present_count as f64 / total_classes as f64 * 100.0, 1)
        };

        AttendanceSummary {
            total_classes,
            present_count,
            absent_count: count(AttendanceStatus::Absent),
            late_count: count(AttendanceStatus::Late),
            attendance_percentage,
        }
    }

    pub fn grade_stats(records: &[grades::Model]) -> GradeStats {
        if records.is_empty() {
            return GradeStats::default();
        }

        let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
        for grade in records {
            *distribution.entry(grade.letter().to_string()).or_default() += 1;
        }

        GradeStats {
            total_grades: records.len(),
            average_grade: average_grade(records),
            highest_grade: records.iter().map(|g| g.value).fold(f64::MIN, f64::max),
            lowest_grade: records.iter().map(|g| g.value).fold(f64::MAX, f64::min),
            grade_distribution: distribution,
        }
    }

    /// Attendance and grades of one student, optionally limited to one group.
    pub async fn student_records(
        db: &DatabaseConnection,
        student_id: i32,
        group_id: Option<i32>,
    ) -> Result<(Vec<attendance::Model>, Vec<grades::Model>), DbErr> {
        let mut attendance_query = attendance::Entity::find().filter(attendance::Column::StudentId.eq(student_id));
        let mut grades_query = grades::Entity::find().filter(grades::Column::StudentId.eq(student_id));
        if let Some(group_id) = group_id {
            attendance_query = attendance_query.filter(attendance::Column::GroupId.eq(group_id));
            grades_query = grades_query.filter(grades::Column::GroupId.eq(group_id));
        }

        Ok((attendance_query.all(db).await?, grades_query.all(db).await?))
    }
}

/// Mean grade value rounded to two decimals, 0 when there are no grades.
pub fn average_grade(records: &[grades::Model]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let sum: f64 = records.iter().map(|g| g.value).sum();
    round_to(sum / records.len() as f64, 2)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn mark(status: AttendanceStatus) -> attendance::Model {
        attendance::Model {
            id: 0,
            student_id: 1,
            group_id: 1,
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            status,
            notes: None,
            marked_by: 1,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn grade(value: f64, max_value: f64) -> grades::Model {
        grades::Model {
            id: 0,
            student_id: 1,
            group_id: 1,
            value,
            max_value,
            grade_type: "homework".into(),
            title: None,
            description: None,
            comment: None,
            date_given: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            given_by: 1,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_attendance_summary() {
        let records = vec![
            mark(AttendanceStatus::Present),
            mark(AttendanceStatus::Present),
            mark(AttendanceStatus::Absent),
        ];
        let summary = StatsService::attendance_summary(&records);

        assert_eq!(summary.total_classes, 3);
        assert_eq!(summary.present_count, 2);
        assert_eq!(summary.absent_count, 1);
        assert_eq!(summary.late_count, 0);
        assert_eq!(summary.attendance_percentage, 66.7);
    }

    #[test]
    fn test_empty_attendance_is_zero_percent() {
        assert_eq!(StatsService::attendance_summary(&[]).attendance_percentage, 0.0);
    }

    #[test]
    fn test_grade_stats() {
        let records = vec![grade(5.0, 5.0), grade(4.0, 5.0), grade(2.0, 5.0)];
        let stats = StatsService::grade_stats(&records);

        assert_eq!(stats.total_grades, 3);
        assert_eq!(stats.average_grade, 3.67);
        assert_eq!(stats.highest_grade, 5.0);
        assert_eq!(stats.lowest_grade, 2.0);
        assert_eq!(stats.grade_distribution.get("A"), Some(&1));
        assert_eq!(stats.grade_distribution.get("B"), Some(&1));
        assert_eq!(stats.grade_distribution.get("F"), Some(&1));
    }

    #[test]
    fn test_average_rounds_to_two_decimals() {
        let records = vec![grade(4.0, 5.0), grade(4.0, 5.0), grade(5.0, 5.0)];
        assert_eq!(average_grade(&records), 4.33);
    }
}
