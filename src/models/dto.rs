// Response shapes built from several tables or carrying derived values
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{groups, payments, students};
use crate::models::payments::PaymentStatus;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub total_classes: usize,
    pub present_count: usize,
    pub absent_count: usize,
    pub late_count: usize,
    pub attendance_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GradeStats {
    pub total_grades: usize,
    pub average_grade: f64,
    pub highest_grade: f64,
    pub lowest_grade: f64,
    pub grade_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize)]
pub struct GroupOverview {
    #[serde(flatten)]
    pub group: groups::Model,
    pub current_students_count: usize,
    pub available_slots: usize,
    pub is_full: bool,
}

impl GroupOverview {
    pub fn new(group: groups::Model, current_students_count: usize) -> Self {
        let max = group.max_students.max(0) as usize;
        Self {
            available_slots: max.saturating_sub(current_students_count),
            is_full: current_students_count >= max,
            current_students_count,
            group,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StudentOverview {
    #[serde(flatten)]
    pub student: students::Model,
    pub full_name: String,
    pub average_grade: f64,
    pub attendance_percentage: f64,
}

/// Payment as returned to readers: `status` is the effective status, `stored_status` what the row holds.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub id: i32,
    pub student_id: i32,
    pub group_id: i32,
    pub amount: Decimal,
    pub currency: String,
    pub month: i32,
    pub year: i32,
    pub status: PaymentStatus,
    pub stored_status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub processed_by: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl PaymentView {
    pub fn from_model(payment: payments::Model, today: NaiveDate) -> Self {
        Self {
            status: payment.effective_status(today),
            stored_status: payment.status,
            id: payment.id,
            student_id: payment.student_id,
            group_id: payment.group_id,
            amount: payment.amount,
            currency: payment.currency,
            month: payment.month,
            year: payment.year,
            payment_date: payment.payment_date,
            due_date: payment.due_date,
            notes: payment.notes,
            processed_by: payment.processed_by,
            created_at: payment.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CurrentPaymentStatus {
    pub month: u32,
    pub year: i32,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub due_date: Option<NaiveDate>,
    pub group_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct UserStats {
    pub total_users: u64,
    pub active_users: u64,
    pub blocked_users: u64,
    pub admins_count: u64,
    pub teachers_count: u64,
    pub parents_count: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct PaymentStats {
    pub total_payments: usize,
    pub paid_payments: usize,
    pub unpaid_payments: usize,
    pub overdue_payments: usize,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub unpaid_amount: Decimal,
    pub payment_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct TeacherSummary {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize)]
pub struct ChildGroup {
    pub id: i32,
    pub name: String,
    pub subject: String,
    pub teacher: Option<TeacherSummary>,
}

#[derive(Debug, Serialize)]
pub struct ChildStatistics {
    pub total_classes: usize,
    pub present_classes: usize,
    pub attendance_percentage: f64,
    pub total_grades: usize,
    pub average_grade: f64,
}

#[derive(Debug, Serialize)]
pub struct ChildDetails {
    #[serde(flatten)]
    pub student: students::Model,
    pub full_name: String,
    pub group: Option<ChildGroup>,
    pub statistics: ChildStatistics,
}

#[derive(Debug, Serialize)]
pub struct DashboardChild {
    pub id: i32,
    pub full_name: String,
    pub group_name: String,
    pub group_subject: String,
    pub attendance_percentage: f64,
    pub average_grade: f64,
    pub total_grades: usize,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Serialize)]
pub struct ParentDashboard {
    pub children: Vec<DashboardChild>,
    pub total_children: usize,
}

#[derive(Debug, Serialize)]
pub struct BulkResult {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn group(max_students: i32) -> groups::Model {
        groups::Model {
            id: 1,
            name: "Math 1A".into(),
            subject: "Math".into(),
            teacher_id: 1,
            monthly_price: Decimal::new(150_000, 0),
            description: None,
            max_students,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_group_overview_occupancy() {
        let overview = GroupOverview::new(group(3), 2);
        assert_eq!(overview.available_slots, 1);
        assert!(!overview.is_full);

        let full = GroupOverview::new(group(3), 4);
        assert_eq!(full.available_slots, 0);
        assert!(full.is_full);
    }
}
