use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::*;
use tracing::info;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::models::dto::{BulkResult, CurrentPaymentStatus, PaymentStats};
use crate::models::payments::{self, PaymentStatus};
use crate::models::{groups, students};
use crate::services::stats_service::round_to;

pub struct PaymentService;

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub student_id: i32,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub month: i32,
    pub year: i32,
    pub status: Option<PaymentStatus>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub student_id: Option<i32>,
    /// Matched against the effective status.
    pub status: Option<PaymentStatus>,
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub skip: u64,
    pub limit: u64,
}

pub fn validate_period(month: i32, year: i32) -> AppResult<()> {
    if !(1..=12).contains(&month) {
        return Err(AppError::validation("month must be between 1 and 12"));
    }
    if !(2000..=2100).contains(&year) {
        return Err(AppError::validation("year must be between 2000 and 2100"));
    }
    Ok(())
}

/// Day `due_day` of the billing month.
pub fn default_due_date(month: i32, year: i32, due_day: u32) -> Option<NaiveDate> {
    let month = u32::try_from(month).ok()?;
    NaiveDate::from_ymd_opt(year, month, due_day)
}

impl PaymentService {
    /// Creates the payment of one student for one month. The group and the
    /// default amount come from the student's current group.
    pub async fn create(
        db: &DatabaseConnection,
        config: &AppConfig,
        input: NewPayment,
        processed_by: i32,
    ) -> AppResult<(payments::Model, students::Model)> {
        validate_period(input.month, input.year)?;
        if input.amount.is_some_and(|a| a.is_sign_negative()) {
            return Err(AppError::validation("amount cannot be negative"));
        }

        let student = students::Entity::find_by_id(input.student_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Student"))?;
        let group = groups::Entity::find_by_id(student.group_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Group"))?;

        if Self::find_for_month(db, student.id, input.month, input.year).await?.is_some() {
            return Err(AppError::conflict(format!(
                "Payment for {:02}.{} already exists for this student",
                input.month, input.year
            )));
        }

        let status = input.status.unwrap_or(PaymentStatus::Unpaid);
        let now = Utc::now();
        let payment = payments::ActiveModel {
            student_id: Set(student.id),
            group_id: Set(group.id),
            amount: Set(input.amount.unwrap_or(group.monthly_price)),
            currency: Set(input.currency.unwrap_or_else(|| config.currency.clone())),
            month: Set(input.month),
            year: Set(input.year),
            status: Set(status),
            payment_date: Set((status == PaymentStatus::Paid).then_some(now)),
            due_date: Set(input
                .due_date
                .or_else(|| default_due_date(input.month, input.year, config.payment_due_day))),
            notes: Set(input.notes),
            processed_by: Set(Some(processed_by)),
            created_at: Set(now),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(payment_id = payment.id, student_id = student.id, month = payment.month, year = payment.year, "payment created");
        Ok((payment, student))
    }

    pub async fn find_for_month(
        db: &DatabaseConnection,
        student_id: i32,
        month: i32,
        year: i32,
    ) -> Result<Option<payments::Model>, DbErr> {
        payments::Entity::find()
            .filter(payments::Column::StudentId.eq(student_id))
            .filter(payments::Column::Month.eq(month))
            .filter(payments::Column::Year.eq(year))
            .one(db)
            .await
    }

    /// Sets the stored status. Marking `paid` stamps the payment date.
    pub async fn update_status(
        db: &DatabaseConnection,
        payment_id: i32,
        status: PaymentStatus,
        notes: Option<String>,
        processed_by: i32,
    ) -> AppResult<(payments::Model, students::Model)> {
        let payment = payments::Entity::find_by_id(payment_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Payment"))?;
        let student = students::Entity::find_by_id(payment.student_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Student"))?;

        let now = Utc::now();
        let mut active: payments::ActiveModel = payment.into();
        active.status = Set(status);
        active.payment_date = Set((status == PaymentStatus::Paid).then_some(now));
        if notes.is_some() {
            active.notes = Set(notes);
        }
        active.processed_by = Set(Some(processed_by));
        active.updated_at = Set(Some(now));
        let payment = active.update(db).await?;

        info!(payment_id, status = ?status, processed_by, "payment status updated");
        Ok((payment, student))
    }

    pub async fn list(
        db: &DatabaseConnection,
        filter: PaymentFilter,
        today: NaiveDate,
    ) -> Result<Vec<payments::Model>, DbErr> {
        let mut query = payments::Entity::find();
        if let Some(student_id) = filter.student_id {
            query = query.filter(payments::Column::StudentId.eq(student_id));
        }
        if let Some(month) = filter.month {
            query = query.filter(payments::Column::Month.eq(month));
        }
        if let Some(year) = filter.year {
            query = query.filter(payments::Column::Year.eq(year));
        }
        let query = query
            .order_by_desc(payments::Column::Year)
            .order_by_desc(payments::Column::Month)
            .order_by_asc(payments::Column::StudentId);

        // Effective status depends on today, so that filter runs after loading.
        match filter.status {
            None => query.offset(filter.skip).limit(filter.limit).all(db).await,
            Some(status) => Ok(query
                .all(db)
                .await?
                .into_iter()
                .filter(|p| p.effective_status(today) == status)
                .skip(filter.skip as usize)
                .take(filter.limit as usize)
                .collect()),
        }
    }

    pub async fn for_student(
        db: &DatabaseConnection,
        student_id: i32,
        limit: u64,
    ) -> Result<Vec<payments::Model>, DbErr> {
        payments::Entity::find()
            .filter(payments::Column::StudentId.eq(student_id))
            .order_by_desc(payments::Column::Year)
            .order_by_desc(payments::Column::Month)
            .limit(limit)
            .all(db)
            .await
    }

    /// Creates one unpaid payment per active student for the month, at their
    /// group's price. Students that already have one are skipped.
    pub async fn generate_monthly(
        db: &DatabaseConnection,
        config: &AppConfig,
        month: i32,
        year: i32,
        processed_by: i32,
    ) -> AppResult<BulkResult> {
        validate_period(month, year)?;

        let active_students = students::Entity::find()
            .filter(students::Column::IsActive.eq(true))
            .find_also_related(groups::Entity)
            .all(db)
            .await?;

        let due_date = default_due_date(month, year, config.payment_due_day);
        let now = Utc::now();
        let mut result = BulkResult { created: 0, updated: 0, skipped: 0, total: active_students.len() };

        for (student, group) in active_students {
            let Some(group) = group else {
                result.skipped += 1;
                continue;
            };
            if Self::find_for_month(db, student.id, month, year).await?.is_some() {
                result.skipped += 1;
                continue;
            }

            payments::ActiveModel {
                student_id: Set(student.id),
                group_id: Set(group.id),
                amount: Set(group.monthly_price),
                currency: Set(config.currency.clone()),
                month: Set(month),
                year: Set(year),
                status: Set(PaymentStatus::Unpaid),
                payment_date: Set(None),
                due_date: Set(due_date),
                notes: Set(None),
                processed_by: Set(Some(processed_by)),
                created_at: Set(now),
                updated_at: Set(None),
                ..Default::default()
            }
            .insert(db)
            .await?;
            result.created += 1;
        }

        info!(month, year, created = result.created, skipped = result.skipped, "monthly payments generated");
        Ok(result)
    }

    /// Students with at least one overdue payment, with those payments.
    pub async fn overdue_by_student(
        db: &DatabaseConnection,
        today: NaiveDate,
    ) -> Result<Vec<(students::Model, Vec<payments::Model>)>, DbErr> {
        let candidates = payments::Entity::find()
            .filter(payments::Column::Status.ne(PaymentStatus::Paid))
            .order_by_asc(payments::Column::Year)
            .order_by_asc(payments::Column::Month)
            .all(db)
            .await?;

        let mut by_student: BTreeMap<i32, Vec<payments::Model>> = BTreeMap::new();
        for payment in candidates {
            if payment.effective_status(today) == PaymentStatus::Overdue {
                by_student.entry(payment.student_id).or_default().push(payment);
            }
        }

        let mut grouped = Vec::with_capacity(by_student.len());
        for (student_id, overdue) in by_student {
            if let Some(student) = students::Entity::find_by_id(student_id).one(db).await? {
                grouped.push((student, overdue));
            }
        }
        Ok(grouped)
    }

    pub async fn stats(
        db: &DatabaseConnection,
        month: Option<i32>,
        year: Option<i32>,
        today: NaiveDate,
    ) -> Result<PaymentStats, DbErr> {
        let mut query = payments::Entity::find();
        if let Some(month) = month {
            query = query.filter(payments::Column::Month.eq(month));
        }
        if let Some(year) = year {
            query = query.filter(payments::Column::Year.eq(year));
        }
        Ok(summarize(&query.all(db).await?, today))
    }

    /// Payment state of the current month, falling back to the group price
    /// when no payment has been issued yet.
    pub async fn current_for_student(
        db: &DatabaseConnection,
        config: &AppConfig,
        student: &students::Model,
        today: NaiveDate,
    ) -> AppResult<CurrentPaymentStatus> {
        let group = groups::Entity::find_by_id(student.group_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Group"))?;
        let month = today.month();
        let year = today.year();

        let current = Self::find_for_month(db, student.id, month as i32, year).await?;
        Ok(match current {
            Some(payment) => CurrentPaymentStatus {
                month,
                year,
                amount: payment.amount,
                status: payment.effective_status(today),
                payment_date: payment.payment_date,
                due_date: payment.due_date,
                group_price: group.monthly_price,
            },
            None => {
                let due_date = default_due_date(month as i32, year, config.payment_due_day);
                CurrentPaymentStatus {
                    month,
                    year,
                    amount: group.monthly_price,
                    status: PaymentStatus::Unpaid.effective(due_date, today),
                    payment_date: None,
                    due_date,
                    group_price: group.monthly_price,
                }
            }
        })
    }
}

pub fn summarize(records: &[payments::Model], today: NaiveDate) -> PaymentStats {
    let mut stats = PaymentStats { total_payments: records.len(), ..Default::default() };

    for payment in records {
        stats.total_amount += payment.amount;
        match payment.effective_status(today) {
            PaymentStatus::Paid => {
                stats.paid_payments += 1;
                stats.paid_amount += payment.amount;
            }
            PaymentStatus::Unpaid => {
                stats.unpaid_payments += 1;
                stats.unpaid_amount += payment.amount;
            }
            PaymentStatus::Overdue => {
                stats.overdue_payments += 1;
                stats.unpaid_amount += payment.amount;
            }
        }
    }

    if stats.total_payments > 0 {
        stats.payment_rate = round_to(stats.paid_payments as f64 / stats.total_payments as f64 * 100.0, 1);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn payment(status: PaymentStatus, amount: i64, due_date: Option<NaiveDate>) -> payments::Model {
        payments::Model {
            id: 0,
            student_id: 1,
            group_id: 1,
            amount: Decimal::new(amount, 0),
            currency: "UZS".into(),
            month: 3,
            year: 2025,
            status,
            payment_date: None,
            due_date,
            notes: None,
            processed_by: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_default_due_date() {
        assert_eq!(default_due_date(2, 2025, 10), Some(day(2025, 2, 10)));
        assert_eq!(default_due_date(13, 2025, 10), None);
    }

    #[test]
    fn test_period_bounds() {
        assert!(validate_period(1, 2025).is_ok());
        assert!(validate_period(0, 2025).is_err());
        assert!(validate_period(12, 1999).is_err());
    }

    #[test]
    fn test_summary_uses_effective_status() {
        let today = day(2025, 3, 20);
        let records = vec![
            payment(PaymentStatus::Paid, 100, Some(day(2025, 3, 10))),
            payment(PaymentStatus::Unpaid, 100, Some(day(2025, 3, 10))),
            payment(PaymentStatus::Unpaid, 50, Some(day(2025, 3, 25))),
        ];
        let stats = summarize(&records, today);

        assert_eq!(stats.total_payments, 3);
        assert_eq!(stats.paid_payments, 1);
        assert_eq!(stats.overdue_payments, 1);
        assert_eq!(stats.unpaid_payments, 1);
        assert_eq!(stats.total_amount, Decimal::new(250, 0));
        assert_eq!(stats.paid_amount, Decimal::new(100, 0));
        assert_eq!(stats.unpaid_amount, Decimal::new(150, 0));
        assert_eq!(stats.payment_rate, 33.3);
    }
}
