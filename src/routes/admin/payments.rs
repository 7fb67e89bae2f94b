use actix_web::{get, post, put, web, HttpResponse};
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::middleware::AdminUser;
use crate::models::dto::PaymentView;
use crate::models::payments::{self, PaymentStatus};
use crate::models::students;
use crate::routes::{parse_optional, Pagination};
use crate::services::notification_service::NotificationService;
use crate::services::payment_service::{NewPayment, PaymentFilter, PaymentService};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub student_id: i32,
    pub amount: Option<Decimal>,
    #[validate(length(min = 3, max = 3))]
    pub currency: Option<String>,
    #[validate(range(min = 1, max = 12))]
    pub month: i32,
    #[validate(range(min = 2000, max = 2100))]
    pub year: i32,
    pub status: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentListQuery {
    pub student_id: Option<i32>,
    pub status: Option<String>,
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PeriodRequest {
    pub month: Option<i32>,
    pub year: Option<i32>,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Queues a reminder when the payment is overdue right now. Delivery problems never fail the write.
async fn remind_if_overdue(
    db: &DatabaseConnection,
    notifications: &NotificationService,
    student: &students::Model,
    payment: &payments::Model,
) {
    if payment.effective_status(today()) != PaymentStatus::Overdue {
        return;
    }
    if let Err(e) = notifications
        .notify_payment_reminder(db, student, std::slice::from_ref(payment))
        .await
    {
        warn!(payment_id = payment.id, error = %e, "could not queue payment reminder");
    }
}

/// POST /api/admin/payments
#[post("/payments")]
pub async fn create_payment(
    admin: AdminUser,
    body: web::Json<CreatePaymentRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    notifications: web::Data<NotificationService>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();
    let status = parse_optional::<PaymentStatus>(body.status.as_deref())?;

    let input = NewPayment {
        student_id: body.student_id,
        amount: body.amount,
        currency: body.currency.map(|c| c.to_uppercase()),
        month: body.month,
        year: body.year,
        status,
        due_date: body.due_date,
        notes: body.notes,
    };
    let (payment, student) = PaymentService::create(db.get_ref(), &config, input, admin.0.id()).await?;
    remind_if_overdue(db.get_ref(), &notifications, &student, &payment).await;

    Ok(HttpResponse::Created().json(PaymentView::from_model(payment, today())))
}

/// GET /api/admin/payments - `status` filters on the effective status
#[get("/payments")]
pub async fn list_payments(
    _admin: AdminUser,
    query: web::Query<PaymentListQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let (skip, limit) = Pagination { skip: query.skip, limit: query.limit }.resolve()?;
    let filter = PaymentFilter {
        student_id: query.student_id,
        status: parse_optional::<PaymentStatus>(query.status.as_deref())?,
        month: query.month,
        year: query.year,
        skip,
        limit,
    };

    let today = today();
    let payments: Vec<PaymentView> = PaymentService::list(db.get_ref(), filter, today)
        .await?
        .into_iter()
        .map(|p| PaymentView::from_model(p, today))
        .collect();
    Ok(HttpResponse::Ok().json(payments))
}

/// PUT /api/admin/payments/{id}/status
#[put("/payments/{id}/status")]
pub async fn update_payment_status(
    admin: AdminUser,
    path: web::Path<i32>,
    body: web::Json<UpdatePaymentStatusRequest>,
    db: web::Data<DatabaseConnection>,
    notifications: web::Data<NotificationService>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let status: PaymentStatus = body.status.parse().map_err(AppError::Validation)?;

    let (payment, student) =
        PaymentService::update_status(db.get_ref(), path.into_inner(), status, body.notes, admin.0.id()).await?;
    remind_if_overdue(db.get_ref(), &notifications, &student, &payment).await;

    Ok(HttpResponse::Ok().json(PaymentView::from_model(payment, today())))
}

/// POST /api/admin/payments/generate - One unpaid payment per active student (defaults to this month)
#[post("/payments/generate")]
pub async fn generate_monthly_payments(
    admin: AdminUser,
    body: Option<web::Json<PeriodRequest>>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let period = body.map(|b| b.into_inner()).unwrap_or_default();
    let now = today();
    let month = period.month.unwrap_or(now.month() as i32);
    let year = period.year.unwrap_or(now.year());

    let result = PaymentService::generate_monthly(db.get_ref(), &config, month, year, admin.0.id()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "month": month,
        "year": year,
        "result": result
    })))
}

/// POST /api/admin/payments/reminders - One reminder per student with overdue payments
#[post("/payments/reminders")]
pub async fn send_payment_reminders(
    _admin: AdminUser,
    db: web::Data<DatabaseConnection>,
    notifications: web::Data<NotificationService>,
) -> Result<HttpResponse, AppError> {
    let overdue = PaymentService::overdue_by_student(db.get_ref(), today()).await?;

    let mut reminders_sent = 0;
    for (student, payments) in &overdue {
        if notifications.notify_payment_reminder(db.get_ref(), student, payments).await? {
            reminders_sent += 1;
        }
    }

    info!(students = overdue.len(), reminders_sent, "payment reminders queued");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "students_with_overdue": overdue.len(),
        "reminders_sent": reminders_sent
    })))
}

/// GET /api/admin/stats/payments
#[get("/stats/payments")]
pub async fn payment_stats(
    _admin: AdminUser,
    query: web::Query<PeriodRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let stats = PaymentService::stats(db.get_ref(), query.month, query.year, today()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

pub fn payment_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(generate_monthly_payments)
        .service(send_payment_reminders)
        .service(create_payment)
        .service(list_payments)
        .service(update_payment_status)
        .service(payment_stats);
}
