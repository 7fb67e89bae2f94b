use actix_web::{get, web, HttpResponse};
use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::middleware::ParentUser;
use crate::models::dto::{
    ChildDetails, ChildGroup, ChildStatistics, DashboardChild, ParentDashboard, PaymentView,
    StudentOverview, TeacherSummary,
};
use crate::models::{groups, teachers};
use crate::routes::resolve_limit;
use crate::services::attendance_service::AttendanceService;
use crate::services::grade_service::GradeService;
use crate::services::payment_service::PaymentService;
use crate::services::stats_service::{average_grade, StatsService};

#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct GradeQuery {
    pub grade_type: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// GET /api/parent/children - Own children only
#[get("/children")]
pub async fn my_children(
    parent: ParentUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let children = parent.scope().students(db.get_ref()).await?;

    let mut result = Vec::with_capacity(children.len());
    for student in children {
        let (attendance, grades) = StatsService::student_records(db.get_ref(), student.id, None).await?;
        result.push(StudentOverview {
            full_name: student.full_name(),
            average_grade: average_grade(&grades),
            attendance_percentage: StatsService::attendance_summary(&attendance).attendance_percentage,
            student,
        });
    }
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/parent/children/{id} - Child with group, teacher and statistics
#[get("/children/{id}")]
pub async fn child_details(
    parent: ParentUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let student = parent.scope().student(db.get_ref(), path.into_inner()).await?;

    let group = match groups::Entity::find_by_id(student.group_id)
        .find_also_related(teachers::Entity)
        .one(db.get_ref())
        .await?
    {
        Some((group, teacher)) => Some(ChildGroup {
            id: group.id,
            name: group.name,
            subject: group.subject,
            teacher: teacher.map(|t| TeacherSummary { first_name: t.first_name, last_name: t.last_name }),
        }),
        None => None,
    };

    let (attendance, grades) = StatsService::student_records(db.get_ref(), student.id, None).await?;
    let summary = StatsService::attendance_summary(&attendance);

    Ok(HttpResponse::Ok().json(ChildDetails {
        full_name: student.full_name(),
        group,
        statistics: ChildStatistics {
            total_classes: summary.total_classes,
            present_classes: summary.present_count,
            attendance_percentage: summary.attendance_percentage,
            total_grades: grades.len(),
            average_grade: average_grade(&grades),
        },
        student,
    }))
}

/// GET /api/parent/children/{id}/attendance
#[get("/children/{id}/attendance")]
pub async fn child_attendance(
    parent: ParentUser,
    path: web::Path<i32>,
    query: web::Query<AttendanceQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let limit = resolve_limit(query.limit)?;
    let student = parent.scope().student(db.get_ref(), path.into_inner()).await?;

    let records =
        AttendanceService::for_student(db.get_ref(), student.id, query.date_from, query.date_to, limit).await?;
    Ok(HttpResponse::Ok().json(records))
}

/// GET /api/parent/children/{id}/attendance/stats
#[get("/children/{id}/attendance/stats")]
pub async fn child_attendance_stats(
    parent: ParentUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let student = parent.scope().student(db.get_ref(), path.into_inner()).await?;
    let (attendance, _) = StatsService::student_records(db.get_ref(), student.id, None).await?;
    Ok(HttpResponse::Ok().json(StatsService::attendance_summary(&attendance)))
}

/// GET /api/parent/children/{id}/grades
#[get("/children/{id}/grades")]
pub async fn child_grades(
    parent: ParentUser,
    path: web::Path<i32>,
    query: web::Query<GradeQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let limit = resolve_limit(query.limit)?;
    let student = parent.scope().student(db.get_ref(), path.into_inner()).await?;

    let grades = GradeService::for_student(db.get_ref(), student.id, query.grade_type, limit).await?;
    Ok(HttpResponse::Ok().json(grades))
}

/// GET /api/parent/children/{id}/grades/stats
#[get("/children/{id}/grades/stats")]
pub async fn child_grade_stats(
    parent: ParentUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let student = parent.scope().student(db.get_ref(), path.into_inner()).await?;
    let (_, grades) = StatsService::student_records(db.get_ref(), student.id, None).await?;
    Ok(HttpResponse::Ok().json(StatsService::grade_stats(&grades)))
}

/// GET /api/parent/children/{id}/payments - Effective status, so past-due payments read as overdue
#[get("/children/{id}/payments")]
pub async fn child_payments(
    parent: ParentUser,
    path: web::Path<i32>,
    query: web::Query<LimitQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let limit = resolve_limit(query.limit)?;
    let student = parent.scope().student(db.get_ref(), path.into_inner()).await?;

    let today = today();
    let payments: Vec<PaymentView> = PaymentService::for_student(db.get_ref(), student.id, limit)
        .await?
        .into_iter()
        .map(|p| PaymentView::from_model(p, today))
        .collect();
    Ok(HttpResponse::Ok().json(payments))
}

/// GET /api/parent/children/{id}/payments/current
#[get("/children/{id}/payments/current")]
pub async fn child_current_payment(
    parent: ParentUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let student = parent.scope().student(db.get_ref(), path.into_inner()).await?;
    let current = PaymentService::current_for_student(db.get_ref(), &config, &student, today()).await?;
    Ok(HttpResponse::Ok().json(current))
}

/// GET /api/parent/dashboard - One summary card per child
#[get("/dashboard")]
pub async fn dashboard(
    parent: ParentUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let children = parent.scope().students(db.get_ref()).await?;
    let today = today();

    let mut cards = Vec::with_capacity(children.len());
    for student in children {
        let group = groups::Entity::find_by_id(student.group_id).one(db.get_ref()).await?;
        let (attendance, grades) = StatsService::student_records(db.get_ref(), student.id, None).await?;
        let current = PaymentService::current_for_student(db.get_ref(), &config, &student, today).await?;

        cards.push(DashboardChild {
            id: student.id,
            full_name: student.full_name(),
            group_name: group.as_ref().map(|g| g.name.clone()).unwrap_or_default(),
            group_subject: group.map(|g| g.subject).unwrap_or_default(),
            attendance_percentage: StatsService::attendance_summary(&attendance).attendance_percentage,
            average_grade: average_grade(&grades),
            total_grades: grades.len(),
            payment_status: current.status,
        });
    }

    Ok(HttpResponse::Ok().json(ParentDashboard {
        total_children: cards.len(),
        children: cards,
    }))
}

pub fn parent_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/parent")
            .service(my_children)
            .service(child_attendance_stats)
            .service(child_attendance)
            .service(child_grade_stats)
            .service(child_grades)
            .service(child_current_payment)
            .service(child_payments)
            .service(child_details)
            .service(dashboard)
    );
}
