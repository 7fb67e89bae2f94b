use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::Validate;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::middleware::TeacherUser;
use crate::models::attendance::AttendanceStatus;
use crate::models::dto::{BulkResult, StudentOverview};
use crate::models::students;
use crate::routes::resolve_limit;
use crate::services::attendance_service::{AttendanceService, MarkAttendance, MarkOutcome};
use crate::services::grade_service::{GradeChanges, GradeFilter, GradeService, NewGrade};
use crate::services::group_service::GroupService;
use crate::services::notification_service::NotificationService;
use crate::services::schedule_service::ScheduleService;
use crate::services::stats_service::{average_grade, StatsService};
use crate::services::student_service::{StudentFilter, StudentService};

#[derive(Debug, Deserialize, Validate)]
pub struct MarkAttendanceRequest {
    pub student_id: i32,
    pub group_id: i32,
    pub date: Option<NaiveDate>,
    pub status: String,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct BulkAttendanceEntry {
    pub student_id: i32,
    pub status: String,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkAttendanceRequest {
    pub group_id: i32,
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1), nested)]
    pub records: Vec<BulkAttendanceEntry>,
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGradeRequest {
    pub student_id: i32,
    pub group_id: i32,
    pub value: f64,
    pub max_value: Option<f64>,
    #[validate(length(min = 1, max = 50))]
    pub grade_type: String,
    #[validate(length(max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub comment: Option<String>,
    pub date_given: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGradeRequest {
    pub value: Option<f64>,
    pub max_value: Option<f64>,
    #[validate(length(min = 1, max = 50))]
    pub grade_type: Option<String>,
    #[validate(length(max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub comment: Option<String>,
    pub date_given: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct GradeListQuery {
    pub student_id: Option<i32>,
    pub grade_type: Option<String>,
    pub limit: Option<i64>,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Absence notifications for records that just turned `absent`. Never fails the request.
async fn notify_absences(db: &DatabaseConnection, notifications: &NotificationService, outcomes: &[MarkOutcome]) {
    for outcome in outcomes.iter().filter(|o| o.newly_absent) {
        if let Err(e) = notifications
            .notify_absence(db, &outcome.student, outcome.record.date)
            .await
        {
            warn!(attendance_id = outcome.record.id, error = %e, "could not queue absence notification");
        }
    }
}

/// GET /api/teacher/groups - Own active groups with occupancy
#[get("/groups")]
pub async fn my_groups(
    teacher: TeacherUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let groups = GroupService::list(db.get_ref(), Some(teacher.teacher.id), true).await?;
    Ok(HttpResponse::Ok().json(groups))
}

/// GET /api/teacher/groups/{id}/students - Roster with grade average and attendance rate
#[get("/groups/{id}/students")]
pub async fn group_students(
    teacher: TeacherUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let group = teacher.scope().group(db.get_ref(), path.into_inner()).await?;

    let roster: Vec<students::Model> = StudentService::list(
        db.get_ref(),
        StudentFilter { group_id: Some(group.id), ..Default::default() },
    )
    .await?
    .into_iter()
    .filter(|s| s.is_active)
    .collect();

    let mut result = Vec::with_capacity(roster.len());
    for student in roster {
        let (attendance, grades) = StatsService::student_records(db.get_ref(), student.id, Some(group.id)).await?;
        result.push(StudentOverview {
            full_name: student.full_name(),
            average_grade: average_grade(&grades),
            attendance_percentage: StatsService::attendance_summary(&attendance).attendance_percentage,
            student,
        });
    }
    Ok(HttpResponse::Ok().json(result))
}

/// POST /api/teacher/attendance - Mark (or re-mark) one student for one day
#[post("/attendance")]
pub async fn mark_attendance(
    teacher: TeacherUser,
    body: web::Json<MarkAttendanceRequest>,
    db: web::Data<DatabaseConnection>,
    notifications: web::Data<NotificationService>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();
    let status: AttendanceStatus = body.status.parse().map_err(AppError::Validation)?;

    let group = teacher.scope().group(db.get_ref(), body.group_id).await?;
    let outcome = AttendanceService::mark(
        db.get_ref(),
        teacher.auth.id(),
        MarkAttendance {
            student_id: body.student_id,
            group_id: group.id,
            date: body.date.unwrap_or_else(today),
            status,
            notes: body.notes,
        },
    )
    .await?;

    notify_absences(db.get_ref(), &notifications, std::slice::from_ref(&outcome)).await;

    let mut response = if outcome.created { HttpResponse::Created() } else { HttpResponse::Ok() };
    Ok(response.json(&outcome.record))
}

/// POST /api/teacher/attendance/bulk - Mark a whole group for one day in one transaction
#[post("/attendance/bulk")]
pub async fn mark_attendance_bulk(
    teacher: TeacherUser,
    body: web::Json<BulkAttendanceRequest>,
    db: web::Data<DatabaseConnection>,
    notifications: web::Data<NotificationService>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();
    let group = teacher.scope().group(db.get_ref(), body.group_id).await?;
    let date = body.date.unwrap_or_else(today);

    let total = body.records.len();
    let entries = body
        .records
        .into_iter()
        .map(|entry| {
            Ok(MarkAttendance {
                student_id: entry.student_id,
                group_id: group.id,
                date,
                status: entry.status.parse().map_err(AppError::Validation)?,
                notes: entry.notes,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let (outcomes, skipped) = AttendanceService::mark_bulk(db.get_ref(), teacher.auth.id(), entries).await?;
    notify_absences(db.get_ref(), &notifications, &outcomes).await;

    let created = outcomes.iter().filter(|o| o.created).count();
    Ok(HttpResponse::Ok().json(BulkResult {
        created,
        updated: outcomes.len() - created,
        skipped,
        total,
    }))
}

/// GET /api/teacher/attendance/group/{id}?date_from&date_to
#[get("/attendance/group/{id}")]
pub async fn group_attendance(
    teacher: TeacherUser,
    path: web::Path<i32>,
    query: web::Query<DateRangeQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let group = teacher.scope().group(db.get_ref(), path.into_inner()).await?;
    let records = AttendanceService::for_group(db.get_ref(), group.id, query.date_from, query.date_to).await?;
    Ok(HttpResponse::Ok().json(records))
}

/// POST /api/teacher/grades
#[post("/grades")]
pub async fn create_grade(
    teacher: TeacherUser,
    body: web::Json<CreateGradeRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    notifications: web::Data<NotificationService>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();
    let group = teacher.scope().group(db.get_ref(), body.group_id).await?;

    let (grade, student) = GradeService::create(
        db.get_ref(),
        teacher.auth.id(),
        config.grade_max_value,
        NewGrade {
            student_id: body.student_id,
            group_id: group.id,
            value: body.value,
            max_value: body.max_value,
            grade_type: body.grade_type,
            title: body.title,
            description: body.description,
            comment: body.comment,
            date_given: body.date_given,
        },
    )
    .await?;

    if let Err(e) = notifications.notify_grade(db.get_ref(), &student, &grade).await {
        warn!(grade_id = grade.id, error = %e, "could not queue grade notification");
    }

    Ok(HttpResponse::Created().json(grade))
}

/// GET /api/teacher/grades/group/{id}?student_id&grade_type&limit
#[get("/grades/group/{id}")]
pub async fn group_grades(
    teacher: TeacherUser,
    path: web::Path<i32>,
    query: web::Query<GradeListQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let group = teacher.scope().group(db.get_ref(), path.into_inner()).await?;
    let query = query.into_inner();

    let filter = GradeFilter {
        student_id: query.student_id,
        grade_type: query.grade_type,
        limit: resolve_limit(query.limit)?,
    };
    let grades = GradeService::for_group(db.get_ref(), group.id, filter).await?;
    Ok(HttpResponse::Ok().json(grades))
}

/// PUT /api/teacher/grades/{id}
#[put("/grades/{id}")]
pub async fn update_grade(
    teacher: TeacherUser,
    path: web::Path<i32>,
    body: web::Json<UpdateGradeRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();

    let grade = GradeService::get(db.get_ref(), path.into_inner()).await?;
    teacher.scope().group(db.get_ref(), grade.group_id).await?;

    let changes = GradeChanges {
        value: body.value,
        max_value: body.max_value,
        grade_type: body.grade_type,
        title: body.title,
        description: body.description,
        comment: body.comment,
        date_given: body.date_given,
    };
    let grade = GradeService::update(db.get_ref(), grade, config.grade_max_value, changes).await?;
    Ok(HttpResponse::Ok().json(grade))
}

/// DELETE /api/teacher/grades/{id}
#[delete("/grades/{id}")]
pub async fn delete_grade(
    teacher: TeacherUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let grade = GradeService::get(db.get_ref(), path.into_inner()).await?;
    teacher.scope().group(db.get_ref(), grade.group_id).await?;

    GradeService::delete(db.get_ref(), grade).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/teacher/schedule
#[get("/schedule")]
pub async fn my_schedule(
    teacher: TeacherUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let schedule = ScheduleService::list(db.get_ref(), None, Some(teacher.teacher.id)).await?;
    Ok(HttpResponse::Ok().json(schedule))
}

pub fn teacher_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/teacher")
            .service(my_groups)
            .service(group_students)
            .service(mark_attendance_bulk)
            .service(mark_attendance)
            .service(group_attendance)
            .service(create_grade)
            .service(group_grades)
            .service(update_grade)
            .service(delete_grade)
            .service(my_schedule)
    );
}
