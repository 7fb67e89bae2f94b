use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::NaiveTime;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AdminUser;
use crate::services::schedule_service::{NewSchedule, ScheduleChanges, ScheduleService};

// Times are "HH:MM:SS".
#[derive(Debug, Deserialize, Validate)]
pub struct CreateScheduleRequest {
    pub group_id: i32,
    pub teacher_id: i32,
    #[validate(range(min = 0, max = 6))]
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(length(max = 50))]
    pub room: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateScheduleRequest {
    pub group_id: Option<i32>,
    pub teacher_id: Option<i32>,
    #[validate(range(min = 0, max = 6))]
    pub day_of_week: Option<i32>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    #[validate(length(min = 1, max = 100))]
    pub subject: Option<String>,
    #[validate(length(max = 50))]
    pub room: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleListQuery {
    pub group_id: Option<i32>,
    pub teacher_id: Option<i32>,
}

/// POST /api/admin/schedules
#[post("/schedules")]
pub async fn create_schedule(
    _admin: AdminUser,
    body: web::Json<CreateScheduleRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();

    let schedule = ScheduleService::create(
        db.get_ref(),
        NewSchedule {
            group_id: body.group_id,
            teacher_id: body.teacher_id,
            day_of_week: body.day_of_week,
            start_time: body.start_time,
            end_time: body.end_time,
            subject: body.subject,
            room: body.room,
        },
    )
    .await?;
    Ok(HttpResponse::Created().json(schedule))
}

/// GET /api/admin/schedules
#[get("/schedules")]
pub async fn list_schedules(
    _admin: AdminUser,
    query: web::Query<ScheduleListQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let schedules = ScheduleService::list(db.get_ref(), query.group_id, query.teacher_id).await?;
    Ok(HttpResponse::Ok().json(schedules))
}

/// GET /api/admin/schedules/{id}
#[get("/schedules/{id}")]
pub async fn get_schedule(
    _admin: AdminUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let schedule = ScheduleService::get(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(schedule))
}

/// PUT /api/admin/schedules/{id}
#[put("/schedules/{id}")]
pub async fn update_schedule(
    _admin: AdminUser,
    path: web::Path<i32>,
    body: web::Json<UpdateScheduleRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();

    let changes = ScheduleChanges {
        group_id: body.group_id,
        teacher_id: body.teacher_id,
        day_of_week: body.day_of_week,
        start_time: body.start_time,
        end_time: body.end_time,
        subject: body.subject,
        room: body.room,
    };
    let schedule = ScheduleService::update(db.get_ref(), path.into_inner(), changes).await?;
    Ok(HttpResponse::Ok().json(schedule))
}

/// DELETE /api/admin/schedules/{id}
#[delete("/schedules/{id}")]
pub async fn delete_schedule(
    _admin: AdminUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    ScheduleService::delete(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn schedule_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_schedule)
        .service(list_schedules)
        .service(get_schedule)
        .service(update_schedule)
        .service(delete_schedule);
}
