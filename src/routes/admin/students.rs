use actix_web::{get, post, put, web, HttpResponse};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AdminUser;
use crate::routes::Pagination;
use crate::services::student_service::{NewStudent, StudentChanges, StudentFilter, StudentService};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub parent_id: i32,
    pub group_id: i32,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStudentRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub parent_id: Option<i32>,
    pub group_id: Option<i32>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StudentListQuery {
    pub group_id: Option<i32>,
    pub parent_id: Option<i32>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// POST /api/admin/students - Enroll a student in a group
#[post("/students")]
pub async fn create_student(
    _admin: AdminUser,
    body: web::Json<CreateStudentRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();

    let student = StudentService::create(
        db.get_ref(),
        NewStudent {
            first_name: body.first_name,
            last_name: body.last_name,
            date_of_birth: body.date_of_birth,
            parent_id: body.parent_id,
            group_id: body.group_id,
            phone: body.phone,
            address: body.address,
            notes: body.notes,
        },
    )
    .await?;
    Ok(HttpResponse::Created().json(student))
}

/// GET /api/admin/students
#[get("/students")]
pub async fn list_students(
    _admin: AdminUser,
    query: web::Query<StudentListQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let (skip, limit) = Pagination { skip: query.skip, limit: query.limit }.resolve()?;

    let students = StudentService::list(
        db.get_ref(),
        StudentFilter {
            group_id: query.group_id,
            parent_id: query.parent_id,
            skip,
            limit: Some(limit),
        },
    )
    .await?;
    Ok(HttpResponse::Ok().json(students))
}

/// GET /api/admin/students/{id}
#[get("/students/{id}")]
pub async fn get_student(
    _admin: AdminUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let student = StudentService::get(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(student))
}

/// PUT /api/admin/students/{id}
#[put("/students/{id}")]
pub async fn update_student(
    _admin: AdminUser,
    path: web::Path<i32>,
    body: web::Json<UpdateStudentRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();

    let changes = StudentChanges {
        first_name: body.first_name,
        last_name: body.last_name,
        date_of_birth: body.date_of_birth,
        parent_id: body.parent_id,
        group_id: body.group_id,
        phone: body.phone,
        address: body.address,
        notes: body.notes,
        is_active: body.is_active,
    };
    let student = StudentService::update(db.get_ref(), path.into_inner(), changes).await?;
    Ok(HttpResponse::Ok().json(student))
}

pub fn student_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_student)
        .service(list_students)
        .service(get_student)
        .service(update_student);
}
