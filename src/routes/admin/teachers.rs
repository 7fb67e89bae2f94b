use actix_web::{delete, get, post, put, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AdminUser;
use crate::models::users::Role;
use crate::services::teacher_service::{TeacherChanges, TeacherService};
use crate::services::user_service::{NewUser, TeacherProfile, UserService};

#[derive(Debug, Deserialize, Validate)]
pub struct TeacherProfileFields {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub specialization: Option<String>,
    #[validate(range(min = 0, max = 80))]
    pub experience_years: Option<i32>,
    pub bio: Option<String>,
}

impl From<TeacherProfileFields> for TeacherProfile {
    fn from(fields: TeacherProfileFields) -> Self {
        TeacherProfile {
            first_name: fields.first_name,
            last_name: fields.last_name,
            phone: fields.phone,
            email: fields.email,
            specialization: fields.specialization,
            experience_years: fields.experience_years.unwrap_or(0),
            bio: fields.bio,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeacherRequest {
    pub user_id: i32,
    #[validate(nested)]
    #[serde(flatten)]
    pub profile: TeacherProfileFields,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeacherWithUserRequest {
    pub telegram_id: i64,
    #[validate(length(max = 255))]
    pub username: Option<String>,
    #[validate(nested)]
    #[serde(flatten)]
    pub profile: TeacherProfileFields,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTeacherRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub specialization: Option<String>,
    #[validate(range(min = 0, max = 80))]
    pub experience_years: Option<i32>,
    pub bio: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct TeacherListQuery {
    pub active_only: Option<bool>,
}

/// POST /api/admin/teachers - Profile for an existing teacher-role user
#[post("/teachers")]
pub async fn create_teacher(
    _admin: AdminUser,
    body: web::Json<CreateTeacherRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();

    let teacher = UserService::create_teacher_profile(db.get_ref(), body.user_id, body.profile.into()).await?;
    Ok(HttpResponse::Created().json(teacher))
}

/// POST /api/admin/teachers/with-user - New teacher account and profile in one transaction
#[post("/teachers/with-user")]
pub async fn create_teacher_with_user(
    _admin: AdminUser,
    body: web::Json<CreateTeacherWithUserRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();

    let full_name = format!("{} {}", body.profile.first_name, body.profile.last_name);
    let new_user = NewUser {
        telegram_id: body.telegram_id,
        username: body.username,
        full_name: Some(full_name),
        role: Role::Teacher,
    };

    let (user, teacher) = UserService::create_teacher_with_user(db.get_ref(), new_user, body.profile.into()).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "user": user,
        "teacher": teacher
    })))
}

/// GET /api/admin/teachers
#[get("/teachers")]
pub async fn list_teachers(
    _admin: AdminUser,
    query: web::Query<TeacherListQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let teachers = TeacherService::list(db.get_ref(), query.active_only.unwrap_or(false)).await?;
    Ok(HttpResponse::Ok().json(teachers))
}

/// GET /api/admin/teachers/{id}
#[get("/teachers/{id}")]
pub async fn get_teacher(
    _admin: AdminUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let teacher = TeacherService::get(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(teacher))
}

/// PUT /api/admin/teachers/{id}
#[put("/teachers/{id}")]
pub async fn update_teacher(
    _admin: AdminUser,
    path: web::Path<i32>,
    body: web::Json<UpdateTeacherRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();

    let changes = TeacherChanges {
        first_name: body.first_name,
        last_name: body.last_name,
        phone: body.phone,
        email: body.email,
        specialization: body.specialization,
        experience_years: body.experience_years,
        bio: body.bio,
        is_active: body.is_active,
    };
    let teacher = TeacherService::update(db.get_ref(), path.into_inner(), changes).await?;
    Ok(HttpResponse::Ok().json(teacher))
}

/// DELETE /api/admin/teachers/{id} - Refused (409) while the teacher still owns groups
#[delete("/teachers/{id}")]
pub async fn delete_teacher(
    _admin: AdminUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    TeacherService::delete(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn teacher_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_teacher_with_user)
        .service(create_teacher)
        .service(list_teachers)
        .service(get_teacher)
        .service(update_teacher)
        .service(delete_teacher);
}
