use actix_web::{delete, get, post, put, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AdminUser;
use crate::models::users::Role;
use crate::routes::{parse_optional, Pagination};
use crate::services::user_service::{UserChanges, UserService};

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(max = 255))]
    pub username: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub is_blocked: Option<bool>,
}

fn refuse_self(admin: &AdminUser, user_id: i32, action: &str) -> Result<(), AppError> {
    if admin.0.id() == user_id {
        return Err(AppError::validation(format!("You cannot {} your own account", action)));
    }
    Ok(())
}

/// GET /api/admin/users - List users, filtered by role and activity
#[get("/users")]
pub async fn list_users(
    _admin: AdminUser,
    query: web::Query<UserListQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let role = parse_optional::<Role>(query.role.as_deref())?;
    let (skip, limit) = Pagination { skip: query.skip, limit: query.limit }.resolve()?;

    let users = UserService::list(db.get_ref(), role, query.is_active, skip, limit).await?;
    Ok(HttpResponse::Ok().json(users))
}

/// GET /api/admin/users/{id}
#[get("/users/{id}")]
pub async fn get_user(
    _admin: AdminUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let user = UserService::get(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// PUT /api/admin/users/{id}
#[put("/users/{id}")]
pub async fn update_user(
    admin: AdminUser,
    path: web::Path<i32>,
    body: web::Json<UpdateUserRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let user_id = path.into_inner();
    let body = body.into_inner();

    let role = parse_optional::<Role>(body.role.as_deref())?;
    if role.is_some_and(|r| r != Role::Admin) || body.is_active == Some(false) || body.is_blocked == Some(true) {
        refuse_self(&admin, user_id, "demote, deactivate or block")?;
    }

    let changes = UserChanges {
        username: body.username,
        full_name: body.full_name,
        role,
        is_active: body.is_active,
        is_blocked: body.is_blocked,
    };
    let user = UserService::update(db.get_ref(), user_id, changes).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// DELETE /api/admin/users/{id} - Deactivate (users are never hard-deleted)
#[delete("/users/{id}")]
pub async fn deactivate_user(
    admin: AdminUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    refuse_self(&admin, user_id, "deactivate")?;

    let user = UserService::deactivate(db.get_ref(), user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "User deactivated",
        "user": user
    })))
}

/// POST /api/admin/users/{id}/block
#[post("/users/{id}/block")]
pub async fn block_user(
    admin: AdminUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    refuse_self(&admin, user_id, "block")?;

    let user = UserService::set_blocked(db.get_ref(), user_id, true).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// POST /api/admin/users/{id}/unblock
#[post("/users/{id}/unblock")]
pub async fn unblock_user(
    _admin: AdminUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let user = UserService::set_blocked(db.get_ref(), path.into_inner(), false).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// GET /api/admin/stats/users
#[get("/stats/users")]
pub async fn user_stats(
    _admin: AdminUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let stats = UserService::stats(db.get_ref()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_users)
        .service(get_user)
        .service(update_user)
        .service(deactivate_user)
        .service(block_user)
        .service(unblock_user)
        .service(user_stats);
}
