use actix_web::{delete, get, post, put, web, HttpResponse};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AdminUser;
use crate::services::group_service::{GroupChanges, GroupService, NewGroup};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    pub teacher_id: i32,
    pub monthly_price: Decimal,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 100))]
    pub max_students: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGroupRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub subject: Option<String>,
    pub teacher_id: Option<i32>,
    pub monthly_price: Option<Decimal>,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 100))]
    pub max_students: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct GroupListQuery {
    pub teacher_id: Option<i32>,
    pub active_only: Option<bool>,
}

/// POST /api/admin/groups
#[post("/groups")]
pub async fn create_group(
    _admin: AdminUser,
    body: web::Json<CreateGroupRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();

    let group = GroupService::create(
        db.get_ref(),
        NewGroup {
            name: body.name,
            subject: body.subject,
            teacher_id: body.teacher_id,
            monthly_price: body.monthly_price,
            description: body.description,
            max_students: body.max_students,
        },
    )
    .await?;
    let overview = GroupService::overview(db.get_ref(), group).await?;
    Ok(HttpResponse::Created().json(overview))
}

/// GET /api/admin/groups - Groups with occupancy
#[get("/groups")]
pub async fn list_groups(
    _admin: AdminUser,
    query: web::Query<GroupListQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let groups = GroupService::list(db.get_ref(), query.teacher_id, query.active_only.unwrap_or(false)).await?;
    Ok(HttpResponse::Ok().json(groups))
}

/// GET /api/admin/groups/{id}
#[get("/groups/{id}")]
pub async fn get_group(
    _admin: AdminUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let group = GroupService::get(db.get_ref(), path.into_inner()).await?;
    let overview = GroupService::overview(db.get_ref(), group).await?;
    Ok(HttpResponse::Ok().json(overview))
}

/// PUT /api/admin/groups/{id}
#[put("/groups/{id}")]
pub async fn update_group(
    _admin: AdminUser,
    path: web::Path<i32>,
    body: web::Json<UpdateGroupRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();

    let changes = GroupChanges {
        name: body.name,
        subject: body.subject,
        teacher_id: body.teacher_id,
        monthly_price: body.monthly_price,
        description: body.description,
        max_students: body.max_students,
        is_active: body.is_active,
    };
    let group = GroupService::update(db.get_ref(), path.into_inner(), changes).await?;
    let overview = GroupService::overview(db.get_ref(), group).await?;
    Ok(HttpResponse::Ok().json(overview))
}

/// DELETE /api/admin/groups/{id} - Refused (409) while anything references the group
#[delete("/groups/{id}")]
pub async fn delete_group(
    _admin: AdminUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    GroupService::delete(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn group_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_group)
        .service(list_groups)
        .service(get_group)
        .service(update_group)
        .service(delete_group);
}
