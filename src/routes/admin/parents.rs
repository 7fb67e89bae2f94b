use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AdminUser;
use crate::models::users::{self, Role};
use crate::models::students;
use crate::routes::Pagination;
use crate::services::student_service::{StudentFilter, StudentService};
use crate::services::user_service::{NewUser, UserService};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateParentRequest {
    pub telegram_id: i64,
    #[validate(length(max = 255))]
    pub username: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub full_name: Option<String>,
}

#[derive(Serialize)]
pub struct ParentWithChildren {
    #[serde(flatten)]
    pub user: users::Model,
    pub children: Vec<students::Model>,
}

/// POST /api/admin/parents - Register a parent before their first login
#[post("/parents")]
pub async fn create_parent(
    _admin: AdminUser,
    body: web::Json<CreateParentRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();

    let parent = UserService::create_user(
        db.get_ref(),
        NewUser {
            telegram_id: body.telegram_id,
            username: body.username,
            full_name: body.full_name,
            role: Role::Parent,
        },
    )
    .await?;
    Ok(HttpResponse::Created().json(parent))
}

/// GET /api/admin/parents - Parents with their children
#[get("/parents")]
pub async fn list_parents(
    _admin: AdminUser,
    query: web::Query<Pagination>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let (skip, limit) = query.resolve()?;
    let parents = UserService::list(db.get_ref(), Some(Role::Parent), None, skip, limit).await?;

    let mut result = Vec::with_capacity(parents.len());
    for user in parents {
        let children = StudentService::list(
            db.get_ref(),
            StudentFilter { parent_id: Some(user.id), ..Default::default() },
        )
        .await?;
        result.push(ParentWithChildren { user, children });
    }
    Ok(HttpResponse::Ok().json(result))
}

pub fn parent_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_parent).service(list_parents);
}
