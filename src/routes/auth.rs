use actix_web::{get, post, web, HttpRequest, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::middleware::auth::{ensure_can_access, init_data_from_request, verify_init_data, welcome};
use crate::models::users;
use crate::services::user_service::UserService;
use crate::utils::jwt;
use crate::utils::telegram::TelegramUser;

/// `initData` may come in the body or, like every other route, in the
/// `X-Telegram-Init-Data` header / `initData` query parameter.
#[derive(Debug, Default, Deserialize)]
pub struct InitDataRequest {
    pub init_data: Option<String>,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub authenticated: bool,
    pub user_exists: bool,
    pub user_data: TelegramUser,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in_minutes: i64,
    pub user: users::Model,
}

fn init_data_of(req: &HttpRequest, body: Option<web::Json<InitDataRequest>>) -> Result<String, AppError> {
    body.and_then(|b| b.into_inner().init_data)
        .filter(|d| !d.is_empty())
        .or_else(|| init_data_from_request(req))
        .ok_or_else(|| AppError::Unauthorized("Telegram authentication required".into()))
}

/// GET /api/auth/me - Current user
#[get("/me")]
pub async fn me(auth_user: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(auth_user.user)
}

/// POST /api/auth/verify - Check initData without registering the user
#[post("/verify")]
pub async fn verify(
    req: HttpRequest,
    body: Option<web::Json<InitDataRequest>>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let init_data = init_data_of(&req, body)?;
    let tg_user = verify_init_data(&init_data, &config)?;

    let existing = UserService::find_by_telegram_id(db.get_ref(), tg_user.id).await?;
    if let Some(user) = &existing {
        ensure_can_access(user)?;
    }

    Ok(HttpResponse::Ok().json(VerifyResponse {
        authenticated: true,
        user_exists: existing.is_some(),
        user_data: tg_user,
    }))
}

/// POST /api/auth/login - Exchange initData for a session token
#[post("/login")]
pub async fn login(
    req: HttpRequest,
    body: Option<web::Json<InitDataRequest>>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let init_data = init_data_of(&req, body)?;
    let tg_user = verify_init_data(&init_data, &config)?;

    let (user, created) = UserService::find_or_create_from_telegram(db.get_ref(), &tg_user).await?;
    if created {
        welcome(&req, &user);
    }
    ensure_can_access(&user)?;

    let token = jwt::generate_token(
        user.id,
        user.telegram_id,
        user.role,
        &config.jwt_secret,
        config.jwt_duration_minutes,
    )
    .map_err(AppError::Internal)?;

    info!(user_id = user.id, role = user.role.as_str(), "user logged in");
    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in_minutes: config.jwt_duration_minutes,
        user,
    }))
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(me)
            .service(verify)
            .service(login)
    );
}
