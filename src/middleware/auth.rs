use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use chrono::Utc;
use futures::future::LocalBoxFuture;
use sea_orm::{DatabaseConnection, EntityTrait};
use url::form_urlencoded;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::users::{self, Role};
use crate::models::teachers;
use crate::services::access::{self, Scope};
use crate::services::notification_service::NotificationService;
use crate::services::user_service::UserService;
use crate::utils::{jwt, telegram};

pub const INIT_DATA_HEADER: &str = "X-Telegram-Init-Data";
pub const INIT_DATA_QUERY: &str = "initData";

/// Authenticated caller, usable as an extractor in protected routes.
///
/// Accepted credentials, in order: `Authorization: Bearer <jwt>`, the
/// `X-Telegram-Init-Data` header, the `initData` query parameter.
/// Blocked and deactivated users are rejected with 403.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: users::Model,
}

impl AuthUser {
    pub fn id(&self) -> i32 {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { authenticate(&req).await })
    }
}

/// Raw `initData` sent by the Mini App, header first.
pub fn init_data_from_request(req: &HttpRequest) -> Option<String> {
    if let Some(value) = req.headers().get(INIT_DATA_HEADER) {
        return value.to_str().ok().map(str::to_string).filter(|v| !v.is_empty());
    }
    form_urlencoded::parse(req.query_string().as_bytes())
        .find(|(key, _)| key == INIT_DATA_QUERY)
        .map(|(_, value)| value.into_owned())
        .filter(|v| !v.is_empty())
}

fn bearer_token(req: &HttpRequest) -> Result<Option<String>, AppError> {
    let Some(header) = req.headers().get("Authorization") else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;
    match value.strip_prefix("Bearer ") {
        Some(token) => Ok(Some(token.trim().to_string())),
        None => Err(AppError::Unauthorized(
            "Invalid Authorization format (expected: Bearer <token>)".into(),
        )),
    }
}

pub(crate) fn app_state(req: &HttpRequest) -> Result<(DatabaseConnection, web::Data<AppConfig>), AppError> {
    let db = req
        .app_data::<web::Data<DatabaseConnection>>()
        .ok_or_else(|| AppError::Internal("Database connection is not configured".into()))?;
    let config = req
        .app_data::<web::Data<AppConfig>>()
        .ok_or_else(|| AppError::Internal("Application config is not registered".into()))?;
    Ok((db.get_ref().clone(), config.clone()))
}

/// Checks a Telegram `initData` string against the configured bot token.
pub fn verify_init_data(init_data: &str, config: &AppConfig) -> Result<telegram::TelegramUser, AppError> {
    telegram::verify_init_data(
        init_data,
        &config.telegram_bot_token,
        config.init_data_max_age_secs,
        Utc::now().timestamp(),
    )
    .map_err(|e| match e {
        telegram::InitDataError::NotConfigured => AppError::Internal(e.to_string()),
        _ => AppError::Unauthorized(format!("Invalid Telegram authentication: {}", e)),
    })
}

/// Queues the welcome message for a user registered by this request.
pub fn welcome(req: &HttpRequest, user: &users::Model) {
    if let Some(notifications) = req.app_data::<web::Data<NotificationService>>() {
        notifications.notify_welcome(user);
    }
}

pub fn ensure_can_access(user: &users::Model) -> Result<(), AppError> {
    if user.is_blocked {
        return Err(AppError::forbidden("User is blocked"));
    }
    if !user.is_active {
        return Err(AppError::forbidden("User is deactivated"));
    }
    Ok(())
}

async fn authenticate(req: &HttpRequest) -> Result<AuthUser, AppError> {
    let (db, config) = app_state(req)?;

    let user = if let Some(token) = bearer_token(req)? {
        let claims = jwt::verify_token(&token, &config.jwt_secret)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;
        users::Entity::find_by_id(claims.sub)
            .one(&db)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))?
    } else if let Some(init_data) = init_data_from_request(req) {
        let tg_user = verify_init_data(&init_data, &config)?;
        let (user, created) = UserService::find_or_create_from_telegram(&db, &tg_user).await?;
        if created {
            welcome(req, &user);
        }
        user
    } else {
        return Err(AppError::Unauthorized("Telegram authentication required".into()));
    };

    ensure_can_access(&user)?;
    Ok(AuthUser { user })
}

fn require_role(auth: &AuthUser, role: Role) -> Result<(), AppError> {
    if auth.role() != role {
        return Err(AppError::forbidden(format!("{} access required", capitalize(role.as_str()))));
    }
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub struct AdminUser(pub AuthUser);

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let auth = AuthUser::from_request(req, payload);
        Box::pin(async move {
            let auth = auth.await?;
            require_role(&auth, Role::Admin)?;
            Ok(AdminUser(auth))
        })
    }
}

/// Teacher caller together with their profile.
pub struct TeacherUser {
    pub auth: AuthUser,
    pub teacher: teachers::Model,
}

impl TeacherUser {
    pub fn scope(&self) -> Scope {
        Scope::Teacher { teacher_id: self.teacher.id }
    }
}

impl FromRequest for TeacherUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let auth = AuthUser::from_request(req, payload);
        let req = req.clone();
        Box::pin(async move {
            let auth = auth.await?;
            require_role(&auth, Role::Teacher)?;
            let (db, _) = app_state(&req)?;
            let teacher = access::teacher_profile(&db, auth.id()).await?;
            Ok(TeacherUser { auth, teacher })
        })
    }
}

pub struct ParentUser(pub AuthUser);

impl ParentUser {
    pub fn scope(&self) -> Scope {
        Scope::Parent { user_id: self.0.id() }
    }
}

impl FromRequest for ParentUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let auth = AuthUser::from_request(req, payload);
        Box::pin(async move {
            let auth = auth.await?;
            require_role(&auth, Role::Parent)?;
            Ok(ParentUser(auth))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_init_data_header_wins_over_query() {
        let req = TestRequest::default()
            .uri("/api/auth/me?initData=from_query")
            .insert_header((INIT_DATA_HEADER, "from_header"))
            .to_http_request();
        assert_eq!(init_data_from_request(&req).as_deref(), Some("from_header"));
    }

    #[test]
    fn test_init_data_query_is_decoded() {
        let req = TestRequest::default()
            .uri("/api/auth/me?initData=auth_date%3D1%26hash%3Dab")
            .to_http_request();
        assert_eq!(init_data_from_request(&req).as_deref(), Some("auth_date=1&hash=ab"));
    }

    #[test]
    fn test_bearer_format() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Token abc"))
            .to_http_request();
        assert!(matches!(bearer_token(&req), Err(AppError::Unauthorized(_))));

        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc"))
            .to_http_request();
        assert_eq!(bearer_token(&req).unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_capitalize_role() {
        assert_eq!(capitalize("admin"), "Admin");
    }
}
