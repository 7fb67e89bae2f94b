use actix_web::{post, web, HttpResponse};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AdminUser;
use crate::models::users::{self, Role};
use crate::routes::parse_optional;
use crate::services::notification_service::{admin_message, NotificationKind, NotificationService};
use crate::services::user_service::UserService;

#[derive(Debug, Deserialize, Validate)]
pub struct SendNotificationRequest {
    #[validate(length(min = 1, max = 500))]
    pub user_ids: Vec<i32>,
    #[validate(length(min = 1, max = 4000))]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BroadcastRequest {
    #[validate(length(min = 1, max = 4000))]
    pub message: String,
    pub role: Option<String>,
}

/// POST /api/admin/notifications/send - Message selected users
#[post("/notifications/send")]
pub async fn send_notification(
    _admin: AdminUser,
    body: web::Json<SendNotificationRequest>,
    db: web::Data<DatabaseConnection>,
    notifications: web::Data<NotificationService>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();

    let recipients = users::Entity::find()
        .filter(users::Column::Id.is_in(body.user_ids.clone()))
        .all(db.get_ref())
        .await?;

    let text = admin_message(&body.message);
    let sent = recipients
        .iter()
        .filter(|user| notifications.notify_user(user, text.clone(), NotificationKind::Direct))
        .count();

    info!(requested = body.user_ids.len(), sent, "direct notification queued");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "requested": body.user_ids.len(),
        "sent": sent,
        "skipped": body.user_ids.len() - sent
    })))
}

/// POST /api/admin/notifications/broadcast - Message every active, unblocked user (optionally one role)
#[post("/notifications/broadcast")]
pub async fn broadcast(
    _admin: AdminUser,
    body: web::Json<BroadcastRequest>,
    db: web::Data<DatabaseConnection>,
    notifications: web::Data<NotificationService>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();
    let role = parse_optional::<Role>(body.role.as_deref())?;

    let recipients = UserService::reachable(db.get_ref(), role).await?;
    let text = admin_message(&body.message);
    let sent = recipients
        .iter()
        .filter(|user| notifications.notify_user(user, text.clone(), NotificationKind::Broadcast))
        .count();

    info!(role = role.map(|r| r.as_str()), sent, "broadcast queued");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "recipients": recipients.len(),
        "sent": sent
    })))
}

pub fn notification_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(send_notification).service(broadcast);
}
