use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::*;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::models::{grades, groups, payments, students, users};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Absence,
    Grade,
    PaymentReminder,
    Direct,
    Broadcast,
    Welcome,
}

/// One outbound Telegram message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub chat_id: i64,
    pub text: String,
    pub kind: NotificationKind,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Telegram bot token is not configured")]
    NotConfigured,
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),
    #[error("Telegram API error: {0}")]
    Api(String),
}

/// Delivery backend drained by the notification worker.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Handle used by request handlers. Enqueuing never waits on delivery.
#[derive(Clone)]
pub struct NotificationService {
    sender: mpsc::UnboundedSender<Notification>,
}

impl NotificationService {
    /// A service and the receiving end of its queue, not yet attached to a worker.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Starts the background worker on the current tokio runtime.
    pub fn start(notifier: Arc<dyn Notifier>) -> Self {
        let (service, receiver) = Self::channel();
        tokio::spawn(run_worker(receiver, notifier));
        service
    }

    pub fn enqueue(&self, notification: Notification) {
        let kind = notification.kind;
        if self.sender.send(notification).is_err() {
            warn!(?kind, "notification queue is closed, message dropped");
        }
    }

    /// Queues `text` for a user if they can still be reached.
    pub fn notify_user(&self, user: &users::Model, text: String, kind: NotificationKind) -> bool {
        if !user.can_access() {
            debug!(user_id = user.id, ?kind, "skipping notification to inactive or blocked user");
            return false;
        }
        self.enqueue(Notification { chat_id: user.telegram_id, text, kind });
        true
    }

    /// Greets a user registered on their first Mini App login.
    pub fn notify_welcome(&self, user: &users::Model) -> bool {
        let text = welcome_message(user.full_name.as_deref());
        self.notify_user(user, text, NotificationKind::Welcome)
    }

    pub async fn notify_absence(
        &self,
        db: &DatabaseConnection,
        student: &students::Model,
        date: NaiveDate,
    ) -> Result<bool, DbErr> {
        let Some(parent) = parent_of(db, student).await? else {
            return Ok(false);
        };
        let group = groups::Entity::find_by_id(student.group_id).one(db).await?;
        let text = absence_message(&student.full_name(), group.as_ref(), date);
        Ok(self.notify_user(&parent, text, NotificationKind::Absence))
    }

    pub async fn notify_grade(
        &self,
        db: &DatabaseConnection,
        student: &students::Model,
        grade: &grades::Model,
    ) -> Result<bool, DbErr> {
        let Some(parent) = parent_of(db, student).await? else {
            return Ok(false);
        };
        let group = groups::Entity::find_by_id(grade.group_id).one(db).await?;
        let text = grade_message(&student.full_name(), group.as_ref(), grade);
        Ok(self.notify_user(&parent, text, NotificationKind::Grade))
    }

    pub async fn notify_payment_reminder(
        &self,
        db: &DatabaseConnection,
        student: &students::Model,
        overdue: &[payments::Model],
    ) -> Result<bool, DbErr> {
        if overdue.is_empty() {
            return Ok(false);
        }
        let Some(parent) = parent_of(db, student).await? else {
            return Ok(false);
        };
        let text = payment_reminder_message(&student.full_name(), overdue);
        Ok(self.notify_user(&parent, text, NotificationKind::PaymentReminder))
    }
}

async fn parent_of(db: &DatabaseConnection, student: &students::Model) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find_by_id(student.parent_id).one(db).await
}

pub async fn run_worker(mut receiver: mpsc::UnboundedReceiver<Notification>, notifier: Arc<dyn Notifier>) {
    info!("notification worker started");
    while let Some(notification) = receiver.recv().await {
        match notifier.send(&notification).await {
            Ok(()) => info!(chat_id = notification.chat_id, kind = ?notification.kind, "notification delivered"),
            Err(e) => warn!(
                chat_id = notification.chat_id,
                kind = ?notification.kind,
                error = %e,
                "notification delivery failed"
            ),
        }
    }
    info!("notification worker stopped");
}

/// Escapes text interpolated into an HTML-mode message.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn group_label(group: Option<&groups::Model>) -> String {
    group
        .map(|g| format!("{} ({})", escape_html(&g.name), escape_html(&g.subject)))
        .unwrap_or_else(|| "-".to_string())
}

pub fn absence_message(student_name: &str, group: Option<&groups::Model>, date: NaiveDate) -> String {
    format!(
        "⚠️ <b>Absence</b>\n\n{} was marked absent on {}.\nGroup: {}",
        escape_html(student_name),
        date.format("%d.%m.%Y"),
        group_label(group)
    )
}

pub fn grade_message(student_name: &str, group: Option<&groups::Model>, grade: &grades::Model) -> String {
    let mut text = format!(
        "📝 <b>New grade</b>\n\n{} received {}/{} ({}) for {}.\nGroup: {}",
        escape_html(student_name),
        grade.value,
        grade.max_value,
        grade.letter(),
        escape_html(grade.title.as_deref().unwrap_or(&grade.grade_type)),
        group_label(group)
    );
    if let Some(comment) = grade.comment.as_deref().filter(|c| !c.trim().is_empty()) {
        text.push_str(&format!("\nComment: {}", escape_html(comment)));
    }
    text
}

pub fn payment_reminder_message(student_name: &str, overdue: &[payments::Model]) -> String {
    let mut text = format!(
        "💳 <b>Payment reminder</b>\n\n{} has {} overdue payment(s):",
        escape_html(student_name),
        overdue.len()
    );
    for payment in overdue {
        text.push_str(&format!(
            "\n• {:02}.{}: {} {}",
            payment.month, payment.year, payment.amount, escape_html(&payment.currency)
        ));
    }
    text
}

pub fn welcome_message(name: Option<&str>) -> String {
    let greeting = name
        .filter(|n| !n.trim().is_empty())
        .map(|n| format!(", {}", escape_html(n)))
        .unwrap_or_default();
    format!(
        "👋 <b>Welcome{}!</b>\n\n\
         Here you can follow your children's progress and payments.\n\n\
         Open the Mini App for full access.",
        greeting
    )
}

pub fn admin_message(message: &str) -> String {
    format!("📢 <b>Message from the administration</b>\n\n{}", escape_html(message))
}
