#![allow(dead_code)]

use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tokio::sync::mpsc::UnboundedReceiver;

use educenter_backend::config::AppConfig;
use educenter_backend::db;
use educenter_backend::models::users::Role;
use educenter_backend::models::{groups, students, teachers, users};
use educenter_backend::services::group_service::{GroupService, NewGroup};
use educenter_backend::services::notification_service::{Notification, NotificationService};
use educenter_backend::services::student_service::{NewStudent, StudentService};
use educenter_backend::services::user_service::{NewUser, TeacherProfile, UserService};
use educenter_backend::utils::{jwt, telegram};

pub const BOT_TOKEN: &str = "123456:TEST-BOT-TOKEN";

pub struct TestContext {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub notifications: NotificationService,
    /// Held by the test instead of a worker so queued messages can be counted.
    pub outbox: UnboundedReceiver<Notification>,
}

impl TestContext {
    pub fn drain_outbox(&mut self) -> Vec<Notification> {
        let mut sent = Vec::new();
        while let Ok(notification) = self.outbox.try_recv() {
            sent.push(notification);
        }
        sent
    }

    pub fn bearer(&self, user: &users::Model) -> String {
        let token = jwt::generate_token(user.id, user.telegram_id, user.role, &self.config.jwt_secret, 30)
            .expect("token");
        format!("Bearer {}", token)
    }

    pub fn init_data(&self, telegram_id: i64, first_name: &str) -> String {
        let user = format!(r#"{{"id":{},"first_name":"{}","username":"user{}"}}"#, telegram_id, first_name, telegram_id);
        let auth_date = Utc::now().timestamp().to_string();
        telegram::sign_init_data(&[("auth_date", &auth_date), ("user", &user)], BOT_TOKEN)
    }
}

/// Fresh in-memory database with the full schema.
pub async fn setup() -> TestContext {
    // One connection: every pooled connection to `sqlite::memory:` would be its own database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(Duration::from_secs(3600))
        .sqlx_logging(false);
    let db = Database::connect(options).await.expect("connect to sqlite");
    db::create_tables(&db).await.expect("create schema");

    let config = AppConfig {
        telegram_bot_token: BOT_TOKEN.to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        ..AppConfig::default()
    };
    let (notifications, outbox) = NotificationService::channel();

    TestContext { db, config, notifications, outbox }
}

/// Builds the actix test service for a `TestContext`.
#[macro_export]
macro_rules! init_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($ctx.db.clone()))
                .app_data(actix_web::web::Data::new($ctx.config.clone()))
                .app_data(actix_web::web::Data::new($ctx.notifications.clone()))
                .configure(educenter_backend::configure_app),
        )
        .await
    };
}

pub async fn create_user(db: &DatabaseConnection, telegram_id: i64, role: Role) -> users::Model {
    UserService::create_user(
        db,
        NewUser {
            telegram_id,
            username: Some(format!("user{}", telegram_id)),
            full_name: Some(format!("User {}", telegram_id)),
            role,
        },
    )
    .await
    .expect("create user")
}

pub async fn create_teacher(db: &DatabaseConnection, telegram_id: i64, last_name: &str) -> (users::Model, teachers::Model) {
    UserService::create_teacher_with_user(
        db,
        NewUser {
            telegram_id,
            username: None,
            full_name: None,
            role: Role::Teacher,
        },
        TeacherProfile {
            first_name: "Teacher".to_string(),
            last_name: last_name.to_string(),
            phone: None,
            email: None,
            specialization: Some("Math".to_string()),
            experience_years: 3,
            bio: None,
        },
    )
    .await
    .expect("create teacher")
}

pub async fn create_group(db: &DatabaseConnection, teacher_id: i32, name: &str) -> groups::Model {
    GroupService::create(
        db,
        NewGroup {
            name: name.to_string(),
            subject: "Math".to_string(),
            teacher_id,
            monthly_price: Decimal::new(150_000, 0),
            description: None,
            max_students: Some(10),
        },
    )
    .await
    .expect("create group")
}

pub async fn create_student(db: &DatabaseConnection, parent_id: i32, group_id: i32, first_name: &str) -> students::Model {
    StudentService::create(
        db,
        NewStudent {
            first_name: first_name.to_string(),
            last_name: "Karimov".to_string(),
            date_of_birth: None,
            parent_id,
            group_id,
            phone: None,
            address: None,
            notes: None,
        },
    )
    .await
    .expect("create student")
}
