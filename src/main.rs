use std::io;
use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing::{info, warn};

use educenter_backend::config::AppConfig;
use educenter_backend::services::notification_service::NotificationService;
use educenter_backend::services::telegram_notifier::TelegramNotifier;
use educenter_backend::{configure_app, db, logging};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    logging::init(&config.log_level);

    info!("🔌 Connecting to database...");
    let db = db::establish_connection(&config.database_url)
        .await
        .map_err(io::Error::other)?;
    db::create_tables(&db).await.map_err(io::Error::other)?;
    info!("✅ Database connected!");

    if config.telegram_bot_token.is_empty() {
        warn!("TELEGRAM_BOT_TOKEN is not set: initData cannot be verified and notifications will fail");
    }
    let notifications = NotificationService::start(Arc::new(TelegramNotifier::from_config(&config)));

    let (host, port) = config.bind_address();
    info!("🚀 Starting server on http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(notifications.clone()))
            .configure(configure_app)
    })
        .bind((host.as_str(), port))?
        .run()
        .await
}
