pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use actix_web::web;

use crate::error::AppError;

/// Registers the `/api` routes plus extractor configs that report malformed
/// bodies, queries and paths as `{"error": ...}` 400 responses.
///
/// Expects `web::Data` for `DatabaseConnection`, `AppConfig` and
/// `NotificationService` to be registered on the `App`.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::validation(format!("Invalid JSON body: {}", err)).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::validation(format!("Invalid query string: {}", err)).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::validation(format!("Invalid path parameter: {}", err)).into()),
    )
    .configure(routes::configure_routes);
}
