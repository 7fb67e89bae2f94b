//! Runtime configuration read from `.env` and the process environment.

use std::env;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in .env file")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub telegram_bot_token: String,
    pub telegram_api_url: String,
    pub jwt_secret: String,
    pub jwt_duration_minutes: i64,
    pub init_data_max_age_secs: i64,
    /// Upper bound for any grade scale; also the default `max_value`.
    pub grade_max_value: f64,
    /// Day of the billing month a payment falls due when no due date is given.
    pub payment_due_day: u32,
    pub currency: String,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let config = Self {
            database_url: required("DATABASE_URL")?,
            host: optional("HOST", "127.0.0.1"),
            port: parsed("PORT", 8080)?,
            telegram_bot_token: optional("TELEGRAM_BOT_TOKEN", ""),
            telegram_api_url: optional("TELEGRAM_API_URL", "https://api.telegram.org"),
            jwt_secret: required("JWT_SECRET")?,
            jwt_duration_minutes: parsed("JWT_DURATION_MINUTES", 30)?,
            init_data_max_age_secs: parsed("INIT_DATA_MAX_AGE_SECS", 86_400)?,
            grade_max_value: parsed("GRADE_MAX_VALUE", 5.0)?,
            payment_due_day: parsed("PAYMENT_DUE_DAY", 10)?,
            currency: optional("CURRENCY", "UZS"),
            log_level: optional("LOG_LEVEL", "info"),
        };

        if !(1..=28).contains(&config.payment_due_day) {
            return Err(ConfigError::Invalid {
                name: "PAYMENT_DUE_DAY",
                value: config.payment_due_day.to_string(),
            });
        }
        if config.grade_max_value <= 0.0 {
            return Err(ConfigError::Invalid {
                name: "GRADE_MAX_VALUE",
                value: config.grade_max_value.to_string(),
            });
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            telegram_bot_token: String::new(),
            telegram_api_url: "https://api.telegram.org".to_string(),
            jwt_secret: "default-insecure-key-change-this".to_string(),
            jwt_duration_minutes: 30,
            init_data_max_age_secs: 86_400,
            grade_max_value: 5.0,
            payment_due_day: 10,
            currency: "UZS".to_string(),
            log_level: "info".to_string(),
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &'static str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
