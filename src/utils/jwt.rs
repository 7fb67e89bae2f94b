use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey, Algorithm};
use serde::{Deserialize, Serialize};
use chrono::{Utc, Duration};

use crate::models::users::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,        // users.id
    pub telegram_id: i64,
    pub role: Role,      // role at issue time, re-checked against the database on use
    pub exp: i64,        // expiration timestamp
}

/// Issues a session token after a successful Telegram login.
pub fn generate_token(
    user_id: i32,
    telegram_id: i64,
    role: Role,
    secret: &str,
    duration_minutes: i64,
) -> Result<String, String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::minutes(duration_minutes))
        .ok_or("Failed to calculate expiration")?
        .timestamp();

    let claims = Claims {
        sub: user_id,
        telegram_id,
        role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
        .map_err(|e| format!("Failed to generate token: {}", e))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
        .map(|data| data.claims)
        .map_err(|e| format!("Invalid token: {}", e))
}
