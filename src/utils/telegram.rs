// Telegram WebApp `initData` verification
//
// The Mini App sends the raw query string Telegram hands to the page. It is
// trusted only when its `hash` matches:
//   secret = HMAC_SHA256(key = "WebAppData", msg = bot_token)
//   hash   = hex(HMAC_SHA256(key = secret, msg = data_check_string))
// where data_check_string is every other `key=value` pair, sorted by key,
// joined with '\n'.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use url::form_urlencoded;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl TelegramUser {
    pub fn full_name(&self) -> Option<String> {
        let name = match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        };
        let name = name.trim().to_string();
        if name.is_empty() { None } else { Some(name) }
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum InitDataError {
    #[error("Telegram bot token is not configured")]
    NotConfigured,
    #[error("initData has no hash")]
    MissingHash,
    #[error("initData signature mismatch")]
    BadSignature,
    #[error("initData is missing auth_date")]
    MissingAuthDate,
    #[error("initData has expired")]
    Expired,
    #[error("initData has no user")]
    MissingUser,
    #[error("initData user is malformed: {0}")]
    InvalidUser(String),
}

/// Verifies `init_data` and returns the Telegram user it carries.
///
/// `max_age_secs <= 0` disables the freshness check. `now` is a unix timestamp.
pub fn verify_init_data(
    init_data: &str,
    bot_token: &str,
    max_age_secs: i64,
    now: i64,
) -> Result<TelegramUser, InitDataError> {
    if bot_token.is_empty() {
        return Err(InitDataError::NotConfigured);
    }

    let mut received_hash = None;
    let mut fields: Vec<(String, String)> = Vec::new();
    for (key, value) in form_urlencoded::parse(init_data.trim().as_bytes()) {
        if key == "hash" {
            received_hash = Some(value.into_owned());
        } else {
            fields.push((key.into_owned(), value.into_owned()));
        }
    }

    let received_hash = received_hash.ok_or(InitDataError::MissingHash)?;
    let received = hex::decode(&received_hash).map_err(|_| InitDataError::BadSignature)?;

    fields.sort_by(|a, b| a.0.cmp(&b.0));
    let mut mac = signature_mac(bot_token);
    mac.update(data_check_string(&fields).as_bytes());
    mac.verify_slice(&received)
        .map_err(|_| InitDataError::BadSignature)?;

    let field = |name: &str| {
        fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };

    if max_age_secs > 0 {
        let auth_date: i64 = field("auth_date")
            .and_then(|v| v.parse().ok())
            .ok_or(InitDataError::MissingAuthDate)?;
        if now - auth_date > max_age_secs {
            return Err(InitDataError::Expired);
        }
    }

    let user_json = field("user").ok_or(InitDataError::MissingUser)?;
    serde_json::from_str(user_json).map_err(|e| InitDataError::InvalidUser(e.to_string()))
}

/// Builds a signed `initData` string the same way Telegram does.
///
/// Used by local tooling and tests to impersonate a Mini App client.
pub fn sign_init_data(fields: &[(&str, &str)], bot_token: &str) -> String {
    let mut sorted: Vec<(String, String)> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut mac = signature_mac(bot_token);
    mac.update(data_check_string(&sorted).as_bytes());
    let hash = hex::encode(mac.finalize().into_bytes());

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, v) in &sorted {
        serializer.append_pair(k, v);
    }
    serializer.append_pair("hash", &hash);
    serializer.finish()
}

fn data_check_string(sorted_fields: &[(String, String)]) -> String {
    sorted_fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

fn signature_mac(bot_token: &str) -> HmacSha256 {
    let mut secret = HmacSha256::new_from_slice(b"WebAppData")
        .expect("HMAC accepts keys of any length");
    secret.update(bot_token.as_bytes());
    let secret_key = secret.finalize().into_bytes();

    HmacSha256::new_from_slice(&secret_key).expect("HMAC accepts keys of any length")
}
