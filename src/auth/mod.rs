//! Anti-forgery nonces for the search action
//!
//! A nonce is a short-lived HS256 token bound to a single action name. The
//! widget fetches one from `/api/nonce` and sends it with every search; the
//! search handler rejects requests whose nonce does not verify.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Action every search nonce is bound to
pub const NONCE_ACTION: &str = "wcls_nonce";

/// Longest nonce lifetime accepted, one year
pub const MAX_NONCE_LIFETIME_HOURS: u64 = 24 * 365;

/// Nonce claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Action the nonce authorizes
    pub action: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Nonce signing configuration
#[derive(Debug, Clone)]
pub struct NonceConfig {
    pub secret: String,
    pub lifetime_hours: u64,
}

/// Why a nonce was refused
#[derive(Debug, thiserror::Error)]
pub enum NonceError {
    #[error("missing nonce")]
    Missing,
    #[error("invalid nonce: {0}")]
    Invalid(jsonwebtoken::errors::Error),
    #[error("nonce issued for action {0}")]
    WrongAction(String),
}

/// Generate a nonce for `action`
pub fn generate_nonce(action: &str, config: &NonceConfig) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let hours = config.lifetime_hours.min(MAX_NONCE_LIFETIME_HOURS) as i64;
    let exp = now + Duration::hours(hours);

    let claims = Claims {
        action: action.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Verify a nonce was issued by us, is unexpired, and authorizes `action`
pub fn verify_nonce(nonce: Option<&str>, action: &str, config: &NonceConfig) -> Result<Claims, NonceError> {
    let nonce = nonce.filter(|n| !n.is_empty()).ok_or(NonceError::Missing)?;

    let token_data = decode::<Claims>(
        nonce,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(NonceError::Invalid)?;

    if token_data.claims.action != action {
        return Err(NonceError::WrongAction(token_data.claims.action));
    }

    Ok(token_data.claims)
}

/// Script data handed to a widget page: where to post and the nonce to send
pub async fn issue_nonce(
    State((config, ajax_url)): State<(NonceConfig, String)>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let nonce = generate_nonce(NONCE_ACTION, &config).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to generate nonce: {}", e),
        )
    })?;

    Ok(Json(json!({
        "ajax_url": ajax_url,
        "nonce": nonce
    })))
}
