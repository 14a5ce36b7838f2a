use anyhow::Result;
use tracing::warn;

use crate::auth::{NonceConfig, MAX_NONCE_LIFETIME_HOURS};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_port: u16,
    pub database_url: String,
    /// Front-end base URL used to build term and product links
    pub site_url: String,
    pub nonce: NonceConfig,
    /// When false the search action answers with a "catalog not active" error
    pub catalog_enabled: bool,
    pub placeholder_image_url: String,
    pub currency_symbol: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (don't fail if it doesn't)
        let _ = dotenvy::dotenv();

        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:catalog.db".to_string());

        let site_url = std::env::var("SITE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let secret = match std::env::var("NONCE_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("NONCE_SECRET not set, using a random secret; nonces will not survive a restart");
                uuid::Uuid::new_v4().to_string()
            }
        };

        let lifetime_hours = parse_lifetime_hours(
            &std::env::var("NONCE_LIFETIME_HOURS").unwrap_or_else(|_| "24".to_string()),
        )?;

        let catalog_enabled = match std::env::var("CATALOG_ENABLED") {
            Ok(value) => parse_flag("CATALOG_ENABLED", &value)?,
            Err(_) => true,
        };

        let placeholder_image_url = std::env::var("PLACEHOLDER_IMAGE_URL")
            .unwrap_or_else(|_| format!("{}/assets/placeholder.png", site_url));

        let currency_symbol =
            std::env::var("CURRENCY_SYMBOL").unwrap_or_else(|_| "$".to_string());

        Ok(Config {
            api_port,
            database_url,
            site_url,
            nonce: NonceConfig {
                secret,
                lifetime_hours,
            },
            catalog_enabled,
            placeholder_image_url,
            currency_symbol,
        })
    }
}

/// Parse a boolean switch: true/false, 1/0, yes/no or on/off
fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{} must be true or false, got {:?}", name, other),
    }
}

/// Nonce lifetime in hours, between 1 and `MAX_NONCE_LIFETIME_HOURS`
fn parse_lifetime_hours(value: &str) -> Result<u64> {
    let hours: u64 = value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("NONCE_LIFETIME_HOURS {:?} is not a number: {}", value, e))?;

    if hours == 0 || hours > MAX_NONCE_LIFETIME_HOURS {
        anyhow::bail!(
            "NONCE_LIFETIME_HOURS must be between 1 and {}, got {}",
            MAX_NONCE_LIFETIME_HOURS,
            hours
        );
    }
    Ok(hours)
}
