use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::warn;

use irma_api::auth::Settings;

/// Placeholder session secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("IRMA_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(&lookup, "IRMA_PORT", 5011u16)?;
        let db_path = lookup("IRMA_DB_PATH").unwrap_or_else(|| "irma.db".into());

        let session_secret = match lookup("IRMA_SESSION_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) if PLACEHOLDER_SECRETS.contains(&secret.as_str()) => {
                bail!("IRMA_SESSION_SECRET is still a placeholder; set a random value")
            }
            Some(secret) => secret,
            None => {
                warn!("IRMA_SESSION_SECRET is unset; generated a random one, sessions will not survive a restart");
                URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
            }
        };

        let session_ttl_hours = parse_or(&lookup, "IRMA_SESSION_TTL_HOURS", 24u64)?;
        if session_ttl_hours == 0 {
            bail!("IRMA_SESSION_TTL_HOURS must be at least 1");
        }

        let signup_balance = parse_or(&lookup, "IRMA_SIGNUP_BALANCE", 1000i64)?;
        if signup_balance < 0 {
            bail!("IRMA_SIGNUP_BALANCE must not be negative");
        }

        Ok(Self {
            host,
            port,
            db_path,
            settings: Settings {
                session_secret,
                session_ttl_hours,
                admin_username: lookup("IRMA_ADMIN_USERNAME").unwrap_or_else(|| "admin".into()),
                signup_balance,
                secure_cookies: parse_or(&lookup, "IRMA_COOKIE_SECURE", false)?,
            },
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}
