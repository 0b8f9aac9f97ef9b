use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use dotenvy::dotenv;

pub const DEFAULT_QR_PAYLOAD: &str = r#"{"companyId": "TimeGuard-Demo", "action": "attendance-scan"}"#;

#[derive(Clone, Debug)]
pub struct Config {
    /// Unset means the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Local time for week boundaries and calendar days.
    pub utc_offset: FixedOffset,
    /// Text the attendance QR code decodes to.
    pub qr_payload: String,

    pub admin_username: String,
    pub admin_password: String,
    /// Also create the demo employees when seeding an empty registry.
    pub seed_demo_users: bool,
    pub log_dir: String,
}

/// Parses `+07:00`, `-05:30`, `+0700`, or the `Z`/`UTC` aliases.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow!("invalid offset"));
    }

    raw.parse::<FixedOffset>()
        .with_context(|| format!("offset must look like +HH:MM: {raw:?}"))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .context("JWT_SECRET must be set")?;

        let utc_offset = match lookup("TIMESHEET_UTC_OFFSET") {
            Some(raw) => parse_utc_offset(&raw).context("TIMESHEET_UTC_OFFSET is invalid")?,
            None => FixedOffset::east_opt(0).ok_or_else(|| anyhow!("invalid offset"))?,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            jwt_secret,
            server_addr: or("SERVER_ADDR", "127.0.0.1:8080"),
            access_token_ttl: parse_or(&lookup, "ACCESS_TOKEN_TTL", 900)?, // default 15 min

            rate_login_per_min: parse_or(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: or("API_PREFIX", "/api"),
            utc_offset,
            qr_payload: or("QR_PAYLOAD", DEFAULT_QR_PAYLOAD),

            admin_username: or("ADMIN_USERNAME", "admin"),
            admin_password: or("ADMIN_PASSWORD", "admin"),
            seed_demo_users: parse_or(&lookup, "SEED_DEMO_USERS", false)?,
            log_dir: or("LOG_DIR", "logs"),
        })
    }
}
