//! Process settings from the environment (optionally seeded from a `.env` file).

use crate::error::ConfigError;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct AuthSettings {
    /// HS256 secret used to verify session tokens.
    pub secret_key: String,
    /// Header carrying the session token. An optional `Bearer ` prefix is accepted.
    pub token_header: String,
    /// Claim holding the caller's role. When unset, roles are not checked.
    pub role_claim: Option<String>,
    /// Claim holding the caller's primary key, bound to `$loggedId`.
    pub identity_claim: String,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub listen_addr: String,
    pub api_prefix: String,
    pub endpoints_dir: PathBuf,
    pub display_body_params: bool,
    pub body_limit: usize,
    pub auth: AuthSettings,
}

impl Settings {
    /// Read `.env` if present, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let secret_key = lookup("SECRET_KEY")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::Settings("SECRET_KEY must be set".into()))?;

        Ok(Settings {
            database_url: get("DATABASE_URL", "postgres://localhost/sqlroute"),
            listen_addr: get("LISTEN_ADDR", "0.0.0.0:3000"),
            api_prefix: normalize_prefix(&get("API_PREFIX", "/api")),
            endpoints_dir: PathBuf::from(get("ENDPOINTS_DIR", "endpoints")),
            display_body_params: parse_bool("DISPLAY_BODY_PARAMS", lookup("DISPLAY_BODY_PARAMS"))?,
            body_limit: match lookup("BODY_LIMIT_BYTES") {
                Some(s) => s
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Settings(format!("BODY_LIMIT_BYTES: '{}' is not a byte count", s)))?,
                None => 1024 * 1024,
            },
            auth: AuthSettings {
                secret_key,
                token_header: get("TOKEN_HEADER", "Token"),
                role_claim: lookup("AUTH_ROLE_CLAIM").filter(|s| !s.is_empty()),
                identity_claim: get("AUTH_ID_CLAIM", "id"),
            },
        })
    }
}

/// Leading `/` added, trailing `/` dropped; `/` alone becomes empty.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn parse_bool(key: &str, raw: Option<String>) -> Result<bool, ConfigError> {
    let Some(raw) = raw else { return Ok(false) };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Settings(format!("{}: '{}' is not a boolean", key, other))),
    }
}
