//! # Service Configuration
//!
//! Loaded from environment variables at startup:
//!
//! | Variable               | Default                  | Meaning                                  |
//! |------------------------|--------------------------|------------------------------------------|
//! | `PORT`                 | `8080`                   | listen port                              |
//! | `AUTH_TOKEN`           | unset (auth disabled)    | admin bearer token                       |
//! | `STORE_BACKEND`        | `memory`                 | `memory` or `postgres`                   |
//! | `DATABASE_URL`         | unset                    | required when the backend is `postgres`  |
//! | `MEDIA_ROOT`           | `./media`                | directory for photos and certificates    |
//! | `PUBLIC_BASE_URL`      | `http://localhost:8080`  | absolute origin used in public links     |
//! | `MEDIA_URL_PREFIX`     | `/media/`                | path under which `MEDIA_ROOT` is served  |
//! | `NOTIFY_BASE_URL`      | `https://wa.me/`         | messaging deep-link service              |
//! | `NOTIFY_COUNTRY_CODE`  | `91`                     | prefix for domestic phone numbers        |
//! | `CERTIFICATE_TEMPLATE` | unset (built-in layout)  | YAML certificate template                |

use std::path::PathBuf;

use url::Url;

use crate::auth::SecretToken;

/// Which document store implementation backs the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl StoreBackend {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(ConfigError::InvalidValue {
                var: "STORE_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

/// Application configuration.
///
/// `Debug` redacts `auth_token` and `database_url`.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub auth_token: Option<SecretToken>,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub media_root: PathBuf,
    /// Absolute origin, without a trailing slash.
    pub public_base_url: String,
    pub media_url_prefix: String,
    pub notify_base_url: String,
    pub notify_country_code: String,
    pub certificate_template: Option<PathBuf>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("store_backend", &self.store_backend)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("media_root", &self.media_root)
            .field("public_base_url", &self.public_base_url)
            .field("media_url_prefix", &self.media_url_prefix)
            .field("notify_base_url", &self.notify_base_url)
            .field("notify_country_code", &self.notify_country_code)
            .field("certificate_template", &self.certificate_template)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            store_backend: StoreBackend::Memory,
            database_url: None,
            media_root: PathBuf::from("./media"),
            public_base_url: "http://localhost:8080".to_string(),
            media_url_prefix: "/media/".to_string(),
            notify_base_url: mcard_notify::DEFAULT_BASE_URL.to_string(),
            notify_country_code: mcard_notify::DEFAULT_COUNTRY_CODE.to_string(),
            certificate_template: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                var: "PORT",
                value: raw,
            })?,
            None => defaults.port,
        };

        let store_backend = match get("STORE_BACKEND") {
            Some(raw) => StoreBackend::parse(&raw)?,
            None => defaults.store_backend,
        };
        let database_url = get("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let public_base_url = match get("PUBLIC_BASE_URL") {
            Some(raw) => {
                let url = Url::parse(raw.trim()).map_err(|e| {
                    ConfigError::InvalidUrl("PUBLIC_BASE_URL".to_string(), e.to_string())
                })?;
                url.as_str().trim_end_matches('/').to_string()
            }
            None => defaults.public_base_url,
        };

        let mut media_url_prefix = get("MEDIA_URL_PREFIX").unwrap_or(defaults.media_url_prefix);
        if !media_url_prefix.starts_with('/') {
            media_url_prefix.insert(0, '/');
        }
        if !media_url_prefix.ends_with('/') {
            media_url_prefix.push('/');
        }

        Ok(Self {
            port,
            auth_token: get("AUTH_TOKEN").map(SecretToken::new),
            store_backend,
            database_url,
            media_root: get("MEDIA_ROOT").map(PathBuf::from).unwrap_or(defaults.media_root),
            public_base_url,
            media_url_prefix,
            notify_base_url: get("NOTIFY_BASE_URL").unwrap_or(defaults.notify_base_url),
            notify_country_code: get("NOTIFY_COUNTRY_CODE")
                .unwrap_or(defaults.notify_country_code),
            certificate_template: get("CERTIFICATE_TEMPLATE").map(PathBuf::from),
        })
    }

    /// Absolute URL prefix under which blob keys are served.
    pub fn media_base_url(&self) -> String {
        format!("{}{}", self.public_base_url, self.media_url_prefix)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
