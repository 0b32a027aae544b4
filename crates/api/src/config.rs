//! Process configuration from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use rma_infra::PageLimits;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// `BIND_ADDR`
    pub bind_addr: SocketAddr,
    /// `JWT_SECRET` (HS256 shared secret)
    pub jwt_secret: String,
    /// `DEFAULT_PER_PAGE` / `MAX_PER_PAGE`
    pub page_limits: PageLimits,
    /// `SEED_ORDERS_PATH`: JSON array of orders preloaded into the order directory.
    pub seed_orders_path: Option<PathBuf>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; unset and empty are the same.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_addr = match var("BIND_ADDR") {
            Some(raw) => raw.trim().parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "BIND_ADDR",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let defaults = PageLimits::default();
        let default_per_page = positive(
            "DEFAULT_PER_PAGE",
            var("DEFAULT_PER_PAGE"),
            defaults.default_per_page,
        )?;
        let max_per_page = positive("MAX_PER_PAGE", var("MAX_PER_PAGE"), defaults.max_per_page)?;
        if default_per_page > max_per_page {
            return Err(ConfigError::Invalid {
                name: "DEFAULT_PER_PAGE",
                value: default_per_page.to_string(),
                reason: format!("exceeds MAX_PER_PAGE ({max_per_page})"),
            });
        }

        Ok(Self {
            bind_addr,
            jwt_secret,
            page_limits: PageLimits {
                default_per_page,
                max_per_page,
            },
            seed_orders_path: var("SEED_ORDERS_PATH").map(PathBuf::from),
        })
    }

    /// Config for in-process servers (tests): ephemeral local port, no seed file.
    pub fn for_tests(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: jwt_secret.into(),
            page_limits: PageLimits::default(),
            seed_orders_path: None,
        }
    }
}

fn positive(name: &'static str, raw: Option<String>, default: u32) -> Result<u32, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        Ok(_) => Err(ConfigError::Invalid {
            name,
            value: raw,
            reason: "must be at least 1".to_string(),
        }),
        Err(e) => Err(ConfigError::Invalid {
            name,
            value: raw,
            reason: e.to_string(),
        }),
    }
}
