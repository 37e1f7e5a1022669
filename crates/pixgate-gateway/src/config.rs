use std::env;

use pixgate_contracts::routes::{api_base_from, API_BASE_ENV};

pub const BIND_ENV: &str = "PIXGATE_BIND";
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Room for a foreground and a background image at the 10MB cap, plus fields.
pub const DEFAULT_BODY_LIMIT: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub api_base: String,
    pub bind: String,
    pub body_limit: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base: api_base_from(None),
            bind: DEFAULT_BIND.to_string(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            api_base: api_base_from(env::var(API_BASE_ENV).ok()),
            bind: env::var(BIND_ENV)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base_from(Some(api_base.to_string()));
        self
    }

    pub fn upstream_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}
