use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{DEFAULT_API_BASE_URL, DEFAULT_SIDEBAR_WIDTH_PX, SEARCH_RADIUS};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid api base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("search radius must be positive")]
    ZeroRadius,

    #[error("invalid sidebar width: {0}")]
    InvalidSidebarWidth(f64),
}

/// Shell-provided settings. Missing fields fall back to the crate defaults.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    pub api_base_url: String,
    pub search_radius: u32,
    pub sidebar_width_px: f64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            search_radius: SEARCH_RADIUS,
            sidebar_width_px: DEFAULT_SIDEBAR_WIDTH_PX,
        }
    }
}

impl CoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = Url::parse(&self.api_base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.api_base_url.clone(),
            reason: e.to_string(),
        })?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.api_base_url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        if parsed.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.api_base_url.clone(),
                reason: "not a base url".to_string(),
            });
        }

        if self.search_radius == 0 {
            return Err(ConfigError::ZeroRadius);
        }

        if !self.sidebar_width_px.is_finite() || self.sidebar_width_px < 0.0 {
            return Err(ConfigError::InvalidSidebarWidth(self.sidebar_width_px));
        }

        Ok(())
    }
}
