//! # API Configuration
//!
//! The `[api]` section of the PharmaPOS configuration file.
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:3000/api"
//! timeout_secs = 30   # optional; absent = no client-side timeout
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ApiError, ApiResult};

/// Backend base URL used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Prefix of every endpoint (`{base_url}/products`, ...).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Transport timeout. The engine itself never times out a request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        ApiConfig {
            base_url: base_url.into(),
            timeout_secs: None,
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ApiResult<()> {
        self.parsed_base_url()?;

        if self.timeout_secs == Some(0) {
            return Err(ApiError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Base URL with a trailing slash, so endpoint paths join under it.
    pub fn parsed_base_url(&self) -> ApiResult<Url> {
        let raw = self.base_url.trim();
        if !raw.starts_with("http://") && !raw.starts_with("https://") {
            return Err(ApiError::InvalidUrl(format!(
                "Backend URL must start with http:// or https://, got: {}",
                raw
            )));
        }

        let mut url = Url::parse(raw)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ApiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let url = ApiConfig::new("https://pharmacy.example.com/api")
            .parsed_base_url()
            .unwrap();
        assert_eq!(url.as_str(), "https://pharmacy.example.com/api/");
        assert_eq!(
            url.join("products").unwrap().as_str(),
            "https://pharmacy.example.com/api/products"
        );
    }

    #[test]
    fn test_validation() {
        assert!(ApiConfig::new("ftp://files").validate().is_err());
        assert!(ApiConfig::new("not a url").validate().is_err());

        let mut config = ApiConfig::default();
        config.timeout_secs = Some(0);
        assert!(config.validate().is_err());
        config.timeout_secs = Some(30);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }
}
