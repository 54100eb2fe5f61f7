#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_base_url, validate_concurrency, validate_output_dir, validate_range,
    validate_required_field, validate_token, Validate,
};
use std::time::Duration;
use toml_config::TomlConfig;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_CONCURRENT_REQUESTS: usize = 4;
pub const DEFAULT_OUTPUT_PATH: &str = "./stocktake-output";

/// 命令列提供的覆蓋值（未指定時為 None）
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub concurrent_requests: Option<usize>,
    pub output_path: Option<String>,
}

/// 合併後的設定：命令列 > TOML > 預設值
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub token: String,
    pub timeout_seconds: u64,
    pub concurrent_requests: usize,
    pub output_path: String,
}

impl Settings {
    pub fn resolve(file: Option<&TomlConfig>, overrides: Overrides) -> Result<Self> {
        let file = file.cloned().unwrap_or_default();

        let base_url = overrides.base_url.or(file.backend.base_url);
        let base_url = validate_required_field("backend.base_url", &base_url)?.clone();
        let token = overrides.token.or(file.backend.token);
        let token = validate_required_field("backend.token", &token)?.clone();

        let settings = Self {
            base_url,
            token,
            timeout_seconds: overrides
                .timeout_seconds
                .or(file.backend.timeout_seconds)
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            concurrent_requests: overrides
                .concurrent_requests
                .or(file.session.concurrent_requests)
                .unwrap_or(DEFAULT_CONCURRENT_REQUESTS),
            output_path: overrides
                .output_path
                .or(file.export.output_path)
                .unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string()),
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_base_url("backend.base_url", &self.base_url)?;
        validate_token("backend.token", &self.token)?;
        validate_range("backend.timeout_seconds", self.timeout_seconds, 1, 600)?;
        validate_concurrency("session.concurrent_requests", self.concurrent_requests)?;
        validate_output_dir("export.output_path", &self.output_path)?;
        Ok(())
    }
}

impl ConfigProvider for Settings {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_token(&self) -> &str {
        &self.token
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn concurrent_requests(&self) -> usize {
        self.concurrent_requests
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::StocktakeError;

    fn file() -> TomlConfig {
        TomlConfig::from_toml_str(
            r#"
[backend]
base_url = "https://erp.example.com/api"
token = "file-token"
timeout_seconds = 15

[session]
concurrent_requests = 2
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_cli_overrides_file() {
        let settings = Settings::resolve(
            Some(&file()),
            Overrides {
                token: Some("cli-token".to_string()),
                concurrent_requests: Some(8),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(settings.auth_token(), "cli-token");
        assert_eq!(settings.base_url(), "https://erp.example.com/api");
        assert_eq!(settings.concurrent_requests(), 8);
        assert_eq!(settings.request_timeout(), Duration::from_secs(15));
        assert_eq!(settings.output_path(), DEFAULT_OUTPUT_PATH);
    }

    #[test]
    fn test_missing_token_is_reported() {
        let err = Settings::resolve(
            None,
            Overrides {
                base_url: Some("http://localhost:8080".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, StocktakeError::MissingConfigError { ref field } if field == "backend.token"));
    }

    #[test]
    fn test_unresolved_env_token_is_rejected() {
        let err = Settings::resolve(
            None,
            Overrides {
                base_url: Some("http://localhost:8080".to_string()),
                token: Some("${NOT_SET_ANYWHERE}".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, StocktakeError::ConfigError { .. }));
    }
}
