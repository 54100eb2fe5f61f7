use crate::utils::error::{Result, StocktakeError};
use crate::utils::validation::{
    validate_base_url, validate_concurrency, validate_output_dir, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub concurrent_requests: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    pub output_path: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| StocktakeError::ConfigError {
            message: format!("Cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| StocktakeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${STOCKTAKE_TOKEN})，找不到的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| StocktakeError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        if let Some(base_url) = &self.backend.base_url {
            validate_base_url("backend.base_url", base_url)?;
        }

        if let Some(concurrent) = self.session.concurrent_requests {
            validate_concurrency("session.concurrent_requests", concurrent)?;
        }

        if let Some(output_path) = &self.export.output_path {
            validate_output_dir("export.output_path", output_path)?;
        }

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[backend]
base_url = "https://erp.example.com/api"
token = "abc"
timeout_seconds = 10

[session]
concurrent_requests = 2

[export]
output_path = "./sheets"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.backend.base_url.as_deref(), Some("https://erp.example.com/api"));
        assert_eq!(config.backend.timeout_seconds, Some(10));
        assert_eq!(config.session.concurrent_requests, Some(2));
        assert_eq!(config.export.output_path.as_deref(), Some("./sheets"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sections_are_optional() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert!(config.backend.base_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("STOCKTAKE_TEST_TOKEN_SUBST", "from-env");

        let config = TomlConfig::from_toml_str(
            r#"
[backend]
token = "${STOCKTAKE_TEST_TOKEN_SUBST}"
"#,
        )
        .unwrap();
        assert_eq!(config.backend.token.as_deref(), Some("from-env"));

        std::env::remove_var("STOCKTAKE_TEST_TOKEN_SUBST");
    }

    #[test]
    fn test_config_validation() {
        let config = TomlConfig::from_toml_str(
            r#"
[backend]
base_url = "invalid-url"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str(
            r#"
[session]
concurrent_requests = 0
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[backend]\nbase_url = \"http://localhost:8080\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.backend.base_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = TomlConfig::from_toml_str("[backend\n").unwrap_err();
        assert!(matches!(err, StocktakeError::ConfigValidationError { .. }));
    }
}
