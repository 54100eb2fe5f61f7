use crate::utils::error::{Result, StocktakeError};
use std::path::Path;
use url::Url;

pub const MAX_CONCURRENT_REQUESTS: usize = 64;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> StocktakeError {
    StocktakeError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// 後端根網址：http(s)、有主機名稱，且不能帶 query 或 fragment（路徑會直接接在後面）
pub fn validate_base_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|e| invalid(field, value, format!("Invalid URL format: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            field,
            value,
            format!("Unsupported URL scheme: {}", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(invalid(field, value, "URL has no host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid(field, value, "Base URL cannot carry a query or fragment"));
    }
    Ok(())
}

/// Auth-token 不可為空白、不可含空白字元，也不可留著沒替換的 `${VAR}`
pub fn validate_token(field: &str, token: &str) -> Result<()> {
    if token.contains("${") {
        return Err(StocktakeError::ConfigError {
            message: format!("{} references an environment variable that is not set", field),
        });
    }
    if token.trim().is_empty() {
        return Err(invalid(field, "", "Token cannot be empty"));
    }
    if token.chars().any(char::is_whitespace) {
        // 不回顯 token 內容
        return Err(invalid(field, "<hidden>", "Token cannot contain whitespace"));
    }
    Ok(())
}

/// 匯出目錄：不存在沒關係（寫入時會建立），但不能是既有的檔案
pub fn validate_output_dir(field: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field, path, "Path contains null bytes"));
    }
    if Path::new(path).is_file() {
        return Err(invalid(field, path, "Path points to an existing file, expected a directory"));
    }
    Ok(())
}

pub fn validate_concurrency(field: &str, value: usize) -> Result<()> {
    validate_range(field, value, 1, MAX_CONCURRENT_REQUESTS)
}

pub fn validate_required_field<'a, T>(field: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| StocktakeError::MissingConfigError {
        field: field.to_string(),
    })
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(field, value, format!("Value must be between {} and {}", min, max)));
    }
    Ok(())
}
