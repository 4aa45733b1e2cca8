//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 应用配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metadata: MetadataApiConfig,
    #[serde(default)]
    pub exchange: ExchangeApiConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

/// 元数据服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// 交易所 API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeApiConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
        }
    }
}

impl Default for MetadataApiConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("METADATA_API_URL")
                .unwrap_or_else(|_| "https://api.blockchain.info".into()),
            timeout_secs: std::env::var("METADATA_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Default for ExchangeApiConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("EXCHANGE_API_URL")
                .unwrap_or_else(|_| "https://shapeshift.io".into()),
            api_key: std::env::var("EXCHANGE_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            timeout_secs: std::env::var("EXCHANGE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Config {
    /// 从环境变量加载配置（先读取 .env）
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            logging: LoggingConfig::default(),
            metadata: MetadataApiConfig::default(),
            exchange: ExchangeApiConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        for (name, url) in [
            ("METADATA_API_URL", &self.metadata.base_url),
            ("EXCHANGE_API_URL", &self.exchange.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        if self.metadata.timeout_secs == 0 || self.exchange.timeout_secs == 0 {
            anyhow::bail!("Request timeouts must be greater than zero");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn base_config() -> Config {
        Config {
            logging: LoggingConfig {
                level: "info".into(),
                format: "text".into(),
            },
            metadata: MetadataApiConfig {
                base_url: "https://metadata.example.com".into(),
                timeout_secs: 10,
            },
            exchange: ExchangeApiConfig {
                base_url: "https://exchange.example.com".into(),
                api_key: None,
                timeout_secs: 10,
            },
        }
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[logging]
level = "debug"
format = "json"

[metadata]
base_url = "https://metadata.example.com"
timeout_secs = 15

[exchange]
base_url = "https://exchange.example.com"
api_key = "pk_test"
timeout_secs = 20
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.metadata.timeout_secs, 15);
        assert_eq!(config.exchange.api_key.as_deref(), Some("pk_test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_env() {
        let config = Config::from_env_and_file(Some("/nonexistent/ironshift.toml")).unwrap();
        assert!(config.metadata.timeout_secs > 0);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[metadata]\nbase_url = 42").unwrap();

        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(base_config().validate().is_ok());

        let mut bad_level = base_config();
        bad_level.logging.level = "verbose".into();
        assert!(bad_level.validate().is_err());

        let mut bad_format = base_config();
        bad_format.logging.format = "xml".into();
        assert!(bad_format.validate().is_err());

        let mut bad_url = base_config();
        bad_url.exchange.base_url = "ftp://exchange.example.com".into();
        assert!(bad_url.validate().is_err());

        let mut zero_timeout = base_config();
        zero_timeout.metadata.timeout_secs = 0;
        assert!(zero_timeout.validate().is_err());
    }
}
