use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use url::Url;
use crate::core::{ClientError, Result};
use crate::utils::RetryPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "showcase.toml";
pub const ENV_API_URL: &str = "SHOWCASE_API_URL";
pub const ENV_ADMIN_TOKEN: &str = "SHOWCASE_ADMIN_TOKEN";

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// API 根地址，例如 `http://localhost:5000/api`
    pub api_base_url: String,
    /// 静态资源根地址，缺省为 API 地址的 origin
    pub asset_base_url: Option<String>,
    pub admin_token: Option<String>,
    pub request_timeout_secs: u64,
    pub admin_timeout_secs: u64,
    pub log_level: String,
    pub upload: UploadConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            asset_base_url: None,
            admin_token: None,
            request_timeout_secs: 10,
            admin_timeout_secs: 30,
            log_level: "info".to_string(),
            upload: UploadConfig::default(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// 批次结束后多久清理已结束的条目
    pub prune_after_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10_000,
            prune_after_ms: 3000,
        }
    }
}

impl UploadConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries).with_backoff(
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }

    pub fn prune_after(&self) -> Duration {
        Duration::from_millis(self.prune_after_ms)
    }
}

impl Config {
    pub fn parse(content: &str) -> Result<Config> {
        toml::from_str(content).map_err(|err| ClientError::config(err.to_string()))
    }

    /// 读取配置文件，文件不存在时使用默认配置
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Config::default()),
            Err(err) => Err(ClientError::config(format!("failed to read {}: {}", path.display(), err))),
        }
    }

    /// 读取配置文件并应用环境变量覆盖
    pub fn from_env(path: impl AsRef<Path>) -> Result<Config> {
        let mut config = Self::load(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(token) = lookup(ENV_ADMIN_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.admin_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.api_url()?;
        self.asset_url()?;
        Ok(())
    }

    /// API 根地址，保证以 `/` 结尾以便 `join`
    pub fn api_url(&self) -> Result<Url> {
        let mut raw = self.api_base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Ok(Url::parse(&raw)?)
    }

    pub fn asset_url(&self) -> Result<Url> {
        match &self.asset_base_url {
            Some(base) => Ok(Url::parse(base.trim())?),
            None => {
                let api = self.api_url()?;
                Ok(Url::parse(&api.origin().ascii_serialization())?)
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn admin_timeout(&self) -> Duration {
        Duration::from_secs(self.admin_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let config = Config::parse(
            r#"
            api_base_url = "https://works.example.com/api"
            admin_token = "secret"

            [upload]
            max_retries = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.admin_token.as_deref(), Some("secret"));
        assert_eq!(config.upload.max_retries, 5);
        assert_eq!(config.upload.initial_backoff_ms, 1000);
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.api_url().unwrap().as_str(), "https://works.example.com/api/");
        assert_eq!(config.asset_url().unwrap().as_str(), "https://works.example.com/");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = Config::load("definitely/not/here.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn env_overrides_file() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            ENV_API_URL => Some("http://10.0.0.2:5000/api".to_string()),
            ENV_ADMIN_TOKEN => Some("from-env".to_string()),
            _ => None,
        });
        assert_eq!(config.api_base_url, "http://10.0.0.2:5000/api");
        assert_eq!(config.admin_token.as_deref(), Some("from-env"));
    }

    #[test]
    fn empty_env_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|_| Some("  ".to_string()));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_url_is_rejected() {
        let config = Config {
            api_base_url: "/api".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ClientError::Url(_))));
    }
}
