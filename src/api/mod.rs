//! 后端 REST 接口客户端
//!
//! [`ApiClient`] 访问公开接口，[`AdminClient`] 额外携带管理员凭据。

mod admin;
mod public;

pub use admin::{AdminClient, AdminToken};
pub use public::{ApiClient, MediaLinks};

use std::time::Duration;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;
use crate::core::{ClientError, Result};

pub fn user_agent() -> &'static str {
    concat!("showcase/", env!("CARGO_PKG_VERSION"))
}

/// 共享的 HTTP 客户端与根地址
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    client: Client,
    base: Url,
    assets: Url,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl Endpoint {
    pub(crate) fn new(base: Url, assets: Url, timeout: Duration) -> Result<Self> {
        if base.cannot_be_a_base() {
            return Err(ClientError::config(format!("api base url cannot be a base: {base}")));
        }
        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base, assets })
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// 根地址后拼接路径段，每一段都会做百分号编码
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::config(format!("api base url cannot be a base: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// 把后端返回的相对资源路径解析为绝对地址
    pub(crate) fn asset_url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }
        Ok(self.assets.join(path)?)
    }

    /// 检查状态码并解析 JSON 响应体
    pub(crate) async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(ClientError::api(status.as_u16(), error_message(status, &bytes)));
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| ClientError::Decode(format!("failed to parse body: {err}")))
    }
}

/// 后端的 `message` 字段，缺失时退回状态码描述
pub(crate) fn error_message(status: reqwest::StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            format!(
                "request failed: {}",
                status.canonical_reason().unwrap_or(status.as_str())
            )
        })
}

/// `success: false` 的 200 响应同样视为失败
pub(crate) fn ensure_success(success: bool, message: Option<String>, fallback: &str) -> Result<()> {
    if success {
        Ok(())
    } else {
        Err(ClientError::api(200, message.unwrap_or_else(|| fallback.to_string())))
    }
}
