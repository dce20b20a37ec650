use std::fmt;
use reqwest::RequestBuilder;
use reqwest::header::AUTHORIZATION;
use tracing::{debug, info};
use url::Url;
use crate::config::Config;
use crate::core::{
    ClientError, FileType, ListResponse, MutationResponse, Platform, Result, Work, WorkDraft, WorkList,
};
use super::{Endpoint, ensure_success};

/// 管理员凭据，由服务器校验
#[derive(Clone, PartialEq, Eq)]
pub struct AdminToken(String);

impl AdminToken {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(ClientError::config("admin token is empty"));
        }
        Ok(Self(token))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AdminToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminToken(***)")
    }
}

/// 管理接口客户端
///
/// 凭据以 `token` 查询参数和 `Authorization` 头同时发送。
#[derive(Debug, Clone)]
pub struct AdminClient {
    endpoint: Endpoint,
    token: AdminToken,
}

impl AdminClient {
    pub fn new(config: &Config, token: AdminToken) -> Result<Self> {
        let endpoint = Endpoint::new(config.api_url()?, config.asset_url()?, config.admin_timeout())?;
        Ok(Self { endpoint, token })
    }

    /// 使用配置中的 `admin_token`
    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config
            .admin_token
            .clone()
            .ok_or_else(|| ClientError::config("admin token is required (set admin_token or SHOWCASE_ADMIN_TOKEN)"))?;
        Self::new(config, AdminToken::new(token)?)
    }

    pub(crate) fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .query(&[("token", self.token.expose())])
            .header(AUTHORIZATION, self.token.expose())
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        self.endpoint.client()
    }

    /// 让服务器校验凭据
    pub async fn verify(&self) -> Result<()> {
        self.works().await.map(|_| ())
    }

    pub async fn works(&self) -> Result<WorkList> {
        let url = self.endpoint.url(&["admin", "works"])?;
        debug!("GET {}", url);
        let resp = self.authorize(self.http().get(url)).send().await?;
        let resp: ListResponse<Work> = Endpoint::decode(resp).await?;
        ensure_success(resp.success, resp.message.clone(), "failed to load works")?;
        Ok(resp.into())
    }

    /// 按 ID 查找作品（管理接口没有单条查询）
    pub async fn work(&self, id: &str) -> Result<Work> {
        self.works()
            .await?
            .works
            .into_iter()
            .find(|w| w.id == id)
            .ok_or_else(|| ClientError::api(404, format!("work {id} not found")))
    }

    /// 创建作品，返回作品 ID
    pub async fn create_work(&self, draft: &WorkDraft) -> Result<String> {
        let url = self.endpoint.url(&["admin", "works"])?;
        let resp = self.authorize(self.http().post(url)).json(draft).send().await?;
        let resp: MutationResponse = Endpoint::decode(resp).await?;
        ensure_success(resp.success, resp.message, "create failed")?;
        info!("created work {}", draft.id);
        Ok(resp.work_id.unwrap_or_else(|| draft.id.clone()))
    }

    pub async fn update_work(&self, id: &str, work: &Work) -> Result<()> {
        let url = self.endpoint.url(&["admin", "works", id])?;
        let resp = self.authorize(self.http().put(url)).json(work).send().await?;
        let resp: MutationResponse = Endpoint::decode(resp).await?;
        ensure_success(resp.success, resp.message, "update failed")?;
        info!("updated work {}", id);
        Ok(())
    }

    pub async fn delete_work(&self, id: &str) -> Result<()> {
        let url = self.endpoint.url(&["admin", "works", id])?;
        let resp = self.authorize(self.http().delete(url)).send().await?;
        let resp: MutationResponse = Endpoint::decode(resp).await?;
        ensure_success(resp.success, resp.message, "delete failed")?;
        info!("deleted work {}", id);
        Ok(())
    }

    pub async fn delete_file(
        &self,
        work_id: &str,
        file_type: FileType,
        filename: &str,
        platform: Option<Platform>,
    ) -> Result<()> {
        let url = self
            .endpoint
            .url(&["admin", "delete-file", work_id, file_type.as_str(), filename])?;
        let mut request = self.authorize(self.http().delete(url));
        if let Some(platform) = platform {
            request = request.query(&[("platform", platform.as_str())]);
        }

        let resp = request.send().await?;
        let resp: MutationResponse = Endpoint::decode(resp).await?;
        ensure_success(resp.success, resp.message, "delete failed")?;
        info!("deleted {} file {} from work {}", file_type, filename, work_id);
        Ok(())
    }

    /// 上传接口地址 `/admin/upload/:workId/:fileType`
    pub fn upload_url(&self, work_id: &str, file_type: FileType) -> Result<Url> {
        self.endpoint.url(&["admin", "upload", work_id, file_type.as_str()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_redacted_and_required() {
        let token = AdminToken::new(" s3cret ").unwrap();
        assert_eq!(token.expose(), "s3cret");
        assert_eq!(format!("{:?}", token), "AdminToken(***)");
        assert!(AdminToken::new("  ").is_err());
    }

    #[test]
    fn from_config_requires_token() {
        let err = AdminClient::from_config(&Config::default()).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn upload_url_layout() {
        let config = Config::default();
        let client = AdminClient::new(&config, AdminToken::new("t").unwrap()).unwrap();
        assert_eq!(
            client.upload_url("aurora", FileType::Platform).unwrap().as_str(),
            "http://localhost:5000/api/admin/upload/aurora/platform"
        );
    }
}
