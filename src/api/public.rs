use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use futures::StreamExt;
use reqwest::Response;
use serde::Serialize;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;
use crate::config::Config;
use crate::core::{
    ClientError, DataResponse, LikeResponse, ListResponse, Platform, Result, Settings, Work, WorkList,
};
use crate::uploaders::{MAX_UPLOAD_SIZE, timeout_for_size};
use crate::utils::format_size;
use super::{Endpoint, ensure_success, error_message};

/// 公开接口客户端
#[derive(Debug, Clone)]
pub struct ApiClient {
    endpoint: Endpoint,
}

/// 作品媒体文件的绝对地址
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaLinks {
    pub images: Vec<Url>,
    pub videos: Vec<Url>,
    pub downloads: BTreeMap<Platform, Vec<Url>>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let endpoint = Endpoint::new(config.api_url()?, config.asset_url()?, config.request_timeout())?;
        Ok(Self { endpoint })
    }

    /// 只指定 API 根地址，其余使用默认配置
    pub fn with_base(api_base_url: &str) -> Result<Self> {
        Self::new(&Config {
            api_base_url: api_base_url.to_string(),
            ..Default::default()
        })
    }

    pub async fn settings(&self) -> Result<Settings> {
        self.get(&["settings"]).await
    }

    pub async fn works(&self) -> Result<WorkList> {
        let resp: ListResponse<Work> = self.get(&["works"]).await?;
        ensure_success(resp.success, resp.message.clone(), "failed to load works")?;
        Ok(resp.into())
    }

    pub async fn work(&self, id: &str) -> Result<Work> {
        let resp: DataResponse<Work> = self.get(&["works", id]).await?;
        ensure_success(resp.success, resp.message.clone(), "work not found")?;
        resp.data
            .ok_or_else(|| ClientError::Decode(format!("work {id} missing from response")))
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        let resp: ListResponse<String> = self.get(&["categories"]).await?;
        ensure_success(resp.success, resp.message, "failed to load categories")?;
        Ok(resp.data)
    }

    /// 按关键字和分类搜索，两者都为空时等同于 [`ApiClient::works`]
    ///
    /// 关键字原样发送，空白也交给后端处理。
    pub async fn search(&self, query: &str, category: &str) -> Result<WorkList> {
        if query.is_empty() && category.is_empty() {
            return self.works().await;
        }

        let mut url = self.endpoint.url(&["search"])?;
        {
            let mut pairs = url.query_pairs_mut();
            if !query.is_empty() {
                pairs.append_pair("q", query);
            }
            if !category.is_empty() {
                pairs.append_pair("category", category);
            }
        }

        debug!("GET {}", url);
        let resp = self.endpoint.client().get(url).send().await?;
        let resp: ListResponse<Work> = Endpoint::decode(resp).await?;
        ensure_success(resp.success, resp.message.clone(), "search failed")?;
        Ok(resp.into())
    }

    /// 点赞，返回最新点赞数
    pub async fn like(&self, id: &str) -> Result<u64> {
        let url = self.endpoint.url(&["like", id])?;
        debug!("POST {}", url);
        let resp = self.endpoint.client().post(url).send().await?;
        let resp: LikeResponse = Endpoint::decode(resp).await?;
        ensure_success(resp.success, resp.message, "like failed")?;
        Ok(resp.likes)
    }

    pub fn asset_url(&self, path: &str) -> Result<Url> {
        self.endpoint.asset_url(path)
    }

    pub fn image_url(&self, work_id: &str, filename: &str) -> Result<Url> {
        self.endpoint.url(&["image", work_id, filename])
    }

    pub fn video_url(&self, work_id: &str, filename: &str) -> Result<Url> {
        self.endpoint.url(&["video", work_id, filename])
    }

    pub fn download_url(&self, work_id: &str, platform: &Platform, filename: &str) -> Result<Url> {
        self.endpoint.url(&["download", work_id, platform.as_str(), filename])
    }

    /// 解析作品的图片、视频和下载地址
    ///
    /// 优先使用后端返回的相对链接。管理接口返回的作品没有链接字段，按文件名拼出同样的路径。
    pub fn media_links(&self, work: &Work) -> Result<MediaLinks> {
        let images = self.resolve(&work.image_links, &work.screenshots, |file| {
            self.image_url(&work.id, file)
        })?;
        let videos = self.resolve(&work.video_links, &work.videos, |file| {
            self.video_url(&work.id, file)
        })?;

        let mut downloads = BTreeMap::new();
        for platform in &work.platforms {
            let links = work.download_links.get(platform).map(Vec::as_slice).unwrap_or_default();
            let files = work.file_names.get(platform).map(Vec::as_slice).unwrap_or_default();
            let urls = self.resolve(links, files, |file| self.download_url(&work.id, platform, file))?;
            if !urls.is_empty() {
                downloads.insert(platform.clone(), urls);
            }
        }

        Ok(MediaLinks { images, videos, downloads })
    }

    /// 下载平台文件到 `dir`，返回保存的路径
    ///
    /// 后端每次下载都会累加作品下载量。失败时不留下不完整的文件。
    pub async fn download(
        &self,
        work_id: &str,
        platform: &Platform,
        filename: &str,
        dir: &Path,
    ) -> Result<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| ClientError::config(format!("invalid file name: {filename}")))?;
        let path = dir.join(name);

        let url = self.download_url(work_id, platform, filename)?;
        debug!("GET {}", url);
        // 文件不会超过上传上限，沿用最长的上传超时
        let resp = self
            .endpoint
            .client()
            .get(url)
            .timeout(timeout_for_size(MAX_UPLOAD_SIZE))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.bytes().await?;
            return Err(ClientError::api(status.as_u16(), error_message(status, &body)));
        }

        match write_body(resp, &path).await {
            Ok(written) => {
                info!("downloaded {} ({}) to {}", filename, format_size(written), path.display());
                Ok(path)
            }
            Err(err) => {
                if let Err(remove) = tokio::fs::remove_file(&path).await {
                    warn!("failed to remove partial download {}: {}", path.display(), remove);
                }
                Err(err)
            }
        }
    }

    fn resolve(
        &self,
        links: &[String],
        files: &[String],
        build: impl Fn(&str) -> Result<Url>,
    ) -> Result<Vec<Url>> {
        if links.is_empty() {
            files.iter().map(|file| build(file)).collect()
        } else {
            links.iter().map(|link| self.endpoint.asset_url(link)).collect()
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint.url(segments)?;
        debug!("GET {}", url);
        let resp = self.endpoint.client().get(url).send().await?;
        Endpoint::decode(resp).await
    }
}

async fn write_body(resp: Response, path: &Path) -> Result<u64> {
    let mut file = File::create(path).await?;
    let mut body = resp.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
