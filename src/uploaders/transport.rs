use std::path::{Path, PathBuf};
use std::time::Duration;
use async_trait::async_trait;
use reqwest::Body;
use reqwest::multipart::{Form, Part};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;
use crate::api::{AdminClient, error_message};
use crate::core::{AttemptError, ClientError, FileType, Platform, Result, UploadReceipt};
use super::progress_stream::{BytesCallback, ProgressStream};

/// 待上传的本地文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
}

impl UploadFile {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            size,
        }
    }

    /// 从磁盘读取文件名与大小
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(ClientError::config(format!("{} is not a file", path.display())));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(String::from)
            .ok_or_else(|| ClientError::config(format!("invalid file name: {}", path.display())))?;

        Ok(Self::new(path, name, metadata.len()))
    }
}

/// 一次上传的目标与来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub work_id: String,
    pub file_type: FileType,
    pub platform: Option<Platform>,
    pub file: UploadFile,
}

impl UploadRequest {
    pub fn new(work_id: impl Into<String>, file_type: FileType, file: UploadFile) -> Self {
        Self {
            work_id: work_id.into(),
            file_type,
            platform: None,
            file,
        }
    }

    pub fn with_platform(mut self, platform: Option<Platform>) -> Self {
        self.platform = platform;
        self
    }
}

/// 执行单次上传尝试，重试由调用方负责
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn send(
        &self,
        request: &UploadRequest,
        timeout: Duration,
        on_bytes: BytesCallback,
    ) -> std::result::Result<UploadReceipt, AttemptError>;
}

/// multipart/form-data 上传到 `/admin/upload/:workId/:fileType`
#[derive(Debug, Clone)]
pub struct MultipartTransport {
    admin: AdminClient,
}

impl MultipartTransport {
    pub fn new(admin: AdminClient) -> Self {
        Self { admin }
    }
}

#[async_trait]
impl UploadTransport for MultipartTransport {
    async fn send(
        &self,
        request: &UploadRequest,
        timeout: Duration,
        on_bytes: BytesCallback,
    ) -> std::result::Result<UploadReceipt, AttemptError> {
        let url = self
            .admin
            .upload_url(&request.work_id, request.file_type)
            .map_err(|err| AttemptError::Rejected(err.to_string()))?;

        // 每次尝试都重新打开文件，从头发送
        let file = File::open(&request.file.path).await?;
        let stream = ProgressStream::new(ReaderStream::new(file), on_bytes);
        let part = Part::stream_with_length(Body::wrap_stream(stream), request.file.size)
            .file_name(request.file.name.clone());

        let mut form = Form::new().part("file", part);
        if let Some(platform) = &request.platform {
            form = form.text("platform", platform.to_string());
        }

        debug!("POST {} (timeout {:?})", url, timeout);
        let resp = self
            .admin
            .authorize(self.admin.http().post(url))
            .multipart(form)
            .timeout(timeout)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(AttemptError::status(status.as_u16(), error_message(status, &bytes)));
        }

        let receipt: UploadReceipt = serde_json::from_slice(&bytes)
            .map_err(|err| AttemptError::Rejected(format!("invalid upload response: {err}")))?;
        if !receipt.success || receipt.filename.is_empty() {
            return Err(AttemptError::Rejected(
                receipt.message.unwrap_or_else(|| "upload rejected by server".to_string()),
            ));
        }

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_reads_name_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.zip");
        tokio::fs::write(&path, vec![7u8; 2048]).await.unwrap();

        let file = UploadFile::open(&path).await.unwrap();
        assert_eq!(file.name, "game.zip");
        assert_eq!(file.size, 2048);
        assert_eq!(file.path, path);
    }

    #[tokio::test]
    async fn open_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(UploadFile::open(dir.path()).await.is_err());
    }
}
