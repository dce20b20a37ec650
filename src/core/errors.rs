use thiserror::Error;

use crate::utils::format_mib;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
    },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("File too large: limit {limit} bytes, actual {actual} bytes")]
    FileTooLarge {
        limit: u64,
        actual: u64,
    },

    #[error("{0}")]
    Upload(Box<UploadFailure>),

    #[error("Work must be saved before files can be uploaded")]
    MissingWorkId,

    #[error("Cover {0} is not one of the work's screenshots")]
    InvalidCover(String),

    #[error("Uploads are still in progress")]
    UploadsInProgress,
}

impl ClientError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// 上传最终失败时的详细信息
    pub fn upload_failure(&self) -> Option<&UploadFailure> {
        match self {
            Self::Upload(failure) => Some(failure),
            _ => None,
        }
    }
}

/// 单次上传尝试的失败原因
#[derive(Error, Debug)]
pub enum AttemptError {
    /// 没有收到响应（网络错误或超时）
    #[error("{message}")]
    NoResponse {
        timed_out: bool,
        message: String,
    },

    /// 服务器返回了非成功状态码
    #[error("status {status}: {message}")]
    Status {
        status: u16,
        message: String,
    },

    /// 服务器返回 200 但 success 为 false
    #[error("{0}")]
    Rejected(String),

    /// 本地文件读取失败
    #[error("IO error {0}")]
    Io(#[from] std::io::Error),
}

impl AttemptError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn no_response(timed_out: bool, message: impl Into<String>) -> Self {
        Self::NoResponse {
            timed_out,
            message: message.into(),
        }
    }

    /// 网络错误、超时、5xx、408、429 可重试，其余立即失败
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NoResponse { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::Rejected(_) | Self::Io(_) => false,
        }
    }

    /// 超时标记，或者错误文本里提到了超时
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::NoResponse { timed_out: true, .. } => true,
            Self::NoResponse { message, .. } | Self::Rejected(message) => mentions_timeout(message),
            _ => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AttemptError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::status(status.as_u16(), err.to_string()),
            None => Self::no_response(err.is_timeout(), err.to_string()),
        }
    }
}

fn mentions_timeout(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("timeout") || message.contains("timed out")
}

/// 重试耗尽或不可重试时返回给调用方的上传错误
#[derive(Error, Debug)]
#[error("{message}")]
pub struct UploadFailure {
    pub message: String,
    #[source]
    pub cause: AttemptError,
    pub retry_count: u32,
    pub file_name: String,
    pub file_size: u64,
}

impl UploadFailure {
    pub fn new(cause: AttemptError, retry_count: u32, file_name: &str, file_size: u64) -> Self {
        let message = if cause.is_timeout() {
            format!(
                "Upload timed out, check the network connection or try a smaller file. File: {}",
                file_name
            )
        } else {
            match cause.status_code() {
                Some(413) => format!(
                    "File is too large to upload: {} ({})",
                    file_name,
                    format_mib(file_size)
                ),
                Some(status) if status >= 500 => {
                    format!("Server error, please try again later. File: {}", file_name)
                }
                _ => match &cause {
                    AttemptError::Status { message, .. } => message.clone(),
                    other => other.to_string(),
                },
            }
        };

        Self {
            message,
            cause,
            retry_count,
            file_name: file_name.to_string(),
            file_size,
        }
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_retryable_statuses() {
        assert!(AttemptError::status(500, "boom").is_retryable());
        assert!(AttemptError::status(503, "busy").is_retryable());
        assert!(AttemptError::status(408, "slow").is_retryable());
        assert!(AttemptError::status(429, "later").is_retryable());
        assert!(AttemptError::no_response(true, "timeout").is_retryable());
        assert!(AttemptError::no_response(false, "reset").is_retryable());

        assert!(!AttemptError::status(404, "missing").is_retryable());
        assert!(!AttemptError::status(403, "denied").is_retryable());
        assert!(!AttemptError::status(413, "too big").is_retryable());
        assert!(!AttemptError::Rejected("bad format".into()).is_retryable());
    }

    #[test]
    fn failure_messages_are_tailored() {
        let timeout = UploadFailure::new(AttemptError::no_response(true, "timed out"), 3, "a.zip", 10);
        assert!(timeout.message.starts_with("Upload timed out"));

        let proxy = UploadFailure::new(AttemptError::no_response(false, "proxy: Timeout waiting for upstream"), 3, "a.zip", 10);
        assert!(proxy.message.starts_with("Upload timed out"));

        let rejected = UploadFailure::new(AttemptError::Rejected("read timeout".into()), 0, "a.zip", 10);
        assert!(rejected.message.starts_with("Upload timed out"));

        let refused = UploadFailure::new(AttemptError::no_response(false, "connection refused"), 3, "a.zip", 10);
        assert!(!refused.message.starts_with("Upload timed out"));

        let too_large = UploadFailure::new(AttemptError::status(413, "too big"), 0, "a.zip", 20 * 1024 * 1024);
        assert_eq!(too_large.message, "File is too large to upload: a.zip (20.0MB)");

        let server = UploadFailure::new(AttemptError::status(502, "bad gateway"), 3, "a.zip", 10);
        assert!(server.message.starts_with("Server error"));

        let client = UploadFailure::new(AttemptError::status(404, "work not found"), 0, "a.zip", 10);
        assert_eq!(client.message, "work not found");
    }
}
