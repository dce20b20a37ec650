use std::sync::Arc;
use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::{error, info, warn};
use crate::core::{
    ClientError, ProgressCallback, Result, SpeedMeter, UploadEvent, UploadFailure, UploadReceipt,
};
use crate::utils::{RetryPolicy, format_duration, format_mib};
use super::limits::{MAX_UPLOAD_SIZE, timeout_for_size};
use super::progress_stream::BytesCallback;
use super::transport::{MultipartTransport, UploadRequest, UploadTransport};

/// 带重试的单文件上传
///
/// 超过 [`MAX_UPLOAD_SIZE`] 的文件在发请求前直接拒绝。失败时若可重试且还有次数，
/// 按 [`RetryPolicy`] 退避后重新上传整个文件。
pub struct ResilientUploader<T = MultipartTransport> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: UploadTransport> ResilientUploader<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn upload(
        &self,
        request: &UploadRequest,
        on_event: Option<ProgressCallback>,
    ) -> Result<UploadReceipt> {
        let file = &request.file;
        if file.size > MAX_UPLOAD_SIZE {
            return Err(ClientError::FileTooLarge {
                limit: MAX_UPLOAD_SIZE,
                actual: file.size,
            });
        }

        let timeout = timeout_for_size(file.size);
        info!(
            "uploading {} ({}) to work {} as {}{}",
            file.name,
            format_mib(file.size),
            request.work_id,
            request.file_type,
            request.platform.as_ref().map(|p| format!(" for {p}")).unwrap_or_default()
        );

        let mut retry_count = 0;
        loop {
            info!("upload attempt {}/{} for {}", retry_count + 1, self.policy.max_attempts(), file.name);
            let on_bytes = progress_reporter(file.size, retry_count, on_event.clone());

            let err = match self.transport.send(request, timeout, on_bytes).await {
                Ok(receipt) => {
                    info!("uploaded {} as {}", file.name, receipt.filename);
                    return Ok(receipt);
                }
                Err(err) => err,
            };

            if !err.is_retryable() || retry_count >= self.policy.max_retries {
                error!("upload of {} failed after {} retries: {}", file.name, retry_count, err);
                let failure = UploadFailure::new(err, retry_count, &file.name, file.size);
                return Err(ClientError::Upload(Box::new(failure)));
            }

            retry_count += 1;
            let delay = self.policy.delay_for(retry_count);
            let reason = err.to_string();
            warn!("attempt for {} failed, retry {} in {:?}: {}", file.name, retry_count, delay, reason);

            if let Some(callback) = &on_event {
                callback(UploadEvent::Retrying {
                    retry_count,
                    delay,
                    message: format!("Upload failed, retrying in {}: {}", format_duration(delay), reason),
                    reason,
                });
            }

            sleep(delay).await;
        }
    }
}

/// 每次尝试使用新的速度计算器，进度从 0 重新开始
fn progress_reporter(total_bytes: u64, retry_count: u32, on_event: Option<ProgressCallback>) -> BytesCallback {
    let Some(callback) = on_event else {
        return Arc::new(|_: u64| {});
    };

    let meter = Mutex::new(SpeedMeter::new(total_bytes));
    Arc::new(move |bytes: u64| {
        let progress = meter.lock().sample(bytes, retry_count);
        callback(UploadEvent::Progress(progress));
    })
}
