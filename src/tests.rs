use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use crate::core::{AttemptError, ClientError, FileType, ProgressCallback, UploadEvent, UploadReceipt};
use crate::uploaders::{BytesCallback, MAX_UPLOAD_SIZE, ResilientUploader, UploadFile, UploadRequest, UploadTransport};
use crate::utils::RetryPolicy;

type Attempt = std::result::Result<(), AttemptError>;

/// 按脚本依次返回结果的传输层，每次尝试先报告一半进度
struct ScriptedTransport {
    script: Mutex<VecDeque<Attempt>>,
    attempts: AtomicU32,
}

impl ScriptedTransport {
    fn new(script: Vec<Attempt>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            attempts: AtomicU32::new(0),
        }
    }

    fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UploadTransport for ScriptedTransport {
    async fn send(
        &self,
        request: &UploadRequest,
        _timeout: Duration,
        on_bytes: BytesCallback,
    ) -> std::result::Result<UploadReceipt, AttemptError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        on_bytes(request.file.size / 2);

        let next = self.script.lock().pop_front().unwrap_or(Ok(()));
        next?;
        on_bytes(request.file.size);
        Ok(UploadReceipt {
            success: true,
            filename: "image1.png".to_string(),
            file_size: Some(request.file.size),
            message: None,
        })
    }
}

fn request(size: u64) -> UploadRequest {
    UploadRequest::new("aurora", FileType::Image, UploadFile::new("/tmp/shot.png", "shot.png", size))
}

fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<UploadEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let callback: ProgressCallback = Arc::new(move |event: UploadEvent| sink.lock().push(event));
    (callback, events)
}

#[tokio::test(start_paused = true)]
async fn test_retries_until_success() {
    let transport = ScriptedTransport::new(vec![
        Err(AttemptError::status(500, "boom")),
        Err(AttemptError::status(500, "boom")),
    ]);
    let uploader = ResilientUploader::new(transport, RetryPolicy::default());
    let (callback, events) = recorder();

    let start = Instant::now();
    let receipt = uploader.upload(&request(1000), Some(callback)).await.unwrap();

    assert_eq!(receipt.filename, "image1.png");
    assert_eq!(uploader.transport().attempts(), 3);
    // 1000ms + 2000ms 的退避
    assert!(start.elapsed() >= Duration::from_millis(3000));

    let events = events.lock();
    let retries: Vec<u32> = events
        .iter()
        .filter_map(|event| match event {
            UploadEvent::Retrying { retry_count, .. } => Some(*retry_count),
            _ => None,
        })
        .collect();
    assert_eq!(retries, vec![1, 2]);

    match events.last() {
        Some(UploadEvent::Progress(progress)) => {
            assert_eq!(progress.percentage, 100);
            assert_eq!(progress.retry_count, 2);
        }
        other => panic!("unexpected last event: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_max_retries() {
    let transport = ScriptedTransport::new((0..10).map(|_| Err(AttemptError::status(503, "busy"))).collect());
    let uploader = ResilientUploader::new(transport, RetryPolicy::new(2));

    let err = uploader.upload(&request(1000), None).await.unwrap_err();
    assert_eq!(uploader.transport().attempts(), 3);

    let failure = err.upload_failure().unwrap();
    assert_eq!(failure.retry_count, 2);
    assert_eq!(failure.message, "Server error, please try again later. File: shot.png");
}

#[tokio::test(start_paused = true)]
async fn test_client_error_is_not_retried() {
    let transport = ScriptedTransport::new(vec![Err(AttemptError::status(404, "work not found"))]);
    let uploader = ResilientUploader::new(transport, RetryPolicy::default());

    let start = Instant::now();
    let err = uploader.upload(&request(1000), None).await.unwrap_err();

    assert_eq!(uploader.transport().attempts(), 1);
    assert!(start.elapsed() < Duration::from_millis(1000));
    assert_eq!(err.to_string(), "work not found");
}

#[tokio::test(start_paused = true)]
async fn test_timeout_message() {
    let transport = ScriptedTransport::new(vec![Err(AttemptError::no_response(true, "operation timed out"))]);
    let uploader = ResilientUploader::new(transport, RetryPolicy::new(0));

    let err = uploader.upload(&request(1000), None).await.unwrap_err();
    assert!(err.to_string().starts_with("Upload timed out"));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_detected_from_error_text() {
    let transport = ScriptedTransport::new(vec![Err(AttemptError::no_response(false, "gateway timeout while sending body"))]);
    let uploader = ResilientUploader::new(transport, RetryPolicy::new(0));

    let err = uploader.upload(&request(1000), None).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Upload timed out, check the network connection or try a smaller file. File: shot.png"
    );
}

#[tokio::test]
async fn test_oversized_file_is_rejected_locally() {
    let transport = ScriptedTransport::new(vec![]);
    let uploader = ResilientUploader::new(transport, RetryPolicy::default());

    let err = uploader.upload(&request(MAX_UPLOAD_SIZE + 1), None).await.unwrap_err();
    assert!(matches!(err, ClientError::FileTooLarge { actual, .. } if actual == MAX_UPLOAD_SIZE + 1));
    assert_eq!(uploader.transport().attempts(), 0);
}
