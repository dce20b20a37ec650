use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;

/// 收到已发送的累计字节数
pub type BytesCallback = Arc<dyn Fn(u64) + Send + Sync>;

pin_project! {
    /// 包装请求体流，每读出一块数据就回报累计字节数
    pub struct ProgressStream<S> {
        #[pin]
        inner: S,
        bytes_sent: u64,
        on_bytes: BytesCallback,
    }
}

impl<S> ProgressStream<S> {
    pub fn new(inner: S, on_bytes: BytesCallback) -> Self {
        Self {
            inner,
            bytes_sent: 0,
            on_bytes,
        }
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = std::io::Result<Bytes>>
{
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if !chunk.is_empty() {
                    *this.bytes_sent += chunk.len() as u64;
                    (this.on_bytes)(*this.bytes_sent);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn reports_cumulative_bytes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"abc")),
            Ok(Bytes::new()),
            Ok(Bytes::from_static(b"defgh")),
        ];

        let stream = ProgressStream::new(
            futures::stream::iter(chunks),
            Arc::new(move |bytes: u64| sink.lock().push(bytes)),
        );
        let collected: Vec<_> = stream.collect().await;

        assert_eq!(collected.len(), 3);
        assert_eq!(*seen.lock(), vec![3, 8]);
    }
}
