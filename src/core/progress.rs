use std::sync::Arc;
use std::time::{Duration, Instant};

/// 单个文件的上传进度快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadProgress {
    /// 完成百分比（0-100，取整）
    pub percentage: u8,
    /// 已上传字节数
    pub bytes_uploaded: u64,
    /// 总字节数
    pub total_bytes: u64,
    /// 瞬时速度（字节/秒）
    pub speed: f64,
    /// 预计剩余时间，速度为 0 时为 None
    pub eta: Option<Duration>,
    /// 已重试次数
    pub retry_count: u32,
}

/// 上传过程中发给回调的事件
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// 进度更新
    Progress(UploadProgress),
    /// 本次尝试失败，等待 `delay` 后重试
    Retrying {
        retry_count: u32,
        delay: Duration,
        reason: String,
        message: String,
    },
}

pub type ProgressCallback = Arc<dyn Fn(UploadEvent) + Send + Sync>;

/// 上传条目状态
///
/// `Uploading ⇄ Retrying → Completed | Error`，终态不再接受进度更新。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Uploading,
    Retrying { message: String },
    Completed,
    Error(String),
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Error(_))
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn label(&self) -> &'static str {
        match self {
            UploadStatus::Uploading => "uploading",
            UploadStatus::Retrying { .. } => "retrying",
            UploadStatus::Completed => "completed",
            UploadStatus::Error(_) => "error",
        }
    }
}

/// 速度计算器
///
/// 每次采样用与上一次采样的字节差除以时间差得到瞬时速度。
#[derive(Debug, Clone)]
pub struct SpeedMeter {
    total_bytes: u64,
    last_bytes: u64,
    last_time: Instant,
}

impl SpeedMeter {
    pub fn new(total_bytes: u64) -> Self {
        Self::starting_at(total_bytes, Instant::now())
    }

    pub fn starting_at(total_bytes: u64, start: Instant) -> Self {
        Self {
            total_bytes,
            last_bytes: 0,
            last_time: start,
        }
    }

    pub fn sample(&mut self, bytes_uploaded: u64, retry_count: u32) -> UploadProgress {
        self.sample_at(bytes_uploaded, retry_count, Instant::now())
    }

    /// 记录一次采样并返回进度快照
    pub fn sample_at(&mut self, bytes_uploaded: u64, retry_count: u32, now: Instant) -> UploadProgress {
        let bytes_uploaded = bytes_uploaded.min(self.total_bytes).max(self.last_bytes);
        let elapsed = now.saturating_duration_since(self.last_time).as_secs_f64();
        let delta = bytes_uploaded - self.last_bytes;
        let speed = if elapsed > 0.0 { delta as f64 / elapsed } else { 0.0 };

        self.last_bytes = bytes_uploaded;
        self.last_time = now;

        UploadProgress {
            percentage: percentage(bytes_uploaded, self.total_bytes),
            bytes_uploaded,
            total_bytes: self.total_bytes,
            speed,
            eta: eta(self.total_bytes - bytes_uploaded, speed),
            retry_count,
        }
    }
}

fn percentage(uploaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((uploaded as f64 * 100.0) / total as f64).round().min(100.0) as u8
}

/// 剩余字节 / 当前速度，四舍五入到秒
pub fn eta(remaining: u64, speed: f64) -> Option<Duration> {
    if remaining == 0 {
        return Some(Duration::ZERO);
    }
    if speed > 0.0 {
        Some(Duration::from_secs((remaining as f64 / speed).round() as u64))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_uses_delta_since_previous_tick() {
        let start = Instant::now();
        let mut meter = SpeedMeter::starting_at(10_000, start);

        let first = meter.sample_at(1_000, 0, start + Duration::from_secs(1));
        assert_eq!(first.speed, 1_000.0);
        assert_eq!(first.percentage, 10);
        assert_eq!(first.eta, Some(Duration::from_secs(9)));

        let second = meter.sample_at(5_000, 0, start + Duration::from_secs(3));
        assert_eq!(second.speed, 2_000.0);
        assert_eq!(second.eta, Some(Duration::from_secs(3)));
        assert_eq!(second.percentage, 50);
    }

    #[test]
    fn eta_is_absent_without_speed() {
        let start = Instant::now();
        let mut meter = SpeedMeter::starting_at(100, start);
        let progress = meter.sample_at(0, 1, start);
        assert_eq!(progress.speed, 0.0);
        assert_eq!(progress.eta, None);
        assert_eq!(progress.retry_count, 1);
    }

    #[test]
    fn eta_rounds_and_completes_at_zero() {
        assert_eq!(eta(1_500, 1_000.0), Some(Duration::from_secs(2)));
        assert_eq!(eta(1_400, 1_000.0), Some(Duration::from_secs(1)));
        assert_eq!(eta(0, 0.0), Some(Duration::ZERO));
        assert_eq!(eta(10, 0.0), None);
    }

    #[test]
    fn percentage_never_decreases_within_attempt() {
        let start = Instant::now();
        let mut meter = SpeedMeter::starting_at(1_000, start);
        let mut last = 0;
        for (i, bytes) in [100u64, 400, 300, 900, 1_200].into_iter().enumerate() {
            let p = meter.sample_at(bytes, 0, start + Duration::from_millis(100 * (i as u64 + 1)));
            assert!(p.percentage >= last);
            last = p.percentage;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn terminal_states() {
        assert!(UploadStatus::Completed.is_terminal());
        assert!(UploadStatus::Error("x".into()).is_terminal());
        assert!(UploadStatus::Uploading.is_active());
        assert!(UploadStatus::Retrying { message: "wait".into() }.is_active());
    }
}
