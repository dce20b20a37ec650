use std::time::Duration;

/// 重试策略：指数退避，上限封顶
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大重试次数（不含首次尝试）
    pub max_retries: u32,
    /// 第一次重试前的等待
    pub initial: Duration,
    /// 单次等待上限
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn with_backoff(mut self, initial: Duration, max_delay: Duration) -> Self {
        self.initial = initial;
        self.max_delay = max_delay;
        self
    }

    /// 第 `retry_count` 次重试（从 1 开始）前的等待：min(initial × 2^(n-1), max_delay)
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.saturating_sub(1).min(31);
        let delay = self.initial.saturating_mul(1u32 << exponent);
        std::cmp::min(delay, self.max_delay)
    }

    /// 总尝试次数上限
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_sequence_is_capped() {
        let policy = RetryPolicy::new(10);
        let delays: Vec<u64> = (1..=7).map(|n| policy.delay_for(n).as_millis() as u64).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 10000, 10000, 10000]);
    }

    #[test]
    fn huge_retry_counts_do_not_overflow() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(10_000));
        assert_eq!(RetryPolicy::new(u32::MAX).max_attempts(), u32::MAX);
    }

    #[test]
    fn custom_backoff() {
        let policy = RetryPolicy::new(2).with_backoff(Duration::from_millis(10), Duration::from_millis(15));
        assert_eq!(policy.delay_for(1), Duration::from_millis(10));
        assert_eq!(policy.delay_for(2), Duration::from_millis(15));
        assert_eq!(policy.max_attempts(), 3);
    }
}
