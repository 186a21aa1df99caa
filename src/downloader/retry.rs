use std::time::Duration;

/// 重试策略：最多尝试 `attempts` 次，第 n 次重试前等待 `n * backoff_base`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff_base: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff_base,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }

    pub fn is_last(&self, attempt: u32) -> bool {
        attempt + 1 >= self.attempts
    }
}
