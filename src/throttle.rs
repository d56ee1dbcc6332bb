use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Pacing policy applied between consecutive listings of a batch
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn pause(&self);
}

/// Sleep for the same duration every time
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl Throttle for FixedDelay {
    async fn pause(&self) {
        if self.delay.is_zero() {
            return;
        }
        debug!(delay_ms = self.delay.as_millis() as u64, "Pausing before next listing");
        tokio::time::sleep(self.delay).await;
    }
}
