use async_trait::async_trait;
use std::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Pause between consecutive requests to VK and Yandex Disk
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(300);

/// Spaces out consecutive requests to a remote service.
#[async_trait]
pub trait RequestGate: Send + Sync {
    /// Resolves once the next request may be sent.
    async fn wait(&self);
}

/// Lets one request through per interval. The first call never waits.
pub struct FixedIntervalGate {
    interval: Duration,
    last_pass: Mutex<Option<Instant>>,
}

impl FixedIntervalGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_pass: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn remaining(&self) -> Option<Duration> {
        match self.last_pass.lock() {
            Ok(last_pass) => last_pass.and_then(|last| {
                let elapsed = last.elapsed();
                if elapsed < self.interval {
                    Some(self.interval - elapsed)
                } else {
                    None
                }
            }),
            Err(e) => {
                log::warn!("Failed to acquire rate gate lock (non-critical): {}", e);
                None
            }
        }
    }

    fn mark_pass(&self) {
        match self.last_pass.lock() {
            Ok(mut last_pass) => *last_pass = Some(Instant::now()),
            Err(e) => log::warn!("Failed to update rate gate (non-critical): {}", e),
        }
    }
}

impl Default for FixedIntervalGate {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_INTERVAL)
    }
}

#[async_trait]
impl RequestGate for FixedIntervalGate {
    async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }

        // Guard is dropped before sleeping
        if let Some(wait_time) = self.remaining() {
            log::debug!("Rate gate: waiting {:?}", wait_time);
            sleep(wait_time).await;
        }
        self.mark_pass();
    }
}
