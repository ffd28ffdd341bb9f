//! Request pacing.
//!
//! External APIs and publisher sites expect polite clients. All delays
//! go through the [`Pacer`] trait so tests can swap sleeping out.

use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait Pacer: Send + Sync {
    async fn wait(&self, delay: Duration);
}

/// Production pacer: actually sleeps.
pub struct SleepPacer;

#[async_trait]
impl Pacer for SleepPacer {
    async fn wait(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Test pacer: records requested delays without sleeping.
#[derive(Default)]
pub struct NoopPacer {
    waits: std::sync::Mutex<Vec<Duration>>,
}

#[async_trait]
impl Pacer for NoopPacer {
    async fn wait(&self, delay: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(delay);
        }
    }
}

impl NoopPacer {
    pub fn recorded(&self) -> Vec<Duration> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }
}
