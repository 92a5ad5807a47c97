use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for an in-memory store.
///
/// # Purpose
/// Controls how the in-memory connector behaves when dialed: how many leading
/// dials are refused and how long each dial takes. Both default to zero, which
/// makes the in-memory backend a plain, always-available store.
///
/// # Characteristics
/// - **Thread-Safe**: can be cloned and shared across threads
/// - **Lightweight Cloning**: uses `Arc` internally, clones share settings
#[derive(Default, Clone)]
pub struct InMemoryStoreConfig {
    inner: Arc<InMemoryStoreConfigInner>,
}

impl InMemoryStoreConfig {
    pub fn new() -> InMemoryStoreConfig {
        InMemoryStoreConfig {
            inner: Arc::new(InMemoryStoreConfigInner::default()),
        }
    }

    /// Number of leading dials that are refused.
    pub fn failing_dials(&self) -> u32 {
        self.inner.failing_dials.load(Ordering::Relaxed)
    }

    pub(crate) fn set_failing_dials(&self, count: u32) {
        self.inner.failing_dials.store(count, Ordering::Relaxed)
    }

    /// Time each dial takes before it succeeds or fails.
    pub fn dial_latency(&self) -> Duration {
        *self.inner.dial_latency.read()
    }

    pub(crate) fn set_dial_latency(&self, latency: Duration) {
        *self.inner.dial_latency.write() = latency;
    }
}

#[derive(Default)]
struct InMemoryStoreConfigInner {
    failing_dials: AtomicU32,
    dial_latency: RwLock<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InMemoryStoreConfig::new();
        assert_eq!(config.failing_dials(), 0);
        assert_eq!(config.dial_latency(), Duration::ZERO);
    }

    #[test]
    fn test_clones_share_settings() {
        let config = InMemoryStoreConfig::new();
        let clone = config.clone();
        config.set_failing_dials(3);
        config.set_dial_latency(Duration::from_millis(5));
        assert_eq!(clone.failing_dials(), 3);
        assert_eq!(clone.dial_latency(), Duration::from_millis(5));
    }
}
