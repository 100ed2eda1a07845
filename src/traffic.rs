//! Process-wide traffic counters (§3, §4.10, §5).
//!
//! A single mutex guards the `(upload, download)` pair and the optional
//! reporting hook, mirroring the teacher crate's existing pattern of storing
//! a boxed closure (there: the user/pass validator) alongside server state.
//! The hook is invoked while the lock is held, so it must stay cheap and
//! non-blocking; callers that need to do real work off of an update should
//! hand off to their own queue/task.

use std::sync::{Arc, Mutex};

/// Hook invoked with the running totals after each update.
pub type TrafficHook = Arc<dyn Fn(u64, u64) + Send + Sync>;

struct Inner {
    upload: u64,
    download: u64,
    hook: Option<TrafficHook>,
}

/// Monotonically increasing upload/download byte totals, shared across all
/// sessions for the lifetime of the process.
#[derive(Clone)]
pub struct TrafficCounters {
    inner: Arc<Mutex<Inner>>,
}

impl TrafficCounters {
    pub fn new(hook: Option<TrafficHook>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                upload: 0,
                download: 0,
                hook,
            })),
        }
    }

    pub fn add_upload(&self, bytes: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.upload += bytes;
        if let Some(hook) = &inner.hook {
            hook(inner.upload, inner.download);
        }
    }

    pub fn add_download(&self, bytes: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.download += bytes;
        if let Some(hook) = &inner.hook {
            hook(inner.upload, inner.download);
        }
    }

    pub fn totals(&self) -> (u64, u64) {
        let inner = self.inner.lock().unwrap();
        (inner.upload, inner.download)
    }
}

impl Default for TrafficCounters {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn totals_accumulate_across_both_directions() {
        let counters = TrafficCounters::default();
        counters.add_upload(10);
        counters.add_download(3);
        counters.add_upload(5);
        assert_eq!(counters.totals(), (15, 3));
    }

    #[test]
    fn hook_observes_running_totals() {
        let seen = Arc::new(AtomicU64::new(0));
        let seen2 = seen.clone();
        let counters = TrafficCounters::new(Some(Arc::new(move |up, _down| {
            seen2.store(up, Ordering::SeqCst);
        })));
        counters.add_upload(42);
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }
}
