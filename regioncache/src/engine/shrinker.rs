//! Background thread enforcing expiry and idle limits on memory tiers.

use crate::engine::log::{engine_log, EngineLog};
use crate::engine::region::CompositeCache;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub(crate) type RegionMap = Arc<RwLock<HashMap<String, Arc<CompositeCache>>>>;

/// Periodically shrinks every region's memory tier.
///
/// Stops when [`MemoryShrinker::stop`] is called or the value is dropped.
pub struct MemoryShrinker {
    thread_handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl MemoryShrinker {
    /// Spawn the shrinker thread.
    pub(crate) fn start(
        regions: RegionMap,
        interval: Duration,
        log: Arc<dyn EngineLog>,
    ) -> io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let thread_handle = thread::Builder::new()
            .name("cache-shrinker".to_string())
            .spawn(move || Self::run_loop(regions, interval, log, shutdown_clone))?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            shutdown,
        })
    }

    fn run_loop(
        regions: RegionMap,
        interval: Duration,
        log: Arc<dyn EngineLog>,
        shutdown: Arc<AtomicBool>,
    ) {
        // Short naps so stop() returns promptly
        let check_interval = interval
            .min(Duration::from_millis(250))
            .max(Duration::from_millis(1));
        let mut elapsed = Duration::ZERO;

        loop {
            if shutdown.load(Ordering::Relaxed) {
                engine_log!(log, Fine, "Memory shrinker received shutdown signal");
                break;
            }

            thread::sleep(check_interval);
            elapsed += check_interval;

            if elapsed >= interval {
                elapsed = Duration::ZERO;
                Self::shrink_all(&regions, log.as_ref());
            }
        }
    }

    fn shrink_all(regions: &RegionMap, log: &dyn EngineLog) {
        let snapshot: Vec<Arc<CompositeCache>> = regions.read().values().cloned().collect();
        for region in snapshot {
            let report = region.shrink();
            if report.expired + report.idle > 0 {
                engine_log!(
                    log,
                    Finer,
                    "Shrunk {}: {} expired, {} idle, {} spooled",
                    region.name(),
                    report.expired,
                    report.idle,
                    report.spooled
                );
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle.is_some()
    }

    /// Signal the thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MemoryShrinker {
    fn drop(&mut self) {
        self.stop();
    }
}
