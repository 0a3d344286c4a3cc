//! # FilterRegistry — the name→filter map and its maintenance loop
//!
//! ```text
//! Request surface
//!   |
//!   v
//! ┌──────────────────────────────────────────────┐
//! │              FilterRegistry                   │
//! │                                                │
//! │  add/get -> HashMap<name, Arc<Filter>>        │
//! │                                                │
//! │  work() -- background loop --                 │
//! │    every force_dump_period:                   │
//! │      for each filter (one task each):         │
//! │        filter.period_maintenance(force)       │
//! │      join all tasks, then next tick           │
//! │    on stop(): one final force=true pass        │
//! └──────────────────────────────────────────────┘
//!          |
//!          v
//!   PersistenceProvider (snapshot writers/readers)
//! ```
//!
//! Rotation cadence (per rotated filter, `rotate_interval`) and snapshot
//! cadence (`force_dump_period`, process-wide) are decoupled: a classic
//! filter never rotates, it only dumps when the tick is a forced one.
mod error;
mod filter;

pub use error::EngineError;
pub use filter::{CreateOptions, Filter};

use config::EngineConfig;
use persist::PersistenceProvider;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{Notify, RwLock};

/// A name→filter map with a background maintenance loop.
pub struct FilterRegistry {
    filters: RwLock<HashMap<String, Arc<Filter>>>,
    provider: Arc<dyn PersistenceProvider>,
    force_dump_period: Duration,
    use_gzip: bool,
    last_force: Mutex<Instant>,
    stopping: AtomicBool,
    stop_notify: Notify,
}

impl FilterRegistry {
    pub fn new(provider: Arc<dyn PersistenceProvider>, cfg: &EngineConfig) -> Self {
        Self {
            filters: RwLock::new(HashMap::new()),
            provider,
            force_dump_period: cfg.force_dump_period(),
            use_gzip: cfg.use_gzip,
            last_force: Mutex::new(Instant::now()),
            stopping: AtomicBool::new(false),
            stop_notify: Notify::new(),
        }
    }

    /// Rejects duplicate names; validates via the kind's constructor; inserts
    /// under the map's write lock.
    pub async fn add(&self, options: CreateOptions) -> Result<Arc<Filter>, EngineError> {
        let name = options.name().to_string();
        let mut guard = self.filters.write().await;
        if guard.contains_key(&name) {
            return Err(EngineError::DuplicateName(name));
        }
        let filter = Arc::new(Filter::new(options)?);
        guard.insert(name, filter.clone());
        Ok(filter)
    }

    pub async fn get(&self, name: &str) -> Result<Arc<Filter>, EngineError> {
        let guard = self.filters.read().await;
        guard
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(name.to_string()))
    }

    /// Sequential batch insert (the source's per-key goroutine fan-out is not
    /// load-bearing; hashing and bit operations are cache-bound, not worth a
    /// task per key).
    pub async fn batch_add(&self, name: &str, keys: &[Vec<u8>]) -> Result<(), EngineError> {
        let filter = self.get(name).await?;
        for key in keys {
            filter.add(key);
        }
        Ok(())
    }

    /// Sequential batch test; returns per-key results and the positive count.
    pub async fn batch_test(
        &self,
        name: &str,
        keys: &[Vec<u8>],
    ) -> Result<(Vec<bool>, usize), EngineError> {
        let filter = self.get(name).await?;
        let mut bits = Vec::with_capacity(keys.len());
        let mut positives = 0usize;
        for key in keys {
            let hit = filter.test(key);
            positives += hit as usize;
            bits.push(hit);
        }
        Ok((bits, positives))
    }

    /// Lists published snapshots, loads and inserts each. A per-filter load
    /// failure is logged and skipped; it never aborts recovery of the others.
    pub async fn recover(&self) -> Result<(), EngineError> {
        let names = self.provider.list_filter_names()?;
        for name in names {
            match self.load_one(&name) {
                Ok(filter) => {
                    self.filters.write().await.insert(name.clone(), Arc::new(filter));
                    tracing::info!(filter = %name, "recovered filter");
                }
                Err(err) => {
                    tracing::warn!(filter = %name, error = %err, "skipping unrecoverable snapshot");
                }
            }
        }
        Ok(())
    }

    fn load_one(&self, name: &str) -> Result<Filter, EngineError> {
        let mut reader = self.provider.new_reader(name)?;
        Filter::load_framed(&mut reader)
    }

    /// The background maintenance loop. Runs until [`stop`](Self::stop) is
    /// called, then performs one final forced pass before returning.
    pub async fn work(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.force_dump_period);
        ticker.tick().await; // first tick fires immediately; skip it

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let force = self.due_for_force();
                    self.run_maintenance_pass(force).await;
                    if self.stopping.load(Ordering::SeqCst) {
                        break;
                    }
                }
                _ = self.stop_notify.notified() => {
                    self.run_maintenance_pass(true).await;
                    break;
                }
            }
        }
    }

    /// Requests graceful shutdown. `work` returns after its final forced pass.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.stop_notify.notify_one();
    }

    fn due_for_force(&self) -> bool {
        let mut last_force = self.last_force.lock().expect("last_force lock poisoned");
        let now = Instant::now();
        if now.duration_since(*last_force) >= self.force_dump_period {
            *last_force = now;
            true
        } else {
            false
        }
    }

    async fn run_maintenance_pass(&self, force: bool) {
        let filters: Vec<Arc<Filter>> = self.filters.read().await.values().cloned().collect();
        let use_gzip = self.use_gzip;

        let mut handles = Vec::with_capacity(filters.len());
        for filter in filters {
            let provider = self.provider.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                let name = filter.name().to_string();
                match filter.period_maintenance(provider.as_ref(), force, use_gzip) {
                    Ok(()) => tracing::info!(filter = %name, force, "maintenance pass complete"),
                    Err(err) => {
                        tracing::warn!(filter = %name, error = %err, "maintenance pass failed")
                    }
                }
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
    }
}
