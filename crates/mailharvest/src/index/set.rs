//! In-memory set of processed message ids with a one-shot load lifecycle.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, info, warn};

/// Load lifecycle of a [`ProcessedIdSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoadState {
    Uninitialized = 0,
    Loading = 1,
    Ready = 2,
}

impl LoadState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LoadState::Loading,
            2 => LoadState::Ready,
            _ => LoadState::Uninitialized,
        }
    }
}

/// Thread-safe set of processed ids.
///
/// `load_lock` is only taken while moving from `Uninitialized` to `Ready`;
/// once ready, membership checks and inserts only touch `ids`.
pub struct ProcessedIdSet {
    ids: RwLock<HashSet<String>>,
    state: AtomicU8,
    load_lock: Mutex<()>,
}

impl Default for ProcessedIdSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessedIdSet {
    pub fn new() -> Self {
        Self {
            ids: RwLock::new(HashSet::new()),
            state: AtomicU8::new(LoadState::Uninitialized as u8),
            load_lock: Mutex::new(()),
        }
    }

    pub fn state(&self) -> LoadState {
        LoadState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == LoadState::Ready
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read_ids().contains(id)
    }

    /// Inserts `id`; returns true only for the call that added it.
    pub fn insert(&self, id: &str) -> bool {
        let added = self.write_ids().insert(id.to_string());
        if added {
            debug!("Message id added to processed set: {}", id);
        }
        added
    }

    pub fn len(&self) -> usize {
        self.read_ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One-time bulk seed. Returns false if the set was already loaded.
    pub fn load<I>(&self, ids: I) -> bool
    where
        I: IntoIterator<Item = String>,
    {
        let loaded = self
            .ensure_loaded(|| Ok::<_, std::convert::Infallible>(ids))
            .unwrap_or(false);
        if !loaded {
            warn!("Processed-id set already loaded, ignoring new seed");
        }
        loaded
    }

    /// Runs `loader` exactly once across all callers.
    ///
    /// Concurrent callers block until the first one finishes. Returns
    /// `Ok(true)` for the call that performed the load, `Ok(false)` when the
    /// set was already ready. A failing loader leaves the set uninitialized
    /// so a later call can retry.
    pub fn ensure_loaded<F, I, E>(&self, loader: F) -> Result<bool, E>
    where
        F: FnOnce() -> Result<I, E>,
        I: IntoIterator<Item = String>,
    {
        if self.is_loaded() {
            return Ok(false);
        }

        let _guard = self.load_lock.lock().unwrap_or_else(|poisoned| {
            warn!("Processed-id load lock was poisoned, recovering");
            poisoned.into_inner()
        });

        if self.is_loaded() {
            return Ok(false);
        }

        self.state
            .store(LoadState::Loading as u8, Ordering::Release);

        let loaded = match loader() {
            Ok(ids) => ids,
            Err(e) => {
                self.state
                    .store(LoadState::Uninitialized as u8, Ordering::Release);
                return Err(e);
            }
        };

        let size = {
            let mut ids = self.write_ids();
            ids.extend(loaded);
            ids.len()
        };

        self.state.store(LoadState::Ready as u8, Ordering::Release);
        info!("Processed-id set loaded with {} entries", size);
        Ok(true)
    }

    fn read_ids(&self) -> RwLockReadGuard<'_, HashSet<String>> {
        self.ids.read().unwrap_or_else(|poisoned| {
            warn!("Processed-id set lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_ids(&self) -> RwLockWriteGuard<'_, HashSet<String>> {
        self.ids.write().unwrap_or_else(|poisoned| {
            warn!("Processed-id set lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_starts_uninitialized() {
        let set = ProcessedIdSet::new();
        assert_eq!(set.state(), LoadState::Uninitialized);
        assert!(!set.is_loaded());
        assert!(set.is_empty());
    }

    #[test]
    fn test_load_is_one_shot() {
        let set = ProcessedIdSet::new();
        assert!(set.load(ids(&["a", "b"])));
        assert!(!set.load(ids(&["c"])));

        assert!(set.is_loaded());
        assert_eq!(set.len(), 2);
        assert!(!set.contains("c"));
    }

    #[test]
    fn test_insert_reports_first_only() {
        let set = ProcessedIdSet::new();
        assert!(set.insert("x"));
        assert!(!set.insert("x"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_failed_loader_allows_retry() {
        let set = ProcessedIdSet::new();

        let first: Result<bool, &str> = set.ensure_loaded(|| Err::<Vec<String>, _>("disk gone"));
        assert_eq!(first, Err("disk gone"));
        assert_eq!(set.state(), LoadState::Uninitialized);

        let second: Result<bool, &str> = set.ensure_loaded(|| Ok(ids(&["a"])));
        assert_eq!(second, Ok(true));
        assert!(set.contains("a"));
    }

    #[test]
    fn test_concurrent_first_access_loads_once() {
        let set = Arc::new(ProcessedIdSet::new());
        let loads = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let set = Arc::clone(&set);
                let loads = Arc::clone(&loads);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    set.ensure_loaded(|| {
                        loads.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(20));
                        Ok::<_, ()>(vec!["seeded".to_string()])
                    })
                    .unwrap();
                    set.contains("seeded")
                })
            })
            .collect();

        for h in handles {
            assert!(h.join().unwrap());
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_inserts_yield_single_first() {
        let set = Arc::new(ProcessedIdSet::new());
        let firsts = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let set = Arc::clone(&set);
                let firsts = Arc::clone(&firsts);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    if set.insert("same") {
                        firsts.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(firsts.load(Ordering::SeqCst), 1);
        assert_eq!(set.len(), 1);
    }
}
