//! Mutual exclusion for recurring work: a single-flight guard for the tick
//! loop and a keyed variant for per-resource exclusion.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

/// At most one run active at a time. Ticks that find the guard held no-op
/// instead of stacking runs.
#[derive(Debug, Default)]
pub struct SingleFlight {
    running: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// The permit releases on drop, on every exit path including panics.
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                running: self.running.clone(),
            })
    }
}

#[derive(Debug)]
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Exclusion by key: at most one holder per key at a time.
#[derive(Debug, Default)]
pub struct KeyedLock {
    held: Arc<Mutex<HashSet<String>>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, key: &str) -> Option<KeyPermit> {
        let mut held = self.held.lock().expect("keyed lock mutex poisoned");
        if !held.insert(key.to_string()) {
            return None;
        }
        Some(KeyPermit {
            held: self.held.clone(),
            key: key.to_string(),
        })
    }
}

#[derive(Debug)]
pub struct KeyPermit {
    held: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for KeyPermit {
    fn drop(&mut self) {
        self.held
            .lock()
            .expect("keyed lock mutex poisoned")
            .remove(&self.key);
    }
}
