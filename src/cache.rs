//! Memoized per-leg flight lengths.
//!
//! A leg's outcome is a pure function of where it starts (rounded), the
//! target it flies to and the target after that (which steers corner
//! cutting). Entries live for one planning session and are shared by
//! every worker; racing writers store identical values, so the last
//! write simply wins.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::geometry::{Point, PointKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LegKey {
    pub start: PointKey,
    pub target: usize,
    pub next: Option<usize>,
}

impl LegKey {
    pub fn new(start: Point, target: usize, next: Option<usize>) -> Self {
        Self {
            start: start.key(),
            target,
            next,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegSummary {
    pub moves: usize,
    pub end: Point,
}

#[derive(Debug, Default)]
pub struct FlightLengthCache {
    entries: RwLock<HashMap<LegKey, LegSummary>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FlightLengthCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &LegKey) -> Option<LegSummary> {
        let found = self.entries.read().get(key).copied();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn insert(&self, key: LegKey, summary: LegSummary) {
        self.entries.write().insert(key, summary);
    }

    /// Look up `key`, computing and storing it on a miss. The lock is
    /// not held while `compute` runs.
    pub fn get_or_compute<E>(
        &self,
        key: LegKey,
        compute: impl FnOnce() -> Result<LegSummary, E>,
    ) -> Result<LegSummary, E> {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let summary = compute()?;
        self.insert(key, summary);
        Ok(summary)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
