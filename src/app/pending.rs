//! Locally-commanded values the server has not confirmed yet.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Rating,
    Volume,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Correlation {
    Global,
    /// A track identity key.
    Item(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingWrite {
    pub value: u8,
    pub issued_at: Instant,
    /// Bumped on every write so a late rollback can tell whether it still
    /// owns the entry.
    pub seq: u64,
}

#[derive(Debug, Default)]
pub struct PendingWrites {
    entries: HashMap<(Attribute, Correlation), PendingWrite>,
    seq: u64,
}

impl PendingWrites {
    pub fn record(&mut self, attribute: Attribute, key: Correlation, value: u8, now: Instant) -> u64 {
        self.seq += 1;
        self.entries.insert(
            (attribute, key),
            PendingWrite {
                value,
                issued_at: now,
                seq: self.seq,
            },
        );
        self.seq
    }

    pub fn get(&self, attribute: Attribute, key: &Correlation) -> Option<&PendingWrite> {
        self.entries.get(&(attribute, key.clone()))
    }

    pub fn clear(&mut self, attribute: Attribute, key: &Correlation) -> Option<PendingWrite> {
        self.entries.remove(&(attribute, key.clone()))
    }

    pub fn clear_attribute(&mut self, attribute: Attribute) {
        self.entries.retain(|(a, _), _| *a != attribute);
    }

    /// Drops the entry when the server reports the pending value.
    pub fn converge(&mut self, attribute: Attribute, key: &Correlation, observed: u8) -> bool {
        match self.get(attribute, key) {
            Some(write) if write.value == observed => {
                self.clear(attribute, key);
                true
            }
            _ => false,
        }
    }

    /// True while the entry is younger than `window`. Expired entries are
    /// evicted on the way out.
    pub fn guarded(&mut self, attribute: Attribute, key: &Correlation, now: Instant, window: Duration) -> bool {
        match self.get(attribute, key) {
            Some(write) if now.saturating_duration_since(write.issued_at) <= window => true,
            Some(_) => {
                self.clear(attribute, key);
                false
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, &Correlation)> {
        self.entries.keys().map(|(attribute, key)| (*attribute, key))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
