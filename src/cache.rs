//! Per-view result cache. The only data the renderer reads.
//!
//! Every fetch takes a sequence number from one process-wide counter when it starts.
//! A completion lands only if its number is newer than the last one applied to the
//! entry and newer than the entry itself, so results arriving out of order, or for a
//! view that has since been popped, are dropped.

use crate::error::ErrorKind;
use crate::model::{Detail, Item, Payload};
use crate::view::ViewKey;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: ViewKey,
    pub items: Vec<Item>,
    pub detail: Option<Detail>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub in_flight: bool,
    pub last_error: Option<ErrorKind>,
    /// Sequence number of the outstanding fetch, if any.
    pub pending_seq: Option<u64>,
    pub applied_seq: u64,
    pub created_seq: u64,
}

impl CacheEntry {
    fn new(key: ViewKey, created_seq: u64) -> Self {
        Self {
            key,
            items: Vec::new(),
            detail: None,
            fetched_at: None,
            in_flight: false,
            last_error: None,
            pending_seq: None,
            applied_seq: 0,
            created_seq,
        }
    }

    /// Nothing has landed yet and a fetch is running.
    pub fn is_loading(&self) -> bool {
        self.fetched_at.is_none() && self.in_flight
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// An equal or newer fetch already landed.
    Stale,
    /// The entry is gone (view popped or context switched).
    Orphaned,
}

#[derive(Debug, Default)]
pub struct ViewCache {
    entries: HashMap<ViewKey, CacheEntry>,
    seq: u64,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn insert(&mut self, key: ViewKey) {
        let created = self.next_seq();
        self.entries.insert(key, CacheEntry::new(key, created));
    }

    pub fn remove(&mut self, key: ViewKey) -> Option<CacheEntry> {
        self.entries.remove(&key)
    }

    pub fn get(&self, key: ViewKey) -> Option<&CacheEntry> {
        self.entries.get(&key)
    }

    pub fn contains(&self, key: ViewKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Mark the entry in flight and hand out a sequence number. `None` if the entry
    /// does not exist or already has a fetch outstanding.
    pub fn begin_fetch(&mut self, key: ViewKey) -> Option<u64> {
        if self.entries.get(&key)?.in_flight {
            return None;
        }
        let seq = self.next_seq();
        let entry = self.entries.get_mut(&key)?;
        entry.in_flight = true;
        entry.pending_seq = Some(seq);
        Some(seq)
    }

    /// Forget the outstanding fetch without applying anything (its task was aborted).
    pub fn release(&mut self, key: ViewKey) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.in_flight = false;
            entry.pending_seq = None;
        }
    }

    pub fn complete(
        &mut self,
        key: ViewKey,
        seq: u64,
        result: Result<Payload, ErrorKind>,
        now: DateTime<Utc>,
    ) -> WriteOutcome {
        let Some(entry) = self.entries.get_mut(&key) else {
            return WriteOutcome::Orphaned;
        };
        if seq <= entry.created_seq {
            return WriteOutcome::Orphaned;
        }
        if entry.pending_seq == Some(seq) {
            entry.in_flight = false;
            entry.pending_seq = None;
        }
        if seq <= entry.applied_seq {
            return WriteOutcome::Stale;
        }

        entry.applied_seq = seq;
        match result {
            Ok(payload) => {
                let (items, detail) = payload.into_parts();
                entry.items = items;
                entry.detail = detail;
                entry.fetched_at = Some(now);
                entry.last_error = None;
            }
            Err(e) => {
                // Keep whatever was showing; the banner explains why it is stale.
                entry.last_error = Some(e);
            }
        }
        WriteOutcome::Applied
    }
}
