//! Bookkeeping of preload-populated keys.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{CacheKey, StoreView};

/// A key the preloader fetched proactively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreloadRecord {
    pub key: CacheKey,
    pub requested_at: DateTime<Utc>,
}

/// Preload-populated keys still present in the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreloadStats {
    pub preloaded_count: usize,
    /// In the order the fetches were requested.
    pub preloaded_keys: Vec<CacheKey>,
}

struct Tracked {
    record: PreloadRecord,
    /// Identifies the fetch that opened the record. Tickets increase, so
    /// they also give the request order.
    ticket: u64,
    /// Set once the fetched value is in the store.
    loaded: bool,
}

/// All records, keyed by cache key.
///
/// A record is opened when a fetch is issued and marked loaded when its
/// value is stored. Each fetch holds a ticket; a cleared or replaced
/// record invalidates the ticket, so a late result can tell it is stale.
#[derive(Default)]
pub(crate) struct RecordBook {
    records: HashMap<CacheKey, Tracked>,
    next: u64,
}

impl RecordBook {
    /// Open a record for a fetch about to be issued and return its ticket.
    pub(crate) fn open(&mut self, key: &CacheKey, requested_at: DateTime<Utc>) -> u64 {
        let ticket = self.next;
        self.next += 1;
        self.records.insert(
            key.clone(),
            Tracked {
                record: PreloadRecord {
                    key: key.clone(),
                    requested_at,
                },
                ticket,
                loaded: false,
            },
        );
        ticket
    }

    /// Mark the record loaded if `ticket` is still current.
    pub(crate) fn finish(&mut self, key: &CacheKey, ticket: u64) -> bool {
        match self.records.get_mut(key) {
            Some(tracked) if tracked.ticket == ticket => {
                tracked.loaded = true;
                true
            }
            _ => false,
        }
    }

    /// Drop the record for a failed fetch if `ticket` is still current.
    pub(crate) fn abandon(&mut self, key: &CacheKey, ticket: u64) {
        if self.records.get(key).is_some_and(|t| t.ticket == ticket) {
            self.records.remove(key);
        }
    }

    /// Remove every record, invalidating all outstanding tickets.
    pub(crate) fn clear(&mut self) -> usize {
        let cleared = self.records.len();
        self.records.clear();
        cleared
    }

    /// Drop loaded records whose keys have left the cache and report the rest.
    pub(crate) fn prune_and_report(&mut self, view: &StoreView<'_>) -> PreloadStats {
        self.records
            .retain(|key, tracked| !tracked.loaded || view.contains(key));

        let mut live: Vec<&Tracked> = self.records.values().filter(|t| t.loaded).collect();
        live.sort_by_key(|t| t.ticket);

        PreloadStats {
            preloaded_count: live.len(),
            preloaded_keys: live.iter().map(|t| t.record.key.clone()).collect(),
        }
    }

    /// Loaded records, in request order.
    pub(crate) fn records(&self) -> Vec<PreloadRecord> {
        let mut live: Vec<&Tracked> = self.records.values().filter(|t| t.loaded).collect();
        live.sort_by_key(|t| t.ticket);
        live.into_iter().map(|t| t.record.clone()).collect()
    }
}
