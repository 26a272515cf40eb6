use std::time::Duration;
use std::time::Instant;

#[cfg(feature = "json_schema")]
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::FileStat;

/// Hit and miss counters of a path's metadata cache.
#[cfg_attr(feature = "json_schema", derive(JsonSchema))]
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Hash, Eq)]
pub struct CacheStats {
    /// Reads answered from the cached snapshot.
    pub hits: u64,
    /// Reads that had to go to the filesystem.
    pub misses: u64,
}

#[derive(Debug, Clone)]
struct Entry {
    stat: FileStat,
    taken_at: Instant,
}

/// Single-entry, time-boxed metadata cache owned by one `Path`.
///
/// Staleness is only checked on read; nothing expires in the background and
/// changes made to the filesystem within the window are not observed.
#[derive(Debug, Default)]
pub(crate) struct StatCache {
    entry: Option<Entry>,
    stats: CacheStats,
}

impl StatCache {
    /// Returns the snapshot if it was taken less than `window` before `now`.
    pub(crate) fn get(&mut self, now: Instant, window: Duration) -> Option<&FileStat> {
        let fresh = self
            .entry
            .as_ref()
            .is_some_and(|e| now.saturating_duration_since(e.taken_at) < window);
        if fresh {
            self.stats.hits += 1;
            self.entry.as_ref().map(|e| &e.stat)
        } else {
            self.stats.misses += 1;
            None
        }
    }

    pub(crate) fn put(&mut self, stat: FileStat, now: Instant) {
        self.entry = Some(Entry {
            stat,
            taken_at: now,
        });
    }

    pub(crate) fn clear(&mut self) {
        self.entry = None;
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub(crate) fn stats(&self) -> CacheStats {
        self.stats
    }
}
