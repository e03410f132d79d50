use std::sync::{Arc, RwLock};

/// Counters for the sync protocol, exposed for diagnostics.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub fetches_ok: u64,
    pub fetches_failed: u64,
    pub mutations_confirmed: u64,
    pub mutations_rolled_back: u64,
    /// Requests refused because the same key was already in flight
    pub actions_rejected: u64,
    /// Settled overlay entries cleared by a fresh fetch
    pub overlay_entries_cleared: u64,
}

/// Thread-safe wrapper for sync stats
#[derive(Debug, Clone)]
pub struct SharedSyncStats {
    inner: Arc<RwLock<SyncStats>>,
}

impl Default for SharedSyncStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedSyncStats {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SyncStats::default())),
        }
    }

    fn update(&self, f: impl FnOnce(&mut SyncStats)) {
        if let Ok(mut stats) = self.inner.write() {
            f(&mut stats);
        }
    }

    pub fn record_fetch(&self, ok: bool, cleared: usize) {
        self.update(|s| {
            if ok {
                s.fetches_ok += 1;
                s.overlay_entries_cleared += cleared as u64;
            } else {
                s.fetches_failed += 1;
            }
        });
    }

    pub fn record_confirmed(&self) {
        self.update(|s| s.mutations_confirmed += 1);
    }

    pub fn record_rollback(&self) {
        self.update(|s| s.mutations_rolled_back += 1);
    }

    pub fn record_rejected(&self) {
        self.update(|s| s.actions_rejected += 1);
    }

    pub fn snapshot(&self) -> SyncStats {
        self.inner
            .read()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_stats_are_shared() {
        let stats = SharedSyncStats::new();
        let clone = stats.clone();
        clone.record_fetch(true, 2);
        clone.record_fetch(false, 5);
        stats.record_rejected();

        let snap = stats.snapshot();
        assert_eq!(snap.fetches_ok, 1);
        assert_eq!(snap.fetches_failed, 1);
        assert_eq!(snap.overlay_entries_cleared, 2);
        assert_eq!(snap.actions_rejected, 1);
    }
}
