use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use crate::cache::{self, CacheSnapshot, CacheStore};
use crate::config::{self, Config};
use crate::coordinator::ScanCoordinator;

/// Decide whether a cache snapshot must be replaced.
///
/// Stale when the snapshot is absent or empty, older than the update
/// interval, or predates the last configuration change. Evaluated afresh on
/// every lookup; there is no persistent freshness state.
pub fn snapshot_is_stale(
    snapshot: Option<&CacheSnapshot>,
    config_modified_at: Option<i64>,
    now: i64,
    interval: Duration,
) -> bool {
    let Some(snapshot) = snapshot else {
        return true;
    };
    if snapshot.repos.is_empty() {
        return true;
    }
    if snapshot.age(now) > interval {
        return true;
    }
    if let Some(modified) = config_modified_at {
        if modified > snapshot.written_at {
            return true;
        }
    }
    false
}

/// Triggers background rescans when the cache goes stale; never blocks the
/// calling lookup.
pub struct FreshnessController {
    cache: Arc<dyn CacheStore>,
    coordinator: ScanCoordinator,
    config_path: Option<PathBuf>,
}

impl FreshnessController {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        coordinator: ScanCoordinator,
        config_path: Option<PathBuf>,
    ) -> Self {
        Self {
            cache,
            coordinator,
            config_path,
        }
    }

    /// Re-evaluate freshness and kick off a background scan if needed.
    ///
    /// Returns whether a scan was triggered. Triggering while a scan is
    /// already in flight is a no-op (see `ScanCoordinator::trigger_scan`).
    pub fn ensure_fresh(&self, config: &Config) -> bool {
        if config.search_dirs.is_empty() {
            return false;
        }

        let snapshot = self.cache.load().unwrap_or_else(|err| {
            warn!("cache load failed, treating as empty: {err:#}");
            None
        });
        let config_modified = self
            .config_path
            .as_deref()
            .and_then(config::modified_at)
            .and_then(to_unix);

        if !snapshot_is_stale(
            snapshot.as_ref(),
            config_modified,
            cache::unix_now(),
            config.update_interval(),
        ) {
            return false;
        }

        debug!("repository cache is stale, triggering background scan");
        self.coordinator
            .trigger_scan(config.search_dirs.clone(), config.global_excludes.clone())
    }

    pub fn is_scan_running(&self) -> bool {
        self.coordinator.is_scan_running()
    }
}

fn to_unix(time: SystemTime) -> Option<i64> {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs() as i64)
}
