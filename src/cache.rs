use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::warn;

use crate::scan::Repository;

/// Bumped whenever the snapshot shape changes; older snapshots are discarded.
pub const CACHE_VERSION: u32 = 1;

/// One complete, atomically committed scan result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub version: u32,
    /// Unix seconds at commit time.
    pub written_at: i64,
    #[serde(default)]
    pub repos: Vec<Repository>,
}

impl CacheSnapshot {
    /// Age of the snapshot relative to `now` (unix seconds).
    pub fn age(&self, now: i64) -> Duration {
        Duration::from_secs(now.saturating_sub(self.written_at).max(0) as u64)
    }
}

/// Persistence seam for the repository list.
///
/// A load that cannot produce a usable snapshot reports `None`, never an
/// error: unreadable, corrupt and old-format caches all mean "no data yet".
pub trait CacheStore: Send + Sync {
    fn load(&self) -> Result<Option<CacheSnapshot>>;

    /// Replace the snapshot wholesale with `repos`, stamped with the current
    /// time. Readers see either the previous or the new snapshot, never a
    /// partial one.
    fn store(&self, repos: &[Repository]) -> Result<()>;
}

/// TOML-file-backed store under the user's cache directory.
pub struct FileCacheStore {
    cache_path: PathBuf,
}

impl FileCacheStore {
    pub fn new() -> Result<Self> {
        Ok(Self {
            cache_path: Self::get_default_cache_path()?,
        })
    }

    pub fn with_path<P: AsRef<Path>>(cache_path: P) -> Self {
        Self {
            cache_path: cache_path.as_ref().to_path_buf(),
        }
    }

    fn get_default_cache_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "reposcout")
            .context("Failed to determine project directories")?;

        Ok(proj_dirs.cache_dir().join("repos.toml"))
    }
}

impl CacheStore for FileCacheStore {
    fn load(&self) -> Result<Option<CacheSnapshot>> {
        if !self.cache_path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.cache_path).with_context(|| {
            format!("Failed to read cache file: {}", self.cache_path.display())
        })?;

        let snapshot: CacheSnapshot = match toml::from_str(&contents) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(
                    "discarding unreadable cache {}: {err}",
                    self.cache_path.display()
                );
                return Ok(None);
            }
        };

        if snapshot.version != CACHE_VERSION {
            warn!(
                "discarding cache with version {} (expected {})",
                snapshot.version, CACHE_VERSION
            );
            return Ok(None);
        }

        Ok(Some(snapshot))
    }

    fn store(&self, repos: &[Repository]) -> Result<()> {
        let snapshot = CacheSnapshot {
            version: CACHE_VERSION,
            written_at: unix_now(),
            repos: repos.to_vec(),
        };

        let contents =
            toml::to_string_pretty(&snapshot).context("Failed to serialize cache to TOML")?;

        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent).context("Failed to create cache directory")?;
        }

        // Write-then-rename so readers never observe a half-written snapshot
        let tmp_path = self.cache_path.with_extension("toml.tmp");
        fs::write(&tmp_path, contents)
            .with_context(|| format!("Failed to write cache file: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.cache_path).with_context(|| {
            format!("Failed to commit cache file: {}", self.cache_path.display())
        })?;

        Ok(())
    }
}

/// Current time as unix seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
