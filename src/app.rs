use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::coordinator::ScanCoordinator;
use crate::freshness::FreshnessController;
use crate::fuzzy;
use crate::identity::Identity;
use crate::scan::Repository;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LookupStatus {
    /// Results reflect the latest committed snapshot.
    Ready,
    /// A scan is in flight; results are provisional and possibly stale.
    Scanning,
    /// No search roots configured, so there is nothing to look up.
    Unconfigured,
}

#[derive(Debug)]
pub struct Lookup {
    pub repos: Vec<Repository>,
    pub status: LookupStatus,
}

/// The lookup surface: fuzzy search over the cached repository list, with
/// freshness handled in the background.
pub struct RepoFinder {
    config: Config,
    cache: Arc<dyn CacheStore>,
    coordinator: ScanCoordinator,
    freshness: FreshnessController,
}

impl RepoFinder {
    pub fn new(config: Config, config_path: Option<PathBuf>, cache: Arc<dyn CacheStore>) -> Self {
        let coordinator = ScanCoordinator::new(cache.clone(), Identity::current());
        let freshness = FreshnessController::new(cache.clone(), coordinator.clone(), config_path);
        Self {
            config,
            cache,
            coordinator,
            freshness,
        }
    }

    /// Fuzzy lookup against whatever the cache currently holds, triggering a
    /// background refresh first when the snapshot is stale.
    pub fn search(&self, query: &str) -> Lookup {
        if self.config.search_dirs.is_empty() {
            return Lookup {
                repos: Vec::new(),
                status: LookupStatus::Unconfigured,
            };
        }

        self.ensure_fresh();

        let repos = match self.cache.load() {
            Ok(Some(snapshot)) => snapshot.repos,
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("cache unreadable, returning empty interim result: {err:#}");
                Vec::new()
            }
        };

        let repos = fuzzy::filter(query, repos);
        let status = if self.is_scan_running() {
            LookupStatus::Scanning
        } else {
            LookupStatus::Ready
        };

        Lookup { repos, status }
    }

    /// Trigger a background rescan if the cache is stale. Never blocks.
    pub fn ensure_fresh(&self) -> bool {
        self.freshness.ensure_fresh(&self.config)
    }

    pub fn is_scan_running(&self) -> bool {
        self.coordinator.is_scan_running()
    }

    /// Rescan all configured roots in the foreground and commit the result.
    pub fn update(&self) -> Result<Vec<Repository>> {
        self.coordinator
            .run_scan(&self.config.search_dirs, &self.config.global_excludes)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FileCacheStore;
    use crate::config::SearchSpec;
    use std::fs;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn finder_for(root: Option<&std::path::Path>, cache_dir: &std::path::Path) -> RepoFinder {
        let mut config = Config::default();
        if let Some(root) = root {
            config.search_dirs.push(SearchSpec {
                path: root.to_string_lossy().into_owned(),
                depth: 3,
                name_depth: 1,
                excludes: Vec::new(),
            });
        }
        let store = Arc::new(FileCacheStore::with_path(cache_dir.join("repos.toml")));
        RepoFinder::new(config, None, store)
    }

    fn wait_until_idle(finder: &RepoFinder) {
        for _ in 0..500 {
            if !finder.is_scan_running() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("scan did not finish in time");
    }

    #[test]
    fn test_search_without_configuration_is_a_hint_not_a_scan() {
        let cache_dir = TempDir::new().unwrap();
        let finder = finder_for(None, cache_dir.path());

        let lookup = finder.search("anything");
        assert_eq!(lookup.status, LookupStatus::Unconfigured);
        assert!(lookup.repos.is_empty());
        assert!(!finder.is_scan_running());
    }

    #[test]
    fn test_search_with_empty_cache_triggers_background_scan() {
        let cache_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("acme-api/.git")).unwrap();
        fs::create_dir_all(root.path().join("dotfiles/.git")).unwrap();

        let finder = finder_for(Some(root.path()), cache_dir.path());

        // First lookup serves whatever is cached (nothing yet) and starts
        // the refresh in the background
        let _ = finder.search("");
        wait_until_idle(&finder);

        let lookup = finder.search("");
        assert_eq!(lookup.status, LookupStatus::Ready);
        let names: Vec<&str> = lookup.repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["acme-api", "dotfiles"]);
    }

    #[test]
    fn test_search_applies_fuzzy_filter() {
        let cache_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("acme-api/.git")).unwrap();
        fs::create_dir_all(root.path().join("dotfiles/.git")).unwrap();

        let finder = finder_for(Some(root.path()), cache_dir.path());
        finder.update().unwrap();

        let lookup = finder.search("api");
        assert_eq!(lookup.repos.len(), 1);
        assert_eq!(lookup.repos[0].name, "acme-api");
    }

    #[test]
    fn test_update_commits_synchronously() {
        let cache_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("solo/.git")).unwrap();

        let finder = finder_for(Some(root.path()), cache_dir.path());
        let repos = finder.update().unwrap();
        assert_eq!(repos.len(), 1);

        let lookup = finder.search("");
        assert_eq!(lookup.status, LookupStatus::Ready);
        assert_eq!(lookup.repos, repos);
    }
}
