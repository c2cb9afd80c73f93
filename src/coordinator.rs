use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::CacheStore;
use crate::config::SearchSpec;
use crate::identity::Identity;
use crate::scan::{self, Repository};

/// Worker pool size for concurrent per-root scans. Fixed, not derived from
/// the number of configured roots.
pub const CONCURRENT_SCANS: usize = 4;

/// Shared scan-in-flight flag with RAII lowering.
#[derive(Clone, Default)]
pub struct ScanFlag {
    raised: Arc<AtomicBool>,
}

impl ScanFlag {
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Raise the flag unless it is already raised. The returned guard lowers
    /// it again on drop, including on panic and error paths.
    pub fn try_raise(&self) -> Option<ScanFlagGuard> {
        self.raised
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
            .then(|| ScanFlagGuard {
                raised: Arc::clone(&self.raised),
            })
    }
}

pub struct ScanFlagGuard {
    raised: Arc<AtomicBool>,
}

impl Drop for ScanFlagGuard {
    fn drop(&mut self) {
        self.raised.store(false, Ordering::SeqCst);
    }
}

/// Fans per-root scans out across a bounded worker pool and commits the
/// collected result set to the cache as one snapshot.
#[derive(Clone)]
pub struct ScanCoordinator {
    cache: Arc<dyn CacheStore>,
    identity: Identity,
    flag: ScanFlag,
    runs: Arc<AtomicUsize>,
}

impl ScanCoordinator {
    pub fn new(cache: Arc<dyn CacheStore>, identity: Identity) -> Self {
        Self {
            cache,
            identity,
            flag: ScanFlag::default(),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn is_scan_running(&self) -> bool {
        self.flag.is_raised()
    }

    /// Scan runs completed since construction.
    pub fn completed_runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Run a full scan in the foreground and commit the result.
    ///
    /// Fails if a scan is already in flight.
    pub fn run_scan(
        &self,
        specs: &[SearchSpec],
        global_excludes: &[String],
    ) -> Result<Vec<Repository>> {
        let Some(guard) = self.flag.try_raise() else {
            anyhow::bail!("a scan is already running");
        };
        self.run_guarded(specs, global_excludes, guard)
    }

    /// Start a background scan unless one is already in flight.
    ///
    /// Returns immediately; a trigger while a scan is running is a no-op
    /// reporting `false`. Callers poll `is_scan_running` instead.
    pub fn trigger_scan(&self, specs: Vec<SearchSpec>, global_excludes: Vec<String>) -> bool {
        let Some(guard) = self.flag.try_raise() else {
            debug!("scan already running, ignoring trigger");
            return false;
        };

        let coordinator = self.clone();
        let spawned = thread::Builder::new()
            .name("scan-coordinator".to_string())
            .spawn(move || {
                if let Err(err) = coordinator.run_guarded(&specs, &global_excludes, guard) {
                    error!("background scan failed: {err:#}");
                }
            });

        match spawned {
            Ok(_) => true,
            Err(err) => {
                error!("failed to spawn background scan: {err}");
                false
            }
        }
    }

    fn run_guarded(
        &self,
        specs: &[SearchSpec],
        global_excludes: &[String],
        guard: ScanFlagGuard,
    ) -> Result<Vec<Repository>> {
        let _guard = guard;
        let start = Instant::now();

        if specs.is_empty() {
            warn!("no search roots configured, nothing to scan");
            return Ok(Vec::new());
        }

        let workers = CONCURRENT_SCANS.min(specs.len());
        let (job_tx, job_rx) = crossbeam_channel::bounded::<(usize, &SearchSpec)>(specs.len());
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, Vec<Repository>)>();

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let identity = &self.identity;
                scope.spawn(move || {
                    for (index, spec) in job_rx.iter() {
                        let repos = match scan::find_repos(spec, global_excludes, identity) {
                            Ok(repos) => repos,
                            Err(err) => {
                                error!("scan of {} failed: {err}", spec.path);
                                Vec::new()
                            }
                        };
                        if result_tx.send((index, repos)).is_err() {
                            break;
                        }
                    }
                });
            }

            // Capacity covers every job, so feeding never blocks. Dropping
            // the sender lets idle workers drain and exit before the scope's
            // join barrier.
            for job in specs.iter().enumerate() {
                let _ = job_tx.send(job);
            }
            drop(job_tx);
        });
        drop(result_tx);

        // Completion order is nondeterministic; reassemble by input index so
        // the committed snapshot follows the configured root order.
        let mut by_root: Vec<Vec<Repository>> = vec![Vec::new(); specs.len()];
        for (index, repos) in result_rx.iter() {
            by_root[index] = repos;
        }
        let repos: Vec<Repository> = by_root.into_iter().flatten().collect();

        self.cache
            .store(&repos)
            .context("failed to commit repository cache")?;

        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "scan #{run}: {} repo(s) across {} root(s) in {:.2?}",
            repos.len(),
            specs.len(),
            start.elapsed()
        );

        Ok(repos)
    }
}
