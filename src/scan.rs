use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::config::{self, SearchSpec};
use crate::exclude::ExcludeMatcher;
use crate::identity::Identity;

/// Filesystem entry whose presence marks a directory as a repository root.
pub const REPO_MARKER: &str = ".git";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub path: PathBuf,
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path.display())
    }
}

/// A search root whose traversal could not be started at all.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to walk search root {root}: {source}")]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },
}

/// Derive the display name for a repository root.
///
/// `name_depth` counts ancestors of the marker: 1 names the repo after its
/// own directory, 2 after the parent, and so on. Depths beyond the number of
/// path components fall back to the final component.
pub fn resolve_name(path: &Path, name_depth: usize) -> String {
    let leaf = || {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned())
    };

    if name_depth <= 1 {
        return leaf();
    }

    let components: Vec<&OsStr> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name),
            _ => None,
        })
        .collect();

    if name_depth > components.len() {
        warn!(
            "{}: name depth is {}, but only {} levels in file tree",
            path.display(),
            name_depth,
            components.len()
        );
        return leaf();
    }

    components[components.len() - name_depth]
        .to_string_lossy()
        .into_owned()
}

/// Scan one configured search root for repository markers.
///
/// Follows symlinks down to `spec.depth` levels. Directories the identity
/// cannot read and search are pruned without a diagnostic; a root that does
/// not exist contributes nothing. Only a walk that cannot start at all is an
/// error, and the caller decides what that means for the overall run.
pub fn find_repos(
    spec: &SearchSpec,
    global_excludes: &[String],
    identity: &Identity,
) -> Result<Vec<Repository>, ScanError> {
    let start = Instant::now();
    let root = config::expand_home(&spec.path);

    if !root.exists() {
        error!("search root does not exist: {}", root.display());
        return Ok(Vec::new());
    }
    if !identity.can_enter(&root) {
        debug!("cannot enter search root {}", root.display());
        return Ok(Vec::new());
    }

    let matcher = ExcludeMatcher::new(
        spec.excludes
            .iter()
            .map(String::as_str)
            .chain(global_excludes.iter().map(String::as_str)),
    );

    let mut repos = Vec::new();
    let mut entries = WalkDir::new(&root)
        .follow_links(true)
        .max_depth(spec.depth)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                if err.depth() == 0 {
                    return Err(ScanError::Walk { root, source: err });
                }
                // Unreadable entries are pruned, not fatal
                debug!("skipping unreadable entry under {}: {err}", root.display());
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        if entry.file_name() == REPO_MARKER {
            if entry.file_type().is_dir() {
                entries.skip_current_dir();
            }
            let Some(candidate) = entry.path().parent() else {
                continue;
            };
            if matcher.is_excluded(candidate) {
                debug!("excluded candidate {}", candidate.display());
                continue;
            }
            repos.push(Repository {
                name: resolve_name(candidate, spec.name_depth),
                path: candidate.to_path_buf(),
            });
            continue;
        }

        if entry.file_type().is_dir() && !identity.can_enter(entry.path()) {
            entries.skip_current_dir();
        }
    }

    debug!(
        "{} repo(s) found in {} in {:.2?}",
        repos.len(),
        root.display(),
        start.elapsed()
    );

    Ok(repos)
}
