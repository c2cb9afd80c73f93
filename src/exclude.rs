use glob::Pattern;
use std::path::Path;
use tracing::warn;

/// Compiled exclusion patterns, matched against the full candidate path.
///
/// Shell-glob semantics (`*`, `?`, `[...]`); `*` may cross path separators,
/// so `*/vendor/*` excludes anything with a `vendor` component.
#[derive(Debug, Default)]
pub struct ExcludeMatcher {
    patterns: Vec<Pattern>,
}

impl ExcludeMatcher {
    /// Compile the given patterns. Invalid patterns are logged and dropped
    /// rather than failing the scan.
    pub fn new<'a, I>(patterns: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|raw| match Pattern::new(raw) {
                Ok(pattern) => Some(pattern),
                Err(err) => {
                    warn!("ignoring invalid exclude pattern '{raw}': {err}");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// True if any pattern matches `path`. An empty set matches nothing.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.patterns.iter().any(|p| p.matches_path(path))
    }
}
