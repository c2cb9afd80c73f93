use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// How often the repository cache is refreshed unless overridden.
pub const DEFAULT_UPDATE_INTERVAL_MINS: u64 = 180;

/// Environment variable overriding the configured update interval.
pub const UPDATE_INTERVAL_ENV: &str = "REPOSCOUT_UPDATE_MINS";

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Config {
    pub version: u32,
    #[serde(default)]
    pub search_dirs: Vec<SearchSpec>,
    #[serde(default)]
    pub global_excludes: Vec<String>,
    #[serde(default = "default_update_interval_mins")]
    pub update_interval_mins: u64,
}

/// One configured search root. `path` may start with `~`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct SearchSpec {
    pub path: String,
    /// How many levels below the root the repository marker may sit.
    #[serde(default = "default_depth")]
    pub depth: usize,
    /// Which ancestor of the marker names the repo (1 = the repo dir itself).
    #[serde(default = "default_name_depth")]
    pub name_depth: usize,
    #[serde(default)]
    pub excludes: Vec<String>,
}

fn default_depth() -> usize {
    2
}

fn default_name_depth() -> usize {
    1
}

fn default_update_interval_mins() -> u64 {
    DEFAULT_UPDATE_INTERVAL_MINS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            search_dirs: Vec::new(),
            global_excludes: Vec::new(),
            update_interval_mins: DEFAULT_UPDATE_INTERVAL_MINS,
        }
    }
}

pub fn get_default_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "reposcout")
        .context("Failed to determine project directories")?;

    let config_dir = proj_dirs.config_dir();
    Ok(config_dir.join("reposcout.toml"))
}

/// Expand a leading `~` or `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Last-modified time of the config file, if it can be read.
pub fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl Config {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p,
            None => get_default_config_path()?,
        };

        if !path.exists() {
            let default_config = Config::default();
            // Create directory if it doesn't exist
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
            default_config.save(&path)?;
            return Ok(default_config);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Effective cache refresh interval, honoring the env override.
    pub fn update_interval(&self) -> Duration {
        let mins = std::env::var(UPDATE_INTERVAL_ENV)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.update_interval_mins);
        Duration::from_secs(mins * 60)
    }
}
