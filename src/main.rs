use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reposcout::app::{LookupStatus, RepoFinder};
use reposcout::cache::FileCacheStore;
use reposcout::cli::{CliArgs, Command};
use reposcout::config::{self, Config};

fn main() -> Result<()> {
    // Log to stderr so stdout carries only result lines
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config_path = match args.config.clone() {
        Some(path) => path,
        None => config::get_default_config_path()?,
    };

    match args.command() {
        Command::Config => {
            // Loading bootstraps a default config file if none exists yet
            Config::load(Some(config_path.clone()))?;
            println!("{}", config_path.display());
            Ok(())
        }
        Command::Update => {
            let finder = build_finder(config_path)?;
            if finder.config().search_dirs.is_empty() {
                print_unconfigured_hint();
                return Ok(());
            }
            let repos = finder.update()?;
            println!("{} repositories found", repos.len());
            Ok(())
        }
        Command::Search { query, wait } => {
            let finder = build_finder(config_path)?;
            run_search(&finder, query.as_deref().unwrap_or(""), wait)
        }
    }
}

fn build_finder(config_path: PathBuf) -> Result<RepoFinder> {
    let config = Config::load(Some(config_path.clone()))?;
    let cache = Arc::new(FileCacheStore::new()?);
    Ok(RepoFinder::new(config, Some(config_path), cache))
}

fn run_search(finder: &RepoFinder, query: &str, wait: bool) -> Result<()> {
    let mut lookup = finder.search(query);

    if wait {
        while finder.is_scan_running() {
            thread::sleep(Duration::from_millis(100));
        }
        lookup = finder.search(query);
    }

    match lookup.status {
        LookupStatus::Unconfigured => print_unconfigured_hint(),
        LookupStatus::Scanning if lookup.repos.is_empty() => {
            println!("Updating repository list… rerun shortly, or use --wait.");
        }
        _ => {
            if lookup.repos.is_empty() {
                println!("No matching repositories found.");
            } else {
                for repo in &lookup.repos {
                    println!("{}\t{}", repo.name, shorten_home(&repo.path));
                }
            }
        }
    }

    Ok(())
}

fn print_unconfigured_hint() {
    println!("You haven't configured any directories to search.");
    println!("Run `reposcout config` and add search roots to the file it prints.");
}

/// Replace a home-directory prefix with `~` for display.
fn shorten_home(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            if rest.as_os_str().is_empty() {
                return "~".to_string();
            }
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}
