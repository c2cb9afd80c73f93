use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, PartialEq)]
#[command(name = "reposcout")]
#[command(about = "Find and fuzzy-search Git repositories scattered across your filesystem")]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Search the cached repository list (default)
    Search {
        /// Fuzzy query; omit to list every repository
        query: Option<String>,

        /// Wait for an in-flight rescan instead of returning provisional results
        #[arg(long)]
        wait: bool,
    },
    /// Rescan all configured search roots now
    Update,
    /// Print the configuration file path, creating a default config if needed
    Config,
}

impl CliArgs {
    /// The subcommand to run; a bare invocation lists everything.
    pub fn command(self) -> Command {
        self.command.unwrap_or(Command::Search {
            query: None,
            wait: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_args_defaults_to_search() {
        let args = CliArgs::parse_from(["reposcout"]);
        assert_eq!(args.config, None);
        assert_eq!(
            args.command(),
            Command::Search {
                query: None,
                wait: false
            }
        );
    }

    #[test]
    fn test_cli_parse_search_with_query() {
        let args = CliArgs::parse_from(["reposcout", "search", "dotfiles"]);
        assert_eq!(
            args.command,
            Some(Command::Search {
                query: Some("dotfiles".to_string()),
                wait: false
            })
        );
    }

    #[test]
    fn test_cli_parse_search_wait_flag() {
        let args = CliArgs::parse_from(["reposcout", "search", "--wait", "api"]);
        assert_eq!(
            args.command,
            Some(Command::Search {
                query: Some("api".to_string()),
                wait: true
            })
        );
    }

    #[test]
    fn test_cli_parse_update_with_config_override() {
        let args = CliArgs::parse_from(["reposcout", "--config", "/custom/config.toml", "update"]);
        assert_eq!(args.config, Some(PathBuf::from("/custom/config.toml")));
        assert_eq!(args.command, Some(Command::Update));
    }
}
