//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Downloads and caches websites.
///
/// Prints the cached content of each URL, downloading it first if it has
/// not been retrieved before.
#[derive(Debug, Clone, Parser)]
#[command(name = "httpcache", version, arg_required_else_help = true)]
pub struct Cli {
    /// Throttle requests to 1 per second
    #[arg(short = 't', long)]
    pub throttle: bool,

    /// List urls in cache
    #[arg(short = 'l', long, conflicts_with_all = ["remove", "clear"])]
    pub list: bool,

    /// Remove urls
    #[arg(short = 'r', long, conflicts_with = "clear")]
    pub remove: bool,

    /// Clear cache (removes all data)
    #[arg(short = 'c', long)]
    pub clear: bool,

    /// Clear without asking for confirmation
    #[arg(long, requires = "clear")]
    pub yes: bool,

    /// Print records and listings as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Record store path (overrides HTTPCACHE_DB_PATH)
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Blob root directory (overrides HTTPCACHE_BLOB_ROOT)
    #[arg(long, value_name = "DIR")]
    pub blob_root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// URLs to retrieve or remove
    pub urls: Vec<String>,
}

/// What a single invocation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Clear { confirmed: bool },
    List,
    Remove(Vec<String>),
    Get(Vec<String>),
}

impl Cli {
    pub fn action(&self) -> Action {
        if self.clear {
            Action::Clear { confirmed: self.yes }
        } else if self.list {
            Action::List
        } else if self.remove {
            Action::Remove(self.urls.clone())
        } else {
            Action::Get(self.urls.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("httpcache").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_get_urls() {
        let cli = parse(&["https://a.example/", "https://b.example/"]);
        assert_eq!(cli.action(), Action::Get(vec!["https://a.example/".into(), "https://b.example/".into()]));
        assert!(!cli.throttle);
    }

    #[test]
    fn test_remove_urls() {
        let cli = parse(&["-r", "https://a.example/"]);
        assert_eq!(cli.action(), Action::Remove(vec!["https://a.example/".into()]));
    }

    #[test]
    fn test_clear_and_list() {
        assert_eq!(parse(&["-c"]).action(), Action::Clear { confirmed: false });
        assert_eq!(parse(&["-c", "--yes"]).action(), Action::Clear { confirmed: true });
        assert_eq!(parse(&["-l"]).action(), Action::List);
    }

    #[test]
    fn test_throttle_flag() {
        let cli = parse(&["-t", "https://a.example/"]);
        assert!(cli.throttle);
    }

    #[test]
    fn test_conflicting_flags() {
        assert!(Cli::try_parse_from(["httpcache", "-l", "-c"]).is_err());
        assert!(Cli::try_parse_from(["httpcache", "--yes", "https://a.example/"]).is_err());
    }
}
