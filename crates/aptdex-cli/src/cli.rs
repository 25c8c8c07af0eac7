use clap::{ArgAction, Parser, Subcommand, ValueHint};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output logs as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Disable progress spinners
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Provide custom config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set proxy
    #[arg(required = false, long, short = 'P', global = true)]
    pub proxy: Option<String>,

    /// Set request headers (`Name: value`)
    #[arg(required = false, long, short = 'H', global = true)]
    pub header: Option<Vec<String>>,

    /// Set user agent
    #[arg(required = false, long, short = 'A', global = true)]
    pub user_agent: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the effective configuration to stdout
    Config,

    /// Generate default config
    #[clap(name = "defconfig")]
    DefConfig,

    /// Serve the indexing session protocol over WebSocket
    #[clap(name = "serve")]
    Serve {
        /// Address to listen on, overriding `listen` from the config
        #[arg(required = false, short, long)]
        listen: Option<String>,
    },

    /// Index a remote repository
    #[command(arg_required_else_help = true)]
    #[clap(name = "index")]
    Index {
        /// Repository base URL
        #[arg(required = true, value_hint = ValueHint::Url)]
        url: String,

        /// Distribution name (requires --suite)
        #[arg(required = false, short, long, requires = "suite")]
        dist: Option<String>,

        /// Suite or component name (requires --dist)
        #[arg(required = false, short, long, requires = "dist")]
        suite: Option<String>,

        /// Print every parsed record as JSON
        #[arg(required = false, short, long)]
        records: bool,
    },

    /// Parse a local package index file
    #[command(arg_required_else_help = true)]
    #[clap(name = "parse")]
    Parse {
        /// Path to a `Packages` file, optionally compressed
        #[arg(required = true, value_hint = ValueHint::FilePath)]
        file: String,

        /// Print every parsed record as JSON
        #[arg(required = false, short, long)]
        records: bool,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_command_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_index_arguments() {
        let args = Args::parse_from([
            "aptdex",
            "-vv",
            "-H",
            "X-Firmware: 15.0",
            "index",
            "https://repo.example.org",
            "--records",
        ]);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.header.as_deref(), Some(&["X-Firmware: 15.0".to_string()][..]));
        match args.command {
            Commands::Index {
                url,
                dist,
                records,
                ..
            } => {
                assert_eq!(url, "https://repo.example.org");
                assert!(dist.is_none());
                assert!(records);
            }
            _ => panic!("expected index"),
        }
    }

    #[test]
    fn test_dist_requires_suite() {
        let result = Args::try_parse_from([
            "aptdex",
            "index",
            "https://deb.example.org",
            "--dist",
            "stable",
        ]);
        assert!(result.is_err());
    }
}
