//! Command-line interface for the `gatehouse` binary

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// gatehouse - API server with a bearer-token protected route
#[derive(Parser, Debug)]
#[command(name = "gatehouse", version, about, author)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "GATEHOUSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address, overrides the configured one
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,

    /// Enable verbose logging (-v, -vv, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Log filter from the verbosity flags; `RUST_LOG` wins when set
    pub fn log_filter(&self) -> EnvFilter {
        let level = if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        };

        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }

    /// Install the global tracing subscriber
    pub fn init_tracing(&self) {
        tracing_subscriber::fmt()
            .with_env_filter(self.log_filter())
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .init();
    }
}
