use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelgate")]
#[command(author, version, about = "Streaming media proxy with HLS rewriting")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the proxy server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Resolve a link once and print the result as JSON
    Resolve {
        /// Share link or direct media URL
        url: String,
    },

    /// Check whether a URL passes the host allow-list
    CheckHost {
        /// URL to check
        url: String,

        /// Host of the manifest the URL was found in
        #[arg(long)]
        base_host: Option<String>,
    },

    /// Display version information
    Version,
}
