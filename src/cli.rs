use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bdscan")]
#[command(author, version, about = "Blu-ray disc structure analyzer")]
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
    /// Scan a disc and print its playlists, clips and streams
    Scan {
        /// Disc root, BDMV directory, or a path inside or above the disc
        #[arg(required = true)]
        path: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Stop at the first file that fails to parse
        #[arg(long)]
        stop_on_error: bool,

        /// Read interleaved SSIF files in place of their M2TS counterparts
        #[arg(long)]
        ssif: bool,

        /// List every playlist, not only valid ones
        #[arg(long)]
        all_playlists: bool,
    },

    /// Print the BDMV directory for a path
    Locate {
        #[arg(required = true)]
        path: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
