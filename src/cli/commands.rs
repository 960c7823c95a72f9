//! CLI command definitions

use crate::strategy::StrategyKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "equilibrium")]
#[command(about = "Equilibrium - multi-party bargaining environment", long_about = None)]
pub struct Cli {
    /// JSON file with environment settings
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides applied on top of the loaded configuration
#[derive(clap::Args, Debug, Clone, Default)]
pub struct TableArgs {
    /// Number of parties at the table
    #[arg(short, long)]
    pub parties: Option<usize>,

    /// Items in the bundle
    #[arg(short, long)]
    pub items: Option<usize>,

    /// Round limit
    #[arg(short, long)]
    pub rounds: Option<u32>,

    /// RNG seed
    #[arg(short, long)]
    pub seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play one narrated episode and print the transcript
    Demo {
        #[command(flatten)]
        table: TableArgs,

        /// Strategy every party plays (random, concession)
        #[arg(long, default_value = "concession")]
        strategy: StrategyKind,

        /// Simulated narrator latency in milliseconds
        #[arg(long, default_value = "0")]
        latency_ms: u64,
    },

    /// Run a batch of episodes and log them to an experiment run
    Simulate {
        #[command(flatten)]
        table: TableArgs,

        /// Episodes to play
        #[arg(short, long, default_value = "100")]
        episodes: usize,

        /// Strategy every party plays (random, concession)
        #[arg(long, default_value = "concession")]
        strategy: StrategyKind,

        /// Directory experiment runs are written under
        #[arg(long, default_value = "runs")]
        tracking_dir: PathBuf,

        /// Experiment name
        #[arg(long, default_value = "bargaining")]
        experiment: String,

        /// Run name (generated when absent)
        #[arg(long)]
        run_name: Option<String>,

        /// Write every episode as JSON to this file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Start the session server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short = 'P', long, default_value = "8000")]
        port: u16,

        /// Simulated narrator latency in milliseconds
        #[arg(long, default_value = "0")]
        latency_ms: u64,
    },
}
