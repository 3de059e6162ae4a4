//! TokenSync CLI
//!
//! Command-line tools for design token synchronization.
//!
//! # Commands
//!
//! - `load` - Resolve a token definition and summarize it
//! - `merge` - Merge a definition into a stored snapshot
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokensync_model::Brand;
use tracing_subscriber::EnvFilter;

/// Design token synchronization tools.
#[derive(Parser)]
#[command(name = "tokensync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Brand the definition belongs to
    #[arg(global = true, short, long, default_value = "default")]
    brand: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a token definition and summarize it
    Load {
        /// Path to the definition file
        definition: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Merge a definition into a stored snapshot
    Merge {
        /// Path to the definition file
        definition: PathBuf,

        /// Path to the snapshot file
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Write the merged state back to the snapshot
        #[arg(short, long)]
        write: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let brand = Brand::new(cli.brand.clone(), cli.brand);
    match cli.command {
        Commands::Load { definition, format } => {
            commands::load::run(&definition, &brand, &format)?;
        }
        Commands::Merge {
            definition,
            snapshot,
            write,
            format,
        } => {
            commands::merge::run(&definition, &snapshot, &brand, write, &format)?;
        }
        Commands::Version => {
            println!("TokenSync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
