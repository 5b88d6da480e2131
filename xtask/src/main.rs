// Desktop/tooling crate — unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod catalog;
mod simulate;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "SD A2DP player host tools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a music folder (standing in for the SD card) and write the catalog index
    ScanCatalog {
        /// Folder mounted as the card root
        #[arg(long)]
        root: PathBuf,
    },
    /// Print track names from the catalog index, building it first if missing
    List {
        /// Folder mounted as the card root
        #[arg(long)]
        root: PathBuf,
        /// First ordinal to print
        #[arg(long, default_value_t = 0)]
        start: u32,
        /// Number of names to print (default: all)
        #[arg(long)]
        count: Option<u32>,
    },
    /// Connect a simulated sink, pull PCM like the A2DP stack would, and save it
    Simulate {
        /// Folder mounted as the card root
        #[arg(long)]
        root: PathBuf,
        /// Output file for raw 16-bit LE stereo 44.1 kHz PCM
        #[arg(long)]
        out: PathBuf,
        /// Seconds of audio to pull
        #[arg(long, default_value_t = 10)]
        seconds: u32,
        /// Software gain in percent applied to the delivered PCM
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=100))]
        gain: u8,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::ScanCatalog { root } => catalog::scan(&root),
        Commands::List { root, start, count } => catalog::list(&root, start, count),
        Commands::Simulate { root, out, seconds, gain } => simulate::run(&root, &out, seconds, gain),
    }
}
