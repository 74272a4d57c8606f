use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "adslot", version, about = "Simulate ad slot playback against a headless player")]
pub struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Display a slot document and report the beacons it fired
    Simulate(SimulateArgs),
}

#[derive(clap::Args, Debug)]
pub struct SimulateArgs {
    /// Slot document (JSON)
    pub slot: PathBuf,

    /// Display duration in seconds, for creatives without an inherent length
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Play linear ads on a sibling surface
    #[arg(long)]
    pub sibling: bool,

    /// Seed for reproducible creative selection
    #[arg(long)]
    pub seed: Option<u64>,

    /// Engine configuration (JSON)
    #[arg(short, long, env = "ADSLOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Send beacons over HTTP in addition to recording them
    #[arg(long)]
    pub live_beacons: bool,

    /// MIME types the simulated player can play
    #[arg(long, value_delimiter = ',', default_value = "video/mp4")]
    pub formats: Vec<String>,

    /// Length of every ad video in seconds
    #[arg(long, default_value_t = 15.0)]
    pub ad_length: f64,

    /// Length of the content video in seconds
    #[arg(long, default_value_t = 600.0)]
    pub content_length: f64,
}
