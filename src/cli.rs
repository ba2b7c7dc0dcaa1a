//! Command-line interface for rps_vision.

use std::path::PathBuf;

use clap::Parser;

/// Rock-paper-scissors against a gesture recognition service
#[derive(Parser, Debug)]
#[command(name = "rps_vision")]
#[command(about = "Play rock-paper-scissors with your camera", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "rps_vision.toml")]
    pub config: PathBuf,

    /// Prediction service base URL (overrides config and RPS_SERVICE_URL)
    #[arg(long)]
    pub service_url: Option<String>,

    /// Video device (e.g. /dev/video0), image file or image directory used as the camera
    #[arg(long)]
    pub camera: Option<PathBuf>,
}
