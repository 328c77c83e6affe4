// SPDX-License-Identifier: GPL-3.0-only

use camera_session::FlashMode;
use camera_session::backends::camera::Facing;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-session")]
#[command(about = "Drive a camera session: preview, photos, videos and flash")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Take a photo
    Photo {
        /// Camera to use: front or back (default: from config, else back)
        #[arg(short, long, value_parser = cli::parse_facing)]
        facing: Option<Facing>,

        /// Flash mode: auto, on or off
        #[arg(long, value_parser = cli::parse_flash_mode)]
        flash: Option<FlashMode>,

        /// Output file path (default: ~/Pictures/Camera/IMG_TIMESTAMP.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record a video
    Video {
        /// Camera to use: front or back (default: from config, else back)
        #[arg(short, long, value_parser = cli::parse_facing)]
        facing: Option<Facing>,

        /// Recording duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Output file path (default: ~/Pictures/Camera/VID_TIMESTAMP.mp4)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the session state that would be restored
    State {
        /// Camera to use: front or back (default: from config, else back)
        #[arg(short, long, value_parser = cli::parse_facing)]
        facing: Option<Facing>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=camera_session=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => cli::list_cameras(),
        Commands::Photo {
            facing,
            flash,
            output,
        } => cli::take_photo(facing, flash, output),
        Commands::Video {
            facing,
            duration,
            output,
        } => cli::record_video(facing, duration, output),
        Commands::State { facing } => cli::show_state(facing),
    }
}
