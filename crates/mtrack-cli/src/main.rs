use clap::{Parser, Subcommand};
use mtrack_cli::commands::{cmd_filter, cmd_init, cmd_inspect, FilterCommand};
use mtrack_cli::Overrides;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mtrack")]
#[command(version, about = "Microscopy mask trajectory filtering", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, filter, render and export trajectories from a mask directory
    Filter {
        /// Directory of labeled mask frames
        #[arg(value_name = "MASK_DIR")]
        input: PathBuf,

        /// Configuration file (defaults to the usual search locations)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Frames per second
        #[arg(long, value_name = "FLOAT")]
        fps: Option<f64>,

        /// Micrometers per pixel
        #[arg(long, value_name = "FLOAT")]
        um_per_pixel: Option<f64>,

        /// Object ids to exclude (comma-separated)
        #[arg(long, value_name = "IDS")]
        exclude: Option<String>,

        /// Allowed area range in µm²
        #[arg(long, value_name = "MIN,MAX")]
        area: Option<String>,

        /// Minimum allowed ratio of smaller to larger area between consecutive frames (0-1)
        #[arg(long, value_name = "FRACTION")]
        area_change: Option<f64>,

        /// Allowed velocity range in µm/s
        #[arg(long, value_name = "MIN,MAX")]
        velocity: Option<String>,

        /// Allowed net displacement range in µm
        #[arg(long, value_name = "MIN,MAX")]
        displacement: Option<String>,

        /// Truncate trajectories at their first contact with the image border
        #[arg(long)]
        boundary: bool,

        /// Truncate trajectories when another object comes closer than this (µm)
        #[arg(long, value_name = "UM")]
        min_distance: Option<f64>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Skip rendering and writing visualization frames
        #[arg(long)]
        no_visualization: bool,

        /// Number of parallel threads
        #[arg(short = 'j', long, value_name = "N")]
        threads: Option<usize>,

        /// Only print errors
        #[arg(short, long)]
        silent: bool,
    },

    /// Print per-object statistics for a mask directory without filtering
    Inspect {
        /// Directory of labeled mask frames
        #[arg(value_name = "MASK_DIR")]
        input: PathBuf,

        /// Configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Frames per second
        #[arg(long, value_name = "FLOAT")]
        fps: Option<f64>,

        /// Micrometers per pixel
        #[arg(long, value_name = "FLOAT")]
        um_per_pixel: Option<f64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the default configuration file
    Init {
        /// Target path (default: ~/mtrack/mtrack.yml)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Filter {
            input,
            config,
            fps,
            um_per_pixel,
            exclude,
            area,
            area_change,
            velocity,
            displacement,
            boundary,
            min_distance,
            out,
            no_visualization,
            threads,
            silent,
        } => cmd_filter(FilterCommand {
            input,
            config,
            overrides: Overrides {
                fps,
                um_per_pixel,
                exclude,
                area,
                area_change,
                velocity,
                displacement,
                boundary,
                min_distance,
            },
            out,
            no_visualization,
            threads,
            silent,
        }),

        Commands::Inspect {
            input,
            config,
            fps,
            um_per_pixel,
            json,
        } => cmd_inspect(
            input,
            config,
            Overrides {
                fps,
                um_per_pixel,
                ..Default::default()
            },
            json,
        ),

        Commands::Init { path, force } => cmd_init(path, force),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
