/// stlmesh - inspect STL models from the command line
///
/// Logging follows `RUST_LOG` when set, otherwise `-v` raises the level:
///   stlmesh info part.stl --mesh
///   RUST_LOG=stlmesh_core=debug stlmesh info part.stl
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use stlmesh_cli::{inspect, InspectOptions};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "stlmesh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a model and print its statistics
    Info {
        /// Input STL file
        input: PathBuf,

        /// Uniform scale factor
        #[arg(long)]
        scale: Option<f32>,

        /// Translation applied after scaling and rotation
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
        translate: Option<Vec<f32>>,

        /// Rotation as roll, pitch, yaw in radians
        #[arg(long, num_args = 3, value_names = ["ROLL", "PITCH", "YAW"], allow_negative_numbers = true)]
        rotate_euler: Option<Vec<f32>>,

        /// Flip every facet normal
        #[arg(long)]
        invert_normals: bool,

        /// Keep the original coordinates instead of centering the model
        #[arg(long)]
        keep_origin: bool,

        /// Build the half-edge mesh and report its topology
        #[arg(long)]
        mesh: bool,
    },
}

fn triple(values: Option<Vec<f32>>) -> Option<[f32; 3]> {
    values.and_then(|v| <[f32; 3]>::try_from(v).ok())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("stlmesh_core={default_level},stlmesh={default_level}")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Info {
            input,
            scale,
            translate,
            rotate_euler,
            invert_normals,
            keep_origin,
            mesh,
        } => {
            let options = InspectOptions {
                scale,
                translate: triple(translate),
                rotate_euler: triple(rotate_euler),
                invert_normals,
                keep_origin,
                mesh,
            };
            let report = inspect(&input, &options)?;
            print!("{report}");
        }
    }

    Ok(())
}
