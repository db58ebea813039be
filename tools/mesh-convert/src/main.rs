//! mesh-convert - polygonal mesh format converter
//!
//! Converts between PLY, legacy VTK, XML VTP, OBJ and STL. The format of each
//! path is detected from its name (see `--match`).
//!
//! ```bash
//! mesh-convert --input scan.ply --output scan.stl
//! mesh-convert --manifest conversions.toml
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use mesh_convert::{ConversionManifest, ConvertError, ConvertOptions, FormatRouter, MatchMode};

#[derive(Parser)]
#[command(name = "mesh-convert")]
#[command(about = "Convert polygonal meshes between PLY, VTK, VTP, OBJ and STL")]
#[command(version)]
struct Cli {
    /// (required) Path to the input file (.ply, .vtk, .vtp, .obj, .stl)
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// (required) Path of the output file (.ply, .vtk, .vtp, .obj, .stl)
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// How file formats are detected from paths
    #[arg(long = "match", value_enum, default_value_t = MatchMode::Substring)]
    match_mode: MatchMode,

    /// Run every conversion listed in a TOML manifest instead
    #[arg(long, value_name = "PATH", conflicts_with_all = ["input", "output"])]
    manifest: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (stderr, so stdout only carries written paths)
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if let Some(manifest_path) = cli.manifest {
        tracing::info!("Running conversions from {:?}", manifest_path);
        let manifest = ConversionManifest::load(&manifest_path)?;
        let count = manifest
            .run_with(|output, _| println!("Written : {}", output.display()))
            .with_context(|| format!("Batch {:?} stopped", manifest_path))?;
        tracing::info!("{} conversions complete", count);
        return Ok(());
    }

    // Both paths are checked before any file is touched
    let input = cli.input.ok_or(ConvertError::MissingArgument("input"))?;
    let output = cli.output.ok_or(ConvertError::MissingArgument("output"))?;

    let router = FormatRouter::new(ConvertOptions {
        match_mode: cli.match_mode,
    });
    tracing::info!("Converting {:?} -> {:?}", input, output);
    router.convert(&input, &output)?;

    println!("Written : {}", output.display());
    Ok(())
}
