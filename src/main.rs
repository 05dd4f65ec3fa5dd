//! coilsim: computes coil sensitivity maps for a saved workspace.

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use coilsim::config::SolverConfig;
use coilsim::export::{export_slice_csv, ExportJob};
use coilsim::slice::{Axis, SliceLocation};
use coilsim::workspace::Workspace;

#[derive(Parser, Debug)]
#[command(name = "coilsim")]
#[command(about = "Compute MRI coil sensitivity maps from a saved workspace")]
#[command(version)]
struct Args {
    /// Workspace JSON file (raw segment parameters plus scanner grid)
    workspace: PathBuf,

    /// Solver configuration, YAML or JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the stacked complex sensitivity maps to this binary file
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Axis normal to the exported slice
    #[arg(long, default_value = "z")]
    slice_axis: Axis,

    /// Physical coordinate of the slice along the slice axis
    #[arg(long, conflicts_with = "slice_number")]
    slice_at: Option<f64>,

    /// 1-based slice number along the slice axis
    #[arg(long)]
    slice_number: Option<usize>,

    /// Coil whose slice is written
    #[arg(long, default_value = "0")]
    coil: usize,

    /// Write the slice as CSV to this file
    #[arg(long)]
    csv: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SolverConfig::load(path)?,
        None => SolverConfig::default(),
    };
    let workspace = Workspace::load(&args.workspace)?;
    let scanner = workspace.build_scanner(config)?;

    let maps = ExportJob::from_scanner(&scanner).spawn()?.wait()?;

    if let Some(path) = &args.export {
        maps.save_binary(path)?;
        info!(path = %path.display(), coils = maps.len(), "wrote sensitivity maps");
    }

    if let Some(path) = &args.csv {
        let location = match (args.slice_at, args.slice_number) {
            (_, Some(number)) => SliceLocation::Number(number),
            (Some(at), None) => SliceLocation::Coordinate(at),
            (None, None) => SliceLocation::Coordinate(0.0),
        };
        let writer = BufWriter::new(File::create(path)?);
        export_slice_csv(writer, &maps, args.coil, scanner.volume(), args.slice_axis, location)?;
        info!(path = %path.display(), axis = %args.slice_axis, "wrote slice");
    }
    Ok(())
}
