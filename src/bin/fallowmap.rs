//! fallowmap CLI - batch fallowed-area mapping for one region.

use anyhow::{bail, Context};
use clap::Parser;
use fallowmap::io::{crop_type::CropTypeReference, export, observations};
use fallowmap::{FamInputs, FamPipeline, RegionProfile, Thresholds};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fallowmap",
    version,
    about = "Fallowed-area mapping from NDVI time series"
)]
struct Cli {
    /// Region profile to run (california or nevada)
    #[arg(long)]
    region: String,

    /// Directory of raw observation files, laid out as <input>/<year>/*.csv
    #[arg(long)]
    input: PathBuf,

    /// Directory holding cached dense series (read and refreshed)
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Directory for classified output tables
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Perennial crop-type reference table (id, crop_group)
    #[arg(long)]
    crop_types: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let Some(profile) = RegionProfile::by_name(&cli.region) else {
        bail!("unknown region {:?} (expected california or nevada)", cli.region);
    };

    let files_by_year = observations::discover_input_files(&cli.input)
        .with_context(|| format!("scanning input directory {}", cli.input.display()))?;
    if files_by_year.is_empty() && cli.cache.is_none() {
        bail!("no input files found under {}", cli.input.display());
    }

    let mut inputs = FamInputs {
        cache_dir: cli.cache,
        ..FamInputs::default()
    };
    for (year, files) in &files_by_year {
        let observations = observations::read_year(files)
            .with_context(|| format!("reading observations for year {}", year))?;
        inputs.observations.insert(*year, observations);
    }
    if let Some(path) = &cli.crop_types {
        inputs.crop_types = CropTypeReference::from_csv_path(path)
            .with_context(|| format!("reading crop-type reference {}", path.display()))?;
    } else if profile.perennial_rule {
        bail!("region {} needs --crop-types for perennial handling", profile.name);
    }

    let pipeline = FamPipeline::new(profile, Thresholds::default());
    let outputs = pipeline.run(&inputs)?;
    for output in &outputs {
        export::write_season(&cli.output, output)?;
    }
    println!(
        "wrote {} classified tables to {}",
        outputs.len(),
        cli.output.display()
    );
    Ok(())
}
