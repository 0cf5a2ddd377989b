use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;

use blockdiff::brightness::Normalization;
use blockdiff::imgproc::Grayscale;
use blockdiff::io::{result_name, FsLoader, FsPresenter, RESULTS_DIR, SAMPLES_DIR};
use blockdiff::report::{ConsoleSink, DebugLevel, DebugSink, LogSink};
use blockdiff::{prepare, ComparisonConfig};

#[derive(Parser)]
#[command(name = "blockdiff")]
#[command(about = "Compare two images block by block and outline the blocks that differ")]
struct Cli {
    /// First image (sample name or path)
    first: PathBuf,

    /// Second image; the overlay is drawn on this one
    second: PathBuf,

    /// Directory bare sample names are resolved against
    #[arg(long, env = "BLOCKDIFF_SAMPLES_DIR", default_value = SAMPLES_DIR)]
    samples_dir: PathBuf,

    /// Directory the overlay is written to
    #[arg(long, env = "BLOCKDIFF_RESULTS_DIR", default_value = RESULTS_DIR)]
    results_dir: PathBuf,

    /// Grid columns
    #[arg(long)]
    columns: Option<u32>,

    /// Grid rows
    #[arg(long)]
    rows: Option<u32>,

    /// Brightness difference above which a block counts as changed
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Normalization factor for the floor-per-axis formula
    #[arg(long)]
    factor: Option<u32>,

    /// true-luminance or disabled-style
    #[arg(long)]
    grayscale: Option<Grayscale>,

    /// true-mean or floor-per-axis
    #[arg(long)]
    normalization: Option<Normalization>,

    /// Use the historical grayscale and normalization
    #[arg(long)]
    legacy: bool,

    /// off, symbolic or numeric
    #[arg(short, long)]
    debug: Option<DebugLevel>,

    /// Print a JSON report instead of a summary line
    #[arg(long)]
    json: bool,

    /// Don't write the overlay image
    #[arg(long)]
    no_save: bool,

    /// Open the overlay in the platform viewer
    #[arg(long, conflicts_with = "no_save")]
    open: bool,
}

impl Cli {
    fn config(&self) -> Result<ComparisonConfig> {
        let base = if self.legacy {
            ComparisonConfig::legacy()
        } else {
            ComparisonConfig::default()
        };
        let mut config = base.merge_env()?;

        if let Some(columns) = self.columns {
            config.grid_columns = columns;
        }
        if let Some(rows) = self.rows {
            config.grid_rows = rows;
        }
        if let Some(threshold) = self.threshold {
            config.diff_threshold = threshold;
        }
        if let Some(factor) = self.factor {
            config.normalization_factor = factor;
        }
        if let Some(grayscale) = self.grayscale {
            config.grayscale = grayscale;
        }
        if let Some(normalization) = self.normalization {
            config.normalization = normalization;
        }
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
        config.record_diffs = self.json;
        Ok(config)
    }
}

fn run(cli: Cli) -> Result<bool> {
    let config = cli.config()?;
    let loader = FsLoader::with_samples_dir(&cli.samples_dir);
    let prepared = prepare(cli.first.clone(), cli.second.clone(), config, &loader)
        .context("Couldn't prepare comparison")?;

    let mut sink: Box<dyn DebugSink> = if cli.json || prepared.config.debug == DebugLevel::Off {
        Box::new(LogSink)
    } else {
        Box::new(ConsoleSink)
    };
    let result = if cli.no_save {
        prepared.compare_with_sink(sink.as_mut())?
    } else {
        let presenter = FsPresenter::new(&cli.results_dir).open_viewer(cli.open);
        let name = result_name(&cli.first, &cli.second);
        let (result, written) = prepared
            .compare_and_present(sink.as_mut(), &presenter, &name)
            .context("Couldn't present overlay")?;
        if let (Some(path), false) = (written, cli.json) {
            println!("Overlay saved to: {}", path.display());
        }
        result
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result.to_json())?);
    } else if result.is_match {
        println!("Match");
    } else {
        println!(
            "No match: {} of {} blocks differ",
            result.mismatched.len(),
            result.grid.len()
        );
    }

    Ok(result.is_match)
}

fn main() -> ExitCode {
    dotenv().ok();
    pretty_env_logger::init();

    let cli = Cli::parse();
    log::info!(
        "Comparing `{}` against `{}`",
        cli.first.display(),
        cli.second.display()
    );

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
