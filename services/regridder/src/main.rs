//! RDRS/CaPA to WRF-Hydro forcing regridder.
//!
//! Reads reanalysis forcing files, regrids them onto a WRF-Hydro domain and
//! writes one forcing file per timestep.

mod config_loader;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use forcing::{ForcingConfig, ForcingPipeline, Profile};

#[derive(Parser, Debug)]
#[command(name = "regridder")]
#[command(about = "Regrid RDRS/CaPA forcing onto a WRF-Hydro domain")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Configuration file path
    #[arg(short, long, global = true, env = "FORCING_CONFIG")]
    config: Option<PathBuf>,

    /// Directory forcing files are written to
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Directory holding regridding weight files (unused by recompute runs)
    #[arg(long, global = true)]
    weights_dir: Option<PathBuf>,

    /// Log level or filter directive
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Regrid RDRS forcing to LDASIN_DOMAIN1 files
    Ldasin {
        /// Source file or glob pattern
        #[arg(short, long)]
        input: Option<String>,
    },

    /// Regrid CaPA precipitation to PRECIP_FORCING files, reusing weights
    Precip {
        /// Source file or glob pattern
        input_files: String,
    },

    /// Build and store CaPA precipitation weights
    Weights {
        /// Source file defining the CaPA grid
        #[arg(short, long)]
        input: Option<String>,
    },
}

impl Command {
    fn profile(&self) -> Profile {
        match self {
            Self::Ldasin { .. } => Profile::Ldasin,
            Self::Precip { .. } => Profile::Precip,
            Self::Weights { .. } => Profile::Weights,
        }
    }

    fn input(&self) -> Option<&str> {
        match self {
            Self::Ldasin { input } | Self::Weights { input } => input.as_deref(),
            Self::Precip { input_files } => Some(input_files),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

fn main() -> ExitCode {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if let Err(e) = init_tracing(&args.log_level, args.log_format) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Regridding failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(true);

    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}

fn run(args: &Args) -> Result<()> {
    let profile = args.command.profile();
    let config = build_config(args, profile)?;

    info!(
        profile = %profile,
        input = config.input.as_deref().unwrap_or("-"),
        output_dir = %config.output_dir.display(),
        weights_mode = %config.regrid.mode,
        "Starting regridder"
    );

    let pipeline = ForcingPipeline::new(config)?;

    let report = match profile {
        Profile::Weights => serde_json::to_string_pretty(&pipeline.generate_weights()?)?,
        Profile::Ldasin | Profile::Precip => serde_json::to_string_pretty(&pipeline.run()?)?,
    };
    println!("{}", report);

    Ok(())
}

/// Profile defaults, then config file, then environment, then flags.
fn build_config(args: &Args, profile: Profile) -> Result<ForcingConfig> {
    let mut config = config_loader::load_config(args.config.as_deref(), profile)
        .context("Failed to load configuration")?;

    if let Some(input) = args.command.input() {
        config.input = Some(input.to_string());
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(dir) = &args.weights_dir {
        config.regrid.weights_dir = Some(dir.clone());
    }

    Ok(config)
}
