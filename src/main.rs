use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use zupt_trace::io::array_rows;
use zupt_trace::{
    load_samples, write_positions, EstimatorKind, PositionTracer, TraceConfig, TraceSummary,
};

#[derive(Parser, Debug)]
#[command(name = "zupt_trace")]
#[command(about = "Dead-reckoning position trace with zero-velocity drift correction", long_about = None)]
struct Args {
    /// Sample table: JSON array of [t_ms, ax, ay, az, gx, gy, gz, roll, pitch, yaw] rows (.json or .json.gz)
    #[arg(long)]
    input: PathBuf,

    /// Write positions here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON configuration; missing fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Force the final position back onto the first
    #[arg(long, default_value_t = false)]
    loop_closure: bool,

    /// Attitude estimator (overrides the configuration file)
    #[arg(long, value_enum)]
    estimator: Option<EstimatorArg>,

    /// Print a run summary instead of the positions
    #[arg(long, default_value_t = false)]
    summary: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EstimatorArg {
    Fusion,
    Complementary,
}

impl From<EstimatorArg> for EstimatorKind {
    fn from(arg: EstimatorArg) -> Self {
        match arg {
            EstimatorArg::Fusion => EstimatorKind::Fusion,
            EstimatorArg::Complementary => EstimatorKind::Complementary,
        }
    }
}

fn load_config(args: &Args) -> Result<TraceConfig> {
    let mut config = match args.config.as_ref() {
        Some(path) => TraceConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TraceConfig::default(),
    };
    if args.loop_closure {
        config.loop_closure = true;
    }
    if let Some(estimator) = args.estimator {
        config.estimator = estimator.into();
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = load_config(&args)?;
    log::info!(
        "estimator {:?}, {} Hz, threshold {} m/s², margin {} samples",
        config.estimator,
        config.sample_rate_hz,
        config.motion_threshold,
        config.motion_margin()
    );

    let raw = load_samples(&args.input)
        .with_context(|| format!("loading samples {}", args.input.display()))?;
    let tracer = PositionTracer::new(config)?;
    let output = tracer.trace(&raw)?;

    if args.summary {
        let summary = TraceSummary::from_output(&output);
        println!("{}", serde_json::to_string_pretty(&summary)?);
        if args.output.is_none() {
            return Ok(());
        }
    }

    match args.output.as_ref() {
        Some(path) => {
            write_positions(path, &output.position)
                .with_context(|| format!("writing positions {}", path.display()))?;
            log::info!("wrote {} positions to {}", output.len(), path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&array_rows(&output.position))?),
    }
    Ok(())
}
