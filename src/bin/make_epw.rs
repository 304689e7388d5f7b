//! Writes a one-day synthetic weather file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use eplus_live::sim::epw_writer::create_epw_file_with_rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "make_epw", about = "Write a 24-hour synthetic EPW weather file")]
struct Args {
    #[arg(long, default_value = "weather.epw")]
    output: PathBuf,
    /// Mean dry bulb temperature (°C)
    #[arg(long, default_value_t = 30.0, allow_negative_numbers = true)]
    base_temp: f64,
    /// Half-width of the uniform hourly perturbation (°C)
    #[arg(long, default_value_t = 5.0)]
    fluctuation: f64,
    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let records = create_epw_file_with_rng(&args.output, args.base_temp, args.fluctuation, &mut rng)?;
    info!(
        path = %args.output.display(),
        records = records.len(),
        base_temp = args.base_temp,
        fluctuation = args.fluctuation,
        "weather file written"
    );
    Ok(())
}
