//! Runs one simulated day and charts outdoor and zone temperatures live.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use eplus_live::draw::chart::Chart;
use eplus_live::draw::config::ChartConfig;
use eplus_live::draw::rerun::{RerunChart, Viewer, start_session};
use eplus_live::sim::api::Engine;
use eplus_live::sim::driver::{RunConfig, run_simulation};
use eplus_live::sim::replay::{ReplayConfig, ReplayEngine};
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    /// One uncontrolled zone, random outdoor air in [10, 35] °C
    OneZone,
    /// Five-zone building, outdoor air held at 15 °C
    FiveZone,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EngineKind {
    /// Offline lumped-capacitance zones driven by the weather file
    Replay,
    /// Native EnergyPlus (needs the `energyplus` feature)
    Energyplus,
}

#[derive(Debug, Parser)]
#[command(name = "one_day_sim", about = "Run one day and chart temperatures live")]
struct Args {
    /// JSON run configuration (overrides --preset)
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Preset::OneZone)]
    preset: Preset,
    #[arg(long, value_enum, default_value_t = EngineKind::Replay)]
    engine: EngineKind,
    #[arg(long)]
    weather: Option<PathBuf>,
    #[arg(long)]
    model: Option<PathBuf>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Where to show the chart: spawn, save:PATH, or none
    #[arg(long, default_value = "spawn", value_parser = parse_viewer)]
    viewer: ViewerChoice,
    /// Seed for the outdoor override's random source
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Clone)]
enum ViewerChoice {
    Headless,
    Show(Viewer),
}

fn parse_viewer(s: &str) -> Result<ViewerChoice, String> {
    match s {
        "none" => Ok(ViewerChoice::Headless),
        "spawn" => Ok(ViewerChoice::Show(Viewer::Spawn)),
        _ => match s.strip_prefix("save:") {
            Some(path) if !path.is_empty() => {
                Ok(ViewerChoice::Show(Viewer::Save(PathBuf::from(path))))
            }
            _ => Err(format!("expected spawn, save:PATH or none, got '{s}'")),
        },
    }
}

fn load_config(args: &Args) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_json_file(path)?,
        None => match args.preset {
            Preset::OneZone => RunConfig::one_zone_random_oat(),
            Preset::FiveZone => RunConfig::five_zone_demand_limit(),
        },
    };
    if let Some(weather) = &args.weather {
        config.weather_file = weather.clone();
    }
    if let Some(model) = &args.model {
        config.model_file = model.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    Ok(config)
}

fn build_engine(kind: EngineKind, config: &RunConfig) -> Result<Box<dyn Engine>> {
    match kind {
        EngineKind::Replay => {
            let names: Vec<&str> = config.zones.iter().map(|z| z.name.as_str()).collect();
            Ok(Box::new(ReplayEngine::new(ReplayConfig::for_zones(&names))))
        }
        #[cfg(feature = "energyplus")]
        EngineKind::Energyplus => Ok(Box::new(
            eplus_live::sim::energyplus::EnergyPlusEngine::new()?,
        )),
        #[cfg(not(feature = "energyplus"))]
        EngineKind::Energyplus => {
            anyhow::bail!("EnergyPlus backend not built; rebuild with `--features energyplus`")
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let mut engine = build_engine(args.engine, &config)?;

    let chart = match &args.viewer {
        ViewerChoice::Show(viewer) => {
            let chart_config = ChartConfig::default();
            let session = start_session(&chart_config, viewer)
                .with_context(|| format!("Failed to start chart session ({viewer:?})"))?;
            let sink = RerunChart::new(session, chart_config.clone());
            Chart::new(chart_config, sink)
        }
        ViewerChoice::Headless => Chart::headless(),
    };

    let summary = run_simulation(engine.as_mut(), &config, chart)?;
    for series in summary.recorder.series() {
        if let Some((lo, hi)) = series.min_max() {
            info!(
                series = %series.nickname,
                samples = series.len(),
                min = lo,
                max = hi,
                "series range"
            );
        }
    }
    Ok(())
}
