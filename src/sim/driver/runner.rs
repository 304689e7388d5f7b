use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::draw::chart::Chart;
use crate::sim::api::{Engine, Exchange};

use super::config::RunConfig;
use super::error::DriverError;
use super::recorder::Recorder;
use super::session::Session;

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub exit_code: i32,
    /// Number of collected (non-warm-up) timesteps.
    pub timesteps: usize,
    pub recorder: Recorder,
}

/// Runs one simulation on `engine`, collecting samples and refreshing `chart`
/// every non-warm-up timestep.
///
/// Returns once the engine has finished. The chart is left as of the last
/// refresh.
pub fn run_simulation(
    engine: &mut dyn Engine,
    config: &RunConfig,
    chart: Chart,
) -> Result<RunSummary> {
    config.validate()?;
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            config.output_dir.display()
        )
    })?;

    let mut session = Session::new(config, chart);
    for variable in session.requested_variables() {
        engine.request_variable(variable)?;
    }

    let args = config.run_args();
    info!(
        engine = engine.name(),
        weather = %args.weather_file.display(),
        model = %args.model_file.display(),
        zones = config.zones.len(),
        "starting simulation"
    );

    let exit_code = engine.run(&args, &mut |exchange: &mut dyn Exchange| {
        session.on_timestep(exchange).map(|_| ())
    })?;
    if exit_code != 0 {
        return Err(DriverError::EngineExit { code: exit_code }.into());
    }

    let timesteps = session.timestep();
    if timesteps == 0 {
        warn!("simulation finished without collecting any samples");
    } else {
        info!(timesteps, "simulation finished");
    }

    Ok(RunSummary {
        exit_code,
        timesteps,
        recorder: session.into_recorder(),
    })
}
