//! Per-run driver state, advanced by the engine's timestep callback.
//!
//! ```text
//! AwaitingReady --(data ready, handles valid)--> HandlesResolved --(first non-warm-up step)--> Collecting
//!       \--(data ready, any handle == -1)--> Halted
//! ```

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, TimeDelta};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::draw::chart::Chart;
use crate::sim::api::{Exchange, VariableKey};

use super::config::{OutdoorOverride, RunConfig};
use super::error::DriverError;
use super::handles::{HandleSet, TrackedSet};
use super::recorder::{Recorder, Sample};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingReady,
    HandlesResolved,
    Collecting,
    /// A handle failed to resolve; nothing more is collected this run.
    Halted,
}

/// What a single callback did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    NotReady,
    WarmUp,
    Collected { timestep: usize },
    Halted,
}

pub struct Session {
    start: NaiveDateTime,
    outdoor_override: OutdoorOverride,
    tracked: TrackedSet,
    rng: StdRng,
    phase: Phase,
    handles: Option<HandleSet>,
    recorder: Recorder,
    chart: Chart,
    timestep: usize,
}

impl Session {
    pub fn new(config: &RunConfig, chart: Chart) -> Self {
        let tracked = TrackedSet::from_config(config);
        let recorder = Recorder::new(tracked.nicknames());
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            start: config.start_datetime,
            outdoor_override: config.outdoor_override,
            tracked,
            rng,
            phase: Phase::AwaitingReady,
            handles: None,
            recorder,
            chart,
            timestep: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn handles(&self) -> Option<&HandleSet> {
        self.handles.as_ref()
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn into_recorder(self) -> Recorder {
        self.recorder
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    /// Number of collected timesteps.
    pub fn timestep(&self) -> usize {
        self.timestep
    }

    /// Variables that must be requested from the engine before the run.
    pub fn requested_variables(&self) -> impl Iterator<Item = &VariableKey> {
        self.tracked.variables.iter().map(|t| &t.variable)
    }

    /// Timestep callback body.
    pub fn on_timestep(&mut self, exchange: &mut dyn Exchange) -> Result<StepOutcome> {
        match self.phase {
            Phase::Halted => return Ok(StepOutcome::Halted),
            Phase::AwaitingReady => {
                if !exchange.api_data_fully_ready() {
                    return Ok(StepOutcome::NotReady);
                }
                self.resolve_handles(exchange)?;
            }
            Phase::HandlesResolved | Phase::Collecting => {}
        }

        if exchange.warmup_flag() {
            return Ok(StepOutcome::WarmUp);
        }

        self.collect(exchange)
    }

    /// Resolves all handles once. Later calls return without touching the engine.
    ///
    /// Any handle equal to the sentinel is fatal for the run: a severe error
    /// goes to the engine, the session halts, and the error is returned so the
    /// engine stops calling back.
    pub fn resolve_handles(&mut self, exchange: &mut dyn Exchange) -> Result<()> {
        if self.handles.is_some() || self.phase == Phase::Halted {
            return Ok(());
        }

        let handles = HandleSet::resolve(&self.tracked, exchange);
        let invalid = handles.invalid_nicknames();
        if !invalid.is_empty() {
            let err = DriverError::UnresolvedHandles { nicknames: invalid };
            exchange.issue_severe(&format!("Invalid Handle in API usage: {err}"));
            warn!(%err, "halting data collection");
            self.phase = Phase::Halted;
            return Err(err.into());
        }

        debug!(?handles, "handles resolved");
        self.handles = Some(handles);
        self.phase = Phase::HandlesResolved;
        Ok(())
    }

    fn collect(&mut self, exchange: &mut dyn Exchange) -> Result<StepOutcome> {
        let Some(handles) = self.handles.as_ref() else {
            anyhow::bail!("Session::collect called before handles were resolved");
        };

        let sim_hours = exchange.current_sim_time();
        let timestamp = sim_datetime(self.start, sim_hours)?;

        if let Some(actuator) = handles.actuator {
            if let Some(value) = self.outdoor_override.sample(&mut self.rng) {
                exchange.set_actuator_value(actuator, value);
            }
        }

        for (index, (_, handle)) in handles.variables.iter().enumerate() {
            let value = exchange.get_variable_value(*handle);
            self.recorder.push(index, Sample { timestamp, value })?;
        }

        if self.phase == Phase::HandlesResolved {
            debug!("first sample collected");
        }
        self.phase = Phase::Collecting;
        self.timestep += 1;
        info!(timestep = self.timestep, sim_hours, %timestamp, "collected");

        self.chart.refresh(&self.recorder)?;
        Ok(StepOutcome::Collected {
            timestep: self.timestep,
        })
    }
}

/// Wall-clock time `hours` after `start`, to the millisecond.
pub fn sim_datetime(start: NaiveDateTime, hours: f64) -> Result<NaiveDateTime> {
    let ms = hours * 3_600_000.0;
    anyhow::ensure!(ms.is_finite(), "Simulation time is not finite: {hours} h");
    TimeDelta::try_milliseconds(ms.round() as i64)
        .and_then(|d| start.checked_add_signed(d))
        .with_context(|| format!("Simulation time out of range: {hours} h"))
}
