//! Live-simulation driver: resolves handles once the engine is ready, samples
//! outdoor and zone temperatures every non-warm-up timestep, and refreshes the
//! chart.

pub mod config;
pub mod error;
pub mod handles;
pub mod recorder;
pub mod runner;
pub mod session;

pub use config::{OutdoorOverride, RunConfig, ZoneSpec};
pub use error::DriverError;
pub use recorder::{Recorder, Sample, SampleSeries};
pub use runner::{RunSummary, run_simulation};
pub use session::{Phase, Session, StepOutcome};
