//! Narrow interface to an external building-energy engine.
//!
//! [`Engine`] covers what happens outside the run (variable requests, the run
//! itself). [`Exchange`] is what the per-timestep callback sees while the
//! engine is paused inside its zone-timestep loop.

use std::path::PathBuf;

use anyhow::Result;

/// Handle value the engine returns for names it could not resolve.
pub const INVALID_HANDLE: i32 = -1;

// Names shared by every backend.
pub const OUTDOOR_DRY_BULB: &str = "Site Outdoor Air DryBulb Temperature";
pub const ZONE_MEAN_AIR_TEMPERATURE: &str = "Zone Mean Air Temperature";
pub const ENVIRONMENT: &str = "Environment";
pub const WEATHER_DATA: &str = "Weather Data";
pub const OUTDOOR_DRY_BULB_CONTROL: &str = "Outdoor Dry Bulb";

/// Arguments handed to the engine's command-line entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    pub output_dir: PathBuf,
    pub weather_file: PathBuf,
    pub model_file: PathBuf,
}

impl RunArgs {
    /// Argument vector in the engine's CLI order: `-d <dir> -w <epw> <idf>`.
    pub fn to_argv(&self) -> Vec<String> {
        vec![
            "-d".to_string(),
            self.output_dir.display().to_string(),
            "-w".to_string(),
            self.weather_file.display().to_string(),
            self.model_file.display().to_string(),
        ]
    }
}

/// Output variable addressed by name and key (e.g. a zone name or "Environment").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableKey {
    pub name: String,
    pub key: String,
}

impl VariableKey {
    pub fn new(name: &str, key: &str) -> Self {
        Self {
            name: name.to_string(),
            key: key.to_string(),
        }
    }
}

/// Actuator addressed by component type, control type and key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActuatorKey {
    pub component_type: String,
    pub control_type: String,
    pub key: String,
}

impl ActuatorKey {
    pub fn new(component_type: &str, control_type: &str, key: &str) -> Self {
        Self {
            component_type: component_type.to_string(),
            control_type: control_type.to_string(),
            key: key.to_string(),
        }
    }
}

/// Data exchange available to the timestep callback.
pub trait Exchange {
    /// True once the engine's data tables can be queried for handles.
    fn api_data_fully_ready(&self) -> bool;

    /// True while the engine runs its warm-up days.
    fn warmup_flag(&self) -> bool;

    /// Elapsed simulation time in hours.
    fn current_sim_time(&self) -> f64;

    fn get_variable_handle(&mut self, variable: &VariableKey) -> i32;

    fn get_actuator_handle(&mut self, actuator: &ActuatorKey) -> i32;

    fn get_variable_value(&self, handle: i32) -> f64;

    fn set_actuator_value(&mut self, handle: i32, value: f64);

    /// Reports a severe error through the engine's own error channel.
    fn issue_severe(&mut self, message: &str);
}

/// Per-timestep callback registered for the duration of one run.
pub type TimestepCallback<'a> = dyn FnMut(&mut dyn Exchange) -> Result<()> + 'a;

/// An engine instance that owns one simulation state.
pub trait Engine {
    /// Human-readable identifier for logs.
    fn name(&self) -> &'static str;

    /// Requests an output variable so that a handle for it can be resolved later.
    fn request_variable(&mut self, variable: &VariableKey) -> Result<()>;

    /// Runs the simulation, invoking `callback` at the beginning of every zone
    /// timestep. Returns the engine's exit code.
    ///
    /// An error returned by the callback aborts the run and is returned here.
    fn run(&mut self, args: &RunArgs, callback: &mut TimestepCallback<'_>) -> Result<i32>;
}
