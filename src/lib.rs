pub mod draw;
pub mod sim;

// Prelude
pub use draw::chart::{Chart, ChartFrame, ChartSink, NullSink};
pub use draw::config::ChartConfig;
pub use draw::rerun::{RerunChart, Viewer};
pub use sim::api::{Engine, Exchange, RunArgs};
pub use sim::driver::{DriverError, OutdoorOverride, RunConfig, RunSummary, run_simulation};
pub use sim::epw_writer::create_epw_file;
pub use sim::replay::{ReplayConfig, ReplayEngine};
pub use sim::weather::WeatherData;
