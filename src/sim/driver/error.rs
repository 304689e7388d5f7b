use chrono::NaiveDateTime;
use thiserror::Error;

/// Failures the driver itself detects. Engine-call and I/O failures travel as
/// plain `anyhow` errors with context.
#[derive(Debug, Error, PartialEq)]
pub enum DriverError {
    #[error(
        "invalid handles for {}: check spelling and sensor/actuator availability",
        .nicknames.join(", ")
    )]
    UnresolvedHandles { nicknames: Vec<String> },

    #[error("sample for '{series}' at {next} is earlier than the previous sample at {last}")]
    NonMonotonicSample {
        series: String,
        last: NaiveDateTime,
        next: NaiveDateTime,
    },

    #[error("engine exited with code {code}")]
    EngineExit { code: i32 },
}
