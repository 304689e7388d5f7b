use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sim::api::RunArgs;

use super::handles::{OUTDOOR_ACTUATOR_NICKNAME, OUTDOOR_NICKNAME};

/// Synthetic outdoor temperature written through the weather actuator each
/// collected timestep, overriding the weather file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutdoorOverride {
    /// Leave the weather file in charge; no actuator is resolved.
    None,
    /// Hold outdoor dry bulb at a fixed value (°C).
    Constant { value_c: f64 },
    /// Draw outdoor dry bulb uniformly from `[low_c, high_c]` every timestep.
    UniformRandom { low_c: f64, high_c: f64 },
}

impl OutdoorOverride {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Value to write this timestep, if any.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<f64> {
        match *self {
            Self::None => None,
            Self::Constant { value_c } => Some(value_c),
            Self::UniformRandom { low_c, high_c } if low_c == high_c => Some(low_c),
            Self::UniformRandom { low_c, high_c } => Some(rng.gen_range(low_c..=high_c)),
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            Self::None => Ok(()),
            Self::Constant { value_c } => {
                anyhow::ensure!(value_c.is_finite(), "Constant override must be finite");
                Ok(())
            }
            Self::UniformRandom { low_c, high_c } => {
                anyhow::ensure!(
                    low_c.is_finite() && high_c.is_finite() && low_c <= high_c,
                    "UniformRandom override needs finite low_c <= high_c (got {low_c}..{high_c})"
                );
                Ok(())
            }
        }
    }
}

/// A zone tracked by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSpec {
    /// Short name used for buffers and chart panels (e.g. "south").
    pub nickname: String,
    /// Zone name as known to the engine (e.g. "SPACE1-1").
    pub name: String,
}

impl ZoneSpec {
    pub fn new(nickname: &str, name: &str) -> Self {
        Self {
            nickname: nickname.to_string(),
            name: name.to_string(),
        }
    }
}

/// Configuration of one driver run.
///
/// Missing fields in a JSON config fall back to [`RunConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Wall-clock datetime that simulation hour zero maps to.
    pub start_datetime: NaiveDateTime,
    pub zones: Vec<ZoneSpec>,
    pub outdoor_override: OutdoorOverride,
    pub weather_file: PathBuf,
    pub model_file: PathBuf,
    pub output_dir: PathBuf,
    /// Seed for the override's random source. Entropy when absent.
    pub seed: Option<u64>,
}

impl RunConfig {
    pub fn new() -> Self {
        Self::one_zone_random_oat()
    }

    /// Single uncontrolled zone with a random outdoor temperature in [10, 35] °C.
    pub fn one_zone_random_oat() -> Self {
        Self {
            start_datetime: midnight(2024, 1, 1),
            zones: vec![ZoneSpec::new("zone", "Zone One")],
            outdoor_override: OutdoorOverride::UniformRandom {
                low_c: 10.0,
                high_c: 35.0,
            },
            weather_file: PathBuf::from("weather.epw"),
            model_file: PathBuf::from("1ZoneUncontrolled.idf"),
            output_dir: PathBuf::from("eplus_out"),
            seed: None,
        }
    }

    /// Five-zone air-cooled building with outdoor air held at 15 °C.
    pub fn five_zone_demand_limit() -> Self {
        Self {
            start_datetime: midnight(2024, 7, 7),
            zones: vec![
                ZoneSpec::new("south", "SPACE1-1"),
                ZoneSpec::new("west", "SPACE2-1"),
                ZoneSpec::new("east", "SPACE3-1"),
                ZoneSpec::new("north", "SPACE4-1"),
                ZoneSpec::new("center", "SPACE5-1"),
            ],
            outdoor_override: OutdoorOverride::Constant { value_c: 15.0 },
            weather_file: PathBuf::from("weather.epw"),
            model_file: PathBuf::from("5ZoneAirCooled.idf"),
            output_dir: PathBuf::from("eplus_out"),
            seed: None,
        }
    }

    /// Reads a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse run config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.outdoor_override.validate()?;
        let mut seen = std::collections::HashSet::new();
        for zone in &self.zones {
            anyhow::ensure!(!zone.nickname.is_empty(), "Zone nickname must not be empty");
            anyhow::ensure!(
                zone.nickname != OUTDOOR_NICKNAME && zone.nickname != OUTDOOR_ACTUATOR_NICKNAME,
                "Zone nickname '{}' is reserved",
                zone.nickname
            );
            anyhow::ensure!(
                seen.insert(zone.nickname.as_str()),
                "Duplicate zone nickname '{}'",
                zone.nickname
            );
        }
        Ok(())
    }

    pub fn run_args(&self) -> RunArgs {
        RunArgs {
            output_dir: self.output_dir.clone(),
            weather_file: self.weather_file.clone(),
            model_file: self.model_file.clone(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn midnight(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_presets() {
        let one = RunConfig::one_zone_random_oat();
        assert_eq!(one.zones.len(), 1);
        assert_eq!(one.start_datetime.to_string(), "2024-01-01 00:00:00");
        assert!(one.outdoor_override.is_enabled());

        let five = RunConfig::five_zone_demand_limit();
        let names: Vec<&str> = five.zones.iter().map(|z| z.nickname.as_str()).collect();
        assert_eq!(names, ["south", "west", "east", "north", "center"]);
        assert_eq!(five.start_datetime.to_string(), "2024-07-07 00:00:00");
        assert_eq!(
            five.outdoor_override,
            OutdoorOverride::Constant { value_c: 15.0 }
        );
        five.validate().unwrap();
    }

    #[test]
    fn test_override_sampling() {
        let mut rng = StdRng::seed_from_u64(11);
        assert_eq!(OutdoorOverride::None.sample(&mut rng), None);
        assert_eq!(
            OutdoorOverride::Constant { value_c: 15.0 }.sample(&mut rng),
            Some(15.0)
        );
        let uniform = OutdoorOverride::UniformRandom {
            low_c: 10.0,
            high_c: 35.0,
        };
        for _ in 0..1000 {
            let v = uniform.sample(&mut rng).unwrap();
            assert!((10.0..=35.0).contains(&v));
        }
        let degenerate = OutdoorOverride::UniformRandom {
            low_c: 4.0,
            high_c: 4.0,
        };
        assert_eq!(degenerate.sample(&mut rng), Some(4.0));
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        let mut config = RunConfig::new();
        config.outdoor_override = OutdoorOverride::UniformRandom {
            low_c: 30.0,
            high_c: 10.0,
        };
        assert!(config.validate().is_err());

        let mut config = RunConfig::five_zone_demand_limit();
        config.zones.push(ZoneSpec::new("south", "SPACE6-1"));
        assert!(config.validate().is_err());

        let mut config = RunConfig::new();
        config.zones = vec![ZoneSpec::new("outdoor", "Zone One")];
        assert!(config.validate().is_err());

        config.zones = vec![ZoneSpec::new("outdoor_actuator", "Zone One")];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "start_datetime": "2024-07-07T00:00:00",
            "outdoor_override": { "kind": "constant", "value_c": 12.5 },
            "zones": [ { "nickname": "south", "name": "SPACE1-1" } ]
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.zones, vec![ZoneSpec::new("south", "SPACE1-1")]);
        assert_eq!(
            config.outdoor_override,
            OutdoorOverride::Constant { value_c: 12.5 }
        );
        assert_eq!(config.weather_file, PathBuf::from("weather.epw"));
        assert_eq!(config.seed, None);

        let none: OutdoorOverride = serde_json::from_str(r#"{ "kind": "none" }"#).unwrap();
        assert!(!none.is_enabled());
    }

    #[test]
    fn test_json_file_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "eplus-live-config-{}.json",
            std::process::id()
        ));
        let config = RunConfig::five_zone_demand_limit();
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = RunConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_file(&path).ok();
    }
}
