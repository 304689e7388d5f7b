//! Synthetic one-day weather file in the fixed EPW-like layout.
//!
//! The file has 8 header lines followed by 24 hourly rows for a single date.
//! Field order and the `9999` missing-data sentinel must stay as they are,
//! since the engine's weather reader consumes the file verbatim.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use rand::Rng;

use super::weather::{MISSING, WeatherRecord};

pub const HEADER_LINES: [&str; 8] = [
    "LOCATION,MN_MINNEAPOLIS-ST-PAUL-IAP,USA-MN,USA,TMYx,726580,45.00,-93.00,-6.0,265",
    "DESIGN CONDITIONS,0",
    "TYPICAL/EXTREME PERIODS,0",
    "GROUND TEMPERATURES,0",
    "HOLIDAYS/DAYLIGHT SAVINGS,No,0,0,0",
    "COMMENTS 1,Created with random data for testing",
    "COMMENTS 2,Generated by custom script",
    "DATA PERIODS,1,1,Data,Sunday, 1/ 1, 12/31",
];

pub const HOURS_PER_DAY: u8 = 24;

const YEAR: i32 = 2024;
const MONTH: u8 = 7;
const DAY: u8 = 7;
/// WMO station code, also written into the data-source column.
const DATA_SOURCE: &str = "726580";
const DEW_POINT_DEPRESSION_C: f64 = 3.0;
const RELATIVE_HUMIDITY_PCT: f64 = 50.0;
const RELATIVE_HUMIDITY_SPREAD: f64 = 10.0;
const WIND_SPEED_M_PER_S: f64 = 3.5;
const WIND_SPEED_SPREAD: f64 = 1.0;
const WIND_DIRECTION_DEG: f64 = 180.0;

/// Parameters of the synthetic day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticDay {
    /// Mean dry bulb temperature in °C.
    pub base_temp: f64,
    /// Half-width of the uniform dry bulb perturbation in °C.
    pub fluctuation: f64,
}

impl SyntheticDay {
    pub fn new(base_temp: f64, fluctuation: f64) -> Self {
        Self {
            base_temp,
            fluctuation,
        }
    }

    /// Draws the 24 hourly records.
    pub fn records<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<WeatherRecord> {
        (1..=HOURS_PER_DAY)
            .map(|hour| self.record(hour, rng))
            .collect()
    }

    fn record<R: Rng + ?Sized>(&self, hour: u8, rng: &mut R) -> WeatherRecord {
        let dry_bulb = self.dry_bulb(rng);
        WeatherRecord {
            year: YEAR,
            month: MONTH,
            day: DAY,
            hour,
            minute: 60,
            dry_bulb_temperature: dry_bulb,
            dew_point_temperature: dry_bulb - DEW_POINT_DEPRESSION_C,
            relative_humidity: RELATIVE_HUMIDITY_PCT + symmetric(rng, RELATIVE_HUMIDITY_SPREAD),
            wind_speed: WIND_SPEED_M_PER_S + symmetric(rng, WIND_SPEED_SPREAD),
            wind_direction: WIND_DIRECTION_DEG,
        }
    }

    /// Dry bulb drawn uniformly from the 0.1 °C grid points inside
    /// `[base - |fluct|, base + |fluct|]`, so the value survives the file's
    /// one-decimal format unchanged. Falls back to an unrounded sample when
    /// the band holds no grid point.
    fn dry_bulb<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let h = half_width(self.fluctuation);
        let (lo, hi) = (self.base_temp - h, self.base_temp + h);
        match tenth_grid(lo, hi) {
            Some((k_lo, k_hi)) => rng.gen_range(k_lo..=k_hi) as f64 / 10.0,
            None => self.base_temp + symmetric(rng, h),
        }
    }
}

impl Default for SyntheticDay {
    fn default() -> Self {
        Self::new(30.0, 5.0)
    }
}

/// Formats one data row.
pub fn format_record(record: &WeatherRecord) -> String {
    let m = format!("{MISSING:.0}");
    format!(
        "{},{},{},{},{},{},{:.1},{:.1},{:.0},{m},{m},{m},{m},{m},{:.1},{},0,0,0,0,0,0,0,0,0,0",
        record.year,
        record.month,
        record.day,
        record.hour,
        record.minute,
        DATA_SOURCE,
        record.dry_bulb_temperature,
        record.dew_point_temperature,
        record.relative_humidity,
        record.wind_speed,
        record.wind_direction,
    )
}

/// Writes header and records to `writer`.
pub fn write_epw<W: Write>(writer: &mut W, records: &[WeatherRecord]) -> Result<()> {
    for line in HEADER_LINES {
        writeln!(writer, "{line}")?;
    }
    for record in records {
        writeln!(writer, "{}", format_record(record))?;
    }
    Ok(())
}

/// Creates a one-day weather file at `path`, overwriting any existing file.
pub fn create_epw_file(path: &Path, base_temp: f64, fluctuation: f64) -> Result<Vec<WeatherRecord>> {
    create_epw_file_with_rng(path, base_temp, fluctuation, &mut rand::thread_rng())
}

/// Same as [`create_epw_file`] with an explicit random source.
pub fn create_epw_file_with_rng<R: Rng + ?Sized>(
    path: &Path,
    base_temp: f64,
    fluctuation: f64,
    rng: &mut R,
) -> Result<Vec<WeatherRecord>> {
    let records = SyntheticDay::new(base_temp, fluctuation).records(rng);

    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_epw(&mut writer, &records)
        .with_context(|| format!("Failed to write weather file: {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush weather file: {}", path.display()))?;

    Ok(records)
}

/// Uniform sample in `[-half_width, half_width]`.
fn symmetric<R: Rng + ?Sized>(rng: &mut R, width: f64) -> f64 {
    let h = half_width(width);
    if h == 0.0 {
        return 0.0;
    }
    rng.gen_range(-h..=h)
}

/// `|x|`, or zero when `x` is not finite.
fn half_width(x: f64) -> f64 {
    if x.is_finite() { x.abs() } else { 0.0 }
}

/// Integer range `k_lo..=k_hi` such that every `k / 10` lies in `[lo, hi]`.
fn tenth_grid(lo: f64, hi: f64) -> Option<(i64, i64)> {
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let mut k_lo = (lo * 10.0).ceil() as i64;
    let mut k_hi = (hi * 10.0).floor() as i64;
    // The products above can land one grid step outside the band.
    if (k_lo as f64 / 10.0) < lo {
        k_lo += 1;
    }
    if (k_hi as f64 / 10.0) > hi {
        k_hi -= 1;
    }
    (k_lo <= k_hi).then_some((k_lo, k_hi))
}
