use std::path::Path;

use anyhow::{Context, Result};

/// Missing-data sentinel used by the EPW format for unrepresented fields.
pub const MISSING: f64 = 9999.0;

/// A single hourly weather record.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    pub year: i32,
    /// Month (1-12).
    pub month: u8,
    /// Day of month (1-31).
    pub day: u8,
    /// Hour (1-24).
    pub hour: u8,
    /// Minute field, 60 for whole-hour records.
    pub minute: u8,
    /// Dry bulb temperature in °C.
    pub dry_bulb_temperature: f64,
    /// Dew point temperature in °C.
    pub dew_point_temperature: f64,
    /// Relative humidity in %.
    pub relative_humidity: f64,
    /// Wind speed in m/s.
    pub wind_speed: f64,
    /// Wind direction in degrees from north.
    pub wind_direction: f64,
}

/// Column positions of the fields we read from a data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowLayout {
    /// Full 35-field EPW row.
    Standard,
    /// 26-field row as written by [`crate::sim::epw_writer`].
    Compact,
}

impl RowLayout {
    const STANDARD_FIELDS: usize = 35;
    const COMPACT_FIELDS: usize = 26;

    fn detect(num_fields: usize) -> Option<Self> {
        if num_fields >= Self::STANDARD_FIELDS {
            Some(Self::Standard)
        } else if num_fields >= Self::COMPACT_FIELDS {
            Some(Self::Compact)
        } else {
            None
        }
    }

    /// Returns `(wind_direction, wind_speed)` column indices.
    fn wind_columns(self) -> (usize, usize) {
        match self {
            Self::Standard => (20, 21),
            Self::Compact => (15, 14),
        }
    }
}

/// Parsed EPW weather data.
#[derive(Debug, Clone)]
pub struct WeatherData {
    /// Location name.
    pub location: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Time zone (hours from UTC).
    pub timezone: f64,
    /// Elevation in meters.
    pub elevation: f64,
    pub records: Vec<WeatherRecord>,
}

impl WeatherData {
    /// Reads and parses an EPW file from disk.
    pub fn read_epw(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read weather file: {}", path.display()))?;
        Self::from_epw(&content)
            .with_context(|| format!("Failed to parse weather file: {}", path.display()))
    }

    /// Parses EPW (EnergyPlus Weather) file content.
    ///
    /// EPW format: 8 header lines followed by hourly data rows.
    /// Standard rows have 35 comma-separated fields; the compact rows written
    /// by the one-day emitter have 26 and carry wind speed/direction earlier.
    pub fn from_epw(content: &str) -> Result<Self> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() < 9 {
            anyhow::bail!("EPW file too short: expected at least 9 lines");
        }

        // LOCATION,city,state_province,country,source,WMO,lat,lon,tz,elevation
        let location_fields: Vec<&str> = lines[0].split(',').collect();
        if location_fields.len() < 10 || location_fields[0].trim() != "LOCATION" {
            anyhow::bail!("Invalid LOCATION header");
        }

        let location = format!(
            "{}, {}",
            location_fields[1].trim(),
            location_fields[3].trim()
        );
        let latitude: f64 = location_fields[6]
            .trim()
            .parse()
            .context("Invalid latitude")?;
        let longitude: f64 = location_fields[7]
            .trim()
            .parse()
            .context("Invalid longitude")?;
        let timezone: f64 = location_fields[8]
            .trim()
            .parse()
            .context("Invalid timezone")?;
        let elevation: f64 = location_fields[9]
            .trim()
            .parse()
            .context("Invalid elevation")?;

        let mut records = Vec::new();
        for (i, line) in lines.iter().enumerate().skip(8) {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let Some(layout) = RowLayout::detect(fields.len()) else {
                continue; // Skip malformed lines
            };
            let line_no = i + 1;
            let (wind_dir_col, wind_speed_col) = layout.wind_columns();

            let record = WeatherRecord {
                year: parse_field(&fields, 0, "year", line_no)?,
                month: parse_field(&fields, 1, "month", line_no)?,
                day: parse_field(&fields, 2, "day", line_no)?,
                hour: parse_field(&fields, 3, "hour", line_no)?,
                minute: parse_field(&fields, 4, "minute", line_no)?,
                dry_bulb_temperature: parse_field(&fields, 6, "dry bulb", line_no)?,
                dew_point_temperature: parse_field(&fields, 7, "dew point", line_no)?,
                relative_humidity: parse_field(&fields, 8, "RH", line_no)?,
                wind_speed: parse_field(&fields, wind_speed_col, "wind speed", line_no)?,
                wind_direction: parse_field(&fields, wind_dir_col, "wind dir", line_no)?,
            };
            records.push(record);
        }

        Ok(Self {
            location,
            latitude,
            longitude,
            timezone,
            elevation,
            records,
        })
    }

    /// Returns the number of hours in the dataset.
    pub fn num_hours(&self) -> usize {
        self.records.len()
    }

    /// Returns the mean dry bulb temperature.
    pub fn mean_temperature(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.records.iter().map(|r| r.dry_bulb_temperature).sum();
        sum / self.records.len() as f64
    }

    /// Dry bulb temperature at fractional hour `t` since the start of the data,
    /// linearly interpolated between hourly records.
    ///
    /// Record `k` (hour `k + 1`) is taken as the value at the end of that hour,
    /// matching how EPW hours are labelled. The series is treated as periodic,
    /// so a one-day file can drive any number of days.
    pub fn dry_bulb_at(&self, t_hours: f64) -> Option<f64> {
        let n = self.records.len();
        if n == 0 {
            return None;
        }
        let period = n as f64;
        let t = t_hours.rem_euclid(period);
        // Value of record k sits at t = k + 1; record n-1 wraps to t = 0.
        let upper = t.floor() as usize % n;
        let lower = (upper + n - 1) % n;
        let frac = t - t.floor();
        let a = self.records[lower].dry_bulb_temperature;
        let b = self.records[upper].dry_bulb_temperature;
        Some(a + (b - a) * frac)
    }
}

fn parse_field<T: std::str::FromStr>(
    fields: &[&str],
    col: usize,
    what: &str,
    line_no: usize,
) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    fields[col]
        .parse()
        .with_context(|| format!("Invalid {what} at line {line_no}"))
}
