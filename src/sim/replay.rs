//! Offline [`Engine`] that replays an EPW file through lumped zone models.
//!
//! Each zone is a single air+mass node (1R1C) coupled to outdoor air:
//! `C dT/dt = UA (T_out - T) + Q_gains`, integrated with backward Euler.
//! This engine follows the same callback protocol as EnergyPlus (readiness,
//! warm-up days, handles for requested variables only, weather actuator,
//! severe-error channel), which is what the driver depends on.

use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, warn};

use super::api::{
    ActuatorKey, ENVIRONMENT, Engine, Exchange, INVALID_HANDLE, OUTDOOR_DRY_BULB,
    OUTDOOR_DRY_BULB_CONTROL, RunArgs, TimestepCallback, VariableKey, WEATHER_DATA,
    ZONE_MEAN_AIR_TEMPERATURE,
};
use super::weather::WeatherData;

const OUTDOOR_ACTUATOR_HANDLE: i32 = 0;

/// Lumped thermal model of one zone.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayZone {
    pub name: String,
    /// Envelope + infiltration conductance in W/K.
    pub ua_w_per_k: f64,
    /// Thermal capacity of the zone node in J/K.
    pub capacity_j_per_k: f64,
    /// Constant internal gains in W.
    pub internal_gains_w: f64,
    pub initial_temperature_c: f64,
}

impl ReplayZone {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ua_w_per_k: 150.0,
            capacity_j_per_k: 3.0e6,
            internal_gains_w: 500.0,
            initial_temperature_c: 22.0,
        }
    }

    /// One backward-Euler step of `dt_s` seconds.
    fn step(&self, t_zone: f64, t_out: f64, dt_s: f64) -> f64 {
        let c_dt = self.capacity_j_per_k.max(0.0) / dt_s;
        let ua = self.ua_w_per_k.max(0.0);
        if c_dt + ua <= 0.0 {
            return t_zone;
        }
        (c_dt * t_zone + ua * t_out + self.internal_gains_w) / (c_dt + ua)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayConfig {
    pub timesteps_per_hour: u32,
    /// Days replayed with the warm-up flag raised before the run period.
    pub warmup_days: u32,
    /// Days in the run period.
    pub run_days: u32,
    /// Number of initial callbacks during which data is reported as not ready.
    pub not_ready_callbacks: u32,
    pub zones: Vec<ReplayZone>,
}

impl ReplayConfig {
    pub fn new() -> Self {
        Self {
            timesteps_per_hour: 4,
            warmup_days: 1,
            run_days: 1,
            not_ready_callbacks: 1,
            zones: Vec::new(),
        }
    }

    /// Builds default zones with the given engine-side names.
    ///
    /// Internal gains are staggered per zone so the traces separate on a chart.
    pub fn for_zones<S: AsRef<str>>(names: &[S]) -> Self {
        let mut config = Self::new();
        config.zones = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut zone = ReplayZone::new(name.as_ref());
                zone.internal_gains_w += 150.0 * i as f64;
                zone
            })
            .collect();
        config
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    OutdoorDryBulb,
    ZoneTemperature(usize),
}

pub struct ReplayEngine {
    config: ReplayConfig,
    requested: HashSet<VariableKey>,
    severe_messages: Vec<String>,
}

impl ReplayEngine {
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            requested: HashSet::new(),
            severe_messages: Vec::new(),
        }
    }

    /// Severe errors issued during the last run.
    pub fn severe_messages(&self) -> &[String] {
        &self.severe_messages
    }
}

fn slot_for(zones: &[ReplayZone], variable: &VariableKey) -> Option<Slot> {
    if variable.name == OUTDOOR_DRY_BULB && variable.key == ENVIRONMENT {
        return Some(Slot::OutdoorDryBulb);
    }
    if variable.name == ZONE_MEAN_AIR_TEMPERATURE {
        return zones
            .iter()
            .position(|z| z.name.eq_ignore_ascii_case(&variable.key))
            .map(Slot::ZoneTemperature);
    }
    None
}

impl Engine for ReplayEngine {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn request_variable(&mut self, variable: &VariableKey) -> Result<()> {
        self.requested.insert(variable.clone());
        Ok(())
    }

    fn run(&mut self, args: &RunArgs, callback: &mut TimestepCallback<'_>) -> Result<i32> {
        let weather = WeatherData::read_epw(&args.weather_file)?;
        anyhow::ensure!(
            weather.num_hours() > 0,
            "Weather file {} has no data rows",
            args.weather_file.display()
        );
        anyhow::ensure!(
            self.config.timesteps_per_hour > 0,
            "timesteps_per_hour must be positive"
        );
        debug!(
            model = %args.model_file.display(),
            zones = self.config.zones.len(),
            "replay engine ignores the model file; zones come from ReplayConfig"
        );

        let slots: Vec<Slot> = self
            .requested
            .iter()
            .filter_map(|v| slot_for(&self.config.zones, v))
            .collect();

        let mut state = ReplayState {
            requested: &self.requested,
            zones: &self.config.zones,
            slots,
            weather: &weather,
            zone_temperatures: self
                .config
                .zones
                .iter()
                .map(|z| z.initial_temperature_c)
                .collect(),
            sim_time_h: 0.0,
            warmup: true,
            ready: false,
            outdoor_override: None,
            severe_messages: Vec::new(),
        };

        let tph = self.config.timesteps_per_hour;
        let dt_h = 1.0 / tph as f64;
        let dt_s = dt_h * 3600.0;
        let steps_per_day = 24 * tph;
        let mut calls: u32 = 0;

        let total_days = self.config.warmup_days + self.config.run_days;
        let mut result = Ok(0);
        'days: for day in 0..total_days {
            state.warmup = day < self.config.warmup_days;
            // Warm-up days repeat the first day; the run period counts from zero.
            let day_offset_h = if state.warmup {
                0.0
            } else {
                ((day - self.config.warmup_days) * 24) as f64
            };
            for step in 0..steps_per_day {
                state.sim_time_h = day_offset_h + (step + 1) as f64 * dt_h;
                state.ready = calls >= self.config.not_ready_callbacks;
                calls += 1;

                let exchange: &mut dyn Exchange = &mut state;
                if let Err(e) = callback(exchange) {
                    result = Err(e);
                    break 'days;
                }

                let t_out = state.outdoor_c();
                for (t, zone) in state.zone_temperatures.iter_mut().zip(state.zones) {
                    *t = zone.step(*t, t_out, dt_s);
                }
            }
        }

        self.severe_messages = state.severe_messages;
        result
    }
}

struct ReplayState<'a> {
    requested: &'a HashSet<VariableKey>,
    zones: &'a [ReplayZone],
    slots: Vec<Slot>,
    weather: &'a WeatherData,
    zone_temperatures: Vec<f64>,
    sim_time_h: f64,
    warmup: bool,
    ready: bool,
    outdoor_override: Option<f64>,
    severe_messages: Vec<String>,
}

impl ReplayState<'_> {
    fn outdoor_c(&self) -> f64 {
        self.outdoor_override.unwrap_or_else(|| {
            // Non-empty weather is checked before the run starts.
            self.weather.dry_bulb_at(self.sim_time_h).unwrap_or_default()
        })
    }

    fn slot_handle(&self, slot: Slot) -> i32 {
        self.slots
            .iter()
            .position(|s| *s == slot)
            .map(|i| i as i32)
            .unwrap_or(INVALID_HANDLE)
    }
}

impl Exchange for ReplayState<'_> {
    fn api_data_fully_ready(&self) -> bool {
        self.ready
    }

    fn warmup_flag(&self) -> bool {
        self.warmup
    }

    fn current_sim_time(&self) -> f64 {
        self.sim_time_h
    }

    fn get_variable_handle(&mut self, variable: &VariableKey) -> i32 {
        if !self.ready || !self.requested.contains(variable) {
            return INVALID_HANDLE;
        }
        slot_for(self.zones, variable)
            .map(|s| self.slot_handle(s))
            .unwrap_or(INVALID_HANDLE)
    }

    fn get_actuator_handle(&mut self, actuator: &ActuatorKey) -> i32 {
        if self.ready
            && actuator.component_type == WEATHER_DATA
            && actuator.control_type == OUTDOOR_DRY_BULB_CONTROL
            && actuator.key == ENVIRONMENT
        {
            OUTDOOR_ACTUATOR_HANDLE
        } else {
            INVALID_HANDLE
        }
    }

    fn get_variable_value(&self, handle: i32) -> f64 {
        let slot = usize::try_from(handle)
            .ok()
            .and_then(|i| self.slots.get(i).copied());
        match slot {
            Some(Slot::OutdoorDryBulb) => self.outdoor_c(),
            Some(Slot::ZoneTemperature(z)) => self.zone_temperatures[z],
            None => {
                warn!(handle, "get_variable_value called with an invalid handle");
                0.0
            }
        }
    }

    fn set_actuator_value(&mut self, handle: i32, value: f64) {
        if handle == OUTDOOR_ACTUATOR_HANDLE {
            self.outdoor_override = Some(value);
        } else {
            warn!(handle, "set_actuator_value called with an invalid handle");
        }
    }

    fn issue_severe(&mut self, message: &str) {
        warn!(message, "severe error issued by callback");
        self.severe_messages.push(message.to_string());
    }
}
