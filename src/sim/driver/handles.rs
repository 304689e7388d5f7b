use crate::sim::api::{
    ActuatorKey, ENVIRONMENT, Exchange, INVALID_HANDLE, OUTDOOR_DRY_BULB,
    OUTDOOR_DRY_BULB_CONTROL, VariableKey, WEATHER_DATA, ZONE_MEAN_AIR_TEMPERATURE,
};

use super::config::RunConfig;

/// Nickname of the outdoor air temperature series.
pub const OUTDOOR_NICKNAME: &str = "outdoor";
/// Nickname of the outdoor temperature actuator.
pub const OUTDOOR_ACTUATOR_NICKNAME: &str = "outdoor_actuator";

/// A variable the driver reads every collected timestep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedVariable {
    pub nickname: String,
    pub variable: VariableKey,
}

/// Everything the driver asks the engine for, in series order
/// (outdoor first, then zones in configuration order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedSet {
    pub variables: Vec<TrackedVariable>,
    pub actuator: Option<ActuatorKey>,
}

impl TrackedSet {
    pub fn from_config(config: &RunConfig) -> Self {
        let mut variables = vec![TrackedVariable {
            nickname: OUTDOOR_NICKNAME.to_string(),
            variable: VariableKey::new(OUTDOOR_DRY_BULB, ENVIRONMENT),
        }];
        variables.extend(config.zones.iter().map(|zone| TrackedVariable {
            nickname: zone.nickname.clone(),
            variable: VariableKey::new(ZONE_MEAN_AIR_TEMPERATURE, &zone.name),
        }));

        let actuator = config.outdoor_override.is_enabled().then(|| {
            ActuatorKey::new(WEATHER_DATA, OUTDOOR_DRY_BULB_CONTROL, ENVIRONMENT)
        });

        Self {
            variables,
            actuator,
        }
    }

    pub fn nicknames(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.nickname.as_str())
    }
}

/// Handles resolved against a running engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleSet {
    /// `(nickname, handle)` aligned with [`TrackedSet::variables`].
    pub variables: Vec<(String, i32)>,
    pub actuator: Option<i32>,
}

impl HandleSet {
    /// Looks every tracked name up once.
    pub fn resolve(tracked: &TrackedSet, exchange: &mut dyn Exchange) -> Self {
        let variables = tracked
            .variables
            .iter()
            .map(|t| (t.nickname.clone(), exchange.get_variable_handle(&t.variable)))
            .collect();
        let actuator = tracked
            .actuator
            .as_ref()
            .map(|a| exchange.get_actuator_handle(a));
        Self {
            variables,
            actuator,
        }
    }

    pub fn get(&self, nickname: &str) -> Option<i32> {
        if nickname == OUTDOOR_ACTUATOR_NICKNAME {
            return self.actuator;
        }
        self.variables
            .iter()
            .find(|(n, _)| n == nickname)
            .map(|(_, h)| *h)
    }

    /// Nicknames whose handle equals the engine's sentinel.
    pub fn invalid_nicknames(&self) -> Vec<String> {
        let mut invalid: Vec<String> = self
            .variables
            .iter()
            .filter(|(_, h)| *h == INVALID_HANDLE)
            .map(|(n, _)| n.clone())
            .collect();
        if self.actuator == Some(INVALID_HANDLE) {
            invalid.push(OUTDOOR_ACTUATOR_NICKNAME.to_string());
        }
        invalid
    }

    pub fn is_valid(&self) -> bool {
        self.invalid_nicknames().is_empty()
    }
}
