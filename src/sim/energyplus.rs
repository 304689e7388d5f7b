//! [`Engine`] backed by the EnergyPlus C API (`libenergyplusapi`).
//!
//! Only compiled with the `energyplus` feature. The library must be on the
//! linker search path (e.g. `RUSTFLAGS="-L /usr/local/EnergyPlus-24-1-0"`).

use std::cell::Cell;
use std::ffi::{CString, c_char, c_int, c_void};
use std::ptr;

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::api::{
    ActuatorKey, Engine, Exchange, INVALID_HANDLE, RunArgs, TimestepCallback, VariableKey,
};

type EnergyPlusState = *mut c_void;

#[link(name = "energyplusapi")]
unsafe extern "C" {
    fn stateNew() -> EnergyPlusState;
    fn stateDelete(state: EnergyPlusState);

    fn energyplus(state: EnergyPlusState, argc: c_int, argv: *const *const c_char) -> c_int;
    fn issueSevere(state: EnergyPlusState, message: *const c_char);
    fn stopSimulation(state: EnergyPlusState);
    fn callbackBeginZoneTimeStepAfterInitHeatBalance(
        state: EnergyPlusState,
        f: extern "C" fn(EnergyPlusState),
    );

    fn apiDataFullyReady(state: EnergyPlusState) -> c_int;
    fn warmupFlag(state: EnergyPlusState) -> c_int;
    fn currentSimTime(state: EnergyPlusState) -> f64;
    fn requestVariable(state: EnergyPlusState, variable: *const c_char, key: *const c_char);
    fn getVariableHandle(state: EnergyPlusState, variable: *const c_char, key: *const c_char)
    -> c_int;
    fn getVariableValue(state: EnergyPlusState, handle: c_int) -> f64;
    fn getActuatorHandle(
        state: EnergyPlusState,
        component_type: *const c_char,
        control_type: *const c_char,
        key: *const c_char,
    ) -> c_int;
    fn setActuatorValue(state: EnergyPlusState, handle: c_int, value: f64);
}

/// Callback and its first error, reachable from the C trampoline during `run`.
struct ActiveRun<'a, 'b> {
    callback: &'a mut TimestepCallback<'b>,
    error: Option<anyhow::Error>,
}

thread_local! {
    // The C callback carries no user data, so the active run is parked here.
    static ACTIVE_RUN: Cell<*mut c_void> = const { Cell::new(ptr::null_mut()) };
}

extern "C" fn on_zone_timestep(state: EnergyPlusState) {
    let ptr = ACTIVE_RUN.with(|a| a.get());
    if ptr.is_null() {
        return;
    }
    // SAFETY: the pointer is set by `EnergyPlusEngine::run` to a live
    // `ActiveRun` and cleared before that frame returns; the engine invokes
    // this callback synchronously on the same thread.
    let active = unsafe { &mut *(ptr as *mut ActiveRun<'_, '_>) };
    if active.error.is_some() {
        return;
    }

    let mut native = NativeExchange { state };
    let exchange: &mut dyn Exchange = &mut native;
    if let Err(e) = (active.callback)(exchange) {
        native.issue_severe(&format!("Timestep callback failed: {e:#}"));
        // SAFETY: `state` is the live handle passed in by the engine.
        unsafe { stopSimulation(state) };
        active.error = Some(e);
    }
}

/// Owns one EnergyPlus state for its lifetime.
pub struct EnergyPlusEngine {
    state: EnergyPlusState,
}

impl EnergyPlusEngine {
    pub fn new() -> Result<Self> {
        // SAFETY: plain constructor with no preconditions.
        let state = unsafe { stateNew() };
        anyhow::ensure!(!state.is_null(), "EnergyPlus stateNew returned null");
        Ok(Self { state })
    }
}

impl Drop for EnergyPlusEngine {
    fn drop(&mut self) {
        // SAFETY: `state` came from `stateNew` and is deleted exactly once.
        unsafe { stateDelete(self.state) };
    }
}

impl Engine for EnergyPlusEngine {
    fn name(&self) -> &'static str {
        "energyplus"
    }

    fn request_variable(&mut self, variable: &VariableKey) -> Result<()> {
        let name = c_string(&variable.name)?;
        let key = c_string(&variable.key)?;
        // SAFETY: both strings outlive the call.
        unsafe { requestVariable(self.state, name.as_ptr(), key.as_ptr()) };
        Ok(())
    }

    fn run(&mut self, args: &RunArgs, callback: &mut TimestepCallback<'_>) -> Result<i32> {
        let mut argv_owned = vec![c_string("energyplus")?];
        for arg in args.to_argv() {
            argv_owned.push(c_string(&arg)?);
        }
        let argv: Vec<*const c_char> = argv_owned.iter().map(|a| a.as_ptr()).collect();
        info!(argv = ?args.to_argv(), "starting EnergyPlus");

        let mut active = ActiveRun {
            callback,
            error: None,
        };
        ACTIVE_RUN.with(|a| a.set(&mut active as *mut ActiveRun<'_, '_> as *mut c_void));

        // SAFETY: `argv` points into `argv_owned`, which outlives the call; the
        // trampoline only dereferences `active` while this frame is alive.
        let code = unsafe {
            callbackBeginZoneTimeStepAfterInitHeatBalance(self.state, on_zone_timestep);
            energyplus(self.state, argv.len() as c_int, argv.as_ptr())
        };

        ACTIVE_RUN.with(|a| a.set(ptr::null_mut()));
        debug!(code, "EnergyPlus returned");

        match active.error {
            Some(e) => Err(e),
            None => Ok(code),
        }
    }
}

/// Exchange view over the state handle passed to the C callback.
struct NativeExchange {
    state: EnergyPlusState,
}

// SAFETY (all methods): `state` is the handle EnergyPlus passed to the
// running callback, and C strings outlive each call.
impl Exchange for NativeExchange {
    fn api_data_fully_ready(&self) -> bool {
        unsafe { apiDataFullyReady(self.state) != 0 }
    }

    fn warmup_flag(&self) -> bool {
        unsafe { warmupFlag(self.state) != 0 }
    }

    fn current_sim_time(&self) -> f64 {
        unsafe { currentSimTime(self.state) }
    }

    fn get_variable_handle(&mut self, variable: &VariableKey) -> i32 {
        let (Ok(name), Ok(key)) = (c_string(&variable.name), c_string(&variable.key)) else {
            return INVALID_HANDLE;
        };
        unsafe { getVariableHandle(self.state, name.as_ptr(), key.as_ptr()) }
    }

    fn get_actuator_handle(&mut self, actuator: &ActuatorKey) -> i32 {
        let (Ok(component), Ok(control), Ok(key)) = (
            c_string(&actuator.component_type),
            c_string(&actuator.control_type),
            c_string(&actuator.key),
        ) else {
            return INVALID_HANDLE;
        };
        unsafe {
            getActuatorHandle(
                self.state,
                component.as_ptr(),
                control.as_ptr(),
                key.as_ptr(),
            )
        }
    }

    fn get_variable_value(&self, handle: i32) -> f64 {
        unsafe { getVariableValue(self.state, handle) }
    }

    fn set_actuator_value(&mut self, handle: i32, value: f64) {
        unsafe { setActuatorValue(self.state, handle, value) }
    }

    fn issue_severe(&mut self, message: &str) {
        // Interior NULs would truncate the message; replace them instead.
        let Ok(msg) = CString::new(message.replace('\0', " ")) else {
            return;
        };
        unsafe { issueSevere(self.state, msg.as_ptr()) }
    }
}

fn c_string(s: &str) -> Result<CString> {
    CString::new(s).with_context(|| format!("String contains an interior NUL byte: {s:?}"))
}
