//! # Sample Plugin
//!
//! A dynwire module exporting one symbol of every kind the host can bind:
//!
//! - `Value`: a plain value, rejected when bound as a constructor
//! - `New`: a constructor of [`Thermostat`] settings
//! - `NewThermostat`: a constructor depending on `New`'s output
//! - `Label`: a target, suitable for binding under a name or group
//! - `Announce`: an invocation
//! - `Initialize` / `Shutdown`: lifecycle callbacks
//!
//! Each symbol is linked as `dynwire_symbol__<Name>`, so the host never
//! mistakes a libc export for one of them.
//!
//! Build it with `cargo build -p sample-plugin` and point a host
//! configuration at the resulting shared library.

use dynwire_core::{export_abi_version, export_symbol, Context, Fallible, Symbol};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

export_abi_version!();

static RUNNING: AtomicBool = AtomicBool::new(false);

/// A component built from the module's target temperature
#[derive(Debug, Clone, PartialEq)]
pub struct Thermostat {
    /// Target temperature in degrees Fahrenheit
    pub target: f64,
}

impl Thermostat {
    /// Target temperature in degrees Celsius
    pub fn celsius(&self) -> f64 {
        (self.target - 32.0) * 5.0 / 9.0
    }
}

export_symbol!(Value => Symbol::value(12i32));

export_symbol!(New => Symbol::function(|| (67.5f64, Ok(()) as Fallible)));

export_symbol!(NewThermostat => Symbol::function(|target: f64| {
    (Arc::new(Thermostat { target }),)
}));

export_symbol!(Label => Symbol::function(|thermostat: Arc<Thermostat>| {
    (format!("thermostat at {:.1}C", thermostat.celsius()),)
}));

export_symbol!(Announce => Symbol::function(|label: String| -> Fallible {
    tracing::info!(%label, "Sample plugin wired");
    Ok(())
}));

export_symbol!(Initialize => Symbol::function(|ctx: Context| -> Fallible {
    if ctx.is_cancelled() {
        return Err("host is shutting down".into());
    }
    RUNNING.store(true, Ordering::SeqCst);
    tracing::info!("Sample plugin started");
    Ok(())
}));

export_symbol!(Shutdown => Symbol::function(|| {
    RUNNING.store(false, Ordering::SeqCst);
    tracing::info!("Sample plugin stopped");
}));

/// Whether `Initialize` ran without a matching `Shutdown`
pub fn is_running() -> bool {
    RUNNING.load(Ordering::SeqCst)
}
