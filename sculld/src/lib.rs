//! # Scull Host Daemon
//!
//! Loads the scull module into a device manager, runs a command script
//! against it and reports what every command returned.
//!
//! ## Responsibilities
//!
//! - Load configuration (defaults, JSON file, command-line overrides)
//! - Initialise and unload the module
//! - Drive one open file through a scripted sequence of operations
//! - Report counts, bytes, positions and error numbers
//!
//! Components never print; the host does.

pub mod runtime;
pub mod script;

pub use runtime::{
    load_config, HostRuntime, HostRuntimeConfig, HostRuntimeError, StepOutcome, StepReport,
};
pub use script::{Script, ScriptCommand, ScriptError};
