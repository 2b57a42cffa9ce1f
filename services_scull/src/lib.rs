//! # Scull Device
//!
//! A fixed-capacity in-memory byte store exposed as a character device.
//!
//! ## Design
//!
//! - **BoundedStore**: One zero-filled byte array, created once, shared by every session
//! - **Session**: A cursor into the store, owned by exactly one open file
//! - **ScullDevice**: File operations (open, release, read, write, llseek) over sessions
//! - **ScullModule**: Init and exit against a [`DeviceManager`]
//!
//! Reads past the end of the store return nothing; writes past the end fail.
//! Both transfer as many bytes as fit and report the count.
//!
//! [`DeviceManager`]: services_device_manager::DeviceManager

pub mod config;
pub mod device;
pub mod error;
pub mod faulty_buffer;
pub mod module;
pub mod store;

pub use config::{ConfigError, ScullConfig, DEFAULT_CAPACITY, DEFAULT_DEVICE_NAME};
pub use device::ScullDevice;
pub use error::ScullError;
pub use faulty_buffer::{FaultPolicy, FaultyUserBuffer};
pub use module::{ModuleError, ScullModule};
pub use store::{BoundedStore, Session, Whence};
