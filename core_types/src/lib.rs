//! # Core Types
//!
//! This crate defines the fundamental types shared by the scull workspace.
//!
//! ## Key Types
//!
//! - [`SessionId`]: Unique identifier for an open session on a device
//! - [`DriverId`]: Unique identifier for a registered driver
//! - [`DevNumber`]: A character device number (major, minor)

pub mod dev_number;
pub mod ids;

pub use dev_number::{DevNumber, DevNumberError, MAX_MAJOR, MINOR_BITS};
pub use ids::{DriverId, SessionId};
