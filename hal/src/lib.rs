//! # Hardware Abstraction Layer (HAL)
//!
//! This crate defines the boundary traits drivers use to move bytes
//! between driver-owned memory and caller-owned memory.
//!
//! ## Design Principles
//!
//! 1. **Trait-based**: Drivers only ever see [`UserSink`] and [`UserSource`]
//! 2. **All-or-nothing copies**: A copy either moves every byte or faults
//! 3. **Testable**: In-memory buffers stand in for caller memory

pub mod user_copy;

pub use user_copy::{CopyFault, UserBuffer, UserSink, UserSlice, UserSource};
