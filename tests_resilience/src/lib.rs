//! Resilience Test Utilities
//!
//! This crate provides shared utilities for scull integration tests.
//!
//! ## Test Philosophy
//!
//! - **Invariants under any sequence**: Cursors stay in `[0, capacity]` whatever is called
//! - **Deterministic sequences**: Operation streams come from a seeded generator
//! - **Faults are local**: A failed call leaves the cursor and the store as they were

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use services_device_manager::DeviceManager;
use services_logger::KernelLog;
use services_scull::{ScullConfig, ScullModule, Whence};

/// Bootstrap helper for tests
///
/// Creates a device manager with the scull module loaded at `capacity`.
pub fn test_bootstrap(capacity: usize) -> (DeviceManager, ScullModule, KernelLog) {
    let mut manager = DeviceManager::default();
    let log = KernelLog::new();
    let config = ScullConfig::default().with_capacity(capacity);
    let module = ScullModule::init(&mut manager, config, log.clone())
        .expect("scull module failed to load");
    (manager, module, log)
}

/// One file operation in a generated sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOp {
    Read(usize),
    Write(Vec<u8>),
    Seek(i64, Whence),
}

/// Deterministic operation generator
///
/// The same seed always yields the same stream of operations.
pub struct OpSequence {
    rng: StdRng,
    span: usize,
}

impl OpSequence {
    /// `span` bounds the sizes and offsets generated, a bit beyond capacity is useful
    pub fn new(seed: u64, span: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            span: span.max(1),
        }
    }

    fn offset(&mut self) -> i64 {
        let span = self.span as i64;
        self.rng.gen_range(-span..=span)
    }
}

impl Iterator for OpSequence {
    type Item = FileOp;

    fn next(&mut self) -> Option<FileOp> {
        let op = match self.rng.gen_range(0..3) {
            0 => FileOp::Read(self.rng.gen_range(0..=self.span)),
            1 => {
                let len = self.rng.gen_range(0..=self.span);
                let fill: u8 = self.rng.gen();
                FileOp::Write(vec![fill; len])
            }
            _ => {
                let whence = match self.rng.gen_range(0..3) {
                    0 => Whence::Start,
                    1 => Whence::Current,
                    _ => Whence::End,
                };
                FileOp::Seek(self.offset(), whence)
            }
        };
        Some(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let first: Vec<FileOp> = OpSequence::new(7, 32).take(50).collect();
        let second: Vec<FileOp> = OpSequence::new(7, 32).take(50).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ops_stay_within_span() {
        for op in OpSequence::new(3, 16).take(500) {
            match op {
                FileOp::Read(len) => assert!(len <= 16),
                FileOp::Write(bytes) => assert!(bytes.len() <= 16),
                FileOp::Seek(offset, _) => assert!((-16..=16).contains(&offset)),
            }
        }
    }
}
