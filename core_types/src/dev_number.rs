//! Character device numbers
//!
//! A device number packs a major and a minor into one `u32`: the major
//! selects the driver, the minor selects the unit within it. The packing
//! uses the 12/20 bit split, so majors stay below [`MAX_MAJOR`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of low bits holding the minor
pub const MINOR_BITS: u32 = 20;

/// Exclusive upper bound on majors
pub const MAX_MAJOR: u32 = 1 << (32 - MINOR_BITS);

const MINOR_MASK: u32 = (1 << MINOR_BITS) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DevNumberError {
    #[error("major {0} out of range")]
    MajorOutOfRange(u32),

    #[error("minor {0} out of range")]
    MinorOutOfRange(u32),
}

/// A packed (major, minor) device number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DevNumber(u32);

impl DevNumber {
    /// Packs a major and a minor
    pub fn new(major: u32, minor: u32) -> Result<Self, DevNumberError> {
        if major >= MAX_MAJOR {
            return Err(DevNumberError::MajorOutOfRange(major));
        }
        if minor > MINOR_MASK {
            return Err(DevNumberError::MinorOutOfRange(minor));
        }
        Ok(Self((major << MINOR_BITS) | minor))
    }

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn major(&self) -> u32 {
        self.0 >> MINOR_BITS
    }

    pub fn minor(&self) -> u32 {
        self.0 & MINOR_MASK
    }

    /// Returns the device number `offset` minors after this one, within the same major
    pub fn offset(&self, offset: u32) -> Result<Self, DevNumberError> {
        let minor = self
            .minor()
            .checked_add(offset)
            .ok_or(DevNumberError::MinorOutOfRange(u32::MAX))?;
        Self::new(self.major(), minor)
    }
}

impl fmt::Display for DevNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major(), self.minor())
    }
}
