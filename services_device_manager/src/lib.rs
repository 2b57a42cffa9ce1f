//! Character device registry.
//!
//! Drivers reserve device-number regions, attach a [`CharDevice`]
//! implementation to them, and clients open the resulting devices to get
//! an [`OpenFile`] handle with file-like read, write and seek.

pub mod errno;
mod file;

pub use file::{CharDevice, FileError, FileState, OpenFile};

use core_types::{DevNumber, DevNumberError, DriverId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;

/// Dynamic majors are handed out from the top of this range downwards
pub const DYNAMIC_MAJOR_START: u32 = 254;
pub const DYNAMIC_MAJOR_END: u32 = 234;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationDecision {
    Allow,
    Deny { reason: String },
}

pub trait RegistrationPolicy: Send + Sync {
    fn evaluate(&self, driver: &str, dev: DevNumber) -> RegistrationDecision;
}

pub struct AllowAllDevices;

impl RegistrationPolicy for AllowAllDevices {
    fn evaluate(&self, _driver: &str, _dev: DevNumber) -> RegistrationDecision {
        RegistrationDecision::Allow
    }
}

pub struct DenyAllDevices;

impl RegistrationPolicy for DenyAllDevices {
    fn evaluate(&self, _driver: &str, _dev: DevNumber) -> RegistrationDecision {
        RegistrationDecision::Deny {
            reason: "Device registration is locked".to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeviceManagerError {
    #[error("Driver not registered: {0}")]
    DriverNotRegistered(DriverId),

    #[error("No dynamic major number available")]
    NoMajorAvailable,

    #[error("Device region {0} busy")]
    RegionBusy(DevNumber),

    #[error("No device region covers {0}")]
    RegionNotAllocated(DevNumber),

    #[error("Device {0} already added")]
    AlreadyAdded(DevNumber),

    #[error("Device not found: {0}")]
    DeviceNotFound(DevNumber),

    #[error("Policy denied registration: {0}")]
    PolicyDenied(String),

    #[error("Invalid device number: {0}")]
    InvalidDevNumber(#[from] DevNumberError),

    #[error("Open failed: {0}")]
    OpenFailed(#[from] FileError),
}

/// A reserved range of minors under one major
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChrdevRegion {
    pub base: DevNumber,
    pub count: u32,
    pub name: String,
}

impl ChrdevRegion {
    fn contains(&self, dev: DevNumber) -> bool {
        dev.major() == self.base.major()
            && dev.minor() >= self.base.minor()
            && u64::from(dev.minor()) < u64::from(self.base.minor()) + u64::from(self.count)
    }

    fn overlaps(&self, base: DevNumber, count: u32) -> bool {
        let start = u64::from(self.base.minor());
        let end = start + u64::from(self.count);
        let other_start = u64::from(base.minor());
        let other_end = other_start + u64::from(count);
        self.base.major() == base.major() && start < other_end && other_start < end
    }
}

struct CdevRecord {
    owner: DriverId,
    count: u32,
    device: Arc<dyn CharDevice>,
}

/// Registry of character devices.
pub struct DeviceManager {
    policy: Box<dyn RegistrationPolicy>,
    drivers: HashMap<DriverId, String>,
    regions: Vec<ChrdevRegion>,
    cdevs: BTreeMap<DevNumber, CdevRecord>,
}

impl DeviceManager {
    pub fn new(policy: Box<dyn RegistrationPolicy>) -> Self {
        Self {
            policy,
            drivers: HashMap::new(),
            regions: Vec::new(),
            cdevs: BTreeMap::new(),
        }
    }

    pub fn register_driver(&mut self, name: impl Into<String>) -> DriverId {
        let id = DriverId::new();
        self.drivers.insert(id, name.into());
        id
    }

    pub fn unregister_driver(&mut self, driver: DriverId) -> Result<(), DeviceManagerError> {
        self.drivers
            .remove(&driver)
            .map(|_| ())
            .ok_or(DeviceManagerError::DriverNotRegistered(driver))
    }

    /// Reserves `count` minors starting at `first_minor` under a free dynamic major
    pub fn alloc_chrdev_region(
        &mut self,
        first_minor: u32,
        count: u32,
        name: impl Into<String>,
    ) -> Result<DevNumber, DeviceManagerError> {
        let major = (DYNAMIC_MAJOR_END..=DYNAMIC_MAJOR_START)
            .rev()
            .find(|major| !self.regions.iter().any(|r| r.base.major() == *major))
            .ok_or(DeviceManagerError::NoMajorAvailable)?;

        let base = DevNumber::new(major, first_minor)?;
        Self::check_range(base, count)?;
        self.regions.push(ChrdevRegion {
            base,
            count,
            name: name.into(),
        });
        Ok(base)
    }

    /// Reserves `count` minors starting at a caller-chosen device number
    pub fn register_chrdev_region(
        &mut self,
        base: DevNumber,
        count: u32,
        name: impl Into<String>,
    ) -> Result<(), DeviceManagerError> {
        Self::check_range(base, count)?;
        if self.regions.iter().any(|r| r.overlaps(base, count)) {
            return Err(DeviceManagerError::RegionBusy(base));
        }
        self.regions.push(ChrdevRegion {
            base,
            count,
            name: name.into(),
        });
        Ok(())
    }

    pub fn unregister_chrdev_region(
        &mut self,
        base: DevNumber,
        count: u32,
    ) -> Result<(), DeviceManagerError> {
        let index = self
            .regions
            .iter()
            .position(|r| r.base == base && r.count == count)
            .ok_or(DeviceManagerError::RegionNotAllocated(base))?;
        self.regions.remove(index);
        Ok(())
    }

    /// Attaches a device implementation to `count` minors starting at `base`
    pub fn cdev_add(
        &mut self,
        owner: DriverId,
        base: DevNumber,
        count: u32,
        device: Arc<dyn CharDevice>,
    ) -> Result<(), DeviceManagerError> {
        let driver = self
            .drivers
            .get(&owner)
            .ok_or(DeviceManagerError::DriverNotRegistered(owner))?;

        let last = Self::check_range(base, count)?;
        let covered = self
            .regions
            .iter()
            .any(|r| r.contains(base) && r.contains(last));
        if !covered {
            return Err(DeviceManagerError::RegionNotAllocated(base));
        }
        let taken = self.cdevs.iter().any(|(existing, record)| {
            existing.major() == base.major()
                && existing.minor() <= last.minor()
                && base.minor() < existing.minor().saturating_add(record.count)
        });
        if taken {
            return Err(DeviceManagerError::AlreadyAdded(base));
        }

        match self.policy.evaluate(driver, base) {
            RegistrationDecision::Allow => {}
            RegistrationDecision::Deny { reason } => {
                return Err(DeviceManagerError::PolicyDenied(reason))
            }
        }

        self.cdevs.insert(
            base,
            CdevRecord {
                owner,
                count,
                device,
            },
        );
        Ok(())
    }

    pub fn cdev_del(&mut self, base: DevNumber) -> Result<(), DeviceManagerError> {
        self.cdevs
            .remove(&base)
            .map(|_| ())
            .ok_or(DeviceManagerError::DeviceNotFound(base))
    }

    /// Opens the device backing `dev`
    pub fn open(&self, dev: DevNumber) -> Result<OpenFile, DeviceManagerError> {
        let (_, record) = self
            .find_cdev(dev)
            .ok_or(DeviceManagerError::DeviceNotFound(dev))?;
        Ok(OpenFile::open(Arc::clone(&record.device), dev)?)
    }

    /// Reserved regions, in registration order
    pub fn regions(&self) -> &[ChrdevRegion] {
        &self.regions
    }

    /// Driver that added the device covering `dev`
    pub fn owner_of(&self, dev: DevNumber) -> Option<DriverId> {
        self.find_cdev(dev).map(|(_, record)| record.owner)
    }

    fn find_cdev(&self, dev: DevNumber) -> Option<(DevNumber, &CdevRecord)> {
        self.cdevs
            .range(..=dev)
            .next_back()
            .filter(|(base, record)| {
                base.major() == dev.major()
                    && u64::from(dev.minor()) < u64::from(base.minor()) + u64::from(record.count)
            })
            .map(|(base, record)| (*base, record))
    }

    /// Validates a range and returns its last device number
    fn check_range(base: DevNumber, count: u32) -> Result<DevNumber, DeviceManagerError> {
        if count == 0 {
            return Err(DeviceManagerError::RegionNotAllocated(base));
        }
        Ok(base.offset(count - 1)?)
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new(Box::new(AllowAllDevices))
    }
}
