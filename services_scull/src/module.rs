//! Module init and exit.
//!
//! Init reserves a device-number region, creates the store and adds the
//! device, undoing earlier steps if a later one fails. Exit tears the
//! same things down in reverse.

use crate::config::{ConfigError, ScullConfig};
use crate::device::ScullDevice;
use crate::error::ScullError;
use crate::store::BoundedStore;
use core_types::{DevNumber, DriverId};
use services_device_manager::{CharDevice, DeviceManager, DeviceManagerError};
use services_logger::{KernelLog, LogEntry, LogLevel};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("device registration failed: {0}")]
    Registration(#[from] DeviceManagerError),

    #[error("store error: {0}")]
    Store(#[from] ScullError),
}

/// A loaded scull module
#[derive(Debug)]
pub struct ScullModule {
    config: ScullConfig,
    driver: DriverId,
    dev: DevNumber,
    device: Arc<ScullDevice>,
    log: KernelLog,
}

impl ScullModule {
    pub fn init(
        manager: &mut DeviceManager,
        config: ScullConfig,
        log: KernelLog,
    ) -> Result<Self, ModuleError> {
        config.validate()?;
        let name = config.device_name.clone();

        let driver = manager.register_driver(name.as_str());
        let dev = match manager.alloc_chrdev_region(
            config.first_minor,
            config.minor_count,
            name.as_str(),
        ) {
            Ok(dev) => dev,
            Err(err) => {
                log.record(
                    LogEntry::new(LogLevel::Warn, name.as_str(), "Can't allocate major number")
                        .with_field("error", &err),
                );
                unwind(manager, &log, name.as_str(), driver, None);
                return Err(err.into());
            }
        };

        let store = match BoundedStore::create(config.capacity) {
            Ok(store) => store,
            Err(err) => {
                log.record(
                    LogEntry::new(LogLevel::Error, name.as_str(), "Can't allocate store")
                        .with_field("capacity", config.capacity),
                );
                let region = Some((dev, config.minor_count));
                unwind(manager, &log, name.as_str(), driver, region);
                return Err(err.into());
            }
        };

        let device = Arc::new(ScullDevice::new(name.as_str(), store, log.clone()));
        let handle: Arc<dyn CharDevice> = device.clone();
        if let Err(err) = manager.cdev_add(driver, dev, config.minor_count, handle) {
            log.record(
                LogEntry::new(LogLevel::Warn, name.as_str(), "Can't add device")
                    .with_field("error", &err),
            );
            let region = Some((dev, config.minor_count));
            unwind(manager, &log, name.as_str(), driver, region);
            return Err(err.into());
        }

        log.record(
            LogEntry::new(
                LogLevel::Info,
                name.as_str(),
                format!("Initialized with major number {}", dev.major()),
            )
            .with_field("dev", dev)
            .with_field("capacity", config.capacity),
        );

        Ok(Self {
            config,
            driver,
            dev,
            device,
            log,
        })
    }

    /// First device number of the module's region
    pub fn dev(&self) -> DevNumber {
        self.dev
    }

    pub fn major(&self) -> u32 {
        self.dev.major()
    }

    pub fn config(&self) -> &ScullConfig {
        &self.config
    }

    pub fn device(&self) -> &ScullDevice {
        &self.device
    }

    /// Unloads the module
    ///
    /// Teardown always runs to completion. The first failure is returned;
    /// `ScullError::StoreBusy` means files were still open, in which case
    /// the store outlives the module until they close.
    pub fn exit(self, manager: &mut DeviceManager) -> Result<(), ModuleError> {
        let Self {
            config,
            driver,
            dev,
            device,
            log,
        } = self;
        let name = config.device_name.as_str();

        let mut first_error: Option<ModuleError> = None;
        if let Err(err) = manager.cdev_del(dev) {
            first_error.get_or_insert(err.into());
        }

        let open_sessions = device.open_sessions();
        let destroyed = match Arc::try_unwrap(device) {
            Ok(device) => device.into_store().destroy(),
            Err(_) => Err(ScullError::StoreBusy { open_sessions }),
        };
        if let Err(err) = destroyed {
            log.record(
                LogEntry::new(LogLevel::Warn, name, "Store still in use at unload")
                    .with_field("error", &err),
            );
            first_error.get_or_insert(err.into());
        }

        if let Err(err) = manager.unregister_chrdev_region(dev, config.minor_count) {
            first_error.get_or_insert(err.into());
        }
        if let Err(err) = manager.unregister_driver(driver) {
            first_error.get_or_insert(err.into());
        }

        log.record(LogEntry::new(LogLevel::Info, name, "Unloaded"));

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Undoes a partial init; failures are logged since the init error wins
fn unwind(
    manager: &mut DeviceManager,
    log: &KernelLog,
    name: &str,
    driver: DriverId,
    region: Option<(DevNumber, u32)>,
) {
    if let Some((dev, count)) = region {
        if let Err(err) = manager.unregister_chrdev_region(dev, count) {
            log.record(
                LogEntry::new(LogLevel::Warn, name, "Can't release region during unwind")
                    .with_field("error", &err),
            );
        }
    }
    if let Err(err) = manager.unregister_driver(driver) {
        log.record(
            LogEntry::new(LogLevel::Warn, name, "Can't unregister driver during unwind")
                .with_field("error", &err),
        );
    }
}
