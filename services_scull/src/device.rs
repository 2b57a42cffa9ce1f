//! File operations for the scull device.
//!
//! Each open file carries one [`Session`] as its private data. Every
//! operation is logged to the device's [`KernelLog`]; failures are logged
//! at `Warn` and still returned to the caller.

use crate::error::ScullError;
use crate::store::{BoundedStore, Session, Whence};
use hal::{UserSink, UserSource};
use services_device_manager::{errno, CharDevice, FileError, FileState};
use services_logger::{KernelLog, LogEntry, LogLevel};
use std::fmt;

pub struct ScullDevice {
    name: String,
    store: BoundedStore,
    log: KernelLog,
}

impl ScullDevice {
    pub fn new(name: impl Into<String>, store: BoundedStore, log: KernelLog) -> Self {
        Self {
            name: name.into(),
            store,
            log,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn open_sessions(&self) -> usize {
        self.store.open_sessions()
    }

    pub(crate) fn into_store(self) -> BoundedStore {
        self.store
    }

    fn session<'a>(&self, file: &'a mut FileState) -> Result<&'a mut Session, FileError> {
        file.private_data_mut::<Session>()
            .ok_or_else(|| FileError::new(errno::EBADF, "file has no scull session"))
    }

    fn entry(&self, level: LogLevel, session: &Session, message: impl Into<String>) -> LogEntry {
        LogEntry::new(level, self.name.as_str(), message)
            .with_source(session.id())
            .with_field("position", session.position())
    }

    fn fail(&self, session: &Session, op: &str, err: ScullError) -> FileError {
        self.log.record(
            self.entry(LogLevel::Warn, session, format!("{} failed", op))
                .with_field("error", &err)
                .with_field("errno", err.errno()),
        );
        err.into()
    }
}

impl fmt::Debug for ScullDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScullDevice")
            .field("name", &self.name)
            .field("capacity", &self.capacity())
            .field("open_sessions", &self.open_sessions())
            .finish()
    }
}

impl CharDevice for ScullDevice {
    fn open(&self, file: &mut FileState) -> Result<(), FileError> {
        let session = self.store.open_session();
        self.log.record(
            self.entry(LogLevel::Info, &session, "Device opened")
                .with_field("dev", file.dev()),
        );
        file.set_private_data(session);
        Ok(())
    }

    fn release(&self, file: &mut FileState) {
        if let Some(session) = file.take_private_data::<Session>() {
            self.log
                .record(self.entry(LogLevel::Info, &session, "Device closed"));
            session.close();
        }
    }

    fn read(
        &self,
        file: &mut FileState,
        buf: &mut dyn UserSink,
        count: usize,
    ) -> Result<usize, FileError> {
        let session = self.session(file)?;
        match session.read(buf, count) {
            Ok(read) => {
                self.log.record(
                    self.entry(LogLevel::Info, session, format!("Read {} bytes", read))
                        .with_field("bytes", read),
                );
                Ok(read)
            }
            Err(err) => Err(self.fail(session, "read", err)),
        }
    }

    fn write(&self, file: &mut FileState, buf: &mut dyn UserSource) -> Result<usize, FileError> {
        let session = self.session(file)?;
        match session.write(buf) {
            Ok(written) => {
                self.log.record(
                    self.entry(LogLevel::Info, session, format!("Wrote {} bytes", written))
                        .with_field("bytes", written),
                );
                Ok(written)
            }
            Err(err) => Err(self.fail(session, "write", err)),
        }
    }

    fn llseek(&self, file: &mut FileState, offset: i64, whence: i32) -> Result<u64, FileError> {
        let session = self.session(file)?;
        let result = Whence::try_from(whence).and_then(|whence| session.seek(offset, whence));
        match result {
            Ok(position) => {
                self.log.record(self.entry(
                    LogLevel::Debug,
                    session,
                    format!("Seek to {}", position),
                ));
                Ok(position as u64)
            }
            Err(err) => Err(self.fail(session, "seek", err)),
        }
    }
}
