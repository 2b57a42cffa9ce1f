//! File operations and open-file handles.

use crate::errno;
use core_types::DevNumber;
use hal::{UserBuffer, UserSink, UserSlice, UserSource};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a file operation
///
/// Carries a positive error number; the host boundary negates it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} (errno {errno})")]
pub struct FileError {
    pub errno: i32,
    pub reason: String,
}

impl FileError {
    pub fn new(errno: i32, reason: impl Into<String>) -> Self {
        Self {
            errno,
            reason: reason.into(),
        }
    }

    /// The negative return code a C caller would see
    pub fn as_return_code(&self) -> i64 {
        -i64::from(self.errno)
    }
}

/// Per-open-file state handed to every [`CharDevice`] call
pub struct FileState {
    dev: DevNumber,
    private_data: Option<Box<dyn Any + Send>>,
}

impl FileState {
    fn new(dev: DevNumber) -> Self {
        Self {
            dev,
            private_data: None,
        }
    }

    pub fn dev(&self) -> DevNumber {
        self.dev
    }

    /// Attaches driver data to this open file, replacing any previous value
    pub fn set_private_data<T: Any + Send>(&mut self, data: T) {
        self.private_data = Some(Box::new(data));
    }

    pub fn private_data_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.private_data.as_mut()?.downcast_mut::<T>()
    }

    pub fn take_private_data<T: Any + Send>(&mut self) -> Option<T> {
        let boxed = self.private_data.take()?;
        match boxed.downcast::<T>() {
            Ok(data) => Some(*data),
            Err(other) => {
                self.private_data = Some(other);
                None
            }
        }
    }
}

impl fmt::Debug for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileState")
            .field("dev", &self.dev)
            .field("has_private_data", &self.private_data.is_some())
            .finish()
    }
}

/// File operations a character device driver provides.
///
/// `whence` follows the usual numbering: 0 start, 1 current, 2 end.
pub trait CharDevice: Send + Sync {
    fn open(&self, _file: &mut FileState) -> Result<(), FileError> {
        Ok(())
    }

    fn release(&self, _file: &mut FileState) {}

    fn read(
        &self,
        file: &mut FileState,
        buf: &mut dyn UserSink,
        count: usize,
    ) -> Result<usize, FileError>;

    fn write(&self, file: &mut FileState, buf: &mut dyn UserSource) -> Result<usize, FileError>;

    fn llseek(&self, _file: &mut FileState, _offset: i64, _whence: i32) -> Result<u64, FileError> {
        Err(FileError::new(errno::ESPIPE, "device is not seekable"))
    }
}

/// An open handle on a character device
///
/// Dropping the handle releases it, so every successful open is paired
/// with exactly one `release`.
pub struct OpenFile {
    device: Arc<dyn CharDevice>,
    state: FileState,
    released: bool,
}

impl OpenFile {
    pub(crate) fn open(device: Arc<dyn CharDevice>, dev: DevNumber) -> Result<Self, FileError> {
        let mut state = FileState::new(dev);
        device.open(&mut state)?;
        Ok(Self {
            device,
            state,
            released: false,
        })
    }

    pub fn dev(&self) -> DevNumber {
        self.state.dev()
    }

    /// Reads up to `count` bytes
    pub fn read(&mut self, count: usize) -> Result<Vec<u8>, FileError> {
        let mut buffer = UserBuffer::with_window(count);
        self.read_into(&mut buffer, count)?;
        Ok(buffer.into_bytes())
    }

    pub fn read_into(&mut self, buf: &mut dyn UserSink, count: usize) -> Result<usize, FileError> {
        self.device.read(&mut self.state, buf, count)
    }

    /// Writes `bytes`, returning how many were accepted
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, FileError> {
        self.write_from(&mut UserSlice::new(bytes))
    }

    pub fn write_from(&mut self, buf: &mut dyn UserSource) -> Result<usize, FileError> {
        self.device.write(&mut self.state, buf)
    }

    pub fn seek(&mut self, offset: i64, whence: i32) -> Result<u64, FileError> {
        self.device.llseek(&mut self.state, offset, whence)
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.device.release(&mut self.state);
        }
    }
}

impl Drop for OpenFile {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for OpenFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenFile")
            .field("state", &self.state)
            .field("released", &self.released)
            .finish()
    }
}
