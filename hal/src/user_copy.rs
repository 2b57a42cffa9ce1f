/// Caller memory transfer abstraction
///
/// Drivers never touch caller memory directly. They hand a slice of their
/// own memory to a [`UserSink`] (copy out) or ask a [`UserSource`] to fill
/// a slice (copy in). Either direction may fault, in which case nothing is
/// considered transferred.
use thiserror::Error;

/// Transfer faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CopyFault {
    /// Caller range is not mapped or too small for the copy
    #[error("bad caller address")]
    BadAddress,
    /// Caller memory cannot be written
    #[error("caller memory not writable")]
    NotWritable,
    /// Caller memory cannot be read
    #[error("caller memory not readable")]
    NotReadable,
}

/// Destination for bytes leaving a driver
pub trait UserSink {
    /// Copy all of `src` into caller memory
    ///
    /// # Errors
    /// Returns a [`CopyFault`] if the caller range cannot take `src.len()` bytes
    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), CopyFault>;
}

/// Origin of bytes entering a driver
pub trait UserSource {
    /// Number of bytes the caller offered
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill all of `dst` from the front of the caller range
    ///
    /// # Errors
    /// Returns a [`CopyFault`] if `dst.len()` exceeds the caller range
    fn copy_from_user(&mut self, dst: &mut [u8]) -> Result<(), CopyFault>;
}

impl<T: UserSink + ?Sized> UserSink for &mut T {
    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), CopyFault> {
        (**self).copy_to_user(src)
    }
}

impl<T: UserSource + ?Sized> UserSource for &mut T {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn copy_from_user(&mut self, dst: &mut [u8]) -> Result<(), CopyFault> {
        (**self).copy_from_user(dst)
    }
}

/// Caller-owned read buffer
///
/// Accepts at most `window` bytes in total; anything beyond that faults,
/// like a copy that runs off the end of a mapped range.
#[derive(Debug, Clone, Default)]
pub struct UserBuffer {
    data: Vec<u8>,
    window: usize,
}

impl UserBuffer {
    /// Creates a buffer able to receive `window` bytes
    pub fn with_window(window: usize) -> Self {
        Self {
            data: Vec::with_capacity(window),
            window,
        }
    }

    /// Bytes received so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl UserSink for UserBuffer {
    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), CopyFault> {
        if self.data.len() + src.len() > self.window {
            return Err(CopyFault::BadAddress);
        }
        self.data.extend_from_slice(src);
        Ok(())
    }
}

/// Caller-owned write buffer
#[derive(Debug, Clone, Copy)]
pub struct UserSlice<'a> {
    data: &'a [u8],
}

impl<'a> UserSlice<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl UserSource for UserSlice<'_> {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn copy_from_user(&mut self, dst: &mut [u8]) -> Result<(), CopyFault> {
        let src = self.data.get(..dst.len()).ok_or(CopyFault::BadAddress)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}
