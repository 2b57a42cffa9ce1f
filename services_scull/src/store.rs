//! Bounded byte store and per-session cursors.
//!
//! The store is created once and never resized. Every [`Session`] holds a
//! reference to it plus its own cursor, so any number of sessions may read
//! and write the same bytes. Byte access goes through one mutex; cursors
//! are private to their session and need no locking.

use crate::error::ScullError;
use core_types::SessionId;
use hal::{UserSink, UserSource};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Origin of a seek
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl Whence {
    pub const SEEK_SET: i32 = 0;
    pub const SEEK_CUR: i32 = 1;
    pub const SEEK_END: i32 = 2;

    pub fn as_raw(&self) -> i32 {
        match self {
            Self::Start => Self::SEEK_SET,
            Self::Current => Self::SEEK_CUR,
            Self::End => Self::SEEK_END,
        }
    }
}

impl TryFrom<i32> for Whence {
    type Error = ScullError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            Self::SEEK_SET => Ok(Self::Start),
            Self::SEEK_CUR => Ok(Self::Current),
            Self::SEEK_END => Ok(Self::End),
            other => Err(ScullError::InvalidWhence(other)),
        }
    }
}

impl FromStr for Whence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" | "set" => Ok(Self::Start),
            "current" | "cur" => Ok(Self::Current),
            "end" => Ok(Self::End),
            other => Err(format!("unknown whence: {}", other)),
        }
    }
}

impl fmt::Display for Whence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Current => write!(f, "current"),
            Self::End => write!(f, "end"),
        }
    }
}

struct StoreInner {
    capacity: usize,
    bytes: Mutex<Box<[u8]>>,
}

impl StoreInner {
    // A panic while holding the lock cannot leave the bytes in a state
    // later readers must reject, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Box<[u8]>> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed-capacity, zero-initialised byte store
pub struct BoundedStore {
    inner: Arc<StoreInner>,
}

impl BoundedStore {
    /// Allocates a zero-filled store of `capacity` bytes
    ///
    /// # Errors
    /// Returns `ScullError::AllocationError` if the memory cannot be reserved
    pub fn create(capacity: usize) -> Result<Self, ScullError> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(capacity)
            .map_err(|_| ScullError::AllocationError { capacity })?;
        bytes.resize(capacity, 0u8);

        Ok(Self {
            inner: Arc::new(StoreInner {
                capacity,
                bytes: Mutex::new(bytes.into_boxed_slice()),
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of sessions currently holding the store
    pub fn open_sessions(&self) -> usize {
        Arc::strong_count(&self.inner) - 1
    }

    /// Opens a session with its cursor at 0
    pub fn open_session(&self) -> Session {
        Session {
            id: SessionId::new(),
            store: Arc::clone(&self.inner),
            position: 0,
        }
    }

    pub fn close_session(&self, session: Session) {
        session.close();
    }

    /// Releases the store
    ///
    /// # Errors
    /// Returns `ScullError::StoreBusy` if sessions are still open. The handle
    /// is given up either way; the bytes stay alive until the last of those
    /// sessions closes.
    pub fn destroy(self) -> Result<(), ScullError> {
        match Arc::try_unwrap(self.inner) {
            Ok(_) => Ok(()),
            Err(shared) => Err(ScullError::StoreBusy {
                open_sessions: Arc::strong_count(&shared) - 1,
            }),
        }
    }
}

impl fmt::Debug for BoundedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedStore")
            .field("capacity", &self.capacity())
            .field("open_sessions", &self.open_sessions())
            .finish()
    }
}

/// One open handle on a [`BoundedStore`]
///
/// Invariant: `0 <= position <= capacity`.
pub struct Session {
    id: SessionId,
    store: Arc<StoreInner>,
    position: usize,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity
    }

    /// Copies up to `max_len` bytes from the cursor into `sink`
    ///
    /// Returns the number of bytes copied; 0 at end of store. The cursor
    /// only moves when the copy succeeds.
    pub fn read(&mut self, sink: &mut dyn UserSink, max_len: usize) -> Result<usize, ScullError> {
        let capacity = self.capacity();
        if self.position >= capacity {
            return Ok(0);
        }

        let count = max_len.min(capacity - self.position);
        {
            let bytes = self.store.lock();
            sink.copy_to_user(&bytes[self.position..self.position + count])?;
        }

        self.position += count;
        Ok(count)
    }

    /// Copies as much of `source` as fits into the store at the cursor
    ///
    /// Returns the number of bytes stored, which is less than
    /// `source.len()` when the write runs into the end of the store.
    ///
    /// # Errors
    /// Returns `ScullError::CapacityExceeded` when the cursor is already at
    /// the end, and `ScullError::TransferFault` if the source cannot be
    /// read. The store and cursor are unchanged on error.
    pub fn write(&mut self, source: &mut dyn UserSource) -> Result<usize, ScullError> {
        let capacity = self.capacity();
        if self.position >= capacity {
            return Err(ScullError::CapacityExceeded {
                position: self.position,
                capacity,
            });
        }

        let count = source.len().min(capacity - self.position);
        let mut staged = vec![0u8; count];
        source.copy_from_user(&mut staged)?;

        self.store.lock()[self.position..self.position + count].copy_from_slice(&staged);
        self.position += count;
        Ok(count)
    }

    /// Moves the cursor and returns its new position
    ///
    /// # Errors
    /// Returns `ScullError::InvalidOffset` if the target lies outside
    /// `[0, capacity]`; the cursor is unchanged.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<usize, ScullError> {
        let capacity = self.capacity();
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.position as i128,
            Whence::End => capacity as i128,
        };

        let target = usize::try_from(base + i128::from(offset))
            .ok()
            .filter(|target| *target <= capacity)
            .ok_or(ScullError::InvalidOffset {
                offset,
                whence,
                capacity,
            })?;

        self.position = target;
        Ok(target)
    }

    /// Releases the cursor; the store is unaffected
    pub fn close(self) {}
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("capacity", &self.store.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hal::{CopyFault, UserBuffer, UserSlice};

    const CAPACITY: usize = 1024;

    fn store() -> BoundedStore {
        BoundedStore::create(CAPACITY).unwrap()
    }

    fn read(session: &mut Session, max_len: usize) -> Result<Vec<u8>, ScullError> {
        let mut buffer = UserBuffer::with_window(max_len);
        session.read(&mut buffer, max_len)?;
        Ok(buffer.into_bytes())
    }

    fn write(session: &mut Session, bytes: &[u8]) -> Result<usize, ScullError> {
        session.write(&mut UserSlice::new(bytes))
    }

    #[test]
    fn test_create_zero_filled() {
        let store = store();
        let mut session = store.open_session();
        assert_eq!(session.position(), 0);
        assert_eq!(read(&mut session, CAPACITY).unwrap(), vec![0u8; CAPACITY]);
    }

    #[test]
    fn test_create_allocation_failure() {
        assert_eq!(
            BoundedStore::create(usize::MAX).unwrap_err(),
            ScullError::AllocationError {
                capacity: usize::MAX
            }
        );
    }

    #[test]
    fn test_write_then_read_back() {
        let store = store();
        let mut session = store.open_session();

        assert_eq!(write(&mut session, b"0123456789").unwrap(), 10);
        assert_eq!(session.position(), 10);

        assert_eq!(session.seek(0, Whence::Start).unwrap(), 0);
        let bytes = read(&mut session, 20).unwrap();
        assert_eq!(&bytes[..10], b"0123456789");
        assert_eq!(&bytes[10..], &[0u8; 10]);
        assert_eq!(session.position(), 20);
    }

    #[test]
    fn test_read_at_end_is_empty() {
        let store = store();
        let mut session = store.open_session();
        session.seek(0, Whence::End).unwrap();

        assert!(read(&mut session, 16).unwrap().is_empty());
        assert_eq!(session.position(), CAPACITY);
    }

    #[test]
    fn test_short_read_near_end() {
        let store = store();
        let mut session = store.open_session();
        session.seek(-4, Whence::End).unwrap();

        assert_eq!(read(&mut session, 100).unwrap().len(), 4);
        assert_eq!(session.position(), CAPACITY);
    }

    #[test]
    fn test_write_at_end_fails() {
        let store = store();
        let mut session = store.open_session();
        session.seek(CAPACITY as i64, Whence::Start).unwrap();

        assert_eq!(
            write(&mut session, b"x"),
            Err(ScullError::CapacityExceeded {
                position: CAPACITY,
                capacity: CAPACITY
            })
        );
        assert_eq!(session.position(), CAPACITY);
    }

    #[test]
    fn test_short_write_then_capacity_exceeded() {
        let store = store();
        let mut session = store.open_session();
        session.seek(1000, Whence::Start).unwrap();

        let payload = vec![0xEEu8; 100];
        assert_eq!(write(&mut session, &payload).unwrap(), 24);
        assert_eq!(session.position(), CAPACITY);
        assert!(matches!(
            write(&mut session, &payload),
            Err(ScullError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_empty_write_is_zero() {
        let store = store();
        let mut session = store.open_session();
        assert_eq!(write(&mut session, b"").unwrap(), 0);
        assert_eq!(session.position(), 0);
    }

    #[test]
    fn test_seek_bounds() {
        let store = store();
        let mut session = store.open_session();

        assert!(matches!(
            session.seek(-1, Whence::Start),
            Err(ScullError::InvalidOffset { offset: -1, .. })
        ));
        assert!(matches!(
            session.seek(CAPACITY as i64 + 1, Whence::Start),
            Err(ScullError::InvalidOffset { .. })
        ));
        assert_eq!(session.position(), 0);

        assert_eq!(
            session.seek(CAPACITY as i64, Whence::Start).unwrap(),
            CAPACITY
        );
    }

    #[test]
    fn test_seek_relative() {
        let store = store();
        let mut session = store.open_session();

        assert_eq!(session.seek(100, Whence::Current).unwrap(), 100);
        assert_eq!(session.seek(-40, Whence::Current).unwrap(), 60);
        assert!(session.seek(-61, Whence::Current).is_err());
        assert_eq!(session.position(), 60);

        assert_eq!(session.seek(-24, Whence::End).unwrap(), 1000);
        assert!(session.seek(1, Whence::End).is_err());
        assert_eq!(session.position(), 1000);
    }

    #[test]
    fn test_seek_extreme_offsets_do_not_overflow() {
        let store = store();
        let mut session = store.open_session();
        session.seek(10, Whence::Start).unwrap();

        assert!(session.seek(i64::MAX, Whence::Current).is_err());
        assert!(session.seek(i64::MIN, Whence::End).is_err());
        assert_eq!(session.position(), 10);
    }

    #[test]
    fn test_read_fault_keeps_cursor() {
        let store = store();
        let mut session = store.open_session();

        // Sink window smaller than the transfer
        let mut sink = UserBuffer::with_window(4);
        assert_eq!(
            session.read(&mut sink, 8),
            Err(ScullError::TransferFault(CopyFault::BadAddress))
        );
        assert_eq!(session.position(), 0);
    }

    #[test]
    fn test_sessions_share_bytes_not_cursors() {
        let store = store();
        let mut writer = store.open_session();
        let mut reader = store.open_session();
        assert_ne!(writer.id(), reader.id());

        write(&mut writer, b"shared").unwrap();
        assert_eq!(writer.position(), 6);
        assert_eq!(reader.position(), 0);
        assert_eq!(read(&mut reader, 6).unwrap(), b"shared");
    }

    #[test]
    fn test_whence_from_raw() {
        assert_eq!(Whence::try_from(0).unwrap(), Whence::Start);
        assert_eq!(Whence::try_from(1).unwrap(), Whence::Current);
        assert_eq!(Whence::try_from(2).unwrap(), Whence::End);
        assert_eq!(Whence::try_from(3), Err(ScullError::InvalidWhence(3)));
        assert_eq!(Whence::End.as_raw(), 2);
    }

    #[test]
    fn test_whence_from_str() {
        assert_eq!("start".parse::<Whence>().unwrap(), Whence::Start);
        assert_eq!("cur".parse::<Whence>().unwrap(), Whence::Current);
        assert_eq!("end".parse::<Whence>().unwrap(), Whence::End);
        assert!("middle".parse::<Whence>().is_err());
    }

    #[test]
    fn test_destroy_with_open_session() {
        let store = store();
        let session = store.open_session();
        assert_eq!(store.open_sessions(), 1);
        assert_eq!(
            store.destroy(),
            Err(ScullError::StoreBusy { open_sessions: 1 })
        );
        // The session still works on the orphaned bytes
        assert_eq!(session.capacity(), CAPACITY);
    }

    #[test]
    fn test_destroy_after_close() {
        let store = store();
        let session = store.open_session();
        store.close_session(session);
        assert_eq!(store.open_sessions(), 0);
        assert!(store.destroy().is_ok());
    }

    #[test]
    fn test_zero_capacity_store() {
        let store = BoundedStore::create(0).unwrap();
        let mut session = store.open_session();
        assert!(read(&mut session, 1).unwrap().is_empty());
        assert!(matches!(
            write(&mut session, b"a"),
            Err(ScullError::CapacityExceeded { .. })
        ));
        assert_eq!(session.seek(0, Whence::End).unwrap(), 0);
    }
}
