//! # Faulty User Buffer
//!
//! A caller-buffer wrapper that can simulate transfer faults.
//! Useful for exercising fault paths without a real protection boundary.

use hal::{CopyFault, UserSink, UserSource};

/// Policy for when copies should fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPolicy {
    /// Never fault (passthrough)
    Never,
    /// Fault on every copy
    Always,
    /// Fault after N successful copies
    AfterCopies(usize),
}

/// Wrapper around a caller buffer that can simulate faults
#[derive(Debug)]
pub struct FaultyUserBuffer<B> {
    inner: B,
    policy: FaultPolicy,
    copies: usize,
    fault: CopyFault,
}

impl<B> FaultyUserBuffer<B> {
    /// Create a new faulty buffer with the given policy
    pub fn new(inner: B, policy: FaultPolicy) -> Self {
        Self {
            inner,
            policy,
            copies: 0,
            fault: CopyFault::BadAddress,
        }
    }

    /// Use a specific fault instead of `BadAddress`
    pub fn with_fault(mut self, fault: CopyFault) -> Self {
        self.fault = fault;
        self
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn into_inner(self) -> B {
        self.inner
    }

    /// Number of copies that went through
    pub fn copies(&self) -> usize {
        self.copies
    }

    /// Reset the fault policy
    pub fn set_policy(&mut self, policy: FaultPolicy) {
        self.policy = policy;
        self.copies = 0;
    }

    fn check(&self) -> Result<(), CopyFault> {
        let faults = match self.policy {
            FaultPolicy::Never => false,
            FaultPolicy::Always => true,
            FaultPolicy::AfterCopies(n) => self.copies >= n,
        };
        if faults {
            Err(self.fault)
        } else {
            Ok(())
        }
    }
}

impl<B: UserSink> UserSink for FaultyUserBuffer<B> {
    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), CopyFault> {
        self.check()?;
        self.inner.copy_to_user(src)?;
        self.copies += 1;
        Ok(())
    }
}

impl<B: UserSource> UserSource for FaultyUserBuffer<B> {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn copy_from_user(&mut self, dst: &mut [u8]) -> Result<(), CopyFault> {
        self.check()?;
        self.inner.copy_from_user(dst)?;
        self.copies += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hal::{UserBuffer, UserSlice};

    #[test]
    fn test_faulty_buffer_never() {
        let mut sink = FaultyUserBuffer::new(UserBuffer::with_window(8), FaultPolicy::Never);
        assert!(sink.copy_to_user(&[1, 2]).is_ok());
        assert!(sink.copy_to_user(&[3]).is_ok());
        assert_eq!(sink.inner().as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_faulty_buffer_after_copies() {
        let mut sink =
            FaultyUserBuffer::new(UserBuffer::with_window(8), FaultPolicy::AfterCopies(1));
        assert!(sink.copy_to_user(&[1]).is_ok());
        assert_eq!(sink.copy_to_user(&[2]), Err(CopyFault::BadAddress));
        assert_eq!(sink.copies(), 1);
    }

    #[test]
    fn test_faulty_source_with_fault() {
        let data = [5u8; 4];
        let mut source = FaultyUserBuffer::new(UserSlice::new(&data), FaultPolicy::Always)
            .with_fault(CopyFault::NotReadable);
        let mut dst = [0u8; 4];
        assert_eq!(source.len(), 4);
        assert_eq!(source.copy_from_user(&mut dst), Err(CopyFault::NotReadable));
        assert_eq!(dst, [0; 4]);
    }

    #[test]
    fn test_faulty_buffer_set_policy() {
        let mut sink = FaultyUserBuffer::new(UserBuffer::with_window(8), FaultPolicy::Always);
        assert!(sink.copy_to_user(&[1]).is_err());

        sink.set_policy(FaultPolicy::Never);
        assert!(sink.copy_to_user(&[1]).is_ok());
        assert_eq!(sink.into_inner().into_bytes(), vec![1]);
    }
}
