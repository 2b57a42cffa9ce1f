//! Error numbers surfaced to file clients.
//!
//! Values follow the conventional POSIX numbering so that negative
//! return codes from the host boundary keep their usual meaning.

pub const EBADF: i32 = 9;
pub const ENOMEM: i32 = 12;
pub const EFAULT: i32 = 14;
pub const EBUSY: i32 = 16;
pub const ENODEV: i32 = 19;
pub const EINVAL: i32 = 22;
pub const ESPIPE: i32 = 29;

/// Symbolic name for a known error number
pub fn name(errno: i32) -> &'static str {
    match errno {
        EBADF => "EBADF",
        ENOMEM => "ENOMEM",
        EFAULT => "EFAULT",
        EBUSY => "EBUSY",
        ENODEV => "ENODEV",
        EINVAL => "EINVAL",
        ESPIPE => "ESPIPE",
        _ => "EUNKNOWN",
    }
}
