//! Stable status codes and the task identifier type.

use core::fmt;
use core::num::NonZeroU32;

/// Result status of a kernel operation.
///
/// Discriminants are stable and match the integer values a C caller
/// would see from the original implementation: `Success = 0`,
/// `Invalid = -1`, `Killed = -2`, `ResrcExhausted = -3`,
/// `SemDestroyed = -4`. Code that genuinely needs the wire value (for
/// logging or an FFI boundary) can obtain it with `status as i32`;
/// ordinary call sites match on the enum instead.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success = 0,
    Invalid = -1,
    Killed = -2,
    ResrcExhausted = -3,
    SemDestroyed = -4,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Success => "success",
            Status::Invalid => "invalid",
            Status::Killed => "killed",
            Status::ResrcExhausted => "resource exhausted",
            Status::SemDestroyed => "semaphore destroyed",
        };
        f.write_str(s)
    }
}

/// A task identifier: a 1-based slot index, stable for the lifetime of
/// that slot's occupancy. Zero is reserved as "invalid" by the source
/// design; wrapping the id in `NonZeroU32` makes that reservation a
/// type-level guarantee instead of a convention every caller must
/// remember to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cid(NonZeroU32);

impl Cid {
    /// Builds a `Cid` from a 1-based slot index (slot 0 -> cid 1).
    pub(crate) fn from_slot(slot: usize) -> Self {
        let raw = (slot as u32) + 1;
        Cid(NonZeroU32::new(raw).expect("slot index + 1 is never zero"))
    }

    /// The 0-based slot index this id refers to.
    pub(crate) fn slot(self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// The raw 1-based numeric id, as exposed to user code.
    pub fn value(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cid={}", self.0.get())
    }
}
