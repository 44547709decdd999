//! # Reentrancy guard
//!
//! The kernel is single-threaded and cooperative: there is exactly one
//! logical thread of execution at any instant, and nothing preempts
//! scheduler-internal code. It needs no interrupt-disabling critical
//! section. What is worth catching is a host callback (`Host::
//! idle_until`, most plausibly) calling back into the scheduler while
//! scheduler code is already on the stack — a caller bug, not a race.
//! `Guard` exists to catch exactly that, and costs nothing outside
//! `debug_assertions` builds.

use core::sync::atomic::{AtomicBool, Ordering};

/// Tracks whether scheduler-internal code is currently executing.
pub(crate) struct Guard {
    #[cfg(debug_assertions)]
    busy: AtomicBool,
}

impl Guard {
    pub(crate) const fn new() -> Self {
        Guard {
            #[cfg(debug_assertions)]
            busy: AtomicBool::new(false),
        }
    }

    /// Marks scheduler code as entered; panics on re-entry.
    #[cfg(debug_assertions)]
    pub(crate) fn enter(&self) {
        let was_busy = self.busy.swap(true, Ordering::AcqRel);
        assert!(!was_busy, "re-entrant call into scheduler-internal code");
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    pub(crate) fn enter(&self) {}

    #[cfg(debug_assertions)]
    pub(crate) fn exit(&self) {
        self.busy.store(false, Ordering::Release);
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    pub(crate) fn exit(&self) {}
}

#[cfg(all(test, debug_assertions))]
mod tests {
    use super::*;

    #[test]
    fn enter_then_exit_does_not_panic() {
        let g = Guard::new();
        g.enter();
        g.exit();
        g.enter();
        g.exit();
    }

    #[test]
    #[should_panic(expected = "re-entrant")]
    fn double_enter_panics() {
        let g = Guard::new();
        g.enter();
        g.enter();
    }
}
