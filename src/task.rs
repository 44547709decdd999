//! Task control block and task states.
//!
//! Grounded on `arduinos.c`'s `struct context_t` / `struct
//! context_stack_t`: a fixed per-slot record whose `ctx_func`/`ctx_arg`
//! fields sit immediately before the stack buffer they describe, so
//! that a stack overflow (the stack grows toward that end of the
//! struct) corrupts only fields that are read once, at task start, and
//! never again.

use crate::arch::{self, Regs};
use crate::config::STACK_SIZE;
use crate::status::{Cid, Status};
use crate::waitq::{Intrusive, WaitQueue};

/// Task entry function: takes the argument passed to `create` and
/// returns the value delivered to joiners.
pub type EntryFn = extern "C" fn(usize) -> i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Free,
    Scheduled,
    Running,
    Delayed,
    Joining,
    Waiting,
    Paused,
    Zombie,
}

/// The mutually-exclusive overlay of a delay timestamp and a waiter-
/// queue link. A task is never simultaneously Delayed and linked into
/// a waiter queue, so the two can share storage; here that sharing is
/// a tagged enum rather than a literal union, the resolution the
/// design notes call for in a language with sum types.
#[derive(Debug, Clone, Copy)]
pub enum SchedLink {
    Unlinked,
    Next(*mut Tcb),
    WakeTs(u32),
}

/// One task slot: metadata, saved machine state, and the stack it
/// owns. `entry_fn`/`entry_arg` are declared immediately before
/// `stack` and the struct is `repr(C)`, so in memory they sit at the
/// extreme the stack grows toward (see the module doc comment).
#[repr(C)]
pub struct Tcb {
    pub(crate) id: Cid,
    pub(crate) state: TaskState,
    pub(crate) regs: Regs,
    pub(crate) ret: i32,
    pub(crate) ret_status: Status,
    pub(crate) joiners: WaitQueue<Tcb>,
    pub(crate) link: SchedLink,
    entry_fn: Option<EntryFn>,
    entry_arg: usize,
    stack: [u8; STACK_SIZE],
}

// SAFETY: task slots are statically allocated, never moved, and
// accessed only through raw pointers managed exclusively by the
// single-threaded cooperative scheduler (§5: one logical thread of
// execution at any instant).
unsafe impl Send for Tcb {}
unsafe impl Sync for Tcb {}

unsafe impl Intrusive for Tcb {
    fn take_link(&mut self) -> *mut Tcb {
        match core::mem::replace(&mut self.link, SchedLink::Unlinked) {
            SchedLink::Next(p) => p,
            _ => core::ptr::null_mut(),
        }
    }

    fn set_link(&mut self, next: *mut Tcb) {
        self.link = if next.is_null() {
            SchedLink::Unlinked
        } else {
            SchedLink::Next(next)
        };
    }
}

impl Tcb {
    /// Builds a free slot for array position `slot` (0-based). The id
    /// is fixed for the lifetime of the program: it never changes even
    /// as the slot is recycled between occupants.
    pub(crate) fn empty(slot: usize) -> Self {
        Tcb {
            id: Cid::from_slot(slot),
            state: TaskState::Free,
            regs: arch::Regs::zeroed(),
            ret: 0,
            ret_status: Status::Success,
            joiners: WaitQueue::new(),
            link: SchedLink::Unlinked,
            entry_fn: None,
            entry_arg: 0,
            stack: [0u8; STACK_SIZE],
        }
    }

    pub fn id(&self) -> Cid {
        self.id
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub(crate) fn wake_ts(&self) -> u32 {
        match self.link {
            SchedLink::WakeTs(ts) => ts,
            _ => 0,
        }
    }

    pub(crate) fn set_wake_ts(&mut self, ts: u32) {
        self.link = SchedLink::WakeTs(ts);
    }

    /// Initializes this now-allocated slot's saved state so resuming
    /// it lands on the architecture trampoline, which will call
    /// `entry(arg)` on the slot's own stack.
    ///
    /// # Safety
    /// Must only be called on a slot that is not currently linked into
    /// any queue and not in the delay heap (i.e. freshly taken off the
    /// free list).
    pub(crate) unsafe fn start(&mut self, entry: EntryFn, arg: usize) {
        self.entry_fn = Some(entry);
        self.entry_arg = arg;
        self.ret = 0;
        self.ret_status = Status::Success;
        self.link = SchedLink::Unlinked;
        let self_ptr = self as *mut Tcb as *mut u8;
        self.regs = arch::init_stack(&mut self.stack, self_ptr);
    }

    /// Reads the entry function and argument. Consumed exactly once by
    /// `task_trampoline` on first resumption.
    pub(crate) fn take_entry(&self) -> (EntryFn, usize) {
        (
            self.entry_fn.expect("task started without an entry function"),
            self.entry_arg,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slot_has_stable_id_and_free_state() {
        let t = Tcb::empty(2);
        assert_eq!(t.id().value(), 3);
        assert_eq!(t.state(), TaskState::Free);
    }

    #[test]
    fn link_round_trips_through_intrusive_impl() {
        let mut a = Tcb::empty(0);
        let mut b = Tcb::empty(1);
        let b_ptr = &mut b as *mut Tcb;
        a.set_link(b_ptr);
        assert_eq!(a.take_link(), b_ptr);
        assert_eq!(a.take_link(), core::ptr::null_mut());
    }

    #[test]
    fn wake_ts_and_link_share_storage() {
        let mut t = Tcb::empty(0);
        t.set_wake_ts(42);
        assert_eq!(t.wake_ts(), 42);
        let other = &mut Tcb::empty(1) as *mut Tcb;
        t.set_link(other);
        assert_eq!(t.wake_ts(), 0);
    }
}
