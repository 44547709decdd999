//! Intrusive singly-linked FIFO over raw pointers.
//!
//! Used for the ready queue, every task's joiners list, and every
//! semaphore's waiters list. Intrusive because task control blocks are
//! statically allocated (see [`crate::sched`]) and a task is linked
//! into at most one such queue at a time — grounded on `arduinos.c`'s
//! `standby_q_first`/`standby_q_last` and the `ctx_next` union member
//! used to thread them.

use core::ptr;

/// A type that can be linked into an intrusive [`WaitQueue`].
///
/// # Safety
///
/// Implementors must guarantee that `take_link`/`set_link` touch only
/// the node's own link storage, and that a node is never read through
/// two different `*mut Self` values while linked.
pub unsafe trait Intrusive {
    fn take_link(&mut self) -> *mut Self;
    fn set_link(&mut self, next: *mut Self);
}

/// FIFO with head and tail, linked through each node's own link field.
pub struct WaitQueue<T> {
    head: *mut T,
    tail: *mut T,
}

impl<T: Intrusive> WaitQueue<T> {
    pub const fn new() -> Self {
        WaitQueue {
            head: ptr::null_mut(),
            tail: ptr::null_mut(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_null()
    }

    /// Appends `node` to the tail.
    ///
    /// # Safety
    /// `node` must be a valid, exclusively-owned pointer not currently
    /// linked into any other queue.
    pub unsafe fn enqueue(&mut self, node: *mut T) {
        (*node).set_link(ptr::null_mut());
        if self.tail.is_null() {
            self.head = node;
        } else {
            (*self.tail).set_link(node);
        }
        self.tail = node;
    }

    /// Removes and returns the head, or `None` if empty.
    ///
    /// # Safety
    /// Every node ever enqueued must still be a valid pointer.
    pub unsafe fn dequeue(&mut self) -> Option<*mut T> {
        if self.head.is_null() {
            return None;
        }
        let node = self.head;
        let next = (*node).take_link();
        self.head = next;
        if self.head.is_null() {
            self.tail = ptr::null_mut();
        }
        Some(node)
    }
}

impl<T: Intrusive> Default for WaitQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
