//! Counting semaphore built on the waiter-queue primitive and the
//! scheduler's blocking/wake operations.
//!
//! Grounded on `arduinos.c`'s `arduinos_semaphore_init/wait/signal`,
//! operating on the same `ctx_next`-linked waiter queue the ready list
//! and joiners lists use.

use crate::host::Host;
use crate::sched::Sched;
use crate::status::Status;
use crate::task::{Tcb, TaskState};
use crate::waitq::WaitQueue;

/// A counting semaphore. `count` may go negative in spirit but is
/// represented as `u32` plus a waiter queue; waiting tasks block
/// rather than the count going negative.
pub struct Semaphore {
    count: u32,
    waiters: WaitQueue<Tcb>,
}

impl Semaphore {
    pub const fn new(n: u32) -> Self {
        Semaphore {
            count: n,
            waiters: WaitQueue::new(),
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// If `count > 0`, decrements and returns immediately. Otherwise
    /// blocks the calling task until `signal` or `fini` wakes it.
    pub fn wait<H: Host + 'static>(&mut self, sched: &mut Sched<H>) -> Status {
        if self.count > 0 {
            self.count -= 1;
            return Status::Success;
        }
        unsafe {
            let cur = sched.current_ptr();
            (*cur).state = TaskState::Waiting;
            (*cur).ret_status = Status::Success;
            self.waiters.enqueue(cur);
            sched.block_current();
            (*cur).ret_status
        }
    }

    /// Increments `count`, then drains any waiters that were killed
    /// while queued (scheduling each so its termination runs), and
    /// wakes at most one live waiter, transferring the unit directly
    /// to it instead of leaving `count` incremented.
    pub fn signal<H: Host + 'static>(&mut self, sched: &mut Sched<H>) {
        self.count += 1;
        loop {
            let w = unsafe { self.waiters.dequeue() };
            let w = match w {
                Some(w) => w,
                None => break,
            };
            unsafe {
                if (*w).state() == TaskState::Zombie {
                    sched.schedule(w);
                    continue;
                }
                sched.schedule(w);
                self.count -= 1;
                break;
            }
        }
    }

    /// Wakes every waiter with `SemDestroyed`. The semaphore itself is
    /// not otherwise invalidated; further `wait`/`signal` calls operate
    /// on an empty waiter queue as usual.
    pub fn fini<H: Host + 'static>(&mut self, sched: &mut Sched<H>) {
        while let Some(w) = unsafe { self.waiters.dequeue() } {
            unsafe {
                (*w).ret_status = Status::SemDestroyed;
                sched.schedule(w);
            }
        }
        log::debug!("semaphore finalized, waiters released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SimHost;

    extern "C" fn noop(_arg: usize) -> i32 {
        0
    }

    #[test]
    fn wait_does_not_block_when_count_positive() {
        let mut sem = Semaphore::new(1);
        let mut sched: Sched<SimHost> = Sched::new(SimHost::new());
        sched.setup();
        let id = sched.create(noop, 0).unwrap();
        unsafe {
            sched.set_current_for_test(id);
        }
        assert_eq!(sem.wait(&mut sched), Status::Success);
        assert_eq!(sem.count(), 0);
    }
}
