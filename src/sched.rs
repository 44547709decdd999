//! The scheduler and task core: pool, free list, ready queue, delay
//! heap, context switch, epoch loop, and task lifecycle operations.
//!
//! Grounded on `arduinos.c`'s `arduinos_setup/loop/create/delay/yield/
//! join/kill/pause/resume` and the `active_q`/`standby_q`/`delay_q`
//! globals, reshaped into a single owned struct generic over the host
//! (see `host.rs`) instead of module-level statics — the resolution
//! the design notes call for when encapsulating "global mutable state"
//! in a language that makes that encapsulation easy.

use core::cmp::Ordering;
use core::ptr;

use crate::arch::{self, Regs};
use crate::config::{HEAP_CAPACITY, MAX_TASKS};
use crate::heap::Heap;
use crate::host::Host;
use crate::status::{Cid, Status};
use crate::sync::Guard;
use crate::task::{EntryFn, TaskState, Tcb};
use crate::waitq::WaitQueue;

fn cmp_wake(a: &*mut Tcb, b: &*mut Tcb) -> Ordering {
    // SAFETY: every pointer stored in the delay heap is a live task
    // slot for the lifetime of the scheduler.
    unsafe { (**a).wake_ts().cmp(&(**b).wake_ts()) }
}

/// A scheduler instance: the task pool and all scheduling state,
/// generic over the host services it needs (`now_ms`/`idle_until`).
///
/// Must not be moved once [`Sched::setup`] has run: task slots and the
/// scheduler context are referenced by raw pointer from that point on.
pub struct Sched<H: Host> {
    host: H,
    tasks: [Tcb; MAX_TASKS],
    free_head: *mut Tcb,
    ready_q: WaitQueue<Tcb>,
    active_head: WaitQueue<Tcb>,
    delay_q: Heap<*mut Tcb, HEAP_CAPACITY>,
    current: *mut Tcb,
    scheduler_ctx: Tcb,
    guard: Guard,
}

/// Callback surface the architecture trampoline reaches through a
/// single global pointer, since a `#[naked]` function called by raw
/// symbol cannot itself be generic over `H`.
pub(crate) trait Trampoline {
    unsafe fn terminate_current(&mut self, ret: i32);
}

static mut ACTIVE_SCHED: Option<*mut dyn Trampoline> = None;

/// Lands here on every task's first resumption (see `arch::*::
/// trampoline_shim`). Reads the entry fn/arg stashed in the TCB,
/// calls it, and hands the result to termination. Must not reference
/// any local captured before the stack-pointer fix-up in `init_stack`.
pub(crate) unsafe extern "C" fn task_trampoline(tcb_ptr: *mut u8) -> ! {
    let tcb = tcb_ptr as *mut Tcb;
    let (entry, arg): (EntryFn, usize) = (*tcb).take_entry();
    let ret = entry(arg);
    let sched = ACTIVE_SCHED.expect("task_trampoline ran with no active scheduler");
    (*sched).terminate_current(ret);
    unreachable!("terminate_current switches to the scheduler context and never returns")
}

impl<H: Host + 'static> Trampoline for Sched<H> {
    unsafe fn terminate_current(&mut self, ret: i32) {
        let cur = self.current;
        self.finish(cur, ret, Status::Success);
        let sched_ptr = &mut self.scheduler_ctx as *mut Tcb;
        self.hw_switch(sched_ptr);
    }
}

impl<H: Host + 'static> Sched<H> {
    /// Builds an un-initialized scheduler. Call [`Sched::setup`] once
    /// `self` is at its final address before creating any task.
    pub fn new(host: H) -> Self {
        Sched {
            host,
            tasks: core::array::from_fn(Tcb::empty),
            free_head: ptr::null_mut(),
            ready_q: WaitQueue::new(),
            active_head: WaitQueue::new(),
            delay_q: Heap::new(cmp_wake),
            current: ptr::null_mut(),
            scheduler_ctx: Tcb::empty(MAX_TASKS),
            guard: Guard::new(),
        }
    }

    /// Initializes the pool, free list, queues, and heap, and clears
    /// `current`. Corresponds to the host's one-time `setup()` call.
    pub fn setup(&mut self) {
        let mut head: *mut Tcb = ptr::null_mut();
        for (slot, t) in self.tasks.iter_mut().enumerate().rev() {
            *t = Tcb::empty(slot);
            t.set_link(head);
            head = t as *mut Tcb;
        }
        self.free_head = head;
        self.ready_q = WaitQueue::new();
        self.active_head = WaitQueue::new();
        self.delay_q = Heap::new(cmp_wake);
        self.current = ptr::null_mut();
        self.scheduler_ctx = Tcb::empty(MAX_TASKS);
        // SAFETY: `self` will not move after this point (documented
        // struct-level invariant); the trait object stays valid for
        // the scheduler's lifetime.
        unsafe {
            ACTIVE_SCHED = Some(self as *mut Sched<H> as *mut dyn Trampoline);
        }
        log::info!("kernel setup: {} task slots", MAX_TASKS);
    }

    /// Allocates a free slot, seeds its saved state to resume on the
    /// architecture trampoline, and schedules it for the next epoch.
    pub fn create(&mut self, entry: EntryFn, arg: usize) -> Result<Cid, Status> {
        let slot = self.pop_free().ok_or(Status::ResrcExhausted)?;
        unsafe {
            slot.as_mut().unwrap_unchecked().start(entry, arg);
            self.schedule_tcb(slot);
        }
        let id = unsafe { (*slot).id() };
        log::debug!("create: {} scheduled", id);
        Ok(id)
    }

    /// The calling task's own id.
    pub fn self_id(&self) -> Cid {
        unsafe { (*self.current).id() }
    }

    /// Re-enqueues the current task and switches to the scheduler. The
    /// task does not run again until the *next* epoch.
    pub fn yield_now(&mut self) {
        unsafe {
            let cur = self.current;
            self.schedule_tcb(cur);
            self.block_current();
        }
    }

    /// `ms == 0` is treated as `yield_now` (see the ordering guarantee
    /// in the component design: both are observably equivalent once
    /// the delay-heap promotion step is accounted for).
    pub fn delay(&mut self, ms: u32) {
        if ms == 0 {
            self.yield_now();
            return;
        }
        unsafe {
            let cur = self.current;
            let wake = self.host.now_ms().wrapping_add(ms);
            (*cur).state = TaskState::Delayed;
            (*cur).set_wake_ts(wake);
            self.delay_q
                .push(cur)
                .unwrap_or_else(|_| panic!("delay heap capacity must cover every task slot"));
            self.block_current();
        }
    }

    /// Blocks the caller on `id`'s termination. Returns the target's
    /// `ret` on success, `Killed` if the target was killed while we
    /// waited, or `Invalid` if `id` does not currently name a live,
    /// joinable, non-self task.
    pub fn join(&mut self, id: Cid) -> Result<i32, Status> {
        let target = self.slot_ptr(id).ok_or(Status::Invalid)?;
        unsafe {
            if ptr::eq(target, self.current) {
                return Err(Status::Invalid);
            }
            // A Zombie target is still joinable: it has been marked for
            // termination but not yet reaped, and the eventual reap
            // drains its joiners same as a normal return would. Only a
            // Free slot (already reaped) is too late to join.
            if (*target).state() == TaskState::Free {
                return Err(Status::Invalid);
            }
            let cur = self.current;
            (*target).joiners.enqueue(cur);
            (*cur).state = TaskState::Joining;
            (*cur).ret_status = Status::Success;
            self.block_current();

            if (*cur).ret_status != Status::Success {
                Err((*cur).ret_status)
            } else {
                Ok((*cur).ret)
            }
        }
    }

    /// Marks `id` Zombie and fails every TCB currently in *its*
    /// joiners queue with `Killed` — the corrected behavior from the
    /// design notes, not the victim's caller's joiners. If `id` is the
    /// calling task, converges on the same termination path a normal
    /// return takes.
    pub fn kill(&mut self, id: Cid) -> Result<(), Status> {
        let target = self.slot_ptr(id).ok_or(Status::Invalid)?;
        unsafe {
            match (*target).state() {
                TaskState::Free | TaskState::Zombie => return Err(Status::Invalid),
                _ => {}
            }
            (*target).state = TaskState::Zombie;
            while let Some(j) = (*target).joiners.dequeue() {
                (*j).ret = -1;
                (*j).ret_status = Status::Killed;
                self.schedule_tcb(j);
            }
            log::warn!("kill: {} marked zombie", id);
            if ptr::eq(target, self.current) {
                self.terminate_current(-1);
            }
        }
        Ok(())
    }

    /// Leaves `id` wherever it currently is (ready queue, delay heap,
    /// a waiter queue) but suppresses its progress until `resume`.
    /// Pausing a Delayed or Waiting task is not supported (design
    /// notes, unresolved edge case in the source) and is rejected as
    /// `Invalid` rather than silently corrupting whatever queue it is
    /// already linked into.
    pub fn pause(&mut self, id: Cid) -> Result<(), Status> {
        let target = self.slot_ptr(id).ok_or(Status::Invalid)?;
        unsafe {
            match (*target).state() {
                TaskState::Free | TaskState::Zombie | TaskState::Delayed | TaskState::Waiting => {
                    return Err(Status::Invalid)
                }
                _ => {}
            }
            (*target).state = TaskState::Paused;
            if ptr::eq(target, self.current) {
                self.block_current();
            }
        }
        Ok(())
    }

    /// Enqueues a Paused task onto the ready queue. Any other state is
    /// `Invalid`.
    pub fn resume(&mut self, id: Cid) -> Result<(), Status> {
        let target = self.slot_ptr(id).ok_or(Status::Invalid)?;
        unsafe {
            if (*target).state() != TaskState::Paused {
                return Err(Status::Invalid);
            }
            self.schedule_tcb(target);
        }
        Ok(())
    }

    /// The epoch loop: drains the tasks that were ready at the start
    /// of this call, promotes due (or zombie) delays into the next
    /// ready queue, then idles if there is nothing left to run.
    pub fn run_once(&mut self) {
        self.guard.enter();
        core::mem::swap(&mut self.active_head, &mut self.ready_q);
        self.current = &mut self.scheduler_ctx as *mut Tcb;

        unsafe {
            while let Some(next) = self.active_head.dequeue() {
                self.switch_to_next_in_epoch(next);
            }
        }

        let now = self.host.now_ms();
        loop {
            let due = match self.delay_q.peek() {
                Some(p) => unsafe { (*p).state() == TaskState::Zombie || (*p).wake_ts() <= now },
                None => false,
            };
            if !due {
                break;
            }
            let p = self.delay_q.pop().expect("peek just confirmed an element");
            unsafe {
                if (*p).state() != TaskState::Zombie {
                    (*p).state = TaskState::Scheduled;
                }
                self.ready_q.enqueue(p);
            }
        }

        if self.ready_q.is_empty() {
            if let Some(root) = self.delay_q.peek() {
                let wake = unsafe { (*root).wake_ts() };
                let now = self.host.now_ms();
                self.host.idle_until(wake.saturating_sub(now));
            }
        }
        self.guard.exit();
    }

    // -- internal plumbing -------------------------------------------------

    fn pop_free(&mut self) -> Option<*mut Tcb> {
        if self.free_head.is_null() {
            return None;
        }
        let slot = self.free_head;
        unsafe {
            self.free_head = (*slot).take_link();
        }
        Some(slot)
    }

    fn push_free(&mut self, tcb: *mut Tcb) {
        unsafe {
            (*tcb).set_link(self.free_head);
        }
        self.free_head = tcb;
    }

    fn slot_ptr(&mut self, id: Cid) -> Option<*mut Tcb> {
        let slot = id.slot();
        if slot >= MAX_TASKS {
            return None;
        }
        Some(&mut self.tasks[slot] as *mut Tcb)
    }

    /// Enqueues `tcb` onto the ready queue. A `Zombie` keeps its marker
    /// (mirrors the delay-heap promotion in `run_once`) so
    /// `switch_to_next_in_epoch` reaps it instead of resuming it as if
    /// it were live.
    unsafe fn schedule_tcb(&mut self, tcb: *mut Tcb) {
        if (*tcb).state() != TaskState::Zombie {
            (*tcb).state = TaskState::Scheduled;
        }
        self.ready_q.enqueue(tcb);
    }

    /// Wakes every joiner still queued at reap time (ones already
    /// drained by `kill`'s immediate sweep are not seen here again),
    /// then frees the slot. `joiner_status` is `Success` for a normal
    /// return and `Killed` for a target that was still Zombie when
    /// reaped. Touches only TCB-level bookkeeping, so it is safe to
    /// call whether or not the caller is actually executing on `tcb`'s
    /// own stack (the epoch loop reaps zombies it dequeues without
    /// ever switching hardware context onto them).
    unsafe fn finish(&mut self, tcb: *mut Tcb, ret: i32, joiner_status: Status) {
        (*tcb).ret = ret;
        while let Some(j) = (*tcb).joiners.dequeue() {
            (*j).ret = ret;
            (*j).ret_status = joiner_status;
            self.schedule_tcb(j);
        }
        let id = (*tcb).id();
        (*tcb).state = TaskState::Free;
        self.push_free(tcb);
        log::debug!("task {} terminated, ret={}", id, ret);
    }

    /// A Zombie dequeued from the ready list during the epoch loop is
    /// reaped in place: its termination bookkeeping does not need the
    /// hardware stack switch real resumption would require, since a
    /// task killed while not current was already suspended at its last
    /// suspension point and has nothing left to run. Any joiner that
    /// attached after the kill call (and so missed its immediate
    /// sweep) wakes here with `Killed`.
    unsafe fn reap_zombie(&mut self, zombie: *mut Tcb) {
        self.finish(zombie, -1, Status::Killed);
        self.current = &mut self.scheduler_ctx as *mut Tcb;
    }

    unsafe fn switch_to_next_in_epoch(&mut self, next: *mut Tcb) {
        if (*next).state() == TaskState::Zombie {
            self.current = next;
            self.reap_zombie(next);
        } else {
            self.hw_switch(next);
        }
    }

    /// The actual save/restore primitive: saves the current task's
    /// regs, sets `current := next`, restores `next`'s regs. Used for
    /// both directions — scheduler-to-task in the epoch loop, and
    /// task-to-scheduler at every suspension point.
    unsafe fn hw_switch(&mut self, next: *mut Tcb) {
        let prev = self.current;
        self.current = next;
        if !ptr::eq(next, &self.scheduler_ctx as *const Tcb as *mut Tcb) {
            (*next).state = TaskState::Running;
        }
        let prev_regs = &mut (*prev).regs as *mut Regs;
        let next_regs = &(*next).regs as *const Regs;
        arch::switch_to(prev_regs, next_regs);
    }

    // -- entry points used by `sem.rs` --------------------------------------

    pub(crate) fn current_ptr(&self) -> *mut Tcb {
        self.current
    }

    pub(crate) unsafe fn schedule(&mut self, tcb: *mut Tcb) {
        self.schedule_tcb(tcb);
    }

    /// Switches the calling task to the scheduler context. Used by
    /// `Semaphore::wait` once the task has linked itself onto the
    /// waiters queue and set its own blocking state.
    pub(crate) unsafe fn block_current(&mut self) {
        let sched_ptr = &mut self.scheduler_ctx as *mut Tcb;
        self.hw_switch(sched_ptr);
    }

    #[cfg(test)]
    pub(crate) unsafe fn set_current_for_test(&mut self, id: Cid) {
        self.current = &mut self.tasks[id.slot()] as *mut Tcb;
    }
}
