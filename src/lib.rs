//! # cotask
//!
//! A minimal cooperative multitasking microkernel for memory-constrained
//! 8/16-bit microcontrollers.
//!
//! ## Overview
//!
//! `cotask` gives an application a small, fixed set of statically
//! allocated tasks, each with its own stack, scheduled cooperatively:
//! a task runs until it voluntarily yields, delays, blocks on another
//! task's completion, or blocks on a semaphore. There is no timer
//! interrupt, no preemption, and no priority — every ready task gets
//! exactly one turn per scheduling epoch.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Application Tasks                     │
//! ├──────────────┬───────────────────────┬───────────────────┤
//! │  Scheduler   │   Task Model          │  Semaphore        │
//! │  sched.rs    │   task.rs             │  sem.rs           │
//! │  ─ create()  │   ─ Tcb               │  ─ wait()         │
//! │  ─ yield_now │   ─ TaskState         │  ─ signal()       │
//! │  ─ delay()   │   ─ SchedLink         │  ─ fini()         │
//! │  ─ join/kill │                       │                   │
//! ├──────────────┴───────────────────────┴───────────────────┤
//! │      Intrusive queues (waitq.rs) · Delay heap (heap.rs)    │
//! ├────────────────────────────────────────────────────────────┤
//! │       Host contract (host.rs) · Arch port (arch/)           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scheduling model
//!
//! Each call to [`sched::Sched::run_once`] is one epoch: every task
//! that was ready at the start of the call gets exactly one turn, in
//! FIFO order, before any task promoted to ready *during* that epoch
//! (by yielding, delaying, or waking another task) runs. Delayed tasks
//! become ready as soon as their wake time has passed, checked once
//! per epoch against a fixed-capacity min-heap keyed by wake timestamp.
//!
//! ## Memory model
//!
//! - **No heap, no `alloc`** — `core` only outside test builds.
//! - **Fixed task pool** — `[Tcb; MAX_TASKS]`, sized by [`config::MAX_TASKS`].
//! - **Per-task stack** — `[u8; STACK_SIZE]` inline in the task's own
//!   slot, sized by [`config::STACK_SIZE`].
//! - **No dynamic ids** — a task's [`status::Cid`] is fixed by its slot
//!   position for the life of the program.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod config;
pub mod heap;
pub mod host;
pub mod sched;
pub mod sem;
pub mod status;
mod sync;
pub mod task;
pub mod waitq;

pub use host::Host;
pub use sched::Sched;
pub use sem::Semaphore;
pub use status::{Cid, Status};
pub use task::TaskState;
