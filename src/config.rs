//! # Kernel configuration
//!
//! Compile-time constants governing pool sizes. All limits are fixed
//! at compile time — no dynamic allocation, no environment, no
//! persisted state.

/// Maximum number of tasks the system can manage simultaneously.
/// This bounds the static TCB array. Increase with care — each task
/// consumes `STACK_SIZE` bytes of RAM.
pub const MAX_TASKS: usize = 5;

/// Per-task stack size in bytes, including the [`crate::task::Tcb`]
/// metadata co-located at the end of the region.
pub const STACK_SIZE: usize = 256;

/// Delay-heap capacity. Must be at least `MAX_TASKS` so every task can
/// be delayed at once.
pub const HEAP_CAPACITY: usize = MAX_TASKS;
