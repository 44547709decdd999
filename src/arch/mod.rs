//! # Architecture abstraction layer
//!
//! Provides the hardware boundary the scheduler needs: a saved-machine-
//! state type (`Regs`), a way to forge the initial state for a freshly
//! created task (`init_stack`), and the actual save/restore primitive
//! (`switch_to`). Extensible to other architectures by adding sibling
//! modules with the same three items.
//!
//! The Cortex-M4 port is feature-gated behind `cortex-m-port`; without
//! it the crate builds the `x86_64` port, which is real working code
//! (not a stub) so the scheduler can run under `cargo test` on an
//! ordinary development machine.

#[cfg(feature = "cortex-m-port")]
pub mod cortex_m;
#[cfg(feature = "cortex-m-port")]
pub use cortex_m::{init_stack, switch_to, Regs};

#[cfg(not(feature = "cortex-m-port"))]
pub mod x86_64;
#[cfg(not(feature = "cortex-m-port"))]
pub use self::x86_64::{init_stack, switch_to, Regs};
