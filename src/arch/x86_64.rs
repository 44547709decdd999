//! Host port: a real x86_64 context switch, so the scheduler can run
//! and be exercised by the test suite on an ordinary development
//! machine rather than only on a microcontroller.
//!
//! Grounded on the same register-save/restore technique the reference
//! scheduler uses for Cortex-M4 (save callee-saved registers, swap the
//! stack pointer, restore), and on the riscv64 `switch_context`/
//! `TaskContext` shape worked out in this codebase's green-thread
//! teaching exercise, adapted to the x86_64 System V ABI's callee-saved
//! set: `rbx`, `rbp`, `r12`–`r15`.

use core::arch::asm;

/// Saved machine state: just the stack pointer. Every other callee-
/// saved register lives on the task's own stack between switches.
#[repr(C)]
pub struct Regs {
    rsp: u64,
}

impl Regs {
    pub const fn zeroed() -> Self {
        Regs { rsp: 0 }
    }
}

/// Builds the initial saved state for a task whose stack is `stack`
/// (the full, unused region) and whose first resumption should invoke
/// `crate::sched::task_trampoline(tcb_ptr)`.
///
/// # Safety
/// `stack` must be a region not otherwise in use, large enough to hold
/// the seeded frame (7 qwords) plus the task's actual call stack.
pub unsafe fn init_stack(stack: &mut [u8], tcb_ptr: *mut u8) -> Regs {
    let top = stack.as_mut_ptr().add(stack.len()) as usize;
    // Seven qwords: r15, r14, r13, r12, rbx, rbp, return address —
    // in that address order, matching switch_to's push/pop sequence.
    // `base` (the resulting rsp) must be 16-aligned so that once the
    // shim's `ret` "returns" into it, rsp sits at the ABI-mandated
    // misalignment of 8 a freshly `call`ed function expects.
    let base = (top - 7 * 8) & !0xf;
    let words = base as *mut u64;
    core::ptr::write(words.add(0), 0); // r15
    core::ptr::write(words.add(1), 0); // r14
    core::ptr::write(words.add(2), 0); // r13
    core::ptr::write(words.add(3), tcb_ptr as u64); // r12: carries tcb_ptr to the shim
    core::ptr::write(words.add(4), 0); // rbx
    core::ptr::write(words.add(5), 0); // rbp
    core::ptr::write(words.add(6), trampoline_shim as usize as u64); // return address
    Regs { rsp: base as u64 }
}

/// Saves the current task's registers into `*save_into`, then restores
/// `*restore_from` and resumes execution there. Returns (to the
/// caller of the *other* `switch_to` that eventually switches back)
/// exactly when some other task switches back into `save_into`.
///
/// # Safety
/// Both pointers must point at live `Regs` belonging to tasks whose
/// stacks are still valid.
#[naked]
pub unsafe extern "C" fn switch_to(save_into: *mut Regs, restore_from: *const Regs) {
    asm!(
        "push rbp",
        "push rbx",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov [rdi], rsp",
        "mov rsp, [rsi]",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop rbx",
        "pop rbp",
        "ret",
        options(noreturn)
    );
}

/// Lands here on a task's first resumption, with `r12` holding the
/// `tcb_ptr` stashed by `init_stack`. Moves it into the first
/// argument register and calls the kernel's fixed trampoline.
#[naked]
unsafe extern "C" fn trampoline_shim() -> ! {
    asm!(
        "mov rdi, r12",
        "call {entry}",
        "ud2",
        entry = sym crate::sched::task_trampoline,
        options(noreturn)
    );
}
