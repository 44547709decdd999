//! End-to-end scenarios exercising the scheduler through its public
//! surface against the `SimHost` test double, one process per test so
//! the raw-pointer task context each scenario builds never crosses a
//! thread boundary.

use cotask::config::MAX_TASKS;
use cotask::host::SimHost;
use cotask::{Cid, Sched, Semaphore, Status};

// ---------------------------------------------------------------------
// 1. Two-task ping-pong
// ---------------------------------------------------------------------

struct PingPongCtx {
    sched: Sched<SimHost>,
    log: std::vec::Vec<&'static str>,
    target: Option<Cid>,
    join_result: Option<Result<i32, Status>>,
}

extern "C" fn pp_task_a(arg: usize) -> i32 {
    let ctx = unsafe { &mut *(arg as *mut PingPongCtx) };
    for i in 0..4 {
        ctx.log.push("A");
        if i < 3 {
            ctx.sched.yield_now();
        }
    }
    0
}

extern "C" fn pp_task_b(arg: usize) -> i32 {
    let ctx = unsafe { &mut *(arg as *mut PingPongCtx) };
    for i in 0..4 {
        ctx.log.push("B");
        if i < 3 {
            ctx.sched.yield_now();
        }
    }
    0
}

/// Joins `A` from the moment all three tasks are scheduled, so the
/// join blocks on `A`'s joiners queue and is woken by `A`'s own
/// termination path rather than by inspecting an already-freed slot.
extern "C" fn pp_joiner(arg: usize) -> i32 {
    let ctx = unsafe { &mut *(arg as *mut PingPongCtx) };
    let target = ctx.target.expect("target set before joiner runs");
    let sched_ptr = &mut ctx.sched as *mut Sched<SimHost>;
    let r = unsafe { (*sched_ptr).join(target) };
    ctx.join_result = Some(r);
    0
}

#[test]
fn two_task_ping_pong() {
    let mut ctx = PingPongCtx {
        sched: Sched::new(SimHost::new()),
        log: std::vec::Vec::new(),
        target: None,
        join_result: None,
    };
    ctx.sched.setup();
    let ctx_ptr = &mut ctx as *mut PingPongCtx as usize;

    let a = ctx.sched.create(pp_task_a, ctx_ptr).unwrap();
    ctx.sched.create(pp_task_b, ctx_ptr).unwrap();
    ctx.target = Some(a);
    ctx.sched.create(pp_joiner, ctx_ptr).unwrap();

    for _ in 0..4 {
        ctx.sched.run_once();
    }
    assert_eq!(
        ctx.log,
        std::vec!["A", "B", "A", "B", "A", "B", "A", "B"]
    );
    // A terminates partway through epoch 4; the joiner wakes on A's
    // joiners queue but only resumes on the epoch after that.
    ctx.sched.run_once();

    assert_eq!(ctx.join_result, Some(Ok(0)));
}

// ---------------------------------------------------------------------
// 2. Delay ordering
// ---------------------------------------------------------------------

struct DelayCtx {
    sched: Sched<SimHost>,
    order: std::vec::Vec<&'static str>,
}

extern "C" fn delay_t1(arg: usize) -> i32 {
    let ctx = unsafe { &mut *(arg as *mut DelayCtx) };
    ctx.sched.delay(50);
    ctx.order.push("T1");
    0
}

extern "C" fn delay_t2(arg: usize) -> i32 {
    let ctx = unsafe { &mut *(arg as *mut DelayCtx) };
    ctx.sched.delay(20);
    ctx.order.push("T2");
    0
}

extern "C" fn delay_t3(arg: usize) -> i32 {
    let ctx = unsafe { &mut *(arg as *mut DelayCtx) };
    ctx.sched.delay(30);
    ctx.order.push("T3");
    0
}

#[test]
fn delay_ordering() {
    let mut ctx = DelayCtx {
        sched: Sched::new(SimHost::new()),
        order: std::vec::Vec::new(),
    };
    ctx.sched.setup();
    let ptr = &mut ctx as *mut DelayCtx as usize;

    ctx.sched.create(delay_t1, ptr).unwrap();
    ctx.sched.create(delay_t2, ptr).unwrap();
    ctx.sched.create(delay_t3, ptr).unwrap();

    // Each wake only reaches the ready queue one epoch after its heap
    // promotion, so allow more epochs than there are tasks.
    for _ in 0..10 {
        ctx.sched.run_once();
    }

    assert_eq!(ctx.order, std::vec!["T2", "T3", "T1"]);
}

// ---------------------------------------------------------------------
// 3. Kill-a-sleeper
// ---------------------------------------------------------------------

extern "C" fn sleepy_task(arg: usize) -> i32 {
    let sched = unsafe { &mut *(arg as *mut Sched<SimHost>) };
    sched.delay(1000);
    0
}

struct KillJoinCtx<'a> {
    sched: *mut Sched<SimHost>,
    target: Cid,
    result: &'a std::cell::Cell<Option<Result<i32, Status>>>,
}

extern "C" fn kill_joiner(arg: usize) -> i32 {
    let jc = unsafe { &*(arg as *const KillJoinCtx) };
    let r = unsafe { (*jc.sched).join(jc.target) };
    jc.result.set(Some(r));
    0
}

#[test]
fn kill_a_sleeper() {
    let mut sched: Sched<SimHost> = Sched::new(SimHost::new());
    sched.setup();
    let sched_ptr = &mut sched as *mut Sched<SimHost> as usize;

    let t = sched.create(sleepy_task, sched_ptr).unwrap();
    sched.run_once(); // one loop iteration: T calls delay(1000) and blocks

    sched.kill(t).unwrap();

    // The joiner attaches to T's joiners queue *after* the kill, while
    // T is still Zombie-but-unreaped in the delay heap, so it exercises
    // the late-joiner path rather than kill's own immediate sweep.
    let result = std::cell::Cell::new(None);
    let jc = KillJoinCtx {
        sched: &mut sched as *mut Sched<SimHost>,
        target: t,
        result: &result,
    };
    let jc_ptr = &jc as *const KillJoinCtx as usize;
    sched.create(kill_joiner, jc_ptr).unwrap();

    // One epoch promotes T out of the delay heap as a Zombie, a second
    // reaps it and wakes the joiner, a third resumes the joiner itself.
    for _ in 0..3 {
        sched.run_once();
    }

    assert_eq!(result.into_inner(), Some(Err(Status::Killed)));
}

// ---------------------------------------------------------------------
// 4. Semaphore FIFO
// ---------------------------------------------------------------------

struct SemCtx {
    sched: Sched<SimHost>,
    sem: Semaphore,
    order: std::vec::Vec<&'static str>,
}

extern "C" fn sem_waiter_1(arg: usize) -> i32 {
    let ctx = unsafe { &mut *(arg as *mut SemCtx) };
    ctx.sem.wait(&mut ctx.sched);
    ctx.order.push("W1");
    0
}
extern "C" fn sem_waiter_2(arg: usize) -> i32 {
    let ctx = unsafe { &mut *(arg as *mut SemCtx) };
    ctx.sem.wait(&mut ctx.sched);
    ctx.order.push("W2");
    0
}
extern "C" fn sem_waiter_3(arg: usize) -> i32 {
    let ctx = unsafe { &mut *(arg as *mut SemCtx) };
    ctx.sem.wait(&mut ctx.sched);
    ctx.order.push("W3");
    0
}

#[test]
fn semaphore_fifo_wakeup() {
    let mut ctx = SemCtx {
        sched: Sched::new(SimHost::new()),
        sem: Semaphore::new(0),
        order: std::vec::Vec::new(),
    };
    ctx.sched.setup();
    let ptr = &mut ctx as *mut SemCtx as usize;

    ctx.sched.create(sem_waiter_1, ptr).unwrap();
    ctx.sched.create(sem_waiter_2, ptr).unwrap();
    ctx.sched.create(sem_waiter_3, ptr).unwrap();
    ctx.sched.run_once(); // all three block on the semaphore

    assert_eq!(ctx.sem.count(), 0);
    ctx.sem.signal(&mut ctx.sched);
    ctx.sched.run_once();
    assert_eq!(ctx.sem.count(), 0);

    ctx.sem.signal(&mut ctx.sched);
    ctx.sched.run_once();
    assert_eq!(ctx.sem.count(), 0);

    ctx.sem.signal(&mut ctx.sched);
    ctx.sched.run_once();
    assert_eq!(ctx.sem.count(), 0);

    assert_eq!(ctx.order, std::vec!["W1", "W2", "W3"]);
}

// ---------------------------------------------------------------------
// 5. Semaphore destroy
// ---------------------------------------------------------------------

struct FiniCtx {
    sched: Sched<SimHost>,
    sem: Semaphore,
    results: std::vec::Vec<Status>,
}

extern "C" fn fini_waiter(arg: usize) -> i32 {
    let ctx = unsafe { &mut *(arg as *mut FiniCtx) };
    let status = ctx.sem.wait(&mut ctx.sched);
    ctx.results.push(status);
    0
}

#[test]
fn semaphore_destroy_wakes_all_waiters() {
    let mut ctx = FiniCtx {
        sched: Sched::new(SimHost::new()),
        sem: Semaphore::new(0),
        results: std::vec::Vec::new(),
    };
    ctx.sched.setup();
    let ptr = &mut ctx as *mut FiniCtx as usize;

    ctx.sched.create(fini_waiter, ptr).unwrap();
    ctx.sched.create(fini_waiter, ptr).unwrap();
    ctx.sched.run_once();

    ctx.sem.fini(&mut ctx.sched);
    ctx.sched.run_once();

    assert_eq!(ctx.results, std::vec![Status::SemDestroyed, Status::SemDestroyed]);
}

// ---------------------------------------------------------------------
// 6. Exhaustion
// ---------------------------------------------------------------------

extern "C" fn park_forever(arg: usize) -> i32 {
    let sched = unsafe { &mut *(arg as *mut Sched<SimHost>) };
    loop {
        sched.delay(1_000_000);
    }
}

#[test]
fn exhaustion_then_recovery_after_kill() {
    let mut sched: Sched<SimHost> = Sched::new(SimHost::new());
    sched.setup();
    let sched_ptr = &mut sched as *mut Sched<SimHost> as usize;

    let mut ids = std::vec::Vec::new();
    for _ in 0..MAX_TASKS {
        ids.push(sched.create(park_forever, sched_ptr).unwrap());
    }
    assert_eq!(sched.create(park_forever, sched_ptr), Err(Status::ResrcExhausted));

    sched.kill(ids[0]).unwrap();
    sched.run_once();

    assert!(sched.create(park_forever, sched_ptr).is_ok());
}
