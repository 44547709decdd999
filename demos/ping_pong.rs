//! # ping-pong demo firmware
//!
//! Two tasks rendezvous through a pair of semaphores: `ping` hands the
//! ball to `pong`, `pong` hands it back, five rounds total, while a
//! third task just delays to show timed sleep running alongside. A
//! fourth, `supervisor`, joins all three and flips a completion flag
//! the host loop watches for. Demonstrates `create`, `delay`, semaphore
//! `wait`/`signal`, and `join` end to end.
//!
//! Runs against [`cotask::host::SimHost`] rather than real hardware,
//! since this binary is built for the development host.
//!
//! Run with `cargo run --example ping_pong`.

use core::sync::atomic::{AtomicBool, Ordering};

use cotask::host::SimHost;
use cotask::{Cid, Sched, Semaphore};

struct World {
    sched: Sched<SimHost>,
    ping_sem: Semaphore,
    pong_sem: Semaphore,
    ping_id: Option<Cid>,
    pong_id: Option<Cid>,
    watchdog_id: Option<Cid>,
}

static mut WORLD: Option<World> = None;
static DONE: AtomicBool = AtomicBool::new(false);

fn world() -> &'static mut World {
    unsafe { WORLD.as_mut().expect("world not initialized") }
}

extern "C" fn ping_task(_arg: usize) -> i32 {
    let w = world();
    for round in 1..=5u32 {
        w.ping_sem.wait(&mut w.sched);
        log::info!("ping: got the ball, round {round}");
        w.sched.delay(10);
        w.pong_sem.signal(&mut w.sched);
    }
    0
}

extern "C" fn pong_task(_arg: usize) -> i32 {
    let w = world();
    w.ping_sem.signal(&mut w.sched); // kick off round 1
    for round in 1..=5u32 {
        w.pong_sem.wait(&mut w.sched);
        log::info!("pong: returned the ball, round {round}");
        w.sched.delay(10);
        if round < 5 {
            w.ping_sem.signal(&mut w.sched);
        }
    }
    0
}

extern "C" fn watchdog_task(_arg: usize) -> i32 {
    let w = world();
    w.sched.delay(500);
    log::info!("watchdog: still alive after 500ms");
    0
}

extern "C" fn supervisor_task(_arg: usize) -> i32 {
    let w = world();
    let ping = w.ping_id.expect("ping created before supervisor");
    let pong = w.pong_id.expect("pong created before supervisor");
    let watchdog = w.watchdog_id.expect("watchdog created before supervisor");
    let _ = w.sched.join(ping);
    let _ = w.sched.join(pong);
    let _ = w.sched.join(watchdog);
    DONE.store(true, Ordering::Release);
    0
}

fn main() {
    env_logger::init();

    unsafe {
        WORLD = Some(World {
            sched: Sched::new(SimHost::new()),
            ping_sem: Semaphore::new(0),
            pong_sem: Semaphore::new(0),
            ping_id: None,
            pong_id: None,
            watchdog_id: None,
        });
    }
    let w = world();
    w.sched.setup();

    w.ping_id = Some(w.sched.create(ping_task, 0).expect("ping task"));
    w.pong_id = Some(w.sched.create(pong_task, 0).expect("pong task"));
    w.watchdog_id = Some(w.sched.create(watchdog_task, 0).expect("watchdog task"));
    w.sched.create(supervisor_task, 0).expect("supervisor task");

    while !DONE.load(Ordering::Acquire) {
        w.sched.run_once();
    }
    log::info!("demo complete");
}
