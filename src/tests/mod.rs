//! Scenario tests on simulated cores.

mod scheduler;
mod task;

use crate::config::DEFAULT_TIME_SLICE_TICKS;
use crate::drivers::timer::CompareTimer;
use crate::hal::cpu::Cpu;
use crate::hal::csa::Link;
use crate::hal::percpu::CoreId;
use crate::hal::regs::CoreReg;
use crate::platform::sim::{SimBoard, SimCore};
use crate::task::{FifoScheduler, TaskRef};

pub(crate) const ENTRY: u32 = 0x8000_1000;

/// Entry address of the `n`-th test task.
pub(crate) fn entry(n: u32) -> u32 {
    ENTRY + n * 0x100
}

/// Top of the stack of the `n`-th test task.
pub(crate) fn stack_top(n: u32) -> u32 {
    0x7000_8000 - n * 0x400
}

pub(crate) fn sim_core(core: CoreId, csas: usize) -> SimCore {
    SimBoard::bring_up(core, csas).unwrap()
}

/// A core running `tasks[0]` with an idle task, the rest queued behind it.
pub(crate) fn started_core(
    core: CoreId,
    csas: usize,
    tasks: usize,
) -> (SimCore, FifoScheduler, TaskRef, Vec<TaskRef>) {
    let mut percpu = sim_core(core, csas);
    let mut sched = FifoScheduler::new(DEFAULT_TIME_SLICE_TICKS);
    let idle = percpu.create_task("idle", entry(0), 0, stack_top(0));
    sched.set_idle_task(idle.clone());

    let tasks: Vec<TaskRef> = (1..=tasks as u32)
        .map(|n| {
            let task = percpu.create_task("worker", entry(n), n, stack_top(n));
            sched.add_task(task.clone());
            task
        })
        .collect();

    let first = sched.pick_first(core).unwrap();
    percpu.start_scheduler(first).unwrap();
    (percpu, sched, idle, tasks)
}

/// Delivers one tick interrupt after a full period.
pub(crate) fn tick(percpu: &mut SimCore, sched: &mut FifoScheduler) {
    let period = percpu.tick_driver().period() as u64;
    percpu.timer_mut().advance(period);
    assert!(percpu.tick_driver().timer().is_pending());
    percpu.tick_interrupt(sched);
}

/// Checks that every CSA of the core is in exactly one place: the free
/// list, the live chain, or the saved chain of one of `tasks`.
pub(crate) fn assert_conserved(percpu: &SimCore, tasks: &[TaskRef]) {
    let cpu = percpu.cpu();
    let mut owner = vec![None; cpu.total_records()];
    let mut claim = |indices: Vec<usize>, who: &str| {
        for index in indices {
            assert!(
                owner[index].is_none(),
                "CSA {index} owned by {} and {who}",
                owner[index].as_deref().unwrap_or_default()
            );
            owner[index] = Some(String::from(who));
        }
    };

    claim(cpu.chain(Link::from_raw(cpu.mfcr(CoreReg::Fcx))), "free list");
    claim(cpu.live_chain(), "live chain");
    for task in tasks {
        let handle = task.top_of_stack();
        if !handle.is_null() {
            claim(cpu.chain(handle.link()), task.name());
        }
    }
    let lost: Vec<usize> = (0..owner.len()).filter(|&i| owner[i].is_none()).collect();
    assert!(lost.is_empty(), "CSAs {lost:?} are owned by nobody");
}

/// Sanity check for the fixture itself.
#[test]
fn fixture_starts_the_first_worker() {
    let (percpu, sched, idle, tasks) = started_core(0, 16, 2);
    let current = percpu.current_task().unwrap();
    assert!(std::sync::Arc::ptr_eq(current, &tasks[0]));
    assert_eq!(percpu.tick_driver().timer().compare(), 100_000);
    assert_eq!(sched.ready_len(0), 1);

    let mut all = vec![idle];
    all.extend(tasks);
    assert_conserved(&percpu, &all);
}
