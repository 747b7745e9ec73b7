//! Host demo: two simulated TC39x cores ticking, switching and reclaiming.

#[macro_use]
extern crate log;

use std::io::Write;

use tricore_port::config::DEFAULT_TIME_SLICE_TICKS;
use tricore_port::platform::Board;
use tricore_port::platform::sim::{SimBoard, SimCore};
use tricore_port::task::{FifoScheduler, StaticMemoryProvider, StaticStacks, TaskState};
use tricore_port::{CpuTable, PortResult, TaskRef, console, kprintln};

const DEMO_CORES: [usize; 2] = [0, 6];
const WORKERS: u32 = 3;
const TICKS: u32 = 60;

const IDLE_ENTRY: u32 = 0x8000_0100;
const WORKER_ENTRY: u32 = 0x8000_1000;
const WORKER_STACKS: u32 = 0x7000_8000;

fn stdout(s: &str) {
    let _ = std::io::stdout().write_all(s.as_bytes());
}

fn bring_up(
    core: usize,
    sched: &mut FifoScheduler,
    stacks: &StaticStacks,
) -> PortResult<(SimCore, Vec<TaskRef>)> {
    let mut percpu = SimBoard::bring_up(core, SimBoard::CSA_COUNT)?;

    let idle_memory = stacks.idle_task_memory(core)?;
    let idle = percpu.create_task("idle", IDLE_ENTRY, 0, idle_memory.top);
    sched.set_idle_task(idle);

    let workers: Vec<TaskRef> = (0..WORKERS)
        .map(|n| {
            let top = WORKER_STACKS - (core as u32 * WORKERS + n) * 0x800;
            let task = percpu.create_task("worker", WORKER_ENTRY + n * 0x100, n, top);
            sched.add_task(task.clone());
            task
        })
        .collect();

    let first = sched
        .pick_first(core)
        .ok_or_else(|| anyhow::anyhow!("core {core}: nothing to run"))?;
    percpu.start_scheduler(first)?;
    Ok((percpu, workers))
}

fn run_tick(percpu: &mut SimCore, sched: &mut FifoScheduler) {
    let period = percpu.tick_driver().period() as u64;
    percpu.timer_mut().advance(period);
    while percpu.tick_driver().timer().is_pending() {
        percpu.tick_interrupt(sched);
    }
}

fn main() -> PortResult<()> {
    console::set_output(stdout)?;
    console::init_logger()?;
    if log::max_level() == log::LevelFilter::Off {
        log::set_max_level(log::LevelFilter::Info);
    }
    info!(
        "{}: {} scheduler, slice of {DEFAULT_TIME_SLICE_TICKS} ticks",
        SimBoard::NAME,
        FifoScheduler::scheduler_name()
    );

    let stacks = StaticStacks::new(SimBoard::STATIC_STACK_BASE);
    let mut sched = FifoScheduler::new(DEFAULT_TIME_SLICE_TICKS);
    let mut table = CpuTable::new();
    let mut workers = Vec::new();
    for core in DEMO_CORES {
        let (percpu, tasks) = bring_up(core, &mut sched, &stacks)?;
        table.insert(percpu)?;
        workers.extend(tasks);
    }

    for tick in 0..TICKS {
        for core in DEMO_CORES {
            let percpu = table.get_mut(core)?;
            run_tick(percpu, &mut sched);

            // Core 6 loses a worker every 15 ticks; core 0 keeps its own.
            let current = percpu.current_task().cloned();
            if core == 6 && tick % 15 == 14 {
                if let Some(task) = current.filter(|t| t.name() == "worker") {
                    info!("core {core}: worker {} exits", task.id());
                    percpu.exit_current(&mut sched);
                }
            }
            if percpu
                .current_task()
                .is_some_and(|t| t.name() == "idle")
            {
                percpu.reclaim_deleted();
            }
        }
    }

    for core in DEMO_CORES {
        let percpu = table.get_mut(core)?;
        percpu.reclaim_deleted();
        let cpu = percpu.cpu();
        kprintln!(
            "core {core}: {:?}, {} of {} CSAs free",
            percpu.stats(),
            cpu.free_records(),
            cpu.total_records()
        );
    }
    let deleted = workers
        .iter()
        .filter(|t| t.state() == TaskState::Deleted)
        .count();
    kprintln!("{deleted} of {} workers exited", workers.len());
    Ok(())
}
