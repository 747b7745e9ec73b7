//! Tick-driven preemption on simulated cores.

use std::sync::Arc;

use super::*;
use crate::config::ISR_PRIORITY_STM;
use crate::drivers::timer::TypeOfService;
use crate::hal::regs::{ICR, IcrValue};
use crate::task::TaskState;

#[test]
fn switch_happens_on_the_kth_tick() {
    let (mut percpu, mut sched, idle, tasks) = started_core(0, 16, 2);
    let (a, b) = (&tasks[0], &tasks[1]);

    for _ in 1..DEFAULT_TIME_SLICE_TICKS {
        tick(&mut percpu, &mut sched);
        assert!(Arc::ptr_eq(percpu.current_task().unwrap(), a));
    }
    assert_eq!(percpu.stats().switches, 0);

    tick(&mut percpu, &mut sched);
    assert!(Arc::ptr_eq(percpu.current_task().unwrap(), b));
    assert_eq!(a.state(), TaskState::Ready);
    assert_eq!(percpu.stats().switches, 1);
    assert_eq!(percpu.stats().ticks, DEFAULT_TIME_SLICE_TICKS);
    assert_eq!(sched.tick_count(0), DEFAULT_TIME_SLICE_TICKS);

    // The preempted task resumes where the interrupt hit it.
    let interrupted_pc = entry(1);
    for _ in 0..DEFAULT_TIME_SLICE_TICKS {
        tick(&mut percpu, &mut sched);
    }
    assert!(Arc::ptr_eq(percpu.current_task().unwrap(), a));
    assert_eq!(percpu.cpu().pc(), interrupted_pc);
    assert_conserved(&percpu, &[idle, a.clone(), b.clone()]);
}

#[test]
fn interrupt_return_restores_enable_and_priority() {
    let (mut percpu, mut sched, _idle, _tasks) = started_core(0, 16, 2);
    for _ in 0..(3 * DEFAULT_TIME_SLICE_TICKS) {
        tick(&mut percpu, &mut sched);
        let icr = IcrValue::new(percpu.cpu().mfcr(CoreReg::Icr));
        assert!(icr.is_set(ICR::IE));
        assert_eq!(icr.read(ICR::CCPN), 0);
    }
}

#[test]
fn tick_handler_runs_in_its_interrupt_frame() {
    let (mut percpu, mut sched, _idle, _tasks) = started_core(0, 16, 1);
    let period = percpu.tick_driver().period() as u64;
    percpu.timer_mut().advance(period);

    percpu.interrupt_frame(ISR_PRIORITY_STM, |this| {
        let icr = IcrValue::new(this.cpu().mfcr(CoreReg::Icr));
        assert!(!icr.is_set(ICR::IE));
        assert_eq!(icr.read(ICR::CCPN), ISR_PRIORITY_STM as u32);

        this.tick_isr(&mut sched);

        // The kernel ceiling taken around the tick is dropped again.
        let icr = IcrValue::new(this.cpu().mfcr(CoreReg::Icr));
        assert_eq!(icr.read(ICR::CCPN), ISR_PRIORITY_STM as u32);
    });
    assert_eq!(percpu.stats().ticks, 1);
    assert!(!percpu.tick_driver().timer().is_pending());
}

#[test]
fn late_deadline_fires_after_the_counter_wraps() {
    let (mut percpu, mut sched, _idle, _tasks) = started_core(0, 16, 1);
    let period = percpu.tick_driver().period();

    // The handler runs two and a half periods late.
    percpu.timer_mut().advance(period as u64 * 5 / 2);
    assert!(percpu.tick_driver().timer().is_pending());
    percpu.tick_interrupt(&mut sched);

    let timer = percpu.tick_driver().timer();
    assert_eq!(percpu.stats().late_ticks, 1);
    assert_eq!(percpu.stats().ticks, 1);
    assert_eq!(timer.compare(), 2 * period, "deadlines stay on the period grid");
    assert!(!timer.is_pending());

    // Equality match: nothing fires until the low 32 bits come round again.
    let until_match = timer.compare().wrapping_sub(timer.now()) as u64;
    percpu.timer_mut().advance(until_match - 1);
    assert!(!percpu.tick_driver().timer().is_pending());
    percpu.timer_mut().advance(1);
    assert!(percpu.tick_driver().timer().is_pending());

    percpu.tick_interrupt(&mut sched);
    assert_eq!(percpu.stats().late_ticks, 1);
    assert_eq!(percpu.tick_driver().timer().compare(), 3 * period);

    // Back on schedule.
    tick(&mut percpu, &mut sched);
    assert_eq!(percpu.stats().ticks, 3);
    assert_eq!(percpu.stats().late_ticks, 1);
}

#[test]
fn console_holder_cannot_be_preempted_by_the_tick() {
    let (mut percpu, mut sched, _idle, _tasks) = started_core(0, 16, 1);
    // Another test may have installed the sink first; either way output is on.
    let _ = crate::console::set_output(|_| {});
    let ie = |percpu: &SimCore| IcrValue::new(percpu.cpu().mfcr(CoreReg::Icr)).is_set(ICR::IE);

    {
        let _console = crate::console::print::PRINT_LOCK.lock();
        assert!(!ie(&percpu), "the tick could interrupt the console holder");
    }
    assert!(ie(&percpu));

    let period = percpu.tick_driver().period() as u64;
    percpu.timer_mut().advance(period);
    percpu.interrupt_frame(ISR_PRIORITY_STM, |this| {
        crate::kprintln!("core {}: tick", this.core_id());
        assert!(!ie(this), "printing keeps the handler's interrupts off");
        this.tick_isr(&mut sched);
    });
    assert!(ie(&percpu));
    assert_eq!(percpu.stats().ticks, 1);
}

#[test]
fn tick_is_routed_to_the_owning_core() {
    let core6 = sim_core(6, 8);
    let (percpu, _sched, _idle, _tasks) = started_core(1, 8, 1);
    assert_eq!(core6.tick_driver().period(), 0, "not started");

    let config = percpu.tick_driver().timer().config().copied().unwrap();
    assert_eq!(config.type_of_service, TypeOfService::Cpu1);
    assert_eq!(config.trigger_priority, ISR_PRIORITY_STM);
    assert!(percpu.tick_driver().timer().is_ocds_suspended());

    let (percpu6, _sched6, _idle6, _tasks6) = started_core(6, 8, 1);
    let config = percpu6.tick_driver().timer().config().copied().unwrap();
    assert_eq!(config.type_of_service, TypeOfService::Cpu5);
}

#[test]
fn cores_switch_independently() {
    let mut table = crate::hal::percpu::CpuTable::new();
    let mut sched = FifoScheduler::new(2);
    let mut tasks = Vec::new();

    for core in [0, 6] {
        let mut percpu = sim_core(core, 16);
        let idle = percpu.create_task("idle", entry(0), 0, stack_top(0));
        sched.set_idle_task(idle.clone());
        for n in 1..=2 {
            let task = percpu.create_task("worker", entry(n), n, stack_top(n));
            sched.add_task(task.clone());
            tasks.push(task);
        }
        let first = sched.pick_first(core).unwrap();
        percpu.start_scheduler(first).unwrap();
        table.insert(percpu).unwrap();
        tasks.push(idle);
    }
    assert_eq!(table.len(), 2);
    assert!(table.get(5).is_err());

    for _ in 0..2 {
        tick(table.get_mut(6).unwrap(), &mut sched);
    }
    assert_eq!(table.get(6).unwrap().stats().switches, 1);
    assert_eq!(table.get(0).unwrap().stats().switches, 0);
    assert_eq!(table.get(0).unwrap().current_task().unwrap().core(), 0);
    assert_eq!(table.get(6).unwrap().current_task().unwrap().core(), 6);

    for percpu in table.iter_mut() {
        let mine: Vec<TaskRef> = tasks
            .iter()
            .filter(|t| t.core() == percpu.core_id())
            .cloned()
            .collect();
        assert_conserved(percpu, &mine);
        assert_eq!(percpu.cpu().stats().unmasked_context_writes, 0);
    }
}

#[test]
fn a_core_can_only_be_installed_once() {
    let mut table = crate::hal::percpu::CpuTable::new();
    table.insert(sim_core(2, 4)).unwrap();
    assert!(table.insert(sim_core(2, 4)).is_err());
    assert!(!table.is_empty());
}
