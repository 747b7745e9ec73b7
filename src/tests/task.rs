//! Task lifecycle on a simulated core: start, yield, exit, reclaim.

use std::sync::Arc;

use super::*;
use crate::config::SYSTEM_PROGRAM_STATUS_WORD;
use crate::error::PortError;
use crate::hal::regs::{ICR, IcrValue};
use crate::task::{ChainHandle, TaskControlBlock, TaskScheduler, TaskState};

fn icr(percpu: &SimCore) -> IcrValue {
    IcrValue::new(percpu.cpu().mfcr(CoreReg::Icr))
}

#[test]
fn first_task_starts_at_its_entry() {
    let (percpu, _sched, _idle, _tasks) = started_core(0, 16, 1);
    let cpu = percpu.cpu();
    assert_eq!(cpu.pc(), entry(1));
    assert_eq!(cpu.a(4), 1);
    assert_eq!(cpu.a(10), stack_top(1));
    assert_eq!(cpu.mfcr(CoreReg::Psw), SYSTEM_PROGRAM_STATUS_WORD);
    assert!(icr(&percpu).is_set(ICR::IE));
    assert_eq!(icr(&percpu).read(ICR::CCPN), 0);
    assert!(cpu.pcxi().is_null());
    assert_eq!(cpu.mfcr(CoreReg::Syscon), 0);
    // idle and the running task's two CSAs went back on restore.
    assert_eq!(cpu.free_records(), 14);
}

#[test]
fn yield_round_trip_restores_every_context_register() {
    let (mut percpu, mut sched, idle, tasks) = started_core(0, 16, 2);
    let (a, b) = (&tasks[0], &tasks[1]);

    {
        let cpu = percpu.cpu_mut();
        cpu.call(entry(1) + 0x40);
        for n in 0..16 {
            cpu.set_d(n, 0xD000 + n as u32);
        }
        for n in [2, 3, 4, 5, 6, 7, 10, 11, 12, 13, 14, 15] {
            cpu.set_a(n, 0xA000 + n as u32);
        }
        cpu.set_pc(entry(1) + 0x88);
    }
    let pcxi_before = percpu.cpu().pcxi();

    percpu.yield_now(&mut sched);
    assert!(Arc::ptr_eq(percpu.current_task().unwrap(), b));
    assert_eq!(a.state(), TaskState::Ready);
    assert_eq!(b.state(), TaskState::Running);
    assert_eq!(percpu.cpu().pc(), entry(2));
    assert_eq!(percpu.cpu().a(4), 2);
    assert_conserved(&percpu, &[idle.clone(), a.clone(), b.clone()]);

    {
        let cpu = percpu.cpu_mut();
        for n in 0..16 {
            cpu.set_d(n, 0xBAD);
            cpu.set_a(n, 0xBAD);
        }
    }
    percpu.yield_now(&mut sched);

    assert!(Arc::ptr_eq(percpu.current_task().unwrap(), a));
    let cpu = percpu.cpu();
    for n in 0..16 {
        assert_eq!(cpu.d(n), 0xD000 + n as u32, "D{n}");
    }
    for n in [2, 3, 4, 5, 6, 7, 10, 11, 12, 13, 14, 15] {
        assert_eq!(cpu.a(n), 0xA000 + n as u32, "A{n}");
    }
    assert_eq!(cpu.pc(), entry(1) + 0x88);
    assert_eq!(cpu.pcxi(), pcxi_before);
    assert!(icr(&percpu).is_set(ICR::IE));
    assert_eq!(percpu.stats().switches, 2);
    assert_conserved(&percpu, &[idle.clone(), a.clone(), b.clone()]);
}

#[test]
fn suspended_task_holds_a_lower_context_head() {
    let (mut percpu, mut sched, _idle, tasks) = started_core(0, 16, 2);
    percpu.yield_now(&mut sched);

    let handle = tasks[0].top_of_stack();
    assert!(!handle.is_null());
    let chain = percpu.cpu().chain(handle.link());
    // Lower context from the trap handler, upper context from trap entry.
    assert_eq!(chain.len(), 2);
    assert!(tasks[1].top_of_stack().is_null(), "the running task lends its chain to PCXI");
}

#[test]
fn exit_reclaims_the_whole_chain_from_idle() {
    let (mut percpu, mut sched, idle, tasks) = started_core(0, 16, 1);
    let worker = tasks[0].clone();
    let free_at_start = percpu.cpu().free_records();

    for depth in 1..=3 {
        percpu.cpu_mut().call(entry(1) + depth * 0x10);
    }
    assert_eq!(percpu.cpu().free_records(), free_at_start - 3);

    percpu.exit_current(&mut sched);
    assert!(Arc::ptr_eq(percpu.current_task().unwrap(), &idle));
    assert_eq!(worker.state(), TaskState::Deleted);
    // Three calls, trap entry and the lower context.
    assert_eq!(percpu.cpu().chain(worker.top_of_stack().link()).len(), 5);
    assert_conserved(&percpu, &[idle.clone(), worker.clone()]);

    assert_eq!(percpu.reclaim_deleted(), 1);
    assert!(worker.top_of_stack().is_null());
    assert_eq!(percpu.stats().reclaimed_records, 5);
    assert_eq!(percpu.stats().reclaimed_tasks, 1);
    assert_eq!(percpu.cpu().free_records(), 16);
    assert_conserved(&percpu, &[idle, worker]);

    assert_eq!(percpu.reclaim_deleted(), 0);
}

#[test]
fn deleted_ready_task_is_skipped_and_reclaimed() {
    let (mut percpu, mut sched, idle, tasks) = started_core(0, 16, 2);
    let (a, b) = (tasks[0].clone(), tasks[1].clone());

    percpu.delete_task(b.clone());
    percpu.yield_now(&mut sched);
    assert!(Arc::ptr_eq(percpu.current_task().unwrap(), &a), "b is never resumed");

    assert_eq!(percpu.reclaim_deleted(), 1);
    assert!(b.top_of_stack().is_null());
    assert_conserved(&percpu, &[idle, a, b]);
}

#[test]
#[should_panic(expected = "is running")]
fn deleting_the_running_task_directly_is_refused() {
    let (percpu, _sched, _idle, tasks) = started_core(0, 16, 1);
    percpu.delete_task(tasks[0].clone());
}

#[test]
#[should_panic(expected = "reclaiming itself")]
fn a_task_cannot_reclaim_its_own_chain() {
    let (percpu, _sched, _idle, tasks) = started_core(0, 16, 1);
    tasks[0].set_state(TaskState::Deleted);
    percpu.defer_reclaim(tasks[0].clone());
    let mut percpu = percpu;
    percpu.reclaim_deleted();
}

#[test]
#[should_panic(expected = "unimplemented system call 7")]
fn unknown_system_call_is_fatal() {
    let (mut percpu, mut sched, _idle, _tasks) = started_core(0, 16, 1);
    percpu.cpu_mut().enter_trap();
    percpu.cpu_mut().svlcx();
    percpu.trap_yield(&mut sched, 7);
}

#[test]
fn scheduler_start_errors_are_recoverable() {
    let (mut percpu, _sched, idle, _tasks) = started_core(0, 16, 1);
    let err = percpu.start_scheduler(idle).unwrap_err();
    assert_eq!(
        err.downcast_ref::<PortError>(),
        Some(&PortError::AlreadyStarted(0))
    );

    let mut fresh = sim_core(1, 8);
    let empty = Arc::new(TaskControlBlock::new("empty", 1, ChainHandle::NULL));
    let err = fresh.start_scheduler(empty.clone()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<PortError>(),
        Some(&PortError::NoInitialContext(empty.id()))
    );
    assert!(!fresh.is_started());
}

#[test]
fn zero_tick_period_is_rejected() {
    use crate::drivers::timer::TypeOfService;
    use crate::drivers::timer::sim::SimStm;
    use crate::hal::percpu::PerCpu;
    use crate::hal::sim::SimCpu;

    let cpu = SimCpu::new(0, 0xD000_4000, 8).unwrap();
    let mut percpu = PerCpu::new(cpu, SimStm::new(500), TypeOfService::Cpu0);
    let task = percpu.create_task("t", entry(1), 0, stack_top(1));
    let err = percpu.start_scheduler(task.clone()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<PortError>(),
        Some(&PortError::InvalidTickPeriod)
    );
    assert!(!task.top_of_stack().is_null(), "nothing was consumed");
}

#[test]
fn scheduler_sees_the_outgoing_task_already_ready() {
    struct Observer {
        seen: Option<TaskState>,
        next: TaskRef,
    }
    impl TaskScheduler for Observer {
        fn select_next_task(&mut self, _core: CoreId, current: &TaskRef) -> TaskRef {
            self.seen = Some(current.state());
            self.next.clone()
        }
        fn increment_tick(&mut self, _core: CoreId) -> bool {
            false
        }
    }

    let (mut percpu, _sched, idle, _tasks) = started_core(0, 16, 1);
    let mut observer = Observer { seen: None, next: idle };
    percpu.yield_now(&mut observer);
    assert_eq!(observer.seen, Some(TaskState::Ready));
    percpu.end_scheduler();
}
