//! Unit tests for context building and chain reclamation.

use crate::config::{INITIAL_PCXI_UPPER_CONTEXT_WORD, SYSTEM_PROGRAM_STATUS_WORD};
use crate::hal::cpu::Cpu;
use crate::hal::csa::{FCX_MASK, Link, lower, upper};
use crate::hal::regs::CoreReg;
use crate::platform::sim::{SimBoard, SimCore};

use super::{ChainHandle, TaskState};

fn core(csas: usize) -> SimCore {
    SimBoard::bring_up(0, csas).unwrap()
}

fn fcx(percpu: &SimCore) -> Link {
    Link::from_raw(percpu.cpu().mfcr(CoreReg::Fcx))
}

#[test]
fn initial_context_layout() {
    let mut percpu = core(4);
    let lower_link = fcx(&percpu);
    let upper_link = percpu.cpu().csa(lower_link).link();

    let handle = percpu.initialise_stack(0x7000_1000, 0x8000_2000, 0x1234);
    assert_eq!(handle.link(), lower_link);
    assert_eq!(fcx(&percpu), percpu.cpu().area().link_of(2));
    assert_eq!(percpu.cpu().free_records(), 2);

    let lower_csa = percpu.cpu().csa(lower_link);
    assert_eq!(
        lower_csa[lower::PCXI],
        INITIAL_PCXI_UPPER_CONTEXT_WORD | upper_link.raw()
    );
    assert_eq!(lower_csa[lower::PCXI] & FCX_MASK, upper_link.raw());
    assert_eq!(lower_csa[lower::A11], 0x8000_2000);
    assert_eq!(lower_csa[lower::A4], 0x1234);
    for word in (0..16).filter(|&w| ![lower::PCXI, lower::A11, lower::A4].contains(&w)) {
        assert_eq!(lower_csa[word], 0, "lower word {word}");
    }

    let upper_csa = percpu.cpu().csa(upper_link);
    assert_eq!(upper_csa[upper::PCXI], 0);
    assert_eq!(upper_csa[upper::PSW], SYSTEM_PROGRAM_STATUS_WORD);
    assert_eq!(upper_csa[upper::A10], 0x7000_1000);
    for word in (0..16).filter(|&w| ![upper::PSW, upper::A10].contains(&w)) {
        assert_eq!(upper_csa[word], 0, "upper word {word}");
    }
    assert_eq!(percpu.cpu().chain(handle.link()).len(), 2);
}

#[test]
fn builder_restores_the_callers_mask_state() {
    let mut percpu = core(4);
    let icr_before = percpu.cpu().mfcr(CoreReg::Icr);
    percpu.initialise_stack(0x7000_1000, 0x8000_2000, 0);
    assert_eq!(percpu.cpu().mfcr(CoreReg::Icr), icr_before);
    assert_eq!(percpu.cpu().stats().unmasked_context_writes, 0);
}

#[test]
fn reclaiming_the_null_handle_does_nothing() {
    let mut percpu = core(4);
    let before = fcx(&percpu);
    assert_eq!(percpu.reclaim_chain(ChainHandle::NULL), 0);
    assert_eq!(fcx(&percpu), before);
    assert_eq!(percpu.stats().reclaimed_records, 0);
}

#[test]
fn reclaimed_chain_is_reused_first() {
    let mut percpu = core(6);
    let handle = percpu.initialise_stack(0x7000_1000, 0x8000_2000, 0);
    assert_eq!(percpu.cpu().free_records(), 4);

    assert_eq!(percpu.reclaim_chain(handle), 2);
    assert_eq!(percpu.cpu().free_records(), 6);
    assert_eq!(fcx(&percpu), handle.link());
    // Tag bits are gone from the link words.
    let next = percpu.cpu().csa(handle.link()).link();
    assert_eq!(next, next.untagged());

    let again = percpu.initialise_stack(0x7000_2000, 0x8000_3000, 1);
    assert_eq!(again, handle);
}

#[test]
fn created_task_is_ready_with_its_chain() {
    let mut percpu = core(4);
    let task = percpu.create_task("worker", 0x8000_2000, 5, 0x7000_1000);
    assert_eq!(task.state(), TaskState::Ready);
    assert_eq!(task.core(), 0);
    assert_eq!(task.name(), "worker");
    assert!(!task.top_of_stack().is_null());
    assert!(percpu.current_task().is_none());
}

#[test]
#[should_panic(expected = "invalid task state 7")]
fn unknown_state_byte_is_rejected() {
    let _ = TaskState::from(7);
}
