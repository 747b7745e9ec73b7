//! A software TriCore core.
//!
//! [`SimCpu`] models what the port relies on: the control registers, a
//! register file, one [`CsaArea`] threaded as the free list, and the
//! context save/restore instructions. Saves take the `FCX` head and push it
//! onto `PCXI`; restores pop the `PCXI` head back onto `FCX`. Running out of
//! CSAs, underflowing the call stack or restoring the wrong context type
//! panics the way the corresponding hardware trap would stop the core.
//!
//! Every write to `FCX`, `LCX` or `PCXI` is audited: one made while kernel
//! interrupts are unmasked is counted in [`SimStats::unmasked_context_writes`].
//!
//! The local interrupt control of [`super::irq`] acts on the core the
//! calling thread last created or entered a trap or interrupt on.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use super::cpu::Cpu;
use super::csa::{Csa, CsaArea, Link, NUM_WORDS_IN_CSA, lower, upper};
use super::irq::{LocalIrqOps, install_local_irq_ops, is_masked};
use super::percpu::CoreId;
use super::regs::{CoreReg, ICR, IcrValue, PCXI, PSW, PcxiValue, PswValue};
use crate::config::SYSTEM_PROGRAM_STATUS_WORD;
use crate::error::PortResult;

/// Counters kept by the simulated core.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimStats {
    pub dsyncs: u64,
    pub isyncs: u64,
    pub context_saves: u64,
    pub context_restores: u64,
    pub unmasked_context_writes: u64,
}

std::thread_local! {
    static LOCAL_ICR: RefCell<Option<Rc<Cell<u32>>>> = const { RefCell::new(None) };
}

fn local_disable() -> bool {
    LOCAL_ICR.with_borrow(|icr| {
        icr.as_ref().is_some_and(|icr| {
            let mut value = IcrValue::new(icr.get());
            let was_enabled = value.is_set(ICR::IE);
            value.modify(ICR::IE::CLEAR);
            icr.set(value.get());
            was_enabled
        })
    })
}

fn local_enable() {
    LOCAL_ICR.with_borrow(|icr| {
        if let Some(icr) = icr {
            let mut value = IcrValue::new(icr.get());
            value.modify(ICR::IE::SET);
            icr.set(value.get());
        }
    });
}

/// Local interrupt control backed by the simulated cores.
pub const SIM_LOCAL_IRQ: LocalIrqOps = LocalIrqOps {
    disable: local_disable,
    enable: local_enable,
};

/// A simulated TriCore core with its own CSA area.
pub struct SimCpu {
    core_id: CoreId,
    area: CsaArea,
    pcxi: u32,
    psw: u32,
    pc: u32,
    syscon: u32,
    icr: Rc<Cell<u32>>,
    fcx: u32,
    lcx: u32,
    d: [u32; 16],
    a: [u32; 16],
    stats: SimStats,
}

impl SimCpu {
    /// Creates a core whose free list holds `count` CSAs starting at `base`,
    /// with interrupts enabled at priority 0, as start-up code leaves it.
    pub fn new(core_id: CoreId, base: u32, count: usize) -> PortResult<Self> {
        let mut area = CsaArea::new(base, count)?;
        let (head, tail) = area.thread_free_list();
        let mut icr = IcrValue::new(0);
        icr.modify(ICR::IE::SET);
        // Whichever core comes up first installs it for every thread.
        install_local_irq_ops(SIM_LOCAL_IRQ);

        let cpu = Self {
            core_id,
            area,
            pcxi: 0,
            psw: SYSTEM_PROGRAM_STATUS_WORD,
            pc: 0,
            syscon: 0,
            icr: Rc::new(Cell::new(icr.get())),
            fcx: head.raw(),
            lcx: tail.raw(),
            d: [0; 16],
            a: [0; 16],
            stats: SimStats::default(),
        };
        cpu.make_local();
        Ok(cpu)
    }

    /// Points the calling thread's local interrupt control at this core.
    pub fn make_local(&self) {
        let icr = self.icr.clone();
        LOCAL_ICR.with_borrow_mut(|local| *local = Some(icr));
    }

    fn icr(&self) -> IcrValue {
        IcrValue::new(self.icr.get())
    }

    pub fn area(&self) -> &CsaArea {
        &self.area
    }

    pub fn stats(&self) -> SimStats {
        self.stats
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    pub fn a(&self, n: usize) -> u32 {
        self.a[n]
    }

    pub fn set_a(&mut self, n: usize, value: u32) {
        self.a[n] = value;
    }

    pub fn d(&self, n: usize) -> u32 {
        self.d[n]
    }

    pub fn set_d(&mut self, n: usize, value: u32) {
        self.d[n] = value;
    }

    pub fn pcxi(&self) -> Link {
        Link::from_raw(self.pcxi)
    }

    pub fn total_records(&self) -> usize {
        self.area.len()
    }

    /// Number of CSAs on the free list.
    pub fn free_records(&self) -> usize {
        self.area.walk(Link::from_raw(self.fcx)).len()
    }

    /// CSAs reachable from `PCXI`: the chain the running code owns.
    pub fn live_chain(&self) -> Vec<usize> {
        self.area.walk(Link::from_raw(self.pcxi))
    }

    /// CSAs reachable from `head`.
    pub fn chain(&self, head: Link) -> Vec<usize> {
        self.area.walk(head)
    }

    /// `call`: saves the upper context and jumps to `target`; `A11` holds
    /// the return address.
    pub fn call(&mut self, target: u32) {
        self.save_context(true);
        self.a[11] = self.pc;
        self.pc = target;
    }

    fn upper_words(&self) -> [u32; NUM_WORDS_IN_CSA] {
        let mut w = [0; NUM_WORDS_IN_CSA];
        w[upper::PSW] = self.psw;
        w[upper::A10] = self.a[10];
        w[upper::A11] = self.a[11];
        w[upper::D8..upper::D8 + 4].copy_from_slice(&self.d[8..12]);
        w[upper::A12..upper::A12 + 4].copy_from_slice(&self.a[12..16]);
        w[upper::D12..upper::D12 + 4].copy_from_slice(&self.d[12..16]);
        w
    }

    fn load_upper(&mut self, w: &[u32; NUM_WORDS_IN_CSA]) {
        self.psw = w[upper::PSW];
        self.a[10] = w[upper::A10];
        self.a[11] = w[upper::A11];
        self.d[8..12].copy_from_slice(&w[upper::D8..upper::D8 + 4]);
        self.a[12..16].copy_from_slice(&w[upper::A12..upper::A12 + 4]);
        self.d[12..16].copy_from_slice(&w[upper::D12..upper::D12 + 4]);
    }

    fn lower_words(&self) -> [u32; NUM_WORDS_IN_CSA] {
        let mut w = [0; NUM_WORDS_IN_CSA];
        w[lower::A11] = self.a[11];
        w[lower::A2..lower::A2 + 2].copy_from_slice(&self.a[2..4]);
        w[lower::D0..lower::D0 + 4].copy_from_slice(&self.d[0..4]);
        w[lower::A4..lower::A4 + 4].copy_from_slice(&self.a[4..8]);
        w[lower::D4..lower::D4 + 4].copy_from_slice(&self.d[4..8]);
        w
    }

    fn load_lower(&mut self, w: &[u32; NUM_WORDS_IN_CSA]) {
        self.a[11] = w[lower::A11];
        self.a[2..4].copy_from_slice(&w[lower::A2..lower::A2 + 2]);
        self.d[0..4].copy_from_slice(&w[lower::D0..lower::D0 + 4]);
        self.a[4..8].copy_from_slice(&w[lower::A4..lower::A4 + 4]);
        self.d[4..8].copy_from_slice(&w[lower::D4..lower::D4 + 4]);
    }

    /// Takes the free-list head, fills it and pushes it onto `PCXI`.
    fn save_context(&mut self, is_upper: bool) {
        let head = Link::from_raw(self.fcx);
        if head.is_null() {
            self.context_depletion_trap();
        }

        let icr = self.icr();
        let mut tag = PcxiValue::new(0);
        tag.modify(
            PCXI::UL.val(is_upper as u32)
                + PCXI::PIE.val(icr.read(ICR::IE))
                + PCXI::PCPN.val(icr.read(ICR::CCPN)),
        );
        let words = if is_upper {
            self.upper_words()
        } else {
            self.lower_words()
        };

        let core_id = self.core_id;
        let record = self
            .area
            .get_mut(head)
            .unwrap_or_else(|| panic!("core {core_id}: FCX {head:?} outside the CSA area"));
        let next_free = record.link();
        *record = Csa(words);
        record.set_link(Link::from_raw(self.pcxi));

        self.pcxi = head.with_tag(tag.get()).raw();
        self.fcx = next_free.untagged().raw();
        self.stats.context_saves += 1;
    }

    /// Pops the `PCXI` head, loads it and returns it to the free list.
    fn restore_context(&mut self, is_upper: bool) {
        let head = Link::from_raw(self.pcxi);
        if head.is_null() {
            panic!("core {}: call stack underflow (CSU trap)", self.core_id);
        }
        let pcxi = PcxiValue::new(self.pcxi);
        assert_eq!(
            pcxi.read(PCXI::UL) == 1,
            is_upper,
            "core {}: context type trap (CTYP) restoring {head:?}",
            self.core_id
        );

        let core_id = self.core_id;
        let words = self
            .area
            .get(head)
            .unwrap_or_else(|| panic!("core {core_id}: PCXI {head:?} outside the CSA area"))
            .0;
        if is_upper {
            self.load_upper(&words);
        } else {
            self.load_lower(&words);
        }
        self.pcxi = words[0];

        let fcx = Link::from_raw(self.fcx);
        if let Some(record) = self.area.get_mut(head) {
            record.set_link(fcx);
        }
        self.fcx = head.untagged().raw();
        self.stats.context_restores += 1;
    }
}

impl Cpu for SimCpu {
    fn core_id(&self) -> CoreId {
        self.core_id
    }

    fn mfcr(&self, reg: CoreReg) -> u32 {
        match reg {
            CoreReg::Pcxi => self.pcxi,
            CoreReg::Psw => self.psw,
            CoreReg::Pc => self.pc,
            CoreReg::Syscon => self.syscon,
            CoreReg::CoreId => self.core_id as u32,
            CoreReg::Icr => self.icr.get(),
            CoreReg::Fcx => self.fcx,
            CoreReg::Lcx => self.lcx,
        }
    }

    fn mtcr(&mut self, reg: CoreReg, value: u32) {
        if reg.is_context_pointer() && !is_masked(self) {
            self.stats.unmasked_context_writes += 1;
        }
        match reg {
            CoreReg::Pcxi => self.pcxi = value,
            CoreReg::Psw => self.psw = value,
            CoreReg::Pc => self.pc = value,
            CoreReg::Syscon => self.syscon = value,
            CoreReg::CoreId => {}
            CoreReg::Icr => self.icr.set(value),
            CoreReg::Fcx => self.fcx = value,
            CoreReg::Lcx => self.lcx = value,
        }
    }

    fn dsync(&mut self) {
        self.stats.dsyncs += 1;
    }

    fn isync(&mut self) {
        self.stats.isyncs += 1;
    }

    fn disable(&mut self) -> bool {
        let mut icr = self.icr();
        let was_enabled = icr.is_set(ICR::IE);
        icr.modify(ICR::IE::CLEAR);
        self.icr.set(icr.get());
        was_enabled
    }

    fn enable(&mut self) {
        let mut icr = self.icr();
        icr.modify(ICR::IE::SET);
        self.icr.set(icr.get());
    }

    fn csa(&self, link: Link) -> &Csa {
        self.area
            .get(link)
            .unwrap_or_else(|| panic!("core {}: bus error reading {link:?}", self.core_id))
    }

    fn csa_mut(&mut self, link: Link) -> &mut Csa {
        let core_id = self.core_id;
        self.area
            .get_mut(link)
            .unwrap_or_else(|| panic!("core {core_id}: bus error writing {link:?}"))
    }

    fn svlcx(&mut self) {
        self.save_context(false);
    }

    fn rslcx(&mut self) {
        self.restore_context(false);
    }

    fn ret(&mut self) {
        self.pc = self.a[11];
        self.restore_context(true);
    }

    fn enter_trap(&mut self) {
        self.make_local();
        self.save_context(true);
        self.a[11] = self.pc;
        self.disable();
        let mut psw = PswValue::new(self.psw);
        psw.modify(PSW::IO::Supervisor);
        self.psw = psw.get();
    }

    fn enter_interrupt(&mut self, priority: u8) {
        self.make_local();
        self.save_context(true);
        self.a[11] = self.pc;
        let mut icr = self.icr();
        icr.modify(ICR::IE::CLEAR + ICR::CCPN.val(priority as u32));
        self.icr.set(icr.get());
        let mut psw = PswValue::new(self.psw);
        psw.modify(PSW::IO::Supervisor);
        self.psw = psw.get();
    }

    fn rfe(&mut self) {
        let pcxi = PcxiValue::new(self.pcxi);
        self.pc = self.a[11];
        self.restore_context(true);
        let mut icr = self.icr();
        icr.modify(ICR::IE.val(pcxi.read(PCXI::PIE)) + ICR::CCPN.val(pcxi.read(PCXI::PCPN)));
        self.icr.set(icr.get());
    }

    fn context_depletion_trap(&mut self) -> ! {
        panic!(
            "core {}: free context list depleted (FCD trap)",
            self.core_id
        );
    }
}
