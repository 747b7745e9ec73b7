//! AURIX System Timer (STM) and its service request node.

use tock_registers::{
    interfaces::{ReadWriteable, Readable, Writeable},
    register_bitfields, register_structs,
    registers::{ReadOnly, ReadWrite, WriteOnly},
};

use super::{CompareConfig, CompareTimer};

register_bitfields! [u32,
    CMCON [
        MSIZE0 OFFSET(0) NUMBITS(5) [],
        MSTART0 OFFSET(8) NUMBITS(5) [],
        MSIZE1 OFFSET(16) NUMBITS(5) [],
        MSTART1 OFFSET(24) NUMBITS(5) []
    ],
    ICR [
        CMP0EN OFFSET(0) NUMBITS(1) [],
        CMP0IR OFFSET(1) NUMBITS(1) [],
        /// Output selection: STMIR0 or STMIR1.
        CMP0OS OFFSET(2) NUMBITS(1) [],
        CMP1EN OFFSET(4) NUMBITS(1) [],
        CMP1IR OFFSET(5) NUMBITS(1) [],
        CMP1OS OFFSET(6) NUMBITS(1) []
    ],
    ISCR [
        CMP0IRR OFFSET(0) NUMBITS(1) [],
        CMP0IRS OFFSET(1) NUMBITS(1) [],
        CMP1IRR OFFSET(2) NUMBITS(1) [],
        CMP1IRS OFFSET(3) NUMBITS(1) []
    ],
    OCS [
        /// Suspend control: 2 stops the counter while the core is halted.
        SUS OFFSET(24) NUMBITS(4) [],
        SUS_P OFFSET(28) NUMBITS(1) []
    ],
    SRC [
        SRPN OFFSET(0) NUMBITS(8) [],
        SRE OFFSET(10) NUMBITS(1) [],
        TOS OFFSET(11) NUMBITS(3) [],
        CLRR OFFSET(25) NUMBITS(1) []
    ]
];

register_structs! {
    /// STM register block.
    #[allow(non_snake_case)]
    pub StmRegs {
        (0x00 => CLC: ReadWrite<u32>),
        (0x04 => _reserved0),
        (0x08 => ID: ReadOnly<u32>),
        (0x0C => _reserved1),
        (0x10 => TIM0: ReadOnly<u32>),
        (0x14 => TIM1: ReadOnly<u32>),
        (0x18 => TIM2: ReadOnly<u32>),
        (0x1C => TIM3: ReadOnly<u32>),
        (0x20 => TIM4: ReadOnly<u32>),
        (0x24 => TIM5: ReadOnly<u32>),
        (0x28 => TIM6: ReadOnly<u32>),
        (0x2C => CAP: ReadOnly<u32>),
        (0x30 => CMP0: ReadWrite<u32>),
        (0x34 => CMP1: ReadWrite<u32>),
        (0x38 => CMCON: ReadWrite<u32, CMCON::Register>),
        (0x3C => ICR: ReadWrite<u32, ICR::Register>),
        (0x40 => ISCR: WriteOnly<u32, ISCR::Register>),
        (0x44 => _reserved2),
        (0xE8 => OCS: ReadWrite<u32, OCS::Register>),
        (0xEC => @END),
    }
}

/// STM suspend mode that freezes the counter on a debugger halt.
const OCS_SUSPEND_ON_HALT: u32 = 2;

/// One STM module plus the service request register of its compare 0
/// interrupt.
#[derive(Debug)]
pub struct Stm {
    regs: usize,
    src: usize,
    frequency: u32,
}

impl Stm {
    /// # Safety
    ///
    /// `regs` must be the base of an STM register block and `src` its
    /// `SRC_STMxSR0` register, both mapped and owned by the calling core.
    pub const unsafe fn new(regs: usize, src: usize, frequency: u32) -> Self {
        Self {
            regs,
            src,
            frequency,
        }
    }

    #[inline]
    fn regs(&self) -> &StmRegs {
        unsafe { &*(self.regs as *const StmRegs) }
    }

    #[inline]
    fn src(&self) -> &ReadWrite<u32, SRC::Register> {
        unsafe { &*(self.src as *const ReadWrite<u32, SRC::Register>) }
    }
}

impl CompareTimer for Stm {
    fn frequency(&self) -> u32 {
        self.frequency
    }

    fn now(&self) -> u32 {
        self.regs().TIM0.get()
    }

    fn init_compare(&mut self, config: &CompareConfig) {
        debug_assert_eq!(config.comparator, 0, "only comparator 0 is wired");
        let regs = self.regs();
        regs.ICR.modify(ICR::CMP0EN::CLEAR);
        // Compare all 32 bits of TIM0.
        regs.CMCON.modify(CMCON::MSIZE0.val(31) + CMCON::MSTART0.val(0));
        regs.CMP0.set(regs.TIM0.get().wrapping_add(config.ticks));

        self.src().write(
            SRC::SRPN.val(config.trigger_priority as u32)
                + SRC::TOS.val(config.type_of_service as u32)
                + SRC::CLRR::SET
                + SRC::SRE::SET,
        );

        let regs = self.regs();
        regs.ISCR.write(ISCR::CMP0IRR::SET);
        regs.ICR.modify(ICR::CMP0OS::CLEAR + ICR::CMP0EN::SET);
    }

    fn compare(&self) -> u32 {
        self.regs().CMP0.get()
    }

    fn increase_compare(&mut self, ticks: u32) {
        let regs = self.regs();
        regs.CMP0.set(regs.CMP0.get().wrapping_add(ticks));
    }

    fn clear_match(&mut self) {
        self.regs().ISCR.write(ISCR::CMP0IRR::SET);
    }

    fn enable_ocds_suspend(&mut self) {
        self.regs()
            .OCS
            .write(OCS::SUS_P::SET + OCS::SUS.val(OCS_SUSPEND_ON_HALT));
    }
}
