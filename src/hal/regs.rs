//! Core special function registers touched by the port.
//!
//! Field layouts follow the TriCore 1.6.2 core architecture. Values are
//! handled as [`LocalRegisterCopy`]s: read with `mfcr`, edit, write back
//! with `mtcr`.

use tock_registers::{LocalRegisterCopy, register_bitfields};

register_bitfields! [u32,
    /// Program Status Word.
    pub PSW [
        /// Call depth counter. `0x7F` with CDE set disables counting.
        CDC OFFSET(0) NUMBITS(7) [],
        CDE OFFSET(7) NUMBITS(1) [],
        /// Global address register write permission.
        GW OFFSET(8) NUMBITS(1) [],
        /// Interrupt stack in use.
        IS OFFSET(9) NUMBITS(1) [],
        IO OFFSET(10) NUMBITS(2) [
            User0 = 0,
            User1 = 1,
            Supervisor = 2
        ],
        /// Protection register set.
        PRS OFFSET(12) NUMBITS(2) [],
        S OFFSET(14) NUMBITS(1) [],
        USB OFFSET(24) NUMBITS(8) []
    ],

    /// Previous Context Information: head of the live CSA chain.
    pub PCXI [
        PCXO OFFSET(0) NUMBITS(16) [],
        PCXS OFFSET(16) NUMBITS(4) [],
        /// Kind of the CSA PCXO/PCXS points at.
        UL OFFSET(20) NUMBITS(1) [
            Lower = 0,
            Upper = 1
        ],
        /// Interrupt enable state to restore on `rfe`.
        PIE OFFSET(21) NUMBITS(1) [],
        /// Priority to restore on `rfe`.
        PCPN OFFSET(22) NUMBITS(8) []
    ],

    /// Interrupt Control Register.
    pub ICR [
        /// Current CPU priority number: the masking ceiling.
        CCPN OFFSET(0) NUMBITS(8) [],
        IE OFFSET(15) NUMBITS(1) [],
        /// Pending interrupt priority number.
        PIPN OFFSET(16) NUMBITS(8) []
    ],

    pub SYSCON [
        FCDSF OFFSET(0) NUMBITS(1) [],
        PROTEN OFFSET(1) NUMBITS(1) [],
        TPROTEN OFFSET(2) NUMBITS(1) []
    ],

    /// Free / limit context pointer (FCX and LCX share the layout).
    pub FCX [
        FCXO OFFSET(0) NUMBITS(16) [],
        FCXS OFFSET(16) NUMBITS(4) []
    ]
];

pub type PswValue = LocalRegisterCopy<u32, PSW::Register>;
pub type PcxiValue = LocalRegisterCopy<u32, PCXI::Register>;
pub type IcrValue = LocalRegisterCopy<u32, ICR::Register>;

/// Core special function registers, by CSFR offset.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreReg {
    Pcxi = 0xFE00,
    Psw = 0xFE04,
    Pc = 0xFE08,
    Syscon = 0xFE14,
    CoreId = 0xFE1C,
    Icr = 0xFE2C,
    Fcx = 0xFE38,
    Lcx = 0xFE3C,
}

impl CoreReg {
    /// Registers the CSA free list and the live chain hang off.
    pub const fn is_context_pointer(self) -> bool {
        matches!(self, Self::Pcxi | Self::Fcx | Self::Lcx)
    }
}
