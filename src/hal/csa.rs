//! Context Save Areas and the links that chain them.
//!
//! A CSA is a 16-word, 64-byte aligned record. Word 0 of every CSA is a link
//! to the next one: segment in bits 19:16, offset in bits 15:0, so the
//! effective address is `(segment << 28) | (offset << 6)`. Bits above 19 are
//! tag bits (`PCXI.UL`, `PCXI.PIE`, `PCXI.PCPN`) and must be masked off
//! before the link is used as an address.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::error::{PortError, PortResult};

/// Each CSA contains 16 words of data.
pub const NUM_WORDS_IN_CSA: usize = 16;
/// Size and alignment of a CSA in bytes.
pub const CSA_SIZE: usize = NUM_WORDS_IN_CSA * 4;
/// Address bits of a link word.
pub const FCX_MASK: u32 = 0x000F_FFFF;

/// Word indices of an upper (caller) context.
pub mod upper {
    pub const PCXI: usize = 0;
    pub const PSW: usize = 1;
    /// Stack pointer.
    pub const A10: usize = 2;
    /// Return address.
    pub const A11: usize = 3;
    pub const D8: usize = 4;
    pub const A12: usize = 8;
    pub const D12: usize = 12;
}

/// Word indices of a lower (callee) context.
pub mod lower {
    pub const PCXI: usize = 0;
    /// Return address.
    pub const A11: usize = 1;
    pub const A2: usize = 2;
    pub const D0: usize = 4;
    /// First parameter register.
    pub const A4: usize = 8;
    pub const D4: usize = 12;
}

/// A CSA link word, possibly carrying tag bits.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Link(u32);

impl Link {
    pub const NULL: Link = Link(0);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The link with every tag bit cleared.
    #[inline]
    pub const fn untagged(self) -> Self {
        Self(self.0 & FCX_MASK)
    }

    /// Whether the link carries no address.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 & FCX_MASK == 0
    }

    /// Effective address of the CSA, ignoring tag bits.
    #[inline]
    pub const fn to_address(self) -> u32 {
        ((self.0 & 0x000F_0000) << 12) | ((self.0 & 0x0000_FFFF) << 6)
    }

    /// Link word for a CSA at `addr`.
    #[inline]
    pub const fn from_address(addr: u32) -> Self {
        Self(((addr & 0xF000_0000) >> 12) | ((addr & 0x003F_FFC0) >> 6))
    }

    /// The same address with the given tag bits added.
    #[inline]
    pub const fn with_tag(self, tag: u32) -> Self {
        Self((self.0 & FCX_MASK) | (tag & !FCX_MASK))
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link({:#010x} -> {:#010x})", self.0, self.to_address())
    }
}

/// One Context Save Area.
#[repr(C, align(64))]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Csa(pub [u32; NUM_WORDS_IN_CSA]);

impl Csa {
    pub const ZERO: Csa = Csa([0; NUM_WORDS_IN_CSA]);

    /// The link word.
    #[inline]
    pub fn link(&self) -> Link {
        Link(self.0[0])
    }

    #[inline]
    pub fn set_link(&mut self, link: Link) {
        self.0[0] = link.raw();
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0 = [0; NUM_WORDS_IN_CSA];
    }
}

impl core::ops::Index<usize> for Csa {
    type Output = u32;

    fn index(&self, word: usize) -> &u32 {
        &self.0[word]
    }
}

impl core::ops::IndexMut<usize> for Csa {
    fn index_mut(&mut self, word: usize) -> &mut u32 {
        &mut self.0[word]
    }
}

impl fmt::Debug for Csa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Csa {{ link: {:?}, words: {:#x?} }}", self.link(), &self.0[1..])
    }
}

/// A contiguous block of CSAs inside one segment: the backing store of a
/// core's free pool.
///
/// Links are plain addresses, so the arena only translates between a link
/// and the index of the record it names.
pub struct CsaArea {
    base: u32,
    records: Box<[Csa]>,
}

impl CsaArea {
    /// Creates an area of `count` zeroed records starting at `base`.
    pub fn new(base: u32, count: usize) -> PortResult<Self> {
        let bytes = count as u64 * CSA_SIZE as u64;
        let end = base as u64 + bytes;
        let same_segment = end > 0 && (base >> 28) as u64 == (end - 1) >> 28;
        // Offsets are 16 bits of 64-byte units: 4 MiB into the segment.
        let in_window = (end - ((base as u64) & 0xF000_0000)) <= 0x0040_0000;
        anyhow::ensure!(
            count > 0
                && base != 0
                && memory_addr::is_aligned(base as usize, CSA_SIZE)
                && same_segment
                && in_window,
            PortError::InvalidCsaArea { base, count }
        );

        Ok(Self {
            base,
            records: alloc::vec![Csa::ZERO; count].into_boxed_slice(),
        })
    }

    #[inline]
    pub fn base(&self) -> u32 {
        self.base
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Link naming record `index`.
    pub fn link_of(&self, index: usize) -> Link {
        assert!(index < self.len(), "CSA index {index} out of range");
        Link::from_address(self.base + (index * CSA_SIZE) as u32)
    }

    /// Index of the record `link` names, if it lies in this area.
    pub fn index_of(&self, link: Link) -> Option<usize> {
        if link.is_null() {
            return None;
        }
        let addr = link.to_address();
        let offset = addr.checked_sub(self.base)? as usize;
        let index = offset / CSA_SIZE;
        (index < self.len()).then_some(index)
    }

    pub fn get(&self, link: Link) -> Option<&Csa> {
        self.index_of(link).map(|i| &self.records[i])
    }

    pub fn get_mut(&mut self, link: Link) -> Option<&mut Csa> {
        self.index_of(link).map(|i| &mut self.records[i])
    }

    /// Threads every record into one list and returns its head and tail,
    /// the way start-up code seeds `FCX` and `LCX`.
    pub fn thread_free_list(&mut self) -> (Link, Link) {
        let links: Vec<Link> = (0..self.len()).map(|i| self.link_of(i)).collect();
        for (i, record) in self.records.iter_mut().enumerate() {
            record.clear();
            record.set_link(links.get(i + 1).copied().unwrap_or(Link::NULL));
        }
        (links[0], links[links.len() - 1])
    }

    /// Indices of the records reachable from `head`, in chain order.
    ///
    /// # Panics
    ///
    /// Panics if the chain leaves the area or loops.
    pub fn walk(&self, head: Link) -> Vec<usize> {
        let mut visited = Vec::new();
        let mut link = head;
        while !link.is_null() {
            let index = self
                .index_of(link)
                .unwrap_or_else(|| panic!("{link:?} points outside the CSA area"));
            assert!(visited.len() < self.len(), "CSA chain from {head:?} loops");
            visited.push(index);
            link = self.records[index].link();
        }
        visited
    }
}

impl fmt::Debug for CsaArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsaArea")
            .field("base", &format_args!("{:#010x}", self.base))
            .field("len", &self.len())
            .finish()
    }
}
