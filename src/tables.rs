//! Frame-table and page-table entry records.
//!
//! Both tables live inside the arena, so each entry is a fixed 12-byte
//! little-endian record: a flag byte, three bytes of padding, then two
//! `u32` fields.

use bitflags::bitflags;

use crate::constants::*;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FrameFlags: u8 {
        const MAPPED = 1 << 0;
        const PROTECTED = 1 << 1;
        const REFERENCED = 1 << 2;
        const OWNED = 1 << 3;
        const HAS_VPN = 1 << 4;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PteFlags: u8 {
        const VALID = 1 << 0;
        const DIRTY = 1 << 1;
        const SWAPPED = 1 << 2;
    }
}

#[inline]
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[inline]
fn write_u32(bytes: &mut [u8], at: usize, value: u32) {
    bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// Reverse mapping for one physical frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameTableEntry {
    pub mapped: bool,
    pub protected: bool,
    pub referenced: bool,
    /// Process whose page currently occupies the frame
    pub owner: Option<Pid>,
    pub vpn: Option<Vpn>,
}

impl FrameTableEntry {
    pub fn flags(&self) -> FrameFlags {
        let mut flags = FrameFlags::empty();
        flags.set(FrameFlags::MAPPED, self.mapped);
        flags.set(FrameFlags::PROTECTED, self.protected);
        flags.set(FrameFlags::REFERENCED, self.referenced);
        flags.set(FrameFlags::OWNED, self.owner.is_some());
        flags.set(FrameFlags::HAS_VPN, self.vpn.is_some());
        flags
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let flags = FrameFlags::from_bits_truncate(bytes[0]);
        FrameTableEntry {
            mapped: flags.contains(FrameFlags::MAPPED),
            protected: flags.contains(FrameFlags::PROTECTED),
            referenced: flags.contains(FrameFlags::REFERENCED),
            owner: flags
                .contains(FrameFlags::OWNED)
                .then(|| read_u32(bytes, 4)),
            vpn: flags
                .contains(FrameFlags::HAS_VPN)
                .then(|| read_u32(bytes, 8)),
        }
    }

    pub fn encode(&self, bytes: &mut [u8]) {
        bytes[..FTE_SIZE].fill(0);
        bytes[0] = self.flags().bits();
        write_u32(bytes, 4, self.owner.unwrap_or(0));
        write_u32(bytes, 8, self.vpn.unwrap_or(0));
    }
}

/// Forward mapping for one virtual page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageTableEntry {
    pub valid: bool,
    pub dirty: bool,
    /// Only meaningful while `valid`
    pub pfn: Pfn,
    pub swap: Option<SwapSlot>,
}

impl PageTableEntry {
    pub fn flags(&self) -> PteFlags {
        let mut flags = PteFlags::empty();
        flags.set(PteFlags::VALID, self.valid);
        flags.set(PteFlags::DIRTY, self.dirty);
        flags.set(PteFlags::SWAPPED, self.swap.is_some());
        flags
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let flags = PteFlags::from_bits_truncate(bytes[0]);
        PageTableEntry {
            valid: flags.contains(PteFlags::VALID),
            dirty: flags.contains(PteFlags::DIRTY),
            pfn: read_u32(bytes, 4),
            swap: flags
                .contains(PteFlags::SWAPPED)
                .then(|| read_u32(bytes, 8)),
        }
    }

    pub fn encode(&self, bytes: &mut [u8]) {
        bytes[..PTE_SIZE].fill(0);
        bytes[0] = self.flags().bits();
        write_u32(bytes, 4, self.pfn);
        write_u32(bytes, 8, self.swap.unwrap_or(0));
    }
}
