use log::trace;

use crate::config::Geometry;
use crate::constants::*;
use crate::error::{Result, VmError};
use crate::swap::SwapStore;
use crate::vm_manager::VmManager;

/// Represents the decomposed components of a Virtual Address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    pub va: u32,
    pub vpn: Vpn,
    pub offset: u32,
}

impl VirtualAddress {
    /// Split a raw VA into page number (high bits) and offset (low
    /// `offset_bits` bits), rejecting addresses wider than the space.
    pub fn split(va: u32, geometry: &Geometry) -> Result<Self> {
        if geometry.vaddr_bits < 32 && va >> geometry.vaddr_bits != 0 {
            return Err(VmError::AddressOutOfRange {
                addr: va as u64,
                bits: geometry.vaddr_bits,
            });
        }
        Ok(VirtualAddress {
            va,
            vpn: va >> geometry.offset_bits,
            offset: va & geometry.offset_mask(),
        })
    }

    pub fn from_parts(vpn: Vpn, offset: u32, geometry: &Geometry) -> Result<Self> {
        let va = (vpn << geometry.offset_bits) | (offset & geometry.offset_mask());
        Self::split(va, geometry)
    }
}

impl std::fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "VA({:#x}) = (vpn={}, offset={:#x})",
            self.va, self.vpn, self.offset
        )
    }
}

/// A single simulated memory operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write(u8),
}

impl<S: SwapStore> VmManager<S> {
    /// Translate `va` for the current process and perform the access.
    ///
    /// Returns the byte read, or the byte written. An invalid entry is
    /// faulted in first, which may evict another process's page.
    pub fn mem_access(&mut self, va: u32, access: Access) -> Result<u8> {
        let ctx = self.context.ok_or(VmError::NoCurrentProcess)?;
        let addr = VirtualAddress::split(va, &self.geometry)?;

        // the base register is a frame number, read the arena directly
        let mut pte = self.mem.page_entry(ctx.ptbr, addr.vpn);
        if !pte.valid {
            self.page_fault(addr)?;
            self.stats.page_faults += 1;
            pte = self.mem.page_entry(ctx.ptbr, addr.vpn);
        }

        self.mem.update_frame_entry(pte.pfn, |e| e.referenced = true);
        let pa = self.geometry.phys_addr(pte.pfn, addr.offset);
        self.stats.accesses += 1;

        match access {
            Access::Read => {
                self.stats.reads += 1;
                let value = self.mem.read(pa);
                trace!("read {} -> PA {:#x} = {:#04x}", addr, pa, value);
                Ok(value)
            }
            Access::Write(value) => {
                self.mem.write(pa, value);
                pte.dirty = true;
                self.mem.set_page_entry(ctx.ptbr, addr.vpn, pte);
                self.stats.writes += 1;
                trace!("write {} -> PA {:#x} = {:#04x}", addr, pa, value);
                Ok(value)
            }
        }
    }

    pub fn read(&mut self, va: u32) -> Result<u8> {
        self.mem_access(va, Access::Read)
    }

    pub fn write(&mut self, va: u32, value: u8) -> Result<u8> {
        self.mem_access(va, Access::Write(value))
    }

    /// Physical address `va` currently maps to, without side effects.
    /// `None` if the page is not resident.
    pub fn translate(&self, va: u32) -> Result<Option<usize>> {
        let ctx = self.context.ok_or(VmError::NoCurrentProcess)?;
        let addr = VirtualAddress::split(va, &self.geometry)?;
        let pte = self.mem.page_entry(ctx.ptbr, addr.vpn);
        Ok(pte
            .valid
            .then(|| self.geometry.phys_addr(pte.pfn, addr.offset)))
    }
}
