//! Swap device used to hold evicted pages.
//!
//! The paging core never sees slot layout. It hands the store a page
//! table entry, and the store keeps the entry's `swap` field pointing at
//! whatever slot it chose.

use crate::constants::SwapSlot;
use crate::error::SwapError;
use crate::tables::PageTableEntry;

pub trait SwapStore {
    /// Whether the entry has data saved on the device
    fn exists(&self, pte: &PageTableEntry) -> bool;

    /// Copy the entry's saved page into `dst`
    fn read(&mut self, pte: &PageTableEntry, dst: &mut [u8]) -> Result<(), SwapError>;

    /// Save `src` for the entry, assigning a slot if it has none
    fn write(&mut self, pte: &mut PageTableEntry, src: &[u8]) -> Result<(), SwapError>;

    /// Release the entry's slot, if any
    fn free(&mut self, pte: &mut PageTableEntry);
}

/// Swap space kept in host memory
pub struct MemorySwap {
    page_size: usize,
    slots: Vec<Option<Box<[u8]>>>,
    free_slots: Vec<SwapSlot>,
    capacity: Option<usize>,
}

impl MemorySwap {
    /// Unbounded swap for pages of `page_size` bytes
    pub fn new(page_size: usize) -> Self {
        MemorySwap {
            page_size,
            slots: Vec::new(),
            free_slots: Vec::new(),
            capacity: None,
        }
    }

    /// Swap limited to `capacity` slots
    pub fn with_capacity(page_size: usize, capacity: usize) -> Self {
        MemorySwap {
            capacity: Some(capacity),
            ..Self::new(page_size)
        }
    }

    /// Number of slots currently holding a page
    pub fn used_slots(&self) -> usize {
        self.slots.len() - self.free_slots.len()
    }

    fn check_len(&self, len: usize) -> Result<(), SwapError> {
        if len != self.page_size {
            return Err(SwapError::BufferSize {
                expected: self.page_size,
                actual: len,
            });
        }
        Ok(())
    }

    fn allocate(&mut self) -> Result<SwapSlot, SwapError> {
        if let Some(slot) = self.free_slots.pop() {
            return Ok(slot);
        }
        if let Some(capacity) = self.capacity {
            if self.slots.len() >= capacity {
                return Err(SwapError::Full { capacity });
            }
        }
        self.slots.push(None);
        Ok((self.slots.len() - 1) as SwapSlot)
    }

    fn occupied(&self, slot: SwapSlot) -> bool {
        matches!(self.slots.get(slot as usize), Some(Some(_)))
    }
}

impl SwapStore for MemorySwap {
    fn exists(&self, pte: &PageTableEntry) -> bool {
        pte.swap.is_some_and(|slot| self.occupied(slot))
    }

    fn read(&mut self, pte: &PageTableEntry, dst: &mut [u8]) -> Result<(), SwapError> {
        self.check_len(dst.len())?;
        let slot = pte.swap.ok_or(SwapError::Unassigned)?;
        match self.slots.get(slot as usize) {
            Some(Some(page)) => {
                dst.copy_from_slice(page);
                Ok(())
            }
            _ => Err(SwapError::EmptySlot(slot)),
        }
    }

    fn write(&mut self, pte: &mut PageTableEntry, src: &[u8]) -> Result<(), SwapError> {
        self.check_len(src.len())?;
        let slot = match pte.swap {
            Some(slot) if self.occupied(slot) => slot,
            _ => self.allocate()?,
        };
        self.slots[slot as usize] = Some(src.into());
        pte.swap = Some(slot);
        Ok(())
    }

    fn free(&mut self, pte: &mut PageTableEntry) {
        if let Some(slot) = pte.swap.take() {
            if let Some(page) = self.slots.get_mut(slot as usize) {
                if page.take().is_some() {
                    self.free_slots.push(slot);
                }
            }
        }
    }
}
