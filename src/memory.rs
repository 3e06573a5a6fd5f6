use crate::config::Geometry;
use crate::constants::*;
use crate::tables::{FrameTableEntry, PageTableEntry};

/// Physical memory: a flat byte arena split into frames.
///
/// The frame table and every page table are stored in the arena itself and
/// are reached through the index-based accessors below.
pub struct PhysicalMemory {
    data: Box<[u8]>,
    geometry: Geometry,
}

impl PhysicalMemory {
    /// Create a new physical memory initialized to all zeros
    pub fn new(geometry: &Geometry) -> Self {
        PhysicalMemory {
            data: vec![0u8; geometry.mem_size].into_boxed_slice(),
            geometry: *geometry,
        }
    }

    #[inline]
    pub fn num_frames(&self) -> u32 {
        self.geometry.num_frames
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.geometry.page_size
    }

    /// Read a byte from physical memory
    #[inline]
    pub fn read(&self, address: usize) -> u8 {
        self.data[address]
    }

    /// Write a byte to physical memory
    #[inline]
    pub fn write(&mut self, address: usize, value: u8) {
        self.data[address] = value;
    }

    fn frame_range(&self, pfn: Pfn) -> std::ops::Range<usize> {
        debug_assert!(pfn < self.geometry.num_frames, "frame {} out of range", pfn);
        let base = self.geometry.frame_to_address(pfn);
        base..base + self.geometry.page_size
    }

    pub fn frame(&self, pfn: Pfn) -> &[u8] {
        let range = self.frame_range(pfn);
        &self.data[range]
    }

    pub fn frame_mut(&mut self, pfn: Pfn) -> &mut [u8] {
        let range = self.frame_range(pfn);
        &mut self.data[range]
    }

    pub fn zero_frame(&mut self, pfn: Pfn) {
        self.frame_mut(pfn).fill(0);
    }

    /// Byte range of a frame-table entry inside frame 0
    fn fte_range(&self, pfn: Pfn) -> std::ops::Range<usize> {
        debug_assert!(pfn < self.geometry.num_frames, "frame {} out of range", pfn);
        let base = self.geometry.frame_to_address(FRAME_TABLE_PFN) + pfn as usize * FTE_SIZE;
        base..base + FTE_SIZE
    }

    /// Byte range of a page-table entry inside the page table at `pt_frame`
    fn pte_range(&self, pt_frame: Pfn, vpn: Vpn) -> std::ops::Range<usize> {
        debug_assert!(vpn < self.geometry.num_pages, "page {} out of range", vpn);
        let base = self.geometry.frame_to_address(pt_frame) + vpn as usize * PTE_SIZE;
        base..base + PTE_SIZE
    }

    /// Get a Frame Table entry
    pub fn frame_entry(&self, pfn: Pfn) -> FrameTableEntry {
        FrameTableEntry::decode(&self.data[self.fte_range(pfn)])
    }

    /// Set a Frame Table entry
    pub fn set_frame_entry(&mut self, pfn: Pfn, entry: FrameTableEntry) {
        let range = self.fte_range(pfn);
        entry.encode(&mut self.data[range]);
    }

    pub fn update_frame_entry(&mut self, pfn: Pfn, f: impl FnOnce(&mut FrameTableEntry)) {
        let mut entry = self.frame_entry(pfn);
        f(&mut entry);
        self.set_frame_entry(pfn, entry);
    }

    /// Get a Page Table entry. `pt_frame` is a physical frame number, not a
    /// frame-table index.
    pub fn page_entry(&self, pt_frame: Pfn, vpn: Vpn) -> PageTableEntry {
        PageTableEntry::decode(&self.data[self.pte_range(pt_frame, vpn)])
    }

    /// Set a Page Table entry
    pub fn set_page_entry(&mut self, pt_frame: Pfn, vpn: Vpn, entry: PageTableEntry) {
        let range = self.pte_range(pt_frame, vpn);
        entry.encode(&mut self.data[range]);
    }

    /// Get direct access to the underlying bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
