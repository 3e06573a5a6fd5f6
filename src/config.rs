use std::fmt;

use clap::ValueEnum;

use crate::constants::*;
use crate::error::ConfigError;
use crate::stats::AccessCosts;

/// Which eviction algorithm the frame allocator uses once memory is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReplacementPolicy {
    Random,
    #[default]
    #[value(name = "clock", aliases = ["clocksweep", "clock-sweep"])]
    ClockSweep,
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacementPolicy::Random => write!(f, "random"),
            ReplacementPolicy::ClockSweep => write!(f, "clock-sweep"),
        }
    }
}

/// Session-start parameters, fixed for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    pub paddr_bits: u32,
    pub vaddr_bits: u32,
    pub offset_bits: u32,
    pub policy: ReplacementPolicy,
    /// Seed for the random policy's coin flips
    pub seed: u64,
    pub costs: AccessCosts,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            paddr_bits: DEFAULT_PADDR_BITS,
            vaddr_bits: DEFAULT_VADDR_BITS,
            offset_bits: DEFAULT_OFFSET_BITS,
            policy: ReplacementPolicy::default(),
            seed: 0,
            costs: AccessCosts::default(),
        }
    }
}

impl SimConfig {
    pub fn new(paddr_bits: u32, vaddr_bits: u32, offset_bits: u32) -> Self {
        SimConfig {
            paddr_bits,
            vaddr_bits,
            offset_bits,
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: ReplacementPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate the address widths and derive the memory layout.
    pub fn geometry(&self) -> Result<Geometry, ConfigError> {
        let offset = self.offset_bits;
        if offset == 0 {
            return Err(ConfigError::ZeroOffset);
        }
        if self.vaddr_bits > MAX_VADDR_BITS {
            return Err(ConfigError::AddressTooWide {
                width: self.vaddr_bits,
                max: MAX_VADDR_BITS,
                kind: "virtual",
            });
        }
        if self.paddr_bits > MAX_PADDR_BITS {
            return Err(ConfigError::AddressTooWide {
                width: self.paddr_bits,
                max: MAX_PADDR_BITS,
                kind: "physical",
            });
        }
        if offset >= self.paddr_bits {
            return Err(ConfigError::OffsetTooWide {
                offset,
                width: self.paddr_bits,
                kind: "physical",
            });
        }
        if offset >= self.vaddr_bits {
            return Err(ConfigError::OffsetTooWide {
                offset,
                width: self.vaddr_bits,
                kind: "virtual",
            });
        }

        let page_size = 1usize << offset;
        // offset < paddr_bits, so there are always at least two frames
        let num_frames = 1u32 << (self.paddr_bits - offset);
        // vaddr_bits <= 32 and offset >= 1, so this shift stays below 32
        let num_pages = 1u32 << (self.vaddr_bits - offset);

        let ft_bytes = num_frames as usize * FTE_SIZE;
        if ft_bytes > page_size {
            return Err(ConfigError::FrameTableOverflow {
                needed: ft_bytes,
                page_size,
            });
        }
        let pt_bytes = num_pages as usize * PTE_SIZE;
        if pt_bytes > page_size {
            return Err(ConfigError::PageTableOverflow {
                needed: pt_bytes,
                page_size,
            });
        }

        Ok(Geometry {
            paddr_bits: self.paddr_bits,
            vaddr_bits: self.vaddr_bits,
            offset_bits: offset,
            page_size,
            mem_size: 1usize << self.paddr_bits,
            num_frames,
            num_pages,
        })
    }
}

/// Derived sizes of a validated configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub paddr_bits: u32,
    pub vaddr_bits: u32,
    pub offset_bits: u32,
    pub page_size: usize,
    pub mem_size: usize,
    pub num_frames: u32,
    pub num_pages: u32,
}

impl Geometry {
    #[inline]
    pub fn offset_mask(&self) -> u32 {
        (1u32 << self.offset_bits) - 1
    }

    /// First physical address of a frame
    #[inline]
    pub fn frame_to_address(&self, pfn: Pfn) -> usize {
        (pfn as usize) << self.offset_bits
    }

    /// `(pfn << offset_bits) | offset`
    #[inline]
    pub fn phys_addr(&self, pfn: Pfn, offset: u32) -> usize {
        self.frame_to_address(pfn) | offset as usize
    }
}
