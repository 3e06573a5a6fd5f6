use std::collections::{BTreeMap, BTreeSet};

use crate::config::{Geometry, SimConfig};
use crate::constants::*;
use crate::error::{Result, VmError};
use crate::memory::PhysicalMemory;
use crate::process::Pcb;
use crate::replacement::Replacer;
use crate::stats::Stats;
use crate::swap::{MemorySwap, SwapStore};
use crate::tables::{FrameTableEntry, PageTableEntry};

/// The page-table base register and the process it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub pid: Pid,
    pub ptbr: Pfn,
}

/// One simulation session.
///
/// Owns physical memory (with the frame table in frame 0), the swap device,
/// the process table, the base register and the counters. Every operation
/// goes through `&mut self`, so a session is driven by a single stepper.
pub struct VmManager<S: SwapStore = MemorySwap> {
    pub(crate) config: SimConfig,
    pub(crate) geometry: Geometry,
    pub(crate) mem: PhysicalMemory,
    pub(crate) swap: S,
    pub(crate) replacer: Replacer,
    pub(crate) processes: BTreeMap<Pid, Pcb>,
    pub(crate) retired: BTreeSet<Pid>,
    pub(crate) context: Option<Context>,
    pub(crate) stats: Stats,
}

impl VmManager<MemorySwap> {
    /// Bring up a session backed by in-memory swap
    pub fn new(config: SimConfig) -> Result<Self> {
        let geometry = config.geometry()?;
        Self::with_swap(config, MemorySwap::new(geometry.page_size))
    }
}

impl<S: SwapStore> VmManager<S> {
    /// Bring up a session backed by the given swap device
    pub fn with_swap(config: SimConfig, swap: S) -> Result<Self> {
        let geometry = config.geometry()?;
        let mut vm = VmManager {
            mem: PhysicalMemory::new(&geometry),
            replacer: Replacer::new(config.policy, config.seed),
            geometry,
            config,
            swap,
            processes: BTreeMap::new(),
            retired: BTreeSet::new(),
            context: None,
            stats: Stats::default(),
        };
        vm.system_init();
        Ok(vm)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn average_access_time(&self) -> Result<f64> {
        self.stats.average_access_time(&self.config.costs)
    }

    pub fn memory(&self) -> &PhysicalMemory {
        &self.mem
    }

    pub fn swap(&self) -> &S {
        &self.swap
    }

    pub fn replacer(&self) -> &Replacer {
        &self.replacer
    }

    /// Current base register value
    pub fn ptbr(&self) -> Option<Pfn> {
        self.context.map(|ctx| ctx.ptbr)
    }

    pub fn context(&self) -> Option<Context> {
        self.context
    }

    pub fn frame_entry(&self, pfn: Pfn) -> FrameTableEntry {
        self.mem.frame_entry(pfn)
    }

    /// Iterate the whole frame table
    pub fn frame_entries(&self) -> impl Iterator<Item = (Pfn, FrameTableEntry)> + '_ {
        (0..self.geometry.num_frames).map(move |pfn| (pfn, self.mem.frame_entry(pfn)))
    }

    /// Look up a live process's page-table entry
    pub fn page_entry(&self, pid: Pid, vpn: Vpn) -> Result<PageTableEntry> {
        let pcb = self.live_process(pid)?;
        if vpn >= self.geometry.num_pages {
            return Err(VmError::AddressOutOfRange {
                addr: (vpn as u64) << self.geometry.offset_bits,
                bits: self.geometry.vaddr_bits,
            });
        }
        Ok(self.mem.page_entry(pcb.saved_ptbr, vpn))
    }

    pub(crate) fn live_process(&self, pid: Pid) -> Result<&Pcb> {
        match self.processes.get(&pid) {
            Some(pcb) => Ok(pcb),
            None if self.retired.contains(&pid) => Err(VmError::ProcessAlreadyCleaned(pid)),
            None => Err(VmError::UnknownProcess(pid)),
        }
    }
}
