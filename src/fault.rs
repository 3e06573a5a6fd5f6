//! Page fault handling and the frame allocator's eviction path.

use log::{debug, error};

use crate::constants::*;
use crate::error::{Result, VmError};
use crate::swap::SwapStore;
use crate::translation::VirtualAddress;
use crate::vm_manager::VmManager;

impl<S: SwapStore> VmManager<S> {
    /// Install a mapping for a faulting address in the current process.
    ///
    /// A page that was evicted before is restored from swap; a page that
    /// was never mapped starts zeroed and clean.
    pub(crate) fn page_fault(&mut self, addr: VirtualAddress) -> Result<Pfn> {
        let ctx = self.context.ok_or(VmError::NoCurrentProcess)?;
        let pfn = self.free_frame()?;

        let mut pte = self.mem.page_entry(ctx.ptbr, addr.vpn);
        if self.swap.exists(&pte) {
            self.swap.read(&pte, self.mem.frame_mut(pfn))?;
            debug!(
                "page fault: pid {} vpn {} restored from swap into frame {}",
                ctx.pid, addr.vpn, pfn
            );
        } else {
            self.mem.zero_frame(pfn);
            pte.dirty = false;
            debug!(
                "page fault: pid {} vpn {} zero-filled in frame {}",
                ctx.pid, addr.vpn, pfn
            );
        }

        pte.pfn = pfn;
        pte.valid = true;
        self.mem.update_frame_entry(pfn, |e| {
            e.mapped = true;
            e.owner = Some(ctx.pid);
            e.vpn = Some(addr.vpn);
        });
        self.mem.set_page_entry(ctx.ptbr, addr.vpn, pte);
        Ok(pfn)
    }

    /// Find a frame for a new mapping, evicting its current occupant if
    /// physical memory is full.
    pub(crate) fn free_frame(&mut self) -> Result<Pfn> {
        let Some(pfn) = self.replacer.select(&mut self.mem) else {
            error!(
                "system ran out of memory: all {} frames are protected",
                self.geometry.num_frames
            );
            return Err(VmError::OutOfMemory);
        };

        if self.mem.frame_entry(pfn).mapped {
            self.evict(pfn)?;
        }
        Ok(pfn)
    }

    /// Unmap the page occupying `pfn`, writing it to swap first if dirty.
    fn evict(&mut self, pfn: Pfn) -> Result<()> {
        let fte = self.mem.frame_entry(pfn);
        let (Some(pid), Some(vpn)) = (fte.owner, fte.vpn) else {
            return Err(VmError::OrphanedFrame { pfn });
        };
        let ptbr = match self.processes.get(&pid) {
            Some(pcb) => pcb.saved_ptbr,
            None => return Err(VmError::OrphanedFrame { pfn }),
        };

        let mut pte = self.mem.page_entry(ptbr, vpn);
        if pte.dirty {
            self.swap.write(&mut pte, self.mem.frame(pfn))?;
            self.stats.writebacks += 1;
            debug!("writeback: pid {} vpn {} from frame {}", pid, vpn, pfn);
        }
        pte.valid = false;
        pte.dirty = false;
        self.mem.set_page_entry(ptbr, vpn, pte);

        self.mem.update_frame_entry(pfn, |e| {
            e.mapped = false;
            e.owner = None;
            e.vpn = None;
        });
        debug!("evicted pid {} vpn {} from frame {}", pid, vpn, pfn);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ReplacementPolicy, SimConfig};
    use crate::error::VmError;
    use crate::swap::MemorySwap;
    use crate::vm_manager::VmManager;

    /// 8 frames of 256 bytes, 16 pages per process, one process scheduled
    fn small_vm(policy: ReplacementPolicy) -> VmManager {
        let config = SimConfig::new(11, 12, 8).with_policy(policy).with_seed(7);
        let mut vm = VmManager::new(config).unwrap();
        vm.process_init(1).unwrap();
        vm.context_switch(1).unwrap();
        vm
    }

    fn page(vpn: u32) -> u32 {
        vpn << 8
    }

    #[test]
    fn test_round_trip_through_swap() {
        for policy in [ReplacementPolicy::ClockSweep, ReplacementPolicy::Random] {
            let mut vm = small_vm(policy);
            vm.write(page(0) + 17, 0x5C).unwrap();

            // 6 usable frames; cycle through the other 15 pages until
            // page 0 has been pushed out
            let mut vpn = 1;
            for _ in 0..1000 {
                if !vm.page_entry(1, 0).unwrap().valid {
                    break;
                }
                vm.read(page(vpn)).unwrap();
                vpn = vpn % 15 + 1;
            }
            assert!(!vm.page_entry(1, 0).unwrap().valid);

            let faults = vm.stats().page_faults;
            assert_eq!(vm.read(page(0) + 17), Ok(0x5C));
            assert_eq!(vm.stats().page_faults, faults + 1);
        }
    }

    #[test]
    fn test_dirty_eviction_writes_back_once() {
        let mut vm = small_vm(ReplacementPolicy::ClockSweep);
        vm.write(page(0), 1).unwrap();
        for vpn in 1..6 {
            vm.read(page(vpn)).unwrap();
        }
        // memory is now full; every frame was referenced
        assert_eq!(vm.stats().writebacks, 0);
        assert!(vm.page_entry(1, 0).unwrap().dirty);

        // clock clears every bit, then wraps to page 0's frame
        vm.read(page(6)).unwrap();
        assert_eq!(vm.stats().writebacks, 1);
        let pte = vm.page_entry(1, 0).unwrap();
        assert!(!pte.valid);
        assert!(!pte.dirty);
        assert!(pte.swap.is_some());
    }

    #[test]
    fn test_clean_eviction_skips_writeback() {
        let mut vm = small_vm(ReplacementPolicy::ClockSweep);
        for vpn in 0..7 {
            vm.read(page(vpn)).unwrap();
        }
        assert_eq!(vm.stats().page_faults, 7);
        assert_eq!(vm.stats().writebacks, 0);
        let pte = vm.page_entry(1, 0).unwrap();
        assert!(!pte.valid);
        assert_eq!(pte.swap, None);
        // never written, so it comes back zero-filled
        assert_eq!(vm.read(page(0)), Ok(0));
    }

    #[test]
    fn test_restored_page_is_clean_until_written() {
        let mut vm = small_vm(ReplacementPolicy::ClockSweep);
        vm.write(page(0), 9).unwrap();
        for vpn in 1..7 {
            vm.read(page(vpn)).unwrap();
        }
        assert_eq!(vm.read(page(0)), Ok(9));
        let pte = vm.page_entry(1, 0).unwrap();
        assert!(pte.valid);
        assert!(!pte.dirty);
    }

    #[test]
    fn test_eviction_clears_reverse_mapping() {
        let mut vm = small_vm(ReplacementPolicy::ClockSweep);
        for vpn in 0..7 {
            vm.read(page(vpn)).unwrap();
        }
        let mapped = vm.frame_entries().filter(|(_, e)| e.mapped).count();
        assert_eq!(mapped, 6);
        for (pfn, e) in vm.frame_entries() {
            if e.mapped {
                let vpn = e.vpn.unwrap();
                let pte = vm.page_entry(1, vpn).unwrap();
                assert!(pte.valid);
                assert_eq!(pte.pfn, pfn);
            } else {
                assert_eq!(e.owner, None);
            }
        }
    }

    #[test]
    fn test_eviction_crosses_processes() {
        let mut vm = small_vm(ReplacementPolicy::ClockSweep);
        vm.process_init(2).unwrap();
        // 5 usable frames left, process 1 takes them all
        for vpn in 0..5 {
            vm.write(page(vpn), vpn as u8 + 1).unwrap();
        }
        vm.context_switch(2).unwrap();
        vm.read(page(0)).unwrap();

        assert_eq!(vm.stats().writebacks, 1);
        let evicted = (0..5)
            .filter(|&vpn| !vm.page_entry(1, vpn).unwrap().valid)
            .count();
        assert_eq!(evicted, 1);

        vm.context_switch(1).unwrap();
        for vpn in 0..5 {
            assert_eq!(vm.read(page(vpn)), Ok(vpn as u8 + 1));
        }
    }

    #[test]
    fn test_out_of_memory_is_fatal_error() {
        // frame table + page table fill both frames
        let mut vm = VmManager::new(SimConfig::new(9, 9, 8)).unwrap();
        vm.process_init(1).unwrap();
        vm.context_switch(1).unwrap();

        assert_eq!(vm.read(0), Err(VmError::OutOfMemory));
        assert_eq!(vm.stats().page_faults, 0);
        assert_eq!(vm.stats().accesses, 0);
    }

    #[test]
    fn test_swap_full_leaves_mapping_intact() {
        let config = SimConfig::new(11, 12, 8);
        let mut vm = VmManager::with_swap(config, MemorySwap::with_capacity(256, 0)).unwrap();
        vm.process_init(1).unwrap();
        vm.context_switch(1).unwrap();
        for vpn in 0..6 {
            vm.write(page(vpn), 1).unwrap();
        }

        assert!(matches!(vm.read(page(6)), Err(VmError::Swap(_))));
        // the would-be victim is still mapped and dirty
        let resident = (0..6)
            .filter(|&vpn| vm.page_entry(1, vpn).unwrap().valid)
            .count();
        assert_eq!(resident, 6);
        assert_eq!(vm.stats().writebacks, 0);
    }
}
