//! Process lifecycle: system bring-up, admission, context switch, teardown.

use log::{debug, info};

use crate::constants::*;
use crate::error::{Result, VmError};
use crate::swap::SwapStore;
use crate::tables::FrameTableEntry;
use crate::vm_manager::{Context, VmManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Running,
    Stopped,
}

/// Process control block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pcb {
    pub pid: Pid,
    pub state: ProcState,
    /// Frame holding this process's page table, protected while it lives
    pub saved_ptbr: Pfn,
}

impl<S: SwapStore> VmManager<S> {
    /// Zero the arena and reserve frame 0 for the frame table.
    pub(crate) fn system_init(&mut self) {
        for pfn in 0..self.geometry.num_frames {
            self.mem.zero_frame(pfn);
        }
        self.mem.set_frame_entry(
            FRAME_TABLE_PFN,
            FrameTableEntry {
                protected: true,
                ..Default::default()
            },
        );
        debug!(
            "system init: {} frames of {} bytes, {} pages per process, {} replacement",
            self.geometry.num_frames,
            self.geometry.page_size,
            self.geometry.num_pages,
            self.replacer.policy()
        );
    }

    /// Admit a process: give it a zeroed, protected page-table frame.
    pub fn process_init(&mut self, pid: Pid) -> Result<Pcb> {
        if self.processes.contains_key(&pid) {
            return Err(VmError::DuplicateProcess(pid));
        }

        let pt_frame = self.free_frame()?;
        self.mem.zero_frame(pt_frame);
        self.mem.set_frame_entry(
            pt_frame,
            FrameTableEntry {
                protected: true,
                ..Default::default()
            },
        );

        let pcb = Pcb {
            pid,
            state: ProcState::Stopped,
            saved_ptbr: pt_frame,
        };
        self.processes.insert(pid, pcb);
        self.retired.remove(&pid);
        info!("process {} admitted, page table in frame {}", pid, pt_frame);
        Ok(pcb)
    }

    /// Point the base register at `pid`'s page table.
    pub fn context_switch(&mut self, pid: Pid) -> Result<()> {
        let ptbr = self.live_process(pid)?.saved_ptbr;

        if let Some(prev) = self.context {
            if let Some(pcb) = self.processes.get_mut(&prev.pid) {
                pcb.state = ProcState::Stopped;
            }
        }
        if let Some(pcb) = self.processes.get_mut(&pid) {
            pcb.state = ProcState::Running;
        }
        self.context = Some(Context { pid, ptbr });
        debug!("context switch to process {} (ptbr {})", pid, ptbr);
        Ok(())
    }

    /// Tear down a process: unmap its pages, release its swap slots and
    /// unprotect its page-table frame.
    pub fn process_cleanup(&mut self, pid: Pid) -> Result<()> {
        let ptbr = self.live_process(pid)?.saved_ptbr;

        let mut released = 0usize;
        for vpn in 0..self.geometry.num_pages {
            let mut pte = self.mem.page_entry(ptbr, vpn);
            let before = pte;
            if pte.valid {
                pte.valid = false;
                self.mem.update_frame_entry(pte.pfn, |e| {
                    e.mapped = false;
                    e.referenced = false;
                    e.owner = None;
                    e.vpn = None;
                });
                released += 1;
            }
            if pte.swap.is_some() {
                self.swap.free(&mut pte);
            }
            if pte != before {
                self.mem.set_page_entry(ptbr, vpn, pte);
            }
        }

        self.mem.update_frame_entry(ptbr, |e| e.protected = false);
        self.processes.remove(&pid);
        self.retired.insert(pid);
        if self.context.is_some_and(|ctx| ctx.pid == pid) {
            self.context = None;
        }
        info!("process {} cleaned up, {} frames released", pid, released);
        Ok(())
    }

    pub fn process(&self, pid: Pid) -> Option<&Pcb> {
        self.processes.get(&pid)
    }

    pub fn current_process(&self) -> Option<&Pcb> {
        self.context.and_then(|ctx| self.processes.get(&ctx.pid))
    }

    pub fn processes(&self) -> impl Iterator<Item = &Pcb> + '_ {
        self.processes.values()
    }
}
