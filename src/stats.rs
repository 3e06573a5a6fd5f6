use std::fmt;

use crate::constants::*;
use crate::error::{Result, VmError};

/// Fixed per-operation latencies used for the average access time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessCosts {
    pub memory_access: u64,
    pub disk_write: u64,
    pub disk_read: u64,
}

impl Default for AccessCosts {
    fn default() -> Self {
        AccessCosts {
            memory_access: MEMORY_ACCESS_TIME,
            disk_write: DISK_PAGE_WRITE_TIME,
            disk_read: DISK_PAGE_READ_TIME,
        }
    }
}

/// Running counters. They only ever increase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub accesses: u64,
    pub reads: u64,
    pub writes: u64,
    pub page_faults: u64,
    pub writebacks: u64,
}

impl Stats {
    /// Average access time: memory cost for every read and write, plus a
    /// disk write per writeback and a disk read per fault, over all accesses.
    pub fn average_access_time(&self, costs: &AccessCosts) -> Result<f64> {
        if self.accesses == 0 {
            return Err(VmError::NoAccesses);
        }
        let total = (self.reads + self.writes) as f64 * costs.memory_access as f64
            + self.writebacks as f64 * costs.disk_write as f64
            + self.page_faults as f64 * costs.disk_read as f64;
        Ok(total / self.accesses as f64)
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accesses:    {}", self.accesses)?;
        writeln!(f, "Reads:       {}", self.reads)?;
        writeln!(f, "Writes:      {}", self.writes)?;
        writeln!(f, "Page faults: {}", self.page_faults)?;
        write!(f, "Writebacks:  {}", self.writebacks)
    }
}
