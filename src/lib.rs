pub mod config;
pub mod constants;
pub mod error;
mod fault;
pub mod io;
pub mod memory;
pub mod process;
pub mod replacement;
pub mod stats;
pub mod swap;
pub mod tables;
pub mod translation;
pub mod vm_manager;

// Re-export commonly used items for convenience
pub use config::{Geometry, ReplacementPolicy, SimConfig};
pub use constants::{Pfn, Pid, SwapSlot, Vpn};
pub use error::{ConfigError, Result, SwapError, TraceError, VmError};
pub use io::{Trace, TraceEvent, TraceOp};
pub use process::{Pcb, ProcState};
pub use stats::{AccessCosts, Stats};
pub use swap::{MemorySwap, SwapStore};
pub use tables::{FrameTableEntry, PageTableEntry};
pub use translation::{Access, VirtualAddress};
pub use vm_manager::{Context, VmManager};
