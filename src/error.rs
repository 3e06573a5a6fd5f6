//! Error types for the paging simulator.
//!
//! Page faults are not errors; they are handled in-line and counted.
//! Everything here is a condition the caller must see.

use thiserror::Error;

use crate::constants::{Pfn, Pid, SwapSlot};

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, VmError>;

/// Rejected memory geometry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("offset width must be at least 1 bit")]
    ZeroOffset,

    #[error("offset width {offset} must be smaller than the {kind} address width {width}")]
    OffsetTooWide {
        offset: u32,
        width: u32,
        kind: &'static str,
    },

    #[error("{kind} address width {width} exceeds the supported maximum of {max} bits")]
    AddressTooWide {
        width: u32,
        max: u32,
        kind: &'static str,
    },

    #[error("frame table needs {needed} bytes but a frame holds {page_size}")]
    FrameTableOverflow { needed: usize, page_size: usize },

    #[error("page table needs {needed} bytes but a frame holds {page_size}")]
    PageTableOverflow { needed: usize, page_size: usize },
}

/// Swap device failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwapError {
    #[error("swap device is full ({capacity} slots)")]
    Full { capacity: usize },

    #[error("swap slot {0} holds no data")]
    EmptySlot(SwapSlot),

    #[error("page table entry has no swap slot")]
    Unassigned,

    #[error("swap transfer of {actual} bytes, expected a page of {expected}")]
    BufferSize { expected: usize, actual: usize },
}

/// Simulator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Fatal: the working set exceeds physical memory.
    #[error("system ran out of memory: every physical frame is protected")]
    OutOfMemory,

    #[error("no process is scheduled")]
    NoCurrentProcess,

    #[error("virtual address {addr:#x} is outside the {bits}-bit address space")]
    AddressOutOfRange { addr: u64, bits: u32 },

    #[error("process {0} already exists")]
    DuplicateProcess(Pid),

    #[error("process {0} is unknown")]
    UnknownProcess(Pid),

    #[error("process {0} was already cleaned up")]
    ProcessAlreadyCleaned(Pid),

    #[error("frame {pfn} is mapped but its owner has no page table")]
    OrphanedFrame { pfn: Pfn },

    #[error("average access time is undefined with zero accesses")]
    NoAccesses,

    #[error("swap: {0}")]
    Swap(#[from] SwapError),
}

/// Trace loading and replay errors
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Vm(#[from] VmError),

    #[error("line {line}: {msg}")]
    Parse { line: usize, msg: String },

    #[error("line {line}: {source}")]
    Replay {
        line: usize,
        #[source]
        source: VmError,
    },
}
