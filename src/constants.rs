pub type Pfn = u32;
pub type Vpn = u32;
pub type Pid = u32;
pub type SwapSlot = u32;

pub const DEFAULT_PADDR_BITS: u32 = 20;
pub const DEFAULT_VADDR_BITS: u32 = 24;
pub const DEFAULT_OFFSET_BITS: u32 = 14;

// virtual addresses are carried as u32
pub const MAX_VADDR_BITS: u32 = 32;
// caps the arena at 1 GiB
pub const MAX_PADDR_BITS: u32 = 30;

/// Frame that holds the frame table itself.
pub const FRAME_TABLE_PFN: Pfn = 0;

pub const FTE_SIZE: usize = 12;
pub const PTE_SIZE: usize = 12;

// per-operation costs used for the average access time
pub const MEMORY_ACCESS_TIME: u64 = 100;
pub const DISK_PAGE_READ_TIME: u64 = 250_000;
pub const DISK_PAGE_WRITE_TIME: u64 = 200_000;
