//! Victim selection for the frame allocator.
//!
//! A free frame (neither protected nor mapped) always wins. Only when
//! memory is full does the active policy pick a mapped frame to evict.

use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ReplacementPolicy;
use crate::constants::Pfn;
use crate::memory::PhysicalMemory;

/// Replacement state, one variant per policy
pub enum Replacer {
    /// Coin flip per unprotected frame, falling back to the last one seen
    Random { rng: StdRng },
    /// Second-chance sweep; `hand` persists across calls
    ClockSweep { hand: Pfn },
}

impl Replacer {
    pub fn new(policy: ReplacementPolicy, seed: u64) -> Self {
        match policy {
            ReplacementPolicy::Random => Replacer::Random {
                rng: StdRng::seed_from_u64(seed),
            },
            ReplacementPolicy::ClockSweep => Replacer::ClockSweep { hand: 0 },
        }
    }

    pub fn policy(&self) -> ReplacementPolicy {
        match self {
            Replacer::Random { .. } => ReplacementPolicy::Random,
            Replacer::ClockSweep { .. } => ReplacementPolicy::ClockSweep,
        }
    }

    /// Current clock hand, if the policy has one
    pub fn hand(&self) -> Option<Pfn> {
        match self {
            Replacer::ClockSweep { hand } => Some(*hand),
            Replacer::Random { .. } => None,
        }
    }

    /// Find a frame for a new mapping. The result may still be mapped, in
    /// which case the caller evicts it. `None` means every frame is
    /// protected.
    pub fn select(&mut self, mem: &mut PhysicalMemory) -> Option<Pfn> {
        if let Some(pfn) = first_free(mem) {
            trace!("frame {} is free", pfn);
            return Some(pfn);
        }
        self.pick_victim(mem)
    }

    /// Apply the policy over unprotected frames, ignoring free ones.
    pub fn pick_victim(&mut self, mem: &mut PhysicalMemory) -> Option<Pfn> {
        match self {
            Replacer::Random { rng } => random_victim(rng, mem),
            Replacer::ClockSweep { hand } => clock_victim(hand, mem),
        }
    }
}

fn first_free(mem: &PhysicalMemory) -> Option<Pfn> {
    (0..mem.num_frames()).find(|&pfn| {
        let entry = mem.frame_entry(pfn);
        !entry.protected && !entry.mapped
    })
}

// Lower frames are favoured: the scan stops at the first head, and the
// fallback is order dependent. Kept as is for compatibility.
fn random_victim<R: Rng>(rng: &mut R, mem: &PhysicalMemory) -> Option<Pfn> {
    let mut last_unprotected = None;
    for pfn in 0..mem.num_frames() {
        if mem.frame_entry(pfn).protected {
            continue;
        }
        last_unprotected = Some(pfn);
        if rng.gen_bool(0.5) {
            return Some(pfn);
        }
    }
    last_unprotected
}

fn clock_victim(hand: &mut Pfn, mem: &mut PhysicalMemory) -> Option<Pfn> {
    let num_frames = mem.num_frames();
    let mut pfn = *hand % num_frames;

    // the first lap clears every referenced bit, so the second must succeed
    for _ in 0..2 * num_frames {
        let entry = mem.frame_entry(pfn);
        if !entry.protected {
            if entry.referenced {
                mem.update_frame_entry(pfn, |e| e.referenced = false);
            } else {
                *hand = (pfn + 1) % num_frames;
                return Some(pfn);
            }
        }
        pfn = (pfn + 1) % num_frames;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::tables::FrameTableEntry;

    /// 8 frames, frame 0 protected, every other frame mapped
    fn full_memory() -> PhysicalMemory {
        let geometry = SimConfig::new(11, 12, 8).geometry().unwrap();
        let mut mem = PhysicalMemory::new(&geometry);
        mem.update_frame_entry(0, |e| e.protected = true);
        for pfn in 1..8 {
            mem.set_frame_entry(
                pfn,
                FrameTableEntry {
                    mapped: true,
                    owner: Some(1),
                    vpn: Some(pfn),
                    ..Default::default()
                },
            );
        }
        mem
    }

    #[test]
    fn test_free_frame_preferred() {
        let mut mem = full_memory();
        mem.update_frame_entry(5, |e| e.mapped = false);
        mem.update_frame_entry(3, |e| e.mapped = false);

        let mut clock = Replacer::new(ReplacementPolicy::ClockSweep, 0);
        assert_eq!(clock.select(&mut mem), Some(3));
        // the hand only moves on eviction
        assert_eq!(clock.hand(), Some(0));

        let mut random = Replacer::new(ReplacementPolicy::Random, 0);
        assert_eq!(random.select(&mut mem), Some(3));
    }

    #[test]
    fn test_protected_free_frame_skipped() {
        let mut mem = full_memory();
        mem.update_frame_entry(4, |e| {
            e.mapped = false;
            e.protected = true;
        });
        let mut clock = Replacer::new(ReplacementPolicy::ClockSweep, 0);
        assert_eq!(clock.select(&mut mem), Some(1));
    }

    #[test]
    fn test_clock_skips_referenced_and_clears_bit() {
        let mut mem = full_memory();
        mem.update_frame_entry(1, |e| e.referenced = true);
        mem.update_frame_entry(2, |e| e.referenced = true);

        let mut clock = Replacer::new(ReplacementPolicy::ClockSweep, 0);
        assert_eq!(clock.select(&mut mem), Some(3));
        assert_eq!(clock.hand(), Some(4));
        assert!(!mem.frame_entry(1).referenced);
        assert!(!mem.frame_entry(2).referenced);
    }

    #[test]
    fn test_clock_hand_persists_and_wraps() {
        let mut mem = full_memory();
        let mut clock = Replacer::ClockSweep { hand: 7 };

        assert_eq!(clock.select(&mut mem), Some(7));
        assert_eq!(clock.hand(), Some(0));
        // frame 0 is protected, so the sweep continues at 1
        assert_eq!(clock.select(&mut mem), Some(1));
        assert_eq!(clock.hand(), Some(2));
    }

    #[test]
    fn test_clock_visits_frame_zero_on_wrap() {
        let mut mem = full_memory();
        mem.set_frame_entry(
            0,
            FrameTableEntry {
                mapped: true,
                ..Default::default()
            },
        );
        for pfn in 1..8 {
            mem.update_frame_entry(pfn, |e| e.referenced = true);
        }
        let mut clock = Replacer::ClockSweep { hand: 6 };
        assert_eq!(clock.select(&mut mem), Some(0));
        assert_eq!(clock.hand(), Some(1));
    }

    #[test]
    fn test_clock_all_referenced_picks_within_two_laps() {
        let mut mem = full_memory();
        for pfn in 1..8 {
            mem.update_frame_entry(pfn, |e| e.referenced = true);
        }
        let mut clock = Replacer::ClockSweep { hand: 5 };
        // one lap clears every bit, the hand's frame is the victim
        assert_eq!(clock.select(&mut mem), Some(5));
        assert!((1..8).all(|pfn| !mem.frame_entry(pfn).referenced));
    }

    #[test]
    fn test_clock_all_protected() {
        let geometry = SimConfig::new(10, 12, 8).geometry().unwrap();
        let mut mem = PhysicalMemory::new(&geometry);
        for pfn in 0..4 {
            mem.update_frame_entry(pfn, |e| e.protected = true);
        }
        let mut clock = Replacer::new(ReplacementPolicy::ClockSweep, 0);
        assert_eq!(clock.select(&mut mem), None);
        let mut random = Replacer::new(ReplacementPolicy::Random, 0);
        assert_eq!(random.select(&mut mem), None);
    }

    #[test]
    fn test_random_single_candidate() {
        let mut mem = full_memory();
        for pfn in 1..7 {
            mem.update_frame_entry(pfn, |e| e.protected = true);
        }
        // whichever way the coins land, frame 7 is the only choice
        for seed in 0..16 {
            let mut random = Replacer::new(ReplacementPolicy::Random, seed);
            assert_eq!(random.select(&mut mem), Some(7));
        }
    }

    #[test]
    fn test_random_fallback_is_last_unprotected() {
        struct Tails;
        impl rand::RngCore for Tails {
            fn next_u32(&mut self) -> u32 {
                u32::MAX
            }
            fn next_u64(&mut self) -> u64 {
                u64::MAX
            }
            fn fill_bytes(&mut self, dest: &mut [u8]) {
                dest.fill(0xFF);
            }
            fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
                dest.fill(0xFF);
                Ok(())
            }
        }

        let mut mem = full_memory();
        mem.update_frame_entry(7, |e| e.protected = true);
        assert_eq!(random_victim(&mut Tails, &mem), Some(6));
    }

    #[test]
    fn test_random_same_seed_same_victims() {
        let mut mem = full_memory();
        let mut a = Replacer::new(ReplacementPolicy::Random, 42);
        let mut b = Replacer::new(ReplacementPolicy::Random, 42);
        let picks_a: Vec<_> = (0..20).map(|_| a.select(&mut mem)).collect();
        let picks_b: Vec<_> = (0..20).map(|_| b.select(&mut mem)).collect();
        assert_eq!(picks_a, picks_b);
        assert!(picks_a.iter().all(|p| matches!(p, Some(1..=7))));
    }
}
