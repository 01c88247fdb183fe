//! Block-number oracle.
//!
//! Sale timing is expressed purely in block numbers. Simulators drive the
//! clock explicitly; the clock never moves backwards.

use std::sync::atomic::{AtomicU64, Ordering};

pub trait BlockOracle: Send + Sync {
    fn current_block(&self) -> u64;
}

#[derive(Debug, Default)]
pub struct ManualBlockClock {
    block: AtomicU64,
}

impl ManualBlockClock {
    pub fn new(block: u64) -> Self {
        Self {
            block: AtomicU64::new(block),
        }
    }

    /// Move to `block`. Earlier blocks are ignored; returns the resulting height.
    pub fn advance_to(&self, block: u64) -> u64 {
        let previous = self.block.fetch_max(block, Ordering::SeqCst);
        previous.max(block)
    }

    /// Mine `count` blocks; returns the new height. Saturates at `u64::MAX`.
    pub fn mine(&self, count: u64) -> u64 {
        let previous = self
            .block
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |b| {
                Some(b.saturating_add(count))
            })
            .unwrap_or_else(|b| b);
        previous.saturating_add(count)
    }
}

impl BlockOracle for ManualBlockClock {
    fn current_block(&self) -> u64 {
        self.block.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_monotonic() {
        let clock = ManualBlockClock::new(10);
        assert_eq!(clock.advance_to(50), 50);
        assert_eq!(clock.advance_to(20), 50);
        assert_eq!(clock.current_block(), 50);
        assert_eq!(clock.mine(3), 53);
    }

    #[test]
    fn test_mine_saturates_at_max_height() {
        let clock = ManualBlockClock::new(u64::MAX - 1);
        assert_eq!(clock.mine(5), u64::MAX);
        assert_eq!(clock.current_block(), u64::MAX);
        assert_eq!(clock.mine(1), u64::MAX);
        assert_eq!(clock.advance_to(7), u64::MAX);
    }
}
