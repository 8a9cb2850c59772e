//! Difficulty adjustment for proof-of-work blocks.
//!
//! Covers the Frontier formula, the Homestead exponential adjustment
//! (EIP-2), the Byzantium uncle-aware variant (EIP-100), and the
//! difficulty bomb with the Byzantium (EIP-649) and Constantinople
//! (EIP-1234) delays.

use crate::types::Fork;
use ethereum_types::U256;

/// Floor for the difficulty value (2^17).
pub const MIN_DIFFICULTY: u64 = 131_072;

/// Limits how much difficulty can change per block.
const DIFFICULTY_BOUND_DIVISOR: u64 = 2048;

/// Frontier's target block time in seconds.
const FRONTIER_BLOCK_TIME_TARGET: u64 = 13;

/// Difficulty bomb delays per fork, in blocks.
mod bomb_delays {
    pub const BYZANTIUM: u64 = 3_000_000;
    pub const CONSTANTINOPLE: u64 = 5_000_000;
}

/// The canonical difficulty of a block given its parent.
pub fn calculate_difficulty(
    parent_difficulty: U256,
    parent_timestamp: u64,
    parent_has_ommers: bool,
    block_timestamp: u64,
    block_number: u64,
    fork: Fork,
) -> U256 {
    if block_number == 0 {
        // Genesis difficulty comes from the genesis file.
        return parent_difficulty;
    }

    let adjusted = if fork < Fork::Homestead {
        frontier_adjustment(parent_difficulty, parent_timestamp, block_timestamp)
    } else {
        homestead_adjustment(
            parent_difficulty,
            parent_timestamp,
            block_timestamp,
            parent_has_ommers,
            fork,
        )
    };

    let difficulty = adjusted.saturating_add(difficulty_bomb(block_number, fork));
    difficulty.max(U256::from(MIN_DIFFICULTY))
}

/// Frontier rule: step up when the block was mined faster than the target,
/// step down otherwise.
fn frontier_adjustment(
    parent_difficulty: U256,
    parent_timestamp: u64,
    block_timestamp: u64,
) -> U256 {
    let time_diff = block_timestamp.saturating_sub(parent_timestamp);
    let bound = parent_difficulty / DIFFICULTY_BOUND_DIVISOR;
    if time_diff < FRONTIER_BLOCK_TIME_TARGET {
        parent_difficulty.saturating_add(bound)
    } else {
        parent_difficulty.saturating_sub(bound)
    }
}

/// Homestead rule (EIP-2):
///
/// ```text
/// diff = parent_diff + parent_diff // 2048 * max(1 - (ts - parent_ts) // 10, -99)
/// ```
///
/// From Byzantium (EIP-100) the divisor becomes 9 and the base factor is 2
/// when the parent carried uncles.
fn homestead_adjustment(
    parent_difficulty: U256,
    parent_timestamp: u64,
    block_timestamp: u64,
    parent_has_ommers: bool,
    fork: Fork,
) -> U256 {
    let time_diff = block_timestamp.saturating_sub(parent_timestamp);
    let (base_factor, time_divisor): (i64, u64) = if fork >= Fork::Byzantium {
        (if parent_has_ommers { 2 } else { 1 }, 9)
    } else {
        (1, 10)
    };

    let sigma = (base_factor - (time_diff / time_divisor) as i64).max(-99);
    let bound = parent_difficulty / DIFFICULTY_BOUND_DIVISOR;
    if sigma >= 0 {
        parent_difficulty.saturating_add(bound * U256::from(sigma as u64))
    } else {
        parent_difficulty.saturating_sub(bound * U256::from(sigma.unsigned_abs()))
    }
}

/// Exponential component: `2^(period - 2)` with `period = number / 100_000`,
/// counted from a fork-dependent delayed block number.
fn difficulty_bomb(block_number: u64, fork: Fork) -> U256 {
    let delay = match fork {
        Fork::Constantinople => bomb_delays::CONSTANTINOPLE,
        Fork::Byzantium => bomb_delays::BYZANTIUM,
        _ => 0,
    };
    let fake_block_number = block_number.saturating_sub(delay);
    let period_count = fake_block_number / 100_000;
    if period_count <= 2 {
        return U256::zero();
    }
    let exponent = period_count - 2;
    if exponent >= 256 {
        return U256::MAX;
    }
    U256::one() << exponent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_never_below_minimum() {
        let result = calculate_difficulty(
            U256::from(MIN_DIFFICULTY),
            0,
            false,
            1000,
            1,
            Fork::Frontier,
        );
        assert_eq!(result, U256::from(MIN_DIFFICULTY));
    }

    #[test]
    fn frontier_fast_block_increases_difficulty() {
        let parent = U256::from(1_000_000u64);
        let result = calculate_difficulty(parent, 100, false, 101, 1, Fork::Frontier);
        assert_eq!(result, parent + parent / 2048);
    }

    #[test]
    fn frontier_slow_block_decreases_difficulty() {
        let parent = U256::from(1_000_000u64);
        let result = calculate_difficulty(parent, 100, false, 200, 1, Fork::Frontier);
        assert_eq!(result, parent - parent / 2048);
    }

    #[test]
    fn homestead_adjustment_signs() {
        let parent = U256::from(1_000_000_000u64);
        // 5 seconds: sigma = 1.
        let fast = calculate_difficulty(parent, 100, false, 105, 1_200_000, Fork::Homestead);
        assert!(fast > parent);
        // 20 seconds: sigma = -1.
        let slow = calculate_difficulty(parent, 100, false, 120, 1_200_000, Fork::Homestead);
        assert!(slow < parent);
        // 10..19 seconds: sigma = 0.
        let neutral = calculate_difficulty(parent, 100, false, 110, 1_200_000, Fork::Homestead);
        assert_eq!(neutral, parent);
    }

    #[test]
    fn bomb_inactive_in_early_periods() {
        assert_eq!(difficulty_bomb(100_000, Fork::Frontier), U256::zero());
        assert_eq!(difficulty_bomb(200_000, Fork::Frontier), U256::zero());
    }

    #[test]
    fn bomb_grows_exponentially() {
        assert_eq!(difficulty_bomb(300_001, Fork::Frontier), U256::from(2u64));
        assert_eq!(difficulty_bomb(400_001, Fork::Frontier), U256::from(4u64));
    }

    #[test]
    fn byzantium_delays_the_bomb() {
        assert_eq!(difficulty_bomb(3_100_000, Fork::Byzantium), U256::zero());
        assert_eq!(difficulty_bomb(3_300_001, Fork::Byzantium), U256::from(2u64));
    }
}
