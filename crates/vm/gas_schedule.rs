//! Fork-aware gas schedules.
//!
//! Only the costs that actually change across the supported forks live
//! here; fork-invariant costs are constants in `gas_cost`.
//!
//! # Fork history (gas-relevant changes)
//!
//! - **Frontier**: original costs, full gas forwarded to subcalls, failed
//!   code deposits keep the account without code
//! - **Homestead**: failed code deposits become out-of-gas
//! - **Tangerine Whistle (EIP-150)**: IO repricing, 63/64 forwarding rule,
//!   SELFDESTRUCT costs
//! - **Spurious Dragon (EIP-160)**: EXP byte cost 10 -> 50

use hearth_common::types::Fork;

#[derive(Debug, Clone, Copy)]
pub struct GasSchedule {
    // Storage and account access
    pub sload: u64,
    pub balance: u64,
    pub extcodesize: u64,
    pub extcodecopy_base: u64,

    // Call family base cost, not including memory/value/new-account parts.
    pub call_base: u64,

    // Self-destruct
    pub selfdestruct: u64,
    pub selfdestruct_new_account: u64,

    /// Surcharge for a value-bearing CALL that brings an account to life.
    pub call_new_account: u64,

    pub exp_byte: u64,

    /// EIP-150: forwarded gas is capped at 63/64 of the remainder.
    /// Before it, callers could pass all remaining gas to subcalls.
    pub has_63_64_rule: bool,

    /// Homestead on: a code deposit the remaining gas cannot pay for is
    /// an out-of-gas failure. Frontier kept the account, codeless.
    pub exceptional_failed_code_deposit: bool,
}

impl GasSchedule {
    pub const fn for_fork(fork: Fork) -> &'static GasSchedule {
        match fork {
            Fork::Frontier => &FRONTIER_SCHEDULE,
            Fork::Homestead => &HOMESTEAD_SCHEDULE,
            Fork::Tangerine => &TANGERINE_WHISTLE_SCHEDULE,
            // Byzantium and Constantinople did not reprice these costs.
            Fork::SpuriousDragon | Fork::Byzantium | Fork::Constantinople => {
                &SPURIOUS_DRAGON_SCHEDULE
            }
        }
    }
}

/// Frontier gas schedule: the original Yellow Paper costs.
pub static FRONTIER_SCHEDULE: GasSchedule = GasSchedule {
    sload: 50,
    balance: 20,
    extcodesize: 20,
    extcodecopy_base: 20,

    call_base: 40,

    selfdestruct: 0,
    selfdestruct_new_account: 0,

    call_new_account: 25000,

    exp_byte: 10,

    has_63_64_rule: false,
    exceptional_failed_code_deposit: false,
};

/// Homestead kept Frontier's prices; only the failed-code-deposit rule
/// changed.
pub static HOMESTEAD_SCHEDULE: GasSchedule = GasSchedule {
    exceptional_failed_code_deposit: true,
    ..FRONTIER_SCHEDULE
};

/// Tangerine Whistle (EIP-150): IO cost increases against DoS, plus the
/// 63/64 call-gas rule.
pub static TANGERINE_WHISTLE_SCHEDULE: GasSchedule = GasSchedule {
    sload: 200,
    balance: 400,
    extcodesize: 700,
    extcodecopy_base: 700,

    call_base: 700,

    selfdestruct: 5000,
    selfdestruct_new_account: 25000,

    call_new_account: 25000,

    exp_byte: 10,

    has_63_64_rule: true,
    exceptional_failed_code_deposit: true,
};

/// Spurious Dragon: EXP repricing (EIP-160).
pub static SPURIOUS_DRAGON_SCHEDULE: GasSchedule = GasSchedule {
    exp_byte: 50,
    ..TANGERINE_WHISTLE_SCHEDULE
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontier_schedule() {
        let schedule = GasSchedule::for_fork(Fork::Frontier);
        assert_eq!(schedule.sload, 50);
        assert_eq!(schedule.balance, 20);
        assert_eq!(schedule.call_base, 40);
        assert!(!schedule.has_63_64_rule);
        assert!(!schedule.exceptional_failed_code_deposit);
    }

    #[test]
    fn homestead_only_changes_deposit_rule() {
        let schedule = GasSchedule::for_fork(Fork::Homestead);
        assert_eq!(schedule.call_base, 40);
        assert!(schedule.exceptional_failed_code_deposit);
    }

    #[test]
    fn tangerine_whistle_repricing() {
        let schedule = GasSchedule::for_fork(Fork::Tangerine);
        assert_eq!(schedule.sload, 200);
        assert_eq!(schedule.call_base, 700);
        assert_eq!(schedule.selfdestruct, 5000);
        assert!(schedule.has_63_64_rule);
    }

    #[test]
    fn spurious_dragon_exp_repricing() {
        assert_eq!(GasSchedule::for_fork(Fork::Tangerine).exp_byte, 10);
        assert_eq!(GasSchedule::for_fork(Fork::SpuriousDragon).exp_byte, 50);
        assert_eq!(GasSchedule::for_fork(Fork::Byzantium).exp_byte, 50);
    }
}
