//! Opcode gas costs.
//!
//! Fork-invariant costs are constants here; fork-dependent ones come from
//! the active [`GasSchedule`](crate::gas_schedule::GasSchedule).

use crate::{
    constants::WORD_SIZE_IN_BYTES_U64,
    errors::{ExceptionalHalt, InternalError, VMError},
    gas_schedule::GasSchedule,
    memory::expansion_cost,
};
use ethereum_types::U256;

// G_verylow group.
pub const ADD: u64 = 3;
pub const SUB: u64 = 3;
pub const LT: u64 = 3;
pub const GT: u64 = 3;
pub const SLT: u64 = 3;
pub const SGT: u64 = 3;
pub const EQ: u64 = 3;
pub const ISZERO: u64 = 3;
pub const AND: u64 = 3;
pub const OR: u64 = 3;
pub const XOR: u64 = 3;
pub const NOT: u64 = 3;
pub const BYTE: u64 = 3;
pub const SHL: u64 = 3;
pub const SHR: u64 = 3;
pub const SAR: u64 = 3;
pub const CALLDATALOAD: u64 = 3;
pub const CALLDATACOPY_STATIC: u64 = 3;
pub const CODECOPY_STATIC: u64 = 3;
pub const RETURNDATACOPY_STATIC: u64 = 3;
pub const PUSHN: u64 = 3;
pub const DUPN: u64 = 3;
pub const SWAPN: u64 = 3;

// G_low group.
pub const MUL: u64 = 5;
pub const DIV: u64 = 5;
pub const SDIV: u64 = 5;
pub const MOD: u64 = 5;
pub const SMOD: u64 = 5;
pub const SIGNEXTEND: u64 = 5;

// G_mid / G_high group.
pub const ADDMOD: u64 = 8;
pub const MULMOD: u64 = 8;
pub const JUMP: u64 = 8;
pub const JUMPI: u64 = 10;

// G_base group.
pub const ADDRESS: u64 = 2;
pub const ORIGIN: u64 = 2;
pub const CALLER: u64 = 2;
pub const CALLVALUE: u64 = 2;
pub const CALLDATASIZE: u64 = 2;
pub const CODESIZE: u64 = 2;
pub const GASPRICE: u64 = 2;
pub const COINBASE: u64 = 2;
pub const TIMESTAMP: u64 = 2;
pub const NUMBER: u64 = 2;
pub const DIFFICULTY: u64 = 2;
pub const GASLIMIT: u64 = 2;
pub const RETURNDATASIZE: u64 = 2;
pub const POP: u64 = 2;
pub const PC: u64 = 2;
pub const MSIZE: u64 = 2;
pub const GAS: u64 = 2;

pub const JUMPDEST: u64 = 1;
pub const BLOCKHASH: u64 = 20;

pub const EXP_STATIC: u64 = 10;
pub const KECCAK256_STATIC: u64 = 30;
pub const KECCAK256_DYNAMIC: u64 = 6;
pub const MEMORY_ACCESS: u64 = 3;
pub const COPY_PER_WORD: u64 = 3;

pub const LOG_STATIC: u64 = 375;
pub const LOG_DATA: u64 = 8;
pub const LOG_TOPIC: u64 = 375;

pub const SSTORE_SET: u64 = 20_000;
pub const SSTORE_RESET: u64 = 5_000;
/// Refund for clearing a non-zero storage slot (R_sclear).
pub const SSTORE_CLEAR_REFUND: u64 = 15_000;
/// Refund for the first SELFDESTRUCT of an account (R_selfdestruct).
pub const SELFDESTRUCT_REFUND: u64 = 24_000;

pub const CREATE_STATIC: u64 = 32_000;
/// Per-byte charge for installing deployed code.
pub const CODE_DEPOSIT_COST: u64 = 200;

/// Surcharge for transferring value with CALL or CALLCODE (G_callvalue).
pub const CALLVALUE_TRANSFER: u64 = 9_000;
/// Gas gifted to the callee of a value transfer, not charged to the
/// caller (G_callstipend).
pub const CALL_STIPEND: u64 = 2_300;

fn words(size: u64) -> Result<u64, VMError> {
    size.checked_add(WORD_SIZE_IN_BYTES_U64 - 1)
        .map(|padded| padded / WORD_SIZE_IN_BYTES_U64)
        .ok_or(ExceptionalHalt::OutOfGas.into())
}

/// EXP: static cost plus a per-byte charge on the exponent's length.
/// The byte cost was repriced by EIP-160.
pub fn exp(exponent: U256, schedule: &GasSchedule) -> Result<u64, VMError> {
    let exponent_byte_size = (exponent.bits() as u64).div_ceil(8);
    schedule
        .exp_byte
        .checked_mul(exponent_byte_size)
        .and_then(|dynamic| EXP_STATIC.checked_add(dynamic))
        .ok_or(ExceptionalHalt::OutOfGas.into())
}

/// KECCAK256: `30 + 6 * ceil(size / 32)` plus memory expansion.
pub fn keccak256(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
) -> Result<u64, VMError> {
    let hashed_words = words(size as u64)?;
    KECCAK256_STATIC
        .checked_add(
            KECCAK256_DYNAMIC
                .checked_mul(hashed_words)
                .ok_or(ExceptionalHalt::OutOfGas)?,
        )
        .and_then(|cost| {
            cost.checked_add(expansion_cost(new_memory_size, current_memory_size).ok()?)
        })
        .ok_or(ExceptionalHalt::OutOfGas.into())
}

/// The *COPY family: a static cost, 3 gas per copied word and memory
/// expansion.
pub fn copy_behavior(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
    static_cost: u64,
) -> Result<u64, VMError> {
    let copied_words = words(size as u64)?;
    static_cost
        .checked_add(
            COPY_PER_WORD
                .checked_mul(copied_words)
                .ok_or(ExceptionalHalt::OutOfGas)?,
        )
        .and_then(|cost| {
            cost.checked_add(expansion_cost(new_memory_size, current_memory_size).ok()?)
        })
        .ok_or(ExceptionalHalt::OutOfGas.into())
}

/// MLOAD/MSTORE/MSTORE8: the access cost plus expansion.
pub fn memory_access(
    new_memory_size: usize,
    current_memory_size: usize,
) -> Result<u64, VMError> {
    MEMORY_ACCESS
        .checked_add(expansion_cost(new_memory_size, current_memory_size)?)
        .ok_or(ExceptionalHalt::OutOfGas.into())
}

/// RETURN/REVERT: memory expansion only.
pub fn exit_opcode(
    new_memory_size: usize,
    current_memory_size: usize,
) -> Result<u64, VMError> {
    expansion_cost(new_memory_size, current_memory_size)
}

/// LOG0..LOG4: `375 + 8 * size + 375 * topics` plus expansion.
pub fn log(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
    topic_count: u64,
) -> Result<u64, VMError> {
    let topics_cost = LOG_TOPIC
        .checked_mul(topic_count)
        .ok_or(ExceptionalHalt::OutOfGas)?;
    let data_cost = LOG_DATA
        .checked_mul(size as u64)
        .ok_or(ExceptionalHalt::OutOfGas)?;
    LOG_STATIC
        .checked_add(topics_cost)
        .and_then(|cost| cost.checked_add(data_cost))
        .and_then(|cost| {
            cost.checked_add(expansion_cost(new_memory_size, current_memory_size).ok()?)
        })
        .ok_or(ExceptionalHalt::OutOfGas.into())
}

/// SSTORE: `G_sset` when writing non-zero into a zero slot, `G_sreset`
/// otherwise. The clearing refund is accounted by the handler.
pub fn sstore(current_value: U256, new_value: U256) -> u64 {
    if current_value.is_zero() && !new_value.is_zero() {
        SSTORE_SET
    } else {
        SSTORE_RESET
    }
}

/// CREATE: the static creation cost plus memory expansion for the init
/// code window.
pub fn create(new_memory_size: usize, current_memory_size: usize) -> Result<u64, VMError> {
    CREATE_STATIC
        .checked_add(expansion_cost(new_memory_size, current_memory_size)?)
        .ok_or(ExceptionalHalt::OutOfGas.into())
}

/// SELFDESTRUCT cost: zero until EIP-150, then 5000 plus a new-account
/// surcharge when the beneficiary has to be created.
pub fn selfdestruct(schedule: &GasSchedule, charge_new_account: bool) -> u64 {
    let mut cost = schedule.selfdestruct;
    if charge_new_account {
        cost = cost.saturating_add(schedule.selfdestruct_new_account);
    }
    cost
}

/// All-but-one-64th of the remaining gas (EIP-150); everything before it.
pub fn max_message_call_gas(gas_remaining: u64, schedule: &GasSchedule) -> u64 {
    if schedule.has_63_64_rule {
        gas_remaining - gas_remaining / 64
    } else {
        gas_remaining
    }
}

/// CALL-family cost and forwarded gas.
///
/// Returns `(caller_charge, child_gas_limit)`. The caller pays the base
/// cost, surcharges, memory expansion and the forwarded gas; the stipend
/// is added to the child's budget for free.
#[allow(clippy::too_many_arguments)]
pub fn call(
    new_memory_size: usize,
    current_memory_size: usize,
    transfers_value: bool,
    charge_new_account: bool,
    requested_gas: U256,
    gas_remaining: u64,
    schedule: &GasSchedule,
) -> Result<(u64, u64), VMError> {
    let mut cost = schedule
        .call_base
        .checked_add(expansion_cost(new_memory_size, current_memory_size)?)
        .ok_or(ExceptionalHalt::OutOfGas)?;
    if transfers_value {
        cost = cost
            .checked_add(CALLVALUE_TRANSFER)
            .ok_or(ExceptionalHalt::OutOfGas)?;
    }
    if charge_new_account {
        cost = cost
            .checked_add(schedule.call_new_account)
            .ok_or(ExceptionalHalt::OutOfGas)?;
    }
    let gas_left = gas_remaining
        .checked_sub(cost)
        .ok_or(ExceptionalHalt::OutOfGas)?;

    let forwarded = if schedule.has_63_64_rule {
        let cap = gas_left - gas_left / 64;
        if requested_gas > U256::from(cap) {
            cap
        } else {
            requested_gas.low_u64()
        }
    } else {
        // Pre-EIP-150 the requested gas is taken literally; asking for
        // more than is available is out of gas.
        let requested =
            u64::try_from(requested_gas).map_err(|_| ExceptionalHalt::OutOfGas)?;
        if requested > gas_left {
            return Err(ExceptionalHalt::OutOfGas.into());
        }
        requested
    };

    let mut child_gas = forwarded;
    if transfers_value {
        child_gas = child_gas
            .checked_add(CALL_STIPEND)
            .ok_or(InternalError::Overflow)?;
    }
    let total = cost
        .checked_add(forwarded)
        .ok_or(InternalError::Overflow)?;
    Ok((total, child_gas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas_schedule::{FRONTIER_SCHEDULE, TANGERINE_WHISTLE_SCHEDULE};

    #[test]
    fn exp_cost_by_exponent_width() {
        assert_eq!(exp(U256::zero(), &FRONTIER_SCHEDULE).unwrap(), 10);
        assert_eq!(exp(U256::from(255), &FRONTIER_SCHEDULE).unwrap(), 20);
        assert_eq!(exp(U256::from(256), &FRONTIER_SCHEDULE).unwrap(), 30);
    }

    #[test]
    fn call_forwards_63_64ths() {
        // 700 base, no value, plenty requested: forwarded is capped.
        let (cost, child_gas) = call(
            0,
            0,
            false,
            false,
            U256::MAX,
            64_700,
            &TANGERINE_WHISTLE_SCHEDULE,
        )
        .unwrap();
        let cap = 64_000 - 64_000 / 64;
        assert_eq!(child_gas, cap);
        assert_eq!(cost, 700 + cap);
    }

    #[test]
    fn call_pre_eip150_requires_requested_gas() {
        let err = call(
            0,
            0,
            false,
            false,
            U256::from(1_000_000),
            10_000,
            &FRONTIER_SCHEDULE,
        );
        assert!(err.is_err());

        let (cost, child_gas) = call(
            0,
            0,
            false,
            false,
            U256::from(5_000),
            10_000,
            &FRONTIER_SCHEDULE,
        )
        .unwrap();
        assert_eq!(child_gas, 5_000);
        assert_eq!(cost, 40 + 5_000);
    }

    #[test]
    fn value_call_adds_stipend_to_child_only() {
        let (cost, child_gas) = call(
            0,
            0,
            true,
            false,
            U256::from(100),
            100_000,
            &TANGERINE_WHISTLE_SCHEDULE,
        )
        .unwrap();
        assert_eq!(child_gas, 100 + CALL_STIPEND);
        assert_eq!(cost, 700 + CALLVALUE_TRANSFER + 100);
    }

    #[test]
    fn sstore_costs() {
        assert_eq!(sstore(U256::zero(), U256::one()), SSTORE_SET);
        assert_eq!(sstore(U256::one(), U256::zero()), SSTORE_RESET);
        assert_eq!(sstore(U256::one(), U256::from(2)), SSTORE_RESET);
        assert_eq!(sstore(U256::zero(), U256::zero()), SSTORE_RESET);
    }
}
