//! # Block information operations
//!
//! Includes the following opcodes:
//!   - `BLOCKHASH`
//!   - `COINBASE`
//!   - `TIMESTAMP`
//!   - `NUMBER`
//!   - `DIFFICULTY`
//!   - `GASLIMIT`

use crate::{
    constants::BLOCKHASH_WINDOW_SIZE,
    errors::{OpcodeResult, VMError},
    gas_cost,
    opcode_handlers::OpcodeHandler,
    utils::address_to_word,
    vm::VM,
};
use ethereum_types::U256;

const CONTINUE: OpcodeResult = OpcodeResult::Continue { pc_increment: 1 };

/// Implementation for the `BLOCKHASH` opcode: the hash of one of the 256
/// most recent ancestors, zero outside that window.
pub struct OpBlockHashHandler;
impl OpcodeHandler for OpBlockHashHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::BLOCKHASH)?;
        let number = frame.stack.pop1()?;

        let current = vm.env.block_number;
        let in_window = number < U256::from(current)
            && number >= U256::from(current.saturating_sub(BLOCKHASH_WINDOW_SIZE));
        let hash = if in_window {
            vm.db.store.get_block_hash(number.low_u64())?
        } else {
            None
        };

        let frame = vm.current_call_frame_mut()?;
        match hash {
            Some(hash) => frame.stack.push(U256::from_big_endian(hash.as_bytes()))?,
            None => frame.stack.push_zero()?,
        }
        Ok(CONTINUE)
    }
}

/// Implementation for the `COINBASE` opcode.
pub struct OpCoinbaseHandler;
impl OpcodeHandler for OpCoinbaseHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let coinbase = vm.env.coinbase;
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::COINBASE)?;
        frame.stack.push(address_to_word(coinbase))?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `TIMESTAMP` opcode.
pub struct OpTimestampHandler;
impl OpcodeHandler for OpTimestampHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let timestamp = vm.env.timestamp;
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::TIMESTAMP)?;
        frame.stack.push(U256::from(timestamp))?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `NUMBER` opcode.
pub struct OpNumberHandler;
impl OpcodeHandler for OpNumberHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let number = vm.env.block_number;
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::NUMBER)?;
        frame.stack.push(U256::from(number))?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `DIFFICULTY` opcode.
pub struct OpDifficultyHandler;
impl OpcodeHandler for OpDifficultyHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let difficulty = vm.env.difficulty;
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::DIFFICULTY)?;
        frame.stack.push(difficulty)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `GASLIMIT` opcode: the block's gas limit, not
/// the transaction's.
pub struct OpGasLimitHandler;
impl OpcodeHandler for OpGasLimitHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let gas_limit = vm.env.block_gas_limit;
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::GASLIMIT)?;
        frame.stack.push(U256::from(gas_limit))?;
        Ok(CONTINUE)
    }
}
