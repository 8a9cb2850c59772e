//! # Stack, memory, storage and control flow operations
//!
//! Includes the following opcodes:
//!   - `POP`, `PC`, `GAS`, `MSIZE`
//!   - `MLOAD`, `MSTORE`, `MSTORE8`
//!   - `SLOAD`, `SSTORE`
//!   - `JUMP`, `JUMPI`, `JUMPDEST`

use crate::{
    constants::WORD_SIZE_IN_BYTES_USIZE,
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    opcode_handlers::OpcodeHandler,
    utils::{u256_to_h256, u256_to_usize},
    vm::VM,
};
use ethereum_types::U256;

const CONTINUE: OpcodeResult = OpcodeResult::Continue { pc_increment: 1 };

/// Implementation for the `POP` opcode.
pub struct OpPopHandler;
impl OpcodeHandler for OpPopHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::POP)?;
        frame.stack.pop1()?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `GAS` opcode: gas remaining after this opcode's
/// own cost.
pub struct OpGasHandler;
impl OpcodeHandler for OpGasHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::GAS)?;
        let remaining = frame.gas_remaining;
        frame.stack.push(U256::from(remaining))?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `PC` opcode.
pub struct OpPcHandler;
impl OpcodeHandler for OpPcHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::PC)?;
        let pc = frame.pc;
        frame.stack.push(U256::from(pc))?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `MSIZE` opcode.
pub struct OpMSizeHandler;
impl OpcodeHandler for OpMSizeHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::MSIZE)?;
        let size = frame.memory.len();
        frame.stack.push(U256::from(size))?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `MLOAD` opcode.
pub struct OpMLoadHandler;
impl OpcodeHandler for OpMLoadHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        let offset = u256_to_usize(frame.stack.pop1()?)?;
        frame.increase_consumed_gas(gas_cost::memory_access(
            calculate_memory_size(offset, WORD_SIZE_IN_BYTES_USIZE)?,
            frame.memory.len(),
        )?)?;
        let word = frame.memory.load_word(offset)?;
        frame.stack.push(word)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `MSTORE` opcode.
pub struct OpMStoreHandler;
impl OpcodeHandler for OpMStoreHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        let [offset, value] = frame.stack.pop()?;
        let offset = u256_to_usize(offset)?;
        frame.increase_consumed_gas(gas_cost::memory_access(
            calculate_memory_size(offset, WORD_SIZE_IN_BYTES_USIZE)?,
            frame.memory.len(),
        )?)?;
        frame.memory.store_word(offset, value)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `MSTORE8` opcode.
pub struct OpMStore8Handler;
impl OpcodeHandler for OpMStore8Handler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        let [offset, value] = frame.stack.pop()?;
        let offset = u256_to_usize(offset)?;
        frame.increase_consumed_gas(gas_cost::memory_access(
            calculate_memory_size(offset, 1)?,
            frame.memory.len(),
        )?)?;
        frame.memory.store_byte(offset, value.byte(0))?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `SLOAD` opcode.
pub struct OpSLoadHandler;
impl OpcodeHandler for OpSLoadHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let cost = vm.env.gas_schedule().sload;
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(cost)?;
        let key = u256_to_h256(frame.stack.pop1()?);
        let owner = frame.to;
        let value = vm.db.get_storage_slot(owner, key)?.current_value;
        vm.current_call_frame_mut()?.stack.push(value)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `SSTORE` opcode.
///
/// Writing a non-zero value into a zero slot costs `G_sset`, any other
/// write costs `G_sreset`; clearing a non-zero slot accrues the
/// `R_sclear` refund, capped at transaction end.
pub struct OpSStoreHandler;
impl OpcodeHandler for OpSStoreHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        if frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }
        let [key, new_value] = frame.stack.pop()?;
        let key = u256_to_h256(key);
        let owner = frame.to;

        let current_value = vm.db.get_storage_slot(owner, key)?.current_value;
        let cost = gas_cost::sstore(current_value, new_value);
        vm.current_call_frame_mut()?.increase_consumed_gas(cost)?;

        if !current_value.is_zero() && new_value.is_zero() {
            vm.substate.refunded_gas = vm
                .substate
                .refunded_gas
                .saturating_add(gas_cost::SSTORE_CLEAR_REFUND);
        }
        vm.db.update_storage_slot(owner, key, new_value)?;

        Ok(CONTINUE)
    }
}

/// Implementation for the `JUMPDEST` opcode.
pub struct OpJumpDestHandler;
impl OpcodeHandler for OpJumpDestHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        vm.current_call_frame_mut()?
            .increase_consumed_gas(gas_cost::JUMPDEST)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `JUMP` opcode.
pub struct OpJumpHandler;
impl OpcodeHandler for OpJumpHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::JUMP)?;
        let target = frame.stack.pop1()?;
        jump(vm, target)?;
        Ok(OpcodeResult::Continue { pc_increment: 0 })
    }
}

/// Implementation for the `JUMPI` opcode.
pub struct OpJumpIHandler;
impl OpcodeHandler for OpJumpIHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::JUMPI)?;
        let [target, condition] = frame.stack.pop()?;
        if condition.is_zero() {
            return Ok(CONTINUE);
        }
        jump(vm, target)?;
        Ok(OpcodeResult::Continue { pc_increment: 0 })
    }
}

/// Jumps may only land on a JUMPDEST that is not part of a push literal;
/// anything else halts the frame.
fn jump(vm: &mut VM<'_>, target: U256) -> Result<(), VMError> {
    let target = usize::try_from(target).map_err(|_| ExceptionalHalt::InvalidJump)?;
    let frame = vm.current_call_frame_mut()?;
    if !frame.is_valid_jump_target(target) {
        return Err(ExceptionalHalt::InvalidJump.into());
    }
    frame.pc = target;
    Ok(())
}
