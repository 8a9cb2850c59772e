//! # Environmental information operations
//!
//! Includes the following opcodes:
//!   - `ADDRESS`, `BALANCE`, `ORIGIN`, `CALLER`, `CALLVALUE`, `GASPRICE`
//!   - `CALLDATALOAD`, `CALLDATASIZE`, `CALLDATACOPY`
//!   - `CODESIZE`, `CODECOPY`, `EXTCODESIZE`, `EXTCODECOPY`
//!   - `RETURNDATASIZE`, `RETURNDATACOPY`

use crate::{
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    opcode_handlers::OpcodeHandler,
    utils::{address_to_word, size_offset_to_usize, u256_to_usize, word_to_address},
    vm::VM,
};
use ethereum_types::U256;

const CONTINUE: OpcodeResult = OpcodeResult::Continue { pc_increment: 1 };

/// Copies `size` bytes of `data` starting at `data_offset` into memory at
/// `dest_offset`, padding with zeros past the end of `data`.
fn copy_with_zero_fill(
    vm: &mut VM<'_>,
    dest_offset: usize,
    data_offset: usize,
    size: usize,
    data: &[u8],
) -> Result<(), VMError> {
    let mut buf = vec![0u8; size];
    if data_offset < data.len() {
        let end = data.len().min(data_offset.saturating_add(size));
        buf[..end - data_offset].copy_from_slice(&data[data_offset..end]);
    }
    vm.current_call_frame_mut()?.memory.store_data(dest_offset, &buf)
}

/// Implementation for the `ADDRESS` opcode: the account whose storage and
/// balance the code acts on.
pub struct OpAddressHandler;
impl OpcodeHandler for OpAddressHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::ADDRESS)?;
        let address = frame.to;
        frame.stack.push(address_to_word(address))?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `BALANCE` opcode.
pub struct OpBalanceHandler;
impl OpcodeHandler for OpBalanceHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let cost = vm.env.gas_schedule().balance;
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(cost)?;
        let address = word_to_address(frame.stack.pop1()?);
        let balance = vm.db.get_account(address)?.info.balance;
        vm.current_call_frame_mut()?.stack.push(balance)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `ORIGIN` opcode: the external transaction's
/// sender.
pub struct OpOriginHandler;
impl OpcodeHandler for OpOriginHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let origin = vm.env.origin;
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::ORIGIN)?;
        frame.stack.push(address_to_word(origin))?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `CALLER` opcode.
pub struct OpCallerHandler;
impl OpcodeHandler for OpCallerHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::CALLER)?;
        let caller = frame.msg_sender;
        frame.stack.push(address_to_word(caller))?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `CALLVALUE` opcode.
pub struct OpCallValueHandler;
impl OpcodeHandler for OpCallValueHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::CALLVALUE)?;
        let value = frame.msg_value;
        frame.stack.push(value)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `CALLDATALOAD` opcode: 32 bytes of calldata,
/// zero-padded past the end.
pub struct OpCallDataLoadHandler;
impl OpcodeHandler for OpCallDataLoadHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::CALLDATALOAD)?;
        let offset = usize::try_from(frame.stack.pop1()?).unwrap_or(usize::MAX);

        let mut word = [0u8; 32];
        for (i, slot) in word.iter_mut().enumerate() {
            *slot = frame
                .calldata
                .get(offset.saturating_add(i))
                .copied()
                .unwrap_or_default();
        }
        frame.stack.push(U256::from_big_endian(&word))?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `CALLDATASIZE` opcode.
pub struct OpCallDataSizeHandler;
impl OpcodeHandler for OpCallDataSizeHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::CALLDATASIZE)?;
        let size = frame.calldata.len();
        frame.stack.push(U256::from(size))?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `CALLDATACOPY` opcode.
pub struct OpCallDataCopyHandler;
impl OpcodeHandler for OpCallDataCopyHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        let [dest_offset, data_offset, size] = frame.stack.pop()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let data_offset = usize::try_from(data_offset).unwrap_or(usize::MAX);

        frame.increase_consumed_gas(gas_cost::copy_behavior(
            calculate_memory_size(dest_offset, size)?,
            frame.memory.len(),
            size,
            gas_cost::CALLDATACOPY_STATIC,
        )?)?;

        let data = frame.calldata.clone();
        copy_with_zero_fill(vm, dest_offset, data_offset, size, &data)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `CODESIZE` opcode.
pub struct OpCodeSizeHandler;
impl OpcodeHandler for OpCodeSizeHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::CODESIZE)?;
        let size = frame.bytecode.len();
        frame.stack.push(U256::from(size))?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `CODECOPY` opcode.
pub struct OpCodeCopyHandler;
impl OpcodeHandler for OpCodeCopyHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        let [dest_offset, code_offset, size] = frame.stack.pop()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let code_offset = usize::try_from(code_offset).unwrap_or(usize::MAX);

        frame.increase_consumed_gas(gas_cost::copy_behavior(
            calculate_memory_size(dest_offset, size)?,
            frame.memory.len(),
            size,
            gas_cost::CODECOPY_STATIC,
        )?)?;

        let code = frame.bytecode.clone();
        copy_with_zero_fill(vm, dest_offset, code_offset, size, &code)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `GASPRICE` opcode.
pub struct OpGasPriceHandler;
impl OpcodeHandler for OpGasPriceHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let gas_price = vm.env.gas_price;
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::GASPRICE)?;
        frame.stack.push(gas_price)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `EXTCODESIZE` opcode.
pub struct OpExtCodeSizeHandler;
impl OpcodeHandler for OpExtCodeSizeHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let cost = vm.env.gas_schedule().extcodesize;
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(cost)?;
        let address = word_to_address(frame.stack.pop1()?);
        let size = vm.db.get_account(address)?.code.len();
        vm.current_call_frame_mut()?.stack.push(U256::from(size))?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `EXTCODECOPY` opcode.
pub struct OpExtCodeCopyHandler;
impl OpcodeHandler for OpExtCodeCopyHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let base_cost = vm.env.gas_schedule().extcodecopy_base;
        let frame = vm.current_call_frame_mut()?;
        let [address, dest_offset, code_offset, size] = frame.stack.pop()?;
        let address = word_to_address(address);
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let code_offset = usize::try_from(code_offset).unwrap_or(usize::MAX);

        frame.increase_consumed_gas(gas_cost::copy_behavior(
            calculate_memory_size(dest_offset, size)?,
            frame.memory.len(),
            size,
            base_cost,
        )?)?;

        let code = vm.db.get_account(address)?.code.clone();
        copy_with_zero_fill(vm, dest_offset, code_offset, size, &code)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `RETURNDATASIZE` opcode.
pub struct OpReturnDataSizeHandler;
impl OpcodeHandler for OpReturnDataSizeHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::RETURNDATASIZE)?;
        let size = frame.sub_return_data.len();
        frame.stack.push(U256::from(size))?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `RETURNDATACOPY` opcode. Unlike the other copy
/// opcodes, reading past the end of the return data is a fault.
pub struct OpReturnDataCopyHandler;
impl OpcodeHandler for OpReturnDataCopyHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        let [dest_offset, data_offset, size] = frame.stack.pop()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let data_offset = u256_to_usize(data_offset).unwrap_or(usize::MAX);

        frame.increase_consumed_gas(gas_cost::copy_behavior(
            calculate_memory_size(dest_offset, size)?,
            frame.memory.len(),
            size,
            gas_cost::RETURNDATACOPY_STATIC,
        )?)?;

        let data = frame.sub_return_data.clone();
        let end = data_offset
            .checked_add(size)
            .ok_or(ExceptionalHalt::OutOfBounds)?;
        if end > data.len() {
            return Err(ExceptionalHalt::OutOfBounds.into());
        }
        vm.current_call_frame_mut()?
            .memory
            .store_data(dest_offset, &data[data_offset..end])?;
        Ok(CONTINUE)
    }
}
