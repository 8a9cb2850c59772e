//! # Comparison and bitwise operations
//!
//! Includes the following opcodes:
//!   - `LT`, `GT`, `SLT`, `SGT`, `EQ`, `ISZERO`
//!   - `AND`, `OR`, `XOR`, `NOT`
//!   - `BYTE`
//!   - `SHL`, `SHR`, `SAR`

use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    opcode_handlers::OpcodeHandler,
    vm::VM,
};
use ethereum_types::U256;
use std::cmp::Ordering;

const CONTINUE: OpcodeResult = OpcodeResult::Continue { pc_increment: 1 };

fn push_bool(vm: &mut VM<'_>, value: bool) -> Result<(), VMError> {
    let frame = vm.current_call_frame_mut()?;
    if value {
        frame.stack.push(U256::one())
    } else {
        frame.stack.push_zero()
    }
}

/// Two's-complement ordering: a negative value compares below any
/// non-negative one; within a sign class the unsigned order holds.
fn signed_cmp(lhs: U256, rhs: U256) -> Ordering {
    match (lhs.bit(255), rhs.bit(255)) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => lhs.cmp(&rhs),
    }
}

/// Implementation for the `LT` opcode.
pub struct OpLtHandler;
impl OpcodeHandler for OpLtHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::LT)?;
        let [lhs, rhs] = frame.stack.pop()?;
        push_bool(vm, lhs < rhs)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `GT` opcode.
pub struct OpGtHandler;
impl OpcodeHandler for OpGtHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::GT)?;
        let [lhs, rhs] = frame.stack.pop()?;
        push_bool(vm, lhs > rhs)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `SLT` opcode.
pub struct OpSltHandler;
impl OpcodeHandler for OpSltHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::SLT)?;
        let [lhs, rhs] = frame.stack.pop()?;
        push_bool(vm, signed_cmp(lhs, rhs) == Ordering::Less)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `SGT` opcode.
pub struct OpSgtHandler;
impl OpcodeHandler for OpSgtHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::SGT)?;
        let [lhs, rhs] = frame.stack.pop()?;
        push_bool(vm, signed_cmp(lhs, rhs) == Ordering::Greater)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `EQ` opcode.
pub struct OpEqHandler;
impl OpcodeHandler for OpEqHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::EQ)?;
        let [lhs, rhs] = frame.stack.pop()?;
        push_bool(vm, lhs == rhs)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `ISZERO` opcode.
pub struct OpIsZeroHandler;
impl OpcodeHandler for OpIsZeroHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::ISZERO)?;
        let value = frame.stack.pop1()?;
        push_bool(vm, value.is_zero())?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `AND` opcode.
pub struct OpAndHandler;
impl OpcodeHandler for OpAndHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::AND)?;
        let [lhs, rhs] = frame.stack.pop()?;
        frame.stack.push(lhs & rhs)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `OR` opcode.
pub struct OpOrHandler;
impl OpcodeHandler for OpOrHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::OR)?;
        let [lhs, rhs] = frame.stack.pop()?;
        frame.stack.push(lhs | rhs)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `XOR` opcode.
pub struct OpXorHandler;
impl OpcodeHandler for OpXorHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::XOR)?;
        let [lhs, rhs] = frame.stack.pop()?;
        frame.stack.push(lhs ^ rhs)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `NOT` opcode.
pub struct OpNotHandler;
impl OpcodeHandler for OpNotHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::NOT)?;
        let value = frame.stack.pop1()?;
        frame.stack.push(!value)?;
        Ok(CONTINUE)
    }
}

/// Implementation for the `BYTE` opcode: the `index`-th byte of `value`,
/// counted from the most significant end.
pub struct OpByteHandler;
impl OpcodeHandler for OpByteHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::BYTE)?;
        let [index, value] = frame.stack.pop()?;
        match usize::try_from(index) {
            Ok(index) if index < 32 => frame.stack.push(U256::from(value.byte(31 - index)))?,
            _ => frame.stack.push_zero()?,
        }
        Ok(CONTINUE)
    }
}

/// Implementation for the `SHL` opcode.
pub struct OpShlHandler;
impl OpcodeHandler for OpShlHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::SHL)?;
        let [shift, value] = frame.stack.pop()?;
        if shift < U256::from(256) {
            frame.stack.push(value << shift.low_u64() as usize)?;
        } else {
            frame.stack.push_zero()?;
        }
        Ok(CONTINUE)
    }
}

/// Implementation for the `SHR` opcode.
pub struct OpShrHandler;
impl OpcodeHandler for OpShrHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::SHR)?;
        let [shift, value] = frame.stack.pop()?;
        if shift < U256::from(256) {
            frame.stack.push(value >> shift.low_u64() as usize)?;
        } else {
            frame.stack.push_zero()?;
        }
        Ok(CONTINUE)
    }
}

/// Implementation for the `SAR` opcode: shift right, replicating the sign
/// bit into the vacated positions.
pub struct OpSarHandler;
impl OpcodeHandler for OpSarHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::SAR)?;
        let [shift, value] = frame.stack.pop()?;
        let negative = value.bit(255);
        let result = if shift >= U256::from(256) {
            if negative {
                U256::MAX
            } else {
                U256::zero()
            }
        } else {
            let shift = shift.low_u64() as usize;
            let shifted = value >> shift;
            if negative && shift > 0 {
                shifted | (U256::MAX << (256 - shift))
            } else {
                shifted
            }
        };
        frame.stack.push(result)?;
        Ok(CONTINUE)
    }
}
