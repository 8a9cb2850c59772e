//! # Arithmetic operations
//!
//! Includes the following opcodes:
//!   - `ADD`
//!   - `SUB`
//!   - `MUL`
//!   - `DIV`
//!   - `SDIV`
//!   - `MOD`
//!   - `SMOD`
//!   - `ADDMOD`
//!   - `MULMOD`
//!   - `EXP`
//!   - `SIGNEXTEND`

use crate::{
    errors::{InternalError, OpcodeResult, VMError},
    gas_cost,
    opcode_handlers::OpcodeHandler,
    vm::VM,
};
use ethereum_types::{U256, U512};

const CONTINUE: OpcodeResult = OpcodeResult::Continue { pc_increment: 1 };

/// Implementation for the `ADD` opcode.
pub struct OpAddHandler;
impl OpcodeHandler for OpAddHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::ADD)?;

        let [lhs, rhs] = frame.stack.pop()?;
        let (res, _) = lhs.overflowing_add(rhs);
        frame.stack.push(res)?;

        Ok(CONTINUE)
    }
}

/// Implementation for the `SUB` opcode.
pub struct OpSubHandler;
impl OpcodeHandler for OpSubHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::SUB)?;

        let [lhs, rhs] = frame.stack.pop()?;
        let (res, _) = lhs.overflowing_sub(rhs);
        frame.stack.push(res)?;

        Ok(CONTINUE)
    }
}

/// Implementation for the `MUL` opcode.
pub struct OpMulHandler;
impl OpcodeHandler for OpMulHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::MUL)?;

        let [lhs, rhs] = frame.stack.pop()?;
        let (res, _) = lhs.overflowing_mul(rhs);
        frame.stack.push(res)?;

        Ok(CONTINUE)
    }
}

/// Implementation for the `DIV` opcode. Division by zero yields zero.
pub struct OpDivHandler;
impl OpcodeHandler for OpDivHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::DIV)?;

        let [lhs, rhs] = frame.stack.pop()?;
        match lhs.checked_div(rhs) {
            Some(res) => frame.stack.push(res)?,
            None => frame.stack.push_zero()?,
        }

        Ok(CONTINUE)
    }
}

fn twos_complement(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

/// Implementation for the `SDIV` opcode.
pub struct OpSDivHandler;
impl OpcodeHandler for OpSDivHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::SDIV)?;

        let [mut lhs, mut rhs] = frame.stack.pop()?;
        let mut negative = false;
        if lhs.bit(255) {
            lhs = twos_complement(lhs);
            negative = !negative;
        }
        if rhs.bit(255) {
            rhs = twos_complement(rhs);
            negative = !negative;
        }

        match lhs.checked_div(rhs) {
            Some(mut res) => {
                if negative {
                    res = twos_complement(res);
                }
                frame.stack.push(res)?
            }
            None => frame.stack.push_zero()?,
        }

        Ok(CONTINUE)
    }
}

/// Implementation for the `MOD` opcode. Modulo zero yields zero.
pub struct OpModHandler;
impl OpcodeHandler for OpModHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::MOD)?;

        let [lhs, rhs] = frame.stack.pop()?;
        match lhs.checked_rem(rhs) {
            Some(res) => frame.stack.push(res)?,
            None => frame.stack.push_zero()?,
        }

        Ok(CONTINUE)
    }
}

/// Implementation for the `SMOD` opcode. The result takes the sign of the
/// dividend.
pub struct OpSModHandler;
impl OpcodeHandler for OpSModHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::SMOD)?;

        let [mut lhs, mut rhs] = frame.stack.pop()?;
        let negative = lhs.bit(255);
        if negative {
            lhs = twos_complement(lhs);
        }
        if rhs.bit(255) {
            rhs = twos_complement(rhs);
        }

        match lhs.checked_rem(rhs) {
            Some(mut res) => {
                if negative {
                    res = twos_complement(res);
                }
                frame.stack.push(res)?
            }
            None => frame.stack.push_zero()?,
        }

        Ok(CONTINUE)
    }
}

fn u512_to_u256(value: U512) -> Result<U256, VMError> {
    value
        .try_into()
        .map_err(|_| InternalError::TypeConversion.into())
}

/// Implementation for the `ADDMOD` opcode. The addition is performed with
/// 512-bit intermediates, so it does not wrap before the reduction.
pub struct OpAddModHandler;
impl OpcodeHandler for OpAddModHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::ADDMOD)?;

        let [lhs, rhs, modulus] = frame.stack.pop()?;
        if modulus.is_zero() {
            frame.stack.push_zero()?;
        } else {
            let sum = U512::from(lhs) + U512::from(rhs);
            let res = sum % U512::from(modulus);
            let res = u512_to_u256(res)?;
            frame.stack.push(res)?;
        }

        Ok(CONTINUE)
    }
}

/// Implementation for the `MULMOD` opcode.
pub struct OpMulModHandler;
impl OpcodeHandler for OpMulModHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::MULMOD)?;

        let [lhs, rhs, modulus] = frame.stack.pop()?;
        if modulus.is_zero() {
            frame.stack.push_zero()?;
        } else {
            let product = lhs.full_mul(rhs);
            let res = product % U512::from(modulus);
            let res = u512_to_u256(res)?;
            frame.stack.push(res)?;
        }

        Ok(CONTINUE)
    }
}

/// Implementation for the `EXP` opcode. The dynamic cost scales with the
/// byte length of the exponent.
pub struct OpExpHandler;
impl OpcodeHandler for OpExpHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let schedule = vm.env.gas_schedule();
        let frame = vm.current_call_frame_mut()?;
        let [base, exponent] = frame.stack.pop()?;
        frame.increase_consumed_gas(gas_cost::exp(exponent, schedule)?)?;

        let (res, _) = base.overflowing_pow(exponent);
        frame.stack.push(res)?;

        Ok(CONTINUE)
    }
}

/// Implementation for the `SIGNEXTEND` opcode.
pub struct OpSignExtendHandler;
impl OpcodeHandler for OpSignExtendHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::SIGNEXTEND)?;

        let [index, mut value] = frame.stack.pop()?;
        frame.stack.push(match usize::try_from(index) {
            Ok(index) if index < 31 => {
                let sign_bit = 8 * index + 7;
                if value.bit(sign_bit) {
                    value |= U256::MAX << (sign_bit + 1);
                } else {
                    value &= (U256::one() << (sign_bit + 1)) - 1;
                }
                value
            }
            _ => value,
        })?;

        Ok(CONTINUE)
    }
}
