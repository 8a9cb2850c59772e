//! # Push operations (`PUSH1` ... `PUSH32`)

use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    opcode_handlers::OpcodeHandler,
    vm::VM,
};
use ethereum_types::U256;

/// Implementation for the `PUSHN` opcodes. Immediates running past the
/// end of the code read as zeros.
pub struct OpPushHandler<const N: usize>;
impl<const N: usize> OpcodeHandler for OpPushHandler<N> {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::PUSHN)?;

        let start = frame.pc + 1;
        let mut buf = [0u8; 32];
        for (i, slot) in buf[32 - N..].iter_mut().enumerate() {
            *slot = frame.bytecode.get(start + i).copied().unwrap_or_default();
        }
        frame.stack.push(U256::from_big_endian(&buf))?;

        Ok(OpcodeResult::Continue { pc_increment: N + 1 })
    }
}
