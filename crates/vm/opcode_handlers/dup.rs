//! # Duplication operations (`DUP1` ... `DUP16`)

use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    opcode_handlers::OpcodeHandler,
    vm::VM,
};

/// Implementation for the `DUPN` opcodes.
pub struct OpDupHandler<const N: usize>;
impl<const N: usize> OpcodeHandler for OpDupHandler<N> {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::DUPN)?;
        frame.stack.dup(N)?;
        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}
