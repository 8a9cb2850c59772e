//! # Exchange operations (`SWAP1` ... `SWAP16`)

use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    opcode_handlers::OpcodeHandler,
    vm::VM,
};

/// Implementation for the `SWAPN` opcodes.
pub struct OpSwapHandler<const N: usize>;
impl<const N: usize> OpcodeHandler for OpSwapHandler<N> {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(gas_cost::SWAPN)?;
        frame.stack.swap(N)?;
        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}
