//! # Hashing (`KECCAK256`)

use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    opcode_handlers::OpcodeHandler,
    utils::size_offset_to_usize,
    vm::VM,
};
use ethereum_types::U256;
use hearth_common::crypto::keccak;

/// Implementation for the `KECCAK256` opcode.
pub struct OpKeccakHandler;
impl OpcodeHandler for OpKeccakHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        let [offset, size] = frame.stack.pop()?;
        let (size, offset) = size_offset_to_usize(size, offset)?;

        frame.increase_consumed_gas(gas_cost::keccak256(
            calculate_memory_size(offset, size)?,
            frame.memory.len(),
            size,
        )?)?;

        let data = frame.memory.load_range(offset, size)?;
        let hash = keccak(&data);
        frame.stack.push(U256::from_big_endian(hash.as_bytes()))?;

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}
