//! # Logging operations (`LOG0` ... `LOG4`)

use crate::{
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    opcode_handlers::OpcodeHandler,
    utils::{size_offset_to_usize, u256_to_h256},
    vm::VM,
};
use bytes::Bytes;
use hearth_common::types::TxLogEntry;

/// Implementation for the `LOGN` opcodes, recording a log entry with `N`
/// topics.
pub struct OpLogHandler<const N: usize>;
impl<const N: usize> OpcodeHandler for OpLogHandler<N> {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        if frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let [offset, size] = frame.stack.pop()?;
        let (size, offset) = size_offset_to_usize(size, offset)?;
        let topics = frame.stack.pop::<N>()?;

        frame.increase_consumed_gas(gas_cost::log(
            calculate_memory_size(offset, size)?,
            frame.memory.len(),
            size,
            N as u64,
        )?)?;

        let data = frame.memory.load_range(offset, size)?;
        let log = TxLogEntry {
            address: frame.to,
            topics: topics.into_iter().map(u256_to_h256).collect(),
            data: Bytes::from(data),
        };
        frame.logs.push(log);

        Ok(OpcodeResult::Continue { pc_increment: 1 })
    }
}
