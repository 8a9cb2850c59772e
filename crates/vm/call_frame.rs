use crate::{
    constants::STACK_LIMIT,
    errors::{ExceptionalHalt, VMError},
    memory::Memory,
    opcodes::Opcode,
};
use bytes::Bytes;
use ethereum_types::{Address, U256};
use hearth_common::types::TxLogEntry;
use rustc_hash::FxHashSet;

/// The 1024-word EVM operand stack.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    values: Vec<U256>,
}

impl Stack {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn push(&mut self, value: U256) -> Result<(), VMError> {
        if self.values.len() >= STACK_LIMIT {
            return Err(ExceptionalHalt::StackOverflow.into());
        }
        self.values.push(value);
        Ok(())
    }

    pub fn push_zero(&mut self) -> Result<(), VMError> {
        self.push(U256::zero())
    }

    pub fn pop1(&mut self) -> Result<U256, VMError> {
        self.values
            .pop()
            .ok_or(ExceptionalHalt::StackUnderflow.into())
    }

    /// Pops `N` values at once, top of the stack first.
    pub fn pop<const N: usize>(&mut self) -> Result<[U256; N], VMError> {
        if self.values.len() < N {
            return Err(ExceptionalHalt::StackUnderflow.into());
        }
        let mut popped = [U256::zero(); N];
        for value in popped.iter_mut() {
            *value = self.values.pop().ok_or(ExceptionalHalt::StackUnderflow)?;
        }
        Ok(popped)
    }

    /// Duplicates the `depth`-th value from the top (DUP1..DUP16).
    pub fn dup(&mut self, depth: usize) -> Result<(), VMError> {
        let index = self
            .values
            .len()
            .checked_sub(depth)
            .ok_or(ExceptionalHalt::StackUnderflow)?;
        let value = self.values[index];
        self.push(value)
    }

    /// Swaps the top with the `depth`-th value below it (SWAP1..SWAP16).
    pub fn swap(&mut self, depth: usize) -> Result<(), VMError> {
        let top = self
            .values
            .len()
            .checked_sub(1)
            .ok_or(ExceptionalHalt::StackUnderflow)?;
        let other = top
            .checked_sub(depth)
            .ok_or(ExceptionalHalt::StackUnderflow)?;
        self.values.swap(top, other);
        Ok(())
    }
}

/// Execution context of one call or creation, owning its stack, memory
/// and gas budget.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// Whose storage and balance the code acts on ("owner" address).
    pub to: Address,
    /// Where the running bytecode was loaded from. Differs from `to` for
    /// CALLCODE and DELEGATECALL.
    pub code_address: Address,
    pub msg_sender: Address,
    pub msg_value: U256,
    pub bytecode: Bytes,
    pub calldata: Bytes,
    pub gas_limit: u64,
    pub gas_remaining: u64,
    pub pc: usize,
    pub stack: Stack,
    pub memory: Memory,
    pub logs: Vec<TxLogEntry>,
    /// RETURN/REVERT payload of this frame.
    pub output: Bytes,
    /// Return data of the last completed subcall.
    pub sub_return_data: Bytes,
    pub is_static: bool,
    pub is_create: bool,
    pub depth: usize,
    /// Where the parent wants this frame's return data copied.
    pub ret_offset: usize,
    pub ret_size: usize,
    valid_jump_targets: FxHashSet<usize>,
}

impl CallFrame {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        msg_sender: Address,
        to: Address,
        code_address: Address,
        bytecode: Bytes,
        msg_value: U256,
        calldata: Bytes,
        is_static: bool,
        gas_limit: u64,
        depth: usize,
        is_create: bool,
        ret_offset: usize,
        ret_size: usize,
    ) -> Self {
        let valid_jump_targets = compute_valid_jump_targets(&bytecode);
        Self {
            msg_sender,
            to,
            code_address,
            bytecode,
            msg_value,
            calldata,
            gas_limit,
            gas_remaining: gas_limit,
            pc: 0,
            stack: Stack::default(),
            memory: Memory::new(),
            logs: Vec::new(),
            output: Bytes::new(),
            sub_return_data: Bytes::new(),
            is_static,
            is_create,
            depth,
            ret_offset,
            ret_size,
            valid_jump_targets,
        }
    }

    /// Charges gas against this frame, halting on exhaustion.
    pub fn increase_consumed_gas(&mut self, gas: u64) -> Result<(), VMError> {
        self.gas_remaining = self
            .gas_remaining
            .checked_sub(gas)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        Ok(())
    }

    pub fn gas_used(&self) -> u64 {
        self.gas_limit.saturating_sub(self.gas_remaining)
    }

    /// The byte at the program counter; running past the end is STOP.
    pub fn next_opcode(&self) -> u8 {
        self.bytecode
            .get(self.pc)
            .copied()
            .unwrap_or(Opcode::STOP as u8)
    }

    /// A jump may only land on a JUMPDEST that is not part of a push
    /// literal.
    pub fn is_valid_jump_target(&self, target: usize) -> bool {
        self.valid_jump_targets.contains(&target)
    }
}

/// Scans the bytecode for JUMPDEST positions, skipping push immediates.
fn compute_valid_jump_targets(bytecode: &[u8]) -> FxHashSet<usize> {
    let mut targets = FxHashSet::default();
    let mut pc = 0;
    while let Some(&byte) = bytecode.get(pc) {
        if byte == Opcode::JUMPDEST as u8 {
            targets.insert(pc);
        }
        let push_size = if (Opcode::PUSH1 as u8..=Opcode::PUSH32 as u8).contains(&byte) {
            (byte - Opcode::PUSH1 as u8) as usize + 1
        } else {
            0
        };
        pc += 1 + push_size;
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_limit_enforced() {
        let mut stack = Stack::default();
        for i in 0..STACK_LIMIT {
            stack.push(U256::from(i)).unwrap();
        }
        assert!(matches!(
            stack.push(U256::zero()),
            Err(VMError::ExceptionalHalt(ExceptionalHalt::StackOverflow))
        ));
    }

    #[test]
    fn stack_underflow_on_empty_pop() {
        let mut stack = Stack::default();
        assert!(matches!(
            stack.pop1(),
            Err(VMError::ExceptionalHalt(ExceptionalHalt::StackUnderflow))
        ));
    }

    #[test]
    fn multi_pop_order_is_top_first() {
        let mut stack = Stack::default();
        stack.push(U256::from(1)).unwrap();
        stack.push(U256::from(2)).unwrap();
        stack.push(U256::from(3)).unwrap();
        let [a, b] = stack.pop().unwrap();
        assert_eq!(a, U256::from(3));
        assert_eq!(b, U256::from(2));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn dup_and_swap() {
        let mut stack = Stack::default();
        stack.push(U256::from(10)).unwrap();
        stack.push(U256::from(20)).unwrap();
        stack.dup(2).unwrap();
        assert_eq!(stack.pop1().unwrap(), U256::from(10));
        stack.swap(1).unwrap();
        assert_eq!(stack.pop1().unwrap(), U256::from(10));
        assert_eq!(stack.pop1().unwrap(), U256::from(20));
    }

    #[test]
    fn jumpdest_inside_push_literal_is_invalid() {
        // PUSH2 0x5b5b JUMPDEST
        let bytecode = Bytes::from(vec![0x61, 0x5b, 0x5b, 0x5b]);
        let targets = compute_valid_jump_targets(&bytecode);
        assert!(!targets.contains(&1));
        assert!(!targets.contains(&2));
        assert!(targets.contains(&3));
    }
}
