//! # System operations
//!
//! Includes the following opcodes:
//!   - `CALL`
//!   - `CALLCODE`
//!   - `DELEGATECALL`
//!   - `STATICCALL`
//!   - `CREATE`
//!   - `RETURN`
//!   - `REVERT`
//!   - `SELFDESTRUCT`

use crate::{
    call_frame::CallFrame,
    constants::{FAIL, MAX_CALL_DEPTH, SUCCESS},
    errors::{ExceptionalHalt, InternalError, OpcodeResult, VMError},
    gas_cost,
    memory::calculate_memory_size,
    opcode_handlers::OpcodeHandler,
    precompiles,
    utils::{address_to_word, calculate_create_address, size_offset_to_usize, word_to_address},
    vm::VM,
};
use bytes::Bytes;
use ethereum_types::{Address, U256};
use hearth_common::types::Fork;

pub struct OpCallHandler;
impl OpcodeHandler for OpCallHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let schedule = vm.env.gas_schedule();
        let fork = vm.env.fork;
        let frame = vm.current_call_frame_mut()?;
        let [gas, callee, value, args_offset, args_len, ret_offset, ret_len] = frame.stack.pop()?;
        let callee = word_to_address(callee);
        let (args_len, args_offset) = size_offset_to_usize(args_len, args_offset)?;
        let (ret_len, ret_offset) = size_offset_to_usize(ret_len, ret_offset)?;

        if frame.is_static && !value.is_zero() {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let new_memory_size =
            calculate_memory_size(args_offset, args_len)?.max(calculate_memory_size(ret_offset, ret_len)?);
        let current_memory_size = frame.memory.len();
        let gas_remaining = frame.gas_remaining;
        let is_static = frame.is_static;
        let msg_sender = frame.to;

        // A value transfer that brings the target to life pays the
        // new-account surcharge; EIP-158 widened "dead" to include
        // existing empty accounts.
        let charge_new_account = if value.is_zero() {
            false
        } else if fork >= Fork::SpuriousDragon {
            vm.db.account_is_absent(callee)? || vm.db.get_account(callee)?.is_empty()
        } else {
            vm.db.account_is_absent(callee)?
        };

        let (cost, child_gas) = gas_cost::call(
            new_memory_size,
            current_memory_size,
            !value.is_zero(),
            charge_new_account,
            gas,
            gas_remaining,
            schedule,
        )?;

        let frame = vm.current_call_frame_mut()?;
        frame.increase_consumed_gas(cost)?;
        // Expand eagerly: the return window must exist once the child
        // frame completes.
        frame.memory.resize(new_memory_size)?;
        let calldata = Bytes::from(frame.memory.load_range(args_offset, args_len)?);

        vm.generic_call(
            child_gas, value, msg_sender, callee, callee, true, is_static, calldata, ret_offset,
            ret_len,
        )
    }
}

pub struct OpCallCodeHandler;
impl OpcodeHandler for OpCallCodeHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let schedule = vm.env.gas_schedule();
        let frame = vm.current_call_frame_mut()?;
        let [gas, code_source, value, args_offset, args_len, ret_offset, ret_len] =
            frame.stack.pop()?;
        let code_source = word_to_address(code_source);
        let (args_len, args_offset) = size_offset_to_usize(args_len, args_offset)?;
        let (ret_len, ret_offset) = size_offset_to_usize(ret_len, ret_offset)?;

        let new_memory_size =
            calculate_memory_size(args_offset, args_len)?.max(calculate_memory_size(ret_offset, ret_len)?);

        // Runs foreign code against the caller's own storage and balance:
        // value is checked but never leaves the account, and no
        // new-account charge applies.
        let (cost, child_gas) = gas_cost::call(
            new_memory_size,
            frame.memory.len(),
            !value.is_zero(),
            false,
            gas,
            frame.gas_remaining,
            schedule,
        )?;

        frame.increase_consumed_gas(cost)?;
        frame.memory.resize(new_memory_size)?;
        let calldata = Bytes::from(frame.memory.load_range(args_offset, args_len)?);
        let owner = frame.to;
        let is_static = frame.is_static;

        vm.generic_call(
            child_gas,
            value,
            owner,
            owner,
            code_source,
            true,
            is_static,
            calldata,
            ret_offset,
            ret_len,
        )
    }
}

pub struct OpDelegateCallHandler;
impl OpcodeHandler for OpDelegateCallHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let schedule = vm.env.gas_schedule();
        let frame = vm.current_call_frame_mut()?;
        let [gas, code_source, args_offset, args_len, ret_offset, ret_len] = frame.stack.pop()?;
        let code_source = word_to_address(code_source);
        let (args_len, args_offset) = size_offset_to_usize(args_len, args_offset)?;
        let (ret_len, ret_offset) = size_offset_to_usize(ret_len, ret_offset)?;

        let new_memory_size =
            calculate_memory_size(args_offset, args_len)?.max(calculate_memory_size(ret_offset, ret_len)?);

        // The parent's caller and value pass through unchanged; no value
        // moves and no stipend is granted.
        let (cost, child_gas) = gas_cost::call(
            new_memory_size,
            frame.memory.len(),
            false,
            false,
            gas,
            frame.gas_remaining,
            schedule,
        )?;

        frame.increase_consumed_gas(cost)?;
        frame.memory.resize(new_memory_size)?;
        let calldata = Bytes::from(frame.memory.load_range(args_offset, args_len)?);
        let owner = frame.to;
        let parent_caller = frame.msg_sender;
        let parent_value = frame.msg_value;
        let is_static = frame.is_static;

        vm.generic_call(
            child_gas,
            parent_value,
            parent_caller,
            owner,
            code_source,
            false,
            is_static,
            calldata,
            ret_offset,
            ret_len,
        )
    }
}

pub struct OpStaticCallHandler;
impl OpcodeHandler for OpStaticCallHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let schedule = vm.env.gas_schedule();
        let frame = vm.current_call_frame_mut()?;
        let [gas, callee, args_offset, args_len, ret_offset, ret_len] = frame.stack.pop()?;
        let callee = word_to_address(callee);
        let (args_len, args_offset) = size_offset_to_usize(args_len, args_offset)?;
        let (ret_len, ret_offset) = size_offset_to_usize(ret_len, ret_offset)?;

        let new_memory_size =
            calculate_memory_size(args_offset, args_len)?.max(calculate_memory_size(ret_offset, ret_len)?);

        let (cost, child_gas) = gas_cost::call(
            new_memory_size,
            frame.memory.len(),
            false,
            false,
            gas,
            frame.gas_remaining,
            schedule,
        )?;

        frame.increase_consumed_gas(cost)?;
        frame.memory.resize(new_memory_size)?;
        let calldata = Bytes::from(frame.memory.load_range(args_offset, args_len)?);
        let msg_sender = frame.to;

        vm.generic_call(
            child_gas,
            U256::zero(),
            msg_sender,
            callee,
            callee,
            false,
            true,
            calldata,
            ret_offset,
            ret_len,
        )
    }
}

pub struct OpReturnHandler;
impl OpcodeHandler for OpReturnHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        let [offset, size] = frame.stack.pop()?;
        let (size, offset) = size_offset_to_usize(size, offset)?;

        frame.increase_consumed_gas(gas_cost::exit_opcode(
            calculate_memory_size(offset, size)?,
            frame.memory.len(),
        )?)?;

        if size != 0 {
            frame.output = Bytes::from(frame.memory.load_range(offset, size)?);
        }

        Ok(OpcodeResult::Halt)
    }
}

pub struct OpRevertHandler;
impl OpcodeHandler for OpRevertHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        let [offset, size] = frame.stack.pop()?;
        let (size, offset) = size_offset_to_usize(size, offset)?;

        frame.increase_consumed_gas(gas_cost::exit_opcode(
            calculate_memory_size(offset, size)?,
            frame.memory.len(),
        )?)?;

        if size != 0 {
            frame.output = Bytes::from(frame.memory.load_range(offset, size)?);
        }

        Err(VMError::RevertOpcode)
    }
}

pub struct OpCreateHandler;
impl OpcodeHandler for OpCreateHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let frame = vm.current_call_frame_mut()?;
        if frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }
        let [value, code_offset, code_len] = frame.stack.pop()?;
        let (code_len, code_offset) = size_offset_to_usize(code_len, code_offset)?;

        frame.increase_consumed_gas(gas_cost::create(
            calculate_memory_size(code_offset, code_len)?,
            frame.memory.len(),
        )?)?;

        let init_code = Bytes::from(frame.memory.load_range(code_offset, code_len)?);
        vm.generic_create(value, init_code)
    }
}

pub struct OpSelfDestructHandler;
impl OpcodeHandler for OpSelfDestructHandler {
    fn eval(vm: &mut VM<'_>) -> Result<OpcodeResult, VMError> {
        let schedule = vm.env.gas_schedule();
        let fork = vm.env.fork;
        let frame = vm.current_call_frame_mut()?;
        if frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }
        let beneficiary = word_to_address(frame.stack.pop1()?);
        let owner = frame.to;

        let balance = vm.db.get_account(owner)?.info.balance;
        // Tangerine added the base cost; the new-account surcharge follows
        // the same "dead account" refinement as CALL under EIP-158.
        let charge_new_account = if fork >= Fork::SpuriousDragon {
            !balance.is_zero()
                && (vm.db.account_is_absent(beneficiary)?
                    || vm.db.get_account(beneficiary)?.is_empty())
        } else {
            vm.db.account_is_absent(beneficiary)?
        };
        let cost = gas_cost::selfdestruct(schedule, charge_new_account);
        vm.current_call_frame_mut()?.increase_consumed_gas(cost)?;

        // The refund applies once per destroyed account.
        if !vm.substate.selfdestruct_set.contains(&owner) {
            vm.substate.refunded_gas = vm
                .substate
                .refunded_gas
                .saturating_add(gas_cost::SELFDESTRUCT_REFUND);
        }

        // The whole balance moves now; the account entry itself is
        // removed at the end of the transaction.
        vm.db.increase_account_balance(beneficiary, balance)?;
        vm.db.get_account_mut(owner)?.info.balance = U256::zero();
        vm.substate.selfdestruct_set.insert(owner);
        vm.substate.touched_accounts.insert(beneficiary);

        Ok(OpcodeResult::Halt)
    }
}

impl<'a> VM<'a> {
    /// Shared tail of the CALL family: validates balance and depth,
    /// short-circuits precompiles, and otherwise suspends the parent and
    /// pushes the child frame.
    #[allow(clippy::too_many_arguments)]
    pub fn generic_call(
        &mut self,
        gas_limit: u64,
        value: U256,
        msg_sender: Address,
        to: Address,
        code_address: Address,
        should_transfer_value: bool,
        is_static: bool,
        calldata: Bytes,
        ret_offset: usize,
        ret_size: usize,
    ) -> Result<OpcodeResult, VMError> {
        self.current_call_frame_mut()?.sub_return_data = Bytes::new();

        // Failure conditions that refund the forwarded gas: not enough
        // balance for the transfer, or the depth limit.
        if should_transfer_value && !value.is_zero() {
            let sender_balance = self.db.get_account(msg_sender)?.info.balance;
            if sender_balance < value {
                self.early_revert_message_call(gas_limit)?;
                return Ok(OpcodeResult::Continue { pc_increment: 1 });
            }
        }
        let new_depth = self
            .current_call_frame()?
            .depth
            .checked_add(1)
            .ok_or(InternalError::Overflow)?;
        if new_depth > MAX_CALL_DEPTH {
            self.early_revert_message_call(gas_limit)?;
            return Ok(OpcodeResult::Continue { pc_increment: 1 });
        }

        self.substate.touched_accounts.insert(to);

        if precompiles::is_precompile(&code_address) {
            match precompiles::execute_precompile(code_address, &calldata, gas_limit) {
                Ok((output, gas_used)) => {
                    if should_transfer_value {
                        self.db.transfer(msg_sender, to, value)?;
                    }
                    let frame = self.current_call_frame_mut()?;
                    let unused = gas_limit
                        .checked_sub(gas_used)
                        .ok_or(InternalError::Underflow)?;
                    frame.gas_remaining = frame
                        .gas_remaining
                        .checked_add(unused)
                        .ok_or(InternalError::Overflow)?;
                    let copy_len = output.len().min(ret_size);
                    frame.memory.store_data(ret_offset, &output[..copy_len])?;
                    frame.sub_return_data = output;
                    frame.stack.push(U256::from(SUCCESS))?;
                }
                Err(err) if err.should_propagate() => return Err(err),
                Err(_) => {
                    // The forwarded gas is gone; the caller only learns
                    // the call failed.
                    self.current_call_frame_mut()?.stack.push(U256::from(FAIL))?;
                }
            }
            return Ok(OpcodeResult::Continue { pc_increment: 1 });
        }

        let bytecode = self.db.get_account(code_address)?.code.clone();

        self.push_checkpoint();
        // The parent resumes right after the call opcode.
        self.current_call_frame_mut()?.pc += 1;

        let new_frame = CallFrame::new(
            msg_sender,
            to,
            code_address,
            bytecode,
            value,
            calldata,
            is_static,
            gas_limit,
            new_depth,
            false,
            ret_offset,
            ret_size,
        );
        self.call_frames.push(new_frame);

        if should_transfer_value {
            self.db.transfer(msg_sender, to, value)?;
        }

        Ok(OpcodeResult::Continue { pc_increment: 0 })
    }

    /// CREATE: derives the contract address from the deployer's nonce,
    /// reserves all forwardable gas and runs the init code in a child
    /// frame.
    pub fn generic_create(&mut self, value: U256, init_code: Bytes) -> Result<OpcodeResult, VMError> {
        let schedule = self.env.gas_schedule();
        let fork = self.env.fork;

        let frame = self.current_call_frame_mut()?;
        let child_gas = gas_cost::max_message_call_gas(frame.gas_remaining, schedule);
        frame.increase_consumed_gas(child_gas)?;
        let deployer = frame.to;
        let new_depth = frame.depth.checked_add(1).ok_or(InternalError::Overflow)?;

        let (deployer_balance, deployer_nonce) = {
            let account = self.db.get_account(deployer)?;
            (account.info.balance, account.info.nonce)
        };

        // Failures that return the reserved gas and push 0.
        if deployer_balance < value || new_depth > MAX_CALL_DEPTH || deployer_nonce == u64::MAX {
            self.early_revert_message_call(child_gas)?;
            return Ok(OpcodeResult::Continue { pc_increment: 1 });
        }

        // The nonce bump is not undone by a failing deployment.
        self.db.increment_account_nonce(deployer)?;
        let new_address = calculate_create_address(deployer, deployer_nonce);
        self.substate.touched_accounts.insert(new_address);

        // Deploying over an account with code or a nonce fails and keeps
        // the reserved gas consumed.
        if self.db.get_account(new_address)?.create_would_collide() {
            self.current_call_frame_mut()?.stack.push(U256::from(FAIL))?;
            return Ok(OpcodeResult::Continue { pc_increment: 1 });
        }

        self.push_checkpoint();
        self.current_call_frame_mut()?.pc += 1;

        let new_frame = CallFrame::new(
            deployer,
            new_address,
            new_address,
            init_code,
            value,
            Bytes::new(),
            false,
            child_gas,
            new_depth,
            true,
            0,
            0,
        );
        self.call_frames.push(new_frame);

        if fork >= Fork::SpuriousDragon {
            self.db.get_account_mut(new_address)?.info.nonce = 1;
        }
        self.db.transfer(deployer, new_address, value)?;

        Ok(OpcodeResult::Continue { pc_increment: 0 })
    }

    /// Pushes 0 and hands the reserved gas back to the caller, for call
    /// failures detected before a child frame exists.
    fn early_revert_message_call(&mut self, gas_limit: u64) -> Result<(), VMError> {
        let frame = self.current_call_frame_mut()?;
        frame.gas_remaining = frame
            .gas_remaining
            .checked_add(gas_limit)
            .ok_or(InternalError::Overflow)?;
        frame.stack.push(U256::from(FAIL))?;
        Ok(())
    }

    /// Handles the child-to-parent interaction once a message call frame
    /// completed.
    pub(crate) fn handle_return_call(
        &mut self,
        child: CallFrame,
        ctx_result: &crate::errors::ContextResult,
    ) -> Result<(), VMError> {
        let parent = self.current_call_frame_mut()?;

        let unused_gas = child
            .gas_limit
            .checked_sub(ctx_result.gas_used)
            .ok_or(InternalError::Underflow)?;
        parent.gas_remaining = parent
            .gas_remaining
            .checked_add(unused_gas)
            .ok_or(InternalError::Overflow)?;

        let copy_len = ctx_result.output.len().min(child.ret_size);
        parent
            .memory
            .store_data(child.ret_offset, &ctx_result.output[..copy_len])?;
        parent.sub_return_data = ctx_result.output.clone();

        if ctx_result.is_success() {
            parent.logs.extend(child.logs);
            parent.stack.push(U256::from(SUCCESS))?;
        } else {
            parent.stack.push(U256::from(FAIL))?;
        }
        Ok(())
    }

    /// Handles the child-to-parent interaction once a creation frame
    /// completed: the new address is pushed on success, 0 on failure.
    pub(crate) fn handle_return_create(
        &mut self,
        child: CallFrame,
        ctx_result: &crate::errors::ContextResult,
    ) -> Result<(), VMError> {
        let parent = self.current_call_frame_mut()?;

        let unused_gas = child
            .gas_limit
            .checked_sub(ctx_result.gas_used)
            .ok_or(InternalError::Underflow)?;
        parent.gas_remaining = parent
            .gas_remaining
            .checked_add(unused_gas)
            .ok_or(InternalError::Overflow)?;

        match &ctx_result.result {
            crate::errors::TxResult::Success => {
                parent.logs.extend(child.logs);
                parent.stack.push(address_to_word(child.to))?;
            }
            crate::errors::TxResult::Revert(err) => {
                if matches!(err, VMError::RevertOpcode) {
                    parent.sub_return_data = ctx_result.output.clone();
                }
                parent.stack.push(U256::from(FAIL))?;
            }
        }
        Ok(())
    }
}
