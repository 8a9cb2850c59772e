use crate::{
    call_frame::CallFrame,
    constants::MAX_CODE_SIZE,
    db::{DbCheckpoint, GeneralizedDatabase},
    environment::Environment,
    errors::{
        ContextResult, ExceptionalHalt, ExecutionReport, InternalError, OpcodeResult, TxResult,
        TxValidationError, VMError,
    },
    gas_cost,
    opcode_handlers::{
        arithmetic::*, bitwise_comparison::*, block::*, dup::OpDupHandler, environment::*,
        exchange::OpSwapHandler, keccak::OpKeccakHandler, logging::OpLogHandler,
        push::OpPushHandler, stack_memory_storage_flow::*, system::*, OpInvalidHandler,
        OpStopHandler, OpcodeHandler,
    },
    opcodes::Opcode,
    precompiles,
    utils::calculate_create_address,
};
use bytes::Bytes;
use ethereum_types::{Address, U256};
use hearth_common::types::{Fork, Transaction, TxKind};
use rustc_hash::FxHashSet;

/// Accrued side effects of the running transaction: accounts doomed by
/// SELFDESTRUCT, accounts touched (for EIP-158 clearing) and the refund
/// counter.
#[derive(Debug, Clone, Default)]
pub struct Substate {
    pub selfdestruct_set: FxHashSet<Address>,
    pub touched_accounts: FxHashSet<Address>,
    pub refunded_gas: u64,
}

/// The EVM: executes one external transaction against the transactional
/// world state.
pub struct VM<'a> {
    pub call_frames: Vec<CallFrame>,
    pub env: Environment,
    pub substate: Substate,
    pub db: &'a mut GeneralizedDatabase,
    pub tx: Transaction,
    checkpoints: Vec<(DbCheckpoint, Substate)>,
}

impl<'a> VM<'a> {
    pub fn new(env: Environment, db: &'a mut GeneralizedDatabase, tx: &Transaction) -> Self {
        Self {
            call_frames: vec![],
            env,
            substate: Substate::default(),
            db,
            tx: tx.clone(),
            checkpoints: vec![],
        }
    }

    pub fn current_call_frame(&self) -> Result<&CallFrame, VMError> {
        self.call_frames
            .last()
            .ok_or(InternalError::EmptyCallFrames.into())
    }

    pub fn current_call_frame_mut(&mut self) -> Result<&mut CallFrame, VMError> {
        self.call_frames
            .last_mut()
            .ok_or(InternalError::EmptyCallFrames.into())
    }

    /// True if the external transaction is a contract creation.
    pub fn is_create(&self) -> bool {
        matches!(self.tx.to, TxKind::Create)
    }

    pub(crate) fn push_checkpoint(&mut self) {
        self.checkpoints
            .push((self.db.checkpoint(), self.substate.clone()));
    }

    fn commit_checkpoint(&mut self) -> Result<(), VMError> {
        self.checkpoints
            .pop()
            .ok_or(InternalError::EmptyCallFrames)?;
        Ok(())
    }

    fn revert_checkpoint(&mut self) -> Result<(), VMError> {
        let (db_checkpoint, substate) = self
            .checkpoints
            .pop()
            .ok_or(InternalError::EmptyCallFrames)?;
        self.db.restore_checkpoint(db_checkpoint);
        self.substate = substate;
        Ok(())
    }

    /// Executes the whole transaction: upfront charges, the interpreter
    /// run, refunds, fees and the end-of-transaction sweeps.
    ///
    /// Validation errors propagate as `Err`; execution failures are
    /// reported in the returned [`ExecutionReport`], with the transaction
    /// still consuming gas and paying the miner.
    pub fn execute(&mut self) -> Result<ExecutionReport, VMError> {
        let intrinsic_gas = self.prepare_execution()?;

        // Everything from here on rolls back to the post-debit state on
        // failure: the sender keeps paying for a failed transaction.
        self.push_checkpoint();

        let exec_gas_limit = self
            .env
            .gas_limit
            .checked_sub(intrinsic_gas)
            .ok_or(TxValidationError::IntrinsicGasTooLow)?;

        let ctx_result = match self.setup_initial_frame(exec_gas_limit)? {
            Some(early_failure) => early_failure,
            None => self.run_execution()?,
        };

        self.finalize_execution(ctx_result, intrinsic_gas)
    }

    /// Upfront debit: the full gas allowance leaves the sender before any
    /// code runs, and the nonce is bumped.
    fn prepare_execution(&mut self) -> Result<u64, VMError> {
        let sender = self.env.origin;
        let intrinsic_gas = self.tx.intrinsic_gas(self.env.fork);
        if self.env.gas_limit < intrinsic_gas {
            return Err(TxValidationError::IntrinsicGasTooLow.into());
        }

        let gas_fee = U256::from(self.env.gas_limit)
            .checked_mul(self.env.gas_price)
            .ok_or(TxValidationError::GasLimitPriceProductOverflow)?;
        let required_balance = gas_fee
            .checked_add(self.tx.value)
            .ok_or(TxValidationError::GasLimitPriceProductOverflow)?;
        if self.db.get_account(sender)?.info.balance < required_balance {
            return Err(TxValidationError::InsufficientAccountFunds.into());
        }

        self.db.decrease_account_balance(sender, gas_fee)?;
        self.db.increment_account_nonce(sender)?;
        self.substate.touched_accounts.insert(sender);
        Ok(intrinsic_gas)
    }

    /// Builds the first call frame: the CREATE flow derives the contract
    /// address from the sender's nonce and runs the payload as init code,
    /// the CALL flow transfers value and runs the callee's code.
    ///
    /// Returns `Some` when the transaction fails before the interpreter
    /// can start (creation address collision).
    fn setup_initial_frame(
        &mut self,
        exec_gas_limit: u64,
    ) -> Result<Option<ContextResult>, VMError> {
        let sender = self.env.origin;
        match self.tx.to.clone() {
            TxKind::Create => {
                let new_address = calculate_create_address(sender, self.tx.nonce);
                self.substate.touched_accounts.insert(new_address);
                if self.db.get_account(new_address)?.create_would_collide() {
                    return Ok(Some(ContextResult {
                        result: TxResult::Revert(
                            ExceptionalHalt::AddressAlreadyOccupied.into(),
                        ),
                        gas_used: exec_gas_limit,
                        output: Bytes::new(),
                    }));
                }

                let frame = CallFrame::new(
                    sender,
                    new_address,
                    new_address,
                    self.tx.data.clone(),
                    self.tx.value,
                    Bytes::new(),
                    false,
                    exec_gas_limit,
                    0,
                    true,
                    0,
                    0,
                );
                self.call_frames.push(frame);

                if self.env.fork >= Fork::SpuriousDragon {
                    self.db.get_account_mut(new_address)?.info.nonce = 1;
                }
                self.db.transfer(sender, new_address, self.tx.value)?;
                Ok(None)
            }
            TxKind::Call(recipient) => {
                self.substate.touched_accounts.insert(recipient);
                let bytecode = self.db.get_account(recipient)?.code.clone();
                let frame = CallFrame::new(
                    sender,
                    recipient,
                    recipient,
                    bytecode,
                    self.tx.value,
                    self.tx.data.clone(),
                    false,
                    exec_gas_limit,
                    0,
                    false,
                    0,
                    0,
                );
                self.call_frames.push(frame);
                self.db.transfer(sender, recipient, self.tx.value)?;
                Ok(None)
            }
        }
    }

    /// Main execution loop: dispatches opcodes for the current frame and
    /// stitches completed child frames back into their parents.
    pub fn run_execution(&mut self) -> Result<ContextResult, VMError> {
        if precompiles::is_precompile(&self.current_call_frame()?.code_address) {
            return self.execute_precompile_context();
        }

        loop {
            let opcode = Opcode::from(self.current_call_frame()?.next_opcode());

            let result = match self.execute_opcode(opcode) {
                Ok(OpcodeResult::Continue { pc_increment }) => {
                    self.current_call_frame_mut()?.pc += pc_increment;
                    continue;
                }
                Ok(OpcodeResult::Halt) => self.handle_opcode_result()?,
                Err(error) => self.handle_opcode_error(error)?,
            };

            // The first frame's completion is the transaction's.
            if self.call_frames.len() == 1 {
                return Ok(result);
            }
            self.handle_return(&result)?;
        }
    }

    /// Runs the transaction's target as a precompile, bypassing the
    /// interpreter.
    fn execute_precompile_context(&mut self) -> Result<ContextResult, VMError> {
        let frame = self.current_call_frame_mut()?;
        match precompiles::execute_precompile(frame.code_address, &frame.calldata, frame.gas_limit)
        {
            Ok((output, gas_used)) => {
                frame.increase_consumed_gas(gas_used)?;
                Ok(ContextResult {
                    result: TxResult::Success,
                    gas_used,
                    output,
                })
            }
            Err(error) if error.should_propagate() => Err(error),
            Err(error) => {
                frame.gas_remaining = 0;
                Ok(ContextResult {
                    result: TxResult::Revert(error),
                    gas_used: frame.gas_limit,
                    output: Bytes::new(),
                })
            }
        }
    }

    /// The current frame halted normally (STOP, RETURN, SELFDESTRUCT).
    fn handle_opcode_result(&mut self) -> Result<ContextResult, VMError> {
        if self.current_call_frame()?.is_create {
            if let Some(deposit_error) = self.handle_create_deposit()? {
                return self.handle_opcode_error(deposit_error);
            }
        }
        let frame = self.current_call_frame_mut()?;
        Ok(ContextResult {
            result: TxResult::Success,
            gas_used: frame.gas_used(),
            output: std::mem::take(&mut frame.output),
        })
    }

    /// The current frame failed: exceptional halts consume the frame's
    /// whole budget, REVERT keeps the unspent remainder.
    fn handle_opcode_error(&mut self, error: VMError) -> Result<ContextResult, VMError> {
        if error.should_propagate() {
            return Err(error);
        }
        let frame = self.current_call_frame_mut()?;
        if matches!(error, VMError::RevertOpcode) {
            Ok(ContextResult {
                result: TxResult::Revert(error),
                gas_used: frame.gas_used(),
                output: std::mem::take(&mut frame.output),
            })
        } else {
            frame.gas_remaining = 0;
            Ok(ContextResult {
                result: TxResult::Revert(error),
                gas_used: frame.gas_limit,
                output: Bytes::new(),
            })
        }
    }

    /// On success the deployed code is charged and installed; what happens
    /// when the gas cannot cover the deposit changed at Homestead, and
    /// EIP-170 caps the deployed size from Spurious Dragon on.
    fn handle_create_deposit(&mut self) -> Result<Option<VMError>, VMError> {
        let schedule = self.env.gas_schedule();
        let fork = self.env.fork;
        let frame = self.current_call_frame_mut()?;
        let code = frame.output.clone();

        if fork >= Fork::SpuriousDragon && code.len() > MAX_CODE_SIZE {
            return Ok(Some(ExceptionalHalt::ContractOutputTooBig.into()));
        }

        let deposit_cost = gas_cost::CODE_DEPOSIT_COST
            .checked_mul(code.len() as u64)
            .ok_or(InternalError::Overflow)?;
        if frame.gas_remaining < deposit_cost {
            if schedule.exceptional_failed_code_deposit {
                return Ok(Some(ExceptionalHalt::OutOfGas.into()));
            }
            // Frontier: the account stays alive with no code installed.
            frame.output = Bytes::new();
            return Ok(None);
        }
        frame.gas_remaining -= deposit_cost;

        let owner = frame.to;
        self.db.set_account_code(owner, code)?;
        Ok(None)
    }

    /// Pops the completed child frame, commits or reverts its state
    /// checkpoint, and hands control back to the parent.
    fn handle_return(&mut self, ctx_result: &ContextResult) -> Result<(), VMError> {
        if ctx_result.is_success() {
            self.commit_checkpoint()?;
        } else {
            self.revert_checkpoint()?;
        }
        let child = self
            .call_frames
            .pop()
            .ok_or(InternalError::EmptyCallFrames)?;
        if child.is_create {
            self.handle_return_create(child, ctx_result)
        } else {
            self.handle_return_call(child, ctx_result)
        }
    }

    /// Settles the transaction: refunds, sender repayment, the miner fee
    /// and the deferred account sweeps.
    fn finalize_execution(
        &mut self,
        ctx_result: ContextResult,
        intrinsic_gas: u64,
    ) -> Result<ExecutionReport, VMError> {
        let mut gas_used = intrinsic_gas
            .checked_add(ctx_result.gas_used)
            .ok_or(InternalError::Overflow)?;
        let mut gas_refunded = 0;

        let logs = if ctx_result.is_success() {
            gas_refunded = (gas_used / 2).min(self.substate.refunded_gas);
            gas_used = gas_used
                .checked_sub(gas_refunded)
                .ok_or(InternalError::Underflow)?;
            self.commit_checkpoint()?;
            self.call_frames.pop().map(|frame| frame.logs).unwrap_or_default()
        } else {
            self.revert_checkpoint()?;
            self.call_frames.pop();
            Vec::new()
        };

        // Unused gas flows back to the sender, the rest to the miner.
        let sender = self.env.origin;
        let coinbase = self.env.coinbase;
        let remaining_fee = U256::from(
            self.env
                .gas_limit
                .checked_sub(gas_used)
                .ok_or(InternalError::Underflow)?,
        )
        .checked_mul(self.env.gas_price)
        .ok_or(InternalError::Overflow)?;
        self.db.increase_account_balance(sender, remaining_fee)?;
        let miner_fee = U256::from(gas_used)
            .checked_mul(self.env.gas_price)
            .ok_or(InternalError::Overflow)?;
        self.db.increase_account_balance(coinbase, miner_fee)?;
        self.substate.touched_accounts.insert(coinbase);

        // Deferred SELFDESTRUCT deletions.
        for address in self.substate.selfdestruct_set.clone() {
            self.db.destroy_account(address);
        }

        // EIP-158: touched accounts left empty disappear from the state.
        if self.env.fork >= Fork::SpuriousDragon {
            for address in self.substate.touched_accounts.clone() {
                if self.substate.selfdestruct_set.contains(&address) {
                    continue;
                }
                if self.db.account_is_absent(address)? {
                    continue;
                }
                if self.db.get_account(address)?.is_empty() {
                    self.db.destroy_account(address);
                }
            }
        }

        Ok(ExecutionReport {
            result: ctx_result.result,
            gas_used,
            gas_refunded,
            output: ctx_result.output,
            logs,
        })
    }

    /// Single-opcode dispatch over the flat handler table, with fork
    /// gating for the post-Frontier additions.
    pub fn execute_opcode(&mut self, opcode: Opcode) -> Result<OpcodeResult, VMError> {
        let fork = self.env.fork;
        match opcode {
            Opcode::DELEGATECALL if fork < Fork::Homestead => OpInvalidHandler::eval(self),
            Opcode::RETURNDATASIZE | Opcode::RETURNDATACOPY | Opcode::STATICCALL | Opcode::REVERT
                if fork < Fork::Byzantium =>
            {
                OpInvalidHandler::eval(self)
            }
            Opcode::SHL | Opcode::SHR | Opcode::SAR if fork < Fork::Constantinople => {
                OpInvalidHandler::eval(self)
            }

            Opcode::STOP => OpStopHandler::eval(self),
            Opcode::ADD => OpAddHandler::eval(self),
            Opcode::MUL => OpMulHandler::eval(self),
            Opcode::SUB => OpSubHandler::eval(self),
            Opcode::DIV => OpDivHandler::eval(self),
            Opcode::SDIV => OpSDivHandler::eval(self),
            Opcode::MOD => OpModHandler::eval(self),
            Opcode::SMOD => OpSModHandler::eval(self),
            Opcode::ADDMOD => OpAddModHandler::eval(self),
            Opcode::MULMOD => OpMulModHandler::eval(self),
            Opcode::EXP => OpExpHandler::eval(self),
            Opcode::SIGNEXTEND => OpSignExtendHandler::eval(self),

            Opcode::LT => OpLtHandler::eval(self),
            Opcode::GT => OpGtHandler::eval(self),
            Opcode::SLT => OpSltHandler::eval(self),
            Opcode::SGT => OpSgtHandler::eval(self),
            Opcode::EQ => OpEqHandler::eval(self),
            Opcode::ISZERO => OpIsZeroHandler::eval(self),
            Opcode::AND => OpAndHandler::eval(self),
            Opcode::OR => OpOrHandler::eval(self),
            Opcode::XOR => OpXorHandler::eval(self),
            Opcode::NOT => OpNotHandler::eval(self),
            Opcode::BYTE => OpByteHandler::eval(self),
            Opcode::SHL => OpShlHandler::eval(self),
            Opcode::SHR => OpShrHandler::eval(self),
            Opcode::SAR => OpSarHandler::eval(self),

            Opcode::KECCAK256 => OpKeccakHandler::eval(self),

            Opcode::ADDRESS => OpAddressHandler::eval(self),
            Opcode::BALANCE => OpBalanceHandler::eval(self),
            Opcode::ORIGIN => OpOriginHandler::eval(self),
            Opcode::CALLER => OpCallerHandler::eval(self),
            Opcode::CALLVALUE => OpCallValueHandler::eval(self),
            Opcode::CALLDATALOAD => OpCallDataLoadHandler::eval(self),
            Opcode::CALLDATASIZE => OpCallDataSizeHandler::eval(self),
            Opcode::CALLDATACOPY => OpCallDataCopyHandler::eval(self),
            Opcode::CODESIZE => OpCodeSizeHandler::eval(self),
            Opcode::CODECOPY => OpCodeCopyHandler::eval(self),
            Opcode::GASPRICE => OpGasPriceHandler::eval(self),
            Opcode::EXTCODESIZE => OpExtCodeSizeHandler::eval(self),
            Opcode::EXTCODECOPY => OpExtCodeCopyHandler::eval(self),
            Opcode::RETURNDATASIZE => OpReturnDataSizeHandler::eval(self),
            Opcode::RETURNDATACOPY => OpReturnDataCopyHandler::eval(self),

            Opcode::BLOCKHASH => OpBlockHashHandler::eval(self),
            Opcode::COINBASE => OpCoinbaseHandler::eval(self),
            Opcode::TIMESTAMP => OpTimestampHandler::eval(self),
            Opcode::NUMBER => OpNumberHandler::eval(self),
            Opcode::DIFFICULTY => OpDifficultyHandler::eval(self),
            Opcode::GASLIMIT => OpGasLimitHandler::eval(self),

            Opcode::POP => OpPopHandler::eval(self),
            Opcode::MLOAD => OpMLoadHandler::eval(self),
            Opcode::MSTORE => OpMStoreHandler::eval(self),
            Opcode::MSTORE8 => OpMStore8Handler::eval(self),
            Opcode::SLOAD => OpSLoadHandler::eval(self),
            Opcode::SSTORE => OpSStoreHandler::eval(self),
            Opcode::JUMP => OpJumpHandler::eval(self),
            Opcode::JUMPI => OpJumpIHandler::eval(self),
            Opcode::PC => OpPcHandler::eval(self),
            Opcode::MSIZE => OpMSizeHandler::eval(self),
            Opcode::GAS => OpGasHandler::eval(self),
            Opcode::JUMPDEST => OpJumpDestHandler::eval(self),

            Opcode::PUSH1 => OpPushHandler::<1>::eval(self),
            Opcode::PUSH2 => OpPushHandler::<2>::eval(self),
            Opcode::PUSH3 => OpPushHandler::<3>::eval(self),
            Opcode::PUSH4 => OpPushHandler::<4>::eval(self),
            Opcode::PUSH5 => OpPushHandler::<5>::eval(self),
            Opcode::PUSH6 => OpPushHandler::<6>::eval(self),
            Opcode::PUSH7 => OpPushHandler::<7>::eval(self),
            Opcode::PUSH8 => OpPushHandler::<8>::eval(self),
            Opcode::PUSH9 => OpPushHandler::<9>::eval(self),
            Opcode::PUSH10 => OpPushHandler::<10>::eval(self),
            Opcode::PUSH11 => OpPushHandler::<11>::eval(self),
            Opcode::PUSH12 => OpPushHandler::<12>::eval(self),
            Opcode::PUSH13 => OpPushHandler::<13>::eval(self),
            Opcode::PUSH14 => OpPushHandler::<14>::eval(self),
            Opcode::PUSH15 => OpPushHandler::<15>::eval(self),
            Opcode::PUSH16 => OpPushHandler::<16>::eval(self),
            Opcode::PUSH17 => OpPushHandler::<17>::eval(self),
            Opcode::PUSH18 => OpPushHandler::<18>::eval(self),
            Opcode::PUSH19 => OpPushHandler::<19>::eval(self),
            Opcode::PUSH20 => OpPushHandler::<20>::eval(self),
            Opcode::PUSH21 => OpPushHandler::<21>::eval(self),
            Opcode::PUSH22 => OpPushHandler::<22>::eval(self),
            Opcode::PUSH23 => OpPushHandler::<23>::eval(self),
            Opcode::PUSH24 => OpPushHandler::<24>::eval(self),
            Opcode::PUSH25 => OpPushHandler::<25>::eval(self),
            Opcode::PUSH26 => OpPushHandler::<26>::eval(self),
            Opcode::PUSH27 => OpPushHandler::<27>::eval(self),
            Opcode::PUSH28 => OpPushHandler::<28>::eval(self),
            Opcode::PUSH29 => OpPushHandler::<29>::eval(self),
            Opcode::PUSH30 => OpPushHandler::<30>::eval(self),
            Opcode::PUSH31 => OpPushHandler::<31>::eval(self),
            Opcode::PUSH32 => OpPushHandler::<32>::eval(self),

            Opcode::DUP1 => OpDupHandler::<1>::eval(self),
            Opcode::DUP2 => OpDupHandler::<2>::eval(self),
            Opcode::DUP3 => OpDupHandler::<3>::eval(self),
            Opcode::DUP4 => OpDupHandler::<4>::eval(self),
            Opcode::DUP5 => OpDupHandler::<5>::eval(self),
            Opcode::DUP6 => OpDupHandler::<6>::eval(self),
            Opcode::DUP7 => OpDupHandler::<7>::eval(self),
            Opcode::DUP8 => OpDupHandler::<8>::eval(self),
            Opcode::DUP9 => OpDupHandler::<9>::eval(self),
            Opcode::DUP10 => OpDupHandler::<10>::eval(self),
            Opcode::DUP11 => OpDupHandler::<11>::eval(self),
            Opcode::DUP12 => OpDupHandler::<12>::eval(self),
            Opcode::DUP13 => OpDupHandler::<13>::eval(self),
            Opcode::DUP14 => OpDupHandler::<14>::eval(self),
            Opcode::DUP15 => OpDupHandler::<15>::eval(self),
            Opcode::DUP16 => OpDupHandler::<16>::eval(self),

            Opcode::SWAP1 => OpSwapHandler::<1>::eval(self),
            Opcode::SWAP2 => OpSwapHandler::<2>::eval(self),
            Opcode::SWAP3 => OpSwapHandler::<3>::eval(self),
            Opcode::SWAP4 => OpSwapHandler::<4>::eval(self),
            Opcode::SWAP5 => OpSwapHandler::<5>::eval(self),
            Opcode::SWAP6 => OpSwapHandler::<6>::eval(self),
            Opcode::SWAP7 => OpSwapHandler::<7>::eval(self),
            Opcode::SWAP8 => OpSwapHandler::<8>::eval(self),
            Opcode::SWAP9 => OpSwapHandler::<9>::eval(self),
            Opcode::SWAP10 => OpSwapHandler::<10>::eval(self),
            Opcode::SWAP11 => OpSwapHandler::<11>::eval(self),
            Opcode::SWAP12 => OpSwapHandler::<12>::eval(self),
            Opcode::SWAP13 => OpSwapHandler::<13>::eval(self),
            Opcode::SWAP14 => OpSwapHandler::<14>::eval(self),
            Opcode::SWAP15 => OpSwapHandler::<15>::eval(self),
            Opcode::SWAP16 => OpSwapHandler::<16>::eval(self),

            Opcode::LOG0 => OpLogHandler::<0>::eval(self),
            Opcode::LOG1 => OpLogHandler::<1>::eval(self),
            Opcode::LOG2 => OpLogHandler::<2>::eval(self),
            Opcode::LOG3 => OpLogHandler::<3>::eval(self),
            Opcode::LOG4 => OpLogHandler::<4>::eval(self),

            Opcode::CREATE => OpCreateHandler::eval(self),
            Opcode::CALL => OpCallHandler::eval(self),
            Opcode::CALLCODE => OpCallCodeHandler::eval(self),
            Opcode::RETURN => OpReturnHandler::eval(self),
            Opcode::DELEGATECALL => OpDelegateCallHandler::eval(self),
            Opcode::STATICCALL => OpStaticCallHandler::eval(self),
            Opcode::REVERT => OpRevertHandler::eval(self),
            Opcode::INVALID => OpInvalidHandler::eval(self),
            Opcode::SELFDESTRUCT => OpSelfDestructHandler::eval(self),
        }
    }
}
