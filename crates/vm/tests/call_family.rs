//! Call-family semantics: value transfer, context rules for CALLCODE and
//! DELEGATECALL, depth and balance failure paths, and precompile calls.

use bytes::Bytes;
use ethereum_types::{Address, H160, H256, U256};
use hearth_common::types::{AccountState, ChainConfig, Fork, Transaction, TxKind};
use hearth_vm::{
    call_frame::CallFrame,
    constants::MAX_CALL_DEPTH,
    db::{DatabaseError, VmDatabase},
    gas_cost,
    opcodes::Opcode,
    utils::u256_to_h256,
    Environment, GeneralizedDatabase, VM,
};
use std::collections::HashMap;
use std::sync::Arc;

const OWNER: Address = H160(hex_literal::hex!("00000000000000000000000000000000cafebabe"));
const EXTERNAL: Address = H160(hex_literal::hex!("00000000000000000000000000000000facefeed"));
const SENDER: Address = H160(hex_literal::hex!("0000000000000000000000000000000000001234"));
const ECRECOVER_ADDRESS: Address =
    H160(hex_literal::hex!("0000000000000000000000000000000000000001"));

/// Storage-writer fixture: stores ADDRESS, CALLER and CALLVALUE into
/// slots 0, 1 and 2, then returns half of its calldata.
///
/// Costs 60028 gas when all three slots start zeroed (three `G_sset`
/// writes plus 28 gas of stack shuffling).
const STORE_CONTEXT_CODE: [u8; 19] = [
    0x30, 0x60, 0x00, 0x55, // ADDRESS PUSH1 0 SSTORE
    0x33, 0x60, 0x01, 0x55, // CALLER PUSH1 1 SSTORE
    0x34, 0x60, 0x02, 0x55, // CALLVALUE PUSH1 2 SSTORE
    0x60, 0x02, 0x36, 0x04, // PUSH1 2 CALLDATASIZE DIV
    0x60, 0x00, 0xf3, // PUSH1 0 RETURN
];
const STORE_CONTEXT_GAS: u64 = 60_028;

#[derive(Default)]
struct MockDb {
    accounts: HashMap<Address, AccountState>,
    code: HashMap<H256, Bytes>,
}

impl MockDb {
    fn with_account(mut self, address: Address, balance: U256, code: &[u8]) -> Self {
        let code = Bytes::copy_from_slice(code);
        let code_hash = hearth_common::crypto::keccak(&code);
        self.accounts.insert(
            address,
            AccountState {
                nonce: 0,
                balance,
                code_hash,
                ..Default::default()
            },
        );
        self.code.insert(code_hash, code);
        self
    }
}

impl VmDatabase for MockDb {
    fn get_account_state(&self, address: Address) -> Result<Option<AccountState>, DatabaseError> {
        Ok(self.accounts.get(&address).cloned())
    }

    fn get_storage_value(
        &self,
        _address: Address,
        _key: H256,
    ) -> Result<Option<U256>, DatabaseError> {
        Ok(None)
    }

    fn get_code(&self, code_hash: H256) -> Result<Option<Bytes>, DatabaseError> {
        Ok(self.code.get(&code_hash).cloned())
    }

    fn get_block_hash(&self, _block_number: u64) -> Result<Option<H256>, DatabaseError> {
        Ok(None)
    }
}

fn homestead_env(origin: Address, gas_limit: u64) -> Environment {
    Environment {
        origin,
        gas_price: U256::zero(),
        gas_limit,
        config: ChainConfig {
            chain_id: 1,
            homestead_block: Some(0),
            ..Default::default()
        },
        fork: Fork::Homestead,
        block_number: 1,
        coinbase: Address::from_low_u64_be(0x4444),
        timestamp: 1_000_000,
        difficulty: U256::from(131_072u64),
        block_gas_limit: 10_000_000,
    }
}

fn call_transaction(to: Address, value: U256, gas: u64) -> Transaction {
    Transaction {
        nonce: 0,
        gas_price: U256::zero(),
        gas,
        to: TxKind::Call(to),
        value,
        data: Bytes::new(),
        ..Default::default()
    }
}

fn storage_at(db: &mut GeneralizedDatabase, address: Address, slot: u64) -> U256 {
    db.get_storage_slot(address, u256_to_h256(U256::from(slot)))
        .unwrap()
        .current_value
}

fn balance_of(db: &mut GeneralizedDatabase, address: Address) -> U256 {
    db.get_account(address).unwrap().info.balance
}

/// Owner bytecode performing a CALL-family operation against EXTERNAL
/// with the given opcode byte, value and requested gas, then stopping.
fn call_code(opcode: u8, value_push: &[u8], requested_gas: u16, target: Address) -> Bytes {
    let mut code = vec![
        0x60, 0x00, // PUSH1 0 (ret len)
        0x60, 0x00, // PUSH1 0 (ret offset)
        0x60, 0x00, // PUSH1 0 (args len)
        0x60, 0x00, // PUSH1 0 (args offset)
    ];
    if !value_push.is_empty() {
        code.push(0x60 + (value_push.len() - 1) as u8);
        code.extend_from_slice(value_push);
    }
    code.push(0x73); // PUSH20 target
    code.extend_from_slice(target.as_bytes());
    code.push(0x61); // PUSH2 gas
    code.extend_from_slice(&requested_gas.to_be_bytes());
    code.push(opcode);
    code.push(0x00); // STOP
    Bytes::from(code)
}

#[test]
fn call_transfers_value_and_runs_callee() {
    // Forward exactly the required gas plus 13; the callee's leftover and
    // the stipend flow back to the caller.
    let requested = (STORE_CONTEXT_GAS + 13) as u16;
    let owner_code = call_code(0xf1, &[0x01, 0xf4], requested, EXTERNAL);
    let push_gas = 7 * 3;

    let store = MockDb::default()
        .with_account(SENDER, U256::from(10_000_000u64), &[])
        .with_account(OWNER, U256::from(1000u64), &owner_code)
        .with_account(EXTERNAL, U256::zero(), &STORE_CONTEXT_CODE);
    let mut db = GeneralizedDatabase::new(Arc::new(store));

    let tx = call_transaction(OWNER, U256::zero(), 1_000_000);
    let env = homestead_env(SENDER, tx.gas);
    let report = VM::new(env, &mut db, &tx).execute().unwrap();

    assert!(report.is_success());
    assert_eq!(balance_of(&mut db, OWNER), U256::from(500u64));
    assert_eq!(balance_of(&mut db, EXTERNAL), U256::from(500u64));
    assert_eq!(
        storage_at(&mut db, EXTERNAL, 0),
        U256::from_big_endian(EXTERNAL.as_bytes())
    );
    assert_eq!(
        storage_at(&mut db, EXTERNAL, 1),
        U256::from_big_endian(OWNER.as_bytes())
    );
    assert_eq!(storage_at(&mut db, EXTERNAL, 2), U256::from(500u64));

    let schedule = hearth_vm::gas_schedule::GasSchedule::for_fork(Fork::Homestead);
    let expected = 21_000
        + push_gas
        + schedule.call_base
        + gas_cost::CALLVALUE_TRANSFER
        + STORE_CONTEXT_GAS
        - gas_cost::CALL_STIPEND;
    assert_eq!(report.gas_used, expected);
}

#[test]
fn callcode_mutates_the_owner_storage() {
    let requested = (STORE_CONTEXT_GAS + 13) as u16;
    let owner_code = call_code(0xf2, &[0x01, 0xf4], requested, EXTERNAL);

    let store = MockDb::default()
        .with_account(SENDER, U256::from(10_000_000u64), &[])
        .with_account(OWNER, U256::from(1000u64), &owner_code)
        .with_account(EXTERNAL, U256::zero(), &STORE_CONTEXT_CODE);
    let mut db = GeneralizedDatabase::new(Arc::new(store));

    let tx = call_transaction(OWNER, U256::zero(), 1_000_000);
    let env = homestead_env(SENDER, tx.gas);
    let report = VM::new(env, &mut db, &tx).execute().unwrap();
    assert!(report.is_success());

    // Storage lands on the owner; balances do not move.
    assert_eq!(
        storage_at(&mut db, OWNER, 0),
        U256::from_big_endian(OWNER.as_bytes())
    );
    assert_eq!(
        storage_at(&mut db, OWNER, 1),
        U256::from_big_endian(OWNER.as_bytes())
    );
    assert_eq!(storage_at(&mut db, OWNER, 2), U256::from(500u64));
    assert_eq!(storage_at(&mut db, EXTERNAL, 0), U256::zero());
    assert_eq!(balance_of(&mut db, OWNER), U256::from(1000u64));
    assert_eq!(balance_of(&mut db, EXTERNAL), U256::zero());
}

#[test]
fn delegatecall_keeps_parent_caller_and_value() {
    let requested = (STORE_CONTEXT_GAS + 13) as u16;
    // DELEGATECALL takes no value argument.
    let owner_code = call_code(0xf4, &[], requested, EXTERNAL);
    let push_gas = 6 * 3;

    let store = MockDb::default()
        .with_account(SENDER, U256::from(10_000_000u64), &[])
        .with_account(OWNER, U256::zero(), &owner_code)
        .with_account(EXTERNAL, U256::zero(), &STORE_CONTEXT_CODE);
    let mut db = GeneralizedDatabase::new(Arc::new(store));

    // The external transaction itself carries value 123.
    let tx = call_transaction(OWNER, U256::from(123u64), 1_000_000);
    let env = homestead_env(SENDER, tx.gas);
    let report = VM::new(env, &mut db, &tx).execute().unwrap();
    assert!(report.is_success());

    // Storage lands on the owner; the child observed the parent's caller
    // and value.
    assert_eq!(
        storage_at(&mut db, OWNER, 0),
        U256::from_big_endian(OWNER.as_bytes())
    );
    assert_eq!(
        storage_at(&mut db, OWNER, 1),
        U256::from_big_endian(SENDER.as_bytes())
    );
    assert_eq!(storage_at(&mut db, OWNER, 2), U256::from(123u64));

    // No value surcharge, no stipend.
    let schedule = hearth_vm::gas_schedule::GasSchedule::for_fork(Fork::Homestead);
    let expected = 21_000 + push_gas + schedule.call_base + STORE_CONTEXT_GAS;
    assert_eq!(report.gas_used, expected);
}

/// Builds a VM with a hand-rolled frame so failure paths can be driven
/// opcode by opcode.
fn frame_test_vm<'a>(
    db: &'a mut GeneralizedDatabase,
    depth: usize,
    gas_limit: u64,
) -> VM<'a> {
    let tx = call_transaction(OWNER, U256::zero(), gas_limit);
    let env = homestead_env(SENDER, gas_limit);
    let mut vm = VM::new(env, db, &tx);
    vm.call_frames.push(CallFrame::new(
        SENDER,
        OWNER,
        OWNER,
        Bytes::new(),
        U256::zero(),
        Bytes::new(),
        false,
        gas_limit,
        depth,
        false,
        0,
        0,
    ));
    vm
}

fn push_call_args(vm: &mut VM<'_>, gas: u64, to: Address, value: u64) {
    let frame = vm.current_call_frame_mut().unwrap();
    for arg in [
        U256::zero(),                          // ret len
        U256::zero(),                          // ret offset
        U256::zero(),                          // args len
        U256::zero(),                          // args offset
        U256::from(value),                     // value
        U256::from_big_endian(to.as_bytes()),  // to
        U256::from(gas),                       // gas
    ] {
        frame.stack.push(arg).unwrap();
    }
}

#[test]
fn call_at_max_depth_fails_without_state_changes() {
    let store = MockDb::default()
        .with_account(OWNER, U256::from(1000u64), &[])
        .with_account(EXTERNAL, U256::zero(), &[]);
    let mut db = GeneralizedDatabase::new(Arc::new(store));
    let mut vm = frame_test_vm(&mut db, MAX_CALL_DEPTH, 100_000);
    push_call_args(&mut vm, 1000, EXTERNAL, 500);

    vm.execute_opcode(Opcode::CALL).unwrap();

    let frame = vm.current_call_frame_mut().unwrap();
    assert_eq!(frame.stack.pop1().unwrap(), U256::zero());
    // G_call + G_callvalue - G_callstipend; the forwarded gas came back.
    assert_eq!(frame.gas_used(), 40 + 9000 - 2300);
    assert_eq!(balance_of(vm.db, OWNER), U256::from(1000u64));
    assert_eq!(balance_of(vm.db, EXTERNAL), U256::zero());
}

#[test]
fn call_with_value_above_balance_fails_without_state_changes() {
    let store = MockDb::default()
        .with_account(OWNER, U256::from(100u64), &[])
        .with_account(EXTERNAL, U256::zero(), &[]);
    let mut db = GeneralizedDatabase::new(Arc::new(store));
    let mut vm = frame_test_vm(&mut db, 0, 100_000);
    push_call_args(&mut vm, 1000, EXTERNAL, 500);

    vm.execute_opcode(Opcode::CALL).unwrap();

    let frame = vm.current_call_frame_mut().unwrap();
    assert_eq!(frame.stack.pop1().unwrap(), U256::zero());
    assert_eq!(frame.gas_used(), 40 + 9000 - 2300);
    assert_eq!(balance_of(vm.db, OWNER), U256::from(100u64));
    assert_eq!(balance_of(vm.db, EXTERNAL), U256::zero());
}

#[test]
fn call_to_ecrecover_with_zero_input() {
    // CALL into the ECRECOVER precompile with 128 zero bytes of input:
    // an invalid signature is a successful call with empty output.
    let mut code = vec![
        0x60, 0x20, // PUSH1 32 (ret len)
        0x60, 0x00, // PUSH1 0 (ret offset)
        0x60, 0x80, // PUSH1 128 (args len)
        0x60, 0x00, // PUSH1 0 (args offset)
        0x60, 0x4d, // PUSH1 77 (value)
        0x60, 0x01, // PUSH1 1 (to: the precompile)
        0x61, 0x13, 0x88, // PUSH2 5000 (gas)
        0xf1, // CALL
        0x00, // STOP
    ];
    let owner_code = Bytes::from(std::mem::take(&mut code));
    let push_gas = 7 * 3;

    // The precompile account pre-exists, as on any live chain, so the
    // value transfer pays no new-account surcharge.
    let store = MockDb::default()
        .with_account(SENDER, U256::from(10_000_000u64), &[])
        .with_account(OWNER, U256::from(1000u64), &owner_code)
        .with_account(ECRECOVER_ADDRESS, U256::one(), &[]);
    let mut db = GeneralizedDatabase::new(Arc::new(store));

    let tx = call_transaction(OWNER, U256::zero(), 1_000_000);
    let env = homestead_env(SENDER, tx.gas);
    let report = VM::new(env, &mut db, &tx).execute().unwrap();
    assert!(report.is_success());

    // The transfer went through.
    assert_eq!(balance_of(&mut db, ECRECOVER_ADDRESS), U256::from(78u64));
    assert_eq!(balance_of(&mut db, OWNER), U256::from(1000 - 77u64));

    // Memory expansion to 128 bytes costs 3*4 + 16/512 = 12.
    let memory_cost = 12;
    let expected = 21_000 + push_gas + 40 + gas_cost::CALLVALUE_TRANSFER + memory_cost + 3000
        - gas_cost::CALL_STIPEND;
    assert_eq!(report.gas_used, expected);
}

#[test]
fn failed_subcall_rolls_back_its_writes() {
    // EXTERNAL writes a slot, then hits INVALID: its storage write and
    // the transferred value must both roll back, while the caller keeps
    // running and sees 0 on the stack.
    let failing_code: [u8; 5] = [
        0x30, 0x60, 0x00, 0x55, // ADDRESS PUSH1 0 SSTORE
        0xfe, // INVALID
    ];
    let owner_code = call_code(0xf1, &[0x64], 50_000, EXTERNAL); // value 100

    let store = MockDb::default()
        .with_account(SENDER, U256::from(10_000_000u64), &[])
        .with_account(OWNER, U256::from(1000u64), &owner_code)
        .with_account(EXTERNAL, U256::zero(), &failing_code);
    let mut db = GeneralizedDatabase::new(Arc::new(store));

    let tx = call_transaction(OWNER, U256::zero(), 1_000_000);
    let env = homestead_env(SENDER, tx.gas);
    let report = VM::new(env, &mut db, &tx).execute().unwrap();

    // The outer transaction still succeeds; only the subcall reverted.
    assert!(report.is_success());
    assert_eq!(storage_at(&mut db, EXTERNAL, 0), U256::zero());
    assert_eq!(balance_of(&mut db, OWNER), U256::from(1000u64));
    assert_eq!(balance_of(&mut db, EXTERNAL), U256::zero());
}
