#[cfg(test)]
mod blockchain_integration_test {
    use crate::{
        error::{BlockExecutionError, InvalidTransactionError, PostExecutionError},
        Blockchain,
    };
    use bytes::Bytes;
    use ethereum_types::{Address, H160, H256, U256};
    use hearth_common::{
        constants::WEI_PER_ETHER,
        crypto,
        difficulty::calculate_difficulty,
        types::{
            compute_ommers_hash, compute_receipts_root, compute_transactions_root, Block,
            BlockBody, BlockHeader, ChainConfig, Genesis, GenesisAccount, Transaction, TxKind,
        },
    };
    use hearth_storage::Store;
    use secp256k1::SecretKey;
    use std::collections::BTreeMap;

    const COINBASE: Address = H160(hex_literal::hex!(
        "00000000000000000000000000000000000c0ffe"
    ));
    const RECIPIENT: Address = H160(hex_literal::hex!(
        "0000000000000000000000000000000000005678"
    ));

    fn sender_key() -> SecretKey {
        SecretKey::from_slice(&[0x46; 32]).unwrap()
    }

    fn sender_address() -> Address {
        let public = sender_key().public_key(secp256k1::SECP256K1);
        Address::from_slice(
            &crypto::keccak(&public.serialize_uncompressed()[1..]).as_bytes()[12..],
        )
    }

    fn test_config() -> ChainConfig {
        ChainConfig {
            chain_id: 61,
            homestead_block: Some(0),
            eip150_block: Some(0),
            eip155_block: Some(0),
            eip158_block: Some(0),
            ..Default::default()
        }
    }

    fn setup_chain() -> (Blockchain, BlockHeader) {
        let mut alloc = BTreeMap::new();
        alloc.insert(
            sender_address(),
            GenesisAccount {
                balance: U256::from(WEI_PER_ETHER) * 10,
                ..Default::default()
            },
        );
        let genesis = Genesis {
            config: test_config(),
            alloc,
            difficulty: U256::from(131_072u64),
            gas_limit: 5_000_000,
            timestamp: 1_000_000,
            ..Default::default()
        };
        let store = Store::from_genesis(&genesis).unwrap();
        let genesis_header = store.get_block_header_by_number(0).unwrap().unwrap();
        (Blockchain::new(store), genesis_header)
    }

    fn signed_transfer(nonce: u64, to: Address, value: U256, gas: u64) -> Transaction {
        Transaction {
            nonce,
            gas_price: U256::one(),
            gas,
            to: TxKind::Call(to),
            value,
            data: Bytes::new(),
            ..Default::default()
        }
        .sign(&sender_key(), Some(61))
    }

    /// Executes the transactions on top of the parent and assembles a
    /// block whose header commits to the computed roots, the way a block
    /// builder would.
    fn build_block(
        blockchain: &Blockchain,
        parent: &BlockHeader,
        transactions: Vec<Transaction>,
        ommers: Vec<BlockHeader>,
        coinbase: Address,
    ) -> Block {
        let config = blockchain.storage.get_chain_config().unwrap();
        let number = parent.number + 1;
        let timestamp = parent.timestamp + 13;
        let mut header = BlockHeader {
            parent_hash: parent.compute_block_hash(),
            number,
            timestamp,
            coinbase,
            gas_limit: parent.gas_limit,
            difficulty: calculate_difficulty(
                parent.difficulty,
                parent.timestamp,
                parent.has_ommers(),
                timestamp,
                number,
                config.fork(number),
            ),
            transactions_root: compute_transactions_root(&transactions),
            ommers_hash: compute_ommers_hash(&ommers),
            ..Default::default()
        };
        let body = BlockBody {
            transactions,
            ommers,
        };
        let result = blockchain
            .execute_block(&Block::new(header.clone(), body.clone()), parent)
            .unwrap();
        header.state_root = result.state_root;
        header.receipts_root = compute_receipts_root(&result.receipts);
        header.gas_used = result.gas_used;
        header.logs_bloom = result.logs_bloom;
        Block::new(header, body)
    }

    fn balance_at(blockchain: &Blockchain, state_root: H256, address: Address) -> U256 {
        blockchain
            .storage
            .get_account_state(state_root, address)
            .unwrap()
            .map(|account| account.balance)
            .unwrap_or_default()
    }

    #[test]
    fn transfer_block_settles_balances_and_fees() {
        let (blockchain, genesis) = setup_chain();
        let tx = signed_transfer(0, RECIPIENT, U256::from(WEI_PER_ETHER), 30_000);
        let block = build_block(&blockchain, &genesis, vec![tx], vec![], COINBASE);

        blockchain.add_block(&block).unwrap();

        let root = block.header.state_root;
        assert_eq!(
            balance_at(&blockchain, root, RECIPIENT),
            U256::from(WEI_PER_ETHER)
        );
        // 21000 gas at price 1 went to the miner, on top of the 5 ETH
        // block reward.
        assert_eq!(
            balance_at(&blockchain, root, COINBASE),
            U256::from(WEI_PER_ETHER) * 5 + 21_000
        );
        assert_eq!(
            balance_at(&blockchain, root, sender_address()),
            U256::from(WEI_PER_ETHER) * 9 - 21_000
        );

        // The stored receipts commit to the intermediate state root and
        // the running gas total.
        let receipts = blockchain
            .storage
            .get_receipts(block.hash())
            .unwrap()
            .unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].cumulative_gas_used, 21_000);
        let sender_nonce = blockchain
            .storage
            .get_account_state(root, sender_address())
            .unwrap()
            .unwrap()
            .nonce;
        assert_eq!(sender_nonce, 1);
    }

    #[test]
    fn execution_is_deterministic() {
        let (blockchain, genesis) = setup_chain();
        let tx = signed_transfer(0, RECIPIENT, U256::from(1234u64), 30_000);
        let block = build_block(&blockchain, &genesis, vec![tx], vec![], COINBASE);

        let first = blockchain.execute_block(&block, &genesis).unwrap();
        let second = blockchain.execute_block(&block, &genesis).unwrap();
        assert_eq!(first.state_root, second.state_root);
        assert_eq!(first.gas_used, second.gas_used);
        assert_eq!(first.logs_bloom, second.logs_bloom);
        assert_eq!(
            compute_receipts_root(&first.receipts),
            compute_receipts_root(&second.receipts)
        );

        // Re-importing over the same parent reproduces the stored block.
        blockchain.add_block(&block).unwrap();
        let replay = blockchain.execute_block(&block, &genesis).unwrap();
        assert_eq!(replay.state_root, block.header.state_root);
    }

    #[test]
    fn contract_deployment_installs_code() {
        // Init code that deploys a one-byte STOP contract:
        //   PUSH1 1 PUSH1 12 PUSH1 0 CODECOPY PUSH1 1 PUSH1 0 RETURN <00>
        let init_code = Bytes::from(
            hex_literal::hex!("6001600c60003960016000f300").to_vec(),
        );
        let (blockchain, genesis) = setup_chain();
        let deploy = Transaction {
            nonce: 0,
            gas_price: U256::one(),
            gas: 100_000,
            to: TxKind::Create,
            value: U256::zero(),
            data: init_code,
            ..Default::default()
        }
        .sign(&sender_key(), Some(61));

        let block = build_block(&blockchain, &genesis, vec![deploy], vec![], COINBASE);
        blockchain.add_block(&block).unwrap();

        let contract_address =
            hearth_vm::utils::calculate_create_address(sender_address(), 0);
        let account = blockchain
            .storage
            .get_account_state(block.header.state_root, contract_address)
            .unwrap()
            .unwrap();
        assert_eq!(account.code_hash, crypto::keccak([0x00]));
        assert_eq!(
            blockchain.storage.get_account_code(account.code_hash).unwrap(),
            Some(Bytes::from(vec![0x00]))
        );
        // EIP-161: contracts deploy with nonce 1 after Spurious Dragon.
        assert_eq!(account.nonce, 1);
    }

    #[test]
    fn failing_transaction_is_recorded_not_rejected() {
        let (blockchain, genesis) = setup_chain();
        // Block 1 deploys a contract that always hits INVALID.
        let deploy = Transaction {
            nonce: 0,
            gas_price: U256::one(),
            gas: 100_000,
            to: TxKind::Create,
            // PUSH1 1 PUSH1 12 PUSH1 0 CODECOPY PUSH1 1 PUSH1 0 RETURN <fe>
            data: Bytes::from(hex_literal::hex!("6001600c60003960016000f3fe").to_vec()),
            ..Default::default()
        }
        .sign(&sender_key(), Some(61));
        let block_one = build_block(&blockchain, &genesis, vec![deploy], vec![], COINBASE);
        blockchain.add_block(&block_one).unwrap();
        let contract = hearth_vm::utils::calculate_create_address(sender_address(), 0);

        // Block 2 calls it; the transaction fails at the VM level but the
        // block is valid and the full gas limit is consumed.
        let doomed = signed_transfer(1, contract, U256::zero(), 60_000);
        let block_two =
            build_block(&blockchain, &block_one.header, vec![doomed], vec![], COINBASE);
        blockchain.add_block(&block_two).unwrap();

        let receipts = blockchain
            .storage
            .get_receipts(block_two.hash())
            .unwrap()
            .unwrap();
        assert_eq!(receipts[0].cumulative_gas_used, 60_000);
        assert_eq!(block_two.header.gas_used, 60_000);
    }

    #[test]
    fn wrong_nonce_rejects_the_block() {
        let (blockchain, genesis) = setup_chain();
        let tx = signed_transfer(5, RECIPIENT, U256::from(1u64), 30_000);
        let body = BlockBody {
            transactions: vec![tx],
            ommers: vec![],
        };
        let header = BlockHeader {
            parent_hash: genesis.compute_block_hash(),
            number: 1,
            timestamp: genesis.timestamp + 13,
            gas_limit: genesis.gas_limit,
            difficulty: genesis.difficulty,
            coinbase: COINBASE,
            transactions_root: compute_transactions_root(&body.transactions),
            ..Default::default()
        };
        let err = blockchain
            .add_block(&Block::new(header, body))
            .unwrap_err();
        assert!(matches!(
            err,
            BlockExecutionError::TxsExecution(InvalidTransactionError::NonceMismatch {
                expected: 0,
                got: 5
            })
        ));
    }

    #[test]
    fn tampered_gas_used_fails_post_validation() {
        let (blockchain, genesis) = setup_chain();
        let tx = signed_transfer(0, RECIPIENT, U256::from(1u64), 30_000);
        let mut block = build_block(&blockchain, &genesis, vec![tx], vec![], COINBASE);
        block.header.gas_used += 1;

        let err = blockchain.add_block(&block).unwrap_err();
        assert!(matches!(
            err,
            BlockExecutionError::ValidationAfterExec(PostExecutionError::GasUsedMismatch { .. })
        ));
        // A rejected block leaves no trace in the store.
        assert!(blockchain
            .storage
            .get_canonical_block_hash(1)
            .unwrap()
            .is_none());
    }

    #[test]
    fn ommer_rewards_follow_the_depth_schedule() {
        let (blockchain, genesis) = setup_chain();
        let block_one = build_block(&blockchain, &genesis, vec![], vec![], COINBASE);
        blockchain.add_block(&block_one).unwrap();

        // An ommer: a valid child of genesis mined by someone else.
        let ommer_miner = Address::from_low_u64_be(0x0333);
        let ommer = build_block(&blockchain, &genesis, vec![], vec![], ommer_miner).header;

        let block_two = build_block(
            &blockchain,
            &block_one.header,
            vec![],
            vec![ommer.clone()],
            COINBASE,
        );
        blockchain.add_block(&block_two).unwrap();

        let reward = U256::from(WEI_PER_ETHER) * 5;
        let root = block_two.header.state_root;
        // Ommer at depth 1: R * 7/8.
        assert_eq!(
            balance_at(&blockchain, root, ommer_miner),
            reward * 7 / 8
        );
        // Miner: two block rewards plus the 1/32 inclusion bonus.
        assert_eq!(
            balance_at(&blockchain, root, COINBASE),
            reward * 2 + reward / 32
        );
    }

    #[test]
    fn duplicate_ommer_is_rejected() {
        let (blockchain, genesis) = setup_chain();
        let block_one = build_block(&blockchain, &genesis, vec![], vec![], COINBASE);
        blockchain.add_block(&block_one).unwrap();

        let ommer = build_block(
            &blockchain,
            &genesis,
            vec![],
            vec![],
            Address::from_low_u64_be(0x0333),
        )
        .header;
        let block_two = build_block(
            &blockchain,
            &block_one.header,
            vec![],
            vec![ommer.clone(), ommer],
            COINBASE,
        );
        let err = blockchain.add_block(&block_two).unwrap_err();
        assert!(matches!(
            err,
            BlockExecutionError::ValidationBeforeExec(
                hearth_common::errors::InvalidBlockError::OmmerAlreadyIncluded
            )
        ));
    }
}
