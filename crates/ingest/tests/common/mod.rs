#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use explorer_chain::{
    BlockTag, ChainBlock, ChainNode, ChainReceipt, ChainTransaction, Gateway, RetryPolicy,
    TokenDetails, TransferEvent,
};
use explorer_core::AppError;
use explorer_ingest::{CompileRequest, CompiledContract, Compiler, Importer};
use explorer_storage::{MemoryStore, Store};
use tokio_util::sync::CancellationToken;

/// Scripted chain node. Unknown lookups answer `None` or zero.
#[derive(Default)]
pub struct MockNode {
    pub state: Mutex<NodeState>,
}

#[derive(Default)]
pub struct NodeState {
    pub blocks: HashMap<u64, ChainBlock>,
    pub receipts: HashMap<B256, ChainReceipt>,
    pub failing_receipts: HashSet<B256>,
    pub senders: HashMap<B256, Address>,
    pub balances: HashMap<Address, U256>,
    pub code: HashMap<Address, Bytes>,
    pub tokens: HashMap<Address, TokenDetails>,
    pub token_balances: HashMap<(Address, Address), U256>,
    pub transfers: HashMap<Address, Vec<TransferEvent>>,
    pub height: u64,
    pub receipt_calls: usize,
    pub total_supply: U256,
    /// Number of upcoming `total_supply` calls that fail transiently.
    pub supply_failures: usize,
}

impl MockNode {
    pub fn with<R>(&self, f: impl FnOnce(&mut NodeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

#[async_trait]
impl ChainNode for MockNode {
    async fn balance(&self, address: Address, _at: BlockTag) -> Result<U256, AppError> {
        Ok(self.with(|s| s.balances.get(&address).copied().unwrap_or_default()))
    }

    async fn code(&self, address: Address) -> Result<Bytes, AppError> {
        Ok(self.with(|s| s.code.get(&address).cloned().unwrap_or_default()))
    }

    async fn total_supply(&self) -> Result<U256, AppError> {
        self.with(|s| {
            if s.supply_failures > 0 {
                s.supply_failures -= 1;
                return Err(AppError::Rpc("supply unavailable".into()));
            }
            Ok(s.total_supply)
        })
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<ChainBlock>, AppError> {
        Ok(self.with(|s| s.blocks.get(&number).cloned()))
    }

    async fn block_by_hash(&self, hash: B256) -> Result<Option<ChainBlock>, AppError> {
        Ok(self.with(|s| s.blocks.values().find(|b| b.hash == hash).cloned()))
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ChainReceipt>, AppError> {
        self.with(|s| {
            s.receipt_calls += 1;
            if s.failing_receipts.contains(&hash) {
                return Err(AppError::InvalidInput("receipt lookup rejected".into()));
            }
            Ok(s.receipts.get(&hash).cloned())
        })
    }

    async fn current_height(&self) -> Result<u64, AppError> {
        Ok(self.with(|s| s.height))
    }

    async fn transaction_sender(
        &self,
        tx: &ChainTransaction,
        _block_hash: B256,
    ) -> Result<Address, AppError> {
        self.with(|s| s.senders.get(&tx.hash).copied())
            .ok_or_else(|| AppError::Rpc(format!("unknown transaction {}", tx.hash)))
    }

    async fn token_details(&self, contract: Address, _code: &Bytes) -> Result<TokenDetails, AppError> {
        self.with(|s| s.tokens.get(&contract).cloned())
            .ok_or_else(|| AppError::Decode("not a token".into()))
    }

    async fn token_balance(&self, contract: Address, holder: Address) -> Result<U256, AppError> {
        Ok(self.with(|s| {
            s.token_balances
                .get(&(contract, holder))
                .copied()
                .unwrap_or_default()
        }))
    }

    async fn transfer_events(
        &self,
        contract: Address,
        from_block: u64,
    ) -> Result<Vec<TransferEvent>, AppError> {
        Ok(self.with(|s| {
            s.transfers
                .get(&contract)
                .map(|events| {
                    events
                        .iter()
                        .filter(|e| e.block_number >= from_block)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        }))
    }
}

/// Compiler stub returning a fixed artifact map, or a fixed error.
pub struct StubCompiler {
    pub result: Result<BTreeMap<String, CompiledContract>, String>,
}

#[async_trait]
impl Compiler for StubCompiler {
    async fn compile(
        &self,
        _cancel: &CancellationToken,
        _request: &CompileRequest,
    ) -> Result<BTreeMap<String, CompiledContract>, AppError> {
        self.result.clone().map_err(AppError::Compiler)
    }
}

pub struct Harness {
    pub node: Arc<MockNode>,
    pub store: Arc<MemoryStore>,
    pub importer: Arc<Importer>,
    pub cancel: CancellationToken,
}

pub fn harness() -> Harness {
    let node = Arc::new(MockNode::default());
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(Gateway::new(
        node.clone(),
        RetryPolicy::fixed(5, Duration::ZERO),
    ));
    let importer = Arc::new(Importer::new(gateway, store.clone() as Arc<dyn Store>));
    Harness {
        node,
        store,
        importer,
        cancel: CancellationToken::new(),
    }
}

pub fn hash(n: u64) -> B256 {
    B256::from(U256::from(n))
}

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn tx_hash(seed: u64) -> B256 {
    let mut bytes = [0xaa; 32];
    bytes[24..].copy_from_slice(&seed.to_be_bytes());
    B256::from(bytes)
}

pub fn transfer(seed: u64, from: Address, to: Address, value: u64) -> ChainTransaction {
    ChainTransaction {
        hash: tx_hash(seed),
        from: Some(from),
        to: Some(to),
        value: U256::from(value),
        gas_price: 1_000_000_000,
        gas_limit: 21_000,
        nonce: 0,
        input: Bytes::new(),
    }
}

/// Block `number` whose parent is `hash(number - 1)`.
pub fn block(number: u64, transactions: Vec<ChainTransaction>) -> ChainBlock {
    ChainBlock {
        number,
        hash: hash(number),
        parent_hash: hash(number.saturating_sub(1)),
        miner: addr(0xee),
        gas_limit: 8_000_000,
        gas_used: 21_000 * transactions.len() as u64,
        difficulty: U256::from(1),
        timestamp: 1_600_000_000 + number * 5,
        extra_data: Bytes::new(),
        nonce: 0,
        transactions_root: B256::ZERO,
        ommers_hash: B256::ZERO,
        transactions,
    }
}
