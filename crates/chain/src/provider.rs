use alloy::{
    consensus::{BlockHeader, Transaction as ConsensusTx},
    eips::{BlockId, BlockNumberOrTag},
    network::{Ethereum, TransactionResponse},
    primitives::{Address, B256, Bytes, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{Block, Filter, Transaction, TransactionReceipt},
    sol_types::SolEvent,
};
use async_trait::async_trait;
use explorer_core::AppError;

use crate::abi::ERC20;
use crate::decoder;
use crate::interfaces;
use crate::node::ChainNode;
use crate::types::{
    BlockTag, ChainBlock, ChainLog, ChainReceipt, ChainTransaction, TokenDetails, TransferEvent,
};

/// The RPC provider type used throughout the application.
pub type ChainProvider = DynProvider<Ethereum>;

/// Width of a single `eth_getLogs` window when scanning transfer history.
const LOG_SCAN_WINDOW: u64 = 10_000;

/// Create an HTTP provider from an RPC URL string.
pub fn create_provider(rpc_url: &str) -> eyre::Result<ChainProvider> {
    let url = rpc_url.parse()?;
    let provider = ProviderBuilder::new().connect_http(url).erased();
    Ok(provider)
}

/// [`ChainNode`] backed by an alloy JSON-RPC provider.
#[derive(Clone)]
pub struct AlloyNode {
    provider: ChainProvider,
}

impl AlloyNode {
    pub fn new(provider: ChainProvider) -> Self {
        Self { provider }
    }

    pub fn connect(rpc_url: &str) -> eyre::Result<Self> {
        Ok(Self::new(create_provider(rpc_url)?))
    }
}

fn rpc_error(e: impl std::fmt::Display) -> AppError {
    AppError::Rpc(e.to_string())
}

/// Transport failures are worth retrying; reverts and undecodable return
/// data are not.
fn contract_error(e: alloy::contract::Error) -> AppError {
    match e {
        alloy::contract::Error::TransportError(t) => AppError::Rpc(t.to_string()),
        other => AppError::Decode(other.to_string()),
    }
}

fn convert_block(block: Block) -> ChainBlock {
    let header = &block.header;
    let transactions = block
        .transactions
        .as_transactions()
        .unwrap_or_default()
        .iter()
        .map(convert_transaction)
        .collect();

    ChainBlock {
        number: header.number(),
        hash: header.hash,
        parent_hash: header.parent_hash(),
        miner: header.beneficiary(),
        gas_limit: header.gas_limit(),
        gas_used: header.gas_used(),
        difficulty: header.difficulty(),
        timestamp: header.timestamp(),
        extra_data: header.extra_data().clone(),
        nonce: header.nonce().map(|n| u64::from_be_bytes(n.0)).unwrap_or_default(),
        transactions_root: header.transactions_root(),
        ommers_hash: header.ommers_hash(),
        transactions,
    }
}

fn convert_transaction(tx: &Transaction) -> ChainTransaction {
    let gas_price = tx
        .effective_gas_price
        .or_else(|| ConsensusTx::gas_price(tx))
        .unwrap_or_else(|| ConsensusTx::max_fee_per_gas(tx));

    ChainTransaction {
        hash: TransactionResponse::tx_hash(tx),
        from: Some(TransactionResponse::from(tx)),
        to: ConsensusTx::to(tx),
        value: ConsensusTx::value(tx),
        gas_price,
        gas_limit: ConsensusTx::gas_limit(tx),
        nonce: ConsensusTx::nonce(tx),
        input: ConsensusTx::input(tx).clone(),
    }
}

fn convert_receipt(receipt: TransactionReceipt) -> ChainReceipt {
    let logs = receipt
        .inner
        .logs()
        .iter()
        .map(|log| ChainLog {
            address: log.address(),
            topics: log.topics().to_vec(),
            data: log.data().data.clone(),
            log_index: log.log_index,
        })
        .collect();

    ChainReceipt {
        transaction_hash: receipt.transaction_hash,
        contract_address: receipt.contract_address,
        status: receipt.status(),
        gas_used: receipt.gas_used,
        logs,
    }
}

#[async_trait]
impl ChainNode for AlloyNode {
    async fn balance(&self, address: Address, at: BlockTag) -> Result<U256, AppError> {
        let block = match at {
            BlockTag::Latest => BlockId::latest(),
            BlockTag::Number(n) => BlockId::Number(BlockNumberOrTag::Number(n)),
        };
        self.provider
            .get_balance(address)
            .block_id(block)
            .await
            .map_err(rpc_error)
    }

    async fn code(&self, address: Address) -> Result<Bytes, AppError> {
        self.provider.get_code_at(address).await.map_err(rpc_error)
    }

    async fn total_supply(&self) -> Result<U256, AppError> {
        self.provider
            .raw_request::<_, U256>("eth_totalSupply".into(), ("latest",))
            .await
            .map_err(rpc_error)
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<ChainBlock>, AppError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .full()
            .await
            .map_err(rpc_error)?;
        Ok(block.map(convert_block))
    }

    async fn block_by_hash(&self, hash: B256) -> Result<Option<ChainBlock>, AppError> {
        let block = self
            .provider
            .get_block_by_hash(hash)
            .full()
            .await
            .map_err(rpc_error)?;
        Ok(block.map(convert_block))
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ChainReceipt>, AppError> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(rpc_error)?;
        Ok(receipt.map(convert_receipt))
    }

    async fn current_height(&self) -> Result<u64, AppError> {
        self.provider.get_block_number().await.map_err(rpc_error)
    }

    async fn transaction_sender(
        &self,
        tx: &ChainTransaction,
        block_hash: B256,
    ) -> Result<Address, AppError> {
        if let Some(from) = tx.from {
            return Ok(from);
        }
        let fetched = self
            .provider
            .get_transaction_by_hash(tx.hash)
            .await
            .map_err(rpc_error)?
            .ok_or_else(|| {
                AppError::Rpc(format!("transaction {:#x} in block {block_hash:#x} not served by node", tx.hash))
            })?;
        Ok(TransactionResponse::from(&fetched))
    }

    async fn token_details(&self, contract: Address, code: &Bytes) -> Result<TokenDetails, AppError> {
        let interfaces = interfaces::detect(code);
        let mut details = TokenDetails {
            interfaces,
            ..Default::default()
        };
        if !details.is_erc20() {
            return Ok(details);
        }

        let token = ERC20::new(contract, self.provider.clone());
        details.name = token.name().call().await.map_err(contract_error)?;
        details.symbol = token.symbol().call().await.map_err(contract_error)?;
        details.decimals = token.decimals().call().await.map_err(contract_error)?;
        details.total_supply = token.totalSupply().call().await.map_err(contract_error)?;
        Ok(details)
    }

    async fn token_balance(&self, contract: Address, holder: Address) -> Result<U256, AppError> {
        ERC20::new(contract, self.provider.clone())
            .balanceOf(holder)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn transfer_events(
        &self,
        contract: Address,
        from_block: u64,
    ) -> Result<Vec<TransferEvent>, AppError> {
        let head = self.provider.get_block_number().await.map_err(rpc_error)?;
        let mut events = Vec::new();
        let mut from = from_block;

        while from <= head {
            let to = std::cmp::min(from + LOG_SCAN_WINDOW - 1, head);
            let filter = Filter::new()
                .address(contract)
                .event_signature(ERC20::Transfer::SIGNATURE_HASH)
                .from_block(from)
                .to_block(to);

            let logs = self.provider.get_logs(&filter).await.map_err(rpc_error)?;
            events.extend(logs.iter().filter_map(decoder::decode_transfer_log));
            from = to + 1;
        }

        Ok(events)
    }
}
