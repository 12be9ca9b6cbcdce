use alloy::primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use explorer_core::AppError;

use crate::types::{BlockTag, ChainBlock, ChainReceipt, ChainTransaction, TokenDetails, TransferEvent};

/// Read capability of a chain node.
///
/// Implementations make a single attempt per call; retries, back-off and
/// cancellation are layered on top by [`crate::Gateway`].
#[async_trait]
pub trait ChainNode: Send + Sync {
    async fn balance(&self, address: Address, at: BlockTag) -> Result<U256, AppError>;

    async fn code(&self, address: Address) -> Result<Bytes, AppError>;

    /// Total coin supply as reported by the node.
    async fn total_supply(&self) -> Result<U256, AppError>;

    async fn block_by_number(&self, number: u64) -> Result<Option<ChainBlock>, AppError>;

    async fn block_by_hash(&self, hash: B256) -> Result<Option<ChainBlock>, AppError>;

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ChainReceipt>, AppError>;

    async fn current_height(&self) -> Result<u64, AppError>;

    /// Resolve the sender of a transaction that did not carry one.
    async fn transaction_sender(
        &self,
        tx: &ChainTransaction,
        block_hash: B256,
    ) -> Result<Address, AppError>;

    /// ERC-20 metadata plus interfaces detected from `code`.
    async fn token_details(&self, contract: Address, code: &Bytes) -> Result<TokenDetails, AppError>;

    async fn token_balance(&self, contract: Address, holder: Address) -> Result<U256, AppError>;

    /// All `Transfer` events emitted by `contract` from `from_block` to the head.
    async fn transfer_events(
        &self,
        contract: Address,
        from_block: u64,
    ) -> Result<Vec<TransferEvent>, AppError>;
}
