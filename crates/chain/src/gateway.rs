use std::sync::Arc;

use alloy::primitives::{Address, B256, Bytes, U256};
use explorer_core::AppError;
use tokio_util::sync::CancellationToken;

use crate::node::ChainNode;
use crate::retry::{RetryPolicy, retry};
use crate::types::{BlockTag, ChainBlock, ChainReceipt, ChainTransaction, TokenDetails, TransferEvent};

/// Retrying RPC gateway: every chain-node call goes through the same
/// [`RetryPolicy`] and honours the caller's cancellation token.
#[derive(Clone)]
pub struct Gateway {
    node: Arc<dyn ChainNode>,
    policy: RetryPolicy,
}

impl Gateway {
    pub fn new(node: Arc<dyn ChainNode>, policy: RetryPolicy) -> Self {
        Self { node, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn balance(
        &self,
        cancel: &CancellationToken,
        address: Address,
        at: BlockTag,
    ) -> Result<U256, AppError> {
        retry(&self.policy, cancel, "eth_getBalance", || self.node.balance(address, at)).await
    }

    pub async fn code(&self, cancel: &CancellationToken, address: Address) -> Result<Bytes, AppError> {
        retry(&self.policy, cancel, "eth_getCode", || self.node.code(address)).await
    }

    pub async fn total_supply(&self, cancel: &CancellationToken) -> Result<U256, AppError> {
        retry(&self.policy, cancel, "eth_totalSupply", || self.node.total_supply()).await
    }

    /// Total supply minus the balances of `locked` accounts. The whole
    /// computation is one retried unit, so every attempt reads a fresh total
    /// together with fresh balances.
    pub async fn circulating_supply(
        &self,
        cancel: &CancellationToken,
        locked: &[Address],
    ) -> Result<U256, AppError> {
        retry(&self.policy, cancel, "circulating_supply", || async move {
            let total = self.node.total_supply().await?;
            let mut held = U256::ZERO;
            for account in locked {
                let balance = self.node.balance(*account, BlockTag::Latest).await?;
                held = held.saturating_add(balance);
            }
            Ok(total.saturating_sub(held))
        })
        .await
    }

    pub async fn block_by_number(
        &self,
        cancel: &CancellationToken,
        number: u64,
    ) -> Result<Option<ChainBlock>, AppError> {
        retry(&self.policy, cancel, "eth_getBlockByNumber", || {
            self.node.block_by_number(number)
        })
        .await
    }

    pub async fn block_by_hash(
        &self,
        cancel: &CancellationToken,
        hash: B256,
    ) -> Result<Option<ChainBlock>, AppError> {
        retry(&self.policy, cancel, "eth_getBlockByHash", || self.node.block_by_hash(hash)).await
    }

    pub async fn transaction_receipt(
        &self,
        cancel: &CancellationToken,
        hash: B256,
    ) -> Result<Option<ChainReceipt>, AppError> {
        retry(&self.policy, cancel, "eth_getTransactionReceipt", || {
            self.node.transaction_receipt(hash)
        })
        .await
    }

    pub async fn current_height(&self, cancel: &CancellationToken) -> Result<u64, AppError> {
        retry(&self.policy, cancel, "eth_blockNumber", || self.node.current_height()).await
    }

    pub async fn transaction_sender(
        &self,
        cancel: &CancellationToken,
        tx: &ChainTransaction,
        block_hash: B256,
    ) -> Result<Address, AppError> {
        if let Some(from) = tx.from {
            return Ok(from);
        }
        retry(&self.policy, cancel, "eth_getTransactionByHash", || {
            self.node.transaction_sender(tx, block_hash)
        })
        .await
    }

    pub async fn token_details(
        &self,
        cancel: &CancellationToken,
        contract: Address,
        code: &Bytes,
    ) -> Result<TokenDetails, AppError> {
        retry(&self.policy, cancel, "token_details", || {
            self.node.token_details(contract, code)
        })
        .await
    }

    pub async fn token_balance(
        &self,
        cancel: &CancellationToken,
        contract: Address,
        holder: Address,
    ) -> Result<U256, AppError> {
        retry(&self.policy, cancel, "balanceOf", || {
            self.node.token_balance(contract, holder)
        })
        .await
    }

    pub async fn transfer_events(
        &self,
        cancel: &CancellationToken,
        contract: Address,
        from_block: u64,
    ) -> Result<Vec<TransferEvent>, AppError> {
        retry(&self.policy, cancel, "eth_getLogs", || {
            self.node.transfer_events(contract, from_block)
        })
        .await
    }
}
