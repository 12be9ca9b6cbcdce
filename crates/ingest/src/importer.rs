use std::collections::BTreeSet;
use std::sync::Arc;

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use explorer_chain::{ChainBlock, ChainTransaction, Gateway, VALID_NONCE, checksum, parse_hash};
use explorer_core::AppError;
use explorer_storage::models::{Block, Transaction};
use explorer_storage::{Json, Store};
use tokio_util::sync::CancellationToken;

/// Materializes node blocks into the store, replacing any previous copy of
/// the same height.
pub struct Importer {
    gateway: Arc<Gateway>,
    store: Arc<dyn Store>,
}

impl Importer {
    pub fn new(gateway: Arc<Gateway>, store: Arc<dyn Store>) -> Self {
        Self { gateway, store }
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Upsert `block` and swap its whole transaction set for the one the
    /// node returned. Importing the same height twice leaves exactly the
    /// second import's transactions behind.
    pub async fn import_block(
        &self,
        cancel: &CancellationToken,
        block: &ChainBlock,
    ) -> Result<Block, AppError> {
        tracing::debug!(
            number = block.number,
            hash = %block.hash,
            parent = %block.parent_hash,
            "importing block"
        );

        let header = block_document(block)?;

        let mut transactions = Vec::with_capacity(block.transactions.len());
        for (index, tx) in block.transactions.iter().enumerate() {
            transactions.push(self.materialize(cancel, block, &header, index, tx).await?);
        }

        let mut touched = BTreeSet::new();
        touched.insert(header.miner.clone());
        for tx in &transactions {
            touched.insert(tx.from_address.clone());
            if let Some(counterparty) = tx.counterparty() {
                touched.insert(counterparty.to_string());
            }
        }

        self.store.replace_block(&header, &transactions).await?;
        let touched: Vec<String> = touched.into_iter().collect();
        self.store.touch_active_addresses(&touched, Utc::now()).await?;

        tracing::debug!(number = block.number, txs = transactions.len(), "block imported");
        Ok(header)
    }

    /// Fetch height `number` from the node and import it. `None` when the
    /// node does not have that height.
    pub async fn import_height(
        &self,
        cancel: &CancellationToken,
        number: u64,
    ) -> Result<Option<Block>, AppError> {
        match self.gateway.block_by_number(cancel, number).await? {
            Some(block) => self.import_block(cancel, &block).await.map(Some),
            None => Ok(None),
        }
    }

    /// Stored Block(n), importing it from the node first when absent.
    pub async fn block_or_import(
        &self,
        cancel: &CancellationToken,
        number: i64,
    ) -> Result<Option<Block>, AppError> {
        if let Some(block) = self.store.block_by_number(number).await? {
            return Ok(Some(block));
        }
        let Ok(height) = u64::try_from(number) else {
            return Ok(None);
        };
        tracing::info!(number, "block not stored, importing it");
        self.import_height(cancel, height).await
    }

    /// Fill the receipt subset of a stored transaction once. Returns the
    /// stored document; a failed receipt fetch leaves it unchanged.
    pub async fn ensure_receipt(
        &self,
        cancel: &CancellationToken,
        tx_hash: &str,
    ) -> Result<Option<Transaction>, AppError> {
        let Some(mut tx) = self.store.transaction(tx_hash).await? else {
            return Ok(None);
        };
        if tx.receipt_received {
            return Ok(Some(tx));
        }

        let hash = parse_hash(tx_hash)?;
        let receipt = match self.gateway.transaction_receipt(cancel, hash).await {
            Ok(Some(receipt)) => receipt,
            Ok(None) => {
                tracing::warn!(tx = tx_hash, "receipt not available yet");
                return Ok(Some(tx));
            }
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                tracing::warn!(tx = tx_hash, error = %err, "failed to fetch receipt");
                return Ok(Some(tx));
            }
        };

        let gas_price: U256 = tx
            .gas_price
            .parse()
            .map_err(|e| AppError::Decode(format!("gas price {:?}: {e}", tx.gas_price)))?;
        let logs = serde_json::to_value(&receipt.logs).map_err(|e| AppError::Decode(e.to_string()))?;

        tx.gas_fee = (gas_price * U256::from(receipt.gas_used)).to_string();
        tx.gas_used = Some(i64::try_from(receipt.gas_used).unwrap_or(i64::MAX));
        tx.status = Some(receipt.status);
        if let Some(created) = receipt.contract_address.filter(|a| !a.is_zero()) {
            tx.contract_address = Some(checksum(&created));
        }
        tx.logs = Some(Json(logs));
        tx.receipt_received = true;

        self.store.save_transaction(&tx).await?;
        Ok(Some(tx))
    }

    async fn materialize(
        &self,
        cancel: &CancellationToken,
        block: &ChainBlock,
        header: &Block,
        index: usize,
        tx: &ChainTransaction,
    ) -> Result<Transaction, AppError> {
        let from = self.gateway.transaction_sender(cancel, tx, block.hash).await?;
        let gas_fee = U256::from(tx.gas_price) * U256::from(tx.gas_limit);

        let mut doc = Transaction {
            tx_hash: tx.hash.to_string(),
            from_address: checksum(&from),
            to_address: tx.to.as_ref().map(checksum).unwrap_or_default(),
            value: tx.value.to_string(),
            gas_price: tx.gas_price.to_string(),
            gas_fee: gas_fee.to_string(),
            gas_limit: to_i64(tx.gas_limit),
            nonce: tx.nonce.to_string(),
            block_number: header.number,
            block_hash: header.hash.clone(),
            tx_index: i32::try_from(index).unwrap_or(i32::MAX),
            created_at: header.created_at,
            input_data: hex::encode(&tx.input),
            input_empty: tx.input.is_empty(),
            contract_address: None,
            status: None,
            gas_used: None,
            logs: None,
            receipt_received: false,
        };

        if tx.to.is_none() {
            match self.gateway.transaction_receipt(cancel, tx.hash).await {
                Ok(Some(receipt)) => {
                    doc.contract_address = receipt
                        .contract_address
                        .filter(|a| !a.is_zero())
                        .map(|a| checksum(&a));
                    doc.status = Some(receipt.status);
                }
                Ok(None) => {
                    tracing::warn!(tx = %tx.hash, "no receipt for contract creation");
                }
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) => {
                    tracing::warn!(tx = %tx.hash, error = %err, "cannot get receipt for contract creation");
                }
            }
        }

        Ok(doc)
    }
}

/// Header document for `block`. Header fields only; transactions are
/// materialized separately.
fn block_document(block: &ChainBlock) -> Result<Block, AppError> {
    let number = i64::try_from(block.number)
        .map_err(|_| AppError::InvalidInput(format!("block number {} out of range", block.number)))?;

    Ok(Block {
        number,
        hash: block.hash.to_string(),
        parent_hash: block.parent_hash.to_string(),
        miner: checksum(&block.miner),
        gas_limit: to_i64(block.gas_limit),
        gas_used: to_i64(block.gas_used),
        difficulty: block.difficulty.to_string(),
        tx_count: i32::try_from(block.transactions.len()).unwrap_or(i32::MAX),
        tx_root: block.transactions_root.to_string(),
        sha3_uncles: block.ommers_hash.to_string(),
        extra_data: String::from_utf8_lossy(&block.extra_data).replace('\0', ""),
        nonce_valid: block.nonce == VALID_NONCE,
        created_at: block_time(block.timestamp),
    })
}

fn block_time(timestamp: u64) -> DateTime<Utc> {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_default()
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
