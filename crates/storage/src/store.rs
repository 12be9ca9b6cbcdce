use async_trait::async_trait;
use chrono::{DateTime, Utc};
use explorer_core::AppError;

use crate::models::*;

/// Write/read contract the ingestion engine requires of the persistent store.
///
/// Every write is an upsert keyed by natural identity, so concurrent
/// re-imports of the same entity are last-writer-wins. Absence is `None`,
/// never an error.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Blocks ─────────────────────────────────────────────────────────

    /// Upsert `block` by number and replace every transaction stored under
    /// that number with `transactions`, atomically.
    async fn replace_block(&self, block: &Block, transactions: &[Transaction]) -> Result<(), AppError>;

    async fn block_by_number(&self, number: i64) -> Result<Option<Block>, AppError>;

    async fn block_by_hash(&self, hash: &str) -> Result<Option<Block>, AppError>;

    /// Newest first.
    async fn latest_blocks(&self, skip: i64, limit: i64) -> Result<Vec<Block>, AppError>;

    async fn latest_block_number(&self) -> Result<Option<i64>, AppError>;

    // ─── Transactions ───────────────────────────────────────────────────

    async fn transaction(&self, tx_hash: &str) -> Result<Option<Transaction>, AppError>;

    async fn save_transaction(&self, tx: &Transaction) -> Result<(), AppError>;

    async fn count_block_transactions(&self, block_number: i64) -> Result<i64, AppError>;

    /// In node order.
    async fn block_transactions(
        &self,
        block_number: i64,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Transaction>, AppError>;

    /// Newest first.
    async fn address_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, AppError>;

    /// Transactions where `address` is sender or receiver.
    async fn count_address_transactions(&self, address: &str) -> Result<i64, AppError>;

    /// Keyset page over all transactions ordered by hash, starting after
    /// `after` (exclusive).
    async fn transactions_after(
        &self,
        after: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Transaction>, AppError>;

    /// Height of the transaction that created `contract`.
    async fn contract_creation_block(&self, contract: &str) -> Result<Option<i64>, AppError>;

    // ─── Active addresses ───────────────────────────────────────────────

    async fn touch_active_addresses(&self, addresses: &[String], at: DateTime<Utc>) -> Result<(), AppError>;

    /// Most recently active first.
    async fn active_addresses_since(&self, since: DateTime<Utc>) -> Result<Vec<ActiveAddress>, AppError>;

    // ─── Addresses ──────────────────────────────────────────────────────

    async fn save_address(&self, address: &Address) -> Result<(), AppError>;

    async fn address(&self, address: &str) -> Result<Option<Address>, AppError>;

    /// Positive balances, richest first, skipping `exclude`.
    async fn richlist(&self, skip: i64, limit: i64, exclude: &[String]) -> Result<Vec<Address>, AppError>;

    async fn count_token_holders(&self, contract: &str) -> Result<i64, AppError>;

    async fn count_contract_internal_transactions(&self, contract: &str) -> Result<i64, AppError>;

    /// Internal transactions where `address` is sender or receiver.
    async fn count_token_transactions(&self, address: &str) -> Result<i64, AppError>;

    // ─── Token holders ──────────────────────────────────────────────────

    async fn save_token_holder(&self, holder: &TokenHolder) -> Result<(), AppError>;

    /// Largest balance first.
    async fn token_holders(&self, contract: &str, skip: i64, limit: i64) -> Result<Vec<TokenHolder>, AppError>;

    /// Largest balance first.
    async fn owned_tokens(&self, holder: &str, skip: i64, limit: i64) -> Result<Vec<TokenHolder>, AppError>;

    // ─── Internal transactions ──────────────────────────────────────────

    async fn save_internal_transaction(&self, tx: &InternalTransaction) -> Result<(), AppError>;

    /// Newest block first.
    async fn internal_transactions(
        &self,
        query: &InternalTransactionQuery,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<InternalTransaction>, AppError>;

    // ─── Contracts ──────────────────────────────────────────────────────

    /// Insert the contract or refresh its bytecode. Verification fields of an
    /// existing contract are left untouched.
    async fn save_contract(&self, contract: &Contract) -> Result<(), AppError>;

    async fn contract(&self, address: &str) -> Result<Option<Contract>, AppError>;

    /// Store the verification fields and set `valid`, but only if the stored
    /// contract is still unverified. Returns whether the transition happened.
    async fn mark_contract_verified(&self, contract: &Contract) -> Result<bool, AppError>;

    // ─── Stats ──────────────────────────────────────────────────────────

    /// Transactions whose block time is at or after `since`; all of them
    /// when `since` is `None`.
    async fn count_transactions_since(&self, since: Option<DateTime<Utc>>) -> Result<i64, AppError>;

    async fn save_stats(&self, stats: &Stats) -> Result<(), AppError>;

    /// Most recent snapshot.
    async fn latest_stats(&self) -> Result<Option<Stats>, AppError>;

    /// Blocks per miner created at or after `since`, most productive first.
    async fn miner_block_counts_since(&self, since: DateTime<Utc>) -> Result<Vec<SignerStats>, AppError>;

    /// Height range of blocks created at or after `since`.
    async fn block_range_since(&self, since: DateTime<Utc>) -> Result<Option<BlockRange>, AppError>;

    // ─── Data migrations ────────────────────────────────────────────────

    async fn migration_applied(&self, id: i64) -> Result<bool, AppError>;

    /// Ascending by id.
    async fn applied_migrations(&self) -> Result<Vec<MigrationRecord>, AppError>;

    async fn record_migration(&self, record: &MigrationRecord) -> Result<(), AppError>;

    async fn remove_migration(&self, id: i64) -> Result<(), AppError>;

    async fn save_address_transactions(&self, rows: &[AddressTransaction]) -> Result<(), AppError>;

    async fn clear_address_transactions(&self) -> Result<(), AppError>;
}
