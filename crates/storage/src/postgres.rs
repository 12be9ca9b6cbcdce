use async_trait::async_trait;
use chrono::{DateTime, Utc};
use explorer_core::AppError;
use sqlx::PgPool;

use crate::models::*;
use crate::repos;
use crate::store::Store;

fn db(e: sqlx::Error) -> AppError {
    AppError::Database(e.to_string())
}

/// [`Store`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn replace_block(&self, block: &Block, transactions: &[Transaction]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        repos::upsert_block(&mut *tx, block).await.map_err(db)?;
        let removed = repos::delete_block_transactions(&mut *tx, block.number)
            .await
            .map_err(db)?;
        for chunk in transactions.chunks(repos::rows_per_statement(repos::TRANSACTION_COLUMNS)) {
            repos::insert_transactions_batch(&mut *tx, chunk)
                .await
                .map_err(db)?;
        }
        tx.commit().await.map_err(db)?;

        tracing::debug!(
            block = block.number,
            removed,
            inserted = transactions.len(),
            "replaced block"
        );
        Ok(())
    }

    async fn block_by_number(&self, number: i64) -> Result<Option<Block>, AppError> {
        repos::get_block_by_number(&self.pool, number).await.map_err(db)
    }

    async fn block_by_hash(&self, hash: &str) -> Result<Option<Block>, AppError> {
        repos::get_block_by_hash(&self.pool, hash).await.map_err(db)
    }

    async fn latest_blocks(&self, skip: i64, limit: i64) -> Result<Vec<Block>, AppError> {
        repos::get_latest_blocks(&self.pool, skip, limit).await.map_err(db)
    }

    async fn latest_block_number(&self) -> Result<Option<i64>, AppError> {
        repos::get_latest_block(&self.pool).await.map_err(db)
    }

    async fn transaction(&self, tx_hash: &str) -> Result<Option<Transaction>, AppError> {
        repos::get_transaction(&self.pool, tx_hash).await.map_err(db)
    }

    async fn save_transaction(&self, tx: &Transaction) -> Result<(), AppError> {
        repos::upsert_transaction(&self.pool, tx).await.map_err(db)
    }

    async fn count_block_transactions(&self, block_number: i64) -> Result<i64, AppError> {
        repos::count_block_transactions(&self.pool, block_number)
            .await
            .map_err(db)
    }

    async fn block_transactions(
        &self,
        block_number: i64,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Transaction>, AppError> {
        repos::get_block_transactions(&self.pool, block_number, skip, limit)
            .await
            .map_err(db)
    }

    async fn address_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, AppError> {
        repos::get_address_transactions(&self.pool, filter).await.map_err(db)
    }

    async fn count_address_transactions(&self, address: &str) -> Result<i64, AppError> {
        repos::count_address_transactions(&self.pool, address)
            .await
            .map_err(db)
    }

    async fn transactions_after(
        &self,
        after: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Transaction>, AppError> {
        repos::get_transactions_after(&self.pool, after, limit)
            .await
            .map_err(db)
    }

    async fn contract_creation_block(&self, contract: &str) -> Result<Option<i64>, AppError> {
        repos::get_contract_creation_block(&self.pool, contract)
            .await
            .map_err(db)
    }

    async fn touch_active_addresses(&self, addresses: &[String], at: DateTime<Utc>) -> Result<(), AppError> {
        for chunk in addresses.chunks(repos::rows_per_statement(repos::ACTIVE_ADDRESS_COLUMNS)) {
            repos::upsert_active_addresses(&self.pool, chunk, at)
                .await
                .map_err(db)?;
        }
        Ok(())
    }

    async fn active_addresses_since(&self, since: DateTime<Utc>) -> Result<Vec<ActiveAddress>, AppError> {
        repos::get_active_addresses_since(&self.pool, since)
            .await
            .map_err(db)
    }

    async fn save_address(&self, address: &Address) -> Result<(), AppError> {
        repos::upsert_address(&self.pool, address).await.map_err(db)
    }

    async fn address(&self, address: &str) -> Result<Option<Address>, AppError> {
        repos::get_address(&self.pool, address).await.map_err(db)
    }

    async fn richlist(&self, skip: i64, limit: i64, exclude: &[String]) -> Result<Vec<Address>, AppError> {
        repos::get_richlist(&self.pool, skip, limit, exclude)
            .await
            .map_err(db)
    }

    async fn count_token_holders(&self, contract: &str) -> Result<i64, AppError> {
        repos::count_token_holders(&self.pool, contract).await.map_err(db)
    }

    async fn count_contract_internal_transactions(&self, contract: &str) -> Result<i64, AppError> {
        repos::count_contract_internal_transactions(&self.pool, contract)
            .await
            .map_err(db)
    }

    async fn count_token_transactions(&self, address: &str) -> Result<i64, AppError> {
        repos::count_token_transactions(&self.pool, address)
            .await
            .map_err(db)
    }

    async fn save_token_holder(&self, holder: &TokenHolder) -> Result<(), AppError> {
        repos::upsert_token_holder(&self.pool, holder).await.map_err(db)
    }

    async fn token_holders(&self, contract: &str, skip: i64, limit: i64) -> Result<Vec<TokenHolder>, AppError> {
        repos::get_token_holders(&self.pool, contract, skip, limit)
            .await
            .map_err(db)
    }

    async fn owned_tokens(&self, holder: &str, skip: i64, limit: i64) -> Result<Vec<TokenHolder>, AppError> {
        repos::get_owned_tokens(&self.pool, holder, skip, limit)
            .await
            .map_err(db)
    }

    async fn save_internal_transaction(&self, tx: &InternalTransaction) -> Result<(), AppError> {
        repos::upsert_internal_transaction(&self.pool, tx)
            .await
            .map_err(db)
    }

    async fn internal_transactions(
        &self,
        query: &InternalTransactionQuery,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<InternalTransaction>, AppError> {
        repos::get_internal_transactions(&self.pool, query, skip, limit)
            .await
            .map_err(db)
    }

    async fn save_contract(&self, contract: &Contract) -> Result<(), AppError> {
        repos::upsert_contract(&self.pool, contract).await.map_err(db)
    }

    async fn contract(&self, address: &str) -> Result<Option<Contract>, AppError> {
        repos::get_contract(&self.pool, address).await.map_err(db)
    }

    async fn mark_contract_verified(&self, contract: &Contract) -> Result<bool, AppError> {
        repos::mark_contract_verified(&self.pool, contract)
            .await
            .map_err(db)
    }

    async fn count_transactions_since(&self, since: Option<DateTime<Utc>>) -> Result<i64, AppError> {
        repos::count_transactions_since(&self.pool, since)
            .await
            .map_err(db)
    }

    async fn save_stats(&self, stats: &Stats) -> Result<(), AppError> {
        repos::insert_stats(&self.pool, stats).await.map_err(db)
    }

    async fn latest_stats(&self) -> Result<Option<Stats>, AppError> {
        repos::get_latest_stats(&self.pool).await.map_err(db)
    }

    async fn miner_block_counts_since(&self, since: DateTime<Utc>) -> Result<Vec<SignerStats>, AppError> {
        repos::get_miner_block_counts(&self.pool, since)
            .await
            .map_err(db)
    }

    async fn block_range_since(&self, since: DateTime<Utc>) -> Result<Option<BlockRange>, AppError> {
        repos::get_block_range(&self.pool, since).await.map_err(db)
    }

    async fn migration_applied(&self, id: i64) -> Result<bool, AppError> {
        repos::migration_exists(&self.pool, id).await.map_err(db)
    }

    async fn applied_migrations(&self) -> Result<Vec<MigrationRecord>, AppError> {
        repos::get_migration_records(&self.pool).await.map_err(db)
    }

    async fn record_migration(&self, record: &MigrationRecord) -> Result<(), AppError> {
        repos::insert_migration_record(&self.pool, record)
            .await
            .map_err(db)
    }

    async fn remove_migration(&self, id: i64) -> Result<(), AppError> {
        repos::delete_migration_record(&self.pool, id)
            .await
            .map_err(db)
    }

    async fn save_address_transactions(&self, rows: &[AddressTransaction]) -> Result<(), AppError> {
        repos::upsert_address_transactions(&self.pool, rows)
            .await
            .map_err(db)
    }

    async fn clear_address_transactions(&self) -> Result<(), AppError> {
        repos::truncate_address_transactions(&self.pool)
            .await
            .map_err(db)
    }
}
