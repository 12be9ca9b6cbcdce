use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use explorer_core::AppError;
use tokio::sync::RwLock;

use crate::models::*;
use crate::store::Store;

#[derive(Default)]
struct Tables {
    blocks: BTreeMap<i64, Block>,
    transactions: BTreeMap<String, Transaction>,
    addresses: HashMap<String, Address>,
    token_holders: HashMap<(String, String), TokenHolder>,
    internal_transactions: HashMap<String, InternalTransaction>,
    contracts: HashMap<String, Contract>,
    active_addresses: HashMap<String, DateTime<Utc>>,
    migrations: BTreeMap<i64, MigrationRecord>,
    address_transactions: BTreeMap<(String, String), AddressTransaction>,
    stats: Vec<Stats>,
}

/// In-process [`Store`] with the same upsert and ordering semantics as
/// the PostgreSQL store. Used by tests and local tooling.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored transactions, across all blocks.
    pub async fn transaction_count(&self) -> usize {
        self.tables.read().await.transactions.len()
    }

    /// Number of per-address lookup rows.
    pub async fn address_transaction_count(&self) -> usize {
        self.tables.read().await.address_transactions.len()
    }
}

fn page<T>(items: impl Iterator<Item = T>, skip: i64, limit: i64) -> Vec<T> {
    items
        .skip(skip.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn replace_block(&self, block: &Block, transactions: &[Transaction]) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        t.blocks.insert(block.number, block.clone());
        t.transactions.retain(|_, tx| tx.block_number != block.number);
        for tx in transactions {
            t.transactions.insert(tx.tx_hash.clone(), tx.clone());
        }
        Ok(())
    }

    async fn block_by_number(&self, number: i64) -> Result<Option<Block>, AppError> {
        Ok(self.tables.read().await.blocks.get(&number).cloned())
    }

    async fn block_by_hash(&self, hash: &str) -> Result<Option<Block>, AppError> {
        let t = self.tables.read().await;
        Ok(t.blocks.values().find(|b| b.hash == hash).cloned())
    }

    async fn latest_blocks(&self, skip: i64, limit: i64) -> Result<Vec<Block>, AppError> {
        let t = self.tables.read().await;
        Ok(page(t.blocks.values().rev().cloned(), skip, limit))
    }

    async fn latest_block_number(&self) -> Result<Option<i64>, AppError> {
        Ok(self.tables.read().await.blocks.keys().next_back().copied())
    }

    async fn transaction(&self, tx_hash: &str) -> Result<Option<Transaction>, AppError> {
        Ok(self.tables.read().await.transactions.get(tx_hash).cloned())
    }

    async fn save_transaction(&self, tx: &Transaction) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        t.transactions.insert(tx.tx_hash.clone(), tx.clone());
        Ok(())
    }

    async fn count_block_transactions(&self, block_number: i64) -> Result<i64, AppError> {
        let t = self.tables.read().await;
        Ok(t.transactions
            .values()
            .filter(|tx| tx.block_number == block_number)
            .count() as i64)
    }

    async fn block_transactions(
        &self,
        block_number: i64,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Transaction>, AppError> {
        let t = self.tables.read().await;
        let mut txs: Vec<_> = t
            .transactions
            .values()
            .filter(|tx| tx.block_number == block_number)
            .cloned()
            .collect();
        txs.sort_by_key(|tx| tx.tx_index);
        Ok(page(txs.into_iter(), skip, limit))
    }

    async fn address_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, AppError> {
        let t = self.tables.read().await;
        let mut txs: Vec<_> = t
            .transactions
            .values()
            .filter(|tx| tx.from_address == filter.address || tx.to_address == filter.address)
            .filter(|tx| tx.created_at >= filter.from_time && tx.created_at <= filter.to_time)
            .filter(|tx| filter.input_empty.is_none_or(|e| tx.input_empty == e))
            .cloned()
            .collect();
        txs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(txs.into_iter(), filter.skip, filter.limit))
    }

    async fn count_address_transactions(&self, address: &str) -> Result<i64, AppError> {
        let t = self.tables.read().await;
        Ok(t.transactions
            .values()
            .filter(|tx| tx.from_address == address || tx.to_address == address)
            .count() as i64)
    }

    async fn transactions_after(
        &self,
        after: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Transaction>, AppError> {
        let t = self.tables.read().await;
        let items = t
            .transactions
            .iter()
            .filter(|(hash, _)| after.is_none_or(|a| hash.as_str() > a))
            .map(|(_, tx)| tx.clone());
        Ok(page(items, 0, limit))
    }

    async fn contract_creation_block(&self, contract: &str) -> Result<Option<i64>, AppError> {
        let t = self.tables.read().await;
        Ok(t.transactions
            .values()
            .filter(|tx| tx.contract_address.as_deref() == Some(contract))
            .map(|tx| tx.block_number)
            .min())
    }

    async fn touch_active_addresses(&self, addresses: &[String], at: DateTime<Utc>) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        for address in addresses {
            t.active_addresses.insert(address.clone(), at);
        }
        Ok(())
    }

    async fn active_addresses_since(&self, since: DateTime<Utc>) -> Result<Vec<ActiveAddress>, AppError> {
        let t = self.tables.read().await;
        let mut active: Vec<_> = t
            .active_addresses
            .iter()
            .filter(|(_, at)| **at >= since)
            .map(|(address, at)| ActiveAddress {
                address: address.clone(),
                updated_at: *at,
            })
            .collect();
        active.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.address.cmp(&b.address)));
        Ok(active)
    }

    async fn save_address(&self, address: &Address) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        t.addresses.insert(address.address.clone(), address.clone());
        Ok(())
    }

    async fn address(&self, address: &str) -> Result<Option<Address>, AppError> {
        Ok(self.tables.read().await.addresses.get(address).cloned())
    }

    async fn richlist(&self, skip: i64, limit: i64, exclude: &[String]) -> Result<Vec<Address>, AppError> {
        let t = self.tables.read().await;
        let mut rich: Vec<_> = t
            .addresses
            .values()
            .filter(|a| a.balance_float > 0.0 && !exclude.contains(&a.address))
            .cloned()
            .collect();
        rich.sort_by(|a, b| {
            b.balance_float
                .total_cmp(&a.balance_float)
                .then_with(|| a.address.cmp(&b.address))
        });
        Ok(page(rich.into_iter(), skip, limit))
    }

    async fn count_token_holders(&self, contract: &str) -> Result<i64, AppError> {
        let t = self.tables.read().await;
        Ok(t.token_holders
            .keys()
            .filter(|(c, _)| c == contract)
            .count() as i64)
    }

    async fn count_contract_internal_transactions(&self, contract: &str) -> Result<i64, AppError> {
        let t = self.tables.read().await;
        Ok(t.internal_transactions
            .values()
            .filter(|tx| tx.contract_address == contract)
            .count() as i64)
    }

    async fn count_token_transactions(&self, address: &str) -> Result<i64, AppError> {
        let t = self.tables.read().await;
        Ok(t.internal_transactions
            .values()
            .filter(|tx| tx.from_address == address || tx.to_address == address)
            .count() as i64)
    }

    async fn save_token_holder(&self, holder: &TokenHolder) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        let key = (holder.contract_address.clone(), holder.holder_address.clone());
        t.token_holders.insert(key, holder.clone());
        Ok(())
    }

    async fn token_holders(&self, contract: &str, skip: i64, limit: i64) -> Result<Vec<TokenHolder>, AppError> {
        let t = self.tables.read().await;
        let mut holders: Vec<_> = t
            .token_holders
            .values()
            .filter(|h| h.contract_address == contract)
            .cloned()
            .collect();
        holders.sort_by(|a, b| b.balance_int.cmp(&a.balance_int));
        Ok(page(holders.into_iter(), skip, limit))
    }

    async fn owned_tokens(&self, holder: &str, skip: i64, limit: i64) -> Result<Vec<TokenHolder>, AppError> {
        let t = self.tables.read().await;
        let mut owned: Vec<_> = t
            .token_holders
            .values()
            .filter(|h| h.holder_address == holder)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.balance_int.cmp(&a.balance_int));
        Ok(page(owned.into_iter(), skip, limit))
    }

    async fn save_internal_transaction(&self, tx: &InternalTransaction) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        t.internal_transactions
            .insert(tx.transaction_hash.clone(), tx.clone());
        Ok(())
    }

    async fn internal_transactions(
        &self,
        query: &InternalTransactionQuery,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<InternalTransaction>, AppError> {
        let t = self.tables.read().await;
        let mut txs: Vec<_> = t
            .internal_transactions
            .values()
            .filter(|tx| match query {
                InternalTransactionQuery::ByContract(c) => &tx.contract_address == c,
                InternalTransactionQuery::ByParticipant(a) => {
                    &tx.from_address == a || &tx.to_address == a
                }
            })
            .cloned()
            .collect();
        txs.sort_by(|a, b| b.block_number.cmp(&a.block_number));
        Ok(page(txs.into_iter(), skip, limit))
    }

    async fn save_contract(&self, contract: &Contract) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        match t.contracts.get_mut(&contract.address) {
            Some(existing) => existing.bytecode = contract.bytecode.clone(),
            None => {
                let mut fresh = Contract::unverified(contract.address.clone(), contract.bytecode.clone());
                fresh.created_at = contract.created_at;
                t.contracts.insert(contract.address.clone(), fresh);
            }
        }
        Ok(())
    }

    async fn contract(&self, address: &str) -> Result<Option<Contract>, AppError> {
        Ok(self.tables.read().await.contracts.get(address).cloned())
    }

    async fn mark_contract_verified(&self, contract: &Contract) -> Result<bool, AppError> {
        let mut t = self.tables.write().await;
        let Some(existing) = t.contracts.get_mut(&contract.address) else {
            return Ok(false);
        };
        if existing.valid {
            return Ok(false);
        }
        existing.valid = true;
        existing.contract_name = contract.contract_name.clone();
        existing.compiler_version = contract.compiler_version.clone();
        existing.optimization = contract.optimization;
        existing.source_code = contract.source_code.clone();
        existing.abi = contract.abi.clone();
        existing.updated_at = contract.updated_at;
        Ok(true)
    }

    async fn count_transactions_since(&self, since: Option<DateTime<Utc>>) -> Result<i64, AppError> {
        let t = self.tables.read().await;
        Ok(t.transactions
            .values()
            .filter(|tx| since.is_none_or(|since| tx.created_at >= since))
            .count() as i64)
    }

    async fn save_stats(&self, stats: &Stats) -> Result<(), AppError> {
        self.tables.write().await.stats.push(stats.clone());
        Ok(())
    }

    async fn latest_stats(&self) -> Result<Option<Stats>, AppError> {
        let t = self.tables.read().await;
        Ok(t.stats.iter().max_by_key(|s| s.updated_at).cloned())
    }

    async fn miner_block_counts_since(&self, since: DateTime<Utc>) -> Result<Vec<SignerStats>, AppError> {
        let t = self.tables.read().await;
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for block in t.blocks.values().filter(|b| b.created_at >= since) {
            *counts.entry(block.miner.as_str()).or_default() += 1;
        }
        let mut stats: Vec<_> = counts
            .into_iter()
            .map(|(signer, blocks_count)| SignerStats {
                signer: signer.to_string(),
                blocks_count,
            })
            .collect();
        stats.sort_by(|a, b| {
            b.blocks_count
                .cmp(&a.blocks_count)
                .then_with(|| a.signer.cmp(&b.signer))
        });
        Ok(stats)
    }

    async fn block_range_since(&self, since: DateTime<Utc>) -> Result<Option<BlockRange>, AppError> {
        let t = self.tables.read().await;
        let mut numbers = t
            .blocks
            .values()
            .filter(|b| b.created_at >= since)
            .map(|b| b.number);
        let Some(start_block) = numbers.next() else {
            return Ok(None);
        };
        let end_block = numbers.last().unwrap_or(start_block);
        Ok(Some(BlockRange {
            start_block,
            end_block,
        }))
    }

    async fn migration_applied(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.tables.read().await.migrations.contains_key(&id))
    }

    async fn applied_migrations(&self) -> Result<Vec<MigrationRecord>, AppError> {
        Ok(self.tables.read().await.migrations.values().cloned().collect())
    }

    async fn record_migration(&self, record: &MigrationRecord) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        if t.migrations.contains_key(&record.id) {
            return Err(AppError::Database(format!(
                "duplicate key value violates unique constraint on migration_records: {}",
                record.id
            )));
        }
        t.migrations.insert(record.id, record.clone());
        Ok(())
    }

    async fn remove_migration(&self, id: i64) -> Result<(), AppError> {
        self.tables.write().await.migrations.remove(&id);
        Ok(())
    }

    async fn save_address_transactions(&self, rows: &[AddressTransaction]) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        for row in rows {
            t.address_transactions
                .insert((row.address.clone(), row.tx_hash.clone()), row.clone());
        }
        Ok(())
    }

    async fn clear_address_transactions(&self) -> Result<(), AppError> {
        self.tables.write().await.address_transactions.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn block(number: i64, hash: &str) -> Block {
        Block {
            number,
            hash: hash.to_string(),
            parent_hash: String::new(),
            miner: "0xminer".to_string(),
            gas_limit: 8_000_000,
            gas_used: 21_000,
            difficulty: "1".to_string(),
            tx_count: 0,
            tx_root: String::new(),
            sha3_uncles: String::new(),
            extra_data: String::new(),
            nonce_valid: false,
            created_at: Utc.timestamp_opt(1_600_000_000 + number, 0).unwrap(),
        }
    }

    fn tx(hash: &str, block_number: i64, index: i32) -> Transaction {
        Transaction {
            tx_hash: hash.to_string(),
            from_address: "0xfrom".to_string(),
            to_address: "0xto".to_string(),
            value: "0".to_string(),
            gas_price: "1".to_string(),
            gas_fee: "0".to_string(),
            gas_limit: 21_000,
            nonce: "0".to_string(),
            block_number,
            block_hash: format!("0xb{block_number}"),
            tx_index: index,
            created_at: Utc.timestamp_opt(1_600_000_000 + block_number, 0).unwrap(),
            input_data: "0x".to_string(),
            input_empty: true,
            contract_address: None,
            status: None,
            gas_used: None,
            logs: None,
            receipt_received: false,
        }
    }

    #[tokio::test]
    async fn replace_block_drops_stale_transactions() {
        let store = MemoryStore::new();
        store
            .replace_block(&block(7, "0xa"), &[tx("0x1", 7, 0), tx("0x2", 7, 1), tx("0x3", 7, 2)])
            .await
            .unwrap();
        store
            .replace_block(&block(7, "0xb"), &[tx("0x4", 7, 0), tx("0x5", 7, 1)])
            .await
            .unwrap();

        assert_eq!(store.count_block_transactions(7).await.unwrap(), 2);
        assert!(store.transaction("0x1").await.unwrap().is_none());
        assert_eq!(store.block_by_number(7).await.unwrap().unwrap().hash, "0xb");
        assert!(store.block_by_hash("0xa").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn block_transactions_follow_node_order() {
        let store = MemoryStore::new();
        store
            .replace_block(&block(1, "0xa"), &[tx("0xff", 1, 0), tx("0x01", 1, 1)])
            .await
            .unwrap();

        let txs = store.block_transactions(1, 0, 10).await.unwrap();
        let hashes: Vec<_> = txs.iter().map(|t| t.tx_hash.as_str()).collect();
        assert_eq!(hashes, ["0xff", "0x01"]);
    }

    #[tokio::test]
    async fn save_contract_keeps_verification() {
        let store = MemoryStore::new();
        store
            .save_contract(&Contract::unverified("0xc".into(), "0x6060".into()))
            .await
            .unwrap();

        let mut verified = Contract::unverified("0xc".into(), "0x6060".into());
        verified.contract_name = Some("Token".into());
        assert!(store.mark_contract_verified(&verified).await.unwrap());
        assert!(!store.mark_contract_verified(&verified).await.unwrap());

        store
            .save_contract(&Contract::unverified("0xc".into(), "0x6061".into()))
            .await
            .unwrap();
        let stored = store.contract("0xc").await.unwrap().unwrap();
        assert!(stored.valid);
        assert_eq!(stored.bytecode, "0x6061");
        assert_eq!(stored.contract_name.as_deref(), Some("Token"));
    }

    #[tokio::test]
    async fn keyset_pages_cover_every_transaction() {
        let store = MemoryStore::new();
        let txs: Vec<_> = (0..5).map(|i| tx(&format!("0x{i:02}"), 1, i)).collect();
        store.replace_block(&block(1, "0xa"), &txs).await.unwrap();

        let first = store.transactions_after(None, 3).await.unwrap();
        assert_eq!(first.len(), 3);
        let rest = store
            .transactions_after(Some(&first[2].tx_hash), 3)
            .await
            .unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].tx_hash, "0x03");
    }

    #[tokio::test]
    async fn richlist_skips_excluded_and_empty() {
        let store = MemoryStore::new();
        for (address, balance) in [("0xa", 3.0), ("0xb", 0.0), ("0xc", 5.0), ("0xd", 1.0)] {
            store
                .save_address(&Address {
                    address: address.into(),
                    balance_wei: String::new(),
                    balance_float: balance,
                    balance_string: String::new(),
                    is_contract: false,
                    token_name: None,
                    token_symbol: None,
                    decimals: None,
                    total_supply: None,
                    interfaces: vec![],
                    number_of_transactions: 0,
                    number_of_token_holders: 0,
                    number_of_internal_transactions: 0,
                    number_of_token_transactions: 0,
                    updated_at: Utc::now(),
                    updated_at_block: 0,
                })
                .await
                .unwrap();
        }

        let rich = store.richlist(0, 10, &["0xc".to_string()]).await.unwrap();
        let order: Vec<_> = rich.iter().map(|a| a.address.as_str()).collect();
        assert_eq!(order, ["0xa", "0xd"]);
    }

    #[tokio::test]
    async fn miner_counts_respect_window() {
        let store = MemoryStore::new();
        for n in 1..=5 {
            let mut b = block(n, &format!("0x{n}"));
            if n % 2 == 0 {
                b.miner = "0xother".to_string();
            }
            store.replace_block(&b, &[]).await.unwrap();
        }

        let since = Utc.timestamp_opt(1_600_000_002, 0).unwrap();
        let counts = store.miner_block_counts_since(since).await.unwrap();
        let pairs: Vec<_> = counts.iter().map(|c| (c.signer.as_str(), c.blocks_count)).collect();
        assert_eq!(pairs, [("0xminer", 2), ("0xother", 2)]);

        let range = store.block_range_since(since).await.unwrap();
        assert_eq!(range, Some(BlockRange { start_block: 2, end_block: 5 }));

        let later = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(store.block_range_since(later).await.unwrap(), None);
        assert!(store.miner_block_counts_since(later).await.unwrap().is_empty());
    }
}
