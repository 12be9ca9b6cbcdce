use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use sqlx::types::Json;

// ─── Block ──────────────────────────────────────────────────────────────────

/// A block header as stored locally. Replaced wholesale on every re-import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Block {
    pub number: i64,
    pub hash: String,
    pub parent_hash: String,
    pub miner: String,
    pub gas_limit: i64,
    pub gas_used: i64,
    pub difficulty: String,
    pub tx_count: i32,
    pub tx_root: String,
    pub sha3_uncles: String,
    pub extra_data: String,
    pub nonce_valid: bool,
    pub created_at: DateTime<Utc>,
}

// ─── Transaction ────────────────────────────────────────────────────────────

/// A top-level chain transaction. Receipt-derived fields stay empty until
/// `receipt_received` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub tx_hash: String,
    pub from_address: String,
    /// Empty for contract creation.
    pub to_address: String,
    pub value: String,
    pub gas_price: String,
    pub gas_fee: String,
    pub gas_limit: i64,
    pub nonce: String,
    pub block_number: i64,
    pub block_hash: String,
    /// Position within the block, as returned by the node.
    pub tx_index: i32,
    pub created_at: DateTime<Utc>,
    pub input_data: String,
    pub input_empty: bool,
    pub contract_address: Option<String>,
    pub status: Option<bool>,
    pub gas_used: Option<i64>,
    pub logs: Option<Json<Value>>,
    pub receipt_received: bool,
}

impl Transaction {
    /// The counterparty touched by this transaction: the recipient, or the
    /// created contract for contract creations.
    pub fn counterparty(&self) -> Option<&str> {
        if !self.to_address.is_empty() {
            Some(&self.to_address)
        } else {
            self.contract_address.as_deref()
        }
    }
}

/// Filter for an address's transaction history.
#[derive(Debug, Clone)]
pub struct TransactionFilter {
    pub address: String,
    pub from_time: DateTime<Utc>,
    pub to_time: DateTime<Utc>,
    pub input_empty: Option<bool>,
    pub skip: i64,
    pub limit: i64,
}

// ─── Address ────────────────────────────────────────────────────────────────

/// Derived per-address state. Balance float/string are presentations of
/// `balance_wei`, never authoritative on their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Address {
    pub address: String,
    pub balance_wei: String,
    pub balance_float: f64,
    pub balance_string: String,
    pub is_contract: bool,
    pub token_name: Option<String>,
    pub token_symbol: Option<String>,
    pub decimals: Option<i32>,
    pub total_supply: Option<String>,
    pub interfaces: Vec<String>,
    pub number_of_transactions: i64,
    pub number_of_token_holders: i64,
    pub number_of_internal_transactions: i64,
    pub number_of_token_transactions: i64,
    pub updated_at: DateTime<Utc>,
    pub updated_at_block: i64,
}

// ─── TokenHolder ────────────────────────────────────────────────────────────

/// Balance of one holder for one token contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TokenHolder {
    pub contract_address: String,
    pub holder_address: String,
    pub balance: String,
    pub balance_int: i64,
    pub token_name: String,
    pub token_symbol: String,
    pub updated_at: DateTime<Utc>,
}

// ─── InternalTransaction ────────────────────────────────────────────────────

/// A token `Transfer` emitted by a contract, keyed by the owning chain
/// transaction hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct InternalTransaction {
    pub transaction_hash: String,
    pub contract_address: String,
    pub from_address: String,
    pub to_address: String,
    pub value: String,
    pub block_number: i64,
    pub created_at: DateTime<Utc>,
    /// Set when the owning block could not be resolved and `created_at` is
    /// the import wall-clock time instead of block time.
    pub created_at_approximate: bool,
    pub updated_at: DateTime<Utc>,
}

/// Selects internal transactions either by emitting contract or by
/// participant (sender or receiver).
#[derive(Debug, Clone)]
pub enum InternalTransactionQuery {
    ByContract(String),
    ByParticipant(String),
}

// ─── Contract ───────────────────────────────────────────────────────────────

/// Deployed bytecode plus, once verified, the submitted source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Contract {
    pub address: String,
    pub bytecode: String,
    pub valid: bool,
    pub contract_name: Option<String>,
    pub compiler_version: Option<String>,
    pub optimization: bool,
    pub source_code: Option<String>,
    pub abi: Option<Json<Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Contract {
    pub fn unverified(address: String, bytecode: String) -> Self {
        Self {
            address,
            bytecode,
            valid: false,
            contract_name: None,
            compiler_version: None,
            optimization: false,
            source_code: None,
            abi: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

// ─── ActiveAddress ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ActiveAddress {
    pub address: String,
    pub updated_at: DateTime<Utc>,
}

// ─── Stats ──────────────────────────────────────────────────────────────────

/// Snapshot of network-wide transaction counts. Snapshots are appended; the
/// newest one is current.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Stats {
    pub number_of_total_transactions: i64,
    pub number_of_last_week_transactions: i64,
    pub number_of_last_day_transactions: i64,
    pub updated_at: DateTime<Utc>,
}

/// Blocks produced by one miner inside a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SignerStats {
    pub signer: String,
    pub blocks_count: i64,
}

/// Lowest and highest stored height inside a time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub start_block: i64,
    pub end_block: i64,
}

// ─── Migrations ─────────────────────────────────────────────────────────────

/// Marker that a data migration has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MigrationRecord {
    pub id: i64,
    pub comment: String,
}

/// Per-address transaction lookup row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AddressTransaction {
    pub address: String,
    pub tx_hash: String,
    pub created_at: DateTime<Utc>,
}
