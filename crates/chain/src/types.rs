use alloy::primitives::{Address, B256, Bytes, U256};
use explorer_core::AppError;
use serde::Serialize;

/// Header nonce value that marks a block's nonce as valid on clique-style chains.
pub const VALID_NONCE: u64 = u64::MAX;

/// A fully materialized block as returned by the chain node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBlock {
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    pub miner: Address,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub difficulty: U256,
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub nonce: u64,
    pub transactions_root: B256,
    pub ommers_hash: B256,
    pub transactions: Vec<ChainTransaction>,
}

/// A top-level transaction inside a [`ChainBlock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    pub hash: B256,
    /// Sender, when the node already recovered it. `None` means an extra
    /// sender lookup is required.
    pub from: Option<Address>,
    /// Recipient; `None` for contract creation.
    pub to: Option<Address>,
    pub value: U256,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub nonce: u64,
    pub input: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReceipt {
    pub transaction_hash: B256,
    pub contract_address: Option<Address>,
    pub status: bool,
    pub gas_used: u64,
    pub logs: Vec<ChainLog>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub log_index: Option<u64>,
}

/// Block selector for state queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Number(u64),
}

/// Token standards a contract's bytecode advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TokenInterface {
    Erc20,
    Erc721,
}

impl TokenInterface {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenInterface::Erc20 => "Go20",
            TokenInterface::Erc721 => "Go721",
        }
    }
}

/// Token metadata read from an ERC-20 style contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenDetails {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
    pub interfaces: Vec<TokenInterface>,
}

impl TokenDetails {
    pub fn is_erc20(&self) -> bool {
        self.interfaces.contains(&TokenInterface::Erc20)
    }
}

/// A decoded ERC-20 `Transfer` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub contract: Address,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub block_number: u64,
    pub transaction_hash: B256,
}

/// Canonical (EIP-55 checksummed) form of an address.
pub fn checksum(address: &Address) -> String {
    address.to_checksum(None)
}

/// Parse a user-supplied hex address. Case is not validated.
pub fn parse_address(raw: &str) -> Result<Address, AppError> {
    raw.trim()
        .parse::<Address>()
        .map_err(|e| AppError::InvalidInput(format!("address {raw:?}: {e}")))
}

/// Normalize any hex address string to its checksummed form.
pub fn canonical_address(raw: &str) -> Result<String, AppError> {
    parse_address(raw).map(|a| checksum(&a))
}

pub fn parse_hash(raw: &str) -> Result<B256, AppError> {
    raw.trim()
        .parse::<B256>()
        .map_err(|e| AppError::InvalidInput(format!("hash {raw:?}: {e}")))
}
