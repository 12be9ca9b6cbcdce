use std::collections::BTreeSet;
use std::sync::Arc;

use alloy::primitives::{Address as ChainAddress, U256};
use chrono::{DateTime, TimeDelta, Utc};
use explorer_chain::decoder::ZERO_ADDRESS;
use explorer_chain::units::{to_decimal_string, to_float, to_whole_units};
use explorer_chain::{BlockTag, Gateway, TokenDetails, TransferEvent, checksum, parse_address};
use explorer_core::AppError;
use explorer_storage::Store;
use explorer_storage::models::{
    ActiveAddress, Address, BlockRange, Contract, InternalTransaction, SignerStats, Stats, TokenHolder,
};
use tokio_util::sync::CancellationToken;

use crate::importer::Importer;

/// Fresh chain state for one address, as gathered by the caller.
#[derive(Debug, Clone)]
pub struct AddressUpdate {
    pub address: ChainAddress,
    pub balance: U256,
    pub token: Option<TokenDetails>,
    pub is_contract: bool,
    pub updated_at_block: i64,
}

/// Token name and symbol denormalized onto holder rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenMeta {
    pub name: String,
    pub symbol: String,
}

impl From<&Address> for TokenMeta {
    fn from(address: &Address) -> Self {
        Self {
            name: address.token_name.clone().unwrap_or_default(),
            symbol: address.token_symbol.clone().unwrap_or_default(),
        }
    }
}

impl From<&TokenDetails> for TokenMeta {
    fn from(details: &TokenDetails) -> Self {
        Self {
            name: details.name.clone(),
            symbol: details.symbol.clone(),
        }
    }
}

/// Which active addresses to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveFilter {
    All,
    Contracts,
    NonContracts,
}

impl ActiveFilter {
    fn admits(self, is_contract: bool) -> bool {
        match self {
            Self::All => true,
            Self::Contracts => is_contract,
            Self::NonContracts => !is_contract,
        }
    }
}

/// Trailing windows miner production is reported over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsWindow {
    Daily,
    Weekly,
    Monthly,
}

impl StatsWindow {
    pub const ALL: [StatsWindow; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn length(self) -> TimeDelta {
        match self {
            Self::Daily => TimeDelta::days(1),
            Self::Weekly => TimeDelta::days(7),
            Self::Monthly => TimeDelta::days(30),
        }
    }
}

/// Miner production over one window. The range is zeroed when the window
/// holds no blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct SignersStats {
    pub window: StatsWindow,
    pub block_range: BlockRange,
    pub signer_stats: Vec<SignerStats>,
}

/// Recomputes derived per-address and per-token state. Counters are always
/// recounted from storage, never incremented.
pub struct Aggregator {
    importer: Arc<Importer>,
    gateway: Arc<Gateway>,
    store: Arc<dyn Store>,
}

impl Aggregator {
    pub fn new(importer: Arc<Importer>) -> Self {
        let gateway = importer.gateway().clone();
        let store = importer.store().clone();
        Self {
            importer,
            gateway,
            store,
        }
    }

    pub async fn import_address(&self, update: &AddressUpdate) -> Result<Address, AppError> {
        let address = checksum(&update.address);
        let balance_string = to_decimal_string(update.balance);
        let balance_float = to_float(update.balance);
        tracing::debug!(%address, balance = %balance_string, "updating address");

        let number_of_transactions = self.store.count_address_transactions(&address).await?;
        let number_of_token_holders = self.store.count_token_holders(&address).await?;
        let number_of_internal_transactions = self
            .store
            .count_contract_internal_transactions(&address)
            .await?;
        let number_of_token_transactions = self.store.count_token_transactions(&address).await?;

        let token = update.token.as_ref();
        let doc = Address {
            address,
            balance_wei: update.balance.to_string(),
            balance_float,
            balance_string,
            is_contract: update.is_contract,
            token_name: token.map(|t| t.name.clone()).filter(|n| !n.is_empty()),
            token_symbol: token.map(|t| t.symbol.clone()).filter(|s| !s.is_empty()),
            decimals: token.filter(|t| t.is_erc20()).map(|t| i32::from(t.decimals)),
            total_supply: token
                .filter(|t| t.is_erc20())
                .map(|t| t.total_supply.to_string()),
            interfaces: token
                .map(|t| t.interfaces.iter().map(|i| i.as_str().to_string()).collect())
                .unwrap_or_default(),
            number_of_transactions,
            number_of_token_holders,
            number_of_internal_transactions,
            number_of_token_transactions,
            updated_at: Utc::now(),
            updated_at_block: update.updated_at_block,
        };

        self.store.save_address(&doc).await?;
        Ok(doc)
    }

    pub async fn import_token_holder(
        &self,
        contract: &str,
        holder: &str,
        balance: U256,
        meta: &TokenMeta,
    ) -> Result<TokenHolder, AppError> {
        let balance_int = to_whole_units(balance);
        tracing::debug!(contract, holder, %balance, balance_int, "updating token holder");

        let doc = TokenHolder {
            contract_address: contract.to_string(),
            holder_address: holder.to_string(),
            balance: balance.to_string(),
            balance_int,
            token_name: meta.name.clone(),
            token_symbol: meta.symbol.clone(),
            updated_at: Utc::now(),
        };
        self.store.save_token_holder(&doc).await?;
        Ok(doc)
    }

    /// Record a token transfer. Its timestamp comes from the owning block;
    /// when that block cannot be resolved the import wall clock is used and
    /// the row is flagged as approximate.
    pub async fn import_internal_transaction(
        &self,
        cancel: &CancellationToken,
        contract: &str,
        event: &TransferEvent,
    ) -> Result<InternalTransaction, AppError> {
        let block_number = i64::try_from(event.block_number).map_err(|_| {
            AppError::InvalidInput(format!("block number {} out of range", event.block_number))
        })?;
        let (created_at, created_at_approximate) = self.block_time(cancel, block_number).await?;

        let doc = InternalTransaction {
            transaction_hash: event.transaction_hash.to_string(),
            contract_address: contract.to_string(),
            from_address: checksum(&event.from),
            to_address: checksum(&event.to),
            value: event.value.to_string(),
            block_number,
            created_at,
            created_at_approximate,
            updated_at: Utc::now(),
        };
        self.store.save_internal_transaction(&doc).await?;
        Ok(doc)
    }

    /// Stored address with its transaction count recounted.
    pub async fn address_summary(&self, address: &str) -> Result<Option<Address>, AppError> {
        let Some(mut doc) = self.store.address(address).await? else {
            return Ok(None);
        };
        doc.number_of_transactions = self.store.count_address_transactions(address).await?;
        Ok(Some(doc))
    }

    /// Addresses active since `since`, narrowed by whether they are stored
    /// as contracts. Addresses without a stored row count as non-contracts.
    pub async fn active_addresses(
        &self,
        since: DateTime<Utc>,
        filter: ActiveFilter,
    ) -> Result<Vec<ActiveAddress>, AppError> {
        let active = self.store.active_addresses_since(since).await?;
        if filter == ActiveFilter::All {
            return Ok(active);
        }

        let mut selected = Vec::new();
        for entry in active {
            let is_contract = self
                .store
                .address(&entry.address)
                .await?
                .is_some_and(|a| a.is_contract);
            if filter.admits(is_contract) {
                selected.push(entry);
            }
        }
        Ok(selected)
    }

    /// Count all transactions plus those of the last week and last day
    /// relative to `now`, and append the snapshot.
    pub async fn update_stats(&self, now: DateTime<Utc>) -> Result<Stats, AppError> {
        let stats = Stats {
            number_of_total_transactions: self.store.count_transactions_since(None).await?,
            number_of_last_week_transactions: self
                .store
                .count_transactions_since(Some(now - TimeDelta::days(7)))
                .await?,
            number_of_last_day_transactions: self
                .store
                .count_transactions_since(Some(now - TimeDelta::days(1)))
                .await?,
            updated_at: now,
        };
        self.store.save_stats(&stats).await?;
        tracing::debug!(
            total = stats.number_of_total_transactions,
            week = stats.number_of_last_week_transactions,
            day = stats.number_of_last_day_transactions,
            "stats snapshot saved"
        );
        Ok(stats)
    }

    /// Newest stats snapshot, or zero counts before the first one.
    pub async fn stats(&self) -> Result<Stats, AppError> {
        Ok(self.store.latest_stats().await?.unwrap_or_default())
    }

    /// Blocks per miner and the covered height range for each trailing
    /// window ending at `now`.
    pub async fn signers_stats(&self, now: DateTime<Utc>) -> Result<Vec<SignersStats>, AppError> {
        let mut stats = Vec::with_capacity(StatsWindow::ALL.len());
        for window in StatsWindow::ALL {
            let since = now - window.length();
            stats.push(SignersStats {
                window,
                block_range: self.store.block_range_since(since).await?.unwrap_or_default(),
                signer_stats: self.store.miner_block_counts_since(since).await?,
            });
        }
        Ok(stats)
    }

    /// Total supply less the balances held by `locked` accounts.
    pub async fn circulating_supply(
        &self,
        cancel: &CancellationToken,
        locked: &[ChainAddress],
    ) -> Result<U256, AppError> {
        self.gateway.circulating_supply(cancel, locked).await
    }

    /// Refresh everything derived for one address from the node: balance,
    /// bytecode, token metadata, transfers and holders, then the recount.
    pub async fn sync_address(
        &self,
        cancel: &CancellationToken,
        address: &str,
    ) -> Result<Address, AppError> {
        let target = parse_address(address)?;
        let canonical = checksum(&target);

        let height = self.gateway.current_height(cancel).await?;
        let balance = self.gateway.balance(cancel, target, BlockTag::Latest).await?;
        let code = self.gateway.code(cancel, target).await?;
        let is_contract = !code.is_empty();

        let mut token = None;
        if is_contract {
            self.store
                .save_contract(&Contract::unverified(canonical.clone(), hex::encode(&code)))
                .await?;

            token = match self.gateway.token_details(cancel, target, &code).await {
                Ok(details) => Some(details),
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) => {
                    tracing::warn!(address = %canonical, error = %err, "cannot read token details");
                    None
                }
            };
        }

        if let Some(details) = token.as_ref().filter(|t| t.is_erc20()) {
            self.sync_transfers(cancel, target, &canonical, details).await?;
        }

        self.import_address(&AddressUpdate {
            address: target,
            balance,
            token,
            is_contract,
            updated_at_block: i64::try_from(height).unwrap_or(i64::MAX),
        })
        .await
    }

    async fn sync_transfers(
        &self,
        cancel: &CancellationToken,
        contract: ChainAddress,
        canonical: &str,
        details: &TokenDetails,
    ) -> Result<(), AppError> {
        let from_block = self
            .store
            .contract_creation_block(canonical)
            .await?
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0);
        let events = self.gateway.transfer_events(cancel, contract, from_block).await?;
        tracing::info!(contract = canonical, from_block, events = events.len(), "importing transfers");

        let mut holders = BTreeSet::new();
        for event in &events {
            self.import_internal_transaction(cancel, canonical, event).await?;
            for party in [event.from, event.to] {
                if party != ZERO_ADDRESS {
                    holders.insert(party);
                }
            }
        }

        let meta = TokenMeta::from(details);
        for holder in holders {
            let balance = self.gateway.token_balance(cancel, contract, holder).await?;
            self.import_token_holder(canonical, &checksum(&holder), balance, &meta)
                .await?;
        }
        Ok(())
    }

    async fn block_time(
        &self,
        cancel: &CancellationToken,
        block_number: i64,
    ) -> Result<(DateTime<Utc>, bool), AppError> {
        match self.importer.block_or_import(cancel, block_number).await {
            Ok(Some(block)) => return Ok((block.created_at, false)),
            Ok(None) => {
                tracing::warn!(block_number, "block unknown, using import time for transfer");
            }
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                tracing::warn!(block_number, error = %err, "cannot resolve block, using import time for transfer");
            }
        }
        Ok((Utc::now(), true))
    }
}
