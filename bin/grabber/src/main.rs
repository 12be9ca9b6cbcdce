//! Explorer grabber: follows the chain head into the store.
//!
//! Flow:
//! 1. Connect to PostgreSQL, apply the schema and pending data migrations
//! 2. Import new heights in batches up to the node's head
//! 3. Re-check the most recent window and re-import forked or incomplete heights
//! 4. Periodically refresh derived state for recently active addresses
//! 5. Periodically snapshot transaction stats

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use eyre::Result;
use alloy::primitives::Address;
use explorer_chain::{AlloyNode, Gateway, RetryPolicy, parse_address};
use explorer_core::{Settings, telemetry};
use explorer_ingest::{ActiveFilter, Aggregator, Checker, Importer, Migrator};
use explorer_storage::{self as storage, PgStore, Store};
use tokio_util::sync::CancellationToken;

struct Engine {
    settings: Settings,
    gateway: Arc<Gateway>,
    store: Arc<dyn Store>,
    importer: Arc<Importer>,
    checker: Checker,
    aggregator: Aggregator,
    locked: Vec<Address>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── Initialisation ──────────────────────────────────────────────────
    telemetry::init();
    let settings = Settings::from_env()?;

    tracing::info!(rpc = %settings.rpc_url, "Starting explorer grabber");

    let pool = storage::connect(&settings.database_url).await?;
    tracing::info!("Connected to database");

    storage::schema::init(&pool).await?;
    tracing::info!("Database schema applied");

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutting down gracefully…");
            }
            cancel.cancel();
        }
    });

    let applied = Migrator::with_defaults(store.clone())?.migrate(&cancel).await?;
    tracing::info!(applied, "Data migrations applied");

    let node = AlloyNode::connect(&settings.rpc_url)?;
    let policy = RetryPolicy::fixed(settings.rpc_retry_attempts, settings.rpc_retry_delay());
    let gateway = Arc::new(Gateway::new(Arc::new(node), policy));
    tracing::info!("Connected to chain node");

    let locked = settings
        .locked_accounts
        .iter()
        .map(|raw| parse_address(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let importer = Arc::new(Importer::new(gateway.clone(), store.clone()));
    let engine = Engine {
        locked,
        checker: Checker::new(store.clone()),
        aggregator: Aggregator::new(importer.clone()),
        settings,
        gateway,
        store,
        importer,
    };

    // ── Main Loop ───────────────────────────────────────────────────────
    let mut last_refresh = Instant::now();
    let mut refresh_since: DateTime<Utc> = Utc::now();
    let mut last_stats: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            result = engine.round(&cancel) => {
                match result {
                    Ok(imported) => {
                        if last_refresh.elapsed() >= engine.settings.address_refresh_interval() {
                            let started = Utc::now();
                            engine.refresh_addresses(&cancel, refresh_since).await;
                            refresh_since = started;
                            last_refresh = Instant::now();
                        }
                        if last_stats.is_none_or(|at| at.elapsed() >= engine.settings.stats_refresh_interval()) {
                            engine.refresh_stats(&cancel).await;
                            last_stats = Some(Instant::now());
                        }
                        if !imported {
                            // Caught up, wait before polling again
                            pause(&cancel, Duration::from_secs(2)).await;
                        }
                    }
                    Err(e) if e.is_cancelled() => break,
                    Err(e) => {
                        tracing::error!(error = %e, "Import error, retrying in 5s…");
                        pause(&cancel, Duration::from_secs(5)).await;
                    }
                }
            }
        }
    }

    tracing::info!("Grabber stopped.");
    Ok(())
}

async fn pause(cancel: &CancellationToken, duration: Duration) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(duration) => {}
    }
}

impl Engine {
    /// Import the next batch and repair the recent window. Returns whether
    /// new heights were imported.
    async fn round(&self, cancel: &CancellationToken) -> Result<bool, explorer_core::AppError> {
        let head = self.gateway.current_height(cancel).await?;
        let next = match self.store.latest_block_number().await? {
            Some(latest) => u64::try_from(latest + 1).unwrap_or(0),
            None => self.settings.start_block,
        };

        let imported = next <= head;
        if imported {
            let end = head.min(next + self.settings.batch_size.max(1) - 1);
            for number in next..=end {
                self.importer.import_height(cancel, number).await?;
            }
            tracing::info!(from = next, to = end, head, "Imported batch");
        }

        if let Some(top) = self.store.latest_block_number().await? {
            self.repair(cancel, top).await?;
        }
        Ok(imported)
    }

    /// Walk the recent window from `top` downwards, re-importing heights
    /// whose parent linkage or transaction count is broken. A re-imported
    /// height that still does not link to its stored parent pulls the walk
    /// below the window until the fork point is reached.
    async fn repair(&self, cancel: &CancellationToken, top: i64) -> Result<(), explorer_core::AppError> {
        let start = i64::try_from(self.settings.start_block).unwrap_or(i64::MAX);
        // The first indexed height never has a stored parent.
        let lowest = start.saturating_add(1);
        let depth = i64::try_from(self.settings.backfill_depth).unwrap_or(i64::MAX);
        let floor = lowest.max(top.saturating_sub(depth));

        let mut number = top;
        let mut forked = false;
        while number >= lowest && (number >= floor || forked) {
            let stale = forked
                || self.checker.need_reload_block(number).await?
                || !self.checker.transactions_consistent(number).await?;

            if stale {
                tracing::info!(number, "Re-importing height");
                let Ok(height) = u64::try_from(number) else {
                    break;
                };
                self.importer.import_height(cancel, height).await?;
                forked = number > lowest && self.checker.need_reload_block(number).await?;
            }
            number -= 1;
        }
        Ok(())
    }

    /// Refresh balances, token state and counters of every address active
    /// since `since`. Failures are logged per address.
    async fn refresh_addresses(&self, cancel: &CancellationToken, since: DateTime<Utc>) {
        let active = match self.aggregator.active_addresses(since, ActiveFilter::All).await {
            Ok(active) => active,
            Err(e) => {
                tracing::error!(error = %e, "Cannot list active addresses");
                return;
            }
        };
        tracing::info!(count = active.len(), "Refreshing active addresses");

        for entry in active {
            match self.aggregator.sync_address(cancel, &entry.address).await {
                Ok(_) => {}
                Err(e) if e.is_cancelled() => return,
                Err(e) => tracing::warn!(address = %entry.address, error = %e, "Address refresh failed"),
            }
        }
    }

    /// Snapshot transaction counts and report the circulating supply.
    async fn refresh_stats(&self, cancel: &CancellationToken) {
        match self.aggregator.update_stats(Utc::now()).await {
            Ok(stats) => tracing::info!(
                total = stats.number_of_total_transactions,
                last_week = stats.number_of_last_week_transactions,
                last_day = stats.number_of_last_day_transactions,
                "Stats updated"
            ),
            Err(e) => tracing::error!(error = %e, "Cannot update stats"),
        }

        match self.aggregator.circulating_supply(cancel, &self.locked).await {
            Ok(supply) => tracing::info!(
                circulating = %explorer_chain::units::to_decimal_string(supply),
                locked_accounts = self.locked.len(),
                "Circulating supply"
            ),
            Err(e) if e.is_cancelled() => {}
            Err(e) => tracing::warn!(error = %e, "Cannot read circulating supply"),
        }
    }
}
