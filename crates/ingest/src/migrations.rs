use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use explorer_core::AppError;
use explorer_storage::Store;
use explorer_storage::models::{AddressTransaction, MigrationRecord};
use tokio_util::sync::CancellationToken;

/// Rows per upsert batch and per progress log line.
const BATCH_SIZE: usize = 1_000;

/// A one-shot transformation of already-stored data.
///
/// `up` must be safe to repeat: a crash between the transform and its
/// record re-runs it on the next start.
#[async_trait]
pub trait Migration: Send + Sync {
    fn id(&self) -> i64;

    fn comment(&self) -> &str;

    async fn up(&self, store: &dyn Store, cancel: &CancellationToken) -> Result<(), AppError>;

    fn reversible(&self) -> bool {
        false
    }

    async fn down(&self, _store: &dyn Store, _cancel: &CancellationToken) -> Result<(), AppError> {
        Ok(())
    }
}

/// Lays out a fresh store in one step. When set on a [`Migrator`] and no
/// migration has been recorded yet, it runs instead of the migrations, which
/// are then recorded as applied.
#[async_trait]
pub trait InitSchema: Send + Sync {
    async fn init(&self, store: &dyn Store, cancel: &CancellationToken) -> Result<(), AppError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("migration id must be a positive integer")]
    MissingId,

    #[error("duplicate migration id {0}")]
    DuplicateId(i64),

    #[error("no applied migration to roll back")]
    NoAppliedMigration,

    #[error("migration {0} cannot be rolled back")]
    RollbackImpossible(i64),

    #[error("migration {0} is not registered")]
    UnknownMigration(i64),

    #[error("migration {0} has not been applied")]
    NotApplied(i64),

    #[error("schema initialisation failed: {0}")]
    InitSchema(#[source] AppError),

    #[error("migration {id} failed: {source}")]
    Failed {
        id: i64,
        #[source]
        source: AppError,
    },

    #[error(transparent)]
    Store(#[from] AppError),
}

/// Applies migrations in ascending id order, skipping recorded ones.
pub struct Migrator {
    store: Arc<dyn Store>,
    migrations: Vec<Box<dyn Migration>>,
    init_schema: Option<Box<dyn InitSchema>>,
}

impl Migrator {
    pub fn new(
        store: Arc<dyn Store>,
        mut migrations: Vec<Box<dyn Migration>>,
    ) -> Result<Self, MigrationError> {
        if migrations.iter().any(|m| m.id() <= 0) {
            return Err(MigrationError::MissingId);
        }
        migrations.sort_by_key(|m| m.id());

        let mut seen = BTreeSet::new();
        for migration in &migrations {
            if !seen.insert(migration.id()) {
                return Err(MigrationError::DuplicateId(migration.id()));
            }
        }

        Ok(Self {
            store,
            migrations,
            init_schema: None,
        })
    }

    pub fn with_init_schema(mut self, init: Box<dyn InitSchema>) -> Self {
        self.init_schema = Some(init);
        self
    }

    /// The built-in migration list.
    pub fn with_defaults(store: Arc<dyn Store>) -> Result<Self, MigrationError> {
        Self::new(store, vec![Box::new(TransactionsByAddress)])
    }

    /// Run every pending migration. Returns how many were applied, counting
    /// those recorded after a first-run schema initialisation.
    pub async fn migrate(&self, cancel: &CancellationToken) -> Result<usize, MigrationError> {
        if let Some(init) = &self.init_schema {
            if self.store.applied_migrations().await?.is_empty() {
                return self.run_init_schema(init.as_ref(), cancel).await;
            }
        }

        let mut applied = 0;
        for migration in &self.migrations {
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled.into());
            }
            let id = migration.id();
            if self.store.migration_applied(id).await? {
                tracing::debug!(id, "migration already applied");
                continue;
            }

            tracing::info!(id, comment = migration.comment(), "applying migration");
            migration
                .up(self.store.as_ref(), cancel)
                .await
                .map_err(|source| MigrationError::Failed { id, source })?;
            self.store
                .record_migration(&MigrationRecord {
                    id,
                    comment: migration.comment().to_string(),
                })
                .await?;
            applied += 1;
        }
        Ok(applied)
    }

    async fn run_init_schema(
        &self,
        init: &dyn InitSchema,
        cancel: &CancellationToken,
    ) -> Result<usize, MigrationError> {
        tracing::info!("fresh store, initialising schema");
        init.init(self.store.as_ref(), cancel)
            .await
            .map_err(MigrationError::InitSchema)?;
        for migration in &self.migrations {
            self.store
                .record_migration(&MigrationRecord {
                    id: migration.id(),
                    comment: migration.comment().to_string(),
                })
                .await?;
        }
        Ok(self.migrations.len())
    }

    /// Reverse the most recently applied migration and drop its record.
    pub async fn rollback_last(&self, cancel: &CancellationToken) -> Result<i64, MigrationError> {
        let last = self
            .store
            .applied_migrations()
            .await?
            .into_iter()
            .map(|r| r.id)
            .max()
            .ok_or(MigrationError::NoAppliedMigration)?;

        let migration = self
            .migrations
            .iter()
            .find(|m| m.id() == last)
            .ok_or(MigrationError::RollbackImpossible(last))?;
        self.run_down(migration.as_ref(), cancel).await?;
        Ok(last)
    }

    /// Reverse one applied migration by id and drop its record.
    pub async fn rollback(&self, cancel: &CancellationToken, id: i64) -> Result<(), MigrationError> {
        let migration = self
            .migrations
            .iter()
            .find(|m| m.id() == id)
            .ok_or(MigrationError::UnknownMigration(id))?;
        if !self.store.migration_applied(id).await? {
            return Err(MigrationError::NotApplied(id));
        }
        self.run_down(migration.as_ref(), cancel).await
    }

    async fn run_down(
        &self,
        migration: &dyn Migration,
        cancel: &CancellationToken,
    ) -> Result<(), MigrationError> {
        let id = migration.id();
        if !migration.reversible() {
            return Err(MigrationError::RollbackImpossible(id));
        }

        tracing::info!(id, comment = migration.comment(), "rolling back migration");
        migration
            .down(self.store.as_ref(), cancel)
            .await
            .map_err(|source| MigrationError::Failed { id, source })?;
        self.store.remove_migration(id).await?;
        Ok(())
    }

    /// Highest applied migration id.
    pub async fn version(&self) -> Result<Option<i64>, MigrationError> {
        let records = self.store.applied_migrations().await?;
        Ok(records.into_iter().map(|r| r.id).max())
    }
}

/// Denormalizes every transaction into per-address lookup rows.
pub struct TransactionsByAddress;

#[async_trait]
impl Migration for TransactionsByAddress {
    fn id(&self) -> i64 {
        1
    }

    fn comment(&self) -> &str {
        "Creating TransactionsByAddress collection"
    }

    async fn up(&self, store: &dyn Store, cancel: &CancellationToken) -> Result<(), AppError> {
        let mut after: Option<String> = None;
        let mut batch = Vec::with_capacity(BATCH_SIZE);
        let mut written = 0usize;

        loop {
            let page = store.transactions_after(after.as_deref(), BATCH_SIZE as i64).await?;
            let Some(last) = page.last() else {
                break;
            };
            after = Some(last.tx_hash.clone());

            for tx in &page {
                if cancel.is_cancelled() {
                    return Err(AppError::Cancelled);
                }
                batch.push(AddressTransaction {
                    address: tx.from_address.clone(),
                    tx_hash: tx.tx_hash.clone(),
                    created_at: tx.created_at,
                });
                if !tx.to_address.is_empty() && tx.to_address != tx.from_address {
                    batch.push(AddressTransaction {
                        address: tx.to_address.clone(),
                        tx_hash: tx.tx_hash.clone(),
                        created_at: tx.created_at,
                    });
                }
                if batch.len() >= BATCH_SIZE {
                    store.save_address_transactions(&batch).await?;
                    written += batch.len();
                    batch.clear();
                    tracing::info!(written, "address transactions written");
                }
            }
        }

        if !batch.is_empty() {
            store.save_address_transactions(&batch).await?;
            written += batch.len();
        }
        tracing::info!(written, "address transactions migration finished");
        Ok(())
    }

    fn reversible(&self) -> bool {
        true
    }

    async fn down(&self, store: &dyn Store, _cancel: &CancellationToken) -> Result<(), AppError> {
        store.clear_address_transactions().await
    }
}
