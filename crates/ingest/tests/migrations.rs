mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use common::*;
use explorer_core::AppError;
use explorer_ingest::{InitSchema, Migration, MigrationError, Migrator, TransactionsByAddress};
use explorer_storage::{MemoryStore, Store};
use tokio_util::sync::CancellationToken;

struct Counting {
    id: i64,
    runs: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait]
impl Migration for Counting {
    fn id(&self) -> i64 {
        self.id
    }

    fn comment(&self) -> &str {
        "counting"
    }

    async fn up(&self, _store: &dyn Store, _cancel: &CancellationToken) -> Result<(), AppError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Database("boom".into()));
        }
        Ok(())
    }
}

struct CountingInit {
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl InitSchema for CountingInit {
    async fn init(&self, _store: &dyn Store, _cancel: &CancellationToken) -> Result<(), AppError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn counting(id: i64, runs: &Arc<AtomicUsize>) -> Box<dyn Migration> {
    Box::new(Counting {
        id,
        runs: runs.clone(),
        fail: false,
    })
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let h = harness();
    h.importer
        .import_block(
            &h.cancel,
            &block(1, vec![transfer(1, addr(1), addr(2), 1), transfer(2, addr(3), addr(3), 1)]),
        )
        .await
        .unwrap();

    let migrator = Migrator::with_defaults(h.store.clone()).unwrap();
    assert_eq!(migrator.migrate(&h.cancel).await.unwrap(), 1);
    // Sender + receiver for the first, sender only for the self-transfer.
    assert_eq!(h.store.address_transaction_count().await, 3);
    assert_eq!(migrator.version().await.unwrap(), Some(1));

    h.store.clear_address_transactions().await.unwrap();
    assert_eq!(migrator.migrate(&h.cancel).await.unwrap(), 0);
    assert_eq!(h.store.address_transaction_count().await, 0);
}

#[tokio::test]
async fn migration_pages_past_one_batch() {
    let h = harness();
    let txs: Vec<_> = (0..1_200).map(|i| transfer(i, addr(1), addr(2), 1)).collect();
    h.importer.import_block(&h.cancel, &block(1, txs)).await.unwrap();

    let migrator = Migrator::with_defaults(h.store.clone()).unwrap();
    migrator.migrate(&h.cancel).await.unwrap();
    assert_eq!(h.store.address_transaction_count().await, 2_400);
}

#[tokio::test]
async fn migrations_run_in_id_order_once() {
    let store = Arc::new(MemoryStore::new());
    let runs = Arc::new(AtomicUsize::new(0));
    let migrator = Migrator::new(store.clone(), vec![counting(3, &runs), counting(2, &runs)]).unwrap();
    let cancel = CancellationToken::new();

    assert_eq!(migrator.migrate(&cancel).await.unwrap(), 2);
    assert_eq!(migrator.migrate(&cancel).await.unwrap(), 0);
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    let ids: Vec<_> = store.applied_migrations().await.unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, [2, 3]);
}

#[tokio::test]
async fn failed_transform_is_not_recorded() {
    let store = Arc::new(MemoryStore::new());
    let runs = Arc::new(AtomicUsize::new(0));
    let failing = Box::new(Counting {
        id: 1,
        runs: runs.clone(),
        fail: true,
    });
    let migrator = Migrator::new(store.clone(), vec![failing]).unwrap();

    let err = migrator.migrate(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, MigrationError::Failed { id: 1, .. }));
    assert!(!store.migration_applied(1).await.unwrap());
}

#[tokio::test]
async fn ids_are_validated() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let runs = Arc::new(AtomicUsize::new(0));

    let missing = Migrator::new(store.clone(), vec![counting(0, &runs)]);
    assert!(matches!(missing, Err(MigrationError::MissingId)));

    let duplicate = Migrator::new(store, vec![counting(4, &runs), counting(4, &runs)]);
    assert!(matches!(duplicate, Err(MigrationError::DuplicateId(4))));
}

#[tokio::test]
async fn rollback_rules() {
    let h = harness();
    h.importer
        .import_block(&h.cancel, &block(1, vec![transfer(1, addr(1), addr(2), 1)]))
        .await
        .unwrap();
    let migrator = Migrator::with_defaults(h.store.clone()).unwrap();

    assert!(matches!(
        migrator.rollback_last(&h.cancel).await,
        Err(MigrationError::NoAppliedMigration)
    ));

    migrator.migrate(&h.cancel).await.unwrap();
    assert_eq!(migrator.rollback_last(&h.cancel).await.unwrap(), 1);
    assert_eq!(h.store.address_transaction_count().await, 0);
    assert_eq!(migrator.version().await.unwrap(), None);

    let runs = Arc::new(AtomicUsize::new(0));
    let irreversible = Migrator::new(h.store.clone(), vec![counting(5, &runs)]).unwrap();
    irreversible.migrate(&h.cancel).await.unwrap();
    assert!(matches!(
        irreversible.rollback_last(&h.cancel).await,
        Err(MigrationError::RollbackImpossible(5))
    ));
}

#[tokio::test]
async fn cancellation_aborts_the_run() {
    let h = harness();
    h.importer
        .import_block(&h.cancel, &block(1, vec![transfer(1, addr(1), addr(2), 1)]))
        .await
        .unwrap();
    let migrator = Migrator::with_defaults(h.store.clone()).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = migrator.migrate(&cancel).await.unwrap_err();
    assert!(matches!(err, MigrationError::Store(AppError::Cancelled)));
    assert!(!h.store.migration_applied(1).await.unwrap());
}

#[tokio::test]
async fn fresh_store_initialises_schema_instead_of_migrating() {
    let store = Arc::new(MemoryStore::new());
    let runs = Arc::new(AtomicUsize::new(0));
    let inits = Arc::new(AtomicUsize::new(0));
    let migrator = Migrator::new(store.clone(), vec![counting(1, &runs), counting(2, &runs)])
        .unwrap()
        .with_init_schema(Box::new(CountingInit { runs: inits.clone() }));
    let cancel = CancellationToken::new();

    assert_eq!(migrator.migrate(&cancel).await.unwrap(), 2);
    assert_eq!(inits.load(Ordering::SeqCst), 1);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(migrator.version().await.unwrap(), Some(2));

    // Records exist now, so later runs migrate normally.
    assert_eq!(migrator.migrate(&cancel).await.unwrap(), 0);
    assert_eq!(inits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn initialised_store_skips_schema_init() {
    let store = Arc::new(MemoryStore::new());
    let runs = Arc::new(AtomicUsize::new(0));
    let inits = Arc::new(AtomicUsize::new(0));
    let cancel = CancellationToken::new();
    Migrator::new(store.clone(), vec![counting(1, &runs)])
        .unwrap()
        .migrate(&cancel)
        .await
        .unwrap();

    let migrator = Migrator::new(store.clone(), vec![counting(1, &runs), counting(2, &runs)])
        .unwrap()
        .with_init_schema(Box::new(CountingInit { runs: inits.clone() }));
    assert_eq!(migrator.migrate(&cancel).await.unwrap(), 1);
    assert_eq!(inits.load(Ordering::SeqCst), 0);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rollback_by_id() {
    let h = harness();
    h.importer
        .import_block(&h.cancel, &block(1, vec![transfer(1, addr(1), addr(2), 1)]))
        .await
        .unwrap();
    let runs = Arc::new(AtomicUsize::new(0));
    let migrator = Migrator::new(
        h.store.clone(),
        vec![Box::new(TransactionsByAddress) as Box<dyn Migration>, counting(2, &runs)],
    )
    .unwrap();

    assert!(matches!(
        migrator.rollback(&h.cancel, 1).await,
        Err(MigrationError::NotApplied(1))
    ));

    migrator.migrate(&h.cancel).await.unwrap();
    assert_eq!(h.store.address_transaction_count().await, 2);

    // Not the last one, but reversible.
    migrator.rollback(&h.cancel, 1).await.unwrap();
    assert_eq!(h.store.address_transaction_count().await, 0);
    assert!(!h.store.migration_applied(1).await.unwrap());
    assert_eq!(migrator.version().await.unwrap(), Some(2));

    assert!(matches!(
        migrator.rollback(&h.cancel, 2).await,
        Err(MigrationError::RollbackImpossible(2))
    ));
    assert!(matches!(
        migrator.rollback(&h.cancel, 9).await,
        Err(MigrationError::UnknownMigration(9))
    ));
}
