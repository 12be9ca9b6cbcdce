mod common;

use chrono::{TimeZone, Utc};
use common::*;
use explorer_chain::{ChainReceipt, checksum};
use explorer_storage::Store;

#[tokio::test]
async fn reimport_leaves_no_residue() {
    let h = harness();
    let first = block(
        5,
        vec![
            transfer(1, addr(1), addr(2), 10),
            transfer(2, addr(1), addr(3), 20),
            transfer(3, addr(2), addr(3), 30),
        ],
    );
    h.importer.import_block(&h.cancel, &first).await.unwrap();
    assert_eq!(h.store.count_block_transactions(5).await.unwrap(), 3);

    let mut second = block(5, vec![transfer(4, addr(4), addr(5), 1), transfer(5, addr(5), addr(4), 2)]);
    second.hash = hash(500);
    let stored = h.importer.import_block(&h.cancel, &second).await.unwrap();

    assert_eq!(stored.tx_count, 2);
    assert_eq!(stored.hash, hash(500).to_string());
    let txs = h.store.block_transactions(5, 0, 10).await.unwrap();
    let hashes: Vec<_> = txs.iter().map(|t| t.tx_hash.clone()).collect();
    assert_eq!(hashes, [tx_hash(4).to_string(), tx_hash(5).to_string()]);
    assert!(h.store.transaction(&tx_hash(1).to_string()).await.unwrap().is_none());
    assert_eq!(h.store.transaction_count().await, 2);
}

#[tokio::test]
async fn transaction_fields_are_materialized() {
    let h = harness();
    let mut tx = transfer(1, addr(1), addr(2), 7);
    tx.from = None;
    tx.input = vec![0xa9, 0x05, 0x9c, 0xbb].into();
    h.node.with(|s| s.senders.insert(tx_hash(1), addr(9)));

    h.importer.import_block(&h.cancel, &block(3, vec![tx])).await.unwrap();

    let stored = h.store.transaction(&tx_hash(1).to_string()).await.unwrap().unwrap();
    assert_eq!(stored.from_address, checksum(&addr(9)));
    assert_eq!(stored.to_address, checksum(&addr(2)));
    assert_eq!(stored.value, "7");
    assert_eq!(stored.gas_fee, (1_000_000_000u64 * 21_000).to_string());
    assert_eq!(stored.input_data, "a9059cbb");
    assert!(!stored.input_empty);
    assert_eq!(stored.block_number, 3);
    assert_eq!(stored.created_at, Utc.timestamp_opt(1_600_000_015, 0).unwrap());
    assert!(!stored.receipt_received);
}

#[tokio::test]
async fn contract_creation_reads_receipt() {
    let h = harness();
    let mut create = transfer(1, addr(1), addr(0), 0);
    create.to = None;
    h.node.with(|s| {
        s.receipts.insert(
            tx_hash(1),
            ChainReceipt {
                transaction_hash: tx_hash(1),
                contract_address: Some(addr(0xcc)),
                status: true,
                gas_used: 90_000,
                logs: vec![],
            },
        )
    });

    h.importer.import_block(&h.cancel, &block(1, vec![create])).await.unwrap();

    let stored = h.store.transaction(&tx_hash(1).to_string()).await.unwrap().unwrap();
    assert_eq!(stored.to_address, "");
    assert_eq!(stored.contract_address, Some(checksum(&addr(0xcc))));
    assert_eq!(stored.status, Some(true));
    assert_eq!(h.store.contract_creation_block(&checksum(&addr(0xcc))).await.unwrap(), Some(1));

    let since = Utc.timestamp_opt(0, 0).unwrap();
    let active: Vec<_> = h
        .store
        .active_addresses_since(since)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.address)
        .collect();
    assert!(active.contains(&checksum(&addr(0xcc))));
    assert!(active.contains(&checksum(&addr(1))));
    assert!(active.contains(&checksum(&addr(0xee))));
}

#[tokio::test]
async fn failed_receipt_does_not_abort_block() {
    let h = harness();
    let mut create = transfer(1, addr(1), addr(0), 0);
    create.to = None;
    h.node.with(|s| s.failing_receipts.insert(tx_hash(1)));

    let stored = h
        .importer
        .import_block(&h.cancel, &block(2, vec![create, transfer(2, addr(1), addr(2), 1)]))
        .await
        .unwrap();

    assert_eq!(stored.tx_count, 2);
    let tx = h.store.transaction(&tx_hash(1).to_string()).await.unwrap().unwrap();
    assert_eq!(tx.contract_address, None);
    assert_eq!(tx.status, None);
}

#[tokio::test]
async fn ensure_receipt_fills_once() {
    let h = harness();
    h.importer
        .import_block(&h.cancel, &block(1, vec![transfer(1, addr(1), addr(2), 1)]))
        .await
        .unwrap();
    h.node.with(|s| {
        s.receipts.insert(
            tx_hash(1),
            ChainReceipt {
                transaction_hash: tx_hash(1),
                contract_address: None,
                status: true,
                gas_used: 21_000,
                logs: vec![],
            },
        )
    });

    let filled = h
        .importer
        .ensure_receipt(&h.cancel, &tx_hash(1).to_string())
        .await
        .unwrap()
        .unwrap();
    assert!(filled.receipt_received);
    assert_eq!(filled.gas_used, Some(21_000));
    assert_eq!(filled.status, Some(true));
    assert_eq!(filled.gas_fee, "21000000000000");
    let calls = h.node.with(|s| s.receipt_calls);

    let again = h
        .importer
        .ensure_receipt(&h.cancel, &tx_hash(1).to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again, filled);
    assert_eq!(h.node.with(|s| s.receipt_calls), calls);
}

#[tokio::test]
async fn ensure_receipt_keeps_document_when_node_fails() {
    let h = harness();
    h.importer
        .import_block(&h.cancel, &block(1, vec![transfer(1, addr(1), addr(2), 1)]))
        .await
        .unwrap();
    h.node.with(|s| s.failing_receipts.insert(tx_hash(1)));

    let tx = h
        .importer
        .ensure_receipt(&h.cancel, &tx_hash(1).to_string())
        .await
        .unwrap()
        .unwrap();
    assert!(!tx.receipt_received);
    assert!(h.importer.ensure_receipt(&h.cancel, "0x00").await.unwrap().is_none());
}

#[tokio::test]
async fn block_or_import_fetches_missing_heights() {
    let h = harness();
    h.node.with(|s| s.blocks.insert(9, block(9, vec![])));

    assert!(h.store.block_by_number(9).await.unwrap().is_none());
    let fetched = h.importer.block_or_import(&h.cancel, 9).await.unwrap().unwrap();
    assert_eq!(fetched.number, 9);
    assert!(h.store.block_by_number(9).await.unwrap().is_some());

    assert!(h.importer.block_or_import(&h.cancel, 10).await.unwrap().is_none());
    assert!(h.importer.import_height(&h.cancel, 10).await.unwrap().is_none());
}

#[tokio::test]
async fn cancelled_import_stops_before_writing() {
    let h = harness();
    let mut tx = transfer(1, addr(1), addr(2), 1);
    tx.from = None;
    h.cancel.cancel();

    let err = h
        .importer
        .import_block(&h.cancel, &block(4, vec![tx]))
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(h.store.block_by_number(4).await.unwrap().is_none());
}
