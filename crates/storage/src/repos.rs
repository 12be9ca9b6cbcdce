use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};

use crate::models::*;

/// Bind parameters Postgres accepts in one statement.
const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// Columns bound per row by [`insert_transactions_batch`].
pub const TRANSACTION_COLUMNS: usize = 19;

/// Columns bound per row by [`upsert_active_addresses`].
pub const ACTIVE_ADDRESS_COLUMNS: usize = 2;

const ADDRESS_TRANSACTION_COLUMNS: usize = 3;

/// Largest row count a multi-value statement with `columns` binds per row
/// can carry.
pub const fn rows_per_statement(columns: usize) -> usize {
    MAX_BIND_PARAMS / columns
}

// ─── Block Queries ──────────────────────────────────────────────────────────

/// Upsert a block by number, replacing every column.
pub async fn upsert_block<'e, E>(executor: E, block: &Block) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO blocks (number, hash, parent_hash, miner, gas_limit, gas_used, difficulty,
                            tx_count, tx_root, sha3_uncles, extra_data, nonce_valid, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (number) DO UPDATE
        SET hash = $2, parent_hash = $3, miner = $4, gas_limit = $5, gas_used = $6,
            difficulty = $7, tx_count = $8, tx_root = $9, sha3_uncles = $10,
            extra_data = $11, nonce_valid = $12, created_at = $13
        "#,
    )
    .bind(block.number)
    .bind(&block.hash)
    .bind(&block.parent_hash)
    .bind(&block.miner)
    .bind(block.gas_limit)
    .bind(block.gas_used)
    .bind(&block.difficulty)
    .bind(block.tx_count)
    .bind(&block.tx_root)
    .bind(&block.sha3_uncles)
    .bind(&block.extra_data)
    .bind(block.nonce_valid)
    .bind(block.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get_block_by_number(pool: &PgPool, number: i64) -> Result<Option<Block>, sqlx::Error> {
    sqlx::query_as::<_, Block>("SELECT * FROM blocks WHERE number = $1")
        .bind(number)
        .fetch_optional(pool)
        .await
}

pub async fn get_block_by_hash(pool: &PgPool, hash: &str) -> Result<Option<Block>, sqlx::Error> {
    sqlx::query_as::<_, Block>("SELECT * FROM blocks WHERE hash = $1")
        .bind(hash)
        .fetch_optional(pool)
        .await
}

pub async fn get_latest_blocks(pool: &PgPool, skip: i64, limit: i64) -> Result<Vec<Block>, sqlx::Error> {
    sqlx::query_as::<_, Block>("SELECT * FROM blocks ORDER BY number DESC OFFSET $1 LIMIT $2")
        .bind(skip)
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// Get the highest stored block number.
pub async fn get_latest_block(pool: &PgPool) -> Result<Option<i64>, sqlx::Error> {
    let row: (Option<i64>,) = sqlx::query_as("SELECT MAX(number) FROM blocks")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

// ─── Transaction Queries ────────────────────────────────────────────────────

/// Delete every transaction recorded under a block number.
pub async fn delete_block_transactions<'e, E>(executor: E, block_number: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM transactions WHERE block_number = $1")
        .bind(block_number)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Insert a batch of transactions using a single multi-value INSERT.
/// A hash that already exists under another block is moved to this one.
/// Callers split larger sets with [`rows_per_statement`].
pub async fn insert_transactions_batch<'e, E>(
    executor: E,
    transactions: &[Transaction],
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    if transactions.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO transactions (tx_hash, from_address, to_address, value, gas_price, gas_fee, gas_limit, \
         nonce, block_number, block_hash, tx_index, created_at, input_data, input_empty, \
         contract_address, status, gas_used, logs, receipt_received) ",
    );

    qb.push_values(transactions, |mut b, t| {
        b.push_bind(&t.tx_hash)
            .push_bind(&t.from_address)
            .push_bind(&t.to_address)
            .push_bind(&t.value)
            .push_bind(&t.gas_price)
            .push_bind(&t.gas_fee)
            .push_bind(t.gas_limit)
            .push_bind(&t.nonce)
            .push_bind(t.block_number)
            .push_bind(&t.block_hash)
            .push_bind(t.tx_index)
            .push_bind(t.created_at)
            .push_bind(&t.input_data)
            .push_bind(t.input_empty)
            .push_bind(&t.contract_address)
            .push_bind(t.status)
            .push_bind(t.gas_used)
            .push_bind(&t.logs)
            .push_bind(t.receipt_received);
    });

    qb.push(
        " ON CONFLICT (tx_hash) DO UPDATE SET \
         from_address = EXCLUDED.from_address, to_address = EXCLUDED.to_address, \
         value = EXCLUDED.value, gas_price = EXCLUDED.gas_price, gas_fee = EXCLUDED.gas_fee, \
         gas_limit = EXCLUDED.gas_limit, nonce = EXCLUDED.nonce, \
         block_number = EXCLUDED.block_number, block_hash = EXCLUDED.block_hash, \
         tx_index = EXCLUDED.tx_index, created_at = EXCLUDED.created_at, \
         input_data = EXCLUDED.input_data, input_empty = EXCLUDED.input_empty, \
         contract_address = EXCLUDED.contract_address, status = EXCLUDED.status, \
         gas_used = EXCLUDED.gas_used, logs = EXCLUDED.logs, \
         receipt_received = EXCLUDED.receipt_received",
    );
    qb.build().execute(executor).await?;
    Ok(())
}

/// Upsert a single transaction document by hash.
pub async fn upsert_transaction<'e, E>(executor: E, tx: &Transaction) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    insert_transactions_batch(executor, std::slice::from_ref(tx)).await
}

pub async fn get_transaction(pool: &PgPool, tx_hash: &str) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE tx_hash = $1")
        .bind(tx_hash)
        .fetch_optional(pool)
        .await
}

pub async fn count_block_transactions(pool: &PgPool, block_number: i64) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transactions WHERE block_number = $1")
        .bind(block_number)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn get_block_transactions(
    pool: &PgPool,
    block_number: i64,
    skip: i64,
    limit: i64,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE block_number = $1 ORDER BY tx_index OFFSET $2 LIMIT $3",
    )
    .bind(block_number)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Transactions sent or received by an address inside a time window,
/// optionally restricted to plain transfers (`input_empty = true`) or calls.
pub async fn get_address_transactions(
    pool: &PgPool,
    filter: &TransactionFilter,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE (from_address = $1 OR to_address = $1)
          AND created_at BETWEEN $2 AND $3
          AND ($4::BOOLEAN IS NULL OR input_empty = $4)
        ORDER BY created_at DESC
        OFFSET $5 LIMIT $6
        "#,
    )
    .bind(&filter.address)
    .bind(filter.from_time)
    .bind(filter.to_time)
    .bind(filter.input_empty)
    .bind(filter.skip)
    .bind(filter.limit)
    .fetch_all(pool)
    .await
}

pub async fn count_address_transactions(pool: &PgPool, address: &str) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM transactions WHERE from_address = $1 OR to_address = $1",
    )
    .bind(address)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn get_transactions_after(
    pool: &PgPool,
    after: Option<&str>,
    limit: i64,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE ($1::TEXT IS NULL OR tx_hash > $1) ORDER BY tx_hash LIMIT $2",
    )
    .bind(after)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn get_contract_creation_block(pool: &PgPool, contract: &str) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT block_number FROM transactions WHERE contract_address = $1 ORDER BY block_number LIMIT 1",
    )
    .bind(contract)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.0))
}

// ─── Active Address Queries ─────────────────────────────────────────────────

/// Callers split larger sets with [`rows_per_statement`].
pub async fn upsert_active_addresses<'e, E>(
    executor: E,
    addresses: &[String],
    at: DateTime<Utc>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    if addresses.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO active_addresses (address, updated_at) ");
    qb.push_values(addresses, |mut b, address| {
        b.push_bind(address).push_bind(at);
    });
    qb.push(" ON CONFLICT (address) DO UPDATE SET updated_at = EXCLUDED.updated_at");
    qb.build().execute(executor).await?;
    Ok(())
}

pub async fn get_active_addresses_since(
    pool: &PgPool,
    since: DateTime<Utc>,
) -> Result<Vec<ActiveAddress>, sqlx::Error> {
    sqlx::query_as::<_, ActiveAddress>(
        "SELECT * FROM active_addresses WHERE updated_at >= $1 ORDER BY updated_at DESC",
    )
    .bind(since)
    .fetch_all(pool)
    .await
}

// ─── Address Queries ────────────────────────────────────────────────────────

/// Upsert an address, replacing every derived field.
pub async fn upsert_address(pool: &PgPool, address: &Address) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO addresses (address, balance_wei, balance_float, balance_string, is_contract,
                               token_name, token_symbol, decimals, total_supply, interfaces,
                               number_of_transactions, number_of_token_holders,
                               number_of_internal_transactions, number_of_token_transactions,
                               updated_at, updated_at_block)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        ON CONFLICT (address) DO UPDATE
        SET balance_wei = $2, balance_float = $3, balance_string = $4, is_contract = $5,
            token_name = $6, token_symbol = $7, decimals = $8, total_supply = $9, interfaces = $10,
            number_of_transactions = $11, number_of_token_holders = $12,
            number_of_internal_transactions = $13, number_of_token_transactions = $14,
            updated_at = $15, updated_at_block = $16
        "#,
    )
    .bind(&address.address)
    .bind(&address.balance_wei)
    .bind(address.balance_float)
    .bind(&address.balance_string)
    .bind(address.is_contract)
    .bind(&address.token_name)
    .bind(&address.token_symbol)
    .bind(address.decimals)
    .bind(&address.total_supply)
    .bind(&address.interfaces)
    .bind(address.number_of_transactions)
    .bind(address.number_of_token_holders)
    .bind(address.number_of_internal_transactions)
    .bind(address.number_of_token_transactions)
    .bind(address.updated_at)
    .bind(address.updated_at_block)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_address(pool: &PgPool, address: &str) -> Result<Option<Address>, sqlx::Error> {
    sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE address = $1")
        .bind(address)
        .fetch_optional(pool)
        .await
}

pub async fn get_richlist(
    pool: &PgPool,
    skip: i64,
    limit: i64,
    exclude: &[String],
) -> Result<Vec<Address>, sqlx::Error> {
    sqlx::query_as::<_, Address>(
        r#"
        SELECT * FROM addresses
        WHERE balance_float > 0 AND NOT (address = ANY($3))
        ORDER BY balance_float DESC, address
        OFFSET $1 LIMIT $2
        "#,
    )
    .bind(skip)
    .bind(limit)
    .bind(exclude)
    .fetch_all(pool)
    .await
}

pub async fn count_token_holders(pool: &PgPool, contract: &str) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM token_holders WHERE contract_address = $1")
        .bind(contract)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn count_contract_internal_transactions(pool: &PgPool, contract: &str) -> Result<i64, sqlx::Error> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM internal_transactions WHERE contract_address = $1")
            .bind(contract)
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

pub async fn count_token_transactions(pool: &PgPool, address: &str) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM internal_transactions WHERE from_address = $1 OR to_address = $1",
    )
    .bind(address)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

// ─── Token Holder Queries ───────────────────────────────────────────────────

pub async fn upsert_token_holder(pool: &PgPool, holder: &TokenHolder) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO token_holders (contract_address, holder_address, balance, balance_int,
                                   token_name, token_symbol, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (contract_address, holder_address) DO UPDATE
        SET balance = $3, balance_int = $4, token_name = $5, token_symbol = $6, updated_at = $7
        "#,
    )
    .bind(&holder.contract_address)
    .bind(&holder.holder_address)
    .bind(&holder.balance)
    .bind(holder.balance_int)
    .bind(&holder.token_name)
    .bind(&holder.token_symbol)
    .bind(holder.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_token_holders(
    pool: &PgPool,
    contract: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<TokenHolder>, sqlx::Error> {
    sqlx::query_as::<_, TokenHolder>(
        "SELECT * FROM token_holders WHERE contract_address = $1 ORDER BY balance_int DESC OFFSET $2 LIMIT $3",
    )
    .bind(contract)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn get_owned_tokens(
    pool: &PgPool,
    holder: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<TokenHolder>, sqlx::Error> {
    sqlx::query_as::<_, TokenHolder>(
        "SELECT * FROM token_holders WHERE holder_address = $1 ORDER BY balance_int DESC OFFSET $2 LIMIT $3",
    )
    .bind(holder)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

// ─── Internal Transaction Queries ───────────────────────────────────────────

pub async fn upsert_internal_transaction(
    pool: &PgPool,
    tx: &InternalTransaction,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO internal_transactions (transaction_hash, contract_address, from_address, to_address,
                                           value, block_number, created_at, created_at_approximate, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (transaction_hash) DO UPDATE
        SET contract_address = $2, from_address = $3, to_address = $4, value = $5,
            block_number = $6, created_at = $7, created_at_approximate = $8, updated_at = $9
        "#,
    )
    .bind(&tx.transaction_hash)
    .bind(&tx.contract_address)
    .bind(&tx.from_address)
    .bind(&tx.to_address)
    .bind(&tx.value)
    .bind(tx.block_number)
    .bind(tx.created_at)
    .bind(tx.created_at_approximate)
    .bind(tx.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_internal_transactions(
    pool: &PgPool,
    query: &InternalTransactionQuery,
    skip: i64,
    limit: i64,
) -> Result<Vec<InternalTransaction>, sqlx::Error> {
    let (sql, address) = match query {
        InternalTransactionQuery::ByContract(address) => (
            "SELECT * FROM internal_transactions WHERE contract_address = $1 \
             ORDER BY block_number DESC OFFSET $2 LIMIT $3",
            address,
        ),
        InternalTransactionQuery::ByParticipant(address) => (
            "SELECT * FROM internal_transactions WHERE from_address = $1 OR to_address = $1 \
             ORDER BY block_number DESC OFFSET $2 LIMIT $3",
            address,
        ),
    };
    sqlx::query_as::<_, InternalTransaction>(sql)
        .bind(address)
        .bind(skip)
        .bind(limit)
        .fetch_all(pool)
        .await
}

// ─── Contract Queries ───────────────────────────────────────────────────────

/// Insert a contract (ignore verification fields if it already exists).
pub async fn upsert_contract(pool: &PgPool, contract: &Contract) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO contracts (address, bytecode, valid, created_at)
        VALUES ($1, $2, FALSE, $3)
        ON CONFLICT (address) DO UPDATE SET bytecode = $2
        "#,
    )
    .bind(&contract.address)
    .bind(&contract.bytecode)
    .bind(contract.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_contract(pool: &PgPool, address: &str) -> Result<Option<Contract>, sqlx::Error> {
    sqlx::query_as::<_, Contract>("SELECT * FROM contracts WHERE address = $1")
        .bind(address)
        .fetch_optional(pool)
        .await
}

/// Flip `valid` from false to true together with the verification fields.
/// Returns `false` when the contract is missing or already verified.
pub async fn mark_contract_verified(pool: &PgPool, contract: &Contract) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE contracts
        SET valid = TRUE, contract_name = $2, compiler_version = $3, optimization = $4,
            source_code = $5, abi = $6, updated_at = $7
        WHERE address = $1 AND valid = FALSE
        "#,
    )
    .bind(&contract.address)
    .bind(&contract.contract_name)
    .bind(&contract.compiler_version)
    .bind(contract.optimization)
    .bind(&contract.source_code)
    .bind(&contract.abi)
    .bind(contract.updated_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

// ─── Stats Queries ──────────────────────────────────────────────────────────

pub async fn count_transactions_since(
    pool: &PgPool,
    since: Option<DateTime<Utc>>,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM transactions WHERE $1::TIMESTAMPTZ IS NULL OR created_at >= $1",
    )
    .bind(since)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn insert_stats(pool: &PgPool, stats: &Stats) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO stats (number_of_total_transactions, number_of_last_week_transactions,
                           number_of_last_day_transactions, updated_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(stats.number_of_total_transactions)
    .bind(stats.number_of_last_week_transactions)
    .bind(stats.number_of_last_day_transactions)
    .bind(stats.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_latest_stats(pool: &PgPool) -> Result<Option<Stats>, sqlx::Error> {
    sqlx::query_as::<_, Stats>(
        r#"
        SELECT number_of_total_transactions, number_of_last_week_transactions,
               number_of_last_day_transactions, updated_at
        FROM stats ORDER BY updated_at DESC LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
}

/// Blocks per miner since a point in time.
pub async fn get_miner_block_counts(
    pool: &PgPool,
    since: DateTime<Utc>,
) -> Result<Vec<SignerStats>, sqlx::Error> {
    sqlx::query_as::<_, SignerStats>(
        r#"
        SELECT miner AS signer, COUNT(*) AS blocks_count
        FROM blocks
        WHERE created_at >= $1
        GROUP BY miner
        ORDER BY blocks_count DESC, signer
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await
}

pub async fn get_block_range(
    pool: &PgPool,
    since: DateTime<Utc>,
) -> Result<Option<BlockRange>, sqlx::Error> {
    let row: (Option<i64>, Option<i64>) =
        sqlx::query_as("SELECT MIN(number), MAX(number) FROM blocks WHERE created_at >= $1")
            .bind(since)
            .fetch_one(pool)
            .await?;
    Ok(match row {
        (Some(start_block), Some(end_block)) => Some(BlockRange {
            start_block,
            end_block,
        }),
        _ => None,
    })
}

// ─── Migration Records ──────────────────────────────────────────────────────

pub async fn migration_exists(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM migration_records WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn get_migration_records(pool: &PgPool) -> Result<Vec<MigrationRecord>, sqlx::Error> {
    sqlx::query_as::<_, MigrationRecord>("SELECT * FROM migration_records ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn insert_migration_record(pool: &PgPool, record: &MigrationRecord) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO migration_records (id, comment) VALUES ($1, $2)")
        .bind(record.id)
        .bind(&record.comment)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_migration_record(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM migration_records WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Batch upsert per-address transaction lookup rows.
pub async fn upsert_address_transactions(
    pool: &PgPool,
    rows: &[AddressTransaction],
) -> Result<(), sqlx::Error> {
    for chunk in rows.chunks(rows_per_statement(ADDRESS_TRANSACTION_COLUMNS)) {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO address_transactions (address, tx_hash, created_at) ");
        qb.push_values(chunk, |mut b, row| {
            b.push_bind(&row.address)
                .push_bind(&row.tx_hash)
                .push_bind(row.created_at);
        });
        qb.push(" ON CONFLICT (address, tx_hash) DO UPDATE SET created_at = EXCLUDED.created_at");
        qb.build().execute(pool).await?;
    }
    Ok(())
}

pub async fn truncate_address_transactions(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("TRUNCATE address_transactions").execute(pool).await?;
    Ok(())
}
