use std::sync::Arc;

use explorer_core::AppError;
use explorer_storage::Store;

/// Read-only predicates deciding whether a stored height must be imported
/// again. Divergence is reported as `true`/`false`, never as an error.
pub struct Checker {
    store: Arc<dyn Store>,
}

impl Checker {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// True when Block(n) is missing, its parent is missing, or the parent
    /// hash linkage between them is broken. Block(0) never has a stored
    /// parent, so callers walking a range stop above genesis.
    pub async fn need_reload_block(&self, number: i64) -> Result<bool, AppError> {
        let Some(block) = self.store.block_by_number(number).await? else {
            tracing::debug!(number, "block not stored");
            return Ok(true);
        };
        let Some(parent) = self.store.block_by_number(number - 1).await? else {
            tracing::debug!(number, "parent block not stored");
            return Ok(true);
        };

        let broken = block.parent_hash != parent.hash;
        if broken {
            tracing::debug!(
                number,
                parent_hash = %block.parent_hash,
                stored_parent = %parent.hash,
                "parent hash mismatch"
            );
        }
        Ok(broken)
    }

    /// True when the number of stored transactions under `n` matches the
    /// block's recorded transaction count, or when Block(n) is absent.
    pub async fn transactions_consistent(&self, number: i64) -> Result<bool, AppError> {
        let Some(block) = self.store.block_by_number(number).await? else {
            return Ok(true);
        };
        let stored = self.store.count_block_transactions(number).await?;
        tracing::debug!(number, expected = block.tx_count, stored, "checking transaction count");
        Ok(stored == i64::from(block.tx_count))
    }
}
