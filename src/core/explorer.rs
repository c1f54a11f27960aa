//! Block-explorer abstractions

use crate::core::transaction::{Address, RawTransaction};
use anyhow::Result;
use async_trait::async_trait;

/// Source of a contract's transaction history.
///
/// Implementations return an empty list when the explorer reports no data and
/// an error only when the request itself fails.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn fetch_transactions(&self, address: &Address) -> Result<Vec<RawTransaction>>;

    async fn fetch_internal_transactions(&self, address: &Address) -> Result<Vec<RawTransaction>>;
}
