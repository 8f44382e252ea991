use std::future::Future;

use crate::models::error::StoreError;
use crate::models::persisted::{PersistedState, StatePatch};

/// Durable key-value store shared by every execution context.
///
/// No transactions: callers do read, mutate in memory, write back. A single
/// coordinator instance is assumed to be the only writer.
pub trait StateStore: Send + Sync {
    /// Read the full document; missing keys take their defaults.
    fn load(&self) -> impl Future<Output = Result<PersistedState, StoreError>> + Send;

    /// Replace every key present in `patch`. Nothing is committed on error.
    fn apply(&self, patch: StatePatch) -> impl Future<Output = Result<(), StoreError>> + Send;
}
