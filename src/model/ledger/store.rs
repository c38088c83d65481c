use std::sync::{Mutex, PoisonError};

use mongodb::error::Error as DbError;
use thiserror::Error;

use super::LedgerState;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),
    /// Someone else committed first; the stored version is not the one this
    /// commit was built on.
    #[error("ledger version {attempted} conflicts with the stored ledger")]
    Conflict { attempted: u64 },
    #[error("ledger version {0} cannot be stored")]
    VersionOutOfRange(u64),
}

/// Durable home of the ledger state.
///
/// Commits are optimistic: a state with version `n` may only replace the
/// stored state with version `n - 1`, and version 1 may only be written when
/// nothing is stored yet.
#[rocket::async_trait]
pub trait LedgerStore: Send + Sync {
    /// The last committed state, if anything was ever committed.
    async fn load(&self) -> Result<Option<LedgerState>, StoreError>;

    async fn commit(&self, state: &LedgerState) -> Result<(), StoreError>;
}

/// Keeps the ledger in process memory. Used by tests and for throwaway
/// deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Option<LedgerState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl LedgerStore for MemoryStore {
    async fn load(&self) -> Result<Option<LedgerState>, StoreError> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(state.clone())
    }

    async fn commit(&self, state: &LedgerState) -> Result<(), StoreError> {
        let mut stored = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let stored_version = stored.as_ref().map_or(0, |stored| stored.version);
        if stored_version + 1 != state.version {
            return Err(StoreError::Conflict {
                attempted: state.version,
            });
        }
        *stored = Some(state.clone());
        Ok(())
    }
}
