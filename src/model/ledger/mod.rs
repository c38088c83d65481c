//! The ledger: everything the service knows, kept in memory for reads and
//! committed to a [`LedgerStore`] after every successful change.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rocket::tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{address::Address, clock::Clock, election::Registry, funding::FundingBook};

pub use mongo::{Coll, LedgerDocument, MongoCollection, MongoStore, LEDGER_ID};
pub use store::{LedgerStore, MemoryStore, StoreError};

mod mongo;
mod store;

/// A committed snapshot of the whole service state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Number of commits so far; zero until the first change is stored.
    pub version: u64,
    pub registry: Registry,
    pub funding: FundingBook,
}

impl LedgerState {
    pub fn new(admin: Address) -> Self {
        Self {
            version: 0,
            registry: Registry::new(admin),
            funding: FundingBook::default(),
        }
    }
}

pub struct Ledger {
    /// Last committed state. Only held for writing while swapping in a
    /// state that is already stored.
    state: RwLock<LedgerState>,
    /// Serializes writers.
    writer: Mutex<()>,
    store: Arc<dyn LedgerStore>,
    registration_lead: Duration,
}

impl Ledger {
    /// Load the ledger from `store`, or start an empty one administered by
    /// `admin` if nothing was stored yet. A stored ledger keeps its own admin.
    pub async fn open(
        store: Arc<dyn LedgerStore>,
        admin: Address,
        registration_lead: Duration,
    ) -> Result<Self, StoreError> {
        let state = match store.load().await? {
            Some(state) => {
                if state.registry.admin() != &admin {
                    warn!(
                        "Stored ledger is administered by {}, ignoring configured admin {admin}",
                        state.registry.admin()
                    );
                }
                info!("Loaded ledger at version {}", state.version);
                state
            }
            None => {
                info!("No stored ledger, starting a new one administered by {admin}");
                LedgerState::new(admin)
            }
        };

        Ok(Self {
            state: RwLock::new(Self::with_policy(state, registration_lead)),
            writer: Mutex::new(()),
            store,
            registration_lead,
        })
    }

    /// The last committed state.
    pub async fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().await
    }

    /// Apply `op` to a copy of the state and commit the result.
    ///
    /// Writers are serialized. Readers keep seeing the previous state until
    /// the commit is stored. If `op` fails nothing is committed; if the
    /// commit fails the in-memory state is resynchronised from the store and
    /// the change is dropped.
    pub async fn transact<T, F>(&self, op: F) -> Result<T, Error>
    where
        F: FnOnce(&mut LedgerState) -> Result<T, Error>,
    {
        let _writer = self.writer.lock().await;
        let mut draft = self.state.read().await.clone();
        let output = op(&mut draft)?;
        draft.version += 1;

        if let Err(err) = self.store.commit(&draft).await {
            error!("Failed to commit ledger version {}: {err}", draft.version);
            match self.store.load().await {
                Ok(Some(stored)) => {
                    *self.state.write().await = Self::with_policy(stored, self.registration_lead)
                }
                Ok(None) => {}
                Err(reload_err) => error!("Failed to reload ledger: {reload_err}"),
            }
            return Err(err.into());
        }

        debug!("Committed ledger version {}", draft.version);
        *self.state.write().await = draft;
        Ok(output)
    }

    /// Like [`Ledger::transact`], passing `op` the time read from `clock`
    /// once this writer's turn has come, so commits never go back in time.
    pub async fn transact_at<T, F>(&self, clock: &Clock, op: F) -> Result<T, Error>
    where
        F: FnOnce(&mut LedgerState, DateTime<Utc>) -> Result<T, Error>,
    {
        self.transact(|state| op(state, clock.now())).await
    }

    fn with_policy(mut state: LedgerState, registration_lead: Duration) -> LedgerState {
        state.registry.set_registration_lead(registration_lead);
        state
    }
}
