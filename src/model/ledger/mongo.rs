use std::ops::Deref;

use mongodb::{
    bson::{doc, Document},
    error::{Error as DbError, ErrorKind, WriteFailure},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{
    store::{LedgerStore, StoreError},
    LedgerState,
};

/// The mongodb crate doesn't export server error codes.
const DUPLICATE_KEY: i32 = 11000;

/// Return true if the given error is a duplicate key write error.
fn is_duplicate_key_error(err: &DbError) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref e)) if e.code == DUPLICATE_KEY
    )
}

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// ID of the single ledger document.
pub const LEDGER_ID: &str = "devote";

/// The ledger as stored: one document holding the whole state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(flatten)]
    state: LedgerState,
}

impl MongoCollection for LedgerDocument {
    const NAME: &'static str = "ledger";
}

fn version_filter(version: u64) -> Result<Document, StoreError> {
    let version = i64::try_from(version).map_err(|_| StoreError::VersionOutOfRange(version))?;
    Ok(doc! { "_id": LEDGER_ID, "version": version })
}

/// Stores the ledger in MongoDB.
#[derive(Clone)]
pub struct MongoStore {
    ledger: Coll<LedgerDocument>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            ledger: Coll::from_db(db),
        }
    }
}

#[rocket::async_trait]
impl LedgerStore for MongoStore {
    async fn load(&self) -> Result<Option<LedgerState>, StoreError> {
        let document = self
            .ledger
            .find_one(doc! { "_id": LEDGER_ID }, None)
            .await?;
        Ok(document.map(|document| document.state))
    }

    async fn commit(&self, state: &LedgerState) -> Result<(), StoreError> {
        let conflict = StoreError::Conflict {
            attempted: state.version,
        };
        let document = LedgerDocument {
            id: LEDGER_ID.to_string(),
            state: state.clone(),
        };

        match state.version {
            0 => Err(conflict),
            // First commit: the unique `_id` rejects a racing first commit.
            1 => match self.ledger.insert_one(&document, None).await {
                Ok(_) => Ok(()),
                Err(err) if is_duplicate_key_error(&err) => Err(conflict),
                Err(err) => Err(err.into()),
            },
            version => {
                let result = self
                    .ledger
                    .replace_one(version_filter(version - 1)?, &document, None)
                    .await?;
                if result.matched_count == 1 {
                    Ok(())
                } else {
                    Err(conflict)
                }
            }
        }
    }
}
