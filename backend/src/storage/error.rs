use std::path::PathBuf;

use super::traits::Collection;

/// Failures of the record store.
///
/// Every variant is a storage failure from the caller's point of view: the
/// database is unreachable, out of space, or holds a row that no longer maps
/// onto its entity type. Nothing in the storage layer retries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Backend(#[from] sqlx::Error),

    #[error("could not prepare database location {path}: {source}")]
    Location {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt {collection} record '{id}': {detail}")]
    Corrupt {
        collection: Collection,
        id: String,
        detail: String,
    },

    #[error("record '{id}' belongs to {actual}, not {expected}")]
    WrongCollection {
        expected: Collection,
        actual: Collection,
        id: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;
