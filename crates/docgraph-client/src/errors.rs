//! Classification of store failures

use docgraph_core::{Error, Result};
use docgraph_storage::{StoreError, StoreResult};

/// Map a store failure to the graph error taxonomy
///
/// Every store call made by the client goes through here.
pub fn map_store_error(err: StoreError) -> Error {
    match err {
        StoreError::Conflict(what) => Error::ElementExists(what),
        StoreError::Interrupted(what) => Error::TraversalInterrupted(what),
        other => Error::Store(other.to_string()),
    }
}

/// Treat "not found" as success, for idempotent deletes
pub(crate) fn ignore_missing(result: StoreResult<()>) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other.map_err(map_store_error),
    }
}
