//! Graph layout versions
//!
//! Every graph records the layout version that created it in its variables
//! document. A graph written by a newer layout is refused rather than read
//! with rules that may no longer hold.

use crate::error::{Error, Result};

/// Layout version written by this build
pub const SCHEMA_VERSION: u32 = 1;

/// A layout version and what it introduced
#[derive(Debug, Clone)]
pub struct SchemaVersion {
    pub version: u32,
    pub description: &'static str,
}

/// All known layout versions, oldest first
pub fn versions() -> Vec<SchemaVersion> {
    vec![SchemaVersion {
        version: 1,
        description: "Prefixed collections, typed property values, graph variables document",
    }]
}

/// Accept a stored version unless it is newer than [`SCHEMA_VERSION`]
pub fn check_version(found: u32) -> Result<()> {
    if found > SCHEMA_VERSION {
        tracing::warn!(
            "Graph version {} is newer than supported version {}",
            found,
            SCHEMA_VERSION
        );
        return Err(Error::IncompatibleVersion {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    if found < SCHEMA_VERSION {
        tracing::debug!("Graph version {} predates {}; reading as is", found, SCHEMA_VERSION);
    }
    Ok(())
}
