//! Docgraph Client - graph operations over a document store
//!
//! [`GraphClient`] is the only component that talks to the store. It opens a
//! graph (schema reconciliation, version check, variables record), writes and
//! reads vertices and edges, runs the one-hop traversals, and classifies every
//! store failure into a [`docgraph_core::Error`].

mod client;
mod errors;
mod traversal;

pub use client::{ElementStream, GraphClient};
pub use errors::map_store_error;
