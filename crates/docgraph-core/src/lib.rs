//! Docgraph Core - property graphs on a multi-collection document store
//!
//! This crate holds everything that needs no I/O: the element id scheme,
//! stored document shapes, typed property values, schema derivation and
//! reconciliation, and generation of the read queries.

pub mod config;
pub mod document;
pub mod element;
pub mod error;
pub mod id;
pub mod naming;
pub mod property;
pub mod query;
pub mod schema;
pub mod version;

pub use config::GraphConfig;
pub use document::{Decoded, DocumentMeta, VariablesData};
pub use element::{EdgeData, ElementState, VertexData, VertexProperty};
pub use error::{Error, Result};
pub use id::{ElementId, IdCodec, IdRef};
pub use naming::{GraphType, NamePolicy};
pub use property::PropertyValue;
pub use query::{AqlQuery, Direction, QueryBuilder, QueryShape, TraversalTarget};
pub use schema::{EdgeDefinition, GraphDefinition, GraphSchema, Relation, SchemaPlan};
pub use version::{check_version, SCHEMA_VERSION};
