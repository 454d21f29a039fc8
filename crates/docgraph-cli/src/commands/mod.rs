//! CLI command implementations

pub mod edge;
pub mod graph;
pub mod traverse;
pub mod var;
pub mod vertex;
