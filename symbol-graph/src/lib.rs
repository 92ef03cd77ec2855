//! Property graph of code symbols and their relationships.

pub mod errors;
pub mod graph;

pub use errors::{Error, Result};
pub use graph::{EdgeType, GraphStats, SymbolEdges, SymbolGraph, SymbolNode};
