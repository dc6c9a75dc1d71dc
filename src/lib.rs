//! Evocover - many-objective evolutionary search for coverage goals.
//!
//! This crate evolves candidate inputs (test cases, call sequences, any
//! genome you can clone and mutate) against a graph of coverage goals. Goals
//! are targeted dynamically: a goal only drives fitness once its structural
//! parents are covered, and every covered goal keeps its best solution in an
//! archive.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration and report types (serde)
//! - `search`: Goal graph, goal manager, Pareto ranking, selection and the
//!   evolutionary strategies
//!
//! The engine treats genome construction, genetic operators and execution as
//! black boxes behind the traits in [`search`]. See the module docs there
//! for a complete example.

pub mod schema;
pub mod search;

// Re-export commonly used types
pub use schema::{SearchConfig, SearchResult, StrategyConfig};
pub use search::{Goal, GoalGraph, GoalManager, SearchEngine};
