//! Composable aggregation stages and the in-process evaluator that runs them.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s applied left to right over
//! a record stream. The same value renders to server-side aggregation
//! documents (`to_documents`) or is evaluated locally by [`executor`].

pub mod executor;
pub mod expr;
pub mod filter;
pub mod stage;
pub mod value;

pub use expr::{round_to, Expr};
pub use filter::Filter;
pub use stage::{
    Accumulator, GroupKey, JoinKind, Lookup, Pipeline, Projection, SortOrder, Stage,
};
