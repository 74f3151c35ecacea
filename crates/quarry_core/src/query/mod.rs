//! Query composition pipeline.
//!
//! Turns a predicate (typed or textual) plus optional sort spec and paging
//! window into an executable read. Parsing produces an AST, compilation
//! binds field names to accessor fn pointers once, and [`plan::Query`]
//! applies filter, stable sort, and window over materialized rows.

pub mod ast;
pub mod compile;
pub mod parser;
pub mod plan;

pub use ast::{CmpOp, FilterExpr, Literal, SortDir, SortExpr, SortKey};
pub use compile::{CompiledFilter, CompiledSort};
pub use parser::{parse_filter, parse_sort};
pub use plan::{Filter, Query, Window};
