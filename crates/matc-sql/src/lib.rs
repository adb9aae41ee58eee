//! matc-sql - SQL layer for matc
//!
//! This crate turns source files into executable [`matc_core::Query`] values
//! (comment stripping, template rendering, statement splitting with
//! `SET`/`DECLARE` forward-carry) and provides the sqlparser-backed table
//! helpers the dev-environment rewriter relies on.

pub mod comments;
pub mod dialect;
pub mod error;
pub mod extractor;
pub mod tables;

pub use comments::strip_comments;
pub use dialect::parse_sql;
pub use error::{SqlError, SqlResult};
pub use extractor::{
    extractor_for, split_queries, QueryExtractor, SplittingExtractor, WholeFileExtractor,
};
pub use tables::{rename_tables, used_tables};
