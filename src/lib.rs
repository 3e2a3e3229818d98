//! Client-side prepared statements for the [MySQL] text protocol.
//!
//! This crate is the hard core of a driver: it parses a SQL template once
//! into static fragments and placeholder positions, encodes every bound
//! host value into wire-ready literal bytes (with charset-aware escaping
//! and hex fallbacks), and folds batched INSERTs into multi-value
//! statements. The connection itself (handshake, authentication, packet
//! framing, result-set decoding) is an external collaborator reached
//! through the [`Executor`] trait.
//!
//! [MySQL]: https://www.mysql.com/
#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(future_incompatible)]
#![warn(clippy::pedantic)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::string_lit_as_bytes)]
#![warn(clippy::use_self)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

#[macro_use]
mod error;

mod arguments;
mod cache;
mod connection;
mod encode;
pub mod mock;
mod options;
mod query_result;
mod statement;

pub mod charset;

pub use arguments::{MySqlArguments, StreamKind};
pub use cache::StatementCache;
pub use connection::{ConnectionContext, Executor, ServerVersion, SqlMode};
pub use encode::{BindValue, TemporalKind};
pub use error::{Error, Result, EXECUTE_FAILED, NOT_ATTEMPTED, SUCCESS_NO_INFO};
pub use options::{option_descriptor, MySqlOptions, OptionDescriptor, OptionKind, OPTION_SCHEMA};
pub use query_result::MySqlQueryResult;
pub use statement::{MySqlStatement, ParsedStatement, StatementKind};
