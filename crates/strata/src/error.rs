//! Typed error taxonomy for the strategy graph, planner, and executor.
//!
//! Library functions return [`Result<T>`] (an alias over [`StrataError`]).
//! Application-level glue (the CLI) wraps these in `anyhow::Error` for
//! context-chaining and display; the core never depends on `anyhow` for
//! its own control flow so embedders get a matchable error type.

use thiserror::Error;

use crate::address::Address;

#[derive(Debug, Error)]
pub enum StrataError {
    #[error("invalid address `{0}`")]
    InvalidAddress(String),

    #[error("unresolvable address {0}")]
    UnresolvableAddress(Address),

    #[error(
        "unknown addresses: {}",
        .0.iter().map(Address::to_string).collect::<Vec<_>>().join(", ")
    )]
    UnknownAddresses(Vec<Address>),

    #[error("invalid attribute `{attr}` on {address}")]
    InvalidAttribute { address: Address, attr: String },

    #[error("spec not found: {0}")]
    SpecNotFound(Address),

    #[error("duplicate address registered: {0}")]
    DuplicateAddress(Address),

    #[error("step error at {address}: {message}")]
    StepError { address: Address, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("state store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, StrataError>;
