//! Error types for the shared escrow types
//!
//! Parsing and wire-format failures, using thiserror.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid asset symbol: {0:?}")]
    InvalidAsset(String),

    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("Amount overflow")]
    Overflow,

    #[error("Malformed encoding: {0}")]
    Encoding(String),
}
