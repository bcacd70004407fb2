//! Contract-specific error types
//!
//! Error taxonomy for the ledger model, escrow accounts, the factory, the
//! settlement model and price checkers. `RejectReason` is the verdict type of
//! order validation; it is not an error of the engine itself.

use thiserror::Error;

/// Token ledger errors. Every transfer is all-or-nothing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient balance for {asset}: required {required}, available {available}")]
    InsufficientBalance {
        asset: String,
        required: String,
        available: String,
    },

    #[error("Insufficient allowance for {asset}: required {required}, approved {approved}")]
    InsufficientAllowance {
        asset: String,
        required: String,
        approved: String,
    },

    #[error("Transfer amount must be positive")]
    InvalidAmount,

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,
}

/// Escrow account errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EscrowError {
    #[error("Escrow already initialized")]
    AlreadyInitialized,

    #[error("Escrow not initialized")]
    NotInitialized,

    #[error("Not owner: parameters do not reproduce the stored fingerprint")]
    NotOwner,

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Factory errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FactoryError {
    #[error("Sell amount must be positive")]
    InvalidAmount,

    #[error("Price checker config is {len} bytes, limit is {max}")]
    ConfigTooLarge { len: usize, max: usize },

    #[error("Cannot allocate a new escrow address")]
    AddressExhausted,

    #[error("Reentrancy detected")]
    Reentrancy,

    #[error("Escrow not found: {address}")]
    UnknownEscrow { address: String },

    #[error("Escrow error: {0}")]
    Escrow(#[from] EscrowError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Settlement collaborator errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettlementError {
    #[error("Order not authorized by escrow: {0}")]
    Unauthorized(RejectReason),

    #[error("Order already filled: {uid}")]
    AlreadyFilled { uid: String },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Price checker errors. Any of these makes validation reject.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PriceCheckerError {
    #[error("Invalid price checker config: {0}")]
    InvalidConfig(String),

    #[error("Slippage must be at most 10000 bps, got {0}")]
    InvalidSlippage(u32),

    #[error("No quote available for {from} -> {to}")]
    QuoteUnavailable { from: String, to: String },

    #[error("Arithmetic overflow in price computation")]
    Overflow,
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Why a candidate order was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    #[error("escrow not initialized")]
    NotInitialized,

    #[error("malformed candidate payload")]
    MalformedPayload,

    #[error("order digest does not match payload")]
    DigestMismatch,

    #[error("order is not a sell order")]
    NotSellOrder,

    #[error("expires too soon")]
    ExpiresTooSoon,

    #[error("order is partially fillable")]
    PartiallyFillable,

    #[error("non-plain balance source")]
    NonPlainBalance,

    #[error("sell amount plus fee overflows")]
    AmountOverflow,

    #[error("price checker not available")]
    PriceCheckerUnavailable,

    #[error("price checker failed")]
    PriceCheckerFailed,

    #[error("invalid min out")]
    PriceCheckFailed,

    #[error("fingerprint mismatch")]
    FingerprintMismatch,
}
