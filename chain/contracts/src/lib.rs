//! Swap escrow contracts
//!
//! Ledger-side logic for escrowed token swaps: a factory that creates one
//! funded escrow per request, the commitment scheme binding each escrow to
//! its request, and the validation engine an escrow runs before any order
//! may spend its funds.
//!
//! # Modules
//! - `commitment`: Canonical encoding and request fingerprints
//! - `config`: Engine configuration
//! - `digest`: Domain separator and order digests
//! - `errors`: Contract error types and rejection reasons
//! - `escrow`: Escrow accounts, initialization, validation, cancellation
//! - `events`: Announcements for off-ledger observers
//! - `factory`: Escrow creation and the escrow table
//! - `ledger`: Token balances and allowances
//! - `price_checker`: Pluggable price sanity checks and oracle quotes
//! - `security`: Reentrancy guard, fill registry
//! - `settlement`: Settlement collaborator that executes accepted orders

pub mod commitment;
pub mod config;
pub mod digest;
pub mod errors;
pub mod escrow;
pub mod events;
pub mod factory;
pub mod ledger;
pub mod price_checker;
pub mod security;
pub mod settlement;

/// Version of the fingerprint and digest encodings
pub const CONTRACT_ABI_VERSION: &str = "1.0.0";
