//! Swap request parameters and candidate orders
//!
//! `SwapParams` is what a requester commits to. `CandidateOrder` is what an
//! untrusted settlement collaborator proposes; it only ever reaches the
//! validation engine as bytes packed into a `CandidatePayload`.

use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::errors::TypesError;
use crate::ids::{Address, AssetId};
use crate::numeric::{Amount, Timestamp};

/// Upper bound on an encoded payload; anything larger is rejected unread.
pub const MAX_PAYLOAD_BYTES: u64 = 64 * 1024;

/// Largest price-checker config a request may commit to. Leaves room for the
/// order inside one `MAX_PAYLOAD_BYTES` payload.
pub const MAX_PRICE_CHECKER_CONFIG_BYTES: usize = 16 * 1024;

/// Parameters of a swap request, minus the owner (who is always the caller).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapParams {
    pub sell_amount: Amount,
    pub sell_asset: AssetId,
    pub buy_asset: AssetId,
    pub receiver: Address,
    pub price_checker: Option<Address>,
    pub price_checker_config: Vec<u8>,
}

impl SwapParams {
    /// Parameters with no price checker attached.
    pub fn new(
        sell_amount: Amount,
        sell_asset: AssetId,
        buy_asset: AssetId,
        receiver: Address,
    ) -> Self {
        Self {
            sell_amount,
            sell_asset,
            buy_asset,
            receiver,
            price_checker: None,
            price_checker_config: Vec::new(),
        }
    }

    /// Attach a price checker and its opaque configuration.
    pub fn with_price_checker(mut self, checker: Address, config: Vec<u8>) -> Self {
        self.price_checker = Some(checker);
        self.price_checker_config = config;
        self
    }
}

/// Trade direction of a candidate order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// Exact sell amount, minimum buy amount
    Sell,
    /// Exact buy amount, maximum sell amount
    Buy,
}

impl OrderKind {
    /// Stable tag used in canonical encodings.
    pub fn tag(&self) -> u8 {
        match self {
            OrderKind::Sell => 0,
            OrderKind::Buy => 1,
        }
    }
}

/// Where the settlement pulls or pushes token balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceSource {
    /// Plain on-ledger token balance
    Plain,
    /// Balance held in an external liquidity vault, pulled via its allowance
    External,
    /// Internal vault balance
    Internal,
}

impl BalanceSource {
    pub fn tag(&self) -> u8 {
        match self {
            BalanceSource::Plain => 0,
            BalanceSource::External => 1,
            BalanceSource::Internal => 2,
        }
    }
}

/// An order proposed by the settlement collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateOrder {
    pub sell_asset: AssetId,
    pub buy_asset: AssetId,
    pub receiver: Address,
    pub sell_amount: Amount,
    pub buy_amount: Amount,
    /// Last second (inclusive) at which the order may settle
    pub valid_to: Timestamp,
    pub app_data: [u8; 32],
    pub fee_amount: Amount,
    pub kind: OrderKind,
    pub partially_fillable: bool,
    pub sell_balance: BalanceSource,
    pub buy_balance: BalanceSource,
}

impl CandidateOrder {
    /// Sell-kind, fill-or-kill, plain-balance order with no fee.
    pub fn sell(
        sell_asset: AssetId,
        buy_asset: AssetId,
        receiver: Address,
        sell_amount: Amount,
        buy_amount: Amount,
        valid_to: Timestamp,
    ) -> Self {
        Self {
            sell_asset,
            buy_asset,
            receiver,
            sell_amount,
            buy_amount,
            valid_to,
            app_data: [0u8; 32],
            fee_amount: Amount::ZERO,
            kind: OrderKind::Sell,
            partially_fillable: false,
            sell_balance: BalanceSource::Plain,
            buy_balance: BalanceSource::Plain,
        }
    }

    /// Amount the order takes from its owner: sell amount plus fee.
    pub fn effective_sell_amount(&self) -> Option<Amount> {
        self.sell_amount.checked_add(self.fee_amount)
    }
}

/// Bytes handed to the validation engine alongside an order digest.
///
/// Carries the order plus the owner and price-checker settings the
/// collaborator claims the original request used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePayload {
    pub order: CandidateOrder,
    pub owner: Address,
    pub price_checker: Option<Address>,
    pub price_checker_config: Vec<u8>,
}

impl CandidatePayload {
    /// Build the payload that matches a request's committed parameters.
    pub fn for_request(order: CandidateOrder, owner: Address, params: &SwapParams) -> Self {
        Self {
            order,
            owner,
            price_checker: params.price_checker,
            price_checker_config: params.price_checker_config.clone(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, TypesError> {
        wire_options()
            .serialize(self)
            .map_err(|e| TypesError::Encoding(e.to_string()))
    }

    /// Decode untrusted bytes. Trailing bytes and oversized input are errors.
    pub fn decode(bytes: &[u8]) -> Result<Self, TypesError> {
        wire_options()
            .deserialize(bytes)
            .map_err(|e| TypesError::Encoding(e.to_string()))
    }
}

/// Fixed-width, little-endian bincode with a size cap and no trailing bytes.
pub fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_PAYLOAD_BYTES)
        .reject_trailing_bytes()
}
