//! Price checkers: pluggable sanity checks on a candidate's output amount
//!
//! The validation engine only sees the `PriceChecker` trait and trusts its
//! boolean verdict. Checkers are looked up by identity in a
//! `PriceCheckerRegistry`; each checker defines its own config encoding
//! (bincode, same wire options as candidate payloads).
//!
//! Quotes come from an `ExpectedOutCalculator`, the external price oracle.
//! Time-gated checkers read the ledger time carried in `PriceCheck`, never
//! a wall clock.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bincode::Options;
use escrow_types::ids::{Address, AssetId};
use escrow_types::numeric::{Amount, Timestamp};
use escrow_types::order::wire_options;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::PriceCheckerError;

/// Basis-point denominator.
pub const MAX_BPS: u32 = 10_000;

/// What the validation engine asks a checker about one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceCheck<'a> {
    /// Sell amount including `fee`.
    pub amount_in: Amount,
    pub from: &'a AssetId,
    pub to: &'a AssetId,
    pub fee: Amount,
    /// What the order promises.
    pub min_out: Amount,
    /// Ledger time of the validation.
    pub now: Timestamp,
}

/// Capability consulted during validation.
pub trait PriceChecker: Send + Sync {
    fn check_price(
        &self,
        check: &PriceCheck<'_>,
        config: &[u8],
    ) -> Result<bool, PriceCheckerError>;
}

/// External quoting oracle: how much `to` does `amount_in` of `from` buy.
pub trait ExpectedOutCalculator: Send + Sync {
    fn expected_out(
        &self,
        amount_in: Amount,
        from: &AssetId,
        to: &AssetId,
        data: &[u8],
    ) -> Result<Amount, PriceCheckerError>;
}

/// Decode a checker config from its wire bytes.
pub fn decode_config<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PriceCheckerError> {
    wire_options()
        .deserialize(bytes)
        .map_err(|e| PriceCheckerError::InvalidConfig(e.to_string()))
}

/// Encode a checker config to its wire bytes.
pub fn encode_config<T: Serialize>(config: &T) -> Result<Vec<u8>, PriceCheckerError> {
    wire_options()
        .serialize(config)
        .map_err(|e| PriceCheckerError::InvalidConfig(e.to_string()))
}

/// `expected * (MAX_BPS - slippage_bps) / MAX_BPS`
fn slippage_floor(expected: Amount, slippage_bps: u32) -> Result<Amount, PriceCheckerError> {
    if slippage_bps > MAX_BPS {
        return Err(PriceCheckerError::InvalidSlippage(slippage_bps));
    }
    expected
        .checked_mul_div(u128::from(MAX_BPS - slippage_bps), u128::from(MAX_BPS))
        .ok_or(PriceCheckerError::Overflow)
}

/// Quote the traded part of `amount_in` (fee excluded) and compare.
fn check_against_quote(
    calculator: &dyn ExpectedOutCalculator,
    slippage_bps: u32,
    check: &PriceCheck<'_>,
    data: &[u8],
) -> Result<bool, PriceCheckerError> {
    let traded = check
        .amount_in
        .checked_sub(check.fee)
        .ok_or(PriceCheckerError::Overflow)?;
    let expected = calculator.expected_out(traded, check.from, check.to, data)?;
    let floor = slippage_floor(expected, slippage_bps)?;
    debug!(
        from = %check.from,
        to = %check.to,
        %traded,
        %expected,
        %floor,
        min_out = %check.min_out,
        "Price check"
    );
    Ok(check.min_out >= floor)
}

// ───────────────────────── Checkers ─────────────────────────

/// Accepts when `min_out` is within a fixed slippage of the oracle quote.
///
/// The request's config bytes are forwarded to the calculator untouched.
pub struct FixedSlippageChecker {
    allowed_slippage_bps: u32,
    calculator: Arc<dyn ExpectedOutCalculator>,
}

impl FixedSlippageChecker {
    pub fn new(
        allowed_slippage_bps: u32,
        calculator: Arc<dyn ExpectedOutCalculator>,
    ) -> Result<Self, PriceCheckerError> {
        if allowed_slippage_bps > MAX_BPS {
            return Err(PriceCheckerError::InvalidSlippage(allowed_slippage_bps));
        }
        Ok(Self {
            allowed_slippage_bps,
            calculator,
        })
    }
}

impl PriceChecker for FixedSlippageChecker {
    fn check_price(
        &self,
        check: &PriceCheck<'_>,
        config: &[u8],
    ) -> Result<bool, PriceCheckerError> {
        check_against_quote(
            self.calculator.as_ref(),
            self.allowed_slippage_bps,
            check,
            config,
        )
    }
}

/// Config for `DynamicSlippageChecker`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicSlippageConfig {
    pub allowed_slippage_bps: u32,
    pub calculator_data: Vec<u8>,
}

impl DynamicSlippageConfig {
    pub fn encode(&self) -> Result<Vec<u8>, PriceCheckerError> {
        encode_config(self)
    }
}

/// Like `FixedSlippageChecker`, but each request picks its own tolerance.
pub struct DynamicSlippageChecker {
    calculator: Arc<dyn ExpectedOutCalculator>,
}

impl DynamicSlippageChecker {
    pub fn new(calculator: Arc<dyn ExpectedOutCalculator>) -> Self {
        Self { calculator }
    }
}

impl PriceChecker for DynamicSlippageChecker {
    fn check_price(
        &self,
        check: &PriceCheck<'_>,
        config: &[u8],
    ) -> Result<bool, PriceCheckerError> {
        let config: DynamicSlippageConfig = decode_config(config)?;
        check_against_quote(
            self.calculator.as_ref(),
            config.allowed_slippage_bps,
            check,
            &config.calculator_data,
        )
    }
}

/// Config for `FixedMinOutChecker`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedMinOutConfig {
    pub min_out: Amount,
}

impl FixedMinOutConfig {
    pub fn encode(&self) -> Result<Vec<u8>, PriceCheckerError> {
        encode_config(self)
    }
}

/// Accepts when the order promises at least a requester-chosen amount.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedMinOutChecker;

impl PriceChecker for FixedMinOutChecker {
    fn check_price(
        &self,
        check: &PriceCheck<'_>,
        config: &[u8],
    ) -> Result<bool, PriceCheckerError> {
        let config: FixedMinOutConfig = decode_config(config)?;
        Ok(check.min_out >= config.min_out)
    }
}

/// Config of `ValidFromDecorator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidFromConfig {
    pub valid_from: Timestamp,
    pub inner_config: Vec<u8>,
}

impl ValidFromConfig {
    pub fn encode(&self) -> Result<Vec<u8>, PriceCheckerError> {
        encode_config(self)
    }
}

/// Refuses every order while ledger time is before `valid_from`, then
/// defers to `inner`.
pub struct ValidFromDecorator {
    inner: Arc<dyn PriceChecker>,
}

impl ValidFromDecorator {
    pub fn new(inner: Arc<dyn PriceChecker>) -> Self {
        Self { inner }
    }
}

impl PriceChecker for ValidFromDecorator {
    fn check_price(
        &self,
        check: &PriceCheck<'_>,
        config: &[u8],
    ) -> Result<bool, PriceCheckerError> {
        let config: ValidFromConfig = decode_config(config)?;
        if check.now < config.valid_from {
            debug!(now = check.now, valid_from = config.valid_from, "Order not yet valid");
            return Ok(false);
        }
        self.inner.check_price(check, &config.inner_config)
    }
}

// ───────────────────────── Oracle ─────────────────────────

/// Quote table with a fixed decimal rate per directed pair.
///
/// Stands in for an on-ledger oracle in tests and offline simulation.
#[derive(Debug, Clone, Default)]
pub struct StaticQuote {
    rates: HashMap<(AssetId, AssetId), Decimal>,
}

impl StaticQuote {
    pub fn new() -> Self {
        Self::default()
    }

    /// `rate` units of `to` per unit of `from`.
    pub fn with_rate(mut self, from: AssetId, to: AssetId, rate: Decimal) -> Self {
        self.rates.insert((from, to), rate);
        self
    }
}

impl ExpectedOutCalculator for StaticQuote {
    fn expected_out(
        &self,
        amount_in: Amount,
        from: &AssetId,
        to: &AssetId,
        _data: &[u8],
    ) -> Result<Amount, PriceCheckerError> {
        let rate = self
            .rates
            .get(&(from.clone(), to.clone()))
            .ok_or_else(|| PriceCheckerError::QuoteUnavailable {
                from: from.to_string(),
                to: to.to_string(),
            })?;
        let amount = Decimal::from_u128(amount_in.as_u128()).ok_or(PriceCheckerError::Overflow)?;
        let out = amount
            .checked_mul(*rate)
            .ok_or(PriceCheckerError::Overflow)?
            .floor()
            .to_u128()
            .ok_or(PriceCheckerError::Overflow)?;
        Ok(Amount::new(out))
    }
}

// ───────────────────────── Registry ─────────────────────────

/// Price checkers reachable by identity.
#[derive(Clone, Default)]
pub struct PriceCheckerRegistry {
    checkers: HashMap<Address, Arc<dyn PriceChecker>>,
}

impl PriceCheckerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the checker reachable at `address`.
    pub fn register(&mut self, address: Address, checker: Arc<dyn PriceChecker>) {
        self.checkers.insert(address, checker);
    }

    pub fn get(&self, address: &Address) -> Option<&Arc<dyn PriceChecker>> {
        self.checkers.get(address)
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }
}

impl fmt::Debug for PriceCheckerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriceCheckerRegistry")
            .field(
                "checkers",
                &self.checkers.keys().map(|a| a.to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
