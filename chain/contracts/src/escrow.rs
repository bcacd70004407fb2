//! Escrow Account: one swap's commitment and its validation engine
//!
//! Each account stores exactly one fingerprint, written once by the factory
//! right after the account was funded. Funds live on the ledger under the
//! account's address; the account never tracks them itself.
//!
//! `validate` is the entrypoint the settlement collaborator calls with an
//! order digest and an encoded `CandidatePayload`. It only borrows, so it
//! can be called any number of times without changing anything.

use escrow_types::ids::{Address, AssetId, Fingerprint};
use escrow_types::numeric::Amount;
use escrow_types::order::{BalanceSource, CandidatePayload, OrderKind, SwapParams};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::commitment::{fingerprint, SwapCommitment};
use crate::config::EngineConfig;
use crate::digest::{order_digest, DomainSeparator};
use crate::errors::{EscrowError, RejectReason};
use crate::events::SwapCancelled;
use crate::ledger::Ledger;
use crate::price_checker::{PriceCheck, PriceCheckerRegistry};

/// Marker returned to the settlement collaborator for an authorized order.
pub const ACCEPT_MAGIC: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

/// Marker returned for anything else.
pub const REJECT_MAGIC: [u8; 4] = [0xff, 0xff, 0xff, 0xff];

/// Verdict of `EscrowAccount::validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accept,
    Reject(RejectReason),
}

impl ValidationOutcome {
    pub fn magic(&self) -> [u8; 4] {
        match self {
            ValidationOutcome::Accept => ACCEPT_MAGIC,
            ValidationOutcome::Reject(_) => REJECT_MAGIC,
        }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, ValidationOutcome::Accept)
    }
}

impl From<Result<(), RejectReason>> for ValidationOutcome {
    fn from(result: Result<(), RejectReason>) -> Self {
        match result {
            Ok(()) => ValidationOutcome::Accept,
            Err(reason) => ValidationOutcome::Reject(reason),
        }
    }
}

/// Read-only view of everything validation consults.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub ledger: &'a Ledger,
    pub price_checkers: &'a PriceCheckerRegistry,
    pub config: &'a EngineConfig,
}

impl<'a> ValidationContext<'a> {
    pub fn new(
        ledger: &'a Ledger,
        price_checkers: &'a PriceCheckerRegistry,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            ledger,
            price_checkers,
            config,
        }
    }

    /// Domain separator orders must be digested under.
    pub fn domain(&self) -> DomainSeparator {
        DomainSeparator::new(self.config.chain_id, &self.config.settlement)
    }
}

/// Externally observable lifecycle of an escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowStatus {
    /// Created, fingerprint not yet written
    Uninitialized,
    /// Funded and awaiting settlement or cancellation
    Pending,
    /// Funds have left the escrow
    Resolved,
}

/// Per-request escrow record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowAccount {
    address: Address,
    stored_fingerprint: Fingerprint,
    initialized: bool,
}

impl EscrowAccount {
    /// A fresh, uninitialized account at `address`.
    pub(crate) fn new(address: Address) -> Self {
        Self {
            address,
            stored_fingerprint: Fingerprint::ZERO,
            initialized: false,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.stored_fingerprint
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Lifecycle state, read from the escrow's `sell_asset` balance.
    pub fn status(&self, ledger: &Ledger, sell_asset: &AssetId) -> EscrowStatus {
        if !self.initialized {
            EscrowStatus::Uninitialized
        } else if ledger.balance_of(&self.address, sell_asset).is_zero() {
            EscrowStatus::Resolved
        } else {
            EscrowStatus::Pending
        }
    }

    /// One-time initialization.
    ///
    /// Grants `relayer` an unlimited allowance over the escrow's `sell_asset`
    /// and stores the fingerprint. A second call fails whatever its arguments.
    pub fn initialize(
        &mut self,
        ledger: &mut Ledger,
        relayer: &Address,
        sell_asset: &AssetId,
        fingerprint: Fingerprint,
    ) -> Result<(), EscrowError> {
        if self.initialized {
            warn!(escrow = %self.address, "Rejected re-initialization attempt");
            return Err(EscrowError::AlreadyInitialized);
        }

        ledger.approve(self.address, *relayer, sell_asset, Amount::MAX);
        self.stored_fingerprint = fingerprint;
        self.initialized = true;

        debug!(escrow = %self.address, %fingerprint, "Escrow initialized");
        Ok(())
    }

    /// Decide whether `encoded` is an order this escrow authorizes.
    pub fn validate(
        &self,
        ctx: &ValidationContext<'_>,
        order_digest: &[u8; 32],
        encoded: &[u8],
    ) -> ValidationOutcome {
        let outcome = ValidationOutcome::from(self.check(ctx, order_digest, encoded));
        match outcome {
            ValidationOutcome::Accept => {
                debug!(escrow = %self.address, "Candidate order accepted");
            }
            ValidationOutcome::Reject(reason) => {
                warn!(escrow = %self.address, %reason, "Candidate order rejected");
            }
        }
        outcome
    }

    /// The validation sequence. Stops at the first failed check.
    pub fn check(
        &self,
        ctx: &ValidationContext<'_>,
        expected_digest: &[u8; 32],
        encoded: &[u8],
    ) -> Result<(), RejectReason> {
        if !self.initialized {
            return Err(RejectReason::NotInitialized);
        }

        let payload =
            CandidatePayload::decode(encoded).map_err(|_| RejectReason::MalformedPayload)?;
        let order = &payload.order;

        if order_digest(&ctx.domain(), order) != *expected_digest {
            return Err(RejectReason::DigestMismatch);
        }

        if order.kind != OrderKind::Sell {
            return Err(RejectReason::NotSellOrder);
        }

        let earliest_expiry = ctx
            .ledger
            .timestamp()
            .saturating_add(ctx.config.min_expiry_horizon_secs);
        if order.valid_to < earliest_expiry {
            return Err(RejectReason::ExpiresTooSoon);
        }

        if order.partially_fillable {
            return Err(RejectReason::PartiallyFillable);
        }

        if order.sell_balance != BalanceSource::Plain || order.buy_balance != BalanceSource::Plain
        {
            return Err(RejectReason::NonPlainBalance);
        }

        let effective_sell_amount = order
            .effective_sell_amount()
            .ok_or(RejectReason::AmountOverflow)?;

        if let Some(checker_id) = payload.price_checker.filter(|id| !id.is_zero()) {
            let checker = ctx
                .price_checkers
                .get(&checker_id)
                .ok_or(RejectReason::PriceCheckerUnavailable)?;
            let check = PriceCheck {
                amount_in: effective_sell_amount,
                from: &order.sell_asset,
                to: &order.buy_asset,
                fee: order.fee_amount,
                min_out: order.buy_amount,
                now: ctx.ledger.timestamp(),
            };
            let verdict = checker.check_price(&check, &payload.price_checker_config);
            match verdict {
                Ok(true) => {}
                Ok(false) => return Err(RejectReason::PriceCheckFailed),
                Err(err) => {
                    debug!(
                        escrow = %self.address,
                        checker = %checker_id,
                        error = %err,
                        "Price checker errored"
                    );
                    return Err(RejectReason::PriceCheckerFailed);
                }
            }
        }

        let recomputed = SwapCommitment {
            owner: &payload.owner,
            receiver: &order.receiver,
            sell_asset: &order.sell_asset,
            buy_asset: &order.buy_asset,
            sell_amount: effective_sell_amount,
            price_checker: payload.price_checker.as_ref(),
            price_checker_config: &payload.price_checker_config,
        }
        .fingerprint();
        if recomputed != self.stored_fingerprint {
            return Err(RejectReason::FingerprintMismatch);
        }

        Ok(())
    }

    /// Return the escrowed funds to `caller`.
    ///
    /// Knowing the exact request parameters is the ownership credential:
    /// they must reproduce the stored fingerprint with `caller` as owner.
    pub fn cancel(
        &self,
        ledger: &mut Ledger,
        caller: Address,
        params: &SwapParams,
    ) -> Result<SwapCancelled, EscrowError> {
        if !self.initialized {
            return Err(EscrowError::NotInitialized);
        }
        if fingerprint(&caller, params) != self.stored_fingerprint {
            warn!(escrow = %self.address, %caller, "Cancellation by non-owner rejected");
            return Err(EscrowError::NotOwner);
        }

        ledger.transfer(self.address, caller, &params.sell_asset, params.sell_amount)?;

        info!(
            escrow = %self.address,
            owner = %caller,
            asset = %params.sell_asset,
            amount = %params.sell_amount,
            "Swap cancelled"
        );

        Ok(SwapCancelled {
            escrow: self.address,
            owner: caller,
            sell_asset: params.sell_asset.clone(),
            amount: params.sell_amount,
            cancelled_at: ledger.timestamp(),
        })
    }
}
