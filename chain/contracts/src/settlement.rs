//! Settlement collaborator model
//!
//! Executes candidate orders against escrows. Every order is first put to
//! the escrow's validation engine; only an accepted order moves funds:
//!
//! 1. The relayer pulls `sell_amount + fee_amount` from the escrow into the
//!    settlement contract using the allowance granted at initialization
//! 2. The solver pays `buy_amount` of the buy asset to the receiver
//! 3. The settlement forwards `sell_amount` to the solver and keeps the fee
//!
//! Each order uid settles at most once.

use escrow_types::ids::Address;
use escrow_types::numeric::Timestamp;
use escrow_types::order::CandidatePayload;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::digest::{order_digest, DomainSeparator};
use crate::errors::{RejectReason, SettlementError};
use crate::escrow::{EscrowAccount, ValidationContext, ValidationOutcome};
use crate::events::{ContractEvent, OrderSettled};
use crate::ledger::Ledger;
use crate::price_checker::PriceCheckerRegistry;
use crate::security::FilledOrders;

/// `digest || owner || valid_to`
pub const ORDER_UID_LEN: usize = 32 + 20 + 8;

/// Settlement contract holding the relayer identity and the fill registry.
#[derive(Debug)]
pub struct Settlement {
    address: Address,
    relayer: Address,
    domain: DomainSeparator,
    filled: FilledOrders,
    events: Vec<ContractEvent>,
}

impl Settlement {
    pub fn new(address: Address, relayer: Address, chain_id: u64) -> Self {
        Self {
            address,
            relayer,
            domain: DomainSeparator::new(chain_id, &address),
            filled: FilledOrders::new(),
            events: Vec::new(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn relayer(&self) -> &Address {
        &self.relayer
    }

    pub fn domain_separator(&self) -> &DomainSeparator {
        &self.domain
    }

    /// Unique id of an order placed by `owner`.
    pub fn order_uid(digest: &[u8; 32], owner: &Address, valid_to: Timestamp) -> Vec<u8> {
        let mut uid = Vec::with_capacity(ORDER_UID_LEN);
        uid.extend_from_slice(digest);
        uid.extend_from_slice(owner.as_bytes());
        uid.extend_from_slice(&valid_to.to_be_bytes());
        uid
    }

    pub fn is_filled(&self, uid: &[u8]) -> bool {
        self.filled.is_filled(uid)
    }

    pub fn filled_count(&self) -> usize {
        self.filled.count()
    }

    /// Settle the order encoded in `encoded` against `escrow`.
    ///
    /// Either every transfer happens or none does.
    #[allow(clippy::too_many_arguments)]
    pub fn settle(
        &mut self,
        ledger: &mut Ledger,
        escrow: &EscrowAccount,
        price_checkers: &PriceCheckerRegistry,
        config: &EngineConfig,
        encoded: &[u8],
        solver: Address,
    ) -> Result<OrderSettled, SettlementError> {
        let payload = CandidatePayload::decode(encoded)
            .map_err(|_| SettlementError::Unauthorized(RejectReason::MalformedPayload))?;
        let order = payload.order;
        let digest = order_digest(&self.domain, &order);

        let uid = Self::order_uid(&digest, escrow.address(), order.valid_to);
        if self.filled.is_filled(&uid) {
            warn!(escrow = %escrow.address(), "Replayed order refused");
            return Err(SettlementError::AlreadyFilled {
                uid: hex::encode(&uid),
            });
        }

        let ctx = ValidationContext::new(ledger, price_checkers, config);
        if let ValidationOutcome::Reject(reason) = escrow.validate(&ctx, &digest, encoded) {
            return Err(SettlementError::Unauthorized(reason));
        }

        let pulled = order
            .effective_sell_amount()
            .ok_or(SettlementError::Unauthorized(RejectReason::AmountOverflow))?;

        let (relayer, settlement) = (self.relayer, self.address);
        ledger.atomically(|ledger| -> Result<(), SettlementError> {
            ledger.transfer_from(
                relayer,
                *escrow.address(),
                settlement,
                &order.sell_asset,
                pulled,
            )?;
            ledger.transfer(solver, order.receiver, &order.buy_asset, order.buy_amount)?;
            ledger.transfer(settlement, solver, &order.sell_asset, order.sell_amount)?;
            Ok(())
        })?;

        self.filled.mark_filled(uid);

        let event = OrderSettled {
            escrow: *escrow.address(),
            order_digest: digest,
            receiver: order.receiver,
            sell_asset: order.sell_asset,
            buy_asset: order.buy_asset,
            sold: pulled,
            bought: order.buy_amount,
            settled_at: ledger.timestamp(),
        };

        info!(
            escrow = %event.escrow,
            receiver = %event.receiver,
            sold = %event.sold,
            bought = %event.bought,
            "Order settled"
        );

        self.events.push(ContractEvent::OrderSettled(event.clone()));
        Ok(event)
    }

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }
}
