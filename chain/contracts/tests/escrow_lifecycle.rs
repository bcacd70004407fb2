//! Escrow Lifecycle Tests
//!
//! End-to-end scenarios across factory, escrow and settlement:
//! - Request, validate, settle
//! - Expiry horizon (default and configured)
//! - Cancellation racing settlement
//! - Price checker verdicts
//! - Replay
//! - Cross-escrow isolation
//! - Fuzz testing (proptest)

use std::sync::Arc;

use escrow_contracts::config::EngineConfig;
use escrow_contracts::errors::{
    EscrowError, FactoryError, LedgerError, RejectReason, SettlementError,
};
use escrow_contracts::escrow::{
    EscrowStatus, ValidationContext, ValidationOutcome, ACCEPT_MAGIC, REJECT_MAGIC,
};
use escrow_contracts::events::ContractEvent;
use escrow_contracts::factory::EscrowFactory;
use escrow_contracts::ledger::Ledger;
use escrow_contracts::price_checker::{
    DynamicSlippageChecker, DynamicSlippageConfig, FixedMinOutChecker, FixedMinOutConfig,
    FixedSlippageChecker, PriceCheckerRegistry, StaticQuote, ValidFromConfig, ValidFromDecorator,
};
use escrow_contracts::settlement::Settlement;
use escrow_contracts::CONTRACT_ABI_VERSION;
use escrow_types::ids::{Address, AssetId};
use escrow_types::numeric::Amount;
use escrow_types::order::{CandidateOrder, CandidatePayload, SwapParams};
use rust_decimal::Decimal;

const NOW: i64 = 1_700_000_000;

// ═══════════════════════════════════════════════════════════════════
// End-to-end
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_request_validate_settle() {
    let mut m = Market::new();
    let request = m.request(owner(), params());

    let bytes = m.encode(owner(), sell_order(NOW + 600), &params());
    let outcome = m.validate(&request, &sell_order(NOW + 600), &bytes);
    assert_eq!(outcome, ValidationOutcome::Accept);
    assert_eq!(outcome.magic(), ACCEPT_MAGIC);

    let settled = m.settle(&request, &bytes).unwrap();
    assert_eq!(settled.sold, Amount::new(1_000));
    assert_eq!(m.ledger.balance_of(&request, &token_a()), Amount::ZERO);
    assert_eq!(m.ledger.balance_of(&receiver(), &token_b()), Amount::new(2_000));

    let escrow = m.factory.escrow(&request).unwrap();
    assert_eq!(escrow.status(&m.ledger, &token_a()), EscrowStatus::Resolved);
}

#[test]
fn test_short_expiry_rejected() {
    let mut m = Market::new();
    let request = m.request(owner(), params());

    let order = sell_order(NOW + 120);
    let bytes = m.encode(owner(), order.clone(), &params());
    let outcome = m.validate(&request, &order, &bytes);
    assert_eq!(outcome, ValidationOutcome::Reject(RejectReason::ExpiresTooSoon));
    assert_eq!(outcome.magic(), REJECT_MAGIC);
}

#[test]
fn test_configured_horizon_honored() {
    let config = Market::default_config().with_min_expiry_horizon(60);
    let mut m = Market::with_config(config);
    let request = m.request(owner(), params());

    let order = sell_order(NOW + 120);
    let bytes = m.encode(owner(), order.clone(), &params());
    assert!(m.validate(&request, &order, &bytes).is_accept());
}

#[test]
fn test_expiry_measured_against_ledger_time() {
    let mut m = Market::new();
    let request = m.request(owner(), params());

    let order = sell_order(NOW + 600);
    let bytes = m.encode(owner(), order.clone(), &params());
    assert!(m.validate(&request, &order, &bytes).is_accept());

    m.ledger.advance(301);
    assert_eq!(
        m.validate(&request, &order, &bytes),
        ValidationOutcome::Reject(RejectReason::ExpiresTooSoon)
    );
}

// ═══════════════════════════════════════════════════════════════════
// Cancellation
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_cancel_then_settlement_fails_at_transfer() {
    let mut m = Market::new();
    let request = m.request(owner(), params());

    m.factory
        .cancel(&mut m.ledger, &request, owner(), &params())
        .unwrap();
    assert_eq!(m.ledger.balance_of(&owner(), &token_a()), Amount::new(10_000));

    let bytes = m.encode(owner(), sell_order(NOW + 600), &params());
    let result = m.settle(&request, &bytes);
    assert!(matches!(
        result,
        Err(SettlementError::Ledger(LedgerError::InsufficientBalance { .. }))
    ));
}

#[test]
fn test_settle_then_cancel_fails_at_transfer() {
    let mut m = Market::new();
    let request = m.request(owner(), params());
    let bytes = m.encode(owner(), sell_order(NOW + 600), &params());
    m.settle(&request, &bytes).unwrap();

    let result = m.factory.cancel(&mut m.ledger, &request, owner(), &params());
    assert!(matches!(
        result,
        Err(FactoryError::Escrow(EscrowError::Ledger(
            LedgerError::InsufficientBalance { .. }
        )))
    ));
}

#[test]
fn test_only_owner_with_exact_params_cancels() {
    let mut m = Market::new();
    let request = m.request(owner(), params());

    let mut tweaked = params();
    tweaked.sell_amount = Amount::new(999);
    assert_eq!(
        m.factory.cancel(&mut m.ledger, &request, owner(), &tweaked),
        Err(FactoryError::Escrow(EscrowError::NotOwner))
    );
    assert_eq!(
        m.factory.cancel(&mut m.ledger, &request, receiver(), &params()),
        Err(FactoryError::Escrow(EscrowError::NotOwner))
    );
    assert_eq!(m.ledger.balance_of(&request, &token_a()), Amount::new(1_000));
}

// ═══════════════════════════════════════════════════════════════════
// Price checkers
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_slippage_checker_enforces_quote() {
    let checker_id = Address::repeat_byte(0xc1);
    let mut m = Market::new();
    // 1 A = 2 B, at most 10% below quote
    let quote = StaticQuote::new().with_rate(token_a(), token_b(), Decimal::from(2));
    m.registry.register(
        checker_id,
        Arc::new(FixedSlippageChecker::new(1_000, Arc::new(quote)).unwrap()),
    );

    let swap = params().with_price_checker(checker_id, Vec::new());
    let request = m.request(owner(), swap.clone());

    let mut at_80 = sell_order(NOW + 600);
    at_80.buy_amount = Amount::new(1_600);
    let bytes = m.encode(owner(), at_80.clone(), &swap);
    assert_eq!(
        m.validate(&request, &at_80, &bytes),
        ValidationOutcome::Reject(RejectReason::PriceCheckFailed)
    );

    let mut at_90 = sell_order(NOW + 600);
    at_90.buy_amount = Amount::new(1_800);
    let bytes = m.encode(owner(), at_90.clone(), &swap);
    assert!(m.validate(&request, &at_90, &bytes).is_accept());
}

#[test]
fn test_dynamic_slippage_per_request_tolerance() {
    let checker_id = Address::repeat_byte(0xc2);
    let mut m = Market::new();
    let quote = StaticQuote::new().with_rate(token_a(), token_b(), Decimal::from(2));
    m.registry.register(
        checker_id,
        Arc::new(DynamicSlippageChecker::new(Arc::new(quote))),
    );

    let tolerance = |bps: u32| {
        DynamicSlippageConfig {
            allowed_slippage_bps: bps,
            calculator_data: Vec::new(),
        }
        .encode()
        .unwrap()
    };
    // Quote 2000: floor 1900 at 5%, 2000 at 0%
    let loose = params().with_price_checker(checker_id, tolerance(500));
    let strict = params().with_price_checker(checker_id, tolerance(0));
    let loose_escrow = m.request(owner(), loose.clone());
    let strict_escrow = m.request(owner(), strict.clone());

    let mut order = sell_order(NOW + 600);
    order.buy_amount = Amount::new(1_899);
    let bytes = m.encode(owner(), order.clone(), &loose);
    assert_eq!(
        m.settle(&loose_escrow, &bytes),
        Err(SettlementError::Unauthorized(RejectReason::PriceCheckFailed))
    );
    assert_eq!(m.ledger.balance_of(&loose_escrow, &token_a()), Amount::new(1_000));

    order.buy_amount = Amount::new(1_900);
    let bytes = m.encode(owner(), order.clone(), &strict);
    assert_eq!(
        m.validate(&strict_escrow, &order, &bytes),
        ValidationOutcome::Reject(RejectReason::PriceCheckFailed)
    );

    let bytes = m.encode(owner(), order.clone(), &loose);
    assert!(m.validate(&loose_escrow, &order, &bytes).is_accept());
    let settled = m.settle(&loose_escrow, &bytes).unwrap();
    assert_eq!(settled.bought, Amount::new(1_900));
    assert_eq!(m.ledger.balance_of(&receiver(), &token_b()), Amount::new(1_900));
    assert_eq!(m.ledger.balance_of(&strict_escrow, &token_a()), Amount::new(1_000));
}

#[test]
fn test_valid_from_gates_on_ledger_time() {
    let checker_id = Address::repeat_byte(0xc3);
    let mut m = Market::new();
    m.registry.register(
        checker_id,
        Arc::new(ValidFromDecorator::new(Arc::new(FixedMinOutChecker))),
    );

    let opens_at = NOW + 86_400;
    let config = ValidFromConfig {
        valid_from: opens_at,
        inner_config: FixedMinOutConfig { min_out: Amount::new(1_500) }.encode().unwrap(),
    }
    .encode()
    .unwrap();
    let swap = params().with_price_checker(checker_id, config);
    let request = m.request(owner(), swap.clone());

    let early = sell_order(NOW + 600);
    let bytes = m.encode(owner(), early.clone(), &swap);
    assert_eq!(
        m.validate(&request, &early, &bytes),
        ValidationOutcome::Reject(RejectReason::PriceCheckFailed)
    );
    assert_eq!(
        m.settle(&request, &bytes),
        Err(SettlementError::Unauthorized(RejectReason::PriceCheckFailed))
    );

    m.ledger.set_timestamp(opens_at);
    let mut late = sell_order(opens_at + 600);
    late.buy_amount = Amount::new(1_499);
    let bytes = m.encode(owner(), late.clone(), &swap);
    assert_eq!(
        m.validate(&request, &late, &bytes),
        ValidationOutcome::Reject(RejectReason::PriceCheckFailed)
    );

    late.buy_amount = Amount::new(1_500);
    let bytes = m.encode(owner(), late.clone(), &swap);
    assert!(m.validate(&request, &late, &bytes).is_accept());
    m.settle(&request, &bytes).unwrap();
    assert_eq!(m.ledger.balance_of(&request, &token_a()), Amount::ZERO);
    assert_eq!(m.ledger.balance_of(&receiver(), &token_b()), Amount::new(1_500));
}

#[test]
fn test_unregistered_checker_blocks_settlement() {
    let checker_id = Address::repeat_byte(0xc9);
    let mut m = Market::new();
    let swap = params().with_price_checker(checker_id, Vec::new());
    let request = m.request(owner(), swap.clone());

    let bytes = m.encode(owner(), sell_order(NOW + 600), &swap);
    assert_eq!(
        m.settle(&request, &bytes),
        Err(SettlementError::Unauthorized(RejectReason::PriceCheckerUnavailable))
    );
    assert_eq!(m.ledger.balance_of(&request, &token_a()), Amount::new(1_000));
}

// ═══════════════════════════════════════════════════════════════════
// Replay & isolation
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_replay_refused() {
    let mut m = Market::new();
    let request = m.request(owner(), params());
    let bytes = m.encode(owner(), sell_order(NOW + 600), &params());
    m.settle(&request, &bytes).unwrap();
    assert!(matches!(
        m.settle(&request, &bytes),
        Err(SettlementError::AlreadyFilled { .. })
    ));
}

#[test]
fn test_order_for_one_escrow_rejected_by_another() {
    let mut m = Market::new();
    let first = m.request(owner(), params());
    m.ledger.mint(stranger(), &token_a(), Amount::new(1_000)).unwrap();
    let second = m.request(stranger(), params());

    // Same terms, but the order claims the first owner
    let bytes = m.encode(owner(), sell_order(NOW + 600), &params());
    assert!(m.validate(&first, &sell_order(NOW + 600), &bytes).is_accept());
    assert_eq!(
        m.validate(&second, &sell_order(NOW + 600), &bytes),
        ValidationOutcome::Reject(RejectReason::FingerprintMismatch)
    );
}

#[test]
fn test_validate_leaves_state_untouched() {
    let mut m = Market::new();
    let request = m.request(owner(), params());
    let ledger_before = m.ledger.clone();
    let escrow_before = m.factory.escrow(&request).cloned();
    let events_before = m.factory.events().len();

    let good = m.encode(owner(), sell_order(NOW + 600), &params());
    let bad = m.encode(owner(), sell_order(NOW + 1), &params());
    for _ in 0..5 {
        m.validate(&request, &sell_order(NOW + 600), &good);
        m.validate(&request, &sell_order(NOW + 1), &bad);
    }

    assert_eq!(m.ledger, ledger_before);
    assert_eq!(m.factory.escrow(&request).cloned(), escrow_before);
    assert_eq!(m.factory.events().len(), events_before);
}

// ═══════════════════════════════════════════════════════════════════
// Announcements
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_announcements_exported_as_json() {
    let mut m = Market::new();
    let request = m.request(owner(), params());
    let events = m.factory.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].escrow(), &request);

    let json = events[0].to_json().unwrap();
    let parsed: ContractEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, events[0]);
}

#[test]
fn test_contract_abi_version_frozen() {
    assert_eq!(CONTRACT_ABI_VERSION, "1.0.0");
}

// ═══════════════════════════════════════════════════════════════════
// Fuzz Tests (Proptest)
// ═══════════════════════════════════════════════════════════════════

mod fuzz {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any funded request accepts its own order and nothing with a different amount.
        #[test]
        fn fuzz_request_accepts_only_committed_amount(
            amount in 1u128..=10_000u128,
            delta in 1u128..1_000u128,
        ) {
            let mut m = Market::new();
            let mut swap = params();
            swap.sell_amount = Amount::new(amount);
            let request = m.request(owner(), swap.clone());

            let mut order = sell_order(NOW + 600);
            order.sell_amount = Amount::new(amount);
            let bytes = m.encode(owner(), order.clone(), &swap);
            prop_assert!(m.validate(&request, &order, &bytes).is_accept());

            order.sell_amount = Amount::new(amount + delta);
            let bytes = m.encode(owner(), order.clone(), &swap);
            prop_assert_eq!(
                m.validate(&request, &order, &bytes),
                ValidationOutcome::Reject(RejectReason::FingerprintMismatch)
            );
        }

        /// Escrow balances always sum to what was requested minus what was cancelled.
        #[test]
        fn fuzz_escrow_balance_conservation(
            amounts in prop::collection::vec(1u128..=1_000u128, 1..10),
            cancel_mask in prop::collection::vec(any::<bool>(), 10),
        ) {
            let mut m = Market::new();
            let mut held = 0u128;
            for (amount, cancel) in amounts.iter().zip(cancel_mask) {
                let mut swap = params();
                swap.sell_amount = Amount::new(*amount);
                let request = m.request(owner(), swap.clone());
                if cancel {
                    m.factory.cancel(&mut m.ledger, &request, owner(), &swap).unwrap();
                } else {
                    held += amount;
                }
            }

            let total: u128 = m
                .factory
                .escrows()
                .map(|e| m.ledger.balance_of(e.address(), &token_a()).as_u128())
                .sum();
            prop_assert_eq!(total, held);
            prop_assert_eq!(
                m.ledger.balance_of(&owner(), &token_a()).as_u128(),
                10_000 - held
            );
        }

        /// Arbitrary bytes never authorize anything.
        #[test]
        fn fuzz_garbage_payload_rejected(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            let mut m = Market::new();
            let request = m.request(owner(), params());
            let outcome = m.validate(&request, &sell_order(NOW + 600), &bytes);
            prop_assert_eq!(outcome.magic(), REJECT_MAGIC);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════

fn owner() -> Address {
    Address::repeat_byte(0x01)
}

fn receiver() -> Address {
    Address::repeat_byte(0x02)
}

fn stranger() -> Address {
    Address::repeat_byte(0x66)
}

fn solver() -> Address {
    Address::repeat_byte(0x50)
}

fn token_a() -> AssetId {
    AssetId::new("TKA")
}

fn token_b() -> AssetId {
    AssetId::new("TKB")
}

fn params() -> SwapParams {
    SwapParams::new(Amount::new(1_000), token_a(), token_b(), receiver())
}

fn sell_order(valid_to: i64) -> CandidateOrder {
    CandidateOrder::sell(
        token_a(),
        token_b(),
        receiver(),
        Amount::new(1_000),
        Amount::new(2_000),
        valid_to,
    )
}

struct Market {
    ledger: Ledger,
    factory: EscrowFactory,
    settlement: Settlement,
    registry: PriceCheckerRegistry,
}

impl Market {
    fn default_config() -> EngineConfig {
        EngineConfig::new(Address::repeat_byte(0x0a), Address::repeat_byte(0x5e), 1)
    }

    fn new() -> Self {
        Self::with_config(Self::default_config())
    }

    fn with_config(config: EngineConfig) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let settlement = Settlement::new(config.settlement, config.relayer, config.chain_id);
        let mut ledger = Ledger::new(config.chain_id, NOW);
        ledger.mint(owner(), &token_a(), Amount::new(10_000)).unwrap();
        ledger.mint(solver(), &token_b(), Amount::new(100_000)).unwrap();
        Self {
            ledger,
            factory: EscrowFactory::new(Address::repeat_byte(0xfa), config).unwrap(),
            settlement,
            registry: PriceCheckerRegistry::new(),
        }
    }

    fn request(&mut self, caller: Address, swap: SwapParams) -> Address {
        self.factory
            .request_swap(&mut self.ledger, caller, swap)
            .unwrap()
            .escrow
    }

    fn encode(&self, owner: Address, order: CandidateOrder, swap: &SwapParams) -> Vec<u8> {
        CandidatePayload::for_request(order, owner, swap)
            .encode()
            .unwrap()
    }

    fn validate(
        &self,
        escrow: &Address,
        order: &CandidateOrder,
        bytes: &[u8],
    ) -> ValidationOutcome {
        let ctx = ValidationContext::new(&self.ledger, &self.registry, self.factory.config());
        let digest = escrow_contracts::digest::order_digest(&ctx.domain(), order);
        self.factory
            .escrow(escrow)
            .unwrap()
            .validate(&ctx, &digest, bytes)
    }

    fn settle(
        &mut self,
        escrow: &Address,
        bytes: &[u8],
    ) -> Result<escrow_contracts::events::OrderSettled, SettlementError> {
        let account = self.factory.escrow(escrow).unwrap();
        self.settlement.settle(
            &mut self.ledger,
            account,
            &self.registry,
            self.factory.config(),
            bytes,
            solver(),
        )
    }
}
