//! Escrow Account Factory
//!
//! Creates one isolated escrow per swap request, funds it from the caller
//! and writes its fingerprint. Escrows live in an address-keyed table owned
//! by the factory; validation logic is shared code on `EscrowAccount`.
//!
//! Security properties:
//! 1. Reentrancy guard over the whole request flow
//! 2. Funds move into the escrow before its fingerprint is set
//! 3. Ledger edits run in one atomic scope and are undone if any step fails

use std::collections::HashMap;

use escrow_types::ids::{Address, RequestId};
use escrow_types::order::{SwapParams, MAX_PRICE_CHECKER_CONFIG_BYTES};
use tracing::{info, warn};

use crate::commitment::{fingerprint, CanonicalEncoder};
use crate::config::EngineConfig;
use crate::errors::{ConfigError, FactoryError};
use crate::escrow::EscrowAccount;
use crate::events::{ContractEvent, SwapCancelled, SwapRequested};
use crate::ledger::Ledger;
use crate::security::ReentrancyGuard;

const CLONE_TAG: &[u8] = b"swap-escrow/clone/v1";

/// Factory owning every escrow it created.
#[derive(Debug)]
pub struct EscrowFactory {
    address: Address,
    config: EngineConfig,
    escrows: HashMap<Address, EscrowAccount>,
    next_nonce: u64,
    /// Append-only announcement log
    events: Vec<ContractEvent>,
    reentrancy_guard: ReentrancyGuard,
}

impl EscrowFactory {
    /// Fails if `config` does not pass `EngineConfig::validate`.
    pub fn new(address: Address, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            address,
            config,
            escrows: HashMap::new(),
            next_nonce: 0,
            events: Vec::new(),
            reentrancy_guard: ReentrancyGuard::new(),
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Nonce the next request will use.
    pub fn next_nonce(&self) -> u64 {
        self.next_nonce
    }

    /// Address the escrow created with `nonce` gets.
    pub fn predict_escrow_address(&self, nonce: u64) -> Address {
        let hash = CanonicalEncoder::new(CLONE_TAG)
            .address(&self.address)
            .u64(nonce)
            .hash();
        Address::from_hash(&hash)
    }

    // ───────────────────────── Requests ─────────────────────────

    /// Escrow `params.sell_amount` of the caller's `params.sell_asset`.
    ///
    /// Emits `SwapRequested`, the only way off-ledger collaborators learn
    /// about the new escrow.
    pub fn request_swap(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        params: SwapParams,
    ) -> Result<SwapRequested, FactoryError> {
        self.check_reentrancy()?;
        let result = self.create_escrow(ledger, caller, params);
        self.reentrancy_guard.release();

        if let Err(err) = &result {
            warn!(%caller, error = %err, "Swap request failed");
        }
        result
    }

    fn create_escrow(
        &mut self,
        ledger: &mut Ledger,
        caller: Address,
        params: SwapParams,
    ) -> Result<SwapRequested, FactoryError> {
        if params.sell_amount.is_zero() {
            return Err(FactoryError::InvalidAmount);
        }
        if params.price_checker_config.len() > MAX_PRICE_CHECKER_CONFIG_BYTES {
            return Err(FactoryError::ConfigTooLarge {
                len: params.price_checker_config.len(),
                max: MAX_PRICE_CHECKER_CONFIG_BYTES,
            });
        }

        let nonce = self.next_nonce;
        let following = nonce.checked_add(1).ok_or(FactoryError::AddressExhausted)?;
        let escrow_address = self.predict_escrow_address(nonce);
        if self.escrows.contains_key(&escrow_address) {
            return Err(FactoryError::AddressExhausted);
        }

        let fingerprint = fingerprint(&caller, &params);
        let mut escrow = EscrowAccount::new(escrow_address);
        let relayer = self.config.relayer;
        ledger.atomically(|ledger| -> Result<(), FactoryError> {
            ledger.transfer(caller, escrow_address, &params.sell_asset, params.sell_amount)?;
            escrow.initialize(ledger, &relayer, &params.sell_asset, fingerprint)?;
            Ok(())
        })?;

        self.escrows.insert(escrow_address, escrow);
        self.next_nonce = following;

        let event = SwapRequested {
            request_id: RequestId::new(),
            escrow: escrow_address,
            owner: caller,
            receiver: params.receiver,
            sell_asset: params.sell_asset,
            buy_asset: params.buy_asset,
            sell_amount: params.sell_amount,
            price_checker: params.price_checker,
            price_checker_config: params.price_checker_config,
            fingerprint,
            requested_at: ledger.timestamp(),
        };

        info!(
            request_id = %event.request_id,
            escrow = %event.escrow,
            owner = %event.owner,
            sell_asset = %event.sell_asset,
            buy_asset = %event.buy_asset,
            amount = %event.sell_amount,
            "Swap requested"
        );

        self.events.push(ContractEvent::SwapRequested(event.clone()));
        Ok(event)
    }

    /// Cancel through the factory so the announcement lands in its log.
    pub fn cancel(
        &mut self,
        ledger: &mut Ledger,
        escrow: &Address,
        caller: Address,
        params: &SwapParams,
    ) -> Result<SwapCancelled, FactoryError> {
        let account = self.escrows.get(escrow).ok_or_else(|| FactoryError::UnknownEscrow {
            address: escrow.to_string(),
        })?;
        let event = account.cancel(ledger, caller, params)?;
        self.events.push(ContractEvent::SwapCancelled(event.clone()));
        Ok(event)
    }

    // ───────────────────────── Lookup ─────────────────────────

    pub fn escrow(&self, address: &Address) -> Option<&EscrowAccount> {
        self.escrows.get(address)
    }

    pub fn escrow_mut(&mut self, address: &Address) -> Option<&mut EscrowAccount> {
        self.escrows.get_mut(address)
    }

    pub fn escrows(&self) -> impl Iterator<Item = &EscrowAccount> {
        self.escrows.values()
    }

    pub fn escrow_count(&self) -> usize {
        self.escrows.len()
    }

    // ───────────────────────── Events ─────────────────────────

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    /// Hand the log to an off-ledger consumer and clear it.
    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }

    fn check_reentrancy(&mut self) -> Result<(), FactoryError> {
        if !self.reentrancy_guard.acquire() {
            return Err(FactoryError::Reentrancy);
        }
        Ok(())
    }
}
