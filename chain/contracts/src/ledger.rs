//! Ledger: token balances, allowances and ambient time
//!
//! In-memory model of the ledger collaborator the engine runs on:
//! - Balance tracking by (holder, asset)
//! - Allowances by (owner, spender, asset); `Amount::MAX` never decreases
//! - All-or-nothing `transfer`, `transfer_from`, `approve`
//! - Ledger timestamp and chain id
//!
//! Multi-step operations run inside `Ledger::atomically`, which journals the
//! previous value of every balance and allowance it touches and restores
//! them if any step fails.

use std::collections::HashMap;

use chrono::Utc;
use escrow_types::ids::{Address, AssetId};
use escrow_types::numeric::{Amount, Timestamp};
use tracing::debug;

use crate::errors::LedgerError;

/// Token ledger plus block context.
///
/// Balances are stored as `HashMap<Address, HashMap<AssetId, Amount>>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    /// Balances: holder -> (asset -> amount)
    balances: HashMap<Address, HashMap<AssetId, Amount>>,
    /// Allowances: (owner, spender, asset) -> amount
    allowances: HashMap<(Address, Address, AssetId), Amount>,
    /// Current ledger time (unix seconds)
    timestamp: Timestamp,
    chain_id: u64,
    /// Undo records of the open `atomically` scopes
    journal: Vec<JournalEntry>,
    depth: usize,
}

/// Value a key held before an edit inside an atomic scope.
#[derive(Debug, Clone, PartialEq)]
enum JournalEntry {
    Balance {
        holder: Address,
        asset: AssetId,
        previous: Option<Amount>,
    },
    Allowance {
        key: (Address, Address, AssetId),
        previous: Option<Amount>,
    },
}

impl Ledger {
    pub fn new(chain_id: u64, timestamp: Timestamp) -> Self {
        Self {
            balances: HashMap::new(),
            allowances: HashMap::new(),
            timestamp,
            chain_id,
            journal: Vec::new(),
            depth: 0,
        }
    }

    /// Ledger whose clock starts at the current wall-clock time.
    pub fn at_wall_clock(chain_id: u64) -> Self {
        Self::new(chain_id, Utc::now().timestamp())
    }

    // ───────────────────────── Block Context ─────────────────────────

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Move the clock forward by `secs`.
    pub fn advance(&mut self, secs: i64) {
        self.timestamp = self.timestamp.saturating_add(secs);
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    // ───────────────────────── Balance Queries ─────────────────────────

    /// Get balance for a specific holder and asset.
    pub fn balance_of(&self, holder: &Address, asset: &AssetId) -> Amount {
        self.balances
            .get(holder)
            .and_then(|assets| assets.get(asset))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address, asset: &AssetId) -> Amount {
        self.allowances
            .get(&(*owner, *spender, asset.clone()))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    // ───────────────────────── Mutations ─────────────────────────

    /// Credit new tokens to a holder (faucet for funding accounts).
    pub fn mint(
        &mut self,
        to: Address,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount);
        }
        let current = self.balance_of(&to, asset);
        let updated = current.checked_add(amount).ok_or(LedgerError::Overflow)?;
        self.set_balance(to, asset, updated);
        Ok(())
    }

    /// Set `spender`'s allowance over `owner`'s `asset` to exactly `amount`.
    pub fn approve(&mut self, owner: Address, spender: Address, asset: &AssetId, amount: Amount) {
        debug!(%owner, %spender, %asset, %amount, "Allowance set");
        self.set_allowance((owner, spender, asset.clone()), amount);
    }

    /// Move `amount` of `asset` from `from` to `to`.
    ///
    /// Checks both sides before touching state, so a failure changes nothing.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let available = self.balance_of(&from, asset);
        let debited = available
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientBalance {
                asset: asset.to_string(),
                required: amount.to_string(),
                available: available.to_string(),
            })?;

        if from == to {
            return Ok(());
        }

        let credited = self
            .balance_of(&to, asset)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.set_balance(from, asset, debited);
        self.set_balance(to, asset, credited);

        debug!(%from, %to, %asset, %amount, "Transfer");
        Ok(())
    }

    /// Move `owner`'s tokens on their behalf, consuming `spender`'s allowance.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        owner: Address,
        to: Address,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let approved = self.allowance(&owner, &spender, asset);
        let remaining = approved
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientAllowance {
                asset: asset.to_string(),
                required: amount.to_string(),
                approved: approved.to_string(),
            })?;

        self.transfer(owner, to, asset, amount)?;

        if approved != Amount::MAX {
            self.set_allowance((owner, spender, asset.clone()), remaining);
        }
        Ok(())
    }

    // ───────────────────────── Atomic Scopes ─────────────────────────

    /// Run `op` as one unit.
    ///
    /// If `op` fails, every balance and allowance it changed is put back.
    /// Cost is proportional to the number of edits, not to the ledger size.
    /// Scopes nest; an inner failure only undoes the inner scope's edits.
    pub fn atomically<T, E>(
        &mut self,
        op: impl FnOnce(&mut Ledger) -> Result<T, E>,
    ) -> Result<T, E> {
        let mark = self.journal.len();
        self.depth += 1;
        let result = op(self);
        self.depth -= 1;

        if result.is_err() {
            self.rollback_to(mark);
        }
        if self.depth == 0 {
            self.journal.clear();
        }
        result
    }

    fn rollback_to(&mut self, mark: usize) {
        while self.journal.len() > mark {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            match entry {
                JournalEntry::Balance {
                    holder,
                    asset,
                    previous,
                } => match previous {
                    Some(amount) => {
                        self.balances.entry(holder).or_default().insert(asset, amount);
                    }
                    None => {
                        if let Some(assets) = self.balances.get_mut(&holder) {
                            assets.remove(&asset);
                            if assets.is_empty() {
                                self.balances.remove(&holder);
                            }
                        }
                    }
                },
                JournalEntry::Allowance { key, previous } => match previous {
                    Some(amount) => {
                        self.allowances.insert(key, amount);
                    }
                    None => {
                        self.allowances.remove(&key);
                    }
                },
            }
        }
        debug!(depth = self.depth, "Ledger edits rolled back");
    }

    fn set_balance(&mut self, holder: Address, asset: &AssetId, amount: Amount) {
        let previous = self
            .balances
            .entry(holder)
            .or_default()
            .insert(asset.clone(), amount);
        if self.depth > 0 {
            self.journal.push(JournalEntry::Balance {
                holder,
                asset: asset.clone(),
                previous,
            });
        }
    }

    fn set_allowance(&mut self, key: (Address, Address, AssetId), amount: Amount) {
        let previous = self.allowances.insert(key.clone(), amount);
        if self.depth > 0 {
            self.journal.push(JournalEntry::Allowance { key, previous });
        }
    }
}
