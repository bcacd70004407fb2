//! Contract events
//!
//! Immutable records appended by contract operations. `SwapRequested` is the
//! only channel through which off-ledger collaborators discover requests.

use escrow_types::ids::{Address, AssetId, Fingerprint, RequestId};
use escrow_types::numeric::{Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// A new escrow was funded and initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequested {
    pub request_id: RequestId,
    pub escrow: Address,
    pub owner: Address,
    pub receiver: Address,
    pub sell_asset: AssetId,
    pub buy_asset: AssetId,
    pub sell_amount: Amount,
    pub price_checker: Option<Address>,
    pub price_checker_config: Vec<u8>,
    pub fingerprint: Fingerprint,
    pub requested_at: Timestamp,
}

/// The owner reclaimed an escrow's funds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapCancelled {
    pub escrow: Address,
    pub owner: Address,
    pub sell_asset: AssetId,
    pub amount: Amount,
    pub cancelled_at: Timestamp,
}

/// The settlement collaborator executed an authorized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSettled {
    pub escrow: Address,
    pub order_digest: [u8; 32],
    pub receiver: Address,
    pub sell_asset: AssetId,
    pub buy_asset: AssetId,
    pub sold: Amount,
    pub bought: Amount,
    pub settled_at: Timestamp,
}

/// Enum wrapper for all contract events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    SwapRequested(SwapRequested),
    SwapCancelled(SwapCancelled),
    OrderSettled(OrderSettled),
}

impl ContractEvent {
    /// Escrow the event is about.
    pub fn escrow(&self) -> &Address {
        match self {
            ContractEvent::SwapRequested(e) => &e.escrow,
            ContractEvent::SwapCancelled(e) => &e.escrow,
            ContractEvent::OrderSettled(e) => &e.escrow,
        }
    }

    /// JSON rendering for off-ledger observers.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
