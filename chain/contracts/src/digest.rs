//! Order digests under a domain separator
//!
//! The settlement collaborator identifies an order by
//! `sha256(0x19 0x01 || domain_separator || struct_hash(order))`.
//! The domain separator binds that digest to one chain and one settlement
//! contract, so a digest cannot be replayed against another deployment.

use escrow_types::ids::Address;
use escrow_types::order::CandidateOrder;
use serde::{Deserialize, Serialize};

use crate::commitment::CanonicalEncoder;

const DOMAIN_TAG: &[u8] = b"swap-escrow/domain/v1";
const ORDER_TAG: &[u8] = b"swap-escrow/order/v1";
const DOMAIN_NAME: &[u8] = b"Gnosis Protocol";
const DOMAIN_VERSION: &[u8] = b"v2";

/// Hash identifying the signing domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainSeparator([u8; 32]);

impl DomainSeparator {
    pub fn new(chain_id: u64, verifying_contract: &Address) -> Self {
        let hash = CanonicalEncoder::new(DOMAIN_TAG)
            .prefixed(DOMAIN_NAME)
            .prefixed(DOMAIN_VERSION)
            .u64(chain_id)
            .address(verifying_contract)
            .hash();
        Self(hash)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Hash of every order field in fixed order.
pub fn struct_hash(order: &CandidateOrder) -> [u8; 32] {
    CanonicalEncoder::new(ORDER_TAG)
        .asset(&order.sell_asset)
        .asset(&order.buy_asset)
        .address(&order.receiver)
        .amount(order.sell_amount)
        .amount(order.buy_amount)
        .i64(order.valid_to)
        .fixed(&order.app_data)
        .amount(order.fee_amount)
        .u8(order.kind.tag())
        .u8(u8::from(order.partially_fillable))
        .u8(order.sell_balance.tag())
        .u8(order.buy_balance.tag())
        .hash()
}

/// Digest the settlement collaborator asks an escrow to authorize.
pub fn order_digest(domain: &DomainSeparator, order: &CandidateOrder) -> [u8; 32] {
    CanonicalEncoder::new(&[0x19, 0x01])
        .fixed(domain.as_bytes())
        .fixed(&struct_hash(order))
        .hash()
}
