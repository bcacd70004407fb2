//! Commitment Hasher: fingerprints over swap requests
//!
//! A fingerprint is SHA-256 over a canonical, order-preserving encoding of
//! the full request tuple. Off-ledger observers can reproduce it from a
//! `SwapRequested` announcement alone, so the layout below is frozen:
//!
//! ```text
//! "swap-escrow/fingerprint/v1"
//! owner                              20 bytes
//! receiver                           20 bytes
//! u32 BE len || sell_asset           UTF-8
//! u32 BE len || buy_asset            UTF-8
//! sell_amount                        u128 BE
//! price_checker                      20 bytes, zero address when absent
//! u32 BE len || price_checker_config raw bytes
//! ```

use escrow_types::ids::{Address, AssetId, Fingerprint};
use escrow_types::numeric::Amount;
use escrow_types::order::SwapParams;
use sha2::{Digest, Sha256};

/// Domain tag prefixed to every fingerprint preimage.
pub const FINGERPRINT_DOMAIN: &[u8] = b"swap-escrow/fingerprint/v1";

/// Append-only builder for fixed-order binary encodings.
///
/// Integers are big-endian; variable-length fields carry a u32 length prefix.
#[derive(Debug, Default)]
pub(crate) struct CanonicalEncoder {
    buf: Vec<u8>,
}

impl CanonicalEncoder {
    pub(crate) fn new(domain: &[u8]) -> Self {
        let mut encoder = Self { buf: Vec::with_capacity(256) };
        encoder.buf.extend_from_slice(domain);
        encoder
    }

    pub(crate) fn fixed(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub(crate) fn prefixed(mut self, bytes: &[u8]) -> Self {
        // Asset symbols are at most 32 bytes and the factory caps request
        // configs at MAX_PRICE_CHECKER_CONFIG_BYTES, so this never saturates.
        let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
        self.buf.extend_from_slice(&len.to_be_bytes());
        self.buf.extend_from_slice(bytes);
        self
    }

    pub(crate) fn u8(mut self, value: u8) -> Self {
        self.buf.push(value);
        self
    }

    pub(crate) fn u64(self, value: u64) -> Self {
        self.fixed(&value.to_be_bytes())
    }

    pub(crate) fn i64(self, value: i64) -> Self {
        self.fixed(&value.to_be_bytes())
    }

    pub(crate) fn amount(self, value: Amount) -> Self {
        self.fixed(&value.as_u128().to_be_bytes())
    }

    pub(crate) fn address(self, value: &Address) -> Self {
        self.fixed(value.as_bytes())
    }

    pub(crate) fn asset(self, value: &AssetId) -> Self {
        self.prefixed(value.as_str().as_bytes())
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.buf
    }

    pub(crate) fn hash(self) -> [u8; 32] {
        compute_hash(&self.buf)
    }
}

/// Borrowed view of the fields a fingerprint commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapCommitment<'a> {
    pub owner: &'a Address,
    pub receiver: &'a Address,
    pub sell_asset: &'a AssetId,
    pub buy_asset: &'a AssetId,
    pub sell_amount: Amount,
    pub price_checker: Option<&'a Address>,
    pub price_checker_config: &'a [u8],
}

impl<'a> SwapCommitment<'a> {
    /// Commitment for a request made by `owner`.
    pub fn from_request(owner: &'a Address, params: &'a SwapParams) -> Self {
        Self {
            owner,
            receiver: &params.receiver,
            sell_asset: &params.sell_asset,
            buy_asset: &params.buy_asset,
            sell_amount: params.sell_amount,
            price_checker: params.price_checker.as_ref(),
            price_checker_config: &params.price_checker_config,
        }
    }

    /// Canonical preimage bytes.
    pub fn encode(&self) -> Vec<u8> {
        self.encoder().finish()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(self.encoder().hash())
    }

    fn encoder(&self) -> CanonicalEncoder {
        CanonicalEncoder::new(FINGERPRINT_DOMAIN)
            .address(self.owner)
            .address(self.receiver)
            .asset(self.sell_asset)
            .asset(self.buy_asset)
            .amount(self.sell_amount)
            .address(self.price_checker.unwrap_or(&Address::ZERO))
            .prefixed(self.price_checker_config)
    }
}

/// Fingerprint of a request made by `owner` with `params`.
pub fn fingerprint(owner: &Address, params: &SwapParams) -> Fingerprint {
    SwapCommitment::from_request(owner, params).fingerprint()
}

/// Compute a SHA-256 hash of arbitrary data.
pub fn compute_hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
