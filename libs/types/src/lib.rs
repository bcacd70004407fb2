//! Types library for the swap escrow engine
//!
//! Shared by the on-ledger engine and by any off-ledger collaborator that
//! needs to build candidate orders or predict commitments.
//!
//! # Modules
//! - `ids`: Identifiers (Address, AssetId, RequestId, Fingerprint)
//! - `numeric`: Token amounts and ledger time
//! - `order`: Swap parameters, candidate orders, payload wire format
//! - `errors`: Error taxonomy

pub mod errors;
pub mod ids;
pub mod numeric;
pub mod order;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
}
