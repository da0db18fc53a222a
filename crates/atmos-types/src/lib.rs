//! Atmos Types - Identity primitives shared by the ATMOS protocol crates.
//!
//! This crate provides:
//! - Addresses (20-byte, Bech32m encoded with the `atmos` prefix)
//! - Object identities (32-byte blake3 digests)
//! - Transaction context used to derive fresh object identities

pub mod address;
pub mod object_id;
pub mod context;
pub mod error;

#[cfg(any(feature = "serde", feature = "borsh"))]
mod serialization;

pub use address::Address;
pub use object_id::ObjectId;
pub use context::TxContext;
pub use error::TypesError;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Address, ObjectId, TxContext, TypesError};
}
