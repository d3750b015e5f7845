//! Configuration types
//!
//! Board-agnostic hub configuration. Loading it (from flash, a file or a
//! companion app) is up to the application; these types only describe and
//! validate it, and can be stored as postcard binary data with the `serde`
//! feature.

pub mod address;
pub mod types;

pub use address::{AddressError, BleAddress};
pub use types::*;
