//! MTC BLE Abstraction Layer
//!
//! This crate defines the BLE central traits hub drivers are written
//! against. A BLE stack binding (NimBLE, trouble, a host adapter in tests)
//! implements them; the drivers never see the stack directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Hub drivers (mtc-hubs)                 │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  mtc-hal (this crate - traits)          │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  BLE stack binding                      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`ble::BleCentral`] - Client pool of the local central
//! - [`ble::GattClient`] - One connection to a peripheral
//! - [`ble::RemoteCharacteristic`] - Readable/writable GATT characteristic

#![no_std]
#![deny(unsafe_code)]

pub mod ble;

// Re-export key traits at crate root for convenience
pub use ble::{BleCentral, BleError, ConnectionParams, GattClient, RemoteCharacteristic, Uuid};
pub use mtc_core::BleAddress;
