//! Board-agnostic core logic for BLE train hub control
//!
//! This crate contains all drive logic that does not depend on a BLE
//! stack or a specific hub family:
//!
//! - Per-channel speed ramping and emergency braking
//! - The channel bank a hub owns and the intents that mutate it
//! - Hub connection state machine
//! - Configuration type definitions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod channel;
pub mod config;
pub mod state;

pub use channel::{AttachedDevice, ChannelBank, ChannelController, HubChannel, HubIntent};
pub use config::{BleAddress, ChannelConfig, ConfigError, HubConfig};
pub use state::{ConnectFailure, HubEvent, HubState};
