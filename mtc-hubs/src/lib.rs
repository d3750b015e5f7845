//! BLE train hub drivers
//!
//! Connects to motor/light hubs over BLE and keeps them driving:
//!
//! - [`BleHub`]: discovery, client reuse and watchdog negotiation
//! - [`DriveLoop`]: periodic drive commands that keep the hub watchdog fed
//! - [`HubIntents`]: drive, light and emergency brake requests from other tasks
//! - [`DeviceProtocol`]: what differs between hub families ([`SBrick`])
//!
//! ```ignore
//! static INTENTS: HubIntents<CriticalSectionRawMutex> = HubIntents::new();
//!
//! let mut hub = BleHub::new(&config, SBrick, &INTENTS)?;
//! hub.on_advertisement(address);
//! if hub.connect(&mut central, 5).await {
//!     hub.drive_loop()?.run().await;
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This must go first so the logging macros are visible in every module
#[macro_use]
mod fmt;

pub mod drive;
pub mod hub;
pub mod intent;
pub mod protocol;
pub mod sbrick;

#[cfg(test)]
mod mock;

pub use drive::{drive_period, DriveLoop, TransmitError};
pub use hub::{BleHub, ConnectError, HubError};
pub use intent::{HubIntents, IntentError, INTENT_QUEUE_SIZE};
pub use protocol::{CommandBuffer, DeviceProtocol, NegotiationError};
pub use sbrick::SBrick;
