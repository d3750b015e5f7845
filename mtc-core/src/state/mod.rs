//! Hub connection state machine
//!
//! Tracks a hub from discovery through watchdog negotiation to an active
//! drive connection. Transitions are explicit and deterministic; the BLE
//! work itself happens in the hub implementation, which reports outcomes
//! as events.

pub mod events;
pub mod machine;

pub use events::{ConnectFailure, HubEvent};
pub use machine::HubState;
