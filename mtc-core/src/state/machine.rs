//! Hub state machine definition

use super::events::{ConnectFailure, HubEvent};

/// Hub connection states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HubState {
    /// Not looking for the hub
    #[default]
    Idle,
    /// Scanning for the configured address
    Discovering,
    /// Advertisement seen, ready to connect
    Discovered,
    /// Connecting and negotiating the watchdog
    Connecting,
    /// Link up, watchdog confirmed; drive commands may be sent
    Connected,
    /// Link torn down after having been connected
    Disconnected,
    /// Last connection attempt failed; the hub must be discovered again
    Failed(ConnectFailure),
}

impl HubState {
    /// Check if the hub has been seen and not lost since
    pub fn is_discovered(&self) -> bool {
        matches!(
            self,
            HubState::Discovered | HubState::Connecting | HubState::Connected
        )
    }

    /// Check if drive commands may be sent
    pub fn is_connected(&self) -> bool {
        matches!(self, HubState::Connected)
    }

    /// Check if a connection attempt may start from this state
    pub fn can_connect(&self) -> bool {
        matches!(self, HubState::Discovered)
    }

    /// Check if this is a failure state
    pub fn is_failed(&self) -> bool {
        matches!(self, HubState::Failed(_))
    }

    /// Process an event and return the next state
    pub fn transition(self, event: HubEvent) -> Self {
        use HubEvent::*;
        use HubState::*;

        match (self, event) {
            // Discovery
            (Idle | Disconnected | Failed(_), StartDiscovery) => Discovering,
            (Discovering, StopDiscovery) => Idle,
            (Idle | Discovering | Disconnected | Failed(_), AdvertisementMatched) => Discovered,

            // Connection attempt
            (Discovered, ConnectRequested) => Connecting,
            (Connecting, WatchdogNegotiated) => Connected,
            (Connecting, ConnectFailed(failure)) => Failed(failure),

            // Teardown
            (Connecting | Connected, Disconnect | LinkLost) => Disconnected,

            // Default: stay in current state
            _ => self,
        }
    }
}
