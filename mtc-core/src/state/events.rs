//! Events that trigger hub state transitions

/// Why a connection attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectFailure {
    /// No client could be reused and the central is at its client limit
    NoClientAvailable,
    /// The link could not be established
    Link,
    /// The watchdog could not be set and confirmed
    Negotiation,
}

/// Events that can trigger hub state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HubEvent {
    // Discovery events
    /// Scanning for the hub started
    StartDiscovery,
    /// Scanning stopped without finding the hub
    StopDiscovery,
    /// An advertisement from the configured address was seen
    AdvertisementMatched,

    // Connection events
    /// Connection attempt started
    ConnectRequested,
    /// Link up and watchdog confirmed
    WatchdogNegotiated,
    /// Connection attempt failed
    ConnectFailed(ConnectFailure),

    // Teardown events
    /// Disconnect requested locally
    Disconnect,
    /// The central reported the link gone
    LinkLost,
}

impl HubEvent {
    /// Check if this event ends a connection
    pub fn is_teardown(&self) -> bool {
        matches!(
            self,
            HubEvent::Disconnect | HubEvent::LinkLost | HubEvent::ConnectFailed(_)
        )
    }
}
