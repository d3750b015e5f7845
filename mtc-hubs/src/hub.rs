//! BLE hub connection
//!
//! Owns everything about one physical hub: its channels, its GATT client
//! and the negotiated watchdog. Connecting follows the client pool rules of
//! small BLE stacks:
//!
//! - A client already bound to the hub is reconnected without refreshing
//!   its service database
//! - Otherwise any disconnected client is reused
//! - Only then is a new client created, and deleted again if it cannot
//!   connect
//!
//! A connection only counts once the hub has confirmed the watchdog
//! timeout. Until then no drive loop can be obtained.

use embassy_sync::blocking_mutex::raw::RawMutex;

use mtc_core::{
    BleAddress, ChannelBank, ConfigError, ConnectFailure, HubChannel, HubConfig, HubEvent,
    HubState,
};
use mtc_hal::{BleCentral, BleError, ConnectionParams, GattClient, RemoteCharacteristic};

use crate::drive::DriveLoop;
use crate::intent::{HubIntents, IntentError};
use crate::protocol::{DeviceProtocol, NegotiationError};

/// Connection attempt errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectError {
    /// Hub is disabled in the configuration
    Disabled,
    /// Hub has not been discovered, or was lost since
    NotDiscovered,
    /// A watchdog timeout of zero would disable the hub watchdog
    InvalidWatchdogTimeout,
    /// No client to reuse and no room for a new one
    MaxClientsReached,
    /// The stack refused to create a client
    ClientCreation(BleError),
    /// The link could not be established
    Link(BleError),
    /// The watchdog could not be set and confirmed
    Negotiation(NegotiationError),
}

impl ConnectError {
    /// State machine failure for this error, if the attempt had started
    fn failure(&self) -> Option<ConnectFailure> {
        match self {
            ConnectError::Disabled
            | ConnectError::NotDiscovered
            | ConnectError::InvalidWatchdogTimeout => None,
            ConnectError::MaxClientsReached | ConnectError::ClientCreation(_) => {
                Some(ConnectFailure::NoClientAvailable)
            }
            ConnectError::Link(_) => Some(ConnectFailure::Link),
            ConnectError::Negotiation(_) => Some(ConnectFailure::Negotiation),
        }
    }
}

/// Hub errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HubError {
    /// Operation needs a connected hub
    NotConnected,
}

/// Connection to one BLE hub
pub struct BleHub<'a, C: GattClient, P: DeviceProtocol, M: RawMutex> {
    address: BleAddress,
    enabled: bool,
    auto_lights: bool,
    protocol: P,
    intents: &'a HubIntents<M>,
    channels: ChannelBank,
    state: HubState,
    /// Tenths of a second, valid while connected
    watchdog_timeout: u8,
    client: Option<C>,
    characteristic: Option<C::Characteristic>,
}

impl<'a, C: GattClient, P: DeviceProtocol, M: RawMutex> BleHub<'a, C, P, M> {
    /// Create a hub from its configuration
    pub fn new(
        config: &HubConfig,
        protocol: P,
        intents: &'a HubIntents<M>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            address: config.address,
            enabled: config.enabled,
            auto_lights: config.auto_lights_enabled(),
            protocol,
            intents,
            channels: ChannelBank::from_config(config)?,
            state: HubState::Idle,
            watchdog_timeout: 0,
            client: None,
            characteristic: None,
        })
    }

    /// Configured device address
    pub fn address(&self) -> BleAddress {
        self.address
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_discovered(&self) -> bool {
        self.state.is_discovered()
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Whether lights should come on when the train starts driving
    pub fn auto_lights_enabled(&self) -> bool {
        self.auto_lights
    }

    pub fn state(&self) -> HubState {
        self.state
    }

    /// Negotiated watchdog timeout in tenths of a second (0 when not connected)
    pub fn watchdog_timeout(&self) -> u8 {
        self.watchdog_timeout
    }

    /// Channel state
    pub fn channels(&self) -> &ChannelBank {
        &self.channels
    }

    /// Intent handle shared with other tasks
    pub fn intents(&self) -> &'a HubIntents<M> {
        self.intents
    }

    /// Scanning for the hub started
    pub fn start_discovery(&mut self) {
        self.transition(HubEvent::StartDiscovery);
    }

    /// Scanning stopped without finding the hub
    pub fn stop_discovery(&mut self) {
        self.transition(HubEvent::StopDiscovery);
    }

    /// Feed an advertisement seen while scanning
    ///
    /// Returns true when it came from this hub.
    pub fn on_advertisement(&mut self, address: BleAddress) -> bool {
        if address != self.address {
            return false;
        }
        debug!("Found hub {}", self.address);
        self.transition(HubEvent::AdvertisementMatched);
        true
    }

    /// Connect and set the hub watchdog
    ///
    /// Returns true once the hub is connected and has confirmed
    /// `watchdog_timeout`. See [`try_connect`](Self::try_connect) for the
    /// reason of a failure.
    pub async fn connect<B>(&mut self, central: &mut B, watchdog_timeout: u8) -> bool
    where
        B: BleCentral<Client = C>,
    {
        match self.try_connect(central, watchdog_timeout).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Connecting to {} failed: {}", self.address, e);
                false
            }
        }
    }

    /// Connect and set the hub watchdog
    ///
    /// On failure after the attempt started the hub is left not-discovered
    /// and has to be found again before the next attempt.
    pub async fn try_connect<B>(
        &mut self,
        central: &mut B,
        watchdog_timeout: u8,
    ) -> Result<(), ConnectError>
    where
        B: BleCentral<Client = C>,
    {
        if !self.enabled {
            return Err(ConnectError::Disabled);
        }
        if !self.state.can_connect() {
            return Err(ConnectError::NotDiscovered);
        }
        if watchdog_timeout == 0 {
            return Err(ConnectError::InvalidWatchdogTimeout);
        }

        info!("Connecting to {}", self.address);
        self.transition(HubEvent::ConnectRequested);

        let result = self.establish(central, watchdog_timeout).await;
        if let Err(e) = result {
            if let Some(failure) = e.failure() {
                self.transition(HubEvent::ConnectFailed(failure));
            }
        }
        result
    }

    async fn establish<B>(&mut self, central: &mut B, watchdog_timeout: u8) -> Result<(), ConnectError>
    where
        B: BleCentral<Client = C>,
    {
        let mut client = self.acquire_client(central).await?;

        if !client.is_connected() {
            if let Err(e) = client.connect(self.address, true).await {
                self.client = Some(client);
                return Err(ConnectError::Link(e));
            }
        }

        match self
            .protocol
            .negotiate_watchdog(&mut client, watchdog_timeout)
            .await
        {
            Ok(characteristic) => {
                info!(
                    "Connected to {}, watchdog {} x 100 ms",
                    self.address, watchdog_timeout
                );
                self.client = Some(client);
                self.characteristic = Some(characteristic);
                self.watchdog_timeout = watchdog_timeout;
                self.transition(HubEvent::WatchdogNegotiated);
                Ok(())
            }
            Err(e) => {
                if let Err(e) = client.disconnect().await {
                    debug!("Disconnect after failed negotiation: {}", e);
                }
                self.client = Some(client);
                Err(ConnectError::Negotiation(e))
            }
        }
    }

    /// Pick a client: the one bound to this hub, a free one, or a new one
    async fn acquire_client<B>(&mut self, central: &mut B) -> Result<C, ConnectError>
    where
        B: BleCentral<Client = C>,
    {
        if central.client_count() > 0 {
            if let Some(mut client) = central.client_by_peer(self.address) {
                // Known peer: keep the cached service database
                debug!("Reusing client bound to {}", self.address);
                client
                    .connect(self.address, false)
                    .await
                    .map_err(ConnectError::Link)?;
                return Ok(client);
            }

            if let Some(client) = central.disconnected_client() {
                debug!("Reusing disconnected client for {}", self.address);
                return Ok(client);
            }
        }

        if central.client_count() >= central.max_clients() {
            warn!("Max clients reached, no connection available for {}", self.address);
            return Err(ConnectError::MaxClientsReached);
        }

        let mut client = central
            .create_client(ConnectionParams::default())
            .map_err(ConnectError::ClientCreation)?;

        if let Err(e) = client.connect(self.address, true).await {
            // A new client that never connected holds nothing worth keeping
            central.delete_client(client);
            warn!("Failed to connect to {}, deleted client", self.address);
            return Err(ConnectError::Link(e));
        }

        Ok(client)
    }

    /// Brake every channel and drop the link
    pub async fn disconnect(&mut self) {
        if let Some(characteristic) = self.characteristic.as_mut() {
            match self.protocol.build_brake_command() {
                Ok(brake) => {
                    if let Err(e) = characteristic.write(&brake, false).await {
                        warn!("Brake before disconnect failed: {}", e);
                    }
                }
                Err(e) => warn!("Brake command not encodable: {}", e),
            }
        }

        if let Some(client) = self.client.as_mut() {
            if let Err(e) = client.disconnect().await {
                warn!("Disconnect from {} failed: {}", self.address, e);
            }
        }

        info!("Disconnected from {}", self.address);
        self.transition(HubEvent::Disconnect);
    }

    /// Link lost, reported by the BLE stack
    pub fn on_disconnected(&mut self) {
        warn!("Lost connection to {}", self.address);
        self.transition(HubEvent::LinkLost);
    }

    /// Drive loop for the current connection
    pub fn drive_loop(&mut self) -> Result<DriveLoop<'_, C::Characteristic, P, M>, HubError> {
        if !self.state.is_connected() {
            return Err(HubError::NotConnected);
        }
        let characteristic = self
            .characteristic
            .as_mut()
            .ok_or(HubError::NotConnected)?;

        Ok(DriveLoop::new(
            &self.protocol,
            characteristic,
            &mut self.channels,
            self.intents,
            self.watchdog_timeout,
        ))
    }

    /// Set the target speed of all motor channels
    pub fn drive(&self, min_speed_percent: i16, speed_percent: i16) -> Result<(), IntentError> {
        self.intents.drive(min_speed_percent, speed_percent)
    }

    /// Switch all lights
    pub fn set_lights(&self, on: bool) -> Result<(), IntentError> {
        self.intents.set_lights(on)
    }

    /// Switch the light on one channel
    pub fn set_channel_lights(&self, channel: HubChannel, on: bool) -> Result<(), IntentError> {
        self.intents.set_channel_lights(channel, on)
    }

    /// Engage or release the emergency brake
    pub fn emergency_break(&self, enabled: bool) {
        self.intents.emergency_break(enabled);
    }

    fn transition(&mut self, event: HubEvent) {
        if event.is_teardown() {
            // No characteristic outlives the connection it was resolved on
            self.characteristic = None;
            self.watchdog_timeout = 0;
        }

        let next = self.state.transition(event);
        if next != self.state {
            trace!("Hub {}: {} -> {}", self.address, self.state, next);
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCentral, MockClient, MockPeripheral};
    use crate::sbrick::SBrick;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use mtc_core::ChannelConfig;

    type Intents = HubIntents<CriticalSectionRawMutex>;
    type Hub<'a> = BleHub<'a, MockClient, SBrick, CriticalSectionRawMutex>;

    const ADDRESS: BleAddress = BleAddress::new([0x00, 0x07, 0x80, 0xd0, 0x47, 0x43]);

    fn config() -> HubConfig {
        HubConfig::new(ADDRESS)
            .with_channel(ChannelConfig::motor(HubChannel::A, 10, 20))
            .unwrap()
            .with_channel(ChannelConfig::light(HubChannel::B, 80, true))
            .unwrap()
    }

    fn discovered_hub(intents: &Intents) -> Hub<'_> {
        let mut hub = BleHub::new(&config(), SBrick, intents).unwrap();
        hub.start_discovery();
        assert!(hub.on_advertisement(ADDRESS));
        hub
    }

    #[test]
    fn test_new_hub() {
        let intents = Intents::new();
        let hub: Hub<'_> = BleHub::new(&config(), SBrick, &intents).unwrap();
        assert!(hub.is_enabled());
        assert!(!hub.is_discovered());
        assert!(!hub.is_connected());
        assert!(hub.auto_lights_enabled());
        assert_eq!(hub.channels().len(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let intents = Intents::new();
        let config = config()
            .with_channel(ChannelConfig::motor(HubChannel::A, 5, 5))
            .unwrap();
        assert!(matches!(
            Hub::new(&config, SBrick, &intents),
            Err(ConfigError::DuplicateChannel(HubChannel::A))
        ));
    }

    #[test]
    fn test_advertisement_from_other_device_ignored() {
        let intents = Intents::new();
        let mut hub: Hub<'_> = BleHub::new(&config(), SBrick, &intents).unwrap();
        hub.start_discovery();
        assert!(!hub.on_advertisement(BleAddress::new([1, 2, 3, 4, 5, 6])));
        assert!(!hub.is_discovered());
    }

    #[test]
    fn test_connect() {
        let intents = Intents::new();
        let peripheral = MockPeripheral::new();
        let mut central = MockCentral::new(peripheral.clone(), 3);
        let mut hub = discovered_hub(&intents);

        assert!(block_on(hub.connect(&mut central, 5)));
        assert!(hub.is_connected());
        assert_eq!(hub.watchdog_timeout(), 5);
        assert_eq!(peripheral.watchdog_timeout(), 5);
        assert_eq!(peripheral.connects(), vec![true]);
        assert_eq!(central.created(), 1);
        assert_eq!(central.last_params(), Some(ConnectionParams::default()));
        assert!(hub.drive_loop().is_ok());
    }

    #[test]
    fn test_unwritable_characteristic_fails() {
        let intents = Intents::new();
        let peripheral = MockPeripheral::new();
        peripheral.set_writable(false);
        let mut central = MockCentral::new(peripheral.clone(), 3);
        let mut hub = discovered_hub(&intents);

        assert!(!block_on(hub.connect(&mut central, 50)));
        assert!(!hub.is_connected());
        assert!(!hub.is_discovered());
        assert_eq!(hub.state(), HubState::Failed(ConnectFailure::Negotiation));
        assert_eq!(hub.drive_loop().err(), Some(HubError::NotConnected));
        // Link torn down explicitly
        assert_eq!(peripheral.disconnects(), 1);
    }

    #[test]
    fn test_watchdog_mismatch_fails() {
        let intents = Intents::new();
        let peripheral = MockPeripheral::new();
        peripheral.set_readback_override(Some(2));
        let mut central = MockCentral::new(peripheral.clone(), 3);
        let mut hub = discovered_hub(&intents);

        assert_eq!(
            block_on(hub.try_connect(&mut central, 5)),
            Err(ConnectError::Negotiation(NegotiationError::Mismatch {
                requested: 5,
                confirmed: 2
            }))
        );
        assert!(hub.drive_loop().is_err());
    }

    #[test]
    fn test_refusals() {
        let intents = Intents::new();
        let mut central = MockCentral::new(MockPeripheral::new(), 3);

        let mut hub: Hub<'_> = BleHub::new(&config(), SBrick, &intents).unwrap();
        assert_eq!(
            block_on(hub.try_connect(&mut central, 5)),
            Err(ConnectError::NotDiscovered)
        );

        let mut hub = discovered_hub(&intents);
        assert_eq!(
            block_on(hub.try_connect(&mut central, 0)),
            Err(ConnectError::InvalidWatchdogTimeout)
        );
        assert!(hub.is_discovered());

        let mut disabled = config();
        disabled.enabled = false;
        let mut hub: Hub<'_> = BleHub::new(&disabled, SBrick, &intents).unwrap();
        hub.on_advertisement(ADDRESS);
        assert_eq!(
            block_on(hub.try_connect(&mut central, 5)),
            Err(ConnectError::Disabled)
        );
        assert_eq!(central.created(), 0);
    }

    #[test]
    fn test_reconnect_reuses_known_client() {
        let intents = Intents::new();
        let peripheral = MockPeripheral::new();
        let mut central = MockCentral::new(peripheral.clone(), 3);
        let mut hub = discovered_hub(&intents);
        assert!(block_on(hub.connect(&mut central, 5)));

        central.client_for(ADDRESS).unwrap().drop_link();
        hub.on_disconnected();
        assert_eq!(hub.state(), HubState::Disconnected);
        assert_eq!(hub.watchdog_timeout(), 0);
        assert!(hub.drive_loop().is_err());

        peripheral.clear_log();
        assert!(hub.on_advertisement(ADDRESS));
        assert!(block_on(hub.connect(&mut central, 5)));

        // No service refresh and no new client
        assert_eq!(peripheral.connects(), vec![false]);
        assert_eq!(central.created(), 1);
    }

    #[test]
    fn test_reconnect_failure_clears_discovery() {
        let intents = Intents::new();
        let peripheral = MockPeripheral::new();
        let mut central = MockCentral::new(peripheral.clone(), 3);
        let mut hub = discovered_hub(&intents);
        assert!(block_on(hub.connect(&mut central, 5)));
        hub.on_disconnected();

        peripheral.set_accept_connect(false);
        hub.on_advertisement(ADDRESS);
        assert_eq!(
            block_on(hub.try_connect(&mut central, 5)),
            Err(ConnectError::Link(BleError::ConnectFailed))
        );
        assert_eq!(hub.state(), HubState::Failed(ConnectFailure::Link));
        // Known clients are kept
        assert_eq!(central.deleted(), 0);
    }

    #[test]
    fn test_disconnected_client_is_reused() {
        let intents = Intents::new();
        let peripheral = MockPeripheral::new();
        let mut central = MockCentral::new(peripheral.clone(), 1);
        central.add_foreign_client(false);
        let mut hub = discovered_hub(&intents);

        assert!(block_on(hub.connect(&mut central, 5)));
        assert_eq!(central.created(), 0);
        assert_eq!(peripheral.connects(), vec![true]);
    }

    #[test]
    fn test_max_clients_reached() {
        let intents = Intents::new();
        let peripheral = MockPeripheral::new();
        let mut central = MockCentral::new(peripheral.clone(), 1);
        central.add_foreign_client(true);
        let mut hub = discovered_hub(&intents);

        assert_eq!(
            block_on(hub.try_connect(&mut central, 5)),
            Err(ConnectError::MaxClientsReached)
        );
        assert_eq!(central.created(), 0);
        assert!(peripheral.connects().is_empty());
        assert_eq!(
            hub.state(),
            HubState::Failed(ConnectFailure::NoClientAvailable)
        );
    }

    #[test]
    fn test_failed_new_client_is_deleted() {
        let intents = Intents::new();
        let peripheral = MockPeripheral::new();
        peripheral.set_accept_connect(false);
        let mut central = MockCentral::new(peripheral.clone(), 3);
        let mut hub = discovered_hub(&intents);

        assert!(!block_on(hub.connect(&mut central, 5)));
        assert_eq!(central.created(), 1);
        assert_eq!(central.deleted(), 1);
        assert_eq!(central.client_count(), 0);
        assert!(!hub.is_discovered());
    }

    #[test]
    fn test_disconnect_brakes_first() {
        let intents = Intents::new();
        let peripheral = MockPeripheral::new();
        let mut central = MockCentral::new(peripheral.clone(), 3);
        let mut hub = discovered_hub(&intents);
        assert!(block_on(hub.connect(&mut central, 5)));
        peripheral.clear_log();

        block_on(hub.disconnect());
        assert_eq!(peripheral.writes(), vec![vec![0x00, 0, 1, 2, 3]]);
        assert_eq!(peripheral.disconnects(), 1);
        assert_eq!(hub.state(), HubState::Disconnected);
        assert_eq!(hub.watchdog_timeout(), 0);
        assert!(hub.drive_loop().is_err());
    }

    #[test]
    fn test_intents_forwarded() {
        let intents = Intents::new();
        let hub = discovered_hub(&intents);
        hub.drive(10, 50).unwrap();
        hub.set_lights(true).unwrap();
        hub.set_channel_lights(HubChannel::B, false).unwrap();
        hub.emergency_break(true);

        let mut bank = ChannelBank::from_config(&config()).unwrap();
        intents.apply_pending(&mut bank);
        assert!(bank.is_emergency_breaking());
        // The brake from the same tick wins over the drive target
        let motor = bank.get(HubChannel::A).unwrap();
        assert_eq!(motor.target_speed_percent(), 0);
        assert_eq!(motor.min_speed_percent(), 10);
        assert_eq!(bank.get(HubChannel::B).unwrap().target_speed_percent(), 0);
    }
}
