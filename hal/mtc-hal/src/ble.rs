//! BLE central abstractions
//!
//! Modeled on a central that keeps a small pool of GATT clients. Clients
//! are handles: the central owns the underlying connection slots and hands
//! out handles that can be reused for the same peer without rediscovering
//! its services.

use mtc_core::BleAddress;

/// BLE operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleError {
    /// Link not established
    NotConnected,
    /// Connection attempt failed or timed out
    ConnectFailed,
    /// Remote service not present
    ServiceNotFound,
    /// Remote characteristic not present in the service
    CharacteristicNotFound,
    /// GATT write rejected or not acknowledged
    WriteFailed,
    /// GATT read failed
    ReadFailed,
    /// Stack out of client slots or memory
    NoResources,
    /// Stack-specific error code
    Stack(u16),
}

/// 128-bit GATT UUID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Uuid(pub u128);

impl Uuid {
    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    /// Bytes in the little-endian order used on air
    pub const fn to_le_bytes(self) -> [u8; 16] {
        self.0.to_le_bytes()
    }
}

/// Connection parameters for a new client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionParams {
    /// Minimum connection interval (1.25 ms units)
    pub min_interval: u16,
    /// Maximum connection interval (1.25 ms units)
    pub max_interval: u16,
    /// Peripheral latency (connection events)
    pub latency: u16,
    /// Supervision timeout (10 ms units)
    pub supervision_timeout: u16,
    /// How long to wait for a connection to complete (seconds)
    pub connect_timeout_secs: u8,
}

impl Default for ConnectionParams {
    /// 15 ms interval, no latency, 510 ms supervision timeout
    ///
    /// Safe for three hubs connected at once.
    fn default() -> Self {
        Self {
            min_interval: 12,
            max_interval: 12,
            latency: 0,
            supervision_timeout: 51,
            connect_timeout_secs: 3,
        }
    }
}

/// Remote GATT characteristic
#[allow(async_fn_in_trait)]
pub trait RemoteCharacteristic {
    /// Check if the characteristic accepts writes
    fn can_write(&self) -> bool;

    /// Write a value
    async fn write(&mut self, data: &[u8], with_response: bool) -> Result<(), BleError>;

    /// Read the current value into `buf`
    ///
    /// Returns the number of bytes read.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, BleError>;
}

/// GATT client bound to one peer
#[allow(async_fn_in_trait)]
pub trait GattClient {
    /// Characteristic handle type
    type Characteristic: RemoteCharacteristic;

    /// Address of the peer this client is bound to
    fn peer_address(&self) -> Option<BleAddress>;

    /// Check if the link is up
    fn is_connected(&self) -> bool;

    /// Connect to `address`
    ///
    /// With `refresh_services` false a client that already knows the peer
    /// keeps its cached service database.
    async fn connect(&mut self, address: BleAddress, refresh_services: bool)
        -> Result<(), BleError>;

    /// Tear the link down
    async fn disconnect(&mut self) -> Result<(), BleError>;

    /// Look up a characteristic in a remote service
    async fn characteristic(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Self::Characteristic, BleError>;
}

/// Local BLE central and its client pool
pub trait BleCentral {
    /// Client handle type
    type Client: GattClient;

    /// Number of clients currently allocated
    fn client_count(&self) -> usize;

    /// Maximum number of clients the stack supports
    fn max_clients(&self) -> usize;

    /// Client previously bound to `address`, if any
    fn client_by_peer(&mut self, address: BleAddress) -> Option<Self::Client>;

    /// Any allocated client that is currently disconnected
    fn disconnected_client(&mut self) -> Option<Self::Client>;

    /// Allocate a new client
    fn create_client(&mut self, params: ConnectionParams) -> Result<Self::Client, BleError>;

    /// Release a client
    fn delete_client(&mut self, client: Self::Client);
}
