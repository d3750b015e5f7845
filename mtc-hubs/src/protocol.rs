//! Device protocol abstraction
//!
//! A hub family is described by where its remote control characteristic
//! lives and how commands for it are encoded. Everything else (connection
//! handling, ramping, the drive loop) is shared between families.

use heapless::Vec;
use mtc_core::ChannelBank;
use mtc_hal::{BleError, GattClient, RemoteCharacteristic, Uuid};
use mtc_protocol::{CommandError, MAX_COMMAND_SIZE};

/// Encoded command ready to be written
pub type CommandBuffer = Vec<u8, MAX_COMMAND_SIZE>;

/// Largest watchdog read-back accepted
const READBACK_SIZE: usize = 8;

/// Watchdog negotiation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NegotiationError {
    /// Remote control service missing
    ServiceNotFound,
    /// Remote control characteristic missing
    CharacteristicNotFound,
    /// Lookup failed for another reason
    Lookup(BleError),
    /// Characteristic does not accept writes
    NotWritable,
    /// Command could not be encoded
    Encode(CommandError),
    /// Writing a command failed
    Write(BleError),
    /// Reading the timeout back failed
    Read(BleError),
    /// Read-back could not be decoded
    InvalidResponse,
    /// Hub reports a different timeout than the one set
    Mismatch { requested: u8, confirmed: u8 },
}

/// Command set and GATT identity of a hub family
#[allow(async_fn_in_trait)]
pub trait DeviceProtocol {
    /// Service holding the remote control characteristic
    fn service_uuid(&self) -> Uuid;

    /// Remote control characteristic
    fn characteristic_uuid(&self) -> Uuid;

    /// Map a signed speed percentage to the raw magnitude sent on the wire
    fn map_speed_percent_to_raw(&self, percent: i16) -> u8;

    /// Drive command carrying the current speed of every channel
    fn build_drive_command(&self, channels: &ChannelBank) -> Result<CommandBuffer, CommandError>;

    /// Command braking every channel
    fn build_brake_command(&self) -> Result<CommandBuffer, CommandError>;

    /// Command setting the watchdog timeout (tenths of a second)
    fn build_set_watchdog_command(&self, timeout: u8) -> Result<CommandBuffer, CommandError>;

    /// Command requesting the watchdog timeout
    fn build_get_watchdog_command(&self) -> Result<CommandBuffer, CommandError>;

    /// Decode the watchdog timeout read back after the request
    fn decode_watchdog_timeout(&self, response: &[u8]) -> Result<u8, CommandError>;

    /// Resolve the remote control characteristic and set the watchdog
    ///
    /// The timeout is written, requested and read back; only a read-back
    /// equal to `timeout` counts as success. Returns the characteristic to
    /// drive through.
    async fn negotiate_watchdog<C: GattClient>(
        &self,
        client: &mut C,
        timeout: u8,
    ) -> Result<C::Characteristic, NegotiationError> {
        let mut characteristic = client
            .characteristic(self.service_uuid(), self.characteristic_uuid())
            .await
            .map_err(|e| match e {
                BleError::ServiceNotFound => NegotiationError::ServiceNotFound,
                BleError::CharacteristicNotFound => NegotiationError::CharacteristicNotFound,
                other => NegotiationError::Lookup(other),
            })?;

        if !characteristic.can_write() {
            return Err(NegotiationError::NotWritable);
        }

        let set = self
            .build_set_watchdog_command(timeout)
            .map_err(NegotiationError::Encode)?;
        characteristic
            .write(&set, true)
            .await
            .map_err(NegotiationError::Write)?;

        let get = self
            .build_get_watchdog_command()
            .map_err(NegotiationError::Encode)?;
        characteristic
            .write(&get, true)
            .await
            .map_err(NegotiationError::Write)?;

        let mut response = [0u8; READBACK_SIZE];
        let len = characteristic
            .read(&mut response)
            .await
            .map_err(NegotiationError::Read)?;
        let response = response
            .get(..len)
            .ok_or(NegotiationError::InvalidResponse)?;
        let confirmed = self
            .decode_watchdog_timeout(response)
            .map_err(|_| NegotiationError::InvalidResponse)?;

        if confirmed != timeout {
            return Err(NegotiationError::Mismatch {
                requested: timeout,
                confirmed,
            });
        }

        Ok(characteristic)
    }
}
