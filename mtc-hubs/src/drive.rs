//! Watchdog drive loop
//!
//! Once connected, a hub must receive a drive command at least once per
//! watchdog timeout or it brakes every output on its own. The drive loop
//! sends one every half timeout. Each tick:
//!
//! 1. Drain queued intents, then apply the latest emergency brake value
//! 2. Advance every channel controller one ramp step
//! 3. Build the drive command from the current speeds
//! 4. Write it, bounded by one period
//!
//! A failed or slow write is logged and the next tick tries again; the
//! hub watchdog is the backstop if the link stays down.

use core::future::Future;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{with_timeout, Duration, Ticker};

use mtc_core::ChannelBank;
use mtc_hal::{BleError, RemoteCharacteristic};
use mtc_protocol::CommandError;

use crate::intent::HubIntents;
use crate::protocol::DeviceProtocol;

/// Milliseconds per watchdog unit, halved (the unit is a tenth of a second)
const PERIOD_MS_PER_WATCHDOG_UNIT: u64 = 50;

/// Drive command transmission errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmitError {
    /// Write rejected by the link
    Link(BleError),
    /// Write did not complete within one period
    Timeout,
    /// Command could not be encoded
    Encode(CommandError),
}

/// Drive period for a watchdog timeout in tenths of a second
pub fn drive_period(watchdog_timeout: u8) -> Duration {
    Duration::from_millis(u64::from(watchdog_timeout) * PERIOD_MS_PER_WATCHDOG_UNIT)
}

/// Periodic drive command sender for one connected hub
///
/// Borrows the hub for its whole lifetime, so the hub cannot be
/// disconnected or reconfigured while the loop runs.
pub struct DriveLoop<'h, R: RemoteCharacteristic, P: DeviceProtocol, M: RawMutex> {
    protocol: &'h P,
    characteristic: &'h mut R,
    channels: &'h mut ChannelBank,
    intents: &'h HubIntents<M>,
    period: Duration,
}

impl<'h, R: RemoteCharacteristic, P: DeviceProtocol, M: RawMutex> DriveLoop<'h, R, P, M> {
    pub(crate) fn new(
        protocol: &'h P,
        characteristic: &'h mut R,
        channels: &'h mut ChannelBank,
        intents: &'h HubIntents<M>,
        watchdog_timeout: u8,
    ) -> Self {
        Self {
            protocol,
            characteristic,
            channels,
            intents,
            period: drive_period(watchdog_timeout),
        }
    }

    /// Time between drive commands
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Channel state as of the last tick
    pub fn channels(&self) -> &ChannelBank {
        &*self.channels
    }

    /// Run a single cycle
    pub async fn tick(&mut self) -> Result<(), TransmitError> {
        self.intents.apply_pending(self.channels);
        self.channels.update_all();

        let command = self
            .protocol
            .build_drive_command(self.channels)
            .map_err(TransmitError::Encode)?;

        match with_timeout(self.period, self.characteristic.write(&command, false)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransmitError::Link(e)),
            Err(_) => Err(TransmitError::Timeout),
        }
    }

    /// Send drive commands forever
    pub async fn run(mut self) -> ! {
        info!("Drive loop started, period {} ms", self.period.as_millis());

        let mut ticker = Ticker::every(self.period);
        loop {
            if let Err(e) = self.tick().await {
                warn!("Drive command not sent: {}", e);
            }
            ticker.next().await;
        }
    }

    /// Send drive commands until `stop` completes
    pub async fn run_until<F: Future>(self, stop: F) -> F::Output {
        match select(self.run(), stop).await {
            Either::First(never) => never,
            Either::Second(output) => {
                debug!("Drive loop stopped");
                output
            }
        }
    }
}
