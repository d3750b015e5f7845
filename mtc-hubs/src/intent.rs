//! Intent delivery to a running drive loop
//!
//! Other tasks never touch channel state directly. Drive and light intents
//! go through a bounded queue that the drive loop drains once per tick; the
//! emergency brake goes through a signal so the latest value always wins
//! and a full queue can never swallow it.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use mtc_core::{ChannelBank, HubChannel, HubIntent};

/// Intent queue capacity
pub const INTENT_QUEUE_SIZE: usize = 8;

/// Intent delivery errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IntentError {
    /// The drive loop has not caught up with earlier intents
    QueueFull,
}

/// Shared handle for sending intents to one hub
pub struct HubIntents<M: RawMutex> {
    queue: Channel<M, HubIntent, INTENT_QUEUE_SIZE>,
    ebreak: Signal<M, bool>,
}

impl<M: RawMutex> HubIntents<M> {
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
            ebreak: Signal::new(),
        }
    }

    /// Queue an intent
    pub fn send(&self, intent: HubIntent) -> Result<(), IntentError> {
        self.queue
            .try_send(intent)
            .map_err(|_| IntentError::QueueFull)
    }

    /// Set the target speed of all motor channels
    pub fn drive(&self, min_speed_percent: i16, speed_percent: i16) -> Result<(), IntentError> {
        self.send(HubIntent::drive(min_speed_percent, speed_percent))
    }

    /// Switch all lights
    pub fn set_lights(&self, on: bool) -> Result<(), IntentError> {
        self.send(HubIntent::lights(on))
    }

    /// Switch the light on one channel
    pub fn set_channel_lights(&self, channel: HubChannel, on: bool) -> Result<(), IntentError> {
        self.send(HubIntent::channel_lights(channel, on))
    }

    /// Engage or release the emergency brake
    pub fn emergency_break(&self, enabled: bool) {
        self.ebreak.signal(enabled);
    }

    /// Apply everything sent since the last call
    ///
    /// The queue is drained before the emergency brake value is applied.
    /// Engaging the brake clears motor targets, so a drive intent from the
    /// same tick can never survive it. Intents sent on later ticks set the
    /// target and take effect once the brake is released.
    pub fn apply_pending(&self, bank: &mut ChannelBank) {
        while let Ok(intent) = self.queue.try_receive() {
            trace!("Applying {}", intent);
            bank.apply(intent);
        }

        if let Some(enabled) = self.ebreak.try_take() {
            if enabled {
                warn!("Emergency brake engaged on {} channel(s)", bank.len());
            } else {
                info!("Emergency brake released on {} channel(s)", bank.len());
            }
            bank.set_emergency_break(enabled);
        }
    }
}

impl<M: RawMutex> Default for HubIntents<M> {
    fn default() -> Self {
        Self::new()
    }
}
