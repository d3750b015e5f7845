//! Drive intents
//!
//! Messages sent to a hub from other tasks. They are applied to the
//! channel bank at the start of a drive-loop tick.

use super::HubChannel;

/// Intent delivered to a hub
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HubIntent {
    /// Set the target speed of every motor channel
    Drive {
        /// Floor for nonzero targets, keeps slow trains from stalling
        min_speed_percent: i16,
        /// Signed target speed
        speed_percent: i16,
    },
    /// Switch lights on or off
    Lights {
        /// A single light channel, or all light channels when `None`
        channel: Option<HubChannel>,
        on: bool,
    },
}

impl HubIntent {
    /// Drive intent
    pub const fn drive(min_speed_percent: i16, speed_percent: i16) -> Self {
        HubIntent::Drive {
            min_speed_percent,
            speed_percent,
        }
    }

    /// Lights intent for all light channels
    pub const fn lights(on: bool) -> Self {
        HubIntent::Lights { channel: None, on }
    }

    /// Lights intent for one channel
    pub const fn channel_lights(channel: HubChannel, on: bool) -> Self {
        HubIntent::Lights {
            channel: Some(channel),
            on,
        }
    }
}
