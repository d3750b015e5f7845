//! Configuration type definitions
//!
//! One [`HubConfig`] per physical hub, with a [`ChannelConfig`] for each
//! output line that has something attached.

use heapless::{String, Vec};

use super::address::BleAddress;
use crate::channel::{AttachedDevice, HubChannel, CHANNEL_COUNT};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum hub name length
pub const MAX_NAME_LEN: usize = 16;

/// Default acceleration step (percent per tick)
pub const DEFAULT_SPEED_STEP: u8 = 10;

/// Default brake step (percent per tick)
pub const DEFAULT_BRAKE_STEP: u8 = 20;

/// Default light level (percent)
pub const DEFAULT_LIGHT_PERC: u8 = 100;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The same channel is configured more than once
    DuplicateChannel(HubChannel),
    /// A speed or brake step of zero would never reach its target
    ZeroStep(HubChannel),
    /// Light level above 100%
    InvalidLightLevel(HubChannel),
    /// More channels than the hub has
    TooManyChannels,
    /// Device address could not be parsed
    InvalidAddress,
    /// Binary (de)serialization failed
    Serialization,
}

/// Per-channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelConfig {
    /// Output line
    pub channel: HubChannel,
    /// Attached device kind
    pub device: AttachedDevice,
    /// Acceleration step (percent per tick)
    pub speed_step: u8,
    /// Deceleration/reversal step (percent per tick)
    pub brake_step: u8,
    /// Light level when switched on (percent)
    pub light_perc: u8,
    /// Switch this light on automatically when the train starts driving
    pub auto_lights: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            channel: HubChannel::A,
            device: AttachedDevice::Motor,
            speed_step: DEFAULT_SPEED_STEP,
            brake_step: DEFAULT_BRAKE_STEP,
            light_perc: DEFAULT_LIGHT_PERC,
            auto_lights: false,
        }
    }
}

impl ChannelConfig {
    /// Motor channel with the given steps
    pub const fn motor(channel: HubChannel, speed_step: u8, brake_step: u8) -> Self {
        Self {
            channel,
            device: AttachedDevice::Motor,
            speed_step,
            brake_step,
            light_perc: DEFAULT_LIGHT_PERC,
            auto_lights: false,
        }
    }

    /// Light channel switching to `light_perc`
    pub const fn light(channel: HubChannel, light_perc: u8, auto_lights: bool) -> Self {
        Self {
            channel,
            device: AttachedDevice::Light,
            speed_step: 100,
            brake_step: 100,
            light_perc,
            auto_lights,
        }
    }
}

/// Hub configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HubConfig {
    /// Display name
    pub name: String<MAX_NAME_LEN>,
    /// Device address to connect to
    pub address: BleAddress,
    /// Hubs that are not enabled are never connected
    pub enabled: bool,
    /// Configured channels
    pub channels: Vec<ChannelConfig, CHANNEL_COUNT>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            address: BleAddress::default(),
            enabled: true,
            channels: Vec::new(),
        }
    }
}

impl HubConfig {
    /// Create an enabled hub with no channels
    pub fn new(address: BleAddress) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    /// Create a hub from a textual address
    pub fn with_address(address: &str) -> Result<Self, ConfigError> {
        let address = BleAddress::parse(address).map_err(|_| ConfigError::InvalidAddress)?;
        Ok(Self::new(address))
    }

    /// Add a channel
    pub fn with_channel(mut self, channel: ChannelConfig) -> Result<Self, ConfigError> {
        self.channels
            .push(channel)
            .map_err(|_| ConfigError::TooManyChannels)?;
        Ok(self)
    }

    /// Find the configuration of a channel
    pub fn find_channel(&self, channel: HubChannel) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.channel == channel)
    }

    /// Whether lights should come on when the train starts driving
    pub fn auto_lights_enabled(&self) -> bool {
        self.channels
            .iter()
            .any(|c| c.device == AttachedDevice::Light && c.auto_lights)
    }

    /// Check the configuration for mistakes
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = [false; CHANNEL_COUNT];

        for config in &self.channels {
            let index = config.channel.index();
            if seen[index] {
                return Err(ConfigError::DuplicateChannel(config.channel));
            }
            seen[index] = true;

            if config.device != AttachedDevice::Nothing
                && (config.speed_step == 0 || config.brake_step == 0)
            {
                return Err(ConfigError::ZeroStep(config.channel));
            }

            if config.device == AttachedDevice::Light && config.light_perc > 100 {
                return Err(ConfigError::InvalidLightLevel(config.channel));
            }
        }

        Ok(())
    }

    /// Serialize to postcard binary data
    ///
    /// Returns the used part of `buffer`.
    #[cfg(feature = "serde")]
    pub fn to_slice<'b>(&self, buffer: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
        postcard::to_slice(self, buffer).map_err(|_| ConfigError::Serialization)
    }

    /// Deserialize from postcard binary data and validate
    #[cfg(feature = "serde")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Serialization)?;
        config.validate()?;
        Ok(config)
    }
}
