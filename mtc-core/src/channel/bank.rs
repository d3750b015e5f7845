//! Channel bank
//!
//! Holds the controllers of one hub in an array indexed by channel id, so
//! building a drive command never has to search.

use super::{AttachedDevice, ChannelController, HubChannel, HubIntent, CHANNEL_COUNT};
use crate::config::{ConfigError, HubConfig};

/// Controllers of one hub, keyed by [`HubChannel::index`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelBank {
    controllers: [Option<ChannelController>; CHANNEL_COUNT],
    ebreak: bool,
}

impl ChannelBank {
    /// Create a bank with no channels configured
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bank from a validated hub configuration
    pub fn from_config(config: &HubConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut bank = Self::new();
        for channel in &config.channels {
            bank.controllers[channel.channel.index()] = Some(ChannelController::new(channel));
        }
        Ok(bank)
    }

    /// Get the controller of a channel
    pub fn get(&self, channel: HubChannel) -> Option<&ChannelController> {
        self.controllers[channel.index()].as_ref()
    }

    /// Get the controller of a channel mutably
    pub fn get_mut(&mut self, channel: HubChannel) -> Option<&mut ChannelController> {
        self.controllers[channel.index()].as_mut()
    }

    /// Iterate over configured controllers in channel order
    pub fn iter(&self) -> impl Iterator<Item = &ChannelController> {
        self.controllers.iter().flatten()
    }

    /// Number of configured channels
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// True when no channel is configured
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply an intent to the matching channels
    ///
    /// Drive intents only touch motors and light intents only touch
    /// lights; a channel with the wrong device is left alone.
    pub fn apply(&mut self, intent: HubIntent) {
        match intent {
            HubIntent::Drive {
                min_speed_percent,
                speed_percent,
            } => {
                for controller in self.devices_mut(AttachedDevice::Motor) {
                    controller.set_min_speed_percent(min_speed_percent);
                    controller.set_target_speed_percent(speed_percent);
                }
            }
            HubIntent::Lights { channel, on } => {
                for controller in self.devices_mut(AttachedDevice::Light) {
                    if channel.is_some_and(|c| c != controller.channel()) {
                        continue;
                    }
                    let level = if on { controller.light_perc() } else { 0 };
                    controller.set_min_speed_percent(0);
                    controller.set_target_speed_percent(level);
                }
            }
        }
    }

    /// Engage or release the emergency brake on every channel
    pub fn set_emergency_break(&mut self, enabled: bool) {
        self.ebreak = enabled;
        for controller in self.controllers.iter_mut().flatten() {
            if enabled {
                controller.emergency_break();
            } else {
                controller.release_emergency_break();
            }
        }
    }

    /// Check if the emergency brake is engaged
    pub fn is_emergency_breaking(&self) -> bool {
        self.ebreak
    }

    /// Advance every channel by one tick
    pub fn update_all(&mut self) {
        for controller in self.controllers.iter_mut().flatten() {
            controller.update_current_speed_percent();
        }
    }

    fn devices_mut(
        &mut self,
        device: AttachedDevice,
    ) -> impl Iterator<Item = &mut ChannelController> {
        self.controllers
            .iter_mut()
            .flatten()
            .filter(move |c| c.attached_device() == device)
    }
}
