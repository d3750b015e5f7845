//! Channel speed controller
//!
//! Each channel ramps its current speed toward a target speed, one step per
//! drive-loop tick:
//!
//! - Accelerating (away from zero, same direction) uses the speed step
//! - Slowing down or reversing uses the brake step, which is usually larger
//! - A minimum speed floor keeps nonzero targets out of the motor stall zone
//!
//! While the emergency brake is engaged the target is ignored: motors brake
//! to zero and lights blink between off and their configured level, one flip
//! per tick. The controller is the only place the current speed changes, so
//! ramping and braking can never disagree.
//!
//! ```ignore
//! let mut controller = ChannelController::new(&config);
//! controller.set_target_speed_percent(60);
//!
//! // Every drive-loop tick:
//! controller.update_current_speed_percent();
//! let speed = controller.current_speed_percent();
//! ```

use super::{AttachedDevice, HubChannel};
use crate::config::ChannelConfig;

/// Largest speed magnitude in percent
pub const MAX_SPEED_PERCENT: i16 = 100;

/// Speed ramping state for one hub channel
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelController {
    channel: HubChannel,
    device: AttachedDevice,
    /// Percent per tick when accelerating
    speed_step: i16,
    /// Percent per tick when decelerating or reversing
    brake_step: i16,
    /// Level a light blinks to while emergency braking
    light_perc: i16,
    current: i16,
    target: i16,
    /// Floor for the magnitude of nonzero targets
    min_speed: i16,
    ebreak: bool,
}

impl ChannelController {
    /// Create a stopped controller from its channel configuration
    ///
    /// Step sizes are clamped to 1..=100; a zero step would never reach
    /// its target.
    pub fn new(config: &ChannelConfig) -> Self {
        Self {
            channel: config.channel,
            device: config.device,
            speed_step: i16::from(config.speed_step).clamp(1, MAX_SPEED_PERCENT),
            brake_step: i16::from(config.brake_step).clamp(1, MAX_SPEED_PERCENT),
            light_perc: i16::from(config.light_perc).min(MAX_SPEED_PERCENT),
            current: 0,
            target: 0,
            min_speed: 0,
            ebreak: false,
        }
    }

    /// Channel this controller drives
    pub fn channel(&self) -> HubChannel {
        self.channel
    }

    /// Device attached to the channel
    pub fn attached_device(&self) -> AttachedDevice {
        self.device
    }

    /// Configured light level in percent
    pub fn light_perc(&self) -> i16 {
        self.light_perc
    }

    /// Set the target speed (-100..=100, clamped)
    ///
    /// The current speed is not touched; it follows on the next ticks.
    pub fn set_target_speed_percent(&mut self, percent: i16) {
        self.target = percent.clamp(-MAX_SPEED_PERCENT, MAX_SPEED_PERCENT);
    }

    /// Get the target speed as last set
    pub fn target_speed_percent(&self) -> i16 {
        self.target
    }

    /// Set the minimum magnitude for nonzero targets (0..=100, clamped)
    pub fn set_min_speed_percent(&mut self, percent: i16) {
        self.min_speed = percent.clamp(0, MAX_SPEED_PERCENT);
    }

    /// Get the minimum speed floor
    pub fn min_speed_percent(&self) -> i16 {
        self.min_speed
    }

    /// Get the current (ramped) speed
    pub fn current_speed_percent(&self) -> i16 {
        self.current
    }

    /// True when the channel is currently driving forward (speed > 0)
    pub fn is_driving_forward(&self) -> bool {
        self.current > 0
    }

    /// True when the current speed has reached the effective target
    pub fn is_at_target(&self) -> bool {
        self.current == self.effective_target()
    }

    /// Engage the emergency brake
    ///
    /// Motor targets are cleared so releasing the brake does not pull away
    /// again. The speed itself is only changed by
    /// [`update_current_speed_percent`](Self::update_current_speed_percent).
    pub fn emergency_break(&mut self) {
        self.ebreak = true;
        if self.device != AttachedDevice::Light {
            self.target = 0;
        }
    }

    /// Release the emergency brake; ramping toward the target resumes
    pub fn release_emergency_break(&mut self) {
        self.ebreak = false;
    }

    /// Check if the emergency brake is engaged
    pub fn is_emergency_breaking(&self) -> bool {
        self.ebreak
    }

    /// Advance the current speed by one tick
    pub fn update_current_speed_percent(&mut self) {
        if self.ebreak {
            self.update_emergency();
        } else {
            self.step_toward(self.effective_target());
        }
    }

    /// Target with the minimum speed floor applied
    fn effective_target(&self) -> i16 {
        if self.target == 0 {
            0
        } else {
            self.target.signum() * self.target.abs().max(self.min_speed)
        }
    }

    fn update_emergency(&mut self) {
        match self.device {
            AttachedDevice::Light => {
                if self.current == 0 {
                    self.current = self.light_perc;
                } else if self.current == self.light_perc {
                    self.current = 0;
                } else {
                    self.step_toward(0);
                }
            }
            AttachedDevice::Motor | AttachedDevice::Nothing => self.step_toward(0),
        }
    }

    fn step_toward(&mut self, target: i16) {
        let delta = target - self.current;
        if delta == 0 {
            return;
        }

        let step = if self.is_braking_toward(target) {
            self.brake_step
        } else {
            self.speed_step
        };

        let change = step.min(delta.abs());
        self.current = (self.current + change * delta.signum())
            .clamp(-MAX_SPEED_PERCENT, MAX_SPEED_PERCENT);
    }

    /// Slowing down or reversing; starting from standstill is accelerating
    fn is_braking_toward(&self, target: i16) -> bool {
        self.current != 0
            && (self.current.signum() != target.signum() || target.abs() < self.current.abs())
    }
}
