//! Hub output channels
//!
//! A hub exposes a fixed set of output lines (A-D). Each configured line
//! gets a [`ChannelController`] that ramps its speed toward a target once
//! per drive-loop tick. The controllers of one hub live in a
//! [`ChannelBank`], indexed by channel id.

pub mod bank;
pub mod controller;
pub mod intent;

pub use bank::ChannelBank;
pub use controller::ChannelController;
pub use intent::HubIntent;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of output channels on a hub
pub const CHANNEL_COUNT: usize = 4;

/// Logical hub output channel
///
/// The discriminant is the channel id used on the wire and the index into
/// a [`ChannelBank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum HubChannel {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
}

impl HubChannel {
    /// All channels in wire order
    pub const ALL: [HubChannel; CHANNEL_COUNT] =
        [HubChannel::A, HubChannel::B, HubChannel::C, HubChannel::D];

    /// Channel id as sent on the wire
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Index into per-channel arrays
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Create a channel from its wire id
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(HubChannel::A),
            1 => Some(HubChannel::B),
            2 => Some(HubChannel::C),
            3 => Some(HubChannel::D),
            _ => None,
        }
    }
}

/// What is plugged into a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AttachedDevice {
    /// Nothing attached, channel is kept at zero
    Nothing,
    /// Train motor
    #[default]
    Motor,
    /// Light (head/tail lights, cabin lighting)
    Light,
}
