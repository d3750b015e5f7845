//! SBrick hub family
//!
//! SBrick exposes four output channels behind a single remote control
//! characteristic. Speeds are 0..=254 with the direction in a separate
//! flag, and the hub brakes everything when its watchdog runs out.

use mtc_core::{ChannelBank, HubChannel};
use mtc_hal::Uuid;
use mtc_protocol::{
    decode_watchdog_timeout, percent_to_raw, ChannelDrive, Command, CommandError, DriveCommand,
    MAX_RAW_SPEED,
};

use crate::protocol::{CommandBuffer, DeviceProtocol};

/// Remote control service
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x4dc591b0_857c_41de_b5f1_15abda665b0c);

/// Remote control characteristic
pub const CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x02b8cbcc_0e25_4bda_8790_a15f53e6010f);

/// All channel ids, in wire order
const ALL_CHANNELS: [u8; 4] = [
    HubChannel::A.id(),
    HubChannel::B.id(),
    HubChannel::C.id(),
    HubChannel::D.id(),
];

/// SBrick protocol adapter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SBrick;

impl DeviceProtocol for SBrick {
    fn service_uuid(&self) -> Uuid {
        SERVICE_UUID
    }

    fn characteristic_uuid(&self) -> Uuid {
        CHARACTERISTIC_UUID
    }

    fn map_speed_percent_to_raw(&self, percent: i16) -> u8 {
        percent_to_raw(percent, MAX_RAW_SPEED)
    }

    fn build_drive_command(&self, channels: &ChannelBank) -> Result<CommandBuffer, CommandError> {
        // Unconfigured channels stay at the idle default
        let mut command = DriveCommand::default();
        for controller in channels.iter() {
            command.set(ChannelDrive::new(
                controller.channel().id(),
                controller.is_driving_forward(),
                self.map_speed_percent_to_raw(controller.current_speed_percent()),
            ))?;
        }
        Command::Drive(&command.channels).to_vec()
    }

    fn build_brake_command(&self) -> Result<CommandBuffer, CommandError> {
        Command::Brake(&ALL_CHANNELS).to_vec()
    }

    fn build_set_watchdog_command(&self, timeout: u8) -> Result<CommandBuffer, CommandError> {
        Command::SetWatchdogTimeout(timeout).to_vec()
    }

    fn build_get_watchdog_command(&self) -> Result<CommandBuffer, CommandError> {
        Command::GetWatchdogTimeout.to_vec()
    }

    fn decode_watchdog_timeout(&self, response: &[u8]) -> Result<u8, CommandError> {
        decode_watchdog_timeout(response)
    }
}
