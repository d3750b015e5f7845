//! Command encoding for the SBrick remote control characteristic
//!
//! Command format:
//! - OPCODE (1 byte)
//! - ARGUMENTS (0-12 bytes): opcode-specific
//!
//! Drive arguments are `(channel, direction, speed)` triples, direction 1
//! meaning forward. Brake and status arguments are plain channel ids.

use heapless::Vec;

// Opcodes
pub const OP_BRAKE: u8 = 0x00;
pub const OP_DRIVE: u8 = 0x01;
pub const OP_SET_WATCHDOG_TIMEOUT: u8 = 0x0D;
pub const OP_GET_WATCHDOG_TIMEOUT: u8 = 0x0E;
pub const OP_BRAKE_WITH_POWER_MANAGEMENT: u8 = 0x13;
pub const OP_GET_CHANNEL_STATUS: u8 = 0x22;

/// Number of output channels on an SBrick
pub const CHANNEL_COUNT: usize = 4;

/// Size of a drive command covering every channel
pub const DRIVE_COMMAND_SIZE: usize = 1 + 3 * CHANNEL_COUNT;

/// Largest command in bytes
pub const MAX_COMMAND_SIZE: usize = DRIVE_COMMAND_SIZE;

/// Errors that can occur while encoding or decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// More channels than the hub has
    TooManyChannels,
    /// Channel id outside 0..CHANNEL_COUNT
    InvalidChannel(u8),
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Response has the wrong length
    InvalidResponse,
}

/// Drive state of a single channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelDrive {
    /// Channel id (0 = A .. 3 = D)
    pub channel: u8,
    /// Direction flag
    pub forward: bool,
    /// Raw magnitude (0..=254)
    pub speed: u8,
}

impl ChannelDrive {
    pub const fn new(channel: u8, forward: bool, speed: u8) -> Self {
        Self {
            channel,
            forward,
            speed,
        }
    }

    /// Stopped channel, sent for channels with nothing configured
    pub const fn idle(channel: u8) -> Self {
        Self::new(channel, false, 0)
    }
}

/// Drive command for all four channels in A..D order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriveCommand {
    pub channels: [ChannelDrive; CHANNEL_COUNT],
}

impl Default for DriveCommand {
    fn default() -> Self {
        Self {
            channels: [
                ChannelDrive::idle(0),
                ChannelDrive::idle(1),
                ChannelDrive::idle(2),
                ChannelDrive::idle(3),
            ],
        }
    }
}

impl DriveCommand {
    /// Set the drive state of one channel
    pub fn set(&mut self, drive: ChannelDrive) -> Result<(), CommandError> {
        let slot = self
            .channels
            .get_mut(usize::from(drive.channel))
            .ok_or(CommandError::InvalidChannel(drive.channel))?;
        *slot = drive;
        Ok(())
    }

    /// Encode to the fixed-size wire form
    pub fn encode(&self) -> [u8; DRIVE_COMMAND_SIZE] {
        let mut bytes = [0u8; DRIVE_COMMAND_SIZE];
        bytes[0] = OP_DRIVE;
        for (chunk, drive) in bytes[1..].chunks_exact_mut(3).zip(self.channels.iter()) {
            chunk[0] = drive.channel;
            chunk[1] = u8::from(drive.forward);
            chunk[2] = drive.speed;
        }
        bytes
    }
}

/// Commands understood by the remote control characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'a> {
    /// Brake the listed channels
    Brake(&'a [u8]),
    /// Drive the listed channels
    Drive(&'a [ChannelDrive]),
    /// Set the watchdog timeout in tenths of a second (0 disables it)
    SetWatchdogTimeout(u8),
    /// Ask for the watchdog timeout; the answer is read back separately
    GetWatchdogTimeout,
    /// Brake the listed channels with power management
    BrakeWithPowerManagement(&'a [u8]),
    /// Ask for the status of the listed channels
    GetChannelStatus(&'a [u8]),
}

impl<'a> Command<'a> {
    /// Opcode of this command
    pub fn opcode(&self) -> u8 {
        match self {
            Command::Brake(_) => OP_BRAKE,
            Command::Drive(_) => OP_DRIVE,
            Command::SetWatchdogTimeout(_) => OP_SET_WATCHDOG_TIMEOUT,
            Command::GetWatchdogTimeout => OP_GET_WATCHDOG_TIMEOUT,
            Command::BrakeWithPowerManagement(_) => OP_BRAKE_WITH_POWER_MANAGEMENT,
            Command::GetChannelStatus(_) => OP_GET_CHANNEL_STATUS,
        }
    }

    /// Encode this command into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, CommandError> {
        let bytes = self.to_vec()?;
        let target = buffer
            .get_mut(..bytes.len())
            .ok_or(CommandError::BufferTooSmall)?;
        target.copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    /// Encode this command into a heapless Vec
    pub fn to_vec(&self) -> Result<Vec<u8, MAX_COMMAND_SIZE>, CommandError> {
        let mut bytes = Vec::new();
        push(&mut bytes, self.opcode())?;

        match self {
            Command::Brake(channels)
            | Command::BrakeWithPowerManagement(channels)
            | Command::GetChannelStatus(channels) => {
                check_channel_count(channels.len())?;
                for &channel in channels.iter() {
                    push(&mut bytes, check_channel(channel)?)?;
                }
            }
            Command::Drive(drives) => {
                check_channel_count(drives.len())?;
                for drive in drives.iter() {
                    push(&mut bytes, check_channel(drive.channel)?)?;
                    push(&mut bytes, u8::from(drive.forward))?;
                    push(&mut bytes, drive.speed)?;
                }
            }
            Command::SetWatchdogTimeout(timeout) => push(&mut bytes, *timeout)?,
            Command::GetWatchdogTimeout => {}
        }

        Ok(bytes)
    }
}

/// Decode the read-back after [`Command::GetWatchdogTimeout`]
pub fn decode_watchdog_timeout(response: &[u8]) -> Result<u8, CommandError> {
    match response {
        [timeout] => Ok(*timeout),
        _ => Err(CommandError::InvalidResponse),
    }
}

fn push(bytes: &mut Vec<u8, MAX_COMMAND_SIZE>, byte: u8) -> Result<(), CommandError> {
    bytes.push(byte).map_err(|_| CommandError::TooManyChannels)
}

fn check_channel_count(count: usize) -> Result<(), CommandError> {
    if count > CHANNEL_COUNT {
        return Err(CommandError::TooManyChannels);
    }
    Ok(())
}

fn check_channel(channel: u8) -> Result<u8, CommandError> {
    if usize::from(channel) >= CHANNEL_COUNT {
        return Err(CommandError::InvalidChannel(channel));
    }
    Ok(channel)
}
