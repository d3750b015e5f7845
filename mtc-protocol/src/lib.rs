//! SBrick Remote Control Protocol
//!
//! This crate defines the byte format written to the SBrick remote control
//! GATT characteristic. It knows nothing about BLE or channel ramping; it
//! only turns commands into bytes and responses back into values.
//!
//! # Command Overview
//!
//! Every command is a single write to the remote control characteristic:
//! ```text
//! ┌────────┬──────────────────────────────┐
//! │ OPCODE │ ARGUMENTS                    │
//! │ 1B     │ 0-12B                        │
//! └────────┴──────────────────────────────┘
//! ```
//!
//! A drive command carries one `(channel, direction, speed)` triple per
//! channel. The hub brakes all outputs on its own when no command arrives
//! within the watchdog timeout, so drive commands are sent continuously.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod speed;

pub use command::{
    decode_watchdog_timeout, ChannelDrive, Command, CommandError, DriveCommand, CHANNEL_COUNT,
    DRIVE_COMMAND_SIZE, MAX_COMMAND_SIZE,
};
pub use speed::{percent_to_raw, MAX_RAW_SPEED};
