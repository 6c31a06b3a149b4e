//! Command identifiers carried in bytes 2..4 of every frame

use serde::{Deserialize, Serialize};

/// Host to device commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum OutCommand {
    SetButtons = 0x0001,
    SetSmallWindowData = 0x0006,
    SetBrightness = 0x000a,
    SetLabelStyle = 0x000b,
    PartiallyUpdateButtons = 0x000d,
}

impl OutCommand {
    pub const fn code(self) -> u16 {
        self as u16
    }
}

impl From<OutCommand> for u16 {
    fn from(command: OutCommand) -> Self {
        command.code()
    }
}

/// Device to host commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum InCommand {
    Button = 0x0101,
    Button2 = 0x0102,
    DeviceInfo = 0x0303,
}

impl InCommand {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x0101 => Some(InCommand::Button),
            0x0102 => Some(InCommand::Button2),
            0x0303 => Some(InCommand::DeviceInfo),
            _ => None,
        }
    }

    pub const fn code(self) -> u16 {
        self as u16
    }

    pub const fn is_button(self) -> bool {
        matches!(self, InCommand::Button | InCommand::Button2)
    }
}
