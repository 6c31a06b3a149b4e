//! Command grammar and reply vocabulary

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use goofydeck_hid_ulanzi_protocol::{BUTTON_COUNT, OutCommand, SmallWindow, SmallWindowMode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a request line could not be turned into a [`Command`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Blank request
    #[error("empty command")]
    Empty,
    /// First word is not a known command
    #[error("unknown command: {0}")]
    Unknown(String),
    /// Required argument absent
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    /// Argument did not parse as a number
    #[error("invalid number for {field}: {value:?}")]
    InvalidNumber {
        /// Argument name
        field: &'static str,
        /// Offending text
        value: String,
    },
    /// Argument parsed but is outside its domain
    #[error("invalid value for {field}: {value:?}")]
    InvalidValue {
        /// Argument name
        field: &'static str,
        /// Offending text
        value: String,
    },
    /// Explicit button command named no usable button
    #[error("no buttons given")]
    NoButtons,
}

impl CommandError {
    /// Reply sent for this parse failure
    pub fn reply(&self) -> Reply {
        match self {
            CommandError::Empty | CommandError::Unknown(_) => Reply::Unknown,
            _ => Reply::Err,
        }
    }
}

/// Which explicit-button command was used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplicitTarget {
    /// `set-buttons-explicit`: buttons 1..=13, full replace
    Grid,
    /// `set-buttons-explicit-14`: buttons 1..=14, full replace
    Full,
    /// `set-partial-explicit`: buttons 1..=13, partial update
    Partial,
}

impl ExplicitTarget {
    /// Highest one-based button number accepted
    pub fn max_button(self) -> usize {
        match self {
            ExplicitTarget::Full => BUTTON_COUNT,
            ExplicitTarget::Grid | ExplicitTarget::Partial => BUTTON_COUNT - 1,
        }
    }

    /// Device command carrying the resulting archive
    pub fn out_command(self) -> OutCommand {
        match self {
            ExplicitTarget::Partial => OutCommand::PartiallyUpdateButtons,
            ExplicitTarget::Grid | ExplicitTarget::Full => OutCommand::SetButtons,
        }
    }

    fn index(self, number: &str) -> Option<usize> {
        let n: usize = number.parse().ok()?;
        (1..=self.max_button()).contains(&n).then(|| n - 1)
    }
}

/// One button assignment from an explicit command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonSpec {
    /// Zero-based button index
    pub index: usize,
    /// Icon file on the daemon host
    pub path: PathBuf,
    /// Label text, empty when none was given
    pub label: String,
}

/// Parsed `--button-N=` / `--label-N=` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonSet {
    /// Command variant
    pub target: ExplicitTarget,
    /// Buttons in first-mention order
    pub buttons: Vec<ButtonSpec>,
}

impl ButtonSet {
    /// Parse space separated flags. Out of range numbers, empty values and
    /// unrecognised words are skipped; a repeated `--button-N` replaces the
    /// earlier path.
    pub fn parse<'a>(
        target: ExplicitTarget,
        args: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, CommandError> {
        let mut order: Vec<usize> = Vec::new();
        let mut paths: BTreeMap<usize, PathBuf> = BTreeMap::new();
        let mut labels: BTreeMap<usize, String> = BTreeMap::new();

        for arg in args {
            if let Some((number, path)) = arg.strip_prefix("--button-").and_then(|r| r.split_once('='))
                && let Some(index) = target.index(number)
                && !path.is_empty()
            {
                if paths.insert(index, PathBuf::from(path)).is_none() {
                    order.push(index);
                }
            } else if let Some((number, text)) =
                arg.strip_prefix("--label-").and_then(|r| r.split_once('='))
                && let Some(index) = target.index(number)
                && !text.is_empty()
            {
                labels.insert(index, text.to_string());
            }
        }

        let buttons: Vec<ButtonSpec> = order
            .into_iter()
            .filter_map(|index| {
                let path = paths.remove(&index)?;
                let label = if index + 1 == BUTTON_COUNT {
                    String::new()
                } else {
                    labels.remove(&index).unwrap_or_default()
                };
                Some(ButtonSpec { index, path, label })
            })
            .collect();

        if buttons.is_empty() {
            return Err(CommandError::NoButtons);
        }
        Ok(Self { target, buttons })
    }
}

/// A control request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Liveness and device presence check
    Ping,
    /// Brightness, clamped to 0..=100 when encoded
    SetBrightness(i64),
    /// Small-window contents with a caller supplied clock string
    SetSmallWindow {
        /// Mode and numbers
        window: SmallWindow,
        /// `HH:MM:SS` text shown by the device
        clock: String,
    },
    /// Label style JSON file
    SetLabelStyle(PathBuf),
    /// Prebuilt ZIP file to re-wrap and upload
    SetButtons(PathBuf),
    /// Icon files assembled into an archive by the daemon
    SetButtonsExplicit(ButtonSet),
    /// Become the event subscriber
    ReadButtons,
}

impl Command {
    /// Parse one request line
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map(|(v, r)| (v, r.trim()))
            .unwrap_or((line, ""));

        match verb {
            "" => Err(CommandError::Empty),
            "ping" => Ok(Command::Ping),
            "read-buttons" => Ok(Command::ReadButtons),
            "set-brightness" => {
                let value = rest
                    .split_whitespace()
                    .next()
                    .ok_or(CommandError::MissingArgument("level"))?;
                Ok(Command::SetBrightness(number("level", value)?))
            }
            "set-small-window" => parse_small_window(rest),
            "set-label-style" => Ok(Command::SetLabelStyle(path_arg(rest)?)),
            "set-buttons" => Ok(Command::SetButtons(path_arg(rest)?)),
            "set-buttons-explicit" => explicit(ExplicitTarget::Grid, rest),
            "set-buttons-explicit-14" => explicit(ExplicitTarget::Full, rest),
            "set-partial-explicit" => explicit(ExplicitTarget::Partial, rest),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }

    /// Whether the command needs an open device
    pub fn requires_device(&self) -> bool {
        !matches!(self, Command::Ping | Command::ReadButtons)
    }
}

fn number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, CommandError> {
    value.parse().map_err(|_| CommandError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn path_arg(rest: &str) -> Result<PathBuf, CommandError> {
    if rest.is_empty() {
        return Err(CommandError::MissingArgument("path"));
    }
    Ok(PathBuf::from(rest))
}

fn explicit(target: ExplicitTarget, rest: &str) -> Result<Command, CommandError> {
    ButtonSet::parse(target, rest.split_whitespace()).map(Command::SetButtonsExplicit)
}

/// `<mode> <cpu> <mem> <HH:MM:SS> <gpu>`; trailing fields may be omitted.
fn parse_small_window(rest: &str) -> Result<Command, CommandError> {
    let mut fields = rest.split_whitespace();
    let mut window = SmallWindow::default();
    let mut clock = "00:00:00".to_string();

    if let Some(mode) = fields.next() {
        let code: u8 = number("mode", mode)?;
        window.mode = SmallWindowMode::from_code(code).ok_or_else(|| CommandError::InvalidValue {
            field: "mode",
            value: mode.to_string(),
        })?;
    }
    if let Some(cpu) = fields.next() {
        window.cpu = number("cpu", cpu)?;
    }
    if let Some(mem) = fields.next() {
        window.mem = number("mem", mem)?;
    }
    if let Some(time) = fields.next() {
        if time.contains('|') {
            return Err(CommandError::InvalidValue {
                field: "time",
                value: time.to_string(),
            });
        }
        clock = time.to_string();
    }
    if let Some(gpu) = fields.next() {
        window.gpu = number("gpu", gpu)?;
    }
    Ok(Command::SetSmallWindow { window, clock })
}

/// Reply line for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    /// `ok`
    Ok,
    /// `err`
    Err,
    /// `err no_device`
    NoDevice,
    /// `unknown`
    Unknown,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Reply::Ok => "ok",
            Reply::Err => "err",
            Reply::NoDevice => "err no_device",
            Reply::Unknown => "unknown",
        })
    }
}

/// Device presence change pushed to the subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceEvent {
    /// `evt connected`
    Connected,
    /// `evt disconnected`
    Disconnected,
}

impl fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceEvent::Connected => "evt connected",
            DeviceEvent::Disconnected => "evt disconnected",
        })
    }
}
