//! Wire format: the composite data line, status lines, and the inbound
//! command protocol.
//!
//! Every line is ASCII, comma-separated, newline-terminated, and starts with
//! one of the three `$MTGN*` prefixes. Any data field may independently be
//! the [`NOT_AVAILABLE`] sentinel; consumers treat that as "omitted", never
//! as zero.

use arrayvec::ArrayString;
use core::fmt::Write;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;
use thiserror::Error;

use crate::env::EnvironmentalSample;
use crate::gnss::GeodeticFix;

/// Prefix of the outbound composite data line.
pub const DATA_PREFIX: &str = "$MTGNO";
/// Prefix of outbound status lines.
pub const STATUS_PREFIX: &str = "$MTGNS";
/// Prefix of inbound command lines.
pub const COMMAND_PREFIX: &str = "$MTGNI";

/// Placeholder token for any field currently unavailable.
pub const NOT_AVAILABLE: &str = "NAN";

/// Inbound command code: transmit immediately, bypassing the schedule.
pub const CMD_FORCE_TRANSMIT: i32 = 0;
/// Inbound command code: adopt a new transmission interval.
pub const CMD_SET_INTERVAL: i32 = 1;
/// Option value that arms a force-transmit request.
pub const FORCE_TRANSMIT_OPTION: i32 = 1;

pub const MAX_LINE_SIZE: usize = 160;
pub const MAX_COMMAND_SIZE: usize = 48;

// Eleven data fields behind the prefix, each a comma plus at most
// MAX_FIELD_WIDTH rendered characters, then the terminator.
const MAX_FIELD_WIDTH: usize = 12;
const_assert!(MAX_LINE_SIZE >= DATA_PREFIX.len() + 11 * (MAX_FIELD_WIDTH + 1) + 1);
const_assert!(MAX_COMMAND_SIZE >= COMMAND_PREFIX.len() + 2 * (MAX_FIELD_WIDTH + 1) + 1);

pub type LineBuffer = ArrayString<MAX_LINE_SIZE>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A rendered line exceeded its fixed buffer.
    #[error("line buffer overflow")]
    LineOverflow,
}

impl From<core::fmt::Error> for ProtocolError {
    fn from(_: core::fmt::Error) -> Self {
        ProtocolError::LineOverflow
    }
}

impl<T> From<arrayvec::CapacityError<T>> for ProtocolError {
    fn from(_: arrayvec::CapacityError<T>) -> Self {
        ProtocolError::LineOverflow
    }
}

/// A telemetry field that is independently present or absent.
///
/// Absent projects to [`NOT_AVAILABLE`] on the wire. It never reads as zero,
/// and it never aborts a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Field<T> {
    Available(T),
    #[default]
    Unavailable,
}

impl<T> Field<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Field::Available(_))
    }
}

impl Field<f32> {
    /// Non-finite readings would render as `NaN`/`inf` and corrupt the line
    /// format, so they project to the sentinel instead.
    pub fn from_reading(value: f32) -> Self {
        if value.is_finite() {
            Field::Available(value)
        } else {
            Field::Unavailable
        }
    }
}

/// A parsed inbound command: code plus one integer option. Constructed per
/// line, consumed immediately, discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub code: i32,
    pub option: i32,
}

/// Parse one inbound line. Returns `None` unless the first comma-delimited
/// token is exactly [`COMMAND_PREFIX`]; mismatches are discarded silently.
/// Malformed numeric fields parse to 0 and fall through to the dispatch
/// guards, so a garbled line degrades to a no-op rather than an error.
pub fn parse_command(line: &str) -> Option<CommandRequest> {
    let mut fields = line.trim_end_matches(|c| c == '\r' || c == '\n').split(',');
    if fields.next() != Some(COMMAND_PREFIX) {
        return None;
    }
    let code = fields.next().map_or(0, parse_int);
    let option = fields.next().map_or(0, parse_int);
    Some(CommandRequest { code, option })
}

fn parse_int(field: &str) -> i32 {
    field.trim().parse().unwrap_or(0)
}

/// Status lines the node can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusMessage {
    /// Environmental sensor never answered; terminal.
    SensorFailure,
    /// Navigation receiver stayed silent through the startup deadline; terminal.
    ReceiverSilent,
    /// Interval-change acknowledgment carrying the adopted value.
    IntervalChanged(u32),
}

/// Renders snapshots into wire lines using one preallocated buffer.
///
/// Rendering is a pure projection of the current field values, so repeated
/// calls with unchanged inputs produce byte-identical lines.
#[derive(Debug, Default)]
pub struct MessageEncoder {
    line: LineBuffer,
}

impl MessageEncoder {
    pub fn new() -> Self {
        Self {
            line: LineBuffer::new(),
        }
    }

    /// Render the composite data line: environmental fields first, then the
    /// geodetic fields in fixed order.
    pub fn encode_data(
        &mut self,
        env: &EnvironmentalSample,
        fix: &GeodeticFix,
    ) -> Result<&str, ProtocolError> {
        self.line.clear();
        self.line.try_push_str(DATA_PREFIX)?;
        write_decimal(&mut self.line, env.temperature_c, 1)?;
        write_decimal(&mut self.line, env.pressure_hpa, 1)?;
        write_decimal(&mut self.line, env.humidity_pct, 1)?;
        write_decimal(&mut self.line, env.altitude_m, 1)?;
        write_decimal(&mut self.line, fix.longitude_deg, 6)?;
        write_decimal(&mut self.line, fix.latitude_deg, 6)?;
        write_decimal(&mut self.line, fix.altitude_m, 1)?;
        write_decimal(&mut self.line, fix.dop, 1)?;
        write_integer(&mut self.line, fix.epoch_seconds)?;
        write_integer(&mut self.line, fix.satellites_in_use)?;
        write_integer(&mut self.line, fix.satellites_visible)?;
        self.line.try_push('\n')?;
        Ok(self.line.as_str())
    }

    /// Render a status line.
    pub fn encode_status(&mut self, status: StatusMessage) -> Result<&str, ProtocolError> {
        self.line.clear();
        match status {
            StatusMessage::SensorFailure => write!(self.line, "{STATUS_PREFIX},ERR,BME")?,
            StatusMessage::ReceiverSilent => write!(self.line, "{STATUS_PREFIX},ERR,GNSS")?,
            StatusMessage::IntervalChanged(interval_ms) => {
                write!(self.line, "{STATUS_PREFIX},INTERVAL,{interval_ms}")?;
            }
        }
        self.line.try_push('\n')?;
        Ok(self.line.as_str())
    }
}

fn write_decimal<T: core::fmt::Display>(
    line: &mut LineBuffer,
    field: Field<T>,
    decimals: usize,
) -> Result<(), ProtocolError> {
    match field {
        Field::Available(value) => write!(line, ",{value:.decimals$}")?,
        Field::Unavailable => write!(line, ",{NOT_AVAILABLE}")?,
    }
    Ok(())
}

fn write_integer<T: core::fmt::Display>(
    line: &mut LineBuffer,
    field: Field<T>,
) -> Result<(), ProtocolError> {
    match field {
        Field::Available(value) => write!(line, ",{value}")?,
        Field::Unavailable => write!(line, ",{NOT_AVAILABLE}")?,
    }
    Ok(())
}
