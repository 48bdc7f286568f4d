use serde::{Deserialize, Serialize};

use crate::hw::IndicatorSink;

/// Minimum time a transient state stays visible.
pub const PULSE_MS: u64 = 100;

/// Color states in descending priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndicatorState {
    /// Magenta: a recognized command was accepted within the pulse window.
    Command,
    /// Blue: a telemetry frame is going out.
    Transmit,
    /// Green: nominal with a valid fix.
    FixValid,
    /// Red: no valid fix; the fallback state.
    FixInvalid,
}

impl IndicatorState {
    /// Levels for the (red, green, blue) indicator lines.
    pub fn lines(self) -> (bool, bool, bool) {
        match self {
            Self::Command => (true, false, true),
            Self::Transmit => (false, false, true),
            Self::FixValid => (false, true, false),
            Self::FixInvalid => (true, false, false),
        }
    }
}

/// Drives the indicator sink from timestamped pulse holds rather than
/// blocking delays. `update` runs once per tick, after everything else.
#[derive(Debug)]
pub struct StatusIndicator<S: IndicatorSink> {
    sink: S,
    state: IndicatorState,
    command_until: u64,
    transmit_until: u64,
}

impl<S: IndicatorSink> StatusIndicator<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            state: IndicatorState::FixInvalid,
            command_until: 0,
            transmit_until: 0,
        }
    }

    /// Hold command mode for the pulse duration.
    pub fn pulse_command(&mut self, current_time: u64) {
        self.command_until = current_time + PULSE_MS;
    }

    /// Hold transmit mode for the pulse duration, queued behind any active
    /// command hold so both remain visible in sequence.
    pub fn pulse_transmit(&mut self, current_time: u64) {
        self.transmit_until = self.command_until.max(current_time) + PULSE_MS;
    }

    /// Re-derive the color state and push it to the sink.
    pub fn update(&mut self, current_time: u64, fix_valid: bool) {
        self.state = if current_time < self.command_until {
            IndicatorState::Command
        } else if current_time < self.transmit_until {
            IndicatorState::Transmit
        } else if fix_valid {
            IndicatorState::FixValid
        } else {
            IndicatorState::FixInvalid
        };

        let (red, green, blue) = self.state.lines();
        self.sink.set_lines(red, green, blue);
    }

    pub fn state(&self) -> IndicatorState {
        self.state
    }
}
