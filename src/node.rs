//! Tick orchestrator: wires the reader, decoder, guard, command parser,
//! scheduler, and indicator into a single-threaded control loop.

use heapless::Vec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::env::{EnvironmentalReader, EnvironmentalSample};
use crate::gnss::{DecoderStats, GeodeticFix, GnssDecoder};
use crate::guard::{FatalCondition, LivenessGuard, SENSOR_FAULT_REANNOUNCE_MS};
use crate::hw::{CommandLink, EnvSensorBus, IndicatorSink, NavReceiver};
use crate::indicator::{IndicatorState, StatusIndicator};
use crate::protocol::{
    self, MessageEncoder, ProtocolError, StatusMessage, CMD_FORCE_TRANSMIT, CMD_SET_INTERVAL,
    FORCE_TRANSMIT_OPTION, MAX_COMMAND_SIZE,
};
use crate::scheduler::{TransmitScheduler, TransmitStats};

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("wire encoding failed: {0}")]
    Encoding(#[from] ProtocolError),
}

/// Lifecycle phase. `Failed` is terminal: the node only re-announces its
/// fault and ignores everything else until a physical reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodePhase {
    Running,
    Failed(FatalCondition),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NodeStats {
    pub ticks: u32,
    pub lines_sent: u32,
    pub commands_accepted: u32,
    pub commands_discarded: u32,
}

/// Point-in-time snapshot of everything observable about the node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NodeState {
    pub phase: NodePhase,
    pub uptime_ms: u64,
    pub fix_valid: bool,
    pub environment: EnvironmentalSample,
    pub fix: GeodeticFix,
    pub interval_ms: u32,
    pub indicator: IndicatorState,
    pub stats: NodeStats,
    pub transmit: TransmitStats,
    pub decoder: DecoderStats,
}

pub struct TelemetryNode<B, R, L, S>
where
    B: EnvSensorBus,
    R: NavReceiver,
    L: CommandLink,
    S: IndicatorSink,
{
    env: EnvironmentalReader<B>,
    decoder: GnssDecoder<R>,
    link: L,
    indicator: StatusIndicator<S>,
    scheduler: TransmitScheduler,
    guard: LivenessGuard,
    encoder: MessageEncoder,
    phase: NodePhase,
    line_buf: Vec<u8, MAX_COMMAND_SIZE>,
    boot_time_ms: u64,
    last_tick_ms: u64,
    last_announce_ms: Option<u64>,
    stats: NodeStats,
}

impl<B, R, L, S> TelemetryNode<B, R, L, S>
where
    B: EnvSensorBus,
    R: NavReceiver,
    L: CommandLink,
    S: IndicatorSink,
{
    pub fn new(bus: B, receiver: R, link: L, sink: S, boot_time_ms: u64) -> Self {
        Self {
            env: EnvironmentalReader::new(bus),
            decoder: GnssDecoder::new(receiver),
            link,
            indicator: StatusIndicator::new(sink),
            scheduler: TransmitScheduler::new(boot_time_ms),
            guard: LivenessGuard::new(boot_time_ms),
            encoder: MessageEncoder::new(),
            phase: NodePhase::Running,
            line_buf: Vec::new(),
            boot_time_ms,
            last_tick_ms: boot_time_ms,
            last_announce_ms: None,
            stats: NodeStats::default(),
        }
    }

    /// One pass of the control loop. `current_time` must be monotone
    /// non-decreasing across calls.
    pub fn tick(&mut self, current_time: u64) -> Result<(), NodeError> {
        self.stats.ticks = self.stats.ticks.wrapping_add(1);
        self.last_tick_ms = current_time;

        if let NodePhase::Failed(condition) = self.phase {
            return self.reannounce(condition, current_time);
        }

        self.env.refresh();
        self.decoder.drain();

        if let Some(condition) = self.guard.check(
            current_time,
            self.env.online(),
            self.decoder.stats().bytes_seen,
        ) {
            self.phase = NodePhase::Failed(condition);
            return self.reannounce(condition, current_time);
        }

        let forced = self.poll_command(current_time)?;
        if forced || self.scheduler.due(current_time) {
            self.transmit(current_time, forced)?;
        }

        self.indicator
            .update(current_time, self.decoder.fix_valid());
        Ok(())
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> NodePhase {
        self.phase
    }

    /// Snapshot for monitoring and logging.
    pub fn state(&self) -> NodeState {
        NodeState {
            phase: self.phase,
            uptime_ms: self.last_tick_ms.saturating_sub(self.boot_time_ms),
            fix_valid: self.decoder.fix_valid(),
            environment: *self.env.sample(),
            fix: *self.decoder.fix(),
            interval_ms: self.scheduler.interval_ms(),
            indicator: self.indicator.state(),
            stats: self.stats,
            transmit: self.scheduler.stats(),
            decoder: self.decoder.stats(),
        }
    }

    /// Read inbound bytes, stopping after at most one complete line. A
    /// second command arriving mid-tick waits for the next tick. Returns
    /// whether an accepted command demands a forced transmission.
    fn poll_command(&mut self, current_time: u64) -> Result<bool, NodeError> {
        loop {
            match self.link.poll_byte() {
                Ok(byte) => {
                    if byte == b'\n' {
                        let forced = self.dispatch_line(current_time)?;
                        self.line_buf.clear();
                        return Ok(forced);
                    }
                    if self.line_buf.push(byte).is_err() {
                        // Oversized garbage; drop what we have. The tail of
                        // the line fails the prefix check on its own.
                        self.line_buf.clear();
                    }
                }
                Err(nb::Error::WouldBlock) => return Ok(false),
                Err(nb::Error::Other(never)) => match never {},
            }
        }
    }

    fn dispatch_line(&mut self, current_time: u64) -> Result<bool, NodeError> {
        let Ok(line) = core::str::from_utf8(&self.line_buf) else {
            self.stats.commands_discarded += 1;
            return Ok(false);
        };
        let Some(request) = protocol::parse_command(line) else {
            self.stats.commands_discarded += 1;
            return Ok(false);
        };

        match (request.code, request.option) {
            (CMD_FORCE_TRANSMIT, FORCE_TRANSMIT_OPTION) => {
                self.stats.commands_accepted += 1;
                self.indicator.pulse_command(current_time);
                Ok(true)
            }
            (CMD_SET_INTERVAL, option) => {
                let accepted = u32::try_from(option)
                    .is_ok_and(|interval| self.scheduler.set_interval(interval));
                if !accepted {
                    self.stats.commands_discarded += 1;
                    return Ok(false);
                }
                self.stats.commands_accepted += 1;
                let line = self
                    .encoder
                    .encode_status(StatusMessage::IntervalChanged(self.scheduler.interval_ms()))?;
                self.link.send_line(line);
                self.stats.lines_sent += 1;
                self.indicator.pulse_command(current_time);
                Ok(false)
            }
            _ => {
                self.stats.commands_discarded += 1;
                Ok(false)
            }
        }
    }

    fn transmit(&mut self, current_time: u64, forced: bool) -> Result<(), NodeError> {
        let line = self
            .encoder
            .encode_data(self.env.sample(), self.decoder.fix())?;
        self.link.send_line(line);
        self.scheduler.mark_sent(current_time, forced);
        self.indicator.pulse_transmit(current_time);
        self.stats.lines_sent += 1;
        Ok(())
    }

    /// Terminal-state reporting: first announcement on the tick that enters
    /// the phase, then at the condition's cadence forever.
    fn reannounce(
        &mut self,
        condition: FatalCondition,
        current_time: u64,
    ) -> Result<(), NodeError> {
        let period = match condition {
            FatalCondition::SensorFailure => SENSOR_FAULT_REANNOUNCE_MS,
            FatalCondition::ReceiverSilent => u64::from(self.scheduler.interval_ms()),
        };
        let due = self
            .last_announce_ms
            .map_or(true, |last| current_time >= last + period);
        if !due {
            return Ok(());
        }

        let status = match condition {
            FatalCondition::SensorFailure => StatusMessage::SensorFailure,
            FatalCondition::ReceiverSilent => StatusMessage::ReceiverSilent,
        };
        let line = self.encoder.encode_status(status)?;
        self.link.send_line(line);
        self.last_announce_ms = Some(current_time);
        self.stats.lines_sent += 1;
        Ok(())
    }
}
