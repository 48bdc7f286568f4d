//! Incremental GNSS fix decoder.
//!
//! Drains the receiver byte stream each tick; a completed sentence is the
//! only state-transition trigger. Validity is sticky across sentences until
//! a boundary DOP or a zero in-use count forces it false, and a false
//! verdict always scrubs the coordinate fields so a stale position is never
//! reported as current.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::hw::NavReceiver;
use crate::protocol::Field;

// DOP values receivers emit when no solution exists, even though the field
// itself parses as valid.
const DOP_NO_SOLUTION_LOW: f32 = 0.0;
const DOP_NO_SOLUTION_HIGH: f32 = 100.0;

/// Position/time/quality fields of the current solution. Each field is
/// independently present or absent; partial availability is the normal case.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeodeticFix {
    pub longitude_deg: Field<f64>,
    pub latitude_deg: Field<f64>,
    /// Receiver-reported altitude, distinct from barometric altitude.
    pub altitude_m: Field<f32>,
    /// Horizontal dilution of precision.
    pub dop: Field<f32>,
    /// Seconds since 1970-01-01T00:00:00Z, from receiver date+time.
    pub epoch_seconds: Field<i64>,
    pub satellites_in_use: Field<u8>,
    /// Sum of the per-constellation visible counts; independent of in-use.
    pub satellites_visible: Field<u16>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DecoderStats {
    /// Cumulative receiver bytes pumped; doubles as the startup liveness
    /// counter.
    pub bytes_seen: u32,
    pub sentences_completed: u32,
}

#[derive(Debug)]
pub struct GnssDecoder<R: NavReceiver> {
    receiver: R,
    fix: GeodeticFix,
    fix_available: bool,
    stats: DecoderStats,
}

impl<R: NavReceiver> GnssDecoder<R> {
    pub fn new(receiver: R) -> Self {
        Self {
            receiver,
            fix: GeodeticFix::default(),
            fix_available: false,
            stats: DecoderStats::default(),
        }
    }

    /// Pump every pending receiver byte, applying each completed sentence.
    pub fn drain(&mut self) {
        loop {
            match self.receiver.advance() {
                Ok(completed) => {
                    self.stats.bytes_seen = self.stats.bytes_seen.saturating_add(1);
                    if completed {
                        self.stats.sentences_completed =
                            self.stats.sentences_completed.wrapping_add(1);
                        self.apply_sentence();
                    }
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(never)) => match never {},
            }
        }
    }

    fn apply_sentence(&mut self) {
        // Epoch: date and time must both be valid to compute it.
        self.fix.epoch_seconds = if self.receiver.date_valid() && self.receiver.time_valid() {
            let (year, month, day) = self.receiver.date_ymd();
            let (hour, minute, second) = self.receiver.time_hms();
            match epoch_seconds(year, month, day, hour, minute, second) {
                Some(epoch) => Field::Available(epoch),
                None => Field::Unavailable,
            }
        } else {
            Field::Unavailable
        };

        // A fresh, valid position makes the fix tentatively available.
        // A repeat of an earlier position does not.
        if self.receiver.position_valid() && self.receiver.position_updated() {
            self.fix.longitude_deg = Field::Available(self.receiver.longitude_deg());
            self.fix.latitude_deg = Field::Available(self.receiver.latitude_deg());
            self.fix.altitude_m = if self.receiver.altitude_valid() {
                Field::Available(self.receiver.altitude_m())
            } else {
                Field::Unavailable
            };
            self.fix_available = true;
        }

        // Boundary DOP means the receiver has no solution. An invalid DOP
        // only sentinels the field; it does not impeach the fix.
        if self.receiver.dop_valid() {
            let dop = self.receiver.dop();
            self.fix.dop = Field::Available(dop);
            if dop == DOP_NO_SOLUTION_LOW || dop == DOP_NO_SOLUTION_HIGH {
                self.fix_available = false;
            }
        } else {
            self.fix.dop = Field::Unavailable;
        }

        // Aggregate visibility across constellations. Deliberately not
        // reconciled against satellites-in-use.
        let mut visible: u16 = 0;
        for count in self.receiver.visible_counts() {
            visible += u16::from(count);
        }
        self.fix.satellites_visible = Field::Available(visible);

        if self.receiver.satellites_valid() {
            let in_use = self.receiver.satellites_in_use();
            self.fix.satellites_in_use = Field::Available(in_use);
            if in_use == 0 {
                self.fix_available = false;
            }
        } else {
            self.fix.satellites_in_use = Field::Unavailable;
        }

        // Never let stale coordinates outlive an invalidation.
        if !self.fix_available {
            self.fix.longitude_deg = Field::Unavailable;
            self.fix.latitude_deg = Field::Unavailable;
            self.fix.altitude_m = Field::Unavailable;
        }
    }

    /// Current solution snapshot.
    pub fn fix(&self) -> &GeodeticFix {
        &self.fix
    }

    /// Validity verdict for the current solution. Whenever this is false,
    /// the coordinate fields are already sentineled.
    pub fn fix_valid(&self) -> bool {
        self.fix_available
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }
}

/// UTC calendar fields to seconds since the epoch. `None` for impossible
/// dates or times and for anything before 1970.
fn epoch_seconds(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Option<i64> {
    let timestamp = NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))?
        .and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second))?
        .and_utc()
        .timestamp();
    (timestamp >= 0).then_some(timestamp)
}
