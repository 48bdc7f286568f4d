//! Collaborator traits for the hardware seams.
//!
//! The node is generic over these four traits, so the same logic runs against
//! real peripherals or the simulated collaborators in [`crate::sim`].
//! Non-blocking polls use [`nb`]: `WouldBlock` means "nothing pending right
//! now", never an error.

use core::convert::Infallible;

/// Number of constellation-specific visible-satellite sub-counts a receiver
/// reports: GPS, GLONASS, Galileo, BeiDou, QZSS, NavIC.
pub const CONSTELLATION_COUNT: usize = 6;

/// Environmental sensor bus (temperature / pressure / humidity / altitude).
pub trait EnvSensorBus {
    /// Probe and initialize the sensor. Returns false when the device does
    /// not answer; the node treats that as fatal.
    fn begin(&mut self) -> bool;

    fn temperature_c(&mut self) -> f32;

    /// Raw pressure in pascals; the reader converts to hPa.
    fn pressure_pa(&mut self) -> f32;

    fn humidity_pct(&mut self) -> f32;

    /// Barometric altitude relative to the given sea-level reference.
    fn altitude_m(&mut self, sea_level_hpa: f32) -> f32;
}

/// Sentence-oriented navigation receiver.
///
/// [`advance`](NavReceiver::advance) pumps one pending byte through the
/// receiver's own framing; the named accessors expose the fields of the most
/// recently completed sentences. Accessor pairs follow the usual receiver
/// library convention: `*_valid` reports whether the value has ever been
/// populated from a well-formed field.
pub trait NavReceiver {
    /// Feed one pending byte. `Ok(true)` when that byte completed a sentence,
    /// `Err(WouldBlock)` when nothing is pending.
    fn advance(&mut self) -> nb::Result<bool, Infallible>;

    fn position_valid(&self) -> bool;

    /// True when the most recently completed sentence refreshed the position,
    /// as opposed to repeating an earlier value.
    fn position_updated(&self) -> bool;

    fn longitude_deg(&self) -> f64;
    fn latitude_deg(&self) -> f64;

    fn altitude_valid(&self) -> bool;
    fn altitude_m(&self) -> f32;

    fn date_valid(&self) -> bool;
    /// Calendar date as (year, month, day).
    fn date_ymd(&self) -> (u16, u8, u8);

    fn time_valid(&self) -> bool;
    /// UTC time of day as (hour, minute, second).
    fn time_hms(&self) -> (u8, u8, u8);

    fn dop_valid(&self) -> bool;
    /// Horizontal dilution of precision.
    fn dop(&self) -> f32;

    fn satellites_valid(&self) -> bool;
    fn satellites_in_use(&self) -> u8;

    /// Most recent visible-satellite counts, one slot per constellation.
    fn visible_counts(&self) -> [u8; CONSTELLATION_COUNT];
}

/// Duplex character channel: transmissions leave on it, commands arrive on it.
pub trait CommandLink {
    /// Poll one inbound byte. `Err(WouldBlock)` when nothing is pending.
    fn poll_byte(&mut self) -> nb::Result<u8, Infallible>;

    /// Hand a complete, newline-terminated line to the transport. Transport
    /// errors stay inside the link; the node has no channel to report them on.
    fn send_line(&mut self, line: &str);
}

/// Three independent on/off color lines behind the status indicator.
pub trait IndicatorSink {
    fn set_lines(&mut self, red: bool, green: bool, blue: bool);
}
