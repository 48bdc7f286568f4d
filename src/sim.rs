//! Simulated hardware collaborators for tests and host-side simulation.
//!
//! Each type is a cheap cloneable handle over shared interior state, so a
//! test or simulator task can keep one handle and give another to the node.

use core::convert::Infallible;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::hw::{CommandLink, EnvSensorBus, IndicatorSink, NavReceiver, CONSTELLATION_COUNT};

#[derive(Debug)]
struct EnvInner {
    temperature_c: f32,
    pressure_pa: f32,
    humidity_pct: f32,
    altitude_m: f32,
    init_ok: bool,
}

/// Environmental sensor stand-in with bench-typical defaults.
#[derive(Debug, Clone)]
pub struct SimEnvSensor {
    inner: Arc<Mutex<EnvInner>>,
}

impl Default for SimEnvSensor {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EnvInner {
                temperature_c: 21.5,
                pressure_pa: 101_320.0,
                humidity_pct: 40.3,
                altitude_m: 0.0,
                init_ok: true,
            })),
        }
    }
}

impl SimEnvSensor {
    pub fn set_temperature_c(&self, value: f32) {
        self.inner.lock().unwrap().temperature_c = value;
    }

    pub fn set_pressure_pa(&self, value: f32) {
        self.inner.lock().unwrap().pressure_pa = value;
    }

    pub fn set_humidity_pct(&self, value: f32) {
        self.inner.lock().unwrap().humidity_pct = value;
    }

    pub fn set_altitude_m(&self, value: f32) {
        self.inner.lock().unwrap().altitude_m = value;
    }

    /// Make the init probe fail, as a miswired bus would.
    pub fn fail_init(&self) {
        self.inner.lock().unwrap().init_ok = false;
    }
}

impl EnvSensorBus for SimEnvSensor {
    fn begin(&mut self) -> bool {
        self.inner.lock().unwrap().init_ok
    }

    fn temperature_c(&mut self) -> f32 {
        self.inner.lock().unwrap().temperature_c
    }

    fn pressure_pa(&mut self) -> f32 {
        self.inner.lock().unwrap().pressure_pa
    }

    fn humidity_pct(&mut self) -> f32 {
        self.inner.lock().unwrap().humidity_pct
    }

    fn altitude_m(&mut self, _sea_level_hpa: f32) -> f32 {
        self.inner.lock().unwrap().altitude_m
    }
}

/// One scripted receiver sentence. `Some` fields are applied (and latched)
/// when the final byte is pumped; `None` fields leave earlier values in
/// place, like a sentence type that does not carry them. `visible_counts`
/// is applied wholesale every sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct SimSentence {
    /// Synthetic length; `advance` yields this many bytes, the last of
    /// which completes the sentence.
    pub byte_len: u16,
    /// (longitude, latitude) in decimal degrees; marks the position fresh.
    pub position: Option<(f64, f64)>,
    pub altitude_m: Option<f32>,
    /// (year, month, day, hour, minute, second), UTC.
    pub date_time: Option<(u16, u8, u8, u8, u8, u8)>,
    pub dop: Option<f32>,
    pub satellites_in_use: Option<u8>,
    pub visible_counts: [u8; CONSTELLATION_COUNT],
}

impl Default for SimSentence {
    fn default() -> Self {
        Self {
            byte_len: 72,
            position: None,
            altitude_m: None,
            date_time: None,
            dop: None,
            satellites_in_use: None,
            visible_counts: [0; CONSTELLATION_COUNT],
        }
    }
}

#[derive(Debug, Default)]
struct NavInner {
    queue: VecDeque<SimSentence>,
    in_flight: Option<(SimSentence, u16)>,
    position: Option<(f64, f64)>,
    position_updated: bool,
    altitude_m: Option<f32>,
    date_time: Option<(u16, u8, u8, u8, u8, u8)>,
    dop: Option<f32>,
    satellites_in_use: Option<u8>,
    visible_counts: [u8; CONSTELLATION_COUNT],
}

impl NavInner {
    fn apply(&mut self, sentence: &SimSentence) {
        if let Some(position) = sentence.position {
            self.position = Some(position);
            self.position_updated = true;
        } else {
            self.position_updated = false;
        }
        if let Some(altitude) = sentence.altitude_m {
            self.altitude_m = Some(altitude);
        }
        if let Some(date_time) = sentence.date_time {
            self.date_time = Some(date_time);
        }
        if let Some(dop) = sentence.dop {
            self.dop = Some(dop);
        }
        if let Some(in_use) = sentence.satellites_in_use {
            self.satellites_in_use = Some(in_use);
        }
        self.visible_counts = sentence.visible_counts;
    }
}

/// Navigation receiver stand-in fed from a script of sentences.
#[derive(Debug, Clone, Default)]
pub struct SimNavReceiver {
    inner: Arc<Mutex<NavInner>>,
}

impl SimNavReceiver {
    /// Queue a sentence; its bytes become pumpable immediately.
    pub fn push_sentence(&self, sentence: SimSentence) {
        self.inner.lock().unwrap().queue.push_back(sentence);
    }
}

impl NavReceiver for SimNavReceiver {
    fn advance(&mut self) -> nb::Result<bool, Infallible> {
        let mut inner = self.inner.lock().unwrap();

        if inner.in_flight.is_none() {
            let next = inner.queue.pop_front();
            inner.in_flight = next.map(|sentence| {
                let remaining = sentence.byte_len.max(1);
                (sentence, remaining)
            });
        }

        let completed = match inner.in_flight.as_mut() {
            None => return Err(nb::Error::WouldBlock),
            Some((_, remaining)) => {
                *remaining -= 1;
                *remaining == 0
            }
        };

        if completed {
            if let Some((sentence, _)) = inner.in_flight.take() {
                inner.apply(&sentence);
            }
            return Ok(true);
        }
        Ok(false)
    }

    fn position_valid(&self) -> bool {
        self.inner.lock().unwrap().position.is_some()
    }

    fn position_updated(&self) -> bool {
        self.inner.lock().unwrap().position_updated
    }

    fn longitude_deg(&self) -> f64 {
        self.inner.lock().unwrap().position.map_or(0.0, |p| p.0)
    }

    fn latitude_deg(&self) -> f64 {
        self.inner.lock().unwrap().position.map_or(0.0, |p| p.1)
    }

    fn altitude_valid(&self) -> bool {
        self.inner.lock().unwrap().altitude_m.is_some()
    }

    fn altitude_m(&self) -> f32 {
        self.inner.lock().unwrap().altitude_m.unwrap_or(0.0)
    }

    fn date_valid(&self) -> bool {
        self.inner.lock().unwrap().date_time.is_some()
    }

    fn date_ymd(&self) -> (u16, u8, u8) {
        let (year, month, day, _, _, _) =
            self.inner.lock().unwrap().date_time.unwrap_or_default();
        (year, month, day)
    }

    fn time_valid(&self) -> bool {
        self.inner.lock().unwrap().date_time.is_some()
    }

    fn time_hms(&self) -> (u8, u8, u8) {
        let (_, _, _, hour, minute, second) =
            self.inner.lock().unwrap().date_time.unwrap_or_default();
        (hour, minute, second)
    }

    fn dop_valid(&self) -> bool {
        self.inner.lock().unwrap().dop.is_some()
    }

    fn dop(&self) -> f32 {
        self.inner.lock().unwrap().dop.unwrap_or(0.0)
    }

    fn satellites_valid(&self) -> bool {
        self.inner.lock().unwrap().satellites_in_use.is_some()
    }

    fn satellites_in_use(&self) -> u8 {
        self.inner.lock().unwrap().satellites_in_use.unwrap_or(0)
    }

    fn visible_counts(&self) -> [u8; CONSTELLATION_COUNT] {
        self.inner.lock().unwrap().visible_counts
    }
}

#[derive(Debug, Default)]
struct LinkInner {
    inbound: VecDeque<u8>,
    sent: Vec<String>,
}

/// Duplex serial link stand-in: scripted inbound bytes, captured outbound
/// lines.
#[derive(Debug, Clone, Default)]
pub struct SimLink {
    inner: Arc<Mutex<LinkInner>>,
}

impl SimLink {
    /// Queue raw inbound bytes for the node to poll.
    pub fn inject(&self, bytes: &[u8]) {
        self.inner
            .lock()
            .unwrap()
            .inbound
            .extend(bytes.iter().copied());
    }

    /// Queue an inbound line exactly as it would arrive off the wire.
    pub fn inject_line(&self, line: &str) {
        self.inject(line.as_bytes());
    }

    /// Drain everything the node has sent since the last call.
    pub fn take_sent(&self) -> Vec<String> {
        std::mem::take(&mut self.inner.lock().unwrap().sent)
    }
}

impl CommandLink for SimLink {
    fn poll_byte(&mut self) -> nb::Result<u8, Infallible> {
        self.inner
            .lock()
            .unwrap()
            .inbound
            .pop_front()
            .ok_or(nb::Error::WouldBlock)
    }

    fn send_line(&mut self, line: &str) {
        self.inner.lock().unwrap().sent.push(line.to_string());
    }
}

/// Tri-color indicator stand-in recording the last line levels.
#[derive(Debug, Clone, Default)]
pub struct SimIndicator {
    lines: Arc<Mutex<(bool, bool, bool)>>,
}

impl SimIndicator {
    /// Last (red, green, blue) levels pushed by the node.
    pub fn lines(&self) -> (bool, bool, bool) {
        *self.lines.lock().unwrap()
    }
}

impl IndicatorSink for SimIndicator {
    fn set_lines(&mut self, red: bool, green: bool, blue: bool) {
        *self.lines.lock().unwrap() = (red, green, blue);
    }
}
