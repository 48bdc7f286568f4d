//! Environmental sensor reader.
//!
//! Pulls instantaneous readings from the sensor bus once per tick and owns
//! the current sample. Per-call read failures are not surfaced; a persistent
//! fault reads like an implausible value and passes through. Only the init
//! probe distinguishes a dead sensor, and the node treats that as fatal.

use serde::{Deserialize, Serialize};

use crate::hw::EnvSensorBus;
use crate::protocol::Field;

/// Sea-level reference handed to the bus for barometric altitude.
pub const SEA_LEVEL_PRESSURE_HPA: f32 = 1013.25;

const PA_PER_HPA: f32 = 100.0;

/// Instantaneous environmental readings, refreshed every tick. No history is
/// kept; the encoder reads whatever the most recent refresh produced.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvironmentalSample {
    pub temperature_c: Field<f32>,
    pub pressure_hpa: Field<f32>,
    pub humidity_pct: Field<f32>,
    pub altitude_m: Field<f32>,
}

#[derive(Debug)]
pub struct EnvironmentalReader<B: EnvSensorBus> {
    bus: B,
    online: bool,
    sample: EnvironmentalSample,
}

impl<B: EnvSensorBus> EnvironmentalReader<B> {
    /// Probe the sensor once and wrap the bus. A failed probe leaves the
    /// reader offline permanently.
    pub fn new(mut bus: B) -> Self {
        let online = bus.begin();
        Self {
            bus,
            online,
            sample: EnvironmentalSample::default(),
        }
    }

    pub fn online(&self) -> bool {
        self.online
    }

    /// Re-read all four quantities and overwrite the current sample. An
    /// offline bus is never read; the sample stays fully sentineled.
    pub fn refresh(&mut self) -> &EnvironmentalSample {
        if !self.online {
            return &self.sample;
        }
        self.sample.temperature_c = Field::from_reading(self.bus.temperature_c());
        self.sample.pressure_hpa = Field::from_reading(self.bus.pressure_pa() / PA_PER_HPA);
        self.sample.humidity_pct = Field::from_reading(self.bus.humidity_pct());
        self.sample.altitude_m = Field::from_reading(self.bus.altitude_m(SEA_LEVEL_PRESSURE_HPA));
        &self.sample
    }

    pub fn sample(&self) -> &EnvironmentalSample {
        &self.sample
    }
}
