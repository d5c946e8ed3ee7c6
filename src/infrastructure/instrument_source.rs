// Instrument source - DM3058E readings as dashboard samples
use serde::Deserialize;
use std::io::{Read, Write};

use crate::application::sample_source::SampleSource;
use crate::domain::sample::Sample;
use crate::infrastructure::scpi::ScpiSession;

const MEAS_VOLT_DC: &str = "MEAS:VOLT:DC?";
const MEAS_CURR_DC: &str = "MEAS:CURR:DC?";
const RETURN_TO_LOCAL: &str = "SYST:LOC";

/// How the two channels are obtained from a single-input meter.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MeasureMode {
    /// Voltage across a known shunt; current = V / R
    Shunt,
    /// DC volts then DC amps each tick; the leads are moved by hand
    Alternate,
    /// DC volts only; current reads as zero
    Voltage,
}

pub struct InstrumentSource<T: Read + Write> {
    session: ScpiSession<T>,
    identity: String,
    mode: MeasureMode,
    shunt_ohms: f64,
}

impl<T: Read + Write> InstrumentSource<T> {
    pub fn new(session: ScpiSession<T>, identity: String, mode: MeasureMode, shunt_ohms: f64) -> Self {
        Self {
            session,
            identity,
            mode,
            shunt_ohms,
        }
    }
}

impl<T: Read + Write> SampleSource for InstrumentSource<T> {
    fn next_sample(&mut self, _t: f64) -> anyhow::Result<Sample> {
        let voltage = self.session.query_f64(MEAS_VOLT_DC)?;
        let current = match self.mode {
            MeasureMode::Shunt => voltage / self.shunt_ohms,
            MeasureMode::Alternate => self.session.query_f64(MEAS_CURR_DC)?,
            MeasureMode::Voltage => 0.0,
        };
        Ok(Sample::new(voltage, current))
    }

    fn name(&self) -> &str {
        "DM3058E"
    }

    fn identity(&self) -> Option<&str> {
        Some(&self.identity)
    }
}

impl<T: Read + Write> Drop for InstrumentSource<T> {
    fn drop(&mut self) {
        // Hand the front panel back to the user.
        if let Err(e) = self.session.write(RETURN_TO_LOCAL) {
            tracing::warn!("Failed to return {} to local control: {}", self.session.resource(), e);
        }
    }
}
