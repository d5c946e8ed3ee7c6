// Synthetic source - Sine plus uniform noise around the nominal values
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;

use crate::application::sample_source::SampleSource;
use crate::domain::sample::Sample;
use crate::domain::status::Thresholds;

const VOLTAGE_AMPLITUDE: f64 = 0.02;
const VOLTAGE_PERIOD_SECS: f64 = 8.0;
const VOLTAGE_NOISE: f64 = 0.005;
const CURRENT_AMPLITUDE: f64 = 0.05;
const CURRENT_PERIOD_SECS: f64 = 6.0;
const CURRENT_NOISE: f64 = 0.01;

/// Stand-in for the meter when no hardware is attached.
pub struct SyntheticSource {
    v_nom: f64,
    i_nom: f64,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(thresholds: &Thresholds, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            v_nom: thresholds.v_nom,
            i_nom: thresholds.i_nom,
            rng,
        }
    }
}

impl SampleSource for SyntheticSource {
    fn next_sample(&mut self, t: f64) -> anyhow::Result<Sample> {
        let voltage = self.v_nom
            + VOLTAGE_AMPLITUDE * (TAU * t / VOLTAGE_PERIOD_SECS).sin()
            + self.rng.gen_range(-VOLTAGE_NOISE..=VOLTAGE_NOISE);
        let current = self.i_nom
            + CURRENT_AMPLITUDE * (TAU * t / CURRENT_PERIOD_SECS).sin()
            + self.rng.gen_range(-CURRENT_NOISE..=CURRENT_NOISE);
        Ok(Sample::new(voltage, current))
    }

    fn name(&self) -> &str {
        "DM3058E (Mock)"
    }
}
