// Status domain model - Threshold classification of the current sample
use std::fmt;

use serde::Deserialize;

use super::sample::Sample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Stable,
    VoltageDrift,
    Overcurrent,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Stable => "Stable",
            Status::VoltageDrift => "Voltage drift",
            Status::Overcurrent => "Overcurrent",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Thresholds {
    pub v_nom: f64,
    pub i_nom: f64,
    pub v_tol: f64,
    pub i_max: f64,
}

impl Thresholds {
    /// Overcurrent wins over voltage drift when both apply.
    pub fn classify(&self, sample: &Sample) -> Status {
        classify(sample.voltage, sample.current, self.v_nom, self.v_tol, self.i_max)
    }
}

pub fn classify(voltage: f64, current: f64, v_nom: f64, v_tol: f64, i_max: f64) -> Status {
    if current > i_max {
        Status::Overcurrent
    } else if (voltage - v_nom).abs() > v_tol {
        Status::VoltageDrift
    } else {
        Status::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> Thresholds {
        Thresholds {
            v_nom: 5.0,
            i_nom: 0.25,
            v_tol: 0.05,
            i_max: 1.0,
        }
    }

    #[test]
    fn test_classify_bench_scenarios() {
        let t = thresholds();
        assert_eq!(t.classify(&Sample::new(5.10, 0.5)), Status::VoltageDrift);
        assert_eq!(t.classify(&Sample::new(5.0, 1.5)), Status::Overcurrent);
        assert_eq!(t.classify(&Sample::new(5.02, 0.3)), Status::Stable);
    }

    #[test]
    fn test_overcurrent_takes_priority_over_drift() {
        let t = thresholds();
        for v in [0.0, 3.3, 4.9, 5.0, 5.2, 12.0] {
            assert_eq!(t.classify(&Sample::new(v, 1.01)), Status::Overcurrent);
        }
    }

    #[test]
    fn test_boundaries_are_inclusive_for_stable() {
        let t = Thresholds {
            v_nom: 5.0,
            i_nom: 0.25,
            v_tol: 0.5,
            i_max: 1.0,
        };
        assert_eq!(t.classify(&Sample::new(5.5, 1.0)), Status::Stable);
        assert_eq!(t.classify(&Sample::new(4.5, 0.0)), Status::Stable);
        assert_eq!(t.classify(&Sample::new(5.51, 0.2)), Status::VoltageDrift);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Status::Stable.to_string(), "Stable");
        assert_eq!(Status::VoltageDrift.to_string(), "Voltage drift");
        assert_eq!(Status::Overcurrent.to_string(), "Overcurrent");
    }
}
