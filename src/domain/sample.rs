// Sample domain model

/// One (voltage, current) reading taken during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub voltage: f64,
    pub current: f64,
}

impl Sample {
    pub fn new(voltage: f64, current: f64) -> Self {
        Self { voltage, current }
    }

    /// Negative readings are shown as zero.
    pub fn floored(self) -> Self {
        Self {
            voltage: self.voltage.max(0.0),
            current: self.current.max(0.0),
        }
    }
}
