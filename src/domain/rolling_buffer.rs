// Rolling buffer - Bounded chronological history for one channel

/// Smallest history the dashboard keeps regardless of window and interval.
pub const MIN_POINTS: usize = 10;

/// Largest history kept per channel; longer windows are rejected at startup.
pub const MAX_POINTS: usize = 1_000_000;

/// Buffer capacity for a window sampled every `interval_secs`.
pub fn capacity_for(window_secs: f64, interval_secs: f64) -> usize {
    let points = (window_secs / interval_secs).floor();
    if !points.is_finite() || points <= MIN_POINTS as f64 {
        MIN_POINTS
    } else if points >= MAX_POINTS as f64 {
        MAX_POINTS
    } else {
        points as usize
    }
}

/// FIFO history backed by a flat vector.
///
/// Evicted entries stay in place behind `start` and are drained in one pass
/// once `max_points` of them have piled up, so `append` is amortized O(1)
/// and the live window is always one contiguous slice.
#[derive(Debug, Clone)]
pub struct RollingBuffer {
    values: Vec<f64>,
    start: usize,
    max_points: usize,
}

impl RollingBuffer {
    pub fn new(max_points: usize) -> Self {
        Self {
            values: Vec::new(),
            start: 0,
            max_points: max_points.max(1),
        }
    }

    /// Appends `value`, evicting the oldest entry once capacity is exceeded.
    pub fn append(&mut self, value: f64) {
        self.values.push(value);
        if self.len() > self.max_points {
            self.start += 1;
        }
        if self.start >= self.max_points {
            self.values.drain(..self.start);
            self.start = 0;
        }
    }

    /// Contents ordered oldest to newest.
    pub fn values(&self) -> &[f64] {
        &self.values[self.start..]
    }

    pub fn len(&self) -> usize {
        self.values.len() - self.start
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }
}
