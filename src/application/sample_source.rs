// Sample source trait - Where each tick's reading comes from
use crate::domain::sample::Sample;

pub trait SampleSource {
    /// Next reading, `t` seconds after the dashboard started.
    ///
    /// Implementations return finite values and bound their own latency.
    fn next_sample(&mut self, t: f64) -> anyhow::Result<Sample>;

    /// Short name for the panel title
    fn name(&self) -> &str;

    /// Instrument identity string, when there is a real instrument behind the source
    fn identity(&self) -> Option<&str> {
        None
    }
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn next_sample(&mut self, t: f64) -> anyhow::Result<Sample> {
        (**self).next_sample(t)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn identity(&self) -> Option<&str> {
        (**self).identity()
    }
}
