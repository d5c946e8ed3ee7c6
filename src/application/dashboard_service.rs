// Dashboard service - Fixed-rate sample, classify, render and poll loop
use crate::application::sample_source::SampleSource;
use crate::application::terminal::{Key, Terminal};
use crate::domain::rolling_buffer::RollingBuffer;
use crate::domain::sample::Sample;
use crate::domain::status::{Status, Thresholds};
use crate::infrastructure::config::DashboardConfig;
use crate::presentation::panel::{DEFAULT_COLUMNS, GaugeRange, PanelLayout, PanelView, QuitHint};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Lower bound on the per-tick sleep, whatever the configured interval.
pub const MIN_SLEEP: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    QuitKey,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
}

/// The outcome of one tick's sample and classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub elapsed_secs: f64,
    pub sample: Sample,
    pub status: Status,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub elapsed_secs: f64,
    pub last_status: Option<Status>,
    pub reason: StopReason,
}

/// Sleeps for `duration` in `MIN_SLEEP` slices, returning early once `shutdown` is set.
fn pause(duration: Duration, shutdown: &AtomicBool) {
    let deadline = Instant::now() + duration;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        std::thread::sleep(remaining.min(MIN_SLEEP));
    }
}

pub struct DashboardService<S: SampleSource> {
    source: S,
    thresholds: Thresholds,
    interval: Duration,
    voltage_range: GaugeRange,
    current_range: GaugeRange,
    color: bool,
    voltage_history: RollingBuffer,
    current_history: RollingBuffer,
    state: LoopState,
}

impl<S: SampleSource> DashboardService<S> {
    pub fn new(source: S, config: &DashboardConfig) -> Self {
        let max_points = config.max_points();
        Self {
            source,
            thresholds: config.thresholds,
            interval: config.interval(),
            voltage_range: config.voltage_range(),
            current_range: config.current_range(),
            color: config.display.color,
            voltage_history: RollingBuffer::new(max_points),
            current_history: RollingBuffer::new(max_points),
            state: LoopState::Running,
        }
    }

    pub fn voltage_history(&self) -> &[f64] {
        self.voltage_history.values()
    }

    pub fn current_history(&self) -> &[f64] {
        self.current_history.values()
    }

    pub fn max_points(&self) -> usize {
        self.voltage_history.max_points()
    }

    /// Time slept after each tick.
    pub fn pacing(&self) -> Duration {
        self.interval.max(MIN_SLEEP)
    }

    /// Pulls one sample, floors it, records it in both histories and classifies it.
    pub fn tick(&mut self, elapsed_secs: f64) -> anyhow::Result<Reading> {
        let sample = self.source.next_sample(elapsed_secs)?.floored();

        // Both channels advance together so the sparklines stay time-aligned.
        self.voltage_history.append(sample.voltage);
        self.current_history.append(sample.current);

        let status = self.thresholds.classify(&sample);
        tracing::debug!(
            t = elapsed_secs,
            voltage = sample.voltage,
            current = sample.current,
            %status,
            history = self.voltage_history.len(),
            "tick"
        );

        Ok(Reading {
            elapsed_secs,
            sample,
            status,
        })
    }

    /// Panel lines for `reading` at the given terminal width.
    pub fn frame(&self, reading: &Reading, columns: u16, quit_hint: QuitHint) -> Vec<String> {
        let view = PanelView {
            title: self.source.name(),
            source_label: self.source.identity(),
            elapsed_secs: reading.elapsed_secs,
            sample: reading.sample,
            status: reading.status,
            voltage_history: self.voltage_history(),
            current_history: self.current_history(),
            voltage_range: self.voltage_range,
            current_range: self.current_range,
            quit_hint,
            color: self.color,
        };
        view.render(PanelLayout::for_columns(columns))
    }

    /// Runs until the quit key, an interrupt, or a sample source error.
    ///
    /// Takes ownership of `terminal` so it is dropped, and therefore restored,
    /// before this returns on every path.
    pub fn run<T: Terminal>(
        mut self,
        mut terminal: T,
        shutdown: &AtomicBool,
    ) -> anyhow::Result<RunSummary> {
        let quit_hint = if terminal.interactive() {
            QuitHint::Key
        } else {
            QuitHint::Unavailable
        };
        let started = Instant::now();
        let mut ticks = 0u64;
        let mut last_status = None;

        tracing::info!(
            source = self.source.name(),
            max_points = self.max_points(),
            interval_ms = self.interval.as_millis() as u64,
            interactive = terminal.interactive(),
            "dashboard started"
        );

        while self.state == LoopState::Running {
            if shutdown.load(Ordering::Relaxed) {
                self.state = LoopState::Stopped(StopReason::Interrupted);
                break;
            }

            let reading = self.tick(started.elapsed().as_secs_f64())?;
            ticks += 1;
            last_status = Some(reading.status);

            let columns = terminal.columns().unwrap_or(DEFAULT_COLUMNS);
            let lines = self.frame(&reading, columns, quit_hint);
            if let Err(e) = terminal.draw(&lines) {
                tracing::warn!("Failed to draw dashboard: {}", e);
            }

            match terminal.poll_key() {
                Some(Key::Char(c)) if c.eq_ignore_ascii_case(&'q') => {
                    self.state = LoopState::Stopped(StopReason::QuitKey);
                }
                Some(Key::Interrupt) => {
                    self.state = LoopState::Stopped(StopReason::Interrupted);
                }
                _ => pause(self.pacing(), shutdown),
            }
        }

        drop(terminal);

        let reason = match self.state {
            LoopState::Stopped(reason) => reason,
            LoopState::Running => StopReason::Interrupted,
        };
        Ok(RunSummary {
            ticks,
            elapsed_secs: started.elapsed().as_secs_f64(),
            last_status,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::{DisplaySettings, SamplingSettings, SourceKind, SourceSettings};
    use crate::infrastructure::instrument_source::MeasureMode;
    use crate::presentation::render::visible_width;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::io;
    use std::rc::Rc;
    use std::sync::Arc;

    fn config(interval_secs: f64, window_secs: f64) -> DashboardConfig {
        DashboardConfig {
            sampling: SamplingSettings {
                interval_secs,
                window_secs,
            },
            thresholds: Thresholds {
                v_nom: 5.0,
                i_nom: 0.25,
                v_tol: 0.05,
                i_max: 1.0,
            },
            display: DisplaySettings {
                color: false,
                voltage_span: 0.2,
                current_headroom: 1.2,
            },
            source: SourceSettings {
                kind: SourceKind::Mock,
                resource: None,
                mode: MeasureMode::Shunt,
                shunt_ohms: 0.1,
                timeout_ms: 5000,
            },
        }
    }

    /// Replays scripted samples, repeating the last one.
    struct ScriptedSource {
        samples: Vec<Sample>,
        calls: usize,
    }

    impl ScriptedSource {
        fn new(samples: Vec<Sample>) -> Self {
            Self { samples, calls: 0 }
        }
    }

    impl SampleSource for ScriptedSource {
        fn next_sample(&mut self, _t: f64) -> anyhow::Result<Sample> {
            let idx = self.calls.min(self.samples.len() - 1);
            self.calls += 1;
            Ok(self.samples[idx])
        }

        fn name(&self) -> &str {
            "Scripted"
        }
    }

    /// Raises the shutdown flag from inside the first sample, as a signal would mid-tick.
    struct InterruptingSource {
        shutdown: Arc<AtomicBool>,
    }

    impl SampleSource for InterruptingSource {
        fn next_sample(&mut self, _t: f64) -> anyhow::Result<Sample> {
            self.shutdown.store(true, Ordering::SeqCst);
            Ok(Sample::new(5.0, 0.2))
        }

        fn name(&self) -> &str {
            "Interrupting"
        }
    }

    struct FailingSource;

    impl SampleSource for FailingSource {
        fn next_sample(&mut self, _t: f64) -> anyhow::Result<Sample> {
            anyhow::bail!("instrument went away")
        }

        fn name(&self) -> &str {
            "Failing"
        }
    }

    struct FakeTerminal {
        columns: Option<u16>,
        keys: VecDeque<Option<Key>>,
        interactive: bool,
        fail_draw: bool,
        frames: Rc<RefCell<Vec<Vec<String>>>>,
        restores: Rc<Cell<u32>>,
    }

    impl FakeTerminal {
        fn with_keys(keys: Vec<Option<Key>>) -> Self {
            Self {
                columns: Some(100),
                keys: keys.into(),
                interactive: true,
                fail_draw: false,
                frames: Rc::new(RefCell::new(Vec::new())),
                restores: Rc::new(Cell::new(0)),
            }
        }
    }

    impl Terminal for FakeTerminal {
        fn columns(&self) -> Option<u16> {
            self.columns
        }

        fn draw(&mut self, lines: &[String]) -> io::Result<()> {
            if self.fail_draw {
                return Err(io::Error::other("terminal closed"));
            }
            self.frames.borrow_mut().push(lines.to_vec());
            Ok(())
        }

        fn poll_key(&mut self) -> Option<Key> {
            self.keys.pop_front().flatten()
        }

        fn interactive(&self) -> bool {
            self.interactive
        }
    }

    impl Drop for FakeTerminal {
        fn drop(&mut self) {
            self.restores.set(self.restores.get() + 1);
        }
    }

    #[test]
    fn test_buffer_capacity_and_eviction() {
        let samples: Vec<Sample> = (0..17).map(|k| Sample::new(5.0 + k as f64 * 0.001, 0.25)).collect();
        let mut service = DashboardService::new(ScriptedSource::new(samples.clone()), &config(0.25, 4.0));
        assert_eq!(service.max_points(), 16);

        for k in 0..16 {
            service.tick(k as f64 * 0.25).unwrap();
        }
        assert_eq!(service.voltage_history().len(), 16);
        assert_eq!(service.voltage_history()[0], samples[0].voltage);

        service.tick(4.0).unwrap();
        assert_eq!(service.voltage_history().len(), 16);
        assert_eq!(service.current_history().len(), 16);
        assert_eq!(service.voltage_history()[0], samples[1].voltage);
        assert_eq!(service.voltage_history()[15], samples[16].voltage);
    }

    #[test]
    fn test_tick_floors_negative_readings() {
        let source = ScriptedSource::new(vec![Sample::new(-0.4, -0.02)]);
        let mut service = DashboardService::new(source, &config(0.25, 4.0));
        let reading = service.tick(0.0).unwrap();

        assert_eq!(reading.sample, Sample::new(0.0, 0.0));
        assert_eq!(service.voltage_history(), &[0.0]);
        assert_eq!(service.current_history(), &[0.0]);
        assert_eq!(reading.status, Status::VoltageDrift);
    }

    #[test]
    fn test_status_follows_current_sample_only() {
        let source = ScriptedSource::new(vec![
            Sample::new(5.10, 0.5),
            Sample::new(5.0, 1.5),
            Sample::new(5.02, 0.3),
        ]);
        let mut service = DashboardService::new(source, &config(0.25, 4.0));

        assert_eq!(service.tick(0.0).unwrap().status, Status::VoltageDrift);
        assert_eq!(service.tick(0.25).unwrap().status, Status::Overcurrent);
        assert_eq!(service.tick(0.5).unwrap().status, Status::Stable);
    }

    #[test]
    fn test_pacing_has_a_floor() {
        let service = DashboardService::new(ScriptedSource::new(vec![Sample::new(5.0, 0.2)]), &config(0.25, 4.0));
        assert_eq!(service.pacing(), Duration::from_millis(250));

        let service = DashboardService::new(ScriptedSource::new(vec![Sample::new(5.0, 0.2)]), &config(1e-6, 4.0));
        assert_eq!(service.pacing(), MIN_SLEEP);
    }

    #[test]
    fn test_quit_key_stops_after_render_and_restores_once() {
        let terminal = FakeTerminal::with_keys(vec![None, Some(Key::Char('x')), Some(Key::Char('Q'))]);
        let frames = terminal.frames.clone();
        let restores = terminal.restores.clone();
        let service = DashboardService::new(ScriptedSource::new(vec![Sample::new(5.0, 0.2)]), &config(0.001, 4.0));

        let summary = service.run(terminal, &AtomicBool::new(false)).unwrap();

        assert_eq!(summary.reason, StopReason::QuitKey);
        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.last_status, Some(Status::Stable));
        assert_eq!(frames.borrow().len(), 3);
        assert_eq!(restores.get(), 1);
    }

    #[test]
    fn test_ctrl_c_key_is_an_interrupt() {
        let terminal = FakeTerminal::with_keys(vec![Some(Key::Interrupt)]);
        let restores = terminal.restores.clone();
        let service = DashboardService::new(ScriptedSource::new(vec![Sample::new(5.0, 0.2)]), &config(0.001, 4.0));

        let summary = service.run(terminal, &AtomicBool::new(false)).unwrap();
        assert_eq!(summary.reason, StopReason::Interrupted);
        assert_eq!(summary.ticks, 1);
        assert_eq!(restores.get(), 1);
    }

    #[test]
    fn test_shutdown_flag_stops_before_next_tick() {
        let terminal = FakeTerminal::with_keys(vec![]);
        let frames = terminal.frames.clone();
        let restores = terminal.restores.clone();
        let service = DashboardService::new(ScriptedSource::new(vec![Sample::new(5.0, 0.2)]), &config(0.001, 4.0));

        let summary = service.run(terminal, &AtomicBool::new(true)).unwrap();
        assert_eq!(summary.reason, StopReason::Interrupted);
        assert_eq!(summary.ticks, 0);
        assert!(frames.borrow().is_empty());
        assert_eq!(restores.get(), 1);
    }

    #[test]
    fn test_shutdown_cuts_long_sleep_short() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let source = InterruptingSource {
            shutdown: Arc::clone(&shutdown),
        };
        let terminal = FakeTerminal::with_keys(vec![]);
        let restores = terminal.restores.clone();
        let service = DashboardService::new(source, &config(30.0, 600.0));

        let started = Instant::now();
        let summary = service.run(terminal, &shutdown).unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(summary.reason, StopReason::Interrupted);
        assert_eq!(summary.ticks, 1);
        assert_eq!(restores.get(), 1);
    }

    #[test]
    fn test_pause_sleeps_full_duration_without_shutdown() {
        let started = Instant::now();
        pause(Duration::from_millis(35), &AtomicBool::new(false));
        assert!(started.elapsed() >= Duration::from_millis(35));

        let started = Instant::now();
        pause(Duration::from_secs(30), &AtomicBool::new(true));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_source_error_still_restores_terminal() {
        let terminal = FakeTerminal::with_keys(vec![]);
        let restores = terminal.restores.clone();
        let service = DashboardService::new(FailingSource, &config(0.25, 4.0));

        let err = service.run(terminal, &AtomicBool::new(false)).unwrap_err();
        assert!(err.to_string().contains("instrument went away"));
        assert_eq!(restores.get(), 1);
    }

    #[test]
    fn test_draw_failure_is_not_fatal() {
        let mut terminal = FakeTerminal::with_keys(vec![None, Some(Key::Char('q'))]);
        terminal.fail_draw = true;
        let service = DashboardService::new(ScriptedSource::new(vec![Sample::new(5.0, 0.2)]), &config(0.001, 4.0));

        let summary = service.run(terminal, &AtomicBool::new(false)).unwrap();
        assert_eq!(summary.reason, StopReason::QuitKey);
        assert_eq!(summary.ticks, 2);
    }

    #[test]
    fn test_unknown_width_and_degraded_hint() {
        let mut terminal = FakeTerminal::with_keys(vec![Some(Key::Char('q'))]);
        terminal.columns = None;
        terminal.interactive = false;
        let frames = terminal.frames.clone();
        let service = DashboardService::new(ScriptedSource::new(vec![Sample::new(5.0, 0.2)]), &config(0.001, 4.0));

        service.run(terminal, &AtomicBool::new(false)).unwrap();

        let frames = frames.borrow();
        let frame = &frames[0];
        assert_eq!(visible_width(&frame[0]), PanelLayout::for_columns(DEFAULT_COLUMNS).outer_width());
        assert!(frame.last().unwrap().contains("Ctrl+C"));
        assert!(frame[0].contains("Scripted"));
    }
}
