// Panel layout - Bordered dashboard block assembled from render primitives
use crate::domain::sample::Sample;
use crate::domain::status::Status;
use crate::presentation::render::{
    Color, bar_gauge, colorize, pad_visible, sparkline, truncate_visible, visible_width,
};

/// Used when the terminal cannot report its size.
pub const DEFAULT_COLUMNS: u16 = 100;

const MIN_GRAPH_WIDTH: usize = 30;
const MAX_GRAPH_WIDTH: usize = 80;
const GRAPH_MARGIN: usize = 24;
// Row label, separator and the widest formatted value ("1.234e-05 A").
const GRAPH_OVERHEAD: usize = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelLayout {
    pub graph_width: usize,
    pub interior_width: usize,
}

impl PanelLayout {
    pub fn for_columns(columns: u16) -> Self {
        let graph_width = (columns as usize)
            .saturating_sub(GRAPH_MARGIN)
            .clamp(MIN_GRAPH_WIDTH, MAX_GRAPH_WIDTH);
        Self {
            graph_width,
            interior_width: graph_width + GRAPH_OVERHEAD,
        }
    }

    /// Total width including both border columns.
    #[cfg(test)]
    pub fn outer_width(&self) -> usize {
        self.interior_width + 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitHint {
    Key,
    /// No raw terminal, so single-key quit is not available.
    Unavailable,
}

impl QuitHint {
    fn text(&self) -> &'static str {
        match self {
            QuitHint::Key => "  q: quit",
            QuitHint::Unavailable => "  quit key unavailable (no terminal); press Ctrl+C to stop",
        }
    }
}

pub fn status_color(status: Status) -> Color {
    match status {
        Status::Stable => Color::Green,
        Status::VoltageDrift => Color::Yellow,
        Status::Overcurrent => Color::Red,
    }
}

/// Everything one frame shows.
#[derive(Debug, Clone)]
pub struct PanelView<'a> {
    pub title: &'a str,
    pub source_label: Option<&'a str>,
    pub elapsed_secs: f64,
    pub sample: Sample,
    pub status: Status,
    pub voltage_history: &'a [f64],
    pub current_history: &'a [f64],
    pub voltage_range: GaugeRange,
    pub current_range: GaugeRange,
    pub quit_hint: QuitHint,
    pub color: bool,
}

impl PanelView<'_> {
    pub fn render(&self, layout: PanelLayout) -> Vec<String> {
        let graph = layout.graph_width;
        let mut timer = format!(" Time: {:7.2}s", self.elapsed_secs);
        if let Some(label) = self.source_label {
            timer.push_str("   ");
            timer.push_str(label);
        }

        let status = self.paint(self.status.label(), status_color(self.status));
        let rows = [
            timer,
            String::new(),
            format!(
                " Voltage: {}",
                bar_gauge(self.sample.voltage, self.voltage_range.min, self.voltage_range.max, graph, " V")
            ),
            format!(
                " Current: {}",
                bar_gauge(self.sample.current, self.current_range.min, self.current_range.max, graph, " A")
            ),
            String::new(),
            format!(" V Hist:  {}", sparkline(self.voltage_history, graph)),
            format!(" I Hist:  {}", sparkline(self.current_history, graph)),
            String::new(),
            format!(" Status: {}", status),
        ];

        let mut lines = Vec::with_capacity(rows.len() + 3);
        lines.push(self.paint(&title_bar(self.title, layout.interior_width), Color::Cyan));
        for row in &rows {
            lines.push(format!("│{}│", pad_visible(row, layout.interior_width)));
        }
        let footer = format!("└{}┘", "─".repeat(layout.interior_width));
        lines.push(self.paint(&footer, Color::Cyan));
        lines.push(self.quit_hint.text().to_string());
        lines
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            colorize(text, color)
        } else {
            text.to_string()
        }
    }
}

fn title_bar(title: &str, interior_width: usize) -> String {
    let label = truncate_visible(&format!(" {} ", title), interior_width);
    let label_width = visible_width(&label);
    let left = (interior_width - label_width) / 2;
    let right = interior_width - label_width - left;
    format!("┌{}{}{}┐", "─".repeat(left), label, "─".repeat(right))
}
