// Render primitives - Bar gauge, sparkline and ANSI-aware line padding
use unicode_width::UnicodeWidthChar;

/// Eight intensity levels, low to high.
pub const SPARK_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

const BAR_FILL: char = '█';
const FLAT_RANGE: f64 = 1e-12;
const ESC: char = '\u{1b}';
const RESET: &str = "\u{1b}[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Cyan,
}

impl Color {
    fn sgr(&self) -> &'static str {
        match self {
            Color::Red => "\u{1b}[31m",
            Color::Green => "\u{1b}[32m",
            Color::Yellow => "\u{1b}[33m",
            Color::Cyan => "\u{1b}[36m",
        }
    }
}

/// Wraps `text` in a foreground color escape and a reset.
pub fn colorize(text: &str, color: Color) -> String {
    format!("{}{}{}", color.sgr(), text, RESET)
}

/// Number of filled cells for `value` on a `width`-cell gauge spanning `[min, max]`.
pub fn filled_cells(value: f64, min: f64, max: f64, width: usize) -> usize {
    let span = if max == min { 1.0 } else { max - min };
    let pct = ((value - min) / span).clamp(0.0, 1.0);
    ((pct * width as f64) as usize).min(width)
}

/// Fixed-width horizontal gauge followed by the value and its unit.
pub fn bar_gauge(value: f64, min: f64, max: f64, width: usize, unit: &str) -> String {
    let filled = filled_cells(value, min, max, width);
    let mut out = String::with_capacity(width * 3 + 16);
    out.extend(std::iter::repeat_n(BAR_FILL, filled));
    out.extend(std::iter::repeat_n(' ', width - filled));
    out.push(' ');
    out.push_str(&format_significant(value, 4));
    out.push_str(unit);
    out
}

/// Sparkline of at most `width` glyphs, scaled to the min/max of `data`.
///
/// Longer inputs are sampled every `len / width` points (no averaging), so
/// 100 points at width 10 show indices 0, 10, ..., 90.
pub fn sparkline(data: &[f64], width: usize) -> String {
    if data.is_empty() || width == 0 {
        return String::new();
    }

    let lo = data.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = if hi - lo == 0.0 { FLAT_RANGE } else { hi - lo };
    let step = (data.len() / width).max(1);
    let top = SPARK_CHARS.len() - 1;

    data.iter()
        .step_by(step)
        .take(width)
        .map(|v| {
            let normalized = (v - lo) / range;
            let idx = ((normalized * top as f64) as usize).min(top);
            SPARK_CHARS[idx]
        })
        .collect()
}

/// Formats with `digits` significant digits, trailing zeros removed (C `%g`).
pub fn format_significant(value: f64, digits: usize) -> String {
    let digits = digits.max(1);
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    // Exponent after rounding, so 9.99995 becomes 10 rather than 9.9999e0.
    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", strip_zeros(mantissa), sign, exponent.abs())
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        strip_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn strip_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// Display width of `text`, ignoring ANSI escape sequences.
pub fn visible_width(text: &str) -> usize {
    let mut width = 0;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == ESC {
            skip_escape(&mut chars);
        } else {
            width += c.width().unwrap_or(0);
        }
    }
    width
}

/// Cuts `text` to at most `width` visible columns, keeping escape sequences intact.
pub fn truncate_visible(text: &str, width: usize) -> String {
    if visible_width(text) <= width {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut used = 0;
    let mut styled = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ESC {
            out.push(c);
            if let Some(bracket) = chars.next_if_eq(&'[') {
                out.push(bracket);
                for next in chars.by_ref() {
                    out.push(next);
                    if is_final_byte(next) {
                        break;
                    }
                }
            }
            styled = true;
            continue;
        }
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(c);
    }
    if styled {
        out.push_str(RESET);
    }
    out
}

/// Pads `content` with spaces to exactly `width` visible columns.
pub fn pad_visible(content: &str, width: usize) -> String {
    let content = truncate_visible(content, width);
    let pad = width.saturating_sub(visible_width(&content));
    let mut out = content;
    out.extend(std::iter::repeat_n(' ', pad));
    out
}

fn skip_escape(chars: &mut std::str::Chars<'_>) {
    // CSI: ESC '[' parameters final-byte
    if chars.clone().next() == Some('[') {
        chars.next();
        for c in chars.by_ref() {
            if is_final_byte(c) {
                break;
            }
        }
    } else {
        chars.next();
    }
}

fn is_final_byte(c: char) -> bool {
    ('\u{40}'..='\u{7e}').contains(&c)
}
