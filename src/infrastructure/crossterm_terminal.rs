// Crossterm terminal - Raw-mode screen and keyboard for the dashboard loop
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, queue};
use std::io::{self, Stdout, Write};
use std::sync::OnceLock;
use std::time::Duration;

use crate::application::terminal::{Key, Terminal};

/// Stdout terminal in raw mode for the lifetime of the value.
///
/// Without a controlling terminal raw mode cannot be entered; the dashboard
/// still draws, but `poll_key` never reports anything.
pub struct CrosstermTerminal {
    out: Stdout,
    raw_mode: bool,
}

impl CrosstermTerminal {
    pub fn acquire() -> Self {
        install_panic_hook();

        let raw_mode = match terminal::enable_raw_mode() {
            Ok(()) => {
                tracing::info!("terminal raw mode enabled");
                true
            }
            Err(e) => {
                tracing::warn!("Raw mode unavailable, quit key disabled: {}", e);
                false
            }
        };

        let mut out = io::stdout();
        let _ = crossterm::execute!(out, cursor::Hide);
        Self { out, raw_mode }
    }

    fn restore(&mut self) {
        let _ = crossterm::execute!(self.out, cursor::Show);
        if self.raw_mode {
            let _ = terminal::disable_raw_mode();
            self.raw_mode = false;
            tracing::info!("terminal raw mode disabled");
        }
        let _ = self.out.flush();
    }
}

impl Terminal for CrosstermTerminal {
    fn columns(&self) -> Option<u16> {
        terminal::size().ok().map(|(columns, _)| columns).filter(|&c| c > 0)
    }

    fn draw(&mut self, lines: &[String]) -> io::Result<()> {
        queue!(self.out, terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        for line in lines {
            // Raw mode turns off output post-processing, so '\n' alone does not return the carriage.
            self.out.write_all(line.as_bytes())?;
            self.out.write_all(b"\r\n")?;
        }
        self.out.flush()
    }

    fn poll_key(&mut self) -> Option<Key> {
        if !self.raw_mode {
            return None;
        }
        if !event::poll(Duration::ZERO).unwrap_or(false) {
            return None;
        }
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Some(map_key(key)),
            _ => None,
        }
    }

    fn interactive(&self) -> bool {
        self.raw_mode
    }
}

impl Drop for CrosstermTerminal {
    fn drop(&mut self) {
        self.restore();
    }
}

fn map_key(key: KeyEvent) -> Key {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Key::Interrupt,
        KeyCode::Char(c) => Key::Char(c),
        _ => Key::Other,
    }
}

fn install_panic_hook() {
    static HOOK: OnceLock<()> = OnceLock::new();
    HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let mut out = io::stdout();
            let _ = crossterm::execute!(out, cursor::Show);
            let _ = terminal::disable_raw_mode();
            let _ = out.flush();
            previous(info);
        }));
    });
}
