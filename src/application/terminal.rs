// Terminal trait - Screen output and single-key input for the dashboard loop
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    /// Ctrl+C read as a key while the terminal is in raw mode
    Interrupt,
    Other,
}

/// A terminal owned by the dashboard loop.
///
/// Implementations that change the terminal mode restore it when dropped, so
/// every exit path out of the loop releases it exactly once.
pub trait Terminal {
    /// Columns available, if the terminal can tell.
    fn columns(&self) -> Option<u16>;

    /// Clears the screen and writes `lines` from the top-left corner.
    fn draw(&mut self, lines: &[String]) -> io::Result<()>;

    /// Pending keypress, without blocking. Polling failures read as no key.
    fn poll_key(&mut self) -> Option<Key>;

    /// Whether single-key input is available at all.
    fn interactive(&self) -> bool;
}
