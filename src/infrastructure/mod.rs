// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod crossterm_terminal;
pub mod instrument_source;
pub mod scpi;
pub mod shutdown;
pub mod synthetic_source;
