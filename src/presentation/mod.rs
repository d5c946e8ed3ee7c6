// Presentation layer - Terminal rendering of the dashboard
pub mod panel;
pub mod render;
