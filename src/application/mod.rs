// Application layer - Sampling ports and the dashboard loop
pub mod dashboard_service;
pub mod sample_source;
pub mod terminal;
