// Domain layer - Measurement values, rolling history and status rules
pub mod rolling_buffer;
pub mod sample;
pub mod status;
