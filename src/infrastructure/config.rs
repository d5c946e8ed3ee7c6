use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::domain::rolling_buffer::{MAX_POINTS, capacity_for};
use crate::domain::status::Thresholds;
use crate::infrastructure::instrument_source::MeasureMode;
use crate::presentation::panel::GaugeRange;

const DEFAULT_CONFIG_PATH: &str = "config/dashboard";
const ENV_PREFIX: &str = "DM3058E";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("{field} must be {requirement}, got {value}")]
    Invalid {
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub sampling: SamplingSettings,
    pub thresholds: Thresholds,
    pub display: DisplaySettings,
    pub source: SourceSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SamplingSettings {
    pub interval_secs: f64,
    pub window_secs: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplaySettings {
    pub color: bool,
    /// Half-width of the voltage gauge around the nominal voltage.
    pub voltage_span: f64,
    /// Current gauge tops out at `i_max * current_headroom`.
    pub current_headroom: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceSettings {
    pub kind: SourceKind,
    pub resource: Option<String>,
    pub mode: MeasureMode,
    pub shunt_ohms: f64,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Mock,
    Instrument,
}

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub interval_secs: Option<f64>,
    pub window_secs: Option<f64>,
    pub v_nom: Option<f64>,
    pub i_nom: Option<f64>,
    pub v_tol: Option<f64>,
    pub i_max: Option<f64>,
    pub source: Option<String>,
    pub resource: Option<String>,
    pub mode: Option<String>,
    pub shunt_ohms: Option<f64>,
    pub no_color: bool,
}

impl DashboardConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.sampling.interval_secs)
    }

    pub fn max_points(&self) -> usize {
        capacity_for(self.sampling.window_secs, self.sampling.interval_secs)
    }

    pub fn voltage_range(&self) -> GaugeRange {
        GaugeRange {
            min: self.thresholds.v_nom - self.display.voltage_span,
            max: self.thresholds.v_nom + self.display.voltage_span,
        }
    }

    pub fn current_range(&self) -> GaugeRange {
        GaugeRange {
            min: 0.0,
            max: self.thresholds.i_max * self.display.current_headroom,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("sampling.interval_secs", self.sampling.interval_secs)?;
        positive("sampling.window_secs", self.sampling.window_secs)?;
        if self.sampling.window_secs / self.sampling.interval_secs > MAX_POINTS as f64 {
            return Err(ConfigError::Invalid {
                field: "sampling.window_secs",
                requirement: "at most 1000000 sampling intervals long",
                value: self.sampling.window_secs,
            });
        }
        finite("thresholds.v_nom", self.thresholds.v_nom)?;
        finite("thresholds.i_nom", self.thresholds.i_nom)?;
        non_negative("thresholds.v_tol", self.thresholds.v_tol)?;
        positive("thresholds.i_max", self.thresholds.i_max)?;
        non_negative("display.voltage_span", self.display.voltage_span)?;
        positive("display.current_headroom", self.display.current_headroom)?;
        if self.source.mode == MeasureMode::Shunt {
            positive("source.shunt_ohms", self.source.shunt_ohms)?;
        }
        if self.source.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "source.timeout_ms",
                requirement: "greater than zero",
                value: 0.0,
            });
        }
        Ok(())
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, requirement: "a finite number", value })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, requirement: "greater than zero", value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, requirement: "zero or greater", value })
    }
}

/// Defaults, then `config/dashboard.*` (or `--config`), then `DM3058E__*` env vars, then CLI.
pub fn load_dashboard_config(overrides: &ConfigOverrides) -> Result<DashboardConfig, ConfigError> {
    let file = match &overrides.config_path {
        Some(path) => File::from(path.as_path()),
        None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
    };

    let builder = defaults()?
        .add_source(file)
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true));

    finish(apply_overrides(builder, overrides)?)
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("sampling.interval_secs", 0.25)?
        .set_default("sampling.window_secs", 60.0)?
        .set_default("thresholds.v_nom", 5.0)?
        .set_default("thresholds.i_nom", 0.25)?
        .set_default("thresholds.v_tol", 0.05)?
        .set_default("thresholds.i_max", 1.0)?
        .set_default("display.color", true)?
        .set_default("display.voltage_span", 0.2)?
        .set_default("display.current_headroom", 1.2)?
        .set_default("source.kind", "mock")?
        .set_default("source.mode", "shunt")?
        .set_default("source.shunt_ohms", 0.1)?
        .set_default("source.timeout_ms", 5000)
}

fn apply_overrides(
    builder: ConfigBuilder<DefaultState>,
    overrides: &ConfigOverrides,
) -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    let builder = builder
        .set_override_option("sampling.interval_secs", overrides.interval_secs)?
        .set_override_option("sampling.window_secs", overrides.window_secs)?
        .set_override_option("thresholds.v_nom", overrides.v_nom)?
        .set_override_option("thresholds.i_nom", overrides.i_nom)?
        .set_override_option("thresholds.v_tol", overrides.v_tol)?
        .set_override_option("thresholds.i_max", overrides.i_max)?
        .set_override_option("source.kind", overrides.source.clone())?
        .set_override_option("source.resource", overrides.resource.clone())?
        .set_override_option("source.mode", overrides.mode.clone())?
        .set_override_option("source.shunt_ohms", overrides.shunt_ohms)?;

    if overrides.no_color {
        builder.set_override("display.color", false)
    } else {
        Ok(builder)
    }
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<DashboardConfig, ConfigError> {
    let config: DashboardConfig = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
