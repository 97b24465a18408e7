//! Runtime configuration
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! `LENSHUB__`-prefixed environment variables (`LENSHUB__RUNTIME__LANE_CAPACITY=64`).

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &["lenshub.toml", "config/lenshub.toml"];
const CONFIG_PATH_VAR: &str = "LENSHUB_CONFIG";
const ENV_PREFIX: &str = "LENSHUB";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub dispatch: DispatchSettings,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Event loop sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "RuntimeConfig::default_inbound_capacity")]
    pub inbound_capacity: usize,
    #[serde(default = "RuntimeConfig::default_lane_capacity")]
    pub lane_capacity: usize,
    /// A per-chat lane with nothing to do for this long shuts down
    #[serde(default = "RuntimeConfig::default_lane_idle_timeout")]
    pub lane_idle_timeout_secs: u64,
}

impl RuntimeConfig {
    const fn default_inbound_capacity() -> usize {
        256
    }

    const fn default_lane_capacity() -> usize {
        32
    }

    const fn default_lane_idle_timeout() -> u64 {
        300
    }

    pub fn lane_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.lane_idle_timeout_secs)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: Self::default_inbound_capacity(),
            lane_capacity: Self::default_lane_capacity(),
            lane_idle_timeout_secs: Self::default_lane_idle_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// strftime pattern for order timestamps in provider notices
    #[serde(default = "DispatchSettings::default_timestamp_format")]
    pub timestamp_format: String,
}

impl DispatchSettings {
    fn default_timestamp_format() -> String {
        "%d.%m.%Y %H:%M".to_string()
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            timestamp_format: Self::default_timestamp_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Filter used when `RUST_LOG` is unset
    #[serde(default = "TelemetryConfig::default_filter")]
    pub filter: String,
}

impl TelemetryConfig {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: Self::default_filter(),
        }
    }
}

/// Load configuration from `LENSHUB_CONFIG`, or the first default file found,
/// plus environment overrides.
pub fn load() -> anyhow::Result<DispatchConfig> {
    let file = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => {
            debug!(path, "loading configuration via {CONFIG_PATH_VAR}");
            Some(PathBuf::from(path))
        }
        Err(_) => std::env::current_dir().ok().and_then(|cwd| {
            DEFAULT_CONFIG_FILES
                .iter()
                .map(|candidate| cwd.join(candidate))
                .find(|path| path.exists())
        }),
    };

    build(file.as_deref())
}

/// Load configuration from an explicit file plus environment overrides
pub fn load_from(path: &Path) -> anyhow::Result<DispatchConfig> {
    build(Some(path))
}

fn build(file: Option<&Path>) -> anyhow::Result<DispatchConfig> {
    let mut builder = config::Config::builder();

    match file {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        }
        None => debug!("no configuration file found, relying on defaults and environment overrides"),
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder.build().context("unable to build configuration")?;
    let config = cfg
        .try_deserialize::<DispatchConfig>()
        .context("invalid configuration")?;

    debug!(?config, "loaded dispatch configuration");
    Ok(config)
}
