//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use fleet_core::{AllocationConfig, NormalizerConfig, ShiftSchedule};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Decimal places every share is rounded to.
    pub precision: u32,

    /// Values sampled per column when detecting time formats.
    pub detection_sample: usize,

    /// Time values meaning "no data".
    pub sentinels: Vec<String>,

    /// Shift buckets partitioning the day.
    pub shifts: ShiftSchedule,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("precision", &self.precision)
            .field("detection_sample", &self.detection_sample)
            .field("sentinels", &self.sentinels)
            .field("shifts", &self.shifts.names())
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let allocation = AllocationConfig::default();
        let normalizer = NormalizerConfig::default();
        Self {
            precision: allocation.precision,
            detection_sample: normalizer.detection_sample,
            sentinels: normalizer.sentinels,
            shifts: allocation.shifts,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // FLEET_PRECISION, FLEET_DETECTION_SAMPLE, ...
        figment = figment.merge(Env::prefixed("FLEET_"));

        figment.extract()
    }

    pub fn allocation(&self) -> AllocationConfig {
        AllocationConfig {
            precision: self.precision,
            shifts: self.shifts.clone(),
        }
    }

    pub fn normalizer(&self) -> NormalizerConfig {
        NormalizerConfig {
            sentinels: self.sentinels.clone(),
            detection_sample: self.detection_sample,
        }
    }
}

/// Returns the platform-specific config directory for fleet.
///
/// On Linux: `~/.config/fleet`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("fleet"))
}
