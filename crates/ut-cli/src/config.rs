//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use ut_core::EngagementConfig;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How many identities receive hand tracking each frame.
    pub tracked_slots: usize,

    /// Engagement coordinator settings.
    pub engagement: EngagementConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tracked_slots: 2,
            engagement: EngagementConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, `<config dir>/ut/config.toml`, the given
    /// file, then `UT_*` environment variables (`__` separates nested keys,
    /// e.g. `UT_ENGAGEMENT__INACTIVE_HYSTERESIS_MS`).
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

        figment = figment.merge(Env::prefixed("UT_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for ut.
///
/// On Linux: `~/.config/ut`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ut"))
}
