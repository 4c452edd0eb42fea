//! General application configuration.

use serde::{Deserialize, Serialize};

fn default_display_user() -> String {
    "System".to_string()
}

/// Default result limit for activity listings.
const fn default_limit() -> u32 {
    20
}

/// Output format used when `--format` is not passed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormatSetting {
    #[default]
    Json,
    Table,
    Raw,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Name recorded as actor, uploader, and comment author when none is given.
    #[serde(default = "default_display_user")]
    pub display_user: String,

    #[serde(default)]
    pub default_format: OutputFormatSetting,

    #[serde(default = "default_limit")]
    pub default_limit: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            display_user: default_display_user(),
            default_format: OutputFormatSetting::default(),
            default_limit: default_limit(),
        }
    }
}
