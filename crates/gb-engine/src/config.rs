//! Engine configuration.

use serde::{Deserialize, Serialize};

use gb_ir::{DEFAULT_BPM, DEFAULT_SAMPLE_RATE, DEFAULT_TPB};

use crate::error::Result;

/// Settings applied when a player is created.
///
/// Every field has a default, so a TOML file only needs the keys it
/// overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub beats_per_minute: u16,
    pub ticks_per_beat: u16,
    /// Song length in ticks; also the default loop end.
    pub song_end: u32,
    pub loop_enabled: bool,
    /// Loader URIs that are refused at registration (case-insensitive).
    pub blacklist: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            beats_per_minute: DEFAULT_BPM,
            ticks_per_beat: DEFAULT_TPB,
            song_end: 16,
            loop_enabled: true,
            blacklist: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
