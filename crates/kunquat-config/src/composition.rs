//! `p_composition.json`: top-level composition parameters.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The contents of a project's `p_composition.json`: mixing buffer count,
/// mix volume (in dB) and the subsong to start playback from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Composition {
    /// Number of internal mixing buffers to allocate.
    #[serde(default = "default_buf_count")]
    pub buf_count: u32,

    /// Master mix volume, in decibels.
    #[serde(default)]
    pub mix_volume: f64,

    /// The subsong playback starts from when no explicit position is
    /// requested.
    #[serde(default)]
    pub init_subsong: i16,
}

fn default_buf_count() -> u32 {
    2
}

impl Default for Composition {
    fn default() -> Self {
        Self {
            buf_count: default_buf_count(),
            mix_volume: 0.0,
            init_subsong: 0,
        }
    }
}

impl Composition {
    /// Loads a composition descriptor from a `p_composition.json` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadFile`] if the file cannot be read, or
    /// [`ConfigError::JsonParse`] if its content is not valid JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::json_parse(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let c: Composition = serde_json::from_str("{}").unwrap();
        assert_eq!(c.buf_count, 2);
        assert_eq!(c.mix_volume, 0.0);
        assert_eq!(c.init_subsong, 0);
    }

    #[test]
    fn explicit_fields_round_trip() {
        let json = r#"{"buf_count": 4, "mix_volume": -6.0, "init_subsong": 2}"#;
        let c: Composition = serde_json::from_str(json).unwrap();
        assert_eq!(c.buf_count, 4);
        assert_eq!(c.mix_volume, -6.0);
        assert_eq!(c.init_subsong, 2);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Composition::load("/nonexistent/p_composition.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
