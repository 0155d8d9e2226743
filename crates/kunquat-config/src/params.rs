//! Per-device `p_<param>.json` parameter files.
//!
//! Each file holds a flat JSON object of named values. A key containing an
//! `XX`-style digit group (e.g. `"env_XX"`, `"tone_XX_pitch"`) binds to an
//! indexed parameter on the implementing device; the digit group is split
//! out as a separate index rather than treated as an opaque part of the
//! name, so a device can look up `"env"` with index `3` instead of the
//! literal string `"env_03"`.

use std::collections::HashMap;
use std::path::Path;

use kunquat_event::Value;
use serde_json::Value as JsonValue;

use crate::error::ConfigError;

/// A parameter key split into its literal parts and, if present, its
/// embedded index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamKey {
    /// The key with its digit group replaced by `XX`, e.g. `"tone_XX_pitch"`.
    /// Equal to the original key when no digit group was found.
    pub template: String,
    /// The parsed index, if the key contained a two-digit group.
    pub index: Option<u32>,
}

/// Splits a raw JSON key like `"tone_03_pitch"` into its `XX`-templated form
/// and numeric index. A key is considered indexed when it contains a
/// standalone run of ASCII digits; the first such run found is extracted.
fn split_indexed_key(key: &str) -> ParamKey {
    let bytes = key.as_bytes();
    let mut digit_start = None;
    let mut digit_end = None;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            digit_start = Some(start);
            digit_end = Some(i);
            break;
        }
        i += 1;
    }

    match (digit_start, digit_end) {
        (Some(start), Some(end)) => {
            let digits = &key[start..end];
            match digits.parse::<u32>() {
                Ok(index) => {
                    let mut template = String::with_capacity(key.len());
                    template.push_str(&key[..start]);
                    template.push_str("XX");
                    template.push_str(&key[end..]);
                    ParamKey {
                        template,
                        index: Some(index),
                    }
                }
                Err(_) => ParamKey {
                    template: key.to_string(),
                    index: None,
                },
            }
        }
        _ => ParamKey {
            template: key.to_string(),
            index: None,
        },
    }
}

fn json_to_value(json: &JsonValue) -> Option<Value> {
    match json {
        JsonValue::Bool(b) => Some(Value::Bool(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::Int(i))
            } else {
                n.as_f64().map(Value::Float)
            }
        }
        JsonValue::String(s) => Some(Value::String(s.clone())),
        _ => None,
    }
}

/// One parsed parameter: its `XX`-templated key, optional index, and value.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub key: ParamKey,
    pub value: Value,
}

/// A loaded `p_<param>.json` file: a flat map from raw JSON key to value,
/// plus the same entries pre-split into templated key and index for
/// devices that expose indexed parameters.
#[derive(Debug, Clone, Default)]
pub struct DeviceParams {
    raw: HashMap<String, Value>,
    indexed: Vec<Param>,
}

impl DeviceParams {
    /// Loads a device parameter file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadFile`] if the file cannot be read, or
    /// [`ConfigError::JsonParse`] if its content is not a JSON object of
    /// scalar values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let json: JsonValue =
            serde_json::from_str(&content).map_err(|e| ConfigError::json_parse(path, e))?;

        let object = json.as_object().cloned().unwrap_or_default();

        let mut raw = HashMap::with_capacity(object.len());
        let mut indexed = Vec::with_capacity(object.len());
        for (key, json_value) in &object {
            let Some(value) = json_to_value(json_value) else {
                continue;
            };
            let param_key = split_indexed_key(key);
            indexed.push(Param {
                key: param_key,
                value: value.clone(),
            });
            raw.insert(key.clone(), value);
        }

        Ok(Self { raw, indexed })
    }

    /// Looks up a parameter by its exact raw JSON key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    /// Returns every indexed parameter whose templated key matches
    /// `template` (e.g. `"tone_XX_pitch"`), paired with its index.
    pub fn indexed(&self, template: &str) -> impl Iterator<Item = (u32, &Value)> {
        self.indexed.iter().filter_map(move |p| {
            if p.key.template == template {
                p.key.index.map(|idx| (idx, &p.value))
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_key_has_no_index() {
        let key = split_indexed_key("volume");
        assert_eq!(key.template, "volume");
        assert_eq!(key.index, None);
    }

    #[test]
    fn digit_group_becomes_xx_with_index() {
        let key = split_indexed_key("tone_03_pitch");
        assert_eq!(key.template, "tone_XX_pitch");
        assert_eq!(key.index, Some(3));
    }

    #[test]
    fn loads_flat_object_and_groups_indexed_params() {
        let json = r#"{
            "volume": -6.0,
            "tone_00_pitch": 1.0,
            "tone_01_pitch": 1.5,
            "enabled": true
        }"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p_gen_params.json");
        std::fs::write(&path, json).unwrap();

        let params = DeviceParams::load(&path).unwrap();
        assert_eq!(params.get("volume"), Some(&Value::Float(-6.0)));
        assert_eq!(params.get("enabled"), Some(&Value::Bool(true)));

        let tones: Vec<_> = params.indexed("tone_XX_pitch").collect();
        assert_eq!(tones.len(), 2);
        assert!(tones.contains(&(0, &Value::Float(1.0))));
        assert!(tones.contains(&(1, &Value::Float(1.5))));
    }
}
