//! `p_bind.json`: the declarative trigger-to-cascade table.
//!
//! The on-disk shape mirrors [`kunquat_event::bind::EntrySpec`]/`ItemSpec`
//! directly: an array of `{event, rules}` entries, each rule a
//! `{constraints, events}` pair of string expressions. Parsing and cycle
//! detection are delegated to [`kunquat_event::Bind::new`]; this loader's
//! only job is turning JSON into the unparsed spec types it expects.

use std::path::Path;

use kunquat_event::{Bind, BindError, EntrySpec, ItemSpec};
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Deserialize)]
struct RawEntry {
    event: String,
    #[serde(default)]
    rules: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    #[serde(default)]
    constraints: Vec<RawConstraint>,
    #[serde(default)]
    events: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
struct RawConstraint {
    event: String,
    expr: String,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    #[serde(default)]
    channel_offset: i32,
    event: String,
    expr: String,
}

/// Loads a bind map from a `p_bind.json` file.
///
/// # Errors
///
/// Returns [`ConfigError::ReadFile`] if the file cannot be read,
/// [`ConfigError::JsonParse`] if its content is not valid JSON, or
/// [`ConfigError::BindCycle`]/[`ConfigError::BadBindExpr`] if the parsed
/// entries fail [`Bind::new`]'s expression parse or cycle check.
pub fn load(path: impl AsRef<Path>) -> Result<Bind, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    let entries: Vec<RawEntry> =
        serde_json::from_str(&content).map_err(|e| ConfigError::json_parse(path, e))?;

    let specs: Vec<EntrySpec> = entries
        .into_iter()
        .map(|entry| EntrySpec {
            trigger: entry.event,
            items: entry
                .rules
                .into_iter()
                .map(|rule| ItemSpec {
                    constraints: rule
                        .constraints
                        .into_iter()
                        .map(|c| (c.event, c.expr))
                        .collect(),
                    targets: rule
                        .events
                        .into_iter()
                        .map(|t| (t.channel_offset, t.event, t.expr))
                        .collect(),
                })
                .collect(),
        })
        .collect();

    Bind::new(specs).map_err(|err| match err {
        BindError::Cycle => ConfigError::BindCycle {
            path: path.to_path_buf(),
        },
        BindError::BadExpr(source) => ConfigError::BadBindExpr {
            path: path.to_path_buf(),
            reason: source.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_simple_bind_entry() {
        let json = r#"[
            {
                "event": "n+",
                "rules": [
                    { "constraints": [], "events": [
                        { "channel_offset": 0, "event": "c.v", "expr": "$" }
                    ] }
                ]
            }
        ]"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p_bind.json");
        std::fs::write(&path, json).unwrap();

        let bind = load(&path).unwrap();
        assert_eq!(bind.trigger_count(), 1);
    }

    #[test]
    fn cyclic_bind_is_rejected_with_path() {
        let json = r#"[
            { "event": "X", "rules": [ { "constraints": [], "events": [
                { "channel_offset": 0, "event": "Y", "expr": "$" } ] } ] },
            { "event": "Y", "rules": [ { "constraints": [], "events": [
                { "channel_offset": 0, "event": "X", "expr": "$" } ] } ] }
        ]"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p_bind.json");
        std::fs::write(&path, json).unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::BindCycle { .. }));
    }

    #[test]
    fn missing_file_reports_read_error() {
        let err = load("/nonexistent/p_bind.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
