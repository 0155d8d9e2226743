//! `p_connections.json`: the device-graph edge list.
//!
//! Per §6, only the raw path pairs are loaded here; resolving a path to a
//! concrete device and validating its ports belongs to the graph
//! constructor ([`kunquat_graph::ProcessingGraph`]), not this loader.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One edge: a send-port path connected to a recv-port path, e.g.
/// `"ins_00/out_00"` to `"eff_00/in_00"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionEdge {
    pub from: String,
    pub to: String,
}

/// The parsed contents of a `p_connections.json` file: an ordered list of
/// edges.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Connections {
    #[serde(default)]
    pub edges: Vec<ConnectionEdge>,
}

impl Connections {
    /// Loads a connection list from a `p_connections.json` file.
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
    fn parses_edge_list() {
        let json = r#"{"edges": [{"from": "ins_00/out_00", "to": "eff_00/in_00"}]}"#;
        let conns: Connections = serde_json::from_str(json).unwrap();
        assert_eq!(conns.edges.len(), 1);
        assert_eq!(conns.edges[0].from, "ins_00/out_00");
    }

    #[test]
    fn missing_edges_defaults_to_empty() {
        let conns: Connections = serde_json::from_str("{}").unwrap();
        assert!(conns.edges.is_empty());
    }
}
