//! Project-directory loader.
//!
//! Loads the on-disk JSON tree a Kunquat project is stored as:
//! `p_composition.json`, `p_connections.json`, `p_bind.json` and the
//! per-device `p_<param>.json` files. Only the in-memory data these files
//! describe is modeled here; resolving a connection's device/port paths
//! against a concrete graph and validating port compatibility is the
//! graph constructor's job, not this crate's.
//!
//! # Example
//!
//! ```rust,no_run
//! use kunquat_config::Project;
//!
//! let project = Project::load("my_song").unwrap();
//! println!("buf_count = {}", project.composition.buf_count);
//! ```

mod bind_loader;
mod composition;
mod connections;
mod error;
mod params;

pub use composition::Composition;
pub use connections::{ConnectionEdge, Connections};
pub use error::ConfigError;
pub use params::{DeviceParams, Param, ParamKey};

use std::path::{Path, PathBuf};

use kunquat_event::Bind;

/// A fully loaded project directory: composition parameters, the device
/// connection graph's edge list, and the event bind map.
///
/// Per-device parameter files are not eagerly loaded here since a project
/// may declare an arbitrary number of devices; load them on demand via
/// [`Project::device_params`].
pub struct Project {
    pub root: PathBuf,
    pub composition: Composition,
    pub connections: Connections,
    pub bind: Bind,
}

impl Project {
    /// Loads `p_composition.json`, `p_connections.json` and `p_bind.json`
    /// from `root`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any of the three files is missing,
    /// malformed, or (for the bind map) contains a cycle or a bad
    /// expression.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let root = root.as_ref().to_path_buf();
        let composition = Composition::load(root.join("p_composition.json"))?;
        let connections = Connections::load(root.join("p_connections.json"))?;
        let bind = bind_loader::load(root.join("p_bind.json"))?;

        Ok(Self {
            root,
            composition,
            connections,
            bind,
        })
    }

    /// Loads a device's `p_<param>.json` parameter file, relative to the
    /// project root.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn device_params(&self, relative_path: impl AsRef<Path>) -> Result<DeviceParams, ConfigError> {
        DeviceParams::load(self.root.join(relative_path))
    }
}
