use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::error::{RigError, RigResult};

/// Project whose part definitions take category priority during registry scans.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// Category name given to definitions found under `root`.
    pub name: String,
    /// Project root directory.
    pub root: PathBuf,
}

/// Build-wide settings: naming tokens, scene container names and search paths.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigSettings {
    /// Left side token.
    pub left: String,
    /// Right side token.
    pub right: String,
    /// Center side token.
    pub center: String,
    /// Name token delimiter.
    pub delimiter: char,
    /// Global container every finished guide root is parented under.
    pub guide_container: String,
    /// Global container for rig groups without a driver.
    pub parts_container: String,
    /// Node carrying the global visibility toggles.
    pub settings_node: String,
    /// Prefix used to stash other guide populations during a build.
    pub stash_prefix: String,
    /// Directories scanned for part and template definitions.
    pub search_paths: Vec<PathBuf>,
    /// Active project, if any.
    pub project: Option<ProjectSettings>,
    /// Upper bound on resolver round trips for a single rename.
    pub max_resolve_attempts: u32,
}

impl Default for RigSettings {
    fn default() -> Self {
        Self {
            left: "L".to_owned(),
            right: "R".to_owned(),
            center: "C".to_owned(),
            delimiter: '_',
            guide_container: "guides".to_owned(),
            parts_container: "parts".to_owned(),
            settings_node: "rig_settings".to_owned(),
            stash_prefix: "stash".to_owned(),
            search_paths: Vec::new(),
            project: None,
            max_resolve_attempts: 32,
        }
    }
}

impl RigSettings {
    /// Parse settings from a JSON reader; absent fields take their defaults.
    pub fn from_reader<R: std::io::Read>(r: R) -> RigResult<Self> {
        let settings: Self = serde_json::from_reader(r)
            .map_err(|e| RigError::serde(format!("parse settings JSON: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> RigResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            RigError::configuration(format!("open settings '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Reject token sets the naming convention cannot round-trip.
    pub fn validate(&self) -> RigResult<()> {
        let sides = [&self.left, &self.right, &self.center];
        for side in sides {
            if side.is_empty() {
                return Err(RigError::configuration("side tokens must be non-empty"));
            }
            if side.contains(self.delimiter) {
                return Err(RigError::configuration(format!(
                    "side token '{side}' contains the delimiter '{}'",
                    self.delimiter
                )));
            }
        }
        if self.left == self.right || self.left == self.center || self.right == self.center {
            return Err(RigError::configuration("side tokens must be distinct"));
        }
        if self.stash_prefix.is_empty() {
            return Err(RigError::configuration("stash prefix must be non-empty"));
        }
        if self.max_resolve_attempts == 0 {
            return Err(RigError::configuration(
                "max_resolve_attempts must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
