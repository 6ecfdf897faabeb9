//! Generator configuration (`extmk.toml`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ExtmkError, Result};

/// Name of the optional configuration file in the project directory.
pub const CONFIG_FILE: &str = "extmk.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Root holding static archive sources, relative to the project.
    pub archive_root: String,
    /// Root holding shared module sources, relative to the project.
    pub module_root: String,
    /// Fragment destination, relative to the project unless absolute.
    pub output: PathBuf,
    /// Link token added when a target needs the extended-language runtime.
    pub cxx_runtime: String,
    pub follow_symlinks: bool,
    /// Log a warning for `@reflibs` names with no matching archive.
    pub warn_unresolved_references: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            archive_root: "lib".to_string(),
            module_root: "src".to_string(),
            output: PathBuf::from("build/native.mk"),
            cxx_runtime: "-lstdc++".to_string(),
            follow_symlinks: false,
            warn_unresolved_references: false,
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ExtmkError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ExtmkError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `extmk.toml` from `project_dir` if present, defaults otherwise.
    pub fn discover(project_dir: &Path) -> Result<Self> {
        let candidate = project_dir.join(CONFIG_FILE);
        if candidate.is_file() {
            Self::from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: GeneratorConfig = toml::from_str(
            r#"
module_root = "ext"
warn_unresolved_references = true
            "#,
        )
        .expect("parse");

        assert_eq!(config.module_root, "ext");
        assert_eq!(config.archive_root, "lib");
        assert!(config.warn_unresolved_references);
        assert_eq!(config.output, PathBuf::from("build/native.mk"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: std::result::Result<GeneratorConfig, _> = toml::from_str("moduel_root = \"x\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn discover_falls_back_to_defaults() {
        let tmp = tempdir().expect("tempdir");
        let config = GeneratorConfig::discover(tmp.path()).expect("discover");
        assert_eq!(config, GeneratorConfig::default());

        fs::write(tmp.path().join(CONFIG_FILE), "cxx_runtime = \"-lc++\"\n").expect("write");
        let config = GeneratorConfig::discover(tmp.path()).expect("discover");
        assert_eq!(config.cxx_runtime, "-lc++");
    }

    #[test]
    fn malformed_file_reports_path() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "archive_root = [").expect("write");
        let err = GeneratorConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE));
    }
}
