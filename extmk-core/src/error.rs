//! Error types for extmk-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for extmk-core operations.
pub type Result<T> = std::result::Result<T, ExtmkError>;

/// Everything that can abort a generation run.
#[derive(Error, Debug)]
pub enum ExtmkError {
    /// Root path starts with a character outside `[A-Za-z0-9_]`.
    #[error("invalid root path {root:?}: must start with an ASCII letter, digit or underscore")]
    InvalidRoot { root: String },

    /// Two files in one directory share a base name.
    #[error("duplicate source name `{name}` in {dir}: found both .{first} and .{second}")]
    DuplicateBaseName {
        dir: PathBuf,
        name: String,
        first: String,
        second: String,
    },

    /// A directive keyword declared twice in the same file.
    #[error("{}:{line}: duplicate @{keyword}: directive", path.display())]
    DuplicateDirective {
        path: PathBuf,
        line: usize,
        keyword: &'static str,
    },

    /// Directory traversal failed.
    #[error("failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// Failed to read the configuration file.
    #[error("failed to read config file {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("failed to parse config file {}: {source}", path.display())]
    ParseConfig {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Output directory could not be created.
    #[error("cannot create output directory {}: {source}", path.display())]
    CreateOutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Output fragment could not be written or moved into place.
    #[error("cannot write build fragment {}: {source}", path.display())]
    WriteOutput {
        path: PathBuf,
        source: std::io::Error,
    },
}
