//! Compilable source files and the language split that drives linking.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Extensions the scanner picks up.
pub const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx"];

/// Which driver a target links with.
///
/// Ordering matters: `Plain < Extended`, so escalation is a `max`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linker {
    /// `$(CC)`.
    #[default]
    Plain,
    /// `$(CXX)`; needs the extended-language runtime at link time.
    Extended,
}

impl Linker {
    pub fn for_extension(ext: &str) -> Option<Self> {
        match ext {
            "c" => Some(Linker::Plain),
            "cc" | "cpp" | "cxx" => Some(Linker::Extended),
            _ => None,
        }
    }

    /// Make variable naming the compiler driver.
    pub fn make_var(self) -> &'static str {
        match self {
            Linker::Plain => "$(CC)",
            Linker::Extended => "$(CXX)",
        }
    }

    pub fn escalate(&mut self, other: Linker) {
        *self = (*self).max(other);
    }
}

impl fmt::Display for Linker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Linker::Plain => f.write_str("plain"),
            Linker::Extended => f.write_str("extended"),
        }
    }
}

/// One file found by the tree scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path as found on disk (project directory joined with the relative path).
    pub path: PathBuf,
    /// Path relative to the project directory, `/`-separated.
    pub rel_path: String,
    /// File name without extension.
    pub name: String,
    pub ext: String,
}

impl SourceFile {
    pub fn linker(&self) -> Linker {
        Linker::for_extension(&self.ext).unwrap_or_default()
    }

    /// Object path inside `$(OBJDIR)` with the extension rewritten to `.o`.
    pub fn object_path(&self) -> String {
        let stem = self
            .rel_path
            .strip_suffix(self.ext.as_str())
            .and_then(|s| s.strip_suffix('.'))
            .unwrap_or(&self.rel_path);
        format!("$(OBJDIR)/{stem}.o")
    }
}

pub(crate) fn is_source(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => SOURCE_EXTENSIONS.contains(&ext),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(rel: &str, name: &str, ext: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from(rel),
            rel_path: rel.to_string(),
            name: name.to_string(),
            ext: ext.to_string(),
        }
    }

    #[test]
    fn recognises_source_extensions() {
        assert!(is_source("src/a.c".as_ref()));
        assert!(is_source("src/a.cpp".as_ref()));
        assert!(is_source("src/a.cc".as_ref()));
        assert!(!is_source("src/a.C".as_ref()));
        assert!(!is_source("src/a.h".as_ref()));
        assert!(!is_source("src/Makefile".as_ref()));
    }

    #[test]
    fn escalation_never_reverts() {
        let mut linker = Linker::Plain;
        linker.escalate(Linker::Extended);
        linker.escalate(Linker::Plain);
        assert_eq!(linker, Linker::Extended);
    }

    #[test]
    fn object_path_rewrites_extension_only() {
        let f = file("src/net/c.cpp.cpp", "c.cpp", "cpp");
        assert_eq!(f.object_path(), "$(OBJDIR)/src/net/c.cpp.o");
        assert_eq!(file("lib/x.c", "x", "c").object_path(), "$(OBJDIR)/lib/x.o");
    }
}
