//! Source tree scanning for extmk-core.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{ExtmkError, Result};
use crate::source::{is_source, SourceFile};

/// Compilable files of one directory, keyed by base name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirInventory {
    /// Directory relative to the scanned root (`""` for the root itself).
    pub dir: String,
    files: BTreeMap<String, SourceFile>,
}

impl DirInventory {
    pub fn new(dir: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            files: BTreeMap::new(),
        }
    }

    /// Base names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&SourceFile> {
        self.files.get(name)
    }

    /// Files in ascending base-name order.
    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Add a file, rejecting a second file with the same base name.
    pub fn insert(&mut self, file: SourceFile, abs_dir: &Path) -> Result<()> {
        match self.files.entry(file.name.clone()) {
            Entry::Occupied(existing) => Err(ExtmkError::DuplicateBaseName {
                dir: abs_dir.to_path_buf(),
                name: file.name,
                first: existing.get().ext.clone(),
                second: file.ext,
            }),
            Entry::Vacant(slot) => {
                slot.insert(file);
                Ok(())
            }
        }
    }
}

/// Anything that can produce per-directory inventories.
pub trait SourceDiscovery {
    fn discover(&self) -> Result<Vec<DirInventory>>;
}

/// Recursive filesystem walker over one root below a project directory.
#[derive(Debug, Clone)]
pub struct TreeScanner {
    project_dir: PathBuf,
    root: String,
    follow_symlinks: bool,
}

impl TreeScanner {
    pub fn new(project_dir: impl Into<PathBuf>, root: impl Into<String>) -> Self {
        Self {
            project_dir: project_dir.into(),
            root: root.into(),
            follow_symlinks: false,
        }
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}

impl SourceDiscovery for TreeScanner {
    fn discover(&self) -> Result<Vec<DirInventory>> {
        check_root(&self.root)?;
        let root = self.root.trim_end_matches('/');
        let abs_root = self.project_dir.join(root);

        if !abs_root.is_dir() {
            debug!(root = %abs_root.display(), "root missing, nothing to scan");
            return Ok(Vec::new());
        }

        let mut dirs: BTreeMap<String, DirInventory> = BTreeMap::new();
        let walker = WalkDir::new(&abs_root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_source(path) {
                continue;
            }

            let (Some(name), Some(ext)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|s| s.to_str()),
            ) else {
                continue;
            };

            let rel = slash_path(path.strip_prefix(&abs_root).unwrap_or(path));
            let dir = match rel.rsplit_once('/') {
                Some((dir, _)) => dir.to_string(),
                None => String::new(),
            };
            let abs_dir = path.parent().unwrap_or(&abs_root);

            let file = SourceFile {
                path: path.to_path_buf(),
                rel_path: format!("{root}/{rel}"),
                name: name.to_string(),
                ext: ext.to_string(),
            };
            dirs.entry(dir.clone())
                .or_insert_with(|| DirInventory::new(dir))
                .insert(file, abs_dir)?;
        }

        debug!(root = %abs_root.display(), dirs = dirs.len(), "scanned");
        Ok(dirs.into_values().collect())
    }
}

/// Reject roots starting with anything but an ASCII letter, digit or `_`.
pub fn check_root(root: &str) -> Result<()> {
    match root.chars().next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' => Ok(()),
        _ => Err(ExtmkError::InvalidRoot {
            root: root.to_string(),
        }),
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
