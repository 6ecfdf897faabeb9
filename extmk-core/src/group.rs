//! Prefix grouping of sibling source files into build targets.
//!
//! Files are visited in ascending name order. A file joins the first
//! already-open group whose key is a strict prefix of its name, otherwise
//! it opens a new group keyed by its own name, so chained prefixes collapse
//! into the shortest one: `a.c`, `ab.c` and `abc.c` all end up in `a`.
//! Groups are kept in an `IndexMap` and scanned in opening order.

use std::fmt::Write as _;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::directive::{DirectiveKind, DirectiveSet};
use crate::discovery::DirInventory;
use crate::error::Result;
use crate::source::{Linker, SourceFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Static archive built from the archive root.
    Archive,
    /// Shared object built from the module root.
    Module,
}

impl TargetKind {
    fn var_prefix(self) -> &'static str {
        match self {
            TargetKind::Archive => "lib",
            TargetKind::Module => "mod",
        }
    }
}

/// Per-file compile flag overrides taken from that file's directives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFlags {
    pub cppflags: Vec<String>,
    pub cflags: Vec<String>,
    pub cxxflags: Vec<String>,
}

impl FileFlags {
    fn from_directives(directives: &DirectiveSet) -> Self {
        let collect = |kind: DirectiveKind| {
            let mut out = Vec::new();
            extend_unique(&mut out, directives.values(kind));
            out
        };
        Self {
            cppflags: collect(DirectiveKind::CppFlags),
            cflags: collect(DirectiveKind::CFlags),
            cxxflags: collect(DirectiveKind::CxxFlags),
        }
    }

    /// `(make variable, flags)` pairs, in emission order.
    pub fn overrides(&self) -> [(&'static str, &[String]); 3] {
        [
            ("FILE_CPPFLAGS", self.cppflags.as_slice()),
            ("FILE_CFLAGS", self.cflags.as_slice()),
            ("FILE_CXXFLAGS", self.cxxflags.as_slice()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSource {
    pub file: SourceFile,
    pub flags: FileFlags,
}

/// A resolved archive or module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub kind: TargetKind,
    /// `<dir>/<group key>`, or just the key at the root.
    pub name: String,
    pub sources: Vec<TargetSource>,
    pub linker: Linker,
    pub ldflags: Vec<String>,
    /// Archive names declared through `@reflibs`, deduplicated.
    pub reflibs: Vec<String>,
    /// Archive outputs this target must be linked after.
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl Target {
    pub fn new(kind: TargetKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            sources: Vec::new(),
            linker: Linker::Plain,
            ldflags: Vec::new(),
            reflibs: Vec::new(),
            prerequisites: Vec::new(),
        }
    }

    /// Make-variable stem, e.g. `mod_net_Ssocket` for `net/socket`.
    ///
    /// Distinct names always give distinct stems: `_` becomes `__`, `/`
    /// becomes `_S` and any other byte outside `[A-Za-z0-9]` becomes `_x`
    /// followed by two hex digits.
    pub fn stem(&self) -> String {
        let mut stem = String::with_capacity(self.name.len() + 4);
        stem.push_str(self.kind.var_prefix());
        stem.push('_');
        for &byte in self.name.as_bytes() {
            match byte {
                b'_' => stem.push_str("__"),
                b'/' => stem.push_str("_S"),
                b if b.is_ascii_alphanumeric() => stem.push(b as char),
                b => {
                    let _ = write!(stem, "_x{b:02x}");
                }
            }
        }
        stem
    }

    pub fn output_path(&self) -> String {
        match self.kind {
            TargetKind::Archive => format!("$(LIBDIR)/{}.a", self.name),
            TargetKind::Module => format!("$(MODDIR)/{}$(SOEXT)", self.name),
        }
    }

    /// Merge one file in. Escalates the linker and adds `runtime` to the
    /// link flags when the file is extended-language.
    pub fn add_file(&mut self, file: &SourceFile, directives: &DirectiveSet, runtime: &str) {
        self.sources.push(TargetSource {
            file: file.clone(),
            flags: FileFlags::from_directives(directives),
        });
        extend_unique(&mut self.ldflags, directives.values(DirectiveKind::LdFlags));
        extend_unique(&mut self.reflibs, directives.values(DirectiveKind::RefLibs));

        if file.linker() == Linker::Extended {
            self.linker.escalate(Linker::Extended);
            if !runtime.is_empty() {
                push_unique(&mut self.ldflags, runtime);
            }
        }
    }
}

/// Group one directory's files. `directives_for` supplies each file's
/// directive set and is called once per file, in name order.
pub fn group_directory<F>(
    inventory: &DirInventory,
    kind: TargetKind,
    runtime: &str,
    mut directives_for: F,
) -> Result<IndexMap<String, Target>>
where
    F: FnMut(&SourceFile) -> Result<DirectiveSet>,
{
    let mut groups: IndexMap<String, Target> = IndexMap::new();

    for file in inventory.files() {
        let directives = directives_for(file)?;
        let open = groups
            .keys()
            .find(|key| key.len() < file.name.len() && file.name.starts_with(key.as_str()))
            .cloned();

        let key = match open {
            Some(key) => {
                debug!(file = %file.rel_path, group = %key, "merged into group");
                key
            }
            None => file.name.clone(),
        };

        groups
            .entry(key)
            .or_insert_with_key(|key| Target::new(kind, qualified_name(&inventory.dir, key)))
            .add_file(file, &directives, runtime);
    }

    Ok(groups)
}

fn qualified_name(dir: &str, key: &str) -> String {
    if dir.is_empty() {
        key.to_string()
    } else {
        format!("{dir}/{key}")
    }
}

pub(crate) fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

pub(crate) fn extend_unique<'a>(list: &mut Vec<String>, values: impl IntoIterator<Item = &'a String>) {
    for value in values {
        push_unique(list, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::parse_str;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    fn inventory(dir: &str, files: &[&str]) -> DirInventory {
        let mut inv = DirInventory::new(dir);
        for f in files {
            let (name, ext) = f.rsplit_once('.').expect("ext");
            let rel = if dir.is_empty() {
                format!("src/{f}")
            } else {
                format!("src/{dir}/{f}")
            };
            inv.insert(
                SourceFile {
                    path: PathBuf::from(&rel),
                    rel_path: rel,
                    name: name.to_string(),
                    ext: ext.to_string(),
                },
                Path::new("src"),
            )
            .expect("insert");
        }
        inv
    }

    fn group(inv: &DirInventory, text: &HashMap<&str, &str>) -> IndexMap<String, Target> {
        group_directory(inv, TargetKind::Module, "-lstdc++", |f| {
            parse_str(&f.path, text.get(f.name.as_str()).copied().unwrap_or(""))
        })
        .expect("group")
    }

    fn source_names(t: &Target) -> Vec<&str> {
        t.sources.iter().map(|s| s.file.name.as_str()).collect()
    }

    #[test]
    fn prefix_siblings_share_a_module() {
        let inv = inventory("", &["foo.c", "foo_bar.c", "foo_baz.cpp"]);
        let groups = group(&inv, &HashMap::new());

        assert_eq!(groups.len(), 1);
        let foo = &groups["foo"];
        assert_eq!(source_names(foo), ["foo", "foo_bar", "foo_baz"]);
        assert_eq!(foo.linker, Linker::Extended);
        assert_eq!(foo.ldflags.iter().filter(|f| *f == "-lstdc++").count(), 1);
    }

    #[test]
    fn unrelated_names_stay_apart() {
        let inv = inventory("", &["bar.c", "baz.c"]);
        let groups = group(&inv, &HashMap::new());
        assert_eq!(groups.keys().collect::<Vec<_>>(), ["bar", "baz"]);
        assert!(groups.values().all(|t| t.linker == Linker::Plain));
    }

    #[test]
    fn chained_prefixes_collapse_into_first_group() {
        let inv = inventory("", &["a.c", "ab.c", "abc.c"]);
        let groups = group(&inv, &HashMap::new());
        assert_eq!(groups.len(), 1);
        assert_eq!(source_names(&groups["a"]), ["a", "ab", "abc"]);
    }

    #[test]
    fn nested_directory_prefixes_target_name() {
        let inv = inventory("net", &["sock.c"]);
        let groups = group(&inv, &HashMap::new());
        let sock = &groups["sock"];
        assert_eq!(sock.name, "net/sock");
        assert_eq!(sock.stem(), "mod_net_Ssock");
        assert_eq!(sock.output_path(), "$(MODDIR)/net/sock$(SOEXT)");
    }

    #[test]
    fn stems_stay_distinct_when_names_differ() {
        let stem = |name: &str| Target::new(TargetKind::Module, name).stem();
        assert_eq!(stem("net_sock"), "mod_net__sock");
        assert_eq!(stem("net/sock"), "mod_net_Ssock");
        assert_eq!(stem("a_b"), "mod_a__b");
        assert_eq!(stem("a-b"), "mod_a_x2db");
        assert_ne!(stem("a/x2d"), stem("a-"));
        assert_ne!(stem("a_/b"), stem("a/_b"));
        assert_eq!(Target::new(TargetKind::Archive, "zlib").stem(), "lib_zlib");
    }

    #[test]
    fn merges_link_flags_and_keeps_file_flags_separate() {
        let inv = inventory("", &["img.c", "img_png.c"]);
        let text = HashMap::from([
            ("img", "// @ldflags: -lm -lz\n// @cflags: -O2\n"),
            ("img_png", "// @ldflags: -lpng -lz\n// @reflibs: util util\n"),
        ]);
        let groups = group(&inv, &text);
        let img = &groups["img"];

        assert_eq!(img.ldflags, ["-lm", "-lz", "-lpng"]);
        assert_eq!(img.reflibs, ["util"]);
        assert_eq!(img.sources[0].flags.cflags, ["-O2"]);
        assert!(img.sources[1].flags.cflags.is_empty());
    }

    #[test]
    fn directive_errors_abort_grouping() {
        let inv = inventory("", &["a.c"]);
        let result = group_directory(&inv, TargetKind::Module, "", |f| {
            parse_str(&f.path, "// @cflags: 1\n// @cflags: 2\n")
        });
        assert!(result.is_err());
    }
}
