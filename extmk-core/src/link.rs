//! Resolution of `@reflibs` names against already-resolved archives.

use indexmap::IndexMap;

use crate::group::{extend_unique, push_unique, Target, TargetKind};
use crate::source::Linker;

/// What a module inherits from an archive it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub output: String,
    pub linker: Linker,
    pub ldflags: Vec<String>,
}

/// Archives addressable by name, built from the archive pass.
#[derive(Debug, Clone, Default)]
pub struct ArchiveTable {
    by_name: IndexMap<String, ArchiveEntry>,
}

impl ArchiveTable {
    pub fn from_targets<'a>(archives: impl IntoIterator<Item = &'a Target>) -> Self {
        let by_name = archives
            .into_iter()
            .filter(|t| t.kind == TargetKind::Archive)
            .map(|t| {
                let entry = ArchiveEntry {
                    output: t.output_path(),
                    linker: t.linker,
                    ldflags: t.ldflags.clone(),
                };
                (t.name.clone(), entry)
            })
            .collect();
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&ArchiveEntry> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Amend `target` with the archives it references, in declaration order.
///
/// Each known archive contributes its output path and link flags to the
/// target's link flags, its output path to the prerequisites, and may
/// escalate the linker. Unknown names are skipped and returned; the link
/// step downstream is where they fail.
pub fn link_archives(target: &mut Target, table: &ArchiveTable) -> Vec<String> {
    let mut unresolved = Vec::new();

    for name in &target.reflibs {
        let Some(archive) = table.get(name) else {
            unresolved.push(name.clone());
            continue;
        };

        push_unique(&mut target.ldflags, &archive.output);
        extend_unique(&mut target.ldflags, &archive.ldflags);
        push_unique(&mut target.prerequisites, &archive.output);
        target.linker.escalate(archive.linker);
    }

    unresolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive(name: &str, linker: Linker, ldflags: &[&str]) -> Target {
        let mut t = Target::new(TargetKind::Archive, name);
        t.linker = linker;
        t.ldflags = ldflags.iter().map(|s| s.to_string()).collect();
        t
    }

    fn module(reflibs: &[&str]) -> Target {
        let mut t = Target::new(TargetKind::Module, "app");
        t.reflibs = reflibs.iter().map(|s| s.to_string()).collect();
        t.ldflags = vec!["-lm".to_string()];
        t
    }

    #[test]
    fn extended_archive_escalates_plain_module() {
        let table = ArchiveTable::from_targets(&[archive("string", Linker::Extended, &["-lstdc++"])]);
        let mut app = module(&["string"]);

        let unresolved = link_archives(&mut app, &table);

        assert!(unresolved.is_empty());
        assert_eq!(app.linker, Linker::Extended);
        assert_eq!(app.ldflags, ["-lm", "$(LIBDIR)/string.a", "-lstdc++"]);
        assert_eq!(app.prerequisites, ["$(LIBDIR)/string.a"]);
    }

    #[test]
    fn keeps_declaration_order_and_skips_unknown_names() {
        let table = ArchiveTable::from_targets(&[
            archive("util/memory", Linker::Plain, &[]),
            archive("string", Linker::Plain, &["-lz"]),
        ]);
        let mut app = module(&["string", "missing", "util/memory"]);

        let unresolved = link_archives(&mut app, &table);

        assert_eq!(unresolved, ["missing"]);
        assert_eq!(app.linker, Linker::Plain);
        assert_eq!(
            app.prerequisites,
            ["$(LIBDIR)/string.a", "$(LIBDIR)/util/memory.a"]
        );
        assert_eq!(
            app.ldflags,
            ["-lm", "$(LIBDIR)/string.a", "-lz", "$(LIBDIR)/util/memory.a"]
        );
    }

    #[test]
    fn table_ignores_modules() {
        let table = ArchiveTable::from_targets(&[module(&[])]);
        assert!(table.is_empty());
    }
}
