use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use proptest::prelude::*;

use extmk_core::directive::{parse_str, DirectiveKind, DirectiveSet};
use extmk_core::discovery::DirInventory;
use extmk_core::group::{group_directory, TargetKind};
use extmk_core::source::SourceFile;

fn inventory(names: &BTreeSet<String>) -> DirInventory {
    let mut inv = DirInventory::new("");
    for name in names {
        let rel = format!("src/{name}.c");
        let file = SourceFile {
            path: PathBuf::from(&rel),
            rel_path: rel,
            name: name.clone(),
            ext: "c".to_string(),
        };
        inv.insert(file, Path::new("src")).expect("unique names");
    }
    inv
}

proptest! {
    #[test]
    fn every_file_lands_in_exactly_one_group(names in prop::collection::btree_set("[a-c_]{1,5}", 1..24)) {
        let inv = inventory(&names);
        let groups = group_directory(&inv, TargetKind::Module, "", |_| Ok(DirectiveSet::default()))
            .expect("group");

        let mut seen = Vec::new();
        for (key, target) in &groups {
            prop_assert!(target.sources[0].file.name == *key);
            for source in &target.sources {
                prop_assert!(source.file.name.starts_with(key.as_str()));
                seen.push(source.file.name.clone());
            }
        }
        seen.sort();
        let expected: Vec<String> = names.iter().cloned().collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn reflibs_tokens_ignore_surrounding_whitespace(
        lead in "[ \t]{0,4}",
        gap in "[ \t]{1,4}",
        tail in "[ \t]{0,4}",
    ) {
        let text = format!("//@reflibs:{lead}string{gap}util/memory{tail}\n");
        let set = parse_str(Path::new("m.c"), &text).expect("parse");
        prop_assert_eq!(set.values(DirectiveKind::RefLibs), ["string", "util/memory"]);
    }
}
