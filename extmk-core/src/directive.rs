//! `//@keyword: value` directives from the leading comment block of a source file.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExtmkError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveKind {
    CppFlags,
    CFlags,
    CxxFlags,
    LdFlags,
    RefLibs,
}

impl DirectiveKind {
    pub const ALL: [DirectiveKind; 5] = [
        DirectiveKind::CppFlags,
        DirectiveKind::CFlags,
        DirectiveKind::CxxFlags,
        DirectiveKind::LdFlags,
        DirectiveKind::RefLibs,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            DirectiveKind::CppFlags => "cppflags",
            DirectiveKind::CFlags => "cflags",
            DirectiveKind::CxxFlags => "cxxflags",
            DirectiveKind::LdFlags => "ldflags",
            DirectiveKind::RefLibs => "reflibs",
        }
    }

    /// Case-insensitive keyword lookup. Unknown words return `None`.
    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.keyword().eq_ignore_ascii_case(word))
    }

    /// Whether the value is kept as separate whitespace tokens.
    pub fn is_tokenized(self) -> bool {
        matches!(self, DirectiveKind::LdFlags | DirectiveKind::RefLibs)
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One parsed directive. Compile-flag kinds carry a single joined string,
/// link kinds carry tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Directive {
    CppFlags(String),
    CFlags(String),
    CxxFlags(String),
    LdFlags(Vec<String>),
    RefLibs(Vec<String>),
}

impl Directive {
    fn from_raw(kind: DirectiveKind, raw: &str) -> Self {
        let tokens: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
        match kind {
            DirectiveKind::CppFlags => Directive::CppFlags(tokens.join(" ")),
            DirectiveKind::CFlags => Directive::CFlags(tokens.join(" ")),
            DirectiveKind::CxxFlags => Directive::CxxFlags(tokens.join(" ")),
            DirectiveKind::LdFlags => Directive::LdFlags(tokens),
            DirectiveKind::RefLibs => Directive::RefLibs(tokens),
        }
    }

    pub fn kind(&self) -> DirectiveKind {
        match self {
            Directive::CppFlags(_) => DirectiveKind::CppFlags,
            Directive::CFlags(_) => DirectiveKind::CFlags,
            Directive::CxxFlags(_) => DirectiveKind::CxxFlags,
            Directive::LdFlags(_) => DirectiveKind::LdFlags,
            Directive::RefLibs(_) => DirectiveKind::RefLibs,
        }
    }

    /// Entries of this directive. An empty single-value directive has none.
    pub fn values(&self) -> &[String] {
        match self {
            Directive::CppFlags(v) | Directive::CFlags(v) | Directive::CxxFlags(v) => {
                if v.is_empty() {
                    &[]
                } else {
                    std::slice::from_ref(v)
                }
            }
            Directive::LdFlags(tokens) | Directive::RefLibs(tokens) => tokens,
        }
    }
}

/// Directives declared by one file, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveSet {
    entries: IndexMap<DirectiveKind, Directive>,
}

impl DirectiveSet {
    pub fn get(&self, kind: DirectiveKind) -> Option<&Directive> {
        self.entries.get(&kind)
    }

    pub fn values(&self, kind: DirectiveKind) -> &[String] {
        self.get(kind).map(Directive::values).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Directive> {
        self.entries.values()
    }
}

fn directive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@([A-Za-z_]+):(.*)$").expect("directive regex is valid"))
}

/// Parse the directives of a file on disk. Unreadable files have no directives.
pub fn parse_file(path: &Path) -> Result<DirectiveSet> {
    match fs::read(path) {
        Ok(bytes) => parse_str(path, &String::from_utf8_lossy(&bytes)),
        Err(err) => {
            debug!(path = %path.display(), %err, "unreadable source, no directives");
            Ok(DirectiveSet::default())
        }
    }
}

/// Parse directives out of `text`; `path` is only used for error reporting.
pub fn parse_str(path: &Path, text: &str) -> Result<DirectiveSet> {
    let mut set = DirectiveSet::default();
    let mut in_block = false;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();

        if in_block {
            in_block = !line.contains("*/");
        } else if let Some(rest) = line.strip_prefix("/*") {
            in_block = !rest.contains("*/");
        } else if !line.starts_with("//") {
            if line.is_empty() || is_pre_code(line) {
                continue;
            }
            break;
        }

        let Some(caps) = directive_re().captures(line) else {
            continue;
        };
        let Some(kind) = DirectiveKind::from_keyword(&caps[1]) else {
            continue;
        };
        if set.entries.contains_key(&kind) {
            return Err(ExtmkError::DuplicateDirective {
                path: path.to_path_buf(),
                line: idx + 1,
                keyword: kind.keyword(),
            });
        }

        let value = caps[2].trim();
        let value = value.strip_suffix("*/").unwrap_or(value);
        set.entries.insert(kind, Directive::from_raw(kind, value));
    }

    Ok(set)
}

/// Preprocessor lines other than includes/imports may precede the directives.
fn is_pre_code(line: &str) -> bool {
    match line.strip_prefix('#') {
        Some(rest) => {
            let word = rest.trim_start();
            !(word.starts_with("include") || word.starts_with("import"))
        }
        None => false,
    }
}
