//! Makefile fragment rendering and atomic emission.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

use crate::error::{ExtmkError, Result};
use crate::group::{Target, TargetKind};
use crate::plan::BuildPlan;

/// Variable listing every module name, written last.
pub const MANIFEST_VAR: &str = "EXTMK_MODULES";

const DEFAULTS: &[(&str, &str)] = &[
    ("CC", "cc"),
    ("CXX", "c++"),
    ("AR", "ar"),
    ("RANLIB", "ranlib"),
    ("OBJDIR", "build/obj"),
    ("LIBDIR", "build/lib"),
    ("MODDIR", "build/modules"),
    ("SOEXT", ".so"),
];

/// `(extension, compiler, flags suffix)` for the generic compile rules.
const COMPILE_RULES: &[(&str, &str, &str)] = &[
    ("c", "$(CC)", "CFLAGS"),
    ("cc", "$(CXX)", "CXXFLAGS"),
    ("cpp", "$(CXX)", "CXXFLAGS"),
    ("cxx", "$(CXX)", "CXXFLAGS"),
];

const LINK_FLAG_SETS: &str =
    "$(GLOBAL_LDFLAGS) $(PLATFORM_LDFLAGS) $(COVERAGE_LDFLAGS) $(SANITIZER_LDFLAGS)";

/// Render the whole fragment for `plan`.
///
/// Output depends only on the plan and `generated_at`.
pub fn write_fragment(plan: &BuildPlan, generated_at: DateTime<Utc>, mut w: impl Write) -> io::Result<()> {
    writeln!(w, "# Generated by extmk. DO NOT EDIT: this file is rewritten on every run.")?;
    writeln!(w, "# Generated at: {}", generated_at.format("%Y-%m-%dT%H:%M:%SZ"))?;
    writeln!(w)?;

    for (var, value) in DEFAULTS {
        writeln!(w, "{var} ?= {value}")?;
    }
    writeln!(w)?;

    for (ext, compiler, flags) in COMPILE_RULES {
        writeln!(w, "$(OBJDIR)/%.o: %.{ext}")?;
        writeln!(w, "\t@mkdir -p $(@D)")?;
        writeln!(
            w,
            "\t{compiler} $(GLOBAL_CPPFLAGS) $(FILE_CPPFLAGS) $(GLOBAL_{flags}) $(PLATFORM_{flags}) \
             $(COVERAGE_{flags}) $(SANITIZER_{flags}) $(FILE_{flags}) -c $< -o $@"
        )?;
        writeln!(w)?;
    }

    for target in plan.archives.iter().chain(&plan.modules) {
        write_target(target, &mut w)?;
        writeln!(w)?;
    }

    let names: Vec<&str> = plan.modules.iter().map(|m| m.name.as_str()).collect();
    write_assign(&mut w, MANIFEST_VAR, names)?;
    Ok(())
}

fn write_target(target: &Target, mut w: impl Write) -> io::Result<()> {
    let stem = target.stem();
    let label = match target.kind {
        TargetKind::Archive => "archive",
        TargetKind::Module => "module",
    };
    writeln!(w, "# {label} {}", target.name)?;

    let sources = target.sources.iter().map(|s| s.file.rel_path.as_str());
    let objects: Vec<String> = target.sources.iter().map(|s| s.file.object_path()).collect();
    write_assign(&mut w, &format!("{stem}_SOURCES"), sources)?;
    write_assign(&mut w, &format!("{stem}_OBJECTS"), objects.iter().map(String::as_str))?;
    writeln!(w, "{stem}_LINKER := {}", target.linker.make_var())?;
    write_assign(&mut w, &format!("{stem}_LDFLAGS"), target.ldflags.iter().map(String::as_str))?;

    for (source, object) in target.sources.iter().zip(&objects) {
        for (var, flags) in source.flags.overrides() {
            if !flags.is_empty() {
                writeln!(w, "{object}: {var} := {}", flags.join(" "))?;
            }
        }
    }

    let output = target.output_path();
    match target.kind {
        TargetKind::Archive => {
            writeln!(w, "{output}: $({stem}_OBJECTS)")?;
            writeln!(w, "\t@mkdir -p $(@D)")?;
            writeln!(w, "\t$(AR) rcs $@ $({stem}_OBJECTS)")?;
            writeln!(w, "\t$(RANLIB) $@")?;
        }
        TargetKind::Module => {
            write!(w, "{output}: $({stem}_OBJECTS)")?;
            for prerequisite in &target.prerequisites {
                write!(w, " {prerequisite}")?;
            }
            writeln!(w)?;
            writeln!(w, "\t@mkdir -p $(@D)")?;
            writeln!(
                w,
                "\t$({stem}_LINKER) -shared -o $@ $({stem}_OBJECTS) $({stem}_LDFLAGS) {LINK_FLAG_SETS}"
            )?;
        }
    }
    Ok(())
}

fn write_assign<'a>(mut w: impl Write, var: &str, values: impl IntoIterator<Item = &'a str>) -> io::Result<()> {
    write!(w, "{var} :=")?;
    for value in values {
        write!(w, " {value}")?;
    }
    writeln!(w)
}

/// Render `plan` and atomically replace `output` with it.
///
/// The fragment goes to a temporary file next to `output` that is renamed
/// into place, so readers never observe a half-written file and a failed
/// run leaves the previous fragment untouched.
pub fn emit(plan: &BuildPlan, generated_at: DateTime<Utc>, output: &Path) -> Result<()> {
    let mut rendered = Vec::new();
    write_fragment(plan, generated_at, &mut rendered).map_err(|source| ExtmkError::WriteOutput {
        path: output.to_path_buf(),
        source,
    })?;
    write_atomic(output, &rendered)
}

fn write_atomic(output: &Path, contents: &[u8]) -> Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|source| ExtmkError::CreateOutputDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let write_err = |source| ExtmkError::WriteOutput {
        path: output.to_path_buf(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents).map_err(write_err)?;
    // Temp files start out owner-only; keep the mode readers already rely on.
    if let Some(permissions) = output_permissions(output) {
        tmp.as_file().set_permissions(permissions).map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(output).map_err(|err| write_err(err.error))?;
    Ok(())
}

fn output_permissions(output: &Path) -> Option<fs::Permissions> {
    match fs::metadata(output) {
        Ok(meta) if meta.is_file() => Some(meta.permissions()),
        _ => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}
