//! Scan, group, link and emit: the generation pipeline.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::GeneratorConfig;
use crate::directive::parse_file;
use crate::discovery::{check_root, SourceDiscovery, TreeScanner};
use crate::emit::emit;
use crate::error::Result;
use crate::group::{group_directory, Target, TargetKind};
use crate::link::{link_archives, ArchiveTable};

/// Every resolved target, archives first, each list in directory then
/// discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub archives: Vec<Target>,
    pub modules: Vec<Target>,
}

impl BuildPlan {
    /// Archives then modules, in emission order.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.archives.iter().chain(&self.modules)
    }

    pub fn find(&self, kind: TargetKind, name: &str) -> Option<&Target> {
        let list = match kind {
            TargetKind::Archive => &self.archives,
            TargetKind::Module => &self.modules,
        };
        list.iter().find(|t| t.name == name)
    }
}

/// Summary of a completed `generate` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub output: PathBuf,
    pub archives: usize,
    pub modules: usize,
}

/// Resolve archives and modules under `project_dir` without writing anything.
pub fn plan(project_dir: &Path, config: &GeneratorConfig) -> Result<BuildPlan> {
    check_root(&config.archive_root)?;
    check_root(&config.module_root)?;

    let archives = resolve_root(project_dir, &config.archive_root, TargetKind::Archive, config)?;
    let table = ArchiveTable::from_targets(&archives);
    info!(archives = table.len(), root = %config.archive_root, "resolved archives");

    let mut modules = resolve_root(project_dir, &config.module_root, TargetKind::Module, config)?;
    for module in &mut modules {
        for name in link_archives(module, &table) {
            if config.warn_unresolved_references {
                warn!(module = %module.name, archive = %name, "referenced archive not found");
            } else {
                debug!(module = %module.name, archive = %name, "referenced archive not found");
            }
        }
    }
    info!(modules = modules.len(), root = %config.module_root, "resolved modules");

    Ok(BuildPlan { archives, modules })
}

fn resolve_root(
    project_dir: &Path,
    root: &str,
    kind: TargetKind,
    config: &GeneratorConfig,
) -> Result<Vec<Target>> {
    let scanner = TreeScanner::new(project_dir, root).follow_symlinks(config.follow_symlinks);
    let mut targets = Vec::new();

    for inventory in scanner.discover()? {
        let groups = group_directory(&inventory, kind, &config.cxx_runtime, |file| {
            parse_file(&file.path)
        })?;
        targets.extend(groups.into_values());
    }

    Ok(targets)
}

/// Where the fragment for `project_dir` is written.
pub fn output_path(project_dir: &Path, config: &GeneratorConfig) -> PathBuf {
    if config.output.is_absolute() {
        config.output.clone()
    } else {
        project_dir.join(&config.output)
    }
}

/// Run the whole pipeline and write the fragment, stamped with the current time.
pub fn generate(project_dir: &Path, config: &GeneratorConfig) -> Result<GenerationReport> {
    generate_at(project_dir, config, Utc::now())
}

/// [`generate`] with an explicit timestamp.
pub fn generate_at(
    project_dir: &Path,
    config: &GeneratorConfig,
    generated_at: DateTime<Utc>,
) -> Result<GenerationReport> {
    let plan = plan(project_dir, config)?;
    let output = output_path(project_dir, config);
    emit(&plan, generated_at, &output)?;
    info!(output = %output.display(), "wrote build fragment");

    Ok(GenerationReport {
        output,
        archives: plan.archives.len(),
        modules: plan.modules.len(),
    })
}
