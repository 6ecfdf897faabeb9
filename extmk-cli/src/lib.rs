//! extmk CLI

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use regex::Regex;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use extmk_core::config::GeneratorConfig;
use extmk_core::directive::{parse_file, Directive, DirectiveSet};
use extmk_core::group::{Target, TargetKind};
use extmk_core::output::{write_json_pretty, write_ndjson};

/// CLI entrypoint for extmk.
#[derive(Debug, Parser)]
#[command(
    name = "extmk",
    version,
    about = "Generate a make fragment for native extension modules"
)]
pub struct Cli {
    /// Log debug detail to stderr
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::SetTrue, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short = 'q', long = "quiet", global = true, action = ArgAction::SetTrue)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan, resolve and write the build fragment
    Generate(GenerateArgs),
    /// Show resolved targets without writing anything
    Plan(PlanArgs),
    /// Print the directives parsed from one source file
    Directives(DirectivesArgs),
}

#[derive(Debug, Args)]
struct ProjectArgs {
    /// Project directory holding the source roots
    #[arg(short = 'C', long = "project", default_value = ".", value_hint = ValueHint::DirPath)]
    project: PathBuf,

    /// Config file (defaults to extmk.toml in the project directory)
    #[arg(long = "config", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Override the static archive root
    #[arg(long = "archive-root")]
    archive_root: Option<String>,

    /// Override the shared module root
    #[arg(long = "module-root")]
    module_root: Option<String>,

    /// Follow symlinks while walking roots
    #[arg(long = "follow-symlinks", action = ArgAction::SetTrue)]
    follow_symlinks: bool,

    /// Warn about @reflibs names with no matching archive
    #[arg(long = "warn-unresolved", action = ArgAction::SetTrue)]
    warn_unresolved: bool,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Fragment destination (relative to the project directory)
    #[arg(short = 'o', long = "output", value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct PlanArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Regex patterns; only targets whose name matches one are shown
    #[arg(short = 'n', long = "name", value_hint = ValueHint::Other)]
    name_patterns: Vec<String>,

    /// Emit a single JSON array
    #[arg(long = "json", action = ArgAction::SetTrue, conflicts_with = "ndjson")]
    json: bool,

    /// Emit newline-delimited JSON
    #[arg(long = "ndjson", action = ArgAction::SetTrue)]
    ndjson: bool,
}

#[derive(Debug, Args)]
struct DirectivesArgs {
    /// Source file to inspect
    #[arg(value_hint = ValueHint::FilePath)]
    file: PathBuf,

    /// Emit the directives as a JSON array
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

/// Parse CLI args and execute the selected command.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match cli.command {
        Command::Generate(args) => run_generate(args, &mut handle),
        Command::Plan(args) => run_plan(args, &mut handle),
        Command::Directives(args) => run_directives(args, &mut handle),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_env("EXTMK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(args: &ProjectArgs) -> Result<GeneratorConfig> {
    let mut config = match &args.config {
        Some(path) => GeneratorConfig::from_file(path)?,
        None => GeneratorConfig::discover(&args.project)?,
    };

    if let Some(root) = &args.archive_root {
        config.archive_root = root.clone();
    }
    if let Some(root) = &args.module_root {
        config.module_root = root.clone();
    }
    config.follow_symlinks |= args.follow_symlinks;
    config.warn_unresolved_references |= args.warn_unresolved;
    debug!(?config, "effective configuration");
    Ok(config)
}

fn run_generate(args: GenerateArgs, mut w: impl Write) -> Result<()> {
    let mut config = load_config(&args.project)?;
    if let Some(output) = args.output {
        config.output = output;
    }

    let report = extmk_core::generate(&args.project.project, &config).with_context(|| {
        format!(
            "generating build fragment for {}",
            args.project.project.display()
        )
    })?;

    writeln!(
        w,
        "wrote {} ({} archives, {} modules)",
        report.output.display(),
        report.archives,
        report.modules
    )?;
    Ok(())
}

fn run_plan(args: PlanArgs, mut w: impl Write) -> Result<()> {
    let config = load_config(&args.project)?;
    let patterns = compile_patterns(&args.name_patterns)?;
    let plan = extmk_core::plan(&args.project.project, &config)
        .with_context(|| format!("resolving targets in {}", args.project.project.display()))?;

    let selected: Vec<&Target> = plan
        .targets()
        .filter(|t| name_matches(&patterns, &t.name))
        .collect();

    if args.ndjson {
        write_ndjson(selected, &mut w)?;
    } else if args.json {
        write_json_pretty(selected, &mut w)?;
    } else {
        write_plain(&selected, &mut w)?;
    }
    Ok(())
}

fn run_directives(args: DirectivesArgs, mut w: impl Write) -> Result<()> {
    let set = parse_file(&args.file)?;
    if args.json {
        let directives: Vec<&Directive> = set.iter().collect();
        serde_json::to_writer_pretty(&mut w, &directives)?;
        writeln!(w)?;
        return Ok(());
    }
    write_directives(&args.file, &set, &mut w)
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("invalid regex: {p}")))
        .collect()
}

fn name_matches(patterns: &[Regex], name: &str) -> bool {
    patterns.is_empty() || patterns.iter().any(|re| re.is_match(name))
}

fn write_plain(targets: &[&Target], mut w: impl Write) -> Result<()> {
    for target in targets {
        let kind = match target.kind {
            TargetKind::Archive => "archive",
            TargetKind::Module => "module",
        };
        let count = target.sources.len();
        let noun = if count == 1 { "file" } else { "files" };
        writeln!(w, "{kind} {} {} {count} {noun}", target.name, target.linker)?;
    }
    Ok(())
}

fn write_directives(path: &Path, set: &DirectiveSet, mut w: impl Write) -> Result<()> {
    if set.is_empty() {
        writeln!(w, "{}: no directives", path.display())?;
        return Ok(());
    }

    for directive in set.iter() {
        let kind = directive.kind();
        if kind.is_tokenized() {
            writeln!(w, "{kind} = {:?}", directive.values())?;
        } else {
            writeln!(w, "{kind} = {:?}", directive.values().join(" "))?;
        }
    }
    Ok(())
}
