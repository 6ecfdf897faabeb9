//! extmk-core: makefile fragments for native extension modules
//!
//! Packages that mix interpreted code with compiled extensions keep their
//! native sources in two trees: `lib/` for static archives shared between
//! extensions and `src/` for the extension modules themselves. This crate
//! turns those trees into one declarative make fragment:
//!
//! - **Discovery** walks each root and collects `.c`/`.cc`/`.cpp`/`.cxx`
//!   files per directory ([`discovery`]).
//! - **Directives** read `//@cflags:`-style configuration from the leading
//!   comment block of every file ([`directive`]).
//! - **Grouping** folds sibling files into targets by name prefix, so
//!   `foo.c`, `foo_io.c` and `foo_fast.cpp` build one `foo` module
//!   ([`group`]).
//! - **Linking** resolves `@reflibs` names against the archives, pulling in
//!   their paths, link flags and linker requirements ([`link`]).
//! - **Emission** renders archives, modules and a trailing module list, and
//!   atomically replaces the output file ([`emit`]).
//!
//! ```rust,no_run
//! use std::path::Path;
//! use extmk_core::config::GeneratorConfig;
//!
//! let project = Path::new(".");
//! let config = GeneratorConfig::discover(project)?;
//! let report = extmk_core::generate(project, &config)?;
//! println!("{} modules -> {}", report.modules, report.output.display());
//! # Ok::<(), extmk_core::ExtmkError>(())
//! ```

pub mod config;
pub mod directive;
pub mod discovery;
pub mod emit;
pub mod error;
pub mod group;
pub mod link;
pub mod output;
pub mod plan;
pub mod source;

pub use error::{ExtmkError, Result};
pub use plan::{generate, generate_at, output_path, plan, BuildPlan, GenerationReport};
