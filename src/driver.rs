// This module is the top-level orchestration of a ptxc run. Driver walks a fixed sequence
// of stages: Load (parse the input and bind it to the resolved NVPTX target), ResolveLibrary
// (ask the resolver whether libdevice is needed and link it if so), OptimizeAndLink (run the
// pass pipeline at the configured level), Emit (lower to PTX in memory) and Persist (write
// the text to the resolved output path). Any stage failing ends the run with its error;
// nothing is written unless emission succeeded. The module and its context live only
// inside `Driver::run`, and each stage borrows the module for the duration of its call.

//! Compilation driver.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use inkwell::context::Context;

use crate::core::config::{DriverConfig, STDIO_PLACEHOLDER};
use crate::core::error::{CompileError, CompileResult};
use crate::core::session::{CompilationSession, SessionStats};
use crate::llvm::emitter::emit_assembly;
use crate::llvm::linker::link_needed;
use crate::llvm::loader::{load_module, ResolvedTarget, TargetHint};
use crate::llvm::pipeline::{optimize, OptimizationConfig};
use crate::llvm::registry::TargetRegistry;
use crate::llvm::resolver::needs_library;

/// Stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    ResolveLibrary,
    OptimizeAndLink,
    Emit,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::ResolveLibrary => "resolve-library",
            Self::OptimizeAndLink => "optimize",
            Self::Emit => "emit",
            Self::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// Where the assembly was written; `-` is standard output.
    pub path: PathBuf,
    pub stats: SessionStats,
}

/// Compiles one input module to PTX.
#[derive(Debug)]
pub struct Driver<'r> {
    registry: &'r TargetRegistry,
    config: DriverConfig,
}

impl<'r> Driver<'r> {
    pub fn new(registry: &'r TargetRegistry, config: DriverConfig) -> Self {
        Self { registry, config }
    }

    /// Run every stage for the configured input.
    pub fn run(&self) -> CompileResult<CompileOutput> {
        let config = &self.config;
        let session = CompilationSession::new(&config.input, config.opt_level);
        let context = Context::create();

        log::info!("{}: {}", Stage::Load, config.input);
        let module = load_module(&context, &config.input)?;
        let hint = TargetHint::peek(&module);
        let target = ResolvedTarget::resolve(
            self.registry,
            &hint,
            &config.cpu,
            &config.features,
            config.opt_level,
        )?;
        target.bind(&module, &hint);
        session.record_triple(target.triple());

        log::info!("{}", Stage::ResolveLibrary);
        let library_needed = needs_library(&module);
        session.record_library_needed(library_needed);
        if library_needed {
            let summary = link_needed(&module, &[&config.libdevice])?;
            session.record_link(summary.symbols_linked, summary.symbols_internalized);
        }

        log::info!("{}", Stage::OptimizeAndLink);
        session.record_functions_before(module.get_functions().count());
        let opt_config = OptimizationConfig::new(config.opt_level, config.inline_threshold);
        optimize(&module, target.machine(), &opt_config)?;
        session.record_functions_after(module.get_functions().count());

        log::info!("{}", Stage::Emit);
        let assembly = emit_assembly(module, target.machine())?;
        session.record_assembly_size(assembly.len());

        let path = resolve_output_path(&config.input, config.output.as_deref());
        log::info!("{}: {}", Stage::Persist, path.display());
        persist(&path, &assembly)?;

        let stats = session.stats();
        log::info!(
            "compiled {} to {} ({} bytes)",
            stats.input,
            path.display(),
            stats.assembly_size
        );
        Ok(CompileOutput { path, stats })
    }
}

/// Where the assembly goes.
///
/// An explicit path is used verbatim. Otherwise the input's final two
/// characters (its assumed `ll`/`bc` extension) are replaced with `ptx`;
/// standard input with no explicit path writes to standard output.
pub fn resolve_output_path(input: &str, explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if input == STDIO_PLACEHOLDER {
        return PathBuf::from(STDIO_PLACEHOLDER);
    }

    let cut = input
        .char_indices()
        .rev()
        .nth(1)
        .map_or(0, |(index, _)| index);
    PathBuf::from(format!("{}ptx", &input[..cut]))
}

/// Truncate-and-write `assembly` to `path` (`-` is standard output).
pub fn persist(path: &Path, assembly: &str) -> CompileResult<()> {
    if path == Path::new(STDIO_PLACEHOLDER) {
        let mut stdout = io::stdout().lock();
        return stdout
            .write_all(assembly.as_bytes())
            .and_then(|()| stdout.flush())
            .map_err(|source| CompileError::OutputWrite {
                path: path.to_path_buf(),
                source,
            });
    }

    let mut file = File::create(path).map_err(|source| CompileError::OutputOpen {
        path: path.to_path_buf(),
        source,
    })?;
    file.write_all(assembly.as_bytes())
        .map_err(|source| CompileError::OutputWrite {
            path: path.to_path_buf(),
            source,
        })
}
