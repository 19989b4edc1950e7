// This module loads the input module and binds it to the NVPTX target in two explicit
// phases. `load_module` reads a file (or standard input for `-`) into a memory buffer and
// parses it as textual IR or bitcode, turning parser failures into errors that name the
// input and carry the line/column of the diagnostic. `TargetHint::peek` then reads the
// triple and data layout the module declares, `ResolvedTarget::resolve` settles the final
// triple (architecture fixed to nvptx64, vendor/OS taken from the hint) and creates the
// target machine, and `ResolvedTarget::bind` writes the triple and the machine's data
// layout back into the module. No callback runs in the middle of parsing.

//! Input loading and target resolution.

use std::path::Path;

use inkwell::context::Context;
use inkwell::memory_buffer::MemoryBuffer;
use inkwell::module::Module;
use inkwell::targets::{CodeModel, RelocMode, Target, TargetMachine, TargetTriple};

use super::registry::TargetRegistry;
use crate::core::config::{OptLevel, STDIO_PLACEHOLDER};
use crate::core::error::{CompileError, CompileResult, SourceLocation};

/// Architecture every module is compiled for.
pub const NVPTX_ARCH: &str = "nvptx64";

/// Triple used when the module does not declare one.
pub const DEFAULT_TRIPLE: &str = "nvptx64-unknown-unknown";

/// Name used for an input in diagnostics; `-` reads as `<stdin>`.
pub fn display_name(input: &str) -> &str {
    if input == STDIO_PLACEHOLDER {
        "<stdin>"
    } else {
        input
    }
}

/// Read and parse `input` into a module owned by `context`.
///
/// Both textual IR and bitcode are accepted.
pub fn load_module<'ctx>(context: &'ctx Context, input: &str) -> CompileResult<Module<'ctx>> {
    let name = display_name(input);

    let buffer = if input == STDIO_PLACEHOLDER {
        MemoryBuffer::create_from_stdin()
    } else {
        MemoryBuffer::create_from_file(Path::new(input))
    }
    .map_err(|e| CompileError::InputRead {
        input: name.to_string(),
        message: e.to_string(),
    })?;

    context.create_module_from_ir(buffer).map_err(|e| {
        let raw = e.to_string();
        parse_error(name, raw.trim_end())
    })
}

/// Build a parse error from an LLVM diagnostic of the form
/// `<buffer>:<line>:<col>: error: <message>`.
fn parse_error(name: &str, raw: &str) -> CompileError {
    let message = raw
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix(':'))
        .map(str::trim_start)
        .unwrap_or(raw)
        .to_string();

    CompileError::Parse {
        input: name.to_string(),
        location: parse_location(&message),
        message,
    }
}

/// Extract the first `line:column` pair from the first line of a diagnostic.
pub fn parse_location(message: &str) -> Option<SourceLocation> {
    let first_line = message.lines().next()?;
    let parts: Vec<&str> = first_line.split(':').collect();

    parts.windows(2).find_map(|pair| {
        let line = pair[0].trim().parse::<u32>().ok()?;
        let column = pair[1].trim().parse::<u32>().ok()?;
        Some(SourceLocation { line, column })
    })
}

/// Target information a module declares about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetHint {
    pub triple: Option<String>,
    pub data_layout: Option<String>,
}

impl TargetHint {
    /// Read the declared triple and data layout, treating empty strings as absent.
    pub fn peek(module: &Module<'_>) -> Self {
        let triple = module.get_triple();
        let triple = triple.as_str().to_string_lossy().into_owned();
        let data_layout = module
            .get_data_layout()
            .as_str()
            .to_string_lossy()
            .into_owned();

        Self {
            triple: Some(triple).filter(|t| !t.is_empty()),
            data_layout: Some(data_layout).filter(|d| !d.is_empty()),
        }
    }
}

/// Compute the triple to compile for.
///
/// The architecture is always [`NVPTX_ARCH`]; vendor and OS come from the
/// declared triple. Returns the triple and the declared architecture when it
/// had to be replaced.
pub fn resolve_triple(declared: Option<&str>) -> (String, Option<String>) {
    let Some(declared) = declared.filter(|t| !t.is_empty()) else {
        return (DEFAULT_TRIPLE.to_string(), None);
    };

    let (arch, rest) = match declared.split_once('-') {
        Some((arch, rest)) => (arch, rest),
        None => (declared, ""),
    };
    let rest = if rest.is_empty() { "unknown-unknown" } else { rest };
    let overridden = (arch != NVPTX_ARCH).then(|| arch.to_string());

    (format!("{NVPTX_ARCH}-{rest}"), overridden)
}

/// The target a module is compiled for, with its machine.
#[derive(Debug)]
pub struct ResolvedTarget {
    triple: String,
    machine: TargetMachine,
}

impl ResolvedTarget {
    /// Look up the NVPTX target and create a machine for the hinted triple.
    pub fn resolve(
        _registry: &TargetRegistry,
        hint: &TargetHint,
        cpu: &str,
        features: &str,
        level: OptLevel,
    ) -> CompileResult<Self> {
        let (triple, overridden) = resolve_triple(hint.triple.as_deref());
        if let Some(arch) = overridden {
            log::warn!("module declares architecture '{arch}', compiling for '{NVPTX_ARCH}' instead");
        }

        let target = Target::from_name(NVPTX_ARCH).ok_or_else(|| CompileError::Target {
            triple: triple.clone(),
            reason: format!("no registered target named '{NVPTX_ARCH}'"),
        })?;

        let machine = target
            .create_target_machine(
                &TargetTriple::create(&triple),
                cpu,
                features,
                level.codegen_level(),
                RelocMode::Default,
                CodeModel::Default,
            )
            .ok_or_else(|| CompileError::Target {
                triple: triple.clone(),
                reason: format!("cannot create target machine for CPU '{cpu}' and features '{features}'"),
            })?;

        log::debug!("resolved target {triple} (cpu '{cpu}', {level})");
        Ok(Self { triple, machine })
    }

    pub fn triple(&self) -> &str {
        &self.triple
    }

    pub fn machine(&self) -> &TargetMachine {
        &self.machine
    }

    /// Data layout string of the target machine.
    pub fn data_layout(&self) -> String {
        self.machine
            .get_target_data()
            .get_data_layout()
            .as_str()
            .to_string_lossy()
            .into_owned()
    }

    /// Write the final triple and the machine's data layout into `module`.
    pub fn bind(&self, module: &Module<'_>, hint: &TargetHint) {
        let layout = self.machine.get_target_data().get_data_layout();

        if let Some(declared) = &hint.data_layout {
            let computed = layout.as_str().to_string_lossy();
            if declared.as_str() != computed {
                log::debug!("replacing declared data layout '{declared}' with '{computed}'");
            }
        }

        module.set_triple(&TargetTriple::create(&self.triple));
        module.set_data_layout(&layout);
    }
}
