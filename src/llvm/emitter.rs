//! PTX assembly emission.
//!
//! The NVPTX backend lowers the module straight into an in-memory buffer; no
//! object file is produced. The emit-to-buffer entry point of the LLVM C API
//! builds its own code-emission pass manager and takes none from the caller,
//! so no target library info for the module's triple can be registered with
//! it; codegen runs with LLVM's default library info. The module's triple is
//! still expected to match the machine's, which
//! [`ResolvedTarget::bind`](super::loader::ResolvedTarget::bind) ensures.

use inkwell::module::Module;
use inkwell::targets::{FileType, TargetMachine};

use crate::core::error::{CompileError, CompileResult};

/// Lower `module` to PTX text. The module is consumed.
pub fn emit_assembly(module: Module<'_>, target_machine: &TargetMachine) -> CompileResult<String> {
    let module_triple = module.get_triple();
    let machine_triple = target_machine.get_triple();
    if module_triple.as_str() != machine_triple.as_str() {
        log::warn!(
            "module triple '{}' differs from target machine triple '{}'",
            module_triple.as_str().to_string_lossy(),
            machine_triple.as_str().to_string_lossy()
        );
    }

    let buffer = target_machine
        .write_to_memory_buffer(&module, FileType::Assembly)
        .map_err(|e| CompileError::Emit {
            message: e.to_string(),
        })?;
    drop(module);

    let text = String::from_utf8(buffer.as_slice().to_vec()).map_err(|e| CompileError::Emit {
        message: format!("backend produced non-UTF-8 assembly: {e}"),
    })?;

    log::debug!("emitted {} bytes of PTX", text.len());
    Ok(text)
}
