//! Device library resolution.
//!
//! Decides whether a module calls into the device math runtime and therefore
//! needs libdevice linked before optimization. A function qualifies when it is
//! not an intrinsic, has no body and carries one of [`DEVICE_RUNTIME_PREFIXES`].
//! The prefix list has to track what the front end emits; a call it misses
//! shows up later as an unresolved symbol in the emitted PTX.

use inkwell::module::Module;
use inkwell::values::FunctionValue;

/// Name prefixes of functions provided by the device runtime library.
pub const DEVICE_RUNTIME_PREFIXES: &[&str] = &["__nv_"];

/// Whether `function` is an undefined, non-intrinsic reference into the device runtime.
pub fn is_device_runtime_reference(function: &FunctionValue<'_>) -> bool {
    if function.get_intrinsic_id() != 0 || function.count_basic_blocks() != 0 {
        return false;
    }

    let name = function.get_name().to_string_lossy();
    DEVICE_RUNTIME_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Whether the device runtime library must be linked into `module`.
///
/// Stops at the first qualifying declaration.
pub fn needs_library(module: &Module<'_>) -> bool {
    let found = module
        .get_functions()
        .find(is_device_runtime_reference);

    if let Some(function) = &found {
        log::debug!(
            "device library needed for '{}'",
            function.get_name().to_string_lossy()
        );
    }
    found.is_some()
}

/// Names of every declaration that [`needs_library`] would match.
pub fn needed_symbols(module: &Module<'_>) -> Vec<String> {
    module
        .get_functions()
        .filter(is_device_runtime_reference)
        .map(|f| f.get_name().to_string_lossy().into_owned())
        .collect()
}
