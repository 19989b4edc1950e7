//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use inkwell::context::Context;
use inkwell::memory_buffer::MemoryBuffer;
use inkwell::module::{Linkage, Module};

/// NVPTX 64-bit data layout.
pub const NVPTX_LAYOUT: &str = "e-i64:64-i128:128-v16:16-v32:32-n16:32:64";

/// A kernel that needs nothing from the device library.
pub const PLAIN_KERNEL: &str = r#"
target datalayout = "e-i64:64-i128:128-v16:16-v32:32-n16:32:64"
target triple = "nvptx64-nvidia-cuda"

@scale = addrspace(1) global float 2.0

define internal float @square(float %x) {
entry:
  %r = fmul float %x, %x
  ret float %r
}

define float @compute(float %x) {
entry:
  %s = load float, ptr addrspace(1) @scale
  %a = call float @square(float %x)
  %b = fmul float %a, %s
  ret float %b
}
"#;

/// A kernel calling into the device runtime.
pub const LIBRARY_KERNEL: &str = r#"
target datalayout = "e-i64:64-i128:128-v16:16-v32:32-n16:32:64"
target triple = "nvptx64-nvidia-cuda"

declare float @__nv_fast(float)

define float @apply(float %x) {
entry:
  %r = call float @__nv_fast(float %x)
  ret float %r
}
"#;

/// A stand-in device library. `__nv_fast` reaches `__nv_helper` and
/// `__nv_table`; `__nv_unused` and `__nv_orphan` are unreachable.
pub const DEVICE_LIBRARY: &str = r#"
@__nv_table = addrspace(1) global float 1.0
@__nv_orphan = addrspace(1) global float 2.0

define float @__nv_fast(float %x) {
entry:
  %r = call float @__nv_helper(float %x)
  ret float %r
}

define float @__nv_helper(float %x) {
entry:
  %t = load float, ptr addrspace(1) @__nv_table
  %r = fadd float %x, %t
  ret float %r
}

define float @__nv_unused(float %x) {
entry:
  ret float %x
}
"#;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Parse textual IR into a module owned by `context`.
pub fn parse_ir<'ctx>(context: &'ctx Context, name: &str, ir: &str) -> Module<'ctx> {
    let buffer = MemoryBuffer::create_from_memory_range_copy(ir.as_bytes(), name);
    context
        .create_module_from_ir(buffer)
        .unwrap_or_else(|e| panic!("failed to parse {name}: {e}"))
}

/// Write `contents` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Parse `ir` and write it to `dir/name` as bitcode.
pub fn write_bitcode(dir: &Path, name: &str, ir: &str) -> PathBuf {
    let context = Context::create();
    let module = parse_ir(&context, name, ir);
    let path = dir.join(name);
    assert!(module.write_bitcode_to_path(&path), "failed to write {name}");
    path
}

/// Names of every externally visible function and global.
pub fn external_names(module: &Module<'_>) -> BTreeSet<String> {
    let functions = module.get_functions().map(|f| f.as_global_value());
    functions
        .chain(module.get_globals())
        .filter(|gv| !matches!(gv.get_linkage(), Linkage::Internal | Linkage::Private))
        .map(|gv| gv.get_name().to_string_lossy().into_owned())
        .collect()
}

/// Whether `module` has a function named `name` with a body.
pub fn has_definition(module: &Module<'_>, name: &str) -> bool {
    module
        .get_function(name)
        .is_some_and(|f| f.count_basic_blocks() > 0)
}
