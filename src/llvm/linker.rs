// This module merges device runtime libraries (libdevice) into the primary module with
// link-only-needed semantics. For each library, in the order given, it loads the library
// into the primary module's context and forces its data layout to the primary one, then
// computes which library definitions are reachable from the primary module's unresolved
// declarations by walking instruction operands and initializer constants. Unreachable
// definitions are internalized and removed with a `globaldce` pass, definitions the primary
// module already has are demoted to `available_externally` so the primary copy wins, and
// only then is the library handed to `LLVMLinkModules2`. After the merge an
// InternalizePolicy built from the primary module's own exported definitions makes every
// newly linked symbol internal so later optimization can drop what ends up unused.

//! Link-only-needed merging of device libraries.

use std::path::{Path, PathBuf};

use hashbrown::HashSet;
use inkwell::memory_buffer::MemoryBuffer;
use inkwell::module::{Linkage, Module};
use inkwell::values::{AsValueRef, GlobalValue};
use inkwell::GlobalVisibility;
use llvm_sys::core::{
    LLVMGetNumOperands, LLVMGetOperand, LLVMGetValueName2, LLVMIsAConstant, LLVMIsAGlobalValue,
};
use llvm_sys::prelude::LLVMValueRef;

use super::pipeline::run_pipeline;
use crate::core::error::LinkError;

/// Decides which symbols of the merged module become internal.
///
/// Everything the primary module exported before the merge is preserved;
/// any other externally visible definition came from a library.
#[derive(Debug, Clone, Default)]
pub struct InternalizePolicy {
    preserved: HashSet<String>,
}

impl InternalizePolicy {
    pub fn new(preserved: impl IntoIterator<Item = String>) -> Self {
        Self {
            preserved: preserved.into_iter().collect(),
        }
    }

    /// Snapshot the externally visible definitions of `module`.
    pub fn from_module(module: &Module<'_>) -> Self {
        Self::new(
            global_values(module)
                .filter(|gv| !gv.is_declaration() && !is_local(gv.get_linkage()))
                .map(|gv| symbol_name(&gv)),
        )
    }

    pub fn should_internalize(&self, name: &str) -> bool {
        !name.is_empty() && !name.starts_with("llvm.") && !self.preserved.contains(name)
    }
}

/// What linking a set of libraries did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSummary {
    /// Libraries actually merged; a library with nothing reachable is skipped.
    pub libraries_merged: usize,
    pub symbols_linked: usize,
    pub symbols_internalized: usize,
}

/// Merge the needed parts of each library into `primary`, in order.
///
/// Stops at the first failing library; the primary module must then be
/// discarded.
pub fn link_needed<P: AsRef<Path>>(
    primary: &Module<'_>,
    library_paths: &[P],
) -> Result<LinkSummary, LinkError> {
    let mut summary = LinkSummary::default();

    for path in library_paths {
        let path = path.as_ref();
        let library = load_library(primary, path)?;
        library.set_data_layout(&primary.get_data_layout());

        let wanted = unresolved_declarations(primary);
        let plan = LinkPlan::compute(primary, &library, &wanted);
        if plan.reachable.is_empty() {
            log::debug!("nothing needed from '{}', skipping", path.display());
            continue;
        }

        plan.prepare(&library);
        run_pipeline(&library, None, "globaldce").map_err(|e| LinkError::Prune {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let policy = InternalizePolicy::from_module(primary);
        primary
            .link_in_module(library)
            .map_err(|e| LinkError::Merge {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        let internalized = internalize(primary, &policy);

        log::info!(
            "linked {} symbols from '{}' ({} internalized)",
            plan.reachable.len(),
            path.display(),
            internalized
        );
        summary.libraries_merged += 1;
        summary.symbols_linked += plan.reachable.len();
        summary.symbols_internalized += internalized;
    }

    Ok(summary)
}

/// Load a library into the primary module's context.
fn load_library<'ctx>(primary: &Module<'ctx>, path: &Path) -> Result<Module<'ctx>, LinkError> {
    let load_error = |message: String| LinkError::LibraryLoad {
        path: PathBuf::from(path),
        message,
    };

    let buffer = MemoryBuffer::create_from_file(path).map_err(|e| load_error(e.to_string()))?;
    primary
        .get_context()
        .create_module_from_ir(buffer)
        .map_err(|e| load_error(e.to_string()))
}

/// Apply `policy` to every externally visible definition of `module`.
///
/// Returns the number of symbols made internal.
pub fn internalize(module: &Module<'_>, policy: &InternalizePolicy) -> usize {
    let mut count = 0;
    for gv in global_values(module) {
        if gv.is_declaration() || is_local(gv.get_linkage()) {
            continue;
        }
        let name = symbol_name(&gv);
        if policy.should_internalize(&name) {
            log::trace!("internalizing '{name}'");
            gv.set_linkage(Linkage::Internal);
            gv.set_visibility(GlobalVisibility::Default);
            count += 1;
        }
    }
    count
}

/// Names of the non-intrinsic, externally visible declarations of `module`.
pub fn unresolved_declarations(module: &Module<'_>) -> HashSet<String> {
    global_values(module)
        .filter(|gv| gv.is_declaration() && !is_local(gv.get_linkage()))
        .map(|gv| symbol_name(&gv))
        .filter(|name| !name.is_empty() && !name.starts_with("llvm."))
        .collect()
}

/// Which library definitions to merge and which to leave to the primary module.
#[derive(Debug, Default)]
struct LinkPlan {
    /// Library definitions transitively reachable from the wanted names.
    reachable: HashSet<String>,
    /// Library definitions referenced by reachable code but already defined by the primary module.
    suppressed: HashSet<String>,
}

impl LinkPlan {
    fn compute(primary: &Module<'_>, library: &Module<'_>, wanted: &HashSet<String>) -> Self {
        let mut plan = Self::default();
        let mut worklist: Vec<String> = wanted
            .iter()
            .filter(|name| exports(library, name))
            .cloned()
            .collect();

        while let Some(name) = worklist.pop() {
            if !plan.reachable.insert(name.clone()) {
                continue;
            }
            for referenced in references_of(library, &name) {
                if plan.reachable.contains(&referenced) {
                    continue;
                }
                let exported = find_global(library, &referenced)
                    .is_some_and(|gv| !is_local(gv.get_linkage()));
                if exported && defines(primary, &referenced) {
                    plan.suppressed.insert(referenced);
                } else if defines(library, &referenced) {
                    worklist.push(referenced);
                }
            }
        }

        plan
    }

    /// Relink the library's unneeded definitions so `globaldce` and the
    /// linker leave them out.
    fn prepare(&self, library: &Module<'_>) {
        for gv in global_values(library) {
            if gv.is_declaration() {
                continue;
            }
            let name = symbol_name(&gv);
            if self.reachable.contains(&name) {
                continue;
            }
            if self.suppressed.contains(&name) {
                gv.set_linkage(Linkage::AvailableExternally);
            } else if !is_local(gv.get_linkage()) {
                gv.set_linkage(Linkage::Internal);
                gv.set_visibility(GlobalVisibility::Default);
            }
        }
    }
}

fn is_local(linkage: Linkage) -> bool {
    matches!(linkage, Linkage::Internal | Linkage::Private)
}

fn symbol_name(gv: &GlobalValue<'_>) -> String {
    gv.get_name().to_string_lossy().into_owned()
}

/// Functions and global variables of `module` as global values.
fn global_values<'a, 'ctx>(module: &'a Module<'ctx>) -> impl Iterator<Item = GlobalValue<'ctx>> + 'a {
    module
        .get_functions()
        .map(|f| f.as_global_value())
        .chain(module.get_globals())
}

fn find_global<'ctx>(module: &Module<'ctx>, name: &str) -> Option<GlobalValue<'ctx>> {
    module
        .get_function(name)
        .map(|f| f.as_global_value())
        .or_else(|| module.get_global(name))
}

fn defines(module: &Module<'_>, name: &str) -> bool {
    find_global(module, name).is_some_and(|gv| !gv.is_declaration())
}

/// Whether `module` has an externally visible definition of `name`; only
/// those can resolve another module's declaration.
fn exports(module: &Module<'_>, name: &str) -> bool {
    find_global(module, name)
        .is_some_and(|gv| !gv.is_declaration() && !is_local(gv.get_linkage()))
}

/// Global values referenced by the body or initializer of `name`.
fn references_of(module: &Module<'_>, name: &str) -> HashSet<String> {
    let mut refs = HashSet::new();

    if let Some(function) = module.get_function(name) {
        for block in function.get_basic_blocks() {
            for inst in block.get_instructions() {
                unsafe { collect_operand_refs(inst.as_value_ref(), &mut refs) };
            }
        }
    } else if let Some(global) = module.get_global(name) {
        if let Some(init) = global.get_initializer() {
            unsafe { collect_constant_refs(init.as_value_ref(), &mut refs) };
        }
    }

    log::trace!("'{name}' references {refs:?}");
    refs
}

/// # Safety
/// `user` must be a valid instruction or constant.
unsafe fn collect_operand_refs(user: LLVMValueRef, refs: &mut HashSet<String>) {
    let count = LLVMGetNumOperands(user).max(0) as u32;
    for index in 0..count {
        let operand = LLVMGetOperand(user, index);
        if !operand.is_null() {
            collect_constant_refs(operand, refs);
        }
    }
}

/// Record `value` if it is a named global, or walk into it if it is another constant.
///
/// # Safety
/// `value` must be a valid value.
unsafe fn collect_constant_refs(value: LLVMValueRef, refs: &mut HashSet<String>) {
    if !LLVMIsAGlobalValue(value).is_null() {
        let mut len = 0;
        let ptr = LLVMGetValueName2(value, &mut len);
        if !ptr.is_null() && len > 0 {
            let bytes = std::slice::from_raw_parts(ptr.cast::<u8>(), len);
            refs.insert(String::from_utf8_lossy(bytes).into_owned());
        }
    } else if !LLVMIsAConstant(value).is_null() {
        collect_operand_refs(value, refs);
    }
}
