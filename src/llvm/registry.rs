//! One-time NVPTX target initialization.
//!
//! LLVM's target registry is process-global and must be populated before a
//! target can be looked up. [`TargetRegistry::initialize`] does that exactly
//! once and hands back a token; code that needs a target takes the token
//! instead of assuming someone already set the registry up.

use std::sync::Once;

use inkwell::targets::{InitializationConfig, Target};

static NVPTX_TARGET_INIT: Once = Once::new();

/// Proof that the NVPTX target has been registered with LLVM.
#[derive(Debug, Clone, Copy)]
pub struct TargetRegistry {
    _initialized: (),
}

impl TargetRegistry {
    /// Register the NVPTX target info, target, MC layer and asm printer.
    ///
    /// Safe to call multiple times; initialization happens once.
    pub fn initialize() -> Self {
        NVPTX_TARGET_INIT.call_once(|| {
            log::debug!("initializing NVPTX target");
            Target::initialize_nvptx(&InitializationConfig::default());
        });
        Self { _initialized: () }
    }
}
