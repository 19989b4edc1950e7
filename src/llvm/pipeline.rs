// This module builds and runs the optimization pipeline through LLVM's new pass manager.
// The pipeline is verify -> `default<ON>` -> verify: the module is checked by the IR
// verifier, then `LLVMRunPasses` runs the per-level default pipeline (`default<O0>` is the
// minimal debug pipeline) with the loop/function/CGSCC/module analysis managers the pass
// builder registers, then the verifier runs again. The target machine is passed to the
// pass builder so target-aware passes (inliner, vectorizers) use the NVPTX cost model.
// Pass builder options are owned by an RAII guard, and LLVM error objects are turned into
// PipelineError values. `run_pipeline` is also used by the linker to run `globaldce` on
// a device library before merging.

//! Optimization pipeline built on the LLVM new pass manager.
//!
//! ```text
//! ┌────────┐    ┌──────────────────────────────┐    ┌────────┐
//! │ verify │───▶│ default<O0..O3> + tuning opts │───▶│ verify │
//! └────────┘    └──────────────────────────────┘    └────────┘
//! ```

use std::ffi::{CStr, CString};

use inkwell::module::Module;
use inkwell::targets::TargetMachine;
use llvm_sys::error::{LLVMDisposeErrorMessage, LLVMErrorRef, LLVMGetErrorMessage};
use llvm_sys::transforms::pass_builder::{
    LLVMCreatePassBuilderOptions, LLVMDisposePassBuilderOptions, LLVMPassBuilderOptionsRef,
    LLVMPassBuilderOptionsSetInlinerThreshold, LLVMPassBuilderOptionsSetLoopInterleaving,
    LLVMPassBuilderOptionsSetLoopUnrolling, LLVMPassBuilderOptionsSetLoopVectorization,
    LLVMPassBuilderOptionsSetSLPVectorization, LLVMRunPasses,
};

use crate::core::config::{OptLevel, DEFAULT_INLINE_THRESHOLD};
use crate::core::error::{CompileResult, PipelineError, VerifyError, VerifyPhase};

/// Settings the pipeline is built from. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizationConfig {
    pub level: OptLevel,
    pub inline_threshold: i32,
}

impl OptimizationConfig {
    pub fn new(level: OptLevel, inline_threshold: i32) -> Self {
        Self {
            level,
            inline_threshold,
        }
    }
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self::new(OptLevel::O0, DEFAULT_INLINE_THRESHOLD)
    }
}

/// RAII guard for `LLVMPassBuilderOptionsRef`.
struct PassBuilderOptionsGuard {
    options: LLVMPassBuilderOptionsRef,
}

impl PassBuilderOptionsGuard {
    fn new() -> Result<Self, PipelineError> {
        let options = unsafe { LLVMCreatePassBuilderOptions() };
        if options.is_null() {
            Err(PipelineError::OptionsCreation)
        } else {
            Ok(Self { options })
        }
    }

    /// Apply the level-derived tuning and the inliner threshold.
    fn configure(&self, config: &OptimizationConfig) {
        let level = config.level;
        unsafe {
            LLVMPassBuilderOptionsSetLoopVectorization(
                self.options,
                level.enables_loop_vectorization().into(),
            );
            LLVMPassBuilderOptionsSetSLPVectorization(
                self.options,
                level.enables_slp_vectorization().into(),
            );
            LLVMPassBuilderOptionsSetLoopUnrolling(
                self.options,
                level.enables_loop_unrolling().into(),
            );
            LLVMPassBuilderOptionsSetLoopInterleaving(
                self.options,
                level.enables_loop_unrolling().into(),
            );
            LLVMPassBuilderOptionsSetInlinerThreshold(self.options, config.inline_threshold);
        }
    }

    fn as_ptr(&self) -> LLVMPassBuilderOptionsRef {
        self.options
    }
}

impl Drop for PassBuilderOptionsGuard {
    fn drop(&mut self) {
        unsafe { LLVMDisposePassBuilderOptions(self.options) };
    }
}

/// Extract the message of an LLVM error and dispose of it.
///
/// # Safety
/// `error` must be a valid, non-null error that has not been consumed.
unsafe fn take_error_message(error: LLVMErrorRef) -> String {
    let msg_ptr = LLVMGetErrorMessage(error);
    if msg_ptr.is_null() {
        return "unknown error".to_string();
    }
    let message = CStr::from_ptr(msg_ptr).to_string_lossy().into_owned();
    LLVMDisposeErrorMessage(msg_ptr);
    message
}

/// Run `pipeline` over `module` with `options`.
fn run_with_options(
    module: &Module<'_>,
    target_machine: Option<&TargetMachine>,
    pipeline: &str,
    options: &PassBuilderOptionsGuard,
) -> Result<(), PipelineError> {
    let pipeline_cstr = CString::new(pipeline).map_err(|_| PipelineError::InvalidPipeline {
        pipeline: pipeline.to_string(),
        message: "pipeline contains null bytes".to_string(),
    })?;

    let tm_ref = target_machine.map_or(std::ptr::null_mut(), TargetMachine::as_mut_ptr);

    let error = unsafe {
        LLVMRunPasses(
            module.as_mut_ptr(),
            pipeline_cstr.as_ptr(),
            tm_ref,
            options.as_ptr(),
        )
    };

    if error.is_null() {
        Ok(())
    } else {
        let message = unsafe { take_error_message(error) };
        Err(PipelineError::PassesFailed { message })
    }
}

/// Run an arbitrary pass pipeline string with default options.
///
/// Without a target machine the pass builder falls back to generic cost models.
pub fn run_pipeline(
    module: &Module<'_>,
    target_machine: Option<&TargetMachine>,
    pipeline: &str,
) -> Result<(), PipelineError> {
    let options = PassBuilderOptionsGuard::new()?;
    run_with_options(module, target_machine, pipeline, &options)
}

/// Run the IR verifier over `module`.
pub fn verify_module(module: &Module<'_>, phase: VerifyPhase) -> Result<(), VerifyError> {
    module.verify().map_err(|e| VerifyError {
        phase,
        message: e.to_string().trim_end().to_string(),
    })
}

/// Verify, optimize at `config.level` and verify again, in place.
pub fn optimize(
    module: &Module<'_>,
    target_machine: &TargetMachine,
    config: &OptimizationConfig,
) -> CompileResult<()> {
    verify_module(module, VerifyPhase::BeforeOptimization)?;

    let pipeline = config.level.pipeline_string();
    log::info!(
        "running {pipeline} (inline threshold {})",
        config.inline_threshold
    );

    let options = PassBuilderOptionsGuard::new()?;
    options.configure(config);
    run_with_options(module, Some(target_machine), pipeline, &options)?;

    verify_module(module, VerifyPhase::AfterOptimization)?;
    Ok(())
}
