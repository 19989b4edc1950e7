//! ptxc - LLVM IR to PTX compilation driver.
//!
//! ptxc is the backend stage of a GPU compilation pipeline. It takes one LLVM
//! IR or bitcode module, links the CUDA device math library (libdevice) when
//! the module calls into it, optimizes at `-O0`..`-O3` and lowers the result
//! to PTX assembly text.
//!
//! # Primary Usage
//!
//! ```ignore
//! use ptxc::{Driver, DriverConfig, OptLevel, TargetRegistry};
//!
//! let registry = TargetRegistry::initialize();
//! let config = DriverConfig::new("kernel.ll").with_opt_level(OptLevel::O2);
//! let output = Driver::new(&registry, config).run()?;
//! println!("wrote {}", output.path.display());
//! ```
//!
//! # Architecture
//!
//! - [`core`] - configuration, errors and session statistics
//! - [`llvm`] - the LLVM-facing stages (load, resolve, link, optimize, emit)
//! - [`driver`] - stage orchestration and output handling

pub mod core;
pub mod driver;
pub mod llvm;

pub use crate::core::{
    CompilationSession, CompileError, CompileResult, DriverConfig, LinkError, OptLevel,
    SessionStats,
};
pub use driver::{resolve_output_path, CompileOutput, Driver, Stage};
pub use llvm::TargetRegistry;
