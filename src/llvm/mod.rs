//! LLVM-facing compilation stages.
//!
//! Each stage is a thin layer over inkwell (and llvm-sys where inkwell has no
//! wrapper) that the [`Driver`](crate::driver::Driver) calls in order:
//!
//! - [`registry`] - one-time NVPTX target registration
//! - [`loader`] - parse the input and bind it to the resolved target
//! - [`resolver`] - decide whether libdevice is needed
//! - [`linker`] - merge only the needed library symbols
//! - [`pipeline`] - verify, optimize, verify
//! - [`emitter`] - lower to PTX text
//!
//! # Example
//! ```ignore
//! use inkwell::context::Context;
//! use ptxc::llvm::{load_module, needs_library, TargetRegistry};
//!
//! let registry = TargetRegistry::initialize();
//! let context = Context::create();
//! let module = load_module(&context, "kernel.ll")?;
//! if needs_library(&module) {
//!     // link libdevice
//! }
//! ```

pub mod emitter;
pub mod linker;
pub mod loader;
pub mod pipeline;
pub mod registry;
pub mod resolver;

pub use emitter::emit_assembly;
pub use linker::{link_needed, InternalizePolicy, LinkSummary};
pub use loader::{load_module, ResolvedTarget, TargetHint};
pub use pipeline::{optimize, run_pipeline, verify_module, OptimizationConfig};
pub use registry::TargetRegistry;
pub use resolver::{needed_symbols, needs_library, DEVICE_RUNTIME_PREFIXES};
