// This module serves as the hub for the driver's shared infrastructure: the invocation
// configuration (optimization level, paths, defaults), the error taxonomy every stage
// reports through, and the compilation session that records what a run did. None of it
// talks to LLVM directly apart from mapping optimization levels onto inkwell's codegen
// levels; the LLVM-facing stages live in the `llvm` module.

//! Core ptxc infrastructure.
//!
//! # Key Components
//!
//! ## Configuration (`config`)
//! - Four-valued [`OptLevel`] validated at the boundary
//! - [`DriverConfig`] with the reference defaults
//!
//! ## Errors (`error`)
//! - [`CompileError`] and the per-stage error types
//!
//! ## Session (`session`)
//! - Per-run statistics

pub mod config;
pub mod error;
pub mod session;

pub use config::{
    DriverConfig,
    OptLevel,
    DEFAULT_INLINE_THRESHOLD,
    DEFAULT_LIBDEVICE_PATH,
    STDIO_PLACEHOLDER,
};

pub use error::{
    CompileError,
    CompileResult,
    LinkError,
    PipelineError,
    SourceLocation,
    VerifyError,
    VerifyPhase,
};

pub use session::{
    CompilationSession,
    SessionStats,
};
