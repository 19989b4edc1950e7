// This module defines error types for the ptxc driver using the thiserror crate for
// idiomatic Rust error handling. CompileError is the top-level enum returned by the driver
// and covers every failure class of a run: configuration (bad optimization level, unusable
// target), input parsing, device library linking, IR verification, pass pipeline execution,
// assembly emission and output I/O. Stage-specific enums (LinkError, VerifyError,
// PipelineError) carry the context each stage knows about and convert into CompileError
// with `?`. All of them are fatal; the binary prints the message and exits with code 1.

//! Error types for the ptxc driver.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Line and column of a parse diagnostic, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Main error type for a driver run.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("invalid optimization level '{argument}', expected -O0, -O1, -O2 or -O3")]
    InvalidOptLevel { argument: String },

    #[error("target '{triple}' is not available: {reason}")]
    Target { triple: String, reason: String },

    #[error("'{input}': cannot read input: {message}")]
    InputRead { input: String, message: String },

    #[error("'{input}': {message}")]
    Parse {
        input: String,
        message: String,
        location: Option<SourceLocation>,
    },

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("assembly emission failed: {message}")]
    Emit { message: String },

    #[error("'{}': cannot open output file: {source}", .path.display())]
    OutputOpen { path: PathBuf, source: io::Error },

    #[error("'{}': failed to write output: {source}", .path.display())]
    OutputWrite { path: PathBuf, source: io::Error },
}

/// Failure while merging a device library into the primary module.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("'{}': cannot load device library: {message}", .path.display())]
    LibraryLoad { path: PathBuf, message: String },

    #[error("'{}': pruning unreferenced library symbols failed: {message}", .path.display())]
    Prune { path: PathBuf, message: String },

    #[error("'{}': linking device library failed: {message}", .path.display())]
    Merge { path: PathBuf, message: String },
}

impl LinkError {
    /// Library the error refers to.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::LibraryLoad { path, .. } | Self::Prune { path, .. } | Self::Merge { path, .. } => {
                path
            }
        }
    }
}

/// When the verifier ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyPhase {
    BeforeOptimization,
    AfterOptimization,
}

impl fmt::Display for VerifyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeOptimization => write!(f, "before optimization"),
            Self::AfterOptimization => write!(f, "after optimization"),
        }
    }
}

/// The module failed structural verification.
#[derive(Error, Debug)]
#[error("module verification failed {phase}: {message}")]
pub struct VerifyError {
    pub phase: VerifyPhase,
    pub message: String,
}

/// Failure inside the new pass manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("failed to create pass builder options")]
    OptionsCreation,

    #[error("invalid pipeline '{pipeline}': {message}")]
    InvalidPipeline { pipeline: String, message: String },

    #[error("optimization passes failed: {message}")]
    PassesFailed { message: String },
}

/// Result type alias for driver operations.
pub type CompileResult<T> = Result<T, CompileError>;
