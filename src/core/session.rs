// This module provides the per-invocation compilation session. The driver owns one
// CompilationSession for the whole run and records what each stage did: the resolved
// target triple and optimization level, whether the device library was linked and how many
// symbols came from it, how many were internalized, the function count before and after
// optimization and the size of the emitted assembly. SessionStats is a plain snapshot of
// those numbers with a Display implementation used for `--stats` output and for the
// closing info-level log line.

//! Compilation session bookkeeping.

use std::cell::RefCell;
use std::fmt;

use crate::core::config::OptLevel;

/// Statistics for one driver run.
///
/// Interior mutability lets stages record into the session through a
/// shared reference while the module itself is borrowed mutably.
#[derive(Debug, Default)]
pub struct CompilationSession {
    stats: RefCell<SessionStats>,
}

impl CompilationSession {
    pub fn new(input: &str, opt_level: OptLevel) -> Self {
        let stats = SessionStats {
            input: input.to_string(),
            opt_level,
            ..SessionStats::default()
        };
        Self {
            stats: RefCell::new(stats),
        }
    }

    pub fn record_triple(&self, triple: &str) {
        self.stats.borrow_mut().triple = triple.to_string();
    }

    /// Record the outcome of the library resolution step.
    pub fn record_library_needed(&self, needed: bool) {
        self.stats.borrow_mut().library_needed = needed;
    }

    pub fn record_link(&self, linked: usize, internalized: usize) {
        let mut stats = self.stats.borrow_mut();
        stats.symbols_linked += linked;
        stats.symbols_internalized += internalized;
    }

    pub fn record_functions_before(&self, count: usize) {
        self.stats.borrow_mut().functions_before = count;
    }

    pub fn record_functions_after(&self, count: usize) {
        self.stats.borrow_mut().functions_after = count;
    }

    pub fn record_assembly_size(&self, bytes: usize) {
        self.stats.borrow_mut().assembly_size = bytes;
    }

    /// Get a snapshot of the statistics.
    pub fn stats(&self) -> SessionStats {
        self.stats.borrow().clone()
    }
}

/// Snapshot of what a run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// Input name as given on the command line.
    pub input: String,

    /// Triple the module was bound to.
    pub triple: String,

    pub opt_level: OptLevel,

    /// Whether the resolver asked for the device library.
    pub library_needed: bool,

    /// Definitions pulled in from the device library.
    pub symbols_linked: usize,

    /// Definitions made internal after linking.
    pub symbols_internalized: usize,

    /// Function count (definitions and declarations) entering the pipeline.
    pub functions_before: usize,

    /// Function count leaving the pipeline.
    pub functions_after: usize,

    /// Size of the emitted assembly in bytes.
    pub assembly_size: usize,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compilation Session Statistics:")?;
        writeln!(f, "  Input: {}", self.input)?;
        writeln!(f, "  Target triple: {}", self.triple)?;
        writeln!(f, "  Optimization level: {}", self.opt_level)?;
        writeln!(f, "  Device library linked: {}", self.library_needed)?;
        if self.library_needed {
            writeln!(f, "  Symbols linked: {}", self.symbols_linked)?;
            writeln!(f, "  Symbols internalized: {}", self.symbols_internalized)?;
        }
        writeln!(
            f,
            "  Functions: {} -> {}",
            self.functions_before, self.functions_after
        )?;
        writeln!(f, "  Assembly size: {} bytes", self.assembly_size)?;
        Ok(())
    }
}
