// This module holds the configuration of a single ptxc invocation. OptLevel is the
// four-valued optimization level parsed from the text after `-O`; it also knows which
// codegen level and pass-manager pipeline it maps to and which loop transformations the
// pipeline should enable. DriverConfig gathers every setting the driver needs (input,
// output, level, inline threshold, CPU/features and the device library path) together
// with the defaults used when the command line leaves them out.

//! Driver configuration and optimization levels.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::core::error::CompileError;

/// Placeholder naming standard input (as an input) or standard output (as an output).
pub const STDIO_PLACEHOLDER: &str = "-";

/// Default location of the CUDA device math library.
pub const DEFAULT_LIBDEVICE_PATH: &str = "/usr/local/cuda/nvvm/libdevice/libdevice.10.bc";

/// Inliner threshold used when the caller does not pick one.
pub const DEFAULT_INLINE_THRESHOLD: i32 = 1100;

/// Optimization level selected with `-O<level>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    /// No optimization; runs the debug pipeline.
    #[default]
    O0,
    O1,
    O2,
    O3,
}

impl OptLevel {
    /// Pipeline string understood by `LLVMRunPasses`.
    pub fn pipeline_string(self) -> &'static str {
        match self {
            Self::O0 => "default<O0>",
            Self::O1 => "default<O1>",
            Self::O2 => "default<O2>",
            Self::O3 => "default<O3>",
        }
    }

    /// Codegen level handed to the target machine.
    pub fn codegen_level(self) -> inkwell::OptimizationLevel {
        match self {
            Self::O0 => inkwell::OptimizationLevel::None,
            Self::O1 => inkwell::OptimizationLevel::Less,
            Self::O2 => inkwell::OptimizationLevel::Default,
            Self::O3 => inkwell::OptimizationLevel::Aggressive,
        }
    }

    pub fn enables_loop_vectorization(self) -> bool {
        matches!(self, Self::O2 | Self::O3)
    }

    pub fn enables_slp_vectorization(self) -> bool {
        matches!(self, Self::O2 | Self::O3)
    }

    pub fn enables_loop_unrolling(self) -> bool {
        self != Self::O0
    }
}

impl FromStr for OptLevel {
    type Err = CompileError;

    /// Parse the text following `-O`. Only `0`..`3` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Self::O0),
            "1" => Ok(Self::O1),
            "2" => Ok(Self::O2),
            "3" => Ok(Self::O3),
            other => Err(CompileError::InvalidOptLevel {
                argument: format!("-O{other}"),
            }),
        }
    }
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::O0 => write!(f, "O0"),
            Self::O1 => write!(f, "O1"),
            Self::O2 => write!(f, "O2"),
            Self::O3 => write!(f, "O3"),
        }
    }
}

/// Everything the driver needs for one invocation.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Input path, or `-` for standard input.
    pub input: String,

    /// Explicit output path. When absent the path is derived from the input.
    pub output: Option<PathBuf>,

    pub opt_level: OptLevel,

    /// Callee size above which inlining is rejected.
    pub inline_threshold: i32,

    /// Target sub-architecture, e.g. `sm_80`. Empty selects the backend default.
    pub cpu: String,

    /// Target feature string, e.g. `+ptx75`.
    pub features: String,

    /// Device runtime bitcode linked when the module calls into it.
    pub libdevice: PathBuf,

    /// Print session statistics to stderr once the run completes.
    pub print_stats: bool,
}

impl DriverConfig {
    /// Configuration with defaults for everything but the input.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: None,
            opt_level: OptLevel::default(),
            inline_threshold: DEFAULT_INLINE_THRESHOLD,
            cpu: String::new(),
            features: String::new(),
            libdevice: PathBuf::from(DEFAULT_LIBDEVICE_PATH),
            print_stats: false,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_opt_level(mut self, level: OptLevel) -> Self {
        self.opt_level = level;
        self
    }

    pub fn with_inline_threshold(mut self, threshold: i32) -> Self {
        self.inline_threshold = threshold;
        self
    }

    pub fn with_cpu(mut self, cpu: impl Into<String>) -> Self {
        self.cpu = cpu.into();
        self
    }

    pub fn with_libdevice(mut self, path: impl Into<PathBuf>) -> Self {
        self.libdevice = path.into();
        self
    }

    /// Whether the input is read from standard input.
    pub fn reads_stdin(&self) -> bool {
        self.input == STDIO_PLACEHOLDER
    }
}
