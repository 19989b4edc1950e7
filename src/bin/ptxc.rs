//! Command-line entry point: compile one LLVM IR/bitcode module to PTX.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ptxc::core::{DEFAULT_INLINE_THRESHOLD, DEFAULT_LIBDEVICE_PATH};
use ptxc::{CompileError, Driver, DriverConfig, OptLevel, TargetRegistry};

#[derive(Parser, Debug)]
#[command(name = "ptxc", version, about = "Compile LLVM IR or bitcode to NVPTX assembly")]
struct Cli {
    /// Input module; `-` reads standard input.
    #[arg(value_name = "INPUT", default_value = "-")]
    input: String,

    /// Optimization level: -O0, -O1, -O2 or -O3.
    #[arg(short = 'O', value_name = "LEVEL", default_value = "0")]
    opt_level: String,

    /// Output file. Defaults to the input name with its extension replaced by `ptx`.
    #[arg(short = 'o', value_name = "FILENAME")]
    output: Option<PathBuf>,

    /// Target sub-architecture, e.g. sm_80.
    #[arg(long = "mcpu", value_name = "CPU", default_value = "")]
    mcpu: String,

    /// Target features, e.g. +ptx75.
    #[arg(long = "mattr", value_name = "FEATURES", default_value = "")]
    mattr: String,

    /// Callee size above which the inliner gives up.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_INLINE_THRESHOLD, allow_negative_numbers = true)]
    inline_threshold: i32,

    /// Device math library linked when the module references it.
    #[arg(long, value_name = "PATH", env = "PTXC_LIBDEVICE", default_value = DEFAULT_LIBDEVICE_PATH)]
    libdevice: PathBuf,

    /// Print compilation statistics to stderr.
    #[arg(long)]
    stats: bool,
}

impl Cli {
    fn into_config(self) -> Result<DriverConfig, CompileError> {
        let opt_level: OptLevel = self.opt_level.parse()?;
        let mut config = DriverConfig::new(self.input)
            .with_opt_level(opt_level)
            .with_inline_threshold(self.inline_threshold)
            .with_cpu(self.mcpu)
            .with_libdevice(self.libdevice);
        config.features = self.mattr;
        config.output = self.output;
        config.print_stats = self.stats;
        Ok(config)
    }
}

/// Accept the llc-style single-dash spellings `-mcpu` and `-mattr`.
fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some(s) if s == "-mcpu" || s.starts_with("-mcpu=") || s == "-mattr" || s.starts_with("-mattr=") => {
                OsString::from(format!("-{s}"))
            }
            _ => arg,
        })
        .collect()
}

fn run(config: DriverConfig) -> Result<(), CompileError> {
    let registry = TargetRegistry::initialize();
    let print_stats = config.print_stats;
    let output = Driver::new(&registry, config).run()?;
    if print_stats {
        eprint!("{}", output.stats);
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
        Err(e) => e.exit(),
    };

    match cli.into_config().and_then(run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ptxc: error: {e}");
            ExitCode::FAILURE
        }
    }
}
