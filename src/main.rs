//! `f2cc`: compile a ForSyDe-style dataflow XML model into a single
//! `executeProcessNetwork` C or CUDA-C function (§1, §6).

use argh::FromArgs;
use f2cc_utils::{Config, OutputFile, Target};
use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(FromArgs)]
#[argh(help_triggers("-h", "--help"))]
/// Compile a ForSyDe process-network XML model into C/CUDA-C.
struct Opts {
    /// input XML model (either the rich `process_network` dialect or
    /// the legacy GraphML dialect, §6)
    #[argh(positional)]
    input: PathBuf,

    /// header output path, default is stdout
    #[argh(option, short = 'o', long = "header", default = "OutputFile::Stdout")]
    header: OutputFile,

    /// implementation output path, default is stderr so it doesn't
    /// collide with `--header`'s stdout default
    #[argh(option, long = "impl", default = "OutputFile::Stderr")]
    implementation: OutputFile,

    /// code-generation target: `scalar` (default) or `cuda`/`parallel`
    #[argh(option, short = 't', long = "target", default = "Target::Scalar")]
    target: Target,

    /// CUDA only: stage kernel input through `__shared__` memory
    #[argh(switch, long = "use-shared-memory")]
    use_shared_memory: bool,

    /// CUDA only: bound a parallel-map launch by the full-utilization
    /// thread count instead of one large launch
    #[argh(switch, long = "watchdog-timeout")]
    watchdog_timeout: bool,

    /// enable the experimental hierarchical-parallelization pass (§4.2.7)
    #[argh(switch, long = "experimental")]
    experimental: bool,

    /// optional path to dump the post-transform IR as debug XML (§6)
    #[argh(option, long = "dump-xml")]
    dump_xml: Option<PathBuf>,

    /// log each ModelModifier pass's name and elapsed time at `info`
    #[argh(switch, short = 'v', long = "verbose")]
    verbose: bool,
}

fn run(opts: Opts) -> f2cc_utils::F2ccResult<()> {
    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(if opts.verbose {
            log::LevelFilter::Info
        } else {
            log::LevelFilter::Warn
        })
        .target(env_logger::Target::Stderr)
        .init();

    let cfg = Config {
        target: opts.target,
        use_shared_memory: opts.use_shared_memory,
        watchdog_timeout: opts.watchdog_timeout,
        experimental_parallelization: opts.experimental,
        dump_passes: opts.verbose,
        dump_xml: opts.dump_xml,
    };

    log::info!("parsing `{}`", opts.input.display());
    let mut net = f2cc_frontend::parse_file(&opts.input)?;

    log::info!("running ModelModifier passes");
    f2cc_opt::run_default(&mut net, &cfg)?;

    if let Some(dump_path) = &cfg.dump_xml {
        log::info!("dumping post-transform IR to `{}`", dump_path.display());
        let mut out = OutputFile::file(dump_path.clone());
        f2cc_frontend::dump_xml(&net, &mut out)?;
    }

    log::info!("synthesizing `{}` target", match cfg.target {
        Target::Scalar => "scalar",
        Target::Cuda => "cuda",
    });
    let code = f2cc_backend::synthesize(&mut net, &cfg)?;

    let mut header_out = opts.header;
    header_out.get_write().write_all(code.header.as_bytes())?;

    let mut impl_out = opts.implementation;
    impl_out
        .get_write()
        .write_all(code.implementation.as_bytes())?;

    Ok(())
}

fn main() -> ExitCode {
    let opts: Opts = argh::from_env();
    match run(opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
