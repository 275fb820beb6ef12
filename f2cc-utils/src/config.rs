//! The compiler's configuration object (§9 Design Notes: "Configuration
//! is not a global; it is a value injected into the Frontend,
//! ModelModifier, and Synthesizer"). Constructed once by the `f2cc`
//! driver from parsed CLI arguments and threaded by reference into every
//! stage that needs it.

/// Code-generation target selector (§6 CLI surface).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Target {
    #[default]
    Scalar,
    Cuda,
}

impl std::str::FromStr for Target {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scalar" => Ok(Target::Scalar),
            "cuda" | "parallel" => Ok(Target::Cuda),
            other => Err(format!(
                "unknown target `{other}`, expected `scalar` or `cuda`"
            )),
        }
    }
}

/// Threaded, non-global configuration for one compiler invocation.
#[derive(Clone, Debug)]
pub struct Config {
    pub target: Target,
    /// CUDA only (§4.4 Step 5): stage kernel input through `__shared__` memory.
    pub use_shared_memory: bool,
    /// CUDA only (§4.4 Step 5): bound launch splitting by a
    /// full-utilization thread count instead of one large launch.
    pub watchdog_timeout: bool,
    /// Gates the experimental hierarchical-parallelization pass (§4.2.7)
    /// and pipeline-stage segregation (§4.2, §9).
    pub experimental_parallelization: bool,
    /// Log each ModelModifier pass's name and elapsed time at `info`.
    pub dump_passes: bool,
    /// Optional path to dump the post-transform IR as debug XML (§4.5).
    pub dump_xml: Option<std::path::PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target: Target::Scalar,
            use_shared_memory: false,
            watchdog_timeout: false,
            experimental_parallelization: false,
            dump_passes: false,
            dump_xml: None,
        }
    }
}
