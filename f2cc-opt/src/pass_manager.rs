//! `PassManager`: registers named [`GraphPass`]es, resolves aliases,
//! and runs a named plan while timing and logging each pass.

use f2cc_ir::ProcessNetwork;
use f2cc_utils::{Config, Error, F2ccResult};
use std::collections::HashMap;
use std::time::Instant;

/// A pass's display name and one-line description, shown by
/// `--dump-passes` and pass-by-name selection.
pub trait Named {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
}

/// One graph-rewriting pass over a whole [`ProcessNetwork`] (§4.2).
/// `run` reports whether it changed anything, so a caller wiring a
/// fix-point loop around several passes can tell when to stop; most
/// passes here already loop to their own fixed point internally and
/// simply report `true` once they've run.
pub trait GraphPass: Named {
    fn run(&mut self, net: &mut ProcessNetwork, cfg: &Config) -> F2ccResult<bool>;
}

type PassFn = fn(&mut ProcessNetwork) -> F2ccResult<()>;

struct FnPass {
    name: &'static str,
    description: &'static str,
    body: PassFn,
    experimental: bool,
}

impl Named for FnPass {
    fn name(&self) -> &'static str {
        self.name
    }
    fn description(&self) -> &'static str {
        self.description
    }
}

impl GraphPass for FnPass {
    fn run(&mut self, net: &mut ProcessNetwork, cfg: &Config) -> F2ccResult<bool> {
        if self.experimental && !cfg.experimental_parallelization {
            return Ok(false);
        }
        (self.body)(net)?;
        Ok(true)
    }
}

/// Tracks all registered passes and their aliases for one compiler run.
#[derive(Default)]
pub struct PassManager {
    passes: HashMap<String, FnPass>,
    aliases: HashMap<String, Vec<String>>,
    order: Vec<String>,
}

impl PassManager {
    /// Register a pass, failing if the name is already taken.
    pub fn register_pass(
        &mut self,
        name: &'static str,
        description: &'static str,
        body: PassFn,
        experimental: bool,
    ) -> F2ccResult<()> {
        if self.passes.contains_key(name) {
            return Err(Error::illegal_state(format!(
                "pass with name `{name}` is already registered"
            )));
        }
        self.order.push(name.to_string());
        self.passes.insert(
            name.to_string(),
            FnPass {
                name,
                description,
                body,
                experimental,
            },
        );
        Ok(())
    }

    /// Register an alias standing in for an ordered group of passes or
    /// other aliases (expanded eagerly, so later redefinitions of a
    /// constituent alias don't retroactively change this one).
    pub fn add_alias(&mut self, name: &str, passes: &[&str]) -> F2ccResult<()> {
        if self.aliases.contains_key(name) {
            return Err(Error::illegal_state(format!("alias `{name}` is already registered")));
        }
        let expanded = passes
            .iter()
            .flat_map(|&p| self.resolve_alias(p))
            .collect();
        self.aliases.insert(name.to_string(), expanded);
        Ok(())
    }

    fn resolve_alias(&self, maybe_alias: &str) -> Vec<String> {
        self.aliases
            .get(maybe_alias)
            .cloned()
            .unwrap_or_else(|| vec![maybe_alias.to_string()])
    }

    /// Run every pass registered under `plan`'s names (aliases resolved
    /// in order), timing each one and logging its name and elapsed
    /// time. Passes taking more than five seconds log a warning
    /// instead of an info line.
    pub fn execute_plan(
        &self,
        net: &mut ProcessNetwork,
        cfg: &Config,
        plan: &[&str],
    ) -> F2ccResult<()> {
        let names: Vec<String> = plan.iter().flat_map(|&p| self.resolve_alias(p)).collect();
        for name in names {
            let pass = self
                .passes
                .get(&name)
                .ok_or_else(|| Error::invalid_argument(format!("unknown pass: {name}")))?;
            let mut pass = FnPass {
                name: pass.name,
                description: pass.description,
                body: pass.body,
                experimental: pass.experimental,
            };
            let start = Instant::now();
            let ran = pass.run(net, cfg)?;
            let elapsed = start.elapsed();
            if !ran {
                log::debug!("{name}: skipped (experimental, not enabled)");
                continue;
            }
            if elapsed.as_secs() > 5 {
                log::warn!("{name}: {}ms", elapsed.as_millis());
            } else if cfg.dump_passes {
                log::info!("{name}: {}ms", elapsed.as_millis());
            }
        }
        Ok(())
    }

    /// Names of every registered pass, in registration order.
    pub fn pass_names(&self) -> &[String] {
        &self.order
    }
}

/// The default plan (§4.2): discover/classify are folded into
/// `split_data_parallel_sections` and `coalesce_data_parallel_leafs`
/// themselves; what's left runs split → coalesce → fuse →
/// chain-coalesce → redundancy-elimination → arity normalization,
/// with the §4.2.7 SystemC variant appended last, gated behind
/// [`Config::experimental_parallelization`].
pub fn default_plan() -> F2ccResult<PassManager> {
    let mut pm = PassManager::default();
    pm.register_pass(
        "split-data-parallel-sections",
        "split a contained section whose branches disagree on data-parallelism into two",
        |net| crate::split_data_parallel_sections(net),
        false,
    )?;
    pm.register_pass(
        "coalesce-data-parallel-leafs",
        "fold a data-parallel contained section into one ParallelMap",
        |net| crate::coalesce_data_parallel_leafs(net),
        false,
    )?;
    pm.register_pass(
        "fuse-unzip-map-zip",
        "collapse an unzipx/Map*/zipx pattern into a single ZipWithN",
        |net| crate::fuse_unzip_map_zip_leafs(net),
        false,
    )?;
    pm.register_pass(
        "coalesce-parallel-map-chains",
        "merge a chain of compatible ParallelMap leafs into one",
        |net| crate::coalesce_parallel_map_chains(net),
        false,
    )?;
    pm.register_pass(
        "remove-redundant-leafs",
        "delete 1-in/1-out zipx/unzipx leafs by short-circuiting their neighbours",
        |net| crate::remove_redundant_leafs(net),
        false,
    )?;
    pm.register_pass(
        "normalize-zip-with-1",
        "rewrite a single-input ZipWithN as a Map",
        |net| crate::convert_zip_with1_to_map(net),
        false,
    )?;
    pm.register_pass(
        "hierarchical-parallelize",
        "collapse equivalence classes of the root's direct children into ParallelComposites (SystemC variant, experimental)",
        |net| crate::hierarchical_parallelize(net),
        true,
    )?;
    pm.add_alias(
        "parallelize",
        &[
            "split-data-parallel-sections",
            "coalesce-data-parallel-leafs",
            "fuse-unzip-map-zip",
            "coalesce-parallel-map-chains",
            "remove-redundant-leafs",
            "normalize-zip-with-1",
        ],
    )?;
    pm.add_alias(
        "default",
        &["parallelize", "hierarchical-parallelize"],
    )?;
    Ok(pm)
}

/// Run the default ModelModifier plan against `net`, per §4.2.
pub fn run_default(net: &mut ProcessNetwork, cfg: &Config) -> F2ccResult<()> {
    default_plan()?.execute_plan(net, cfg, &["default"])
}
