//! The ModelModifier: a framework for graph-rewriting passes over a
//! [`ProcessNetwork`](f2cc_ir::ProcessNetwork), plus the passes
//! themselves (§4.2).
//!
//! Built on a `Visitor`/`Named`/`ConstructVisitor`-style pass
//! framework: since every rewrite here is a plain function over the
//! whole network rather than a recursive walk over a control program,
//! the visitor hierarchy collapses to one [`GraphPass`] trait,
//! registered into a [`PassManager`] that resolves aliases and runs a
//! named plan while timing and logging each pass.

mod analysis;
mod pass_manager;
mod passes;

#[cfg(test)]
mod test_support;

pub use analysis::{
    chains_equal, classify_data_parallel, find_contained_sections, leaf_predecessors,
    leaf_successors, leaves_equal, redirect_data_flow, remove_leaf_bypassing, replace_leaves,
    ContainedSection,
};
pub use pass_manager::{default_plan, run_default, GraphPass, Named, PassManager};
pub use passes::{
    coalesce_data_parallel_leafs, coalesce_parallel_map_chains, convert_zip_with1_to_map,
    fuse_unzip_map_zip_leafs, hierarchical_parallelize, remove_redundant_leafs,
    split_data_parallel_sections,
};
