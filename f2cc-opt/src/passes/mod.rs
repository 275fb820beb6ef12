//! The ModelModifier pass bodies (§4.2): plain functions over a
//! [`ProcessNetwork`](f2cc_ir::ProcessNetwork), one module per rewrite,
//! composed into the default plan by [`crate::PassManager`].

mod coalesce;
mod coalesce_parallel_chain;
mod fuse;
mod hierarchical_parallel;
mod normalize_zipwith1;
mod remove_redundant;
mod split;

pub use coalesce::coalesce_data_parallel_leafs;
pub use coalesce_parallel_chain::coalesce_parallel_map_chains;
pub use fuse::fuse_unzip_map_zip_leafs;
pub use hierarchical_parallel::hierarchical_parallelize;
pub use normalize_zipwith1::convert_zip_with1_to_map;
pub use remove_redundant::remove_redundant_leafs;
pub use split::split_data_parallel_sections;
