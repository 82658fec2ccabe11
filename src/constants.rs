//! Crate wide constants.

/// Number of spatial dimensions.
pub const NUM_DIMS: usize = 3;

/// Margin added to radius and box searches handed to an index.
///
/// Points on a query boundary are easily lost to floating point comparisons
/// inside a library. The exact predicates in [crate::geometry] never use it.
pub const DEFAULT_TOLERANCE: f64 = 0.00001;

/// Margin for libraries that lose boundary points even with [DEFAULT_TOLERANCE].
pub const DEFAULT_LARGE_TOLERANCE: f64 = 0.0001;

/// Seed for every query and synthetic data stream.
pub const QUERY_SEED: u64 = 100;

/// Default bucket size (elements per node) for tree based adapters.
pub const NUM_ELEMS_PER_NODE: usize = 20;

/// Large bucket size used by the "Bucket Size" library options.
pub const LARGE_NUM_ELEMS_PER_NODE: usize = 200;

/// Number of folders a decomposed mesh is spread across.
pub const NUM_MESH_FOLDERS: usize = 4;

/// Edge length, in points per axis, of the regular grid test dataset.
pub const DOMAIN_LENGTH: usize = 5;
