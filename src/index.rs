//! The interface every spatial index under test implements.

use crate::{error::Result, geometry::BoundingBox, types::Features};

/// A spatial index that answers box intersection queries.
///
/// An index is built once and then queried any number of times. Results are the
/// identities (positions) of features as they were handed to [SpatialIndex::build].
pub trait SpatialIndex {
    /// True if [SpatialIndex::query_intersections] returns exactly the
    /// intersecting features.
    ///
    /// An inexact index may return a superset. It must never miss a feature that
    /// intersects the query.
    fn is_exact(&self) -> bool;

    /// Build the index. Fails if called a second time.
    fn build(&mut self, features: &Features) -> Result<()>;

    /// Identities of the features intersecting `query`, in any order.
    fn query_intersections(&self, query: &BoundingBox) -> Vec<usize>;
}

impl<T: SpatialIndex + ?Sized> SpatialIndex for Box<T> {
    fn is_exact(&self) -> bool {
        (**self).is_exact()
    }

    fn build(&mut self, features: &Features) -> Result<()> {
        (**self).build(features)
    }

    fn query_intersections(&self, query: &BoundingBox) -> Vec<usize> {
        (**self).query_intersections(query)
    }
}
