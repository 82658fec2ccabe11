//! Coverage evaluation of a built index against a query batch.

use std::{
    collections::HashSet,
    time::{Duration, Instant},
};

use crate::{
    geometry::BoundingBox,
    index::SpatialIndex,
    queries::QueryBatch,
    types::{DataType, Features, TestingConfig},
};

/// What a hit on an element counts as.
#[derive(Clone, Copy, Debug, Default)]
pub enum NodeCounting<'a> {
    /// One hit per element.
    #[default]
    Elements,
    /// The union of the mesh nodes of all hit elements, one entry per element.
    Nodes(&'a [Vec<usize>]),
}

/// Result of evaluating one batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchStatistics {
    /// Wall clock time spent querying and counting.
    pub elapsed: Duration,
    /// Average share of the data hit by one query, in percent.
    pub avg_percent_covered: f64,
    /// Total number of hits over the batch.
    pub intersected: usize,
}

/// Number of true hits of one query.
///
/// Results of an inexact index are filtered through the exact predicate first.
fn count_hits<I: SpatialIndex + ?Sized>(
    index: &I,
    features: &Features,
    result: Vec<usize>,
    query: &BoundingBox,
    counting: NodeCounting,
) -> usize {
    if !index.is_exact() {
        return result
            .into_iter()
            .filter(|&id| features.intersects(id, query))
            .count();
    }

    match (features.data_type(), counting) {
        (DataType::Points, _) | (_, NodeCounting::Elements) => result.len(),
        (_, NodeCounting::Nodes(node_ids)) => result
            .iter()
            .filter_map(|&id| node_ids.get(id))
            .flatten()
            .copied()
            .collect::<HashSet<usize>>()
            .len(),
    }
}

/// Run every query of the batch and compute the average coverage.
///
/// Coverage is relative to `config.num_data_pts`. An empty batch covers nothing.
pub fn evaluate_batch<I: SpatialIndex + ?Sized>(
    index: &I,
    batch: &QueryBatch,
    features: &Features,
    config: &TestingConfig,
    counting: NodeCounting,
) -> BatchStatistics {
    let start = Instant::now();

    let mut intersected = 0;
    for query in &batch.queries {
        let result = index.query_intersections(query);
        let hits = count_hits(index, features, result, query, counting);
        tracing::trace!(%query, hits, "query done");
        intersected += hits;
    }

    let elapsed = start.elapsed();

    let avg_percent_covered = if batch.queries.is_empty() || config.num_data_pts == 0 {
        0.0
    } else {
        (intersected as f64 / batch.queries.len() as f64) / config.num_data_pts as f64 * 100.0
    };

    BatchStatistics {
        elapsed,
        avg_percent_covered,
        intersected,
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::{evaluate_batch, NodeCounting};
    use crate::{
        adapters::{BruteForce, SphereRadiusScan},
        geometry::{BoundingBox, Point},
        index::SpatialIndex,
        queries::QueryBatch,
        types::{DataType, Features, Library, TestingConfig},
    };

    fn grid_points() -> Vec<Point> {
        let mut points = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                for k in 0..4 {
                    points.push(Point::new([i as f64, j as f64, k as f64]));
                }
            }
        }
        points
    }

    fn batch(queries: Vec<BoundingBox>) -> QueryBatch {
        QueryBatch {
            tier: "test",
            nominal_percent: 1.0,
            queries,
        }
    }

    #[test]
    fn test_exact_and_inexact_agree() {
        let points = grid_points();
        let domain = BoundingBox::from_points(&points).unwrap();
        let features = Features::Points(points);
        let config = TestingConfig::new(&domain, 64, 2, Library::BruteForce, DataType::Points, 0);

        // 8 and 27 grid points.
        let queries = batch(vec![
            BoundingBox::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]).unwrap(),
            BoundingBox::new([0.5, 0.5, 0.5], [3.0, 3.0, 3.0]).unwrap(),
        ]);

        let mut exact = BruteForce::new();
        exact.build(&features).unwrap();
        let mut inexact = SphereRadiusScan::new();
        inexact.build(&features).unwrap();

        let exact_stats = evaluate_batch(&exact, &queries, &features, &config, NodeCounting::Elements);
        let inexact_stats =
            evaluate_batch(&inexact, &queries, &features, &config, NodeCounting::Elements);

        assert_eq!(exact_stats.intersected, 35);
        assert_eq!(inexact_stats.intersected, 35);
        assert_relative_eq!(exact_stats.avg_percent_covered, 35.0 / 2.0 / 64.0 * 100.0);
        assert_relative_eq!(
            exact_stats.avg_percent_covered,
            inexact_stats.avg_percent_covered
        );
    }

    #[test]
    fn test_idempotent() {
        let points = grid_points();
        let domain = BoundingBox::from_points(&points).unwrap();
        let features = Features::Points(points);
        let config = TestingConfig::new(&domain, 64, 1, Library::BruteForce, DataType::Points, 1);

        let mut index = SphereRadiusScan::new();
        index.build(&features).unwrap();
        let queries = batch(vec![BoundingBox::new([1.0, 0.0, 0.0], [2.5, 3.0, 1.0]).unwrap()]);

        let first = evaluate_batch(&index, &queries, &features, &config, NodeCounting::Elements);
        let second = evaluate_batch(&index, &queries, &features, &config, NodeCounting::Elements);
        assert_eq!(first.intersected, second.intersected);
        assert_eq!(first.avg_percent_covered, second.avg_percent_covered);
    }

    #[test]
    fn test_node_counting() {
        // Two elements sharing two of their nodes.
        let flat = vec![
            Point::new([0.0, 0.0, 0.0]),
            Point::new([1.0, 1.0, 1.0]),
            Point::new([1.0, 0.0, 0.0]),
            Point::new([2.0, 1.0, 1.0]),
        ];
        let features = Features::from_flat(DataType::Boxes, flat).unwrap();
        let node_ids = vec![vec![0, 1, 2, 3], vec![2, 3, 4, 5]];
        let domain = BoundingBox::new([0.0, 0.0, 0.0], [2.0, 1.0, 1.0]).unwrap();
        let config = TestingConfig::new(&domain, 6, 1, Library::BruteForce, DataType::Boxes, 0);

        let mut index = BruteForce::new();
        index.build(&features).unwrap();
        let queries = batch(vec![domain]);

        let elements = evaluate_batch(&index, &queries, &features, &config, NodeCounting::Elements);
        assert_eq!(elements.intersected, 2);

        let nodes = evaluate_batch(
            &index,
            &queries,
            &features,
            &config,
            NodeCounting::Nodes(&node_ids),
        );
        assert_eq!(nodes.intersected, 6);
        assert_relative_eq!(nodes.avg_percent_covered, 100.0);
    }

    #[test]
    fn test_empty_batch() {
        let features = Features::Points(grid_points());
        let domain = BoundingBox::from_points(&grid_points()).unwrap();
        let config = TestingConfig::new(&domain, 64, 0, Library::BruteForce, DataType::Points, 0);
        let mut index = BruteForce::new();
        index.build(&features).unwrap();

        let stats = evaluate_batch(&index, &batch(Vec::new()), &features, &config, NodeCounting::Elements);
        assert_eq!(stats.intersected, 0);
        assert_eq!(stats.avg_percent_covered, 0.0);
    }
}
