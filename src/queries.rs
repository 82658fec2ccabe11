//! Query workload generation.
//!
//! Every batch is drawn from generators seeded with a fixed seed, so two runs
//! against the same domain produce the same workload. Each tier and axis has a
//! generator stream of its own, which keeps the tiers independent of each other.

use rand::{distributions::Uniform, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    constants::NUM_DIMS,
    error::{Error, Result},
    geometry::BoundingBox,
};

/// A class of queries of one size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectivityTier {
    /// Short name used in logs.
    pub name: &'static str,
    /// The per axis edge length is `domain_length / cbrt(volume_divisor)`.
    pub volume_divisor: f64,
    /// Percentage of data this tier nominally hits. Only used for reporting.
    pub nominal_percent: f64,
    /// The tier issues `base_query_count / count_divisor` queries.
    pub count_divisor: usize,
}

impl SelectivityTier {
    /// Edge length of the query boxes on an axis of the given length.
    pub fn edge_length(&self, domain_length: f64) -> f64 {
        domain_length / self.volume_divisor.cbrt()
    }

    /// Number of queries of this tier.
    pub fn query_count(&self, base_query_count: usize) -> usize {
        base_query_count / self.count_divisor
    }
}

/// The four standard tiers.
///
/// The divisors are tuned so the queries hit roughly the nominal share of
/// data points, not the nominal share of the domain volume.
pub const STANDARD_TIERS: [SelectivityTier; 4] = [
    SelectivityTier {
        name: "extra extra small",
        volume_divisor: 90100.0,
        nominal_percent: 0.001,
        count_divisor: 1,
    },
    SelectivityTier {
        name: "small",
        volume_divisor: 1050.0,
        nominal_percent: 0.1,
        count_divisor: 1,
    },
    SelectivityTier {
        name: "medium",
        volume_divisor: 125.0,
        nominal_percent: 1.0,
        count_divisor: 1,
    },
    SelectivityTier {
        name: "large",
        volume_divisor: 19.2,
        nominal_percent: 10.0,
        count_divisor: 10,
    },
];

/// The queries of one tier.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryBatch {
    /// Name of the tier.
    pub tier: &'static str,
    /// Nominal percent of data covered by one query.
    pub nominal_percent: f64,
    /// The query boxes.
    pub queries: Vec<BoundingBox>,
}

/// Create a ChaCha8 generator for a seed and a stream.
///
/// Different streams of the same seed are independent sequences.
pub fn seeded_rng(seed: u64, stream: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream);
    rng
}

/// Generate one batch of fixed size queries per tier, in tier order.
///
/// Lower corners are drawn uniformly inside the domain. An axis whose box would
/// stick out of the domain is redrawn until it fits. An edge length that is not
/// strictly smaller than the domain length is an error, since no draw would fit.
pub fn generate_stratified_queries(
    domain: &BoundingBox,
    base_query_count: usize,
    tiers: &[SelectivityTier],
    seed: u64,
) -> Result<Vec<QueryBatch>> {
    let lower = domain.lower();
    let upper = domain.upper();
    let lengths = domain.lengths();

    let mut batches = Vec::with_capacity(tiers.len());

    for (tier_index, tier) in tiers.iter().enumerate() {
        let mut edges = [0.0; NUM_DIMS];
        let mut generators = Vec::with_capacity(NUM_DIMS);

        for axis in 0..NUM_DIMS {
            let edge = tier.edge_length(lengths[axis]);
            if !(edge < lengths[axis]) {
                return Err(Error::QueryLargerThanDomain {
                    axis,
                    edge,
                    domain: lengths[axis],
                });
            }
            edges[axis] = edge;

            let stream = (tier_index * NUM_DIMS + axis) as u64;
            generators.push((
                seeded_rng(seed, stream),
                Uniform::new(lower[axis], upper[axis]),
            ));
        }

        let count = tier.query_count(base_query_count);
        let mut queries = Vec::with_capacity(count);

        for _ in 0..count {
            let mut query_lower = [0.0; NUM_DIMS];
            let mut query_upper = [0.0; NUM_DIMS];

            for (axis, (rng, range)) in generators.iter_mut().enumerate() {
                let mut corner = rng.sample(*range);
                while corner + edges[axis] > upper[axis] {
                    tracing::trace!(axis, corner, "query exceeds the domain, redrawing");
                    corner = rng.sample(*range);
                }
                query_lower[axis] = corner;
                query_upper[axis] = corner + edges[axis];
            }

            queries.push(BoundingBox::new(query_lower, query_upper)?);
        }

        tracing::debug!(tier = tier.name, count, ?edges, "generated query batch");

        batches.push(QueryBatch {
            tier: tier.name,
            nominal_percent: tier.nominal_percent,
            queries,
        });
    }

    Ok(batches)
}

/// Two fixed queries for sanity checks, independent of any domain.
pub fn generate_small_fixed_queries() -> Vec<BoundingBox> {
    vec![
        BoundingBox::from_ordered([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]),
        BoundingBox::from_ordered([0.5, 0.5, 0.5], [1.0, 1.0, 1.0]),
    ]
}

/// Queries with a random edge length per axis, drawn from `[len / 1000, len / 10)`.
///
/// The lower corner is uniform in the domain and the box is not clipped, so a
/// query may extend past the upper bound of the domain.
pub fn generate_random_queries(
    domain: &BoundingBox,
    count: usize,
    seed: u64,
) -> Result<Vec<BoundingBox>> {
    let mut sampler = RandomBoxSampler::new(domain, seed)?;
    Ok((0..count).map(|_| sampler.next_box()).collect())
}

/// Draws random corners and random edge lengths inside a domain.
///
/// Shared by the random query workload and synthetic data generation.
pub struct RandomBoxSampler {
    rng: ChaCha8Rng,
    corners: [Uniform<f64>; NUM_DIMS],
    edges: [Uniform<f64>; NUM_DIMS],
}

impl RandomBoxSampler {
    /// Create a sampler. Every axis of the domain must have a positive length.
    pub fn new(domain: &BoundingBox, seed: u64) -> Result<Self> {
        let lower = domain.lower();
        let upper = domain.upper();
        let lengths = domain.lengths();

        if let Some(axis) = (0..NUM_DIMS).find(|&axis| !(lengths[axis] > 0.0)) {
            return Err(Error::QueryLargerThanDomain {
                axis,
                edge: lengths[axis] / 1000.0,
                domain: lengths[axis],
            });
        }

        Ok(Self {
            rng: seeded_rng(seed, 0),
            corners: [0, 1, 2].map(|axis| Uniform::new(lower[axis], upper[axis])),
            edges: [0, 1, 2].map(|axis| Uniform::new(lengths[axis] / 1000.0, lengths[axis] / 10.0)),
        })
    }

    /// A random point inside the domain.
    pub fn next_corner(&mut self) -> [f64; NUM_DIMS] {
        [0, 1, 2].map(|axis| self.rng.sample(self.corners[axis]))
    }

    /// A random offset with a random length on each axis.
    pub fn next_offset(&mut self) -> [f64; NUM_DIMS] {
        [0, 1, 2].map(|axis| self.rng.sample(self.edges[axis]))
    }

    /// A random box with its lower corner inside the domain.
    pub fn next_box(&mut self) -> BoundingBox {
        let lower = self.next_corner();
        let offset = self.next_offset();
        let upper = [
            lower[0] + offset[0],
            lower[1] + offset[1],
            lower[2] + offset[2],
        ];
        BoundingBox::from_ordered(lower, upper)
    }
}
