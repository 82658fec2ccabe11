//! Benchmark datasets.

use crate::{
    error::{Error, Result},
    geometry::{BoundingBox, Point},
    queries::RandomBoxSampler,
    types::DataType,
};

/// Flat data of one rank, ready to be grouped into features.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    /// One point per point feature, two per box and three per triangle.
    pub points: Vec<Point>,
    /// Extent of the data.
    pub domain: BoundingBox,
    /// The count coverage is relative to: points, elements, or mesh nodes.
    pub num_data_pts: usize,
    /// Mesh node ids of every element, if they are tracked.
    pub node_ids: Option<Vec<Vec<usize>>>,
}

impl MeshData {
    /// Wrap flat points, computing the domain from them.
    pub fn from_points(points: Vec<Point>, num_data_pts: usize) -> Result<Self> {
        let domain = BoundingBox::from_points(&points).ok_or(Error::EmptyDataset)?;
        Ok(Self {
            points,
            domain,
            num_data_pts,
            node_ids: None,
        })
    }
}

fn offset(corner: [f64; 3], by: [f64; 3]) -> Point {
    Point::new([corner[0] + by[0], corner[1] + by[1], corner[2] + by[2]])
}

/// `count` random features inside `domain`.
///
/// Boxes and triangles get a random extent of `[len / 1000, len / 10)` per axis,
/// starting from a random corner, so they may reach past the domain. The domain
/// of the result is recomputed from the generated points.
pub fn random_mesh_data(
    data_type: DataType,
    domain: &BoundingBox,
    count: usize,
    seed: u64,
) -> Result<MeshData> {
    let mut sampler = RandomBoxSampler::new(domain, seed)?;
    let mut points = Vec::with_capacity(count * data_type.points_per_feature());

    for _ in 0..count {
        let corner = sampler.next_corner();
        match data_type {
            DataType::Points => points.push(Point::new(corner)),
            DataType::Boxes => {
                let extent = sampler.next_offset();
                points.push(Point::new(corner));
                points.push(offset(corner, extent));
            }
            DataType::Triangles => {
                let first = sampler.next_offset();
                let second = sampler.next_offset();
                points.push(Point::new(corner));
                points.push(offset(corner, first));
                points.push(offset(corner, second));
            }
        }
    }

    tracing::debug!(%data_type, count, "generated random data");
    MeshData::from_points(points, count)
}

/// Regular grid data on `[0, length - 1]^3`.
///
/// Points are the `length^3` grid points. Boxes are the unit cubes with lower
/// corners in `[0, length / 2)^3`. Triangle `i` joins grid point `i` with its
/// neighbours `i + length` and `i + length^2`, for the first third of the grid.
pub fn regular_grid_data(data_type: DataType, length: usize) -> Result<MeshData> {
    let grid: Vec<Point> = (0..length)
        .flat_map(|i| {
            (0..length)
                .flat_map(move |j| (0..length).map(move |k| Point::new([i as f64, j as f64, k as f64])))
        })
        .collect();

    match data_type {
        DataType::Points => {
            let count = grid.len();
            MeshData::from_points(grid, count)
        }
        DataType::Boxes => {
            let half = length / 2;
            let mut points = Vec::with_capacity(2 * half * half * half);
            for i in 0..half {
                for j in 0..half {
                    for k in 0..half {
                        let lower = [i as f64, j as f64, k as f64];
                        points.push(Point::new(lower));
                        points.push(offset(lower, [1.0, 1.0, 1.0]));
                    }
                }
            }
            MeshData::from_points(points, half * half * half)
        }
        DataType::Triangles => {
            let count = grid.len() / 3;
            let mut points = Vec::with_capacity(3 * count);
            for i in 0..count {
                points.push(grid[i]);
                points.push(grid[i + length]);
                points.push(grid[i + length * length]);
            }
            MeshData::from_points(points, count)
        }
    }
}
