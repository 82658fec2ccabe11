//! Index implementations that ship with the benchmark.
//!
//! The brute force scan is the reference every other index is compared against.
//! The radius scans mimic libraries that can only run sphere or max norm radius
//! searches. They return a superset of the intersecting points which the
//! evaluator has to filter.

use crate::{
    constants::DEFAULT_TOLERANCE,
    error::{Error, Result},
    geometry::{
        manhattan_radius, midpoint_and_squared_radius, radius_from_squared, BoundingBox, Point,
    },
    index::SpatialIndex,
    types::{DataType, Features, Library},
};

/// Exact linear scan over all features.
#[derive(Debug, Default)]
pub struct BruteForce {
    features: Option<Features>,
}

impl BruteForce {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpatialIndex for BruteForce {
    fn is_exact(&self) -> bool {
        true
    }

    fn build(&mut self, features: &Features) -> Result<()> {
        if self.features.is_some() {
            return Err(Error::AlreadyBuilt);
        }
        self.features = Some(features.clone());
        Ok(())
    }

    fn query_intersections(&self, query: &BoundingBox) -> Vec<usize> {
        let Some(features) = &self.features else {
            return Vec::new();
        };
        (0..features.len())
            .filter(|&id| features.intersects(id, query))
            .collect()
    }
}

fn points_only(library: Library, features: &Features) -> Result<&[Point]> {
    match features {
        Features::Points(points) => Ok(points),
        other => Err(Error::UnsupportedDataType {
            library,
            data_type: other.data_type(),
        }),
    }
}

/// Sphere radius search over points.
///
/// A query box is turned into its circumscribed sphere, grown by the tolerance.
#[derive(Debug)]
pub struct SphereRadiusScan {
    tolerance: f64,
    points: Option<Vec<[f64; 3]>>,
}

impl SphereRadiusScan {
    /// Create an empty index with the default tolerance.
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_TOLERANCE)
    }

    /// Create an empty index that grows every search radius by `tolerance`.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            points: None,
        }
    }
}

impl Default for SphereRadiusScan {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex for SphereRadiusScan {
    fn is_exact(&self) -> bool {
        false
    }

    fn build(&mut self, features: &Features) -> Result<()> {
        if self.points.is_some() {
            return Err(Error::AlreadyBuilt);
        }
        let points = points_only(Library::BruteForce, features)?;
        self.points = Some(points.iter().map(|point| point.coords()).collect());
        Ok(())
    }

    fn query_intersections(&self, query: &BoundingBox) -> Vec<usize> {
        let Some(points) = &self.points else {
            return Vec::new();
        };

        let (center, squared) = midpoint_and_squared_radius(query);
        let radius = radius_from_squared(squared) + self.tolerance;
        let radius_squared = radius * radius;
        let center = center.coords();

        points
            .iter()
            .enumerate()
            .filter(|(_, point)| {
                let dist: f64 = (0..3).map(|axis| (point[axis] - center[axis]).powi(2)).sum();
                dist <= radius_squared
            })
            .map(|(id, _)| id)
            .collect()
    }
}

/// Max norm radius search over points.
///
/// A query box is turned into the cube around its center with half width equal
/// to the largest half width of the box, grown by the tolerance.
#[derive(Debug)]
pub struct ManhattanRadiusScan {
    tolerance: f64,
    points: Option<Vec<[f64; 3]>>,
}

impl ManhattanRadiusScan {
    /// Create an empty index with the default tolerance.
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_TOLERANCE)
    }

    /// Create an empty index that grows every search radius by `tolerance`.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            points: None,
        }
    }
}

impl Default for ManhattanRadiusScan {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex for ManhattanRadiusScan {
    fn is_exact(&self) -> bool {
        false
    }

    fn build(&mut self, features: &Features) -> Result<()> {
        if self.points.is_some() {
            return Err(Error::AlreadyBuilt);
        }
        let points = points_only(Library::BruteForce, features)?;
        self.points = Some(points.iter().map(|point| point.coords()).collect());
        Ok(())
    }

    fn query_intersections(&self, query: &BoundingBox) -> Vec<usize> {
        let Some(points) = &self.points else {
            return Vec::new();
        };

        let (center, radius) = manhattan_radius(query);
        let radius = radius + self.tolerance;
        let center = center.coords();

        points
            .iter()
            .enumerate()
            .filter(|(_, point)| (0..3).all(|axis| (point[axis] - center[axis]).abs() <= radius))
            .map(|(id, _)| id)
            .collect()
    }
}

/// Resolve a library, data type and option code to a result label and an unbuilt index.
///
/// Options outside the range a library defines give [Error::UnknownOption].
/// Libraries without an implementation in this crate give [Error::LibraryUnavailable].
pub fn make_index(
    library: Library,
    data_type: DataType,
    option: u16,
) -> Result<(String, Box<dyn SpatialIndex>)> {
    match library {
        Library::BruteForce => match (data_type, option) {
            (DataType::Points, 0) => Ok(("Brute Force".to_string(), Box::new(BruteForce::new()))),
            (DataType::Points, 1) => Ok((
                "Brute Force Radius".to_string(),
                Box::new(SphereRadiusScan::new()),
            )),
            (DataType::Points, 2) => Ok((
                "Brute Force Manhattan Radius".to_string(),
                Box::new(ManhattanRadiusScan::new()),
            )),
            (DataType::Boxes, 0) => Ok((
                "Brute Force Bboxes".to_string(),
                Box::new(BruteForce::new()),
            )),
            (DataType::Triangles, 0) => Ok((
                "Brute Force Triangles".to_string(),
                Box::new(BruteForce::new()),
            )),
            _ => Err(Error::UnknownOption { library, option }),
        },
        _ => Err(Error::LibraryUnavailable(library)),
    }
}

/// Every (data type, option) pair [make_index] accepts.
pub fn available_configurations() -> Vec<(Library, DataType, u16)> {
    vec![
        (Library::BruteForce, DataType::Points, 0),
        (Library::BruteForce, DataType::Points, 1),
        (Library::BruteForce, DataType::Points, 2),
        (Library::BruteForce, DataType::Boxes, 0),
        (Library::BruteForce, DataType::Triangles, 0),
    ]
}
