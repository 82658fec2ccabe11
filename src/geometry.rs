//! Geometry information

use serde::{Deserialize, Serialize};

use crate::{
    constants::NUM_DIMS,
    error::{Error, Result},
};

/// A point in three dimensional space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    coords: [f64; NUM_DIMS],
}

impl Point {
    /// Create a new point.
    pub fn new(coords: [f64; NUM_DIMS]) -> Self {
        Self { coords }
    }

    /// Return coordinates
    pub fn coords(&self) -> [f64; NUM_DIMS] {
        self.coords
    }
}

impl From<[f64; NUM_DIMS]> for Point {
    fn from(coords: [f64; NUM_DIMS]) -> Self {
        Self::new(coords)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [x, y, z] = self.coords;
        write!(f, "pt: ({}, {}, {})", x, y, z)
    }
}

/// An axis aligned bounding box.
///
/// Used for stored box features, for query shapes and for the domain of a dataset.
/// The lower corner never exceeds the upper corner on any axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    lower: Point,
    upper: Point,
}

impl BoundingBox {
    /// Create a new bounding box from its lower and upper corner.
    ///
    /// Fails if `lower[i] > upper[i]` on some axis. NaN coordinates fail as well.
    pub fn new(lower: [f64; NUM_DIMS], upper: [f64; NUM_DIMS]) -> Result<Self> {
        for axis in 0..NUM_DIMS {
            if !(lower[axis] <= upper[axis]) {
                return Err(Error::InvalidBox { lower, upper, axis });
            }
        }
        Ok(Self {
            lower: Point::new(lower),
            upper: Point::new(upper),
        })
    }

    /// Create a box from corners that are known to be ordered.
    pub(crate) fn from_ordered(lower: [f64; NUM_DIMS], upper: [f64; NUM_DIMS]) -> Self {
        debug_assert!((0..NUM_DIMS).all(|axis| lower[axis] <= upper[axis]));
        Self {
            lower: Point::new(lower),
            upper: Point::new(upper),
        }
    }

    /// Give a slice of points. Compute the tight bounding box around them.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;

        let mut lower = first.coords();
        let mut upper = first.coords();

        for point in &points[1..] {
            for (axis, &value) in point.coords().iter().enumerate() {
                lower[axis] = f64::min(lower[axis], value);
                upper[axis] = f64::max(upper[axis], value);
            }
        }

        Some(Self {
            lower: Point::new(lower),
            upper: Point::new(upper),
        })
    }

    /// Lower corner.
    pub fn lower(&self) -> [f64; NUM_DIMS] {
        self.lower.coords()
    }

    /// Upper corner.
    pub fn upper(&self) -> [f64; NUM_DIMS] {
        self.upper.coords()
    }

    /// Edge length on each axis.
    pub fn lengths(&self) -> [f64; NUM_DIMS] {
        let lower = self.lower();
        let upper = self.upper();
        [
            upper[0] - lower[0],
            upper[1] - lower[1],
            upper[2] - lower[2],
        ]
    }

    /// The box grown by `tol` on every face.
    pub fn expanded(&self, tol: f64) -> Self {
        let lower = self.lower();
        let upper = self.upper();
        Self {
            lower: Point::new([lower[0] - tol, lower[1] - tol, lower[2] - tol]),
            upper: Point::new([upper[0] + tol, upper[1] + tol, upper[2] + tol]),
        }
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [xmin, ymin, zmin] = self.lower();
        let [xmax, ymax, zmax] = self.upper();

        write!(
            f,
            "(xmin: {}, ymin: {}, zmin: {}, xmax: {}, ymax: {}, zmax: {})",
            xmin, ymin, zmin, xmax, ymax, zmax
        )
    }
}

/// Center of the box and the squared distance from the center to the lower corner.
///
/// The sphere with this radius circumscribes the box, so a radius search with it
/// never misses a point inside the box.
pub fn midpoint_and_squared_radius(bbox: &BoundingBox) -> (Point, f64) {
    let lower = bbox.lower();
    let upper = bbox.upper();

    let mut center = [0.0; NUM_DIMS];
    let mut squared = 0.0;
    for axis in 0..NUM_DIMS {
        center[axis] = 0.5 * (lower[axis] + upper[axis]);
        let diff = center[axis] - lower[axis];
        squared += diff * diff;
    }

    (Point::new(center), squared)
}

/// Linear radius from a squared radius.
pub fn radius_from_squared(squared: f64) -> f64 {
    squared.sqrt()
}

/// Center of the box and its largest half width.
///
/// This is the radius of the smallest ball in the max norm that covers the box.
pub fn manhattan_radius(bbox: &BoundingBox) -> (Point, f64) {
    let lower = bbox.lower();
    let upper = bbox.upper();

    let mut center = [0.0; NUM_DIMS];
    let mut radius = 0.0_f64;
    for axis in 0..NUM_DIMS {
        center[axis] = 0.5 * (lower[axis] + upper[axis]);
        radius = radius.max(0.5 * (upper[axis] - lower[axis]));
    }

    (Point::new(center), radius)
}

/// Closed containment test. Points on any of the six faces are inside.
pub fn point_in_box(bbox: &BoundingBox, point: &Point) -> bool {
    let lower = bbox.lower();
    let upper = bbox.upper();
    let coords = point.coords();

    (0..NUM_DIMS).all(|axis| lower[axis] <= coords[axis] && coords[axis] <= upper[axis])
}

/// Closed box/box intersection test. Touching faces count as intersecting.
pub fn box_intersects_box(query: &BoundingBox, min_corner: &Point, max_corner: &Point) -> bool {
    let lower = query.lower();
    let upper = query.upper();
    let min_corner = min_corner.coords();
    let max_corner = max_corner.coords();

    (0..NUM_DIMS).all(|axis| min_corner[axis] <= upper[axis] && lower[axis] <= max_corner[axis])
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Closed triangle/box intersection test.
///
/// Separating axis test over the three box normals, the triangle normal and the
/// nine cross products of box and triangle edges. Separation must be strict, so
/// a triangle touching the box counts as intersecting.
pub fn triangle_intersects_box(bbox: &BoundingBox, triangle: &[Point; 3]) -> bool {
    let lower = bbox.lower();
    let upper = bbox.upper();

    let mut center = [0.0; 3];
    let mut half = [0.0; 3];
    for axis in 0..NUM_DIMS {
        center[axis] = 0.5 * (lower[axis] + upper[axis]);
        half[axis] = 0.5 * (upper[axis] - lower[axis]);
    }

    // Move the box to the origin.
    let v = [
        sub(triangle[0].coords(), center),
        sub(triangle[1].coords(), center),
        sub(triangle[2].coords(), center),
    ];

    // Box face normals.
    for axis in 0..NUM_DIMS {
        let min = v[0][axis].min(v[1][axis]).min(v[2][axis]);
        let max = v[0][axis].max(v[1][axis]).max(v[2][axis]);
        if min > half[axis] || max < -half[axis] {
            return false;
        }
    }

    let edges = [sub(v[1], v[0]), sub(v[2], v[1]), sub(v[0], v[2])];

    // Cross products of the box axes with the triangle edges.
    for edge in edges {
        for axis in 0..NUM_DIMS {
            let mut unit = [0.0; 3];
            unit[axis] = 1.0;
            let a = cross(unit, edge);

            let p = [dot(a, v[0]), dot(a, v[1]), dot(a, v[2])];
            let radius = half[0] * a[0].abs() + half[1] * a[1].abs() + half[2] * a[2].abs();
            let min = p[0].min(p[1]).min(p[2]);
            let max = p[0].max(p[1]).max(p[2]);
            if min > radius || max < -radius {
                return false;
            }
        }
    }

    // Triangle plane.
    let normal = cross(edges[0], edges[1]);
    let distance = dot(normal, v[0]);
    let radius =
        half[0] * normal[0].abs() + half[1] * normal[1].abs() + half[2] * normal[2].abs();

    distance.abs() <= radius
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::{
        box_intersects_box, manhattan_radius, midpoint_and_squared_radius, point_in_box,
        radius_from_squared, triangle_intersects_box, BoundingBox, Point,
    };
    use crate::constants::DEFAULT_TOLERANCE;

    fn unit_box() -> BoundingBox {
        BoundingBox::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]).unwrap()
    }

    #[test]
    fn test_invalid_box() {
        assert!(BoundingBox::new([0.0, 1.0, 0.0], [1.0, 0.5, 1.0]).is_err());
        assert!(BoundingBox::new([0.0, f64::NAN, 0.0], [1.0, 1.0, 1.0]).is_err());
        // Degenerate boxes are fine.
        assert!(BoundingBox::new([1.0, 1.0, 1.0], [1.0, 1.0, 1.0]).is_ok());
    }

    #[test]
    fn test_from_points() {
        let points = [
            Point::new([0.5, -1.0, 2.0]),
            Point::new([-0.5, 3.0, 1.0]),
            Point::new([0.0, 0.0, 4.0]),
        ];
        let bbox = BoundingBox::from_points(&points).unwrap();
        assert_eq!(bbox.lower(), [-0.5, -1.0, 1.0]);
        assert_eq!(bbox.upper(), [0.5, 3.0, 4.0]);
        assert_eq!(bbox.lengths(), [1.0, 4.0, 3.0]);

        assert!(BoundingBox::from_points(&[]).is_none());
    }

    #[test]
    fn test_point_in_box_faces() {
        let bbox = unit_box();

        // A point on each of the six faces.
        let on_faces = [
            [0.0, 0.5, 0.5],
            [1.0, 0.5, 0.5],
            [0.5, 0.0, 0.5],
            [0.5, 1.0, 0.5],
            [0.5, 0.5, 0.0],
            [0.5, 0.5, 1.0],
        ];
        for coords in on_faces {
            assert!(point_in_box(&bbox, &Point::new(coords)));
        }

        // Displaced by the tolerance beyond each face.
        let outside = [
            [-DEFAULT_TOLERANCE, 0.5, 0.5],
            [1.0 + DEFAULT_TOLERANCE, 0.5, 0.5],
            [0.5, -DEFAULT_TOLERANCE, 0.5],
            [0.5, 1.0 + DEFAULT_TOLERANCE, 0.5],
            [0.5, 0.5, -DEFAULT_TOLERANCE],
            [0.5, 0.5, 1.0 + DEFAULT_TOLERANCE],
        ];
        for coords in outside {
            assert!(!point_in_box(&bbox, &Point::new(coords)));
        }
    }

    #[test]
    fn test_radii_cover_box() {
        let bbox = BoundingBox::new([0.0, 0.0, 0.0], [2.0, 2.0, 4.0]).unwrap();

        let (center, squared) = midpoint_and_squared_radius(&bbox);
        assert_eq!(center.coords(), [1.0, 1.0, 2.0]);
        assert_relative_eq!(squared, 6.0);
        assert_relative_eq!(radius_from_squared(squared), 6.0_f64.sqrt());

        let (center, radius) = manhattan_radius(&bbox);
        assert_eq!(center.coords(), [1.0, 1.0, 2.0]);
        assert_relative_eq!(radius, 2.0);
    }

    #[test]
    fn test_box_intersects_box() {
        let query = unit_box();

        // Touching a face.
        assert!(box_intersects_box(
            &query,
            &Point::new([1.0, 0.0, 0.0]),
            &Point::new([2.0, 1.0, 1.0])
        ));
        // Containing the query.
        assert!(box_intersects_box(
            &query,
            &Point::new([-1.0, -1.0, -1.0]),
            &Point::new([2.0, 2.0, 2.0])
        ));
        // Separated on the z axis.
        assert!(!box_intersects_box(
            &query,
            &Point::new([0.0, 0.0, 1.5]),
            &Point::new([1.0, 1.0, 2.0])
        ));
    }

    #[test]
    fn test_triangle_intersects_box() {
        let bbox = unit_box();

        let crossing = [
            Point::new([-1.0, 0.5, 0.5]),
            Point::new([2.0, 0.5, 0.5]),
            Point::new([0.5, 3.0, 0.5]),
        ];
        assert!(triangle_intersects_box(&bbox, &crossing));

        // A vertex on the corner of the box.
        let touching = [
            Point::new([1.0, 1.0, 1.0]),
            Point::new([2.0, 1.0, 1.0]),
            Point::new([1.0, 2.0, 1.0]),
        ];
        assert!(triangle_intersects_box(&bbox, &touching));

        // Every vertex outside the box but the triangle cuts a corner off.
        let corner_cut = [
            Point::new([0.8, 1.1, 0.5]),
            Point::new([1.1, 0.8, 0.5]),
            Point::new([1.5, 1.5, 0.5]),
        ];
        assert!(triangle_intersects_box(&bbox, &corner_cut));

        // Close to the corner, but only the diagonal axis separates.
        let diagonal = [
            Point::new([1.2, 1.2, 0.5]),
            Point::new([1.5, 0.95, 0.5]),
            Point::new([0.95, 1.5, 0.5]),
        ];
        assert!(!triangle_intersects_box(&bbox, &diagonal));

        let far = [
            Point::new([3.0, 3.0, 3.0]),
            Point::new([4.0, 3.0, 3.0]),
            Point::new([3.0, 4.0, 3.0]),
        ];
        assert!(!triangle_intersects_box(&bbox, &far));
    }
}
