//! Type definitions

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    geometry::{box_intersects_box, point_in_box, triangle_intersects_box, BoundingBox, Point},
};

/// Spatial index libraries known to the benchmark.
///
/// The numeric codes are the library codes of the command line interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
#[allow(missing_docs)]
pub enum Library {
    Alglib,
    Ann,
    BoostRtree,
    BruteForce,
    Cgal,
    Flann,
    Kdtree,
    Kdtree2,
    Kdtree3,
    Kdtree4,
    Lib3dtk,
    Libkdtree,
    Libkdtree2,
    Libnabo,
    Libspatialindex,
    Nanoflann,
    Octree,
    Pcl,
    PicoTree,
    RtreeTemplate,
    Spatial,
}

impl Library {
    /// All libraries in code order.
    pub const ALL: [Library; 21] = [
        Library::Alglib,
        Library::Ann,
        Library::BoostRtree,
        Library::BruteForce,
        Library::Cgal,
        Library::Flann,
        Library::Kdtree,
        Library::Kdtree2,
        Library::Kdtree3,
        Library::Kdtree4,
        Library::Lib3dtk,
        Library::Libkdtree,
        Library::Libkdtree2,
        Library::Libnabo,
        Library::Libspatialindex,
        Library::Nanoflann,
        Library::Octree,
        Library::Pcl,
        Library::PicoTree,
        Library::RtreeTemplate,
        Library::Spatial,
    ];

    /// Human readable library name.
    pub fn name(&self) -> &'static str {
        match self {
            Library::Alglib => "ALGLIB",
            Library::Ann => "ANN",
            Library::BoostRtree => "Boost R-tree",
            Library::BruteForce => "Brute Force",
            Library::Cgal => "CGAL",
            Library::Flann => "FLANN",
            Library::Kdtree => "kdtree",
            Library::Kdtree2 => "kdtree2",
            Library::Kdtree3 => "kdtree3",
            Library::Kdtree4 => "kdtree4",
            Library::Lib3dtk => "3DTK",
            Library::Libkdtree => "libkdtree",
            Library::Libkdtree2 => "libkdtree2",
            Library::Libnabo => "libnabo",
            Library::Libspatialindex => "libspatialindex",
            Library::Nanoflann => "nanoflann",
            Library::Octree => "Octree",
            Library::Pcl => "PCL",
            Library::PicoTree => "PicoTree",
            Library::RtreeTemplate => "RTree template",
            Library::Spatial => "Spatial",
        }
    }
}

impl TryFrom<u16> for Library {
    type Error = Error;

    fn try_from(code: u16) -> Result<Self> {
        Library::ALL
            .get(code as usize)
            .copied()
            .ok_or(Error::UnknownLibrary(code))
    }
}

impl From<Library> for u16 {
    fn from(library: Library) -> Self {
        library as u16
    }
}

impl std::fmt::Display for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Representation of the indexed data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum DataType {
    /// One point per feature.
    Points,
    /// Two points (lower and upper corner) per feature.
    Boxes,
    /// Three points per feature.
    Triangles,
}

impl DataType {
    /// Number of points that make up one feature.
    pub fn points_per_feature(&self) -> usize {
        match self {
            DataType::Points => 1,
            DataType::Boxes => 2,
            DataType::Triangles => 3,
        }
    }
}

impl TryFrom<u16> for DataType {
    type Error = Error;

    fn try_from(code: u16) -> Result<Self> {
        match code {
            0 => Ok(DataType::Points),
            1 => Ok(DataType::Boxes),
            2 => Ok(DataType::Triangles),
            _ => Err(Error::UnknownDataType(code)),
        }
    }
}

impl From<DataType> for u16 {
    fn from(data_type: DataType) -> Self {
        data_type as u16
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Points => write!(f, "points"),
            DataType::Boxes => write!(f, "bounding boxes"),
            DataType::Triangles => write!(f, "triangles"),
        }
    }
}

/// Everything a result row needs to know about one benchmark configuration.
///
/// Sent between ranks, so the domain bounds are plain sequences.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestingConfig {
    /// Lower domain bound per axis.
    pub domain_lower_bounds: Vec<f64>,
    /// Upper domain bound per axis.
    pub domain_upper_bounds: Vec<f64>,
    /// Number of data points (or nodes) the coverage is relative to.
    pub num_data_pts: usize,
    /// Base number of queries per tier.
    pub num_queries: usize,
    /// Library under test.
    pub library: Library,
    /// Data representation.
    pub data_type: DataType,
    /// Library specific option code.
    pub library_option: u16,
}

impl TestingConfig {
    /// Create a new config.
    pub fn new(
        domain: &BoundingBox,
        num_data_pts: usize,
        num_queries: usize,
        library: Library,
        data_type: DataType,
        library_option: u16,
    ) -> Self {
        Self {
            domain_lower_bounds: domain.lower().to_vec(),
            domain_upper_bounds: domain.upper().to_vec(),
            num_data_pts,
            num_queries,
            library,
            data_type,
            library_option,
        }
    }
}

/// The trailing config columns of a result row, including the leading separator.
impl std::fmt::Display for TestingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            ", {}, {}, {}, {}",
            u16::from(self.library),
            self.library_option,
            self.num_data_pts,
            self.num_queries
        )?;
        for (lower, upper) in self.domain_lower_bounds.iter().zip(&self.domain_upper_bounds) {
            write!(f, ", {}, {}", lower, upper)?;
        }
        Ok(())
    }
}

/// Indexed features. The identity of a feature is its position.
#[derive(Clone, Debug, PartialEq)]
pub enum Features {
    /// Point data.
    Points(Vec<Point>),
    /// Box data.
    Boxes(Vec<BoundingBox>),
    /// Triangle data.
    Triangles(Vec<[Point; 3]>),
}

impl Features {
    /// Group a flat point list into features of the given type.
    ///
    /// Boxes take consecutive (lower, upper) pairs, triangles consecutive triples.
    pub fn from_flat(data_type: DataType, points: Vec<Point>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::EmptyDataset);
        }

        let per_feature = data_type.points_per_feature();
        if points.len() % per_feature != 0 {
            return Err(Error::UnevenPointCount {
                count: points.len(),
                per_feature,
                data_type,
            });
        }

        match data_type {
            DataType::Points => Ok(Features::Points(points)),
            DataType::Boxes => points
                .chunks_exact(2)
                .map(|pair| BoundingBox::new(pair[0].coords(), pair[1].coords()))
                .collect::<Result<Vec<_>>>()
                .map(Features::Boxes),
            DataType::Triangles => Ok(Features::Triangles(
                points
                    .chunks_exact(3)
                    .map(|tri| [tri[0], tri[1], tri[2]])
                    .collect(),
            )),
        }
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        match self {
            Features::Points(points) => points.len(),
            Features::Boxes(boxes) => boxes.len(),
            Features::Triangles(triangles) => triangles.len(),
        }
    }

    /// True if there are no features.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The data representation.
    pub fn data_type(&self) -> DataType {
        match self {
            Features::Points(_) => DataType::Points,
            Features::Boxes(_) => DataType::Boxes,
            Features::Triangles(_) => DataType::Triangles,
        }
    }

    /// Exact closed intersection test of feature `id` with `query`.
    ///
    /// Unknown identities never intersect.
    pub fn intersects(&self, id: usize, query: &BoundingBox) -> bool {
        match self {
            Features::Points(points) => points
                .get(id)
                .is_some_and(|point| point_in_box(query, point)),
            Features::Boxes(boxes) => boxes.get(id).is_some_and(|bbox| {
                box_intersects_box(query, &Point::new(bbox.lower()), &Point::new(bbox.upper()))
            }),
            Features::Triangles(triangles) => triangles
                .get(id)
                .is_some_and(|triangle| triangle_intersects_box(query, triangle)),
        }
    }

    /// Describe feature `id` for diagnostics.
    pub fn describe(&self, id: usize) -> String {
        match self {
            Features::Points(points) => points
                .get(id)
                .map_or_else(|| format!("unknown id {id}"), |p| p.to_string()),
            Features::Boxes(boxes) => boxes
                .get(id)
                .map_or_else(|| format!("unknown id {id}"), |b| format!("box: {b}")),
            Features::Triangles(triangles) => triangles.get(id).map_or_else(
                || format!("unknown id {id}"),
                |[a, b, c]| format!("triangle: [{a}, {b}, {c}]"),
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{DataType, Features, Library, TestingConfig};
    use crate::{
        error::Error,
        geometry::{BoundingBox, Point},
    };

    #[test]
    fn test_library_codes() {
        for (code, library) in Library::ALL.iter().enumerate() {
            assert_eq!(Library::try_from(code as u16).unwrap(), *library);
            assert_eq!(u16::from(*library), code as u16);
        }
        assert_eq!(Library::try_from(3).unwrap(), Library::BruteForce);
        assert_eq!(Library::try_from(17).unwrap(), Library::Pcl);
        assert!(matches!(
            Library::try_from(21),
            Err(Error::UnknownLibrary(21))
        ));
        assert!(DataType::try_from(3).is_err());
    }

    #[test]
    fn test_config_serialization() {
        let domain = BoundingBox::new([0.0, -1.0, 2.0], [5.0, 1.5, 3.0]).unwrap();
        let config = TestingConfig::new(&domain, 125, 100, Library::Nanoflann, DataType::Boxes, 2);

        let bytes = serde_json::to_vec(&config).unwrap();
        let back: TestingConfig = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, config);

        assert_eq!(
            config.to_string(),
            ", 15, 2, 125, 100, 0, 5, -1, 1.5, 2, 3"
        );

        // Out of range codes are rejected on the way in.
        let bad = String::from_utf8(bytes).unwrap().replace("\"library\":15", "\"library\":99");
        assert!(serde_json::from_str::<TestingConfig>(&bad).is_err());
    }

    #[test]
    fn test_features_from_flat() {
        let points: Vec<Point> = (0..6).map(|i| Point::new([i as f64; 3])).collect();

        let boxes = Features::from_flat(DataType::Boxes, points.clone()).unwrap();
        assert_eq!(boxes.len(), 3);
        assert_eq!(boxes.data_type(), DataType::Boxes);

        let triangles = Features::from_flat(DataType::Triangles, points.clone()).unwrap();
        assert_eq!(triangles.len(), 2);

        let odd = Features::from_flat(DataType::Boxes, points[..5].to_vec());
        assert!(matches!(
            odd,
            Err(Error::UnevenPointCount { count: 5, .. })
        ));

        assert!(matches!(
            Features::from_flat(DataType::Points, Vec::new()),
            Err(Error::EmptyDataset)
        ));
    }

    #[test]
    fn test_features_intersects() {
        let points = vec![
            Point::new([0.0, 0.0, 0.0]),
            Point::new([2.0, 2.0, 2.0]),
            Point::new([5.0, 5.0, 5.0]),
        ];
        let features = Features::Points(points);
        let query = BoundingBox::new([0.0, 0.0, 0.0], [2.0, 2.0, 2.0]).unwrap();

        assert!(features.intersects(0, &query));
        assert!(features.intersects(1, &query));
        assert!(!features.intersects(2, &query));
        assert!(!features.intersects(3, &query));
    }
}
