//! Error types for the benchmark harness.

use thiserror::Error;

use crate::types::{DataType, Library};

/// Errors raised while generating workloads, evaluating indices or reporting.
#[derive(Debug, Error)]
pub enum Error {
    /// A box whose lower corner exceeds its upper corner on some axis.
    #[error("invalid bounding box: lower {lower:?} exceeds upper {upper:?} on axis {axis}")]
    InvalidBox {
        /// Lower corner.
        lower: [f64; 3],
        /// Upper corner.
        upper: [f64; 3],
        /// First offending axis.
        axis: usize,
    },

    /// The flat point list cannot be split into features of the requested kind.
    #[error("{}", uneven_message(.count, .per_feature, .data_type))]
    UnevenPointCount {
        /// Number of points supplied.
        count: usize,
        /// Points required per feature.
        per_feature: usize,
        /// Requested representation.
        data_type: DataType,
    },

    /// A query tier whose edge length does not fit into the domain.
    #[error("query edge length {edge} on axis {axis} is not smaller than the domain length {domain}")]
    QueryLargerThanDomain {
        /// Axis index.
        axis: usize,
        /// Requested edge length.
        edge: f64,
        /// Domain length on that axis.
        domain: f64,
    },

    /// No data to index.
    #[error("dataset contains no data points")]
    EmptyDataset,

    /// A library code outside the known range.
    #[error("unknown library code {0}")]
    UnknownLibrary(u16),

    /// A data type code outside the known range.
    #[error("unknown data type code {0}")]
    UnknownDataType(u16),

    /// A library option the adapter does not define.
    #[error("{library} was run with option {option}, which exceeds the maximum expected value")]
    UnknownOption {
        /// Library.
        library: Library,
        /// Requested option.
        option: u16,
    },

    /// A known library that has no adapter in this build.
    #[error("library {0} is not available in this build")]
    LibraryUnavailable(Library),

    /// A library that cannot index this data representation.
    #[error("data type {data_type} not defined for library {library}")]
    UnsupportedDataType {
        /// Library.
        library: Library,
        /// Requested representation.
        data_type: DataType,
    },

    /// `build` was called on an index that already holds data.
    #[error("index has already been built")]
    AlreadyBuilt,

    /// Config serialization or deserialization failed.
    #[error("config serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The numeric and config gathers disagree on the number of ranks.
    #[error("gather mismatch: {scalars} scalar entries but {configs} config entries")]
    GatherMismatch {
        /// Entries from the scalar gather.
        scalars: usize,
        /// Entries from the variable-size gather.
        configs: usize,
    },

    /// The rank transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Mesh file could not be loaded.
    #[error("mesh error: {0}")]
    Mesh(String),

    /// I/O error wrapper.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn uneven_message(count: &usize, per_feature: &usize, data_type: &DataType) -> String {
    if *per_feature == 2 {
        format!("your point list size ({count}) has to be even to insert {data_type}")
    } else {
        format!("your point list size ({count}) has to be a multiple of {per_feature} to insert {data_type}")
    }
}

impl Error {
    /// Degenerate-data conditions that skip one configuration without ending the run.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Error::EmptyDataset | Error::UnevenPointCount { .. } | Error::UnknownOption { .. }
        )
    }
}

/// Result type for benchmark operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::Error;
    use crate::types::{DataType, Library};

    #[test]
    fn test_warning_classification() {
        let odd = Error::UnevenPointCount {
            count: 5,
            per_feature: 2,
            data_type: DataType::Boxes,
        };
        assert!(odd.is_warning());
        assert!(odd.to_string().contains("has to be even"));

        assert!(Error::EmptyDataset.is_warning());
        assert!(!Error::UnknownLibrary(40).is_warning());
        assert!(!Error::GatherMismatch {
            scalars: 3,
            configs: 2
        }
        .is_warning());
        assert!(!Error::LibraryUnavailable(Library::Pcl).is_warning());
    }
}
