//! Error types raised by the field-computation core.
//!
//! Numerical trouble during integration (non-convergence, evaluation close to the wire)
//! is not represented here: it shows up as extreme or non-finite values
//! in the resulting [FieldVolume](crate::field::FieldVolume).

use thiserror::Error;

/// Rejected wire geometry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    /// The direction vector of a straight segment has zero length.
    #[error("straight segment direction vector must be non-zero")]
    ZeroDirection,
    /// One of the two radius vectors of an arc has zero length.
    #[error("arc radius vector r{0} must be non-zero")]
    ZeroRadius(u8),
    /// `r1 × r2` vanishes, so the arc does not span a plane.
    #[error("arc radius vectors are colinear")]
    ColinearRadii,
    /// A coordinate or parameter bound is NaN or infinite.
    #[error("geometry contains a non-finite value")]
    NonFinite,
    /// Raw editor input was neither a straight (6 values) nor a curved (13 values) segment.
    #[error("expected 6 (straight) or 13 (curved) segment parameters, got {0}")]
    ParameterCount(usize),
}

/// Rejected sampling volume configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VolumeError {
    #[error("bounding box must have 6 elements, got {0}")]
    BoundingBoxArity(usize),
    #[error("resolution must have 3 elements, got {0}")]
    ResolutionArity(usize),
    #[error("sampling volume contains a non-finite value")]
    NonFinite,
    #[error("resolution along {axis} must be strictly positive, got {value}")]
    NonPositiveResolution { axis: char, value: f64 },
    #[error("bounding box along {axis} is inverted: {min} > {max}")]
    InvertedBounds { axis: char, min: f64, max: f64 },
    /// The grid has more points than a field volume over it can hold.
    #[error("grid with {counts:?} points per axis is too large")]
    TooLarge { counts: [f64; 3] },
}

/// Consistency errors on cached field volumes and indices.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    /// A segment has no cached volume for the current sampling volume.
    #[error("segment {segment} has no field volume for sampling volume generation {generation}")]
    StaleSegment { segment: usize, generation: u64 },
    /// An injected volume does not match the sampling grid.
    #[error("field volume shape {found:?} does not match grid shape {expected:?}")]
    ShapeMismatch {
        expected: [usize; 4],
        found: [usize; 4],
    },
    #[error("segment index {index} out of range for coil with {len} segments")]
    SegmentIndex { index: usize, len: usize },
    #[error("coil index {index} out of range for scanner with {len} coils")]
    CoilIndex { index: usize, len: usize },
    /// Slice numbers are 1-based and bounded by the grid extent.
    #[error("slice number {number} out of range 1..={extent}")]
    SliceNumber { number: usize, extent: usize },
    #[error("slice coordinate {0} is not finite")]
    SliceCoordinate(f64),
    /// An array handed in for slicing or export does not lie on the sampling grid.
    #[error("array shape {found:?} does not match sampling grid {expected:?}")]
    GridMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Failures while loading or saving a workspace or configuration file.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid scanner: {0}")]
    Volume(#[from] VolumeError),
    #[error("invalid segment in coil {coil}, entry {segment}: {source}")]
    Segment {
        coil: usize,
        segment: usize,
        #[source]
        source: GeometryError,
    },
    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Failures of a background export, delivered through its completion signal.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// The worker thread went away without reporting a result.
    #[error("export worker terminated without reporting a result")]
    WorkerLost,
}
