//! Persisted editor state: raw segment parameters per coil plus the scanner grid.
//!
//! A workspace file is a JSON object
//!
//! ```json
//! {
//!   "user_inputs": [[[0, 0, 0, 1, 0, 0], [0, 0, 0, 0, 1, 0, 1, 0, 0, 1, 1, 0, 2]]],
//!   "scanner_bbox": [1, -5, -1, 6, 5, 1],
//!   "scanner_vol_res": [0.5, 0.5, 0.5]
//! }
//! ```
//!
//! with one list of raw segment tuples per coil. Field volumes are not stored; they are
//! recomputed when the workspace is rebuilt, unless the caller injects them.

use std::f64::consts::PI;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::SolverConfig;
use crate::curve::Curve;
use crate::error::{GeometryError, WorkspaceError};
use crate::field::FieldVolume;
use crate::scanner::Scanner;
use crate::segment::Segment;

/// Number of raw values describing a straight segment: start and end point.
pub const STRAIGHT_PARAMETERS: usize = 6;
/// Number of raw values describing a curved segment: centre, two radius directions with
/// their magnitudes, and the parameter range in units of pi.
pub const CURVED_PARAMETERS: usize = 13;

/// A segment decoded from raw editor parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentInput {
    pub curve: Curve,
    pub low: f64,
    pub high: f64,
}

impl SegmentInput {
    /// Decodes a raw parameter tuple.
    ///
    /// * 6 values `(sx, sy, sz, ex, ey, ez)`: a straight wire from start to end, over `[0, 1]`.
    /// * 13 values `(cx, cy, cz, r1x, r1y, r1z, |r1|, r2x, r2y, r2z, |r2|, from, to)`: an arc
    ///   whose radius vectors are the given directions scaled to the given magnitudes,
    ///   traversed over `[from * pi, to * pi]`.
    ///
    /// Radius directions are normalised before scaling, so `|r1|` is exactly the given
    /// magnitude. The earlier editor scaled the raw direction by `|d| * magnitude`
    /// instead, so its files rebuild with the same radii only where every direction has
    /// unit length; otherwise the radii here differ from its by a factor `|d|^2`.
    pub fn parse(values: &[f64]) -> Result<SegmentInput, GeometryError> {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        match values.len() {
            STRAIGHT_PARAMETERS => {
                let start = Vector3::new(values[0], values[1], values[2]);
                let end = Vector3::new(values[3], values[4], values[5]);
                Ok(SegmentInput {
                    curve: Curve::straight(start, end - start)?,
                    low: 0.0,
                    high: 1.0,
                })
            }
            CURVED_PARAMETERS => {
                let center = Vector3::new(values[0], values[1], values[2]);
                let r1 = scaled_direction(Vector3::new(values[3], values[4], values[5]), values[6])
                    .ok_or(GeometryError::ZeroRadius(1))?;
                let r2 = scaled_direction(Vector3::new(values[7], values[8], values[9]), values[10])
                    .ok_or(GeometryError::ZeroRadius(2))?;
                Ok(SegmentInput {
                    curve: Curve::arc(center, r1, r2)?,
                    low: values[11] * PI,
                    high: values[12] * PI,
                })
            }
            n => Err(GeometryError::ParameterCount(n)),
        }
    }

    /// Encodes a segment back into the raw form [SegmentInput::parse] accepts.
    ///
    /// Straight wires are stored by their end points, so the parameter interval is
    /// normalised to `[0, 1]`.
    pub fn encode(segment: &Segment) -> Vec<f64> {
        match *segment.curve() {
            Curve::Straight { .. } => {
                let start = segment.curve().position(segment.low());
                let end = segment.curve().position(segment.high());
                vec![start.x, start.y, start.z, end.x, end.y, end.z]
            }
            Curve::Arc { center, r1, r2 } => {
                let (a, b) = (r1.normalize(), r2.normalize());
                vec![
                    center.x,
                    center.y,
                    center.z,
                    a.x,
                    a.y,
                    a.z,
                    r1.norm(),
                    b.x,
                    b.y,
                    b.z,
                    r2.norm(),
                    segment.low() / PI,
                    segment.high() / PI,
                ]
            }
        }
    }

    pub fn into_segment(self) -> Result<Segment, GeometryError> {
        Segment::new(self.curve, self.low, self.high)
    }
}

fn scaled_direction(direction: Vector3<f64>, magnitude: f64) -> Option<Vector3<f64>> {
    let norm = direction.norm();
    if norm == 0.0 || magnitude == 0.0 {
        None
    } else {
        Some(direction * (magnitude / norm))
    }
}

/// The saved state of an editing session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    /// Raw segment tuples, one list per coil.
    pub user_inputs: Vec<Vec<Vec<f64>>>,
    /// Grid bounding box `(xmin, ymin, zmin, xmax, ymax, zmax)`.
    pub scanner_bbox: Vec<f64>,
    /// Grid spacing `(dx, dy, dz)`.
    pub scanner_vol_res: Vec<f64>,
}

impl Workspace {
    pub fn from_reader<R: Read>(reader: R) -> Result<Workspace, WorkspaceError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json_str(contents: &str) -> Result<Workspace, WorkspaceError> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Workspace, WorkspaceError> {
        let file = File::open(path.as_ref())?;
        let workspace = Workspace::from_reader(BufReader::new(file))?;
        info!(
            path = %path.as_ref().display(),
            coils = workspace.user_inputs.len(),
            "loaded workspace"
        );
        Ok(workspace)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), WorkspaceError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), WorkspaceError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Captures the geometry and grid of a scanner.
    pub fn from_scanner(scanner: &Scanner) -> Workspace {
        Workspace {
            user_inputs: scanner
                .coils()
                .iter()
                .map(|coil| coil.segments().iter().map(SegmentInput::encode).collect())
                .collect(),
            scanner_bbox: scanner.volume().bbox().to_vec(),
            scanner_vol_res: scanner.volume().resolution().to_vec(),
        }
    }

    /// Decodes every raw tuple, reporting the coil and entry of the first bad one.
    pub fn segments(&self) -> Result<Vec<Vec<Segment>>, WorkspaceError> {
        self.user_inputs
            .iter()
            .enumerate()
            .map(|(coil, inputs)| {
                inputs
                    .iter()
                    .enumerate()
                    .map(|(segment, values)| {
                        SegmentInput::parse(values)
                            .and_then(SegmentInput::into_segment)
                            .map_err(|source| WorkspaceError::Segment {
                                coil,
                                segment,
                                source,
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect()
    }

    /// Rebuilds the scanner from scratch, integrating every segment.
    pub fn build_scanner(&self, config: SolverConfig) -> Result<Scanner, WorkspaceError> {
        self.build_scanner_with_fields(config, Vec::new())
    }

    /// Rebuilds the scanner, injecting previously computed segment fields.
    ///
    /// `fields[c][s]` is used for segment `s` of coil `c` and must match the grid; segments
    /// without an entry are integrated.
    pub fn build_scanner_with_fields(
        &self,
        config: SolverConfig,
        fields: Vec<Vec<FieldVolume>>,
    ) -> Result<Scanner, WorkspaceError> {
        let segments = self.segments()?;
        let mut scanner = Scanner::create(&self.scanner_bbox, &self.scanner_vol_res, config)?;
        let mut fields = fields.into_iter();
        for coil_segments in segments {
            let coil = scanner.add_coil();
            let mut coil_fields = fields.next().unwrap_or_default().into_iter();
            for mut segment in coil_segments {
                if let Some(field) = coil_fields.next() {
                    segment.set_field(field, scanner.volume())?;
                }
                scanner.push_segment(coil, segment)?;
            }
            if coil_fields.next().is_some() {
                warn!(coil, "more injected fields than segments, extras ignored");
            }
        }
        info!(coils = scanner.coils().len(), "rebuilt scanner from workspace");
        Ok(scanner)
    }
}
