//! A curve restricted to a parameter interval, with its cached field contribution.

use nalgebra::Vector3;
use tracing::debug;

use crate::biot_savart::integrate_segment;
use crate::coil::CoilId;
use crate::config::SolverConfig;
use crate::curve::Curve;
use crate::error::{FieldError, GeometryError};
use crate::field::FieldVolume;
use crate::volume::SamplingVolume;

/// A field volume together with the generation of the sampling volume it was computed on.
#[derive(Debug, Clone, PartialEq)]
struct CachedField {
    generation: u64,
    field: FieldVolume,
}

/// A piece of wire: `curve` traversed from `low` to `high`.
///
/// The interval is signed. `low > high` traverses the curve backwards, which negates
/// its field contribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    curve: Curve,
    low: f64,
    high: f64,
    cache: Option<CachedField>,
    coil: Option<CoilId>,
}

impl Segment {
    /// Creates a segment without a computed field.
    ///
    /// The curve is re-validated, so a hand-built degenerate [Curve] is rejected and an
    /// arc is brought into its canonical orientation.
    pub fn new(curve: Curve, low: f64, high: f64) -> Result<Segment, GeometryError> {
        if !low.is_finite() || !high.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        let curve = match curve {
            Curve::Straight { point, direction } => Curve::straight(point, direction)?,
            Curve::Arc { center, r1, r2 } => Curve::arc(center, r1, r2)?,
        };
        Ok(Segment {
            curve,
            low,
            high,
            cache: None,
            coil: None,
        })
    }

    /// Creates a segment with a previously computed field, e.g. one restored from disk.
    pub fn with_field(
        curve: Curve,
        low: f64,
        high: f64,
        field: FieldVolume,
        volume: &SamplingVolume,
    ) -> Result<Segment, FieldError> {
        let mut segment = Segment::new(curve, low, high)?;
        segment.set_field(field, volume)?;
        Ok(segment)
    }

    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    /// The coil this segment belongs to, if any.
    pub fn coil(&self) -> Option<CoilId> {
        self.coil
    }

    pub(crate) fn set_coil(&mut self, coil: Option<CoilId>) {
        self.coil = coil;
    }

    /// The same wire traversed in the opposite direction, without a cached field.
    pub fn reversed(&self) -> Segment {
        Segment {
            curve: self.curve,
            low: self.high,
            high: self.low,
            cache: None,
            coil: None,
        }
    }

    /// `n` evenly spaced points along the segment, endpoints included.
    pub fn coords(&self, n: usize) -> Vec<Vector3<f64>> {
        match n {
            0 => Vec::new(),
            1 => vec![self.curve.position(self.low)],
            _ => (0..n)
                .map(|i| {
                    let t = self.low + (self.high - self.low) * i as f64 / (n - 1) as f64;
                    self.curve.position(t)
                })
                .collect(),
        }
    }

    /// Whether the cached field was computed on `volume`.
    pub fn is_valid_for(&self, volume: &SamplingVolume) -> bool {
        matches!(&self.cache, Some(c) if c.generation == volume.generation())
    }

    /// The cached field, if it belongs to `volume`.
    pub fn field(&self, volume: &SamplingVolume) -> Option<&FieldVolume> {
        match &self.cache {
            Some(c) if c.generation == volume.generation() => Some(&c.field),
            _ => None,
        }
    }

    /// Stores an externally supplied field computed on `volume`.
    pub fn set_field(&mut self, field: FieldVolume, volume: &SamplingVolume) -> Result<(), FieldError> {
        let expected = volume.shape();
        let found = field.shape();
        if expected != found {
            return Err(FieldError::ShapeMismatch {
                expected: [expected[0], expected[1], expected[2], 3],
                found: [found[0], found[1], found[2], 3],
            });
        }
        self.cache = Some(CachedField {
            generation: volume.generation(),
            field,
        });
        Ok(())
    }

    /// Drops the cached field.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Integrates the segment's field over `volume` and caches it, replacing any previous cache.
    pub fn compute_field(
        &mut self,
        volume: &SamplingVolume,
        config: &SolverConfig,
    ) -> Result<&FieldVolume, FieldError> {
        self.invalidate();
        self.ensure_field(volume, config)
    }

    /// Returns the cached field, computing it first if the cache does not match `volume`.
    pub fn ensure_field(
        &mut self,
        volume: &SamplingVolume,
        config: &SolverConfig,
    ) -> Result<&FieldVolume, FieldError> {
        let cache = match self.cache.take() {
            Some(cache) if cache.generation == volume.generation() => cache,
            _ => {
                debug!(low = self.low, high = self.high, "computing segment field");
                CachedField {
                    generation: volume.generation(),
                    field: integrate_segment(&self.curve, self.low, self.high, volume, config)?,
                }
            }
        };
        Ok(&self.cache.insert(cache).field)
    }
}
