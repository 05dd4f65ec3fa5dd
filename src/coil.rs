//! Coils: ordered collections of segments and their composite field.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use crate::config::SolverConfig;
use crate::curve::Curve;
use crate::error::FieldError;
use crate::field::FieldVolume;
use crate::segment::Segment;
use crate::volume::SamplingVolume;

static NEXT_COIL_ID: AtomicU64 = AtomicU64::new(0);

/// Identifies a coil. Segments refer back to their coil through this id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CoilId(u64);

impl CoilId {
    fn next() -> CoilId {
        CoilId(NEXT_COIL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One wire loop.
///
/// The coil does not own the sampling volume; every operation that needs field values
/// takes the volume explicitly. Member segments and the composite are cached per volume
/// generation, so handing in a different volume is detected rather than silently mixed.
#[derive(Debug, Clone)]
pub struct Coil {
    id: CoilId,
    segments: Vec<Segment>,
    composite: Option<(u64, FieldVolume)>,
}

impl Default for Coil {
    fn default() -> Self {
        Coil::new()
    }
}

impl Coil {
    pub fn new() -> Coil {
        Coil {
            id: CoilId::next(),
            segments: Vec::new(),
            composite: None,
        }
    }

    pub fn id(&self) -> CoilId {
        self.id
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Result<&Segment, FieldError> {
        self.segments.get(index).ok_or(FieldError::SegmentIndex {
            index,
            len: self.segments.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Appends a segment, computing its field on `volume` unless it already carries one.
    pub fn add_segment(
        &mut self,
        mut segment: Segment,
        volume: &SamplingVolume,
        config: &SolverConfig,
    ) -> Result<&Segment, FieldError> {
        segment.set_coil(Some(self.id));
        segment.ensure_field(volume, config)?;
        self.composite = None;
        self.segments.push(segment);
        debug!(coil = self.id.0, segments = self.segments.len(), "added segment");
        Ok(&self.segments[self.segments.len() - 1])
    }

    /// Builds a segment from a curve and parameter bounds and appends it.
    pub fn add_curve(
        &mut self,
        curve: Curve,
        low: f64,
        high: f64,
        volume: &SamplingVolume,
        config: &SolverConfig,
    ) -> Result<&Segment, FieldError> {
        let segment = Segment::new(curve, low, high)?;
        self.add_segment(segment, volume, config)
    }

    /// Removes and returns the segment at `index`. The composite must be rebuilt afterwards.
    pub fn remove_segment(&mut self, index: usize) -> Result<Segment, FieldError> {
        if index >= self.segments.len() {
            return Err(FieldError::SegmentIndex {
                index,
                len: self.segments.len(),
            });
        }
        let mut segment = self.segments.remove(index);
        segment.set_coil(None);
        self.composite = None;
        debug!(coil = self.id.0, index, "removed segment");
        Ok(segment)
    }

    /// Replaces the segment at `index` with a new geometry.
    ///
    /// The replacement is validated and integrated before the old segment is touched, so
    /// on error the coil is unchanged.
    pub fn edit_segment(
        &mut self,
        index: usize,
        curve: Curve,
        low: f64,
        high: f64,
        volume: &SamplingVolume,
        config: &SolverConfig,
    ) -> Result<&Segment, FieldError> {
        if index >= self.segments.len() {
            return Err(FieldError::SegmentIndex {
                index,
                len: self.segments.len(),
            });
        }
        let mut segment = Segment::new(curve, low, high)?;
        segment.set_coil(Some(self.id));
        segment.compute_field(volume, config)?;
        self.segments[index] = segment;
        self.composite = None;
        debug!(coil = self.id.0, index, "edited segment");
        Ok(&self.segments[index])
    }

    /// Whether every segment and the composite are up to date for `volume`.
    pub fn is_valid_for(&self, volume: &SamplingVolume) -> bool {
        matches!(&self.composite, Some((generation, _)) if *generation == volume.generation())
            && self.segments.iter().all(|s| s.is_valid_for(volume))
    }

    /// Sum of all segment fields on `volume`.
    ///
    /// Fails with [FieldError::StaleSegment] on the first segment whose cache does not
    /// belong to `volume`; nothing is recomputed here.
    pub fn sum_segments(&self, volume: &SamplingVolume) -> Result<FieldVolume, FieldError> {
        let mut total = FieldVolume::zeros(volume.shape());
        for (index, segment) in self.segments.iter().enumerate() {
            let field = segment.field(volume).ok_or(FieldError::StaleSegment {
                segment: index,
                generation: volume.generation(),
            })?;
            total += field;
        }
        Ok(total)
    }

    /// The composite field on `volume`, summed once and cached until the next edit.
    pub fn composite_field(&mut self, volume: &SamplingVolume) -> Result<&FieldVolume, FieldError> {
        let composite = match self.composite.take() {
            Some((generation, field)) if generation == volume.generation() => (generation, field),
            _ => (volume.generation(), self.sum_segments(volume)?),
        };
        Ok(&self.composite.insert(composite).1)
    }

    /// Brings every stale segment up to date on `volume` and rebuilds the composite.
    pub fn recompute(
        &mut self,
        volume: &SamplingVolume,
        config: &SolverConfig,
    ) -> Result<&FieldVolume, FieldError> {
        let stale = self.segments.iter().filter(|s| !s.is_valid_for(volume)).count();
        for segment in self.segments.iter_mut() {
            segment.ensure_field(volume, config)?;
        }
        self.composite = None;
        info!(coil = self.id.0, segments = self.segments.len(), stale, "recomputed coil");
        self.composite_field(volume)
    }

    /// Drops every cached segment field and the composite.
    pub fn invalidate(&mut self) {
        for segment in self.segments.iter_mut() {
            segment.invalidate();
        }
        self.composite = None;
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use nalgebra::Vector3;
    use std::f64::consts::PI;

    fn test_volume() -> SamplingVolume {
        SamplingVolume::new([-1.0, -1.0, -1.0, 1.0, 1.0, 1.0], [0.5, 1.0, 1.0]).unwrap()
    }

    fn two_segment_coil(volume: &SamplingVolume) -> Coil {
        let config = SolverConfig::default();
        let mut coil = Coil::new();
        let arc = Curve::arc(
            Vector3::new(0.0, 0.0, 1.5),
            Vector3::new(0.8, 0.0, 0.0),
            Vector3::new(0.0, 0.8, 0.0),
        )
        .unwrap();
        coil.add_curve(arc, 0.0, PI, volume, &config).unwrap();
        let line = Curve::straight(Vector3::new(-0.8, 0.0, 1.5), Vector3::new(1.6, 0.0, 0.0)).unwrap();
        coil.add_curve(line, 0.0, 1.0, volume, &config).unwrap();
        coil
    }

    #[test]
    fn test_segments_refer_back_to_coil() {
        let volume = test_volume();
        let coil = two_segment_coil(&volume);
        assert_eq!(coil.len(), 2);
        assert!(coil.segments().iter().all(|s| s.coil() == Some(coil.id())));
        assert_ne!(Coil::new().id(), coil.id());
    }

    #[test]
    fn test_composite_is_sum_of_segments() {
        let volume = test_volume();
        let mut coil = two_segment_coil(&volume);
        let mut expected = coil.segments()[0].field(&volume).unwrap().clone();
        expected += coil.segments()[1].field(&volume).unwrap();
        assert_eq!(coil.composite_field(&volume).unwrap(), &expected);
    }

    #[test]
    fn test_composite_is_idempotent() {
        let volume = test_volume();
        let mut coil = two_segment_coil(&volume);
        let first = coil.composite_field(&volume).unwrap().clone();
        let second = coil.composite_field(&volume).unwrap().clone();
        assert_eq!(first, second);
        assert!(coil.is_valid_for(&volume));
    }

    #[test]
    fn test_empty_coil_has_zero_field() {
        let volume = test_volume();
        let mut coil = Coil::new();
        assert_eq!(coil.composite_field(&volume).unwrap(), &FieldVolume::zeros(volume.shape()));
    }

    #[test]
    fn test_new_volume_makes_composite_fail_loudly() {
        let volume = test_volume();
        let mut coil = two_segment_coil(&volume);
        coil.composite_field(&volume).unwrap();

        let moved = SamplingVolume::new([0.0, 0.0, 0.0, 1.0, 1.0, 1.0], [0.5; 3]).unwrap();
        assert_eq!(
            coil.composite_field(&moved),
            Err(FieldError::StaleSegment {
                segment: 0,
                generation: moved.generation()
            })
        );

        let config = SolverConfig::default();
        let recomputed = coil.recompute(&moved, &config).unwrap();
        assert_eq!(recomputed.shape(), moved.shape());
        assert!(coil.is_valid_for(&moved));
        assert!(!coil.is_valid_for(&volume));
    }

    #[test]
    fn test_remove_segment_updates_composite() {
        let volume = test_volume();
        let mut coil = two_segment_coil(&volume);
        coil.composite_field(&volume).unwrap();

        let removed = coil.remove_segment(1).unwrap();
        assert_eq!(removed.coil(), None);
        let expected = coil.segments()[0].field(&volume).unwrap().clone();
        assert_eq!(coil.composite_field(&volume).unwrap(), &expected);

        assert_eq!(
            coil.remove_segment(5).unwrap_err(),
            FieldError::SegmentIndex { index: 5, len: 1 }
        );
    }

    #[test]
    fn test_failed_edit_leaves_coil_untouched() {
        let volume = test_volume();
        let config = SolverConfig::default();
        let mut coil = two_segment_coil(&volume);
        let before = coil.composite_field(&volume).unwrap().clone();

        let result = coil.edit_segment(
            0,
            Curve::Straight {
                point: Vector3::zeros(),
                direction: Vector3::zeros(),
            },
            0.0,
            1.0,
            &volume,
            &config,
        );
        assert!(matches!(result, Err(FieldError::Geometry(_))));
        assert_eq!(coil.composite_field(&volume).unwrap(), &before);

        // Reversing the straight piece changes its contribution's sign.
        let line = *coil.segments()[1].curve();
        coil.edit_segment(1, line, 1.0, 0.0, &volume, &config).unwrap();
        let mut expected = coil.segments()[0].field(&volume).unwrap().clone();
        expected += coil.segments()[1].field(&volume).unwrap();
        assert_eq!(coil.composite_field(&volume).unwrap(), &expected);
        assert_ne!(&expected, &before);
    }

    #[test]
    fn test_injected_field_is_not_recomputed() {
        let volume = test_volume();
        let config = SolverConfig::default();
        let line = Curve::straight(Vector3::new(5.0, 5.0, 5.0), Vector3::x()).unwrap();
        let marker = FieldVolume::zeros(volume.shape());
        let segment = Segment::with_field(line, 0.0, 1.0, marker.clone(), &volume).unwrap();

        let mut coil = Coil::new();
        coil.add_segment(segment, &volume, &config).unwrap();
        assert_eq!(coil.composite_field(&volume).unwrap(), &marker);
    }
}
