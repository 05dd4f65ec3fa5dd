//! The scanner: a sampling volume together with the coils evaluated on it.

use tracing::info;

use crate::coil::{Coil, CoilId};
use crate::config::SolverConfig;
use crate::curve::Curve;
use crate::error::{FieldError, VolumeError};
use crate::field::FieldVolume;
use crate::segment::Segment;
use crate::volume::SamplingVolume;

/// Owns the sampling volume and every coil.
///
/// Ownership runs strictly scanner ⊃ coil ⊃ segment. Structural edits go through the
/// scanner so that each coil is always handed the volume it is cached against.
#[derive(Debug, Clone)]
pub struct Scanner {
    volume: SamplingVolume,
    coils: Vec<Coil>,
    config: SolverConfig,
}

impl Scanner {
    pub fn new(volume: SamplingVolume, config: SolverConfig) -> Scanner {
        Scanner {
            volume,
            coils: Vec::new(),
            config,
        }
    }

    /// Creates a scanner from a raw bounding box (6 values) and resolution (3 values).
    pub fn create(bbox: &[f64], resolution: &[f64], config: SolverConfig) -> Result<Scanner, VolumeError> {
        Ok(Scanner::new(SamplingVolume::create(bbox, resolution)?, config))
    }

    pub fn volume(&self) -> &SamplingVolume {
        &self.volume
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Replaces the solver configuration. Existing caches are kept.
    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config;
    }

    /// Replaces the sampling volume and drops every cached field.
    ///
    /// Nothing is recomputed; call [Scanner::recompute_all] when the fields are needed.
    pub fn set_volume(&mut self, volume: SamplingVolume) {
        info!(
            bbox = ?volume.bbox(),
            resolution = ?volume.resolution(),
            coils = self.coils.len(),
            "sampling volume changed, invalidating all fields"
        );
        self.volume = volume;
        for coil in self.coils.iter_mut() {
            coil.invalidate();
        }
    }

    pub fn coils(&self) -> &[Coil] {
        &self.coils
    }

    pub fn coil(&self, index: usize) -> Result<&Coil, FieldError> {
        self.coils.get(index).ok_or(FieldError::CoilIndex {
            index,
            len: self.coils.len(),
        })
    }

    fn coil_entry(&mut self, index: usize) -> Result<&mut Coil, FieldError> {
        let len = self.coils.len();
        self.coils
            .get_mut(index)
            .ok_or(FieldError::CoilIndex { index, len })
    }

    /// Looks up the coil a segment refers back to.
    pub fn coil_by_id(&self, id: CoilId) -> Option<&Coil> {
        self.coils.iter().find(|c| c.id() == id)
    }

    /// Adds an empty coil and returns its index.
    pub fn add_coil(&mut self) -> usize {
        self.coils.push(Coil::new());
        self.coils.len() - 1
    }

    pub fn remove_coil(&mut self, index: usize) -> Result<Coil, FieldError> {
        self.coil_entry(index)?;
        Ok(self.coils.remove(index))
    }

    /// Adds the wire `curve` over `[low, high]` to coil `coil` and computes its field.
    pub fn add_segment(
        &mut self,
        coil: usize,
        curve: Curve,
        low: f64,
        high: f64,
    ) -> Result<&Segment, FieldError> {
        let Scanner {
            volume,
            coils,
            config,
        } = self;
        let len = coils.len();
        coils
            .get_mut(coil)
            .ok_or(FieldError::CoilIndex { index: coil, len })?
            .add_curve(curve, low, high, volume, config)
    }

    /// Adds a ready-made segment, keeping its field if it was computed on this volume.
    pub fn push_segment(&mut self, coil: usize, segment: Segment) -> Result<&Segment, FieldError> {
        let Scanner {
            volume,
            coils,
            config,
        } = self;
        let len = coils.len();
        coils
            .get_mut(coil)
            .ok_or(FieldError::CoilIndex { index: coil, len })?
            .add_segment(segment, volume, config)
    }

    pub fn remove_segment(&mut self, coil: usize, index: usize) -> Result<Segment, FieldError> {
        self.coil_entry(coil)?.remove_segment(index)
    }

    pub fn edit_segment(
        &mut self,
        coil: usize,
        index: usize,
        curve: Curve,
        low: f64,
        high: f64,
    ) -> Result<&Segment, FieldError> {
        let Scanner {
            volume,
            coils,
            config,
        } = self;
        let len = coils.len();
        coils
            .get_mut(coil)
            .ok_or(FieldError::CoilIndex { index: coil, len })?
            .edit_segment(index, curve, low, high, volume, config)
    }

    /// The composite field of coil `coil`. Fails if any of its segments is stale.
    pub fn composite_field(&mut self, coil: usize) -> Result<&FieldVolume, FieldError> {
        let Scanner { volume, coils, .. } = self;
        let len = coils.len();
        coils
            .get_mut(coil)
            .ok_or(FieldError::CoilIndex { index: coil, len })?
            .composite_field(volume)
    }

    /// Brings every coil up to date with the current volume.
    pub fn recompute_all(&mut self) -> Result<(), FieldError> {
        let Scanner {
            volume,
            coils,
            config,
        } = self;
        for coil in coils.iter_mut() {
            coil.recompute(volume, config)?;
        }
        Ok(())
    }
}
