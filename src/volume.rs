//! The sampling volume: an axis-aligned box discretised into a regular grid.
//!
//! Every field computation is evaluated on the grid of one sampling volume. Each volume
//! carries a generation number, unique for the lifetime of the process, which cached
//! field volumes are stamped with so that a cache computed for another grid is never
//! mistaken for a valid one.

use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::Vector3;

use crate::error::VolumeError;
use crate::axis::Axis;

/// Added to the upper bound when counting grid points, so the upper bound is included
/// despite floating-point rounding.
pub const GRID_ENDPOINT_TOLERANCE: f64 = 1e-10;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Converts per-axis point counts into a grid shape, provided a field volume over the
/// whole grid (three `f64` per point) is addressable.
fn grid_shape(counts: [f64; 3]) -> Option<[usize; 3]> {
    let mut shape = [0usize; 3];
    for (n, count) in shape.iter_mut().zip(counts.iter()) {
        if *count >= usize::MAX as f64 {
            return None;
        }
        *n = *count as usize;
    }
    let bytes = shape
        .iter()
        .try_fold(3 * std::mem::size_of::<f64>(), |acc, n| acc.checked_mul(*n))?;
    if bytes > isize::MAX as usize {
        return None;
    }
    Some(shape)
}

/// A bounding box with per-axis resolution.
///
/// The bounding box is given as the lower corner followed by the upper corner,
/// `(xmin, ymin, zmin, xmax, ymax, zmax)`. Grid coordinates along x are
/// `xmin + i * dx` for every `i` with `xmin + i * dx <= xmax` (within
/// [GRID_ENDPOINT_TOLERANCE]), and likewise for y and z.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingVolume {
    lower: Vector3<f64>,
    upper: Vector3<f64>,
    resolution: Vector3<f64>,
    shape: [usize; 3],
    generation: u64,
}

impl SamplingVolume {
    /// Creates a sampling volume from untyped editor input.
    ///
    /// # Arguments
    ///
    /// `bbox`: 6 values, lower corner then upper corner
    ///
    /// `resolution`: 3 values, grid spacing along x, y, z
    pub fn create(bbox: &[f64], resolution: &[f64]) -> Result<SamplingVolume, VolumeError> {
        if bbox.len() != 6 {
            return Err(VolumeError::BoundingBoxArity(bbox.len()));
        }
        if resolution.len() != 3 {
            return Err(VolumeError::ResolutionArity(resolution.len()));
        }
        SamplingVolume::new(
            [bbox[0], bbox[1], bbox[2], bbox[3], bbox[4], bbox[5]],
            [resolution[0], resolution[1], resolution[2]],
        )
    }

    pub fn new(bbox: [f64; 6], resolution: [f64; 3]) -> Result<SamplingVolume, VolumeError> {
        if bbox.iter().chain(resolution.iter()).any(|v| !v.is_finite()) {
            return Err(VolumeError::NonFinite);
        }
        let lower = Vector3::new(bbox[0], bbox[1], bbox[2]);
        let upper = Vector3::new(bbox[3], bbox[4], bbox[5]);
        let resolution = Vector3::from(resolution);
        let mut counts = [0.0; 3];
        for axis in Axis::ALL.iter() {
            let i = axis.index();
            if resolution[i] <= 0.0 {
                return Err(VolumeError::NonPositiveResolution {
                    axis: axis.name(),
                    value: resolution[i],
                });
            }
            if lower[i] > upper[i] {
                return Err(VolumeError::InvertedBounds {
                    axis: axis.name(),
                    min: lower[i],
                    max: upper[i],
                });
            }
            counts[i] = ((upper[i] + GRID_ENDPOINT_TOLERANCE - lower[i]) / resolution[i]).ceil();
        }
        let shape = grid_shape(counts).ok_or(VolumeError::TooLarge { counts })?;
        Ok(SamplingVolume {
            lower,
            upper,
            resolution,
            shape,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// The bounding box in the order it was given, lower corner first.
    pub fn bbox(&self) -> [f64; 6] {
        [
            self.lower.x,
            self.lower.y,
            self.lower.z,
            self.upper.x,
            self.upper.y,
            self.upper.z,
        ]
    }

    pub fn resolution(&self) -> [f64; 3] {
        [self.resolution.x, self.resolution.y, self.resolution.z]
    }

    /// Number of grid points along x, y and z.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Total number of grid points.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Coordinate of grid index `i` along `axis`.
    #[inline]
    pub fn coordinate(&self, axis: Axis, i: usize) -> f64 {
        let a = axis.index();
        self.lower[a] + i as f64 * self.resolution[a]
    }

    /// All grid coordinates along `axis`.
    pub fn coordinates(&self, axis: Axis) -> Vec<f64> {
        (0..self.shape[axis.index()])
            .map(|i| self.coordinate(axis, i))
            .collect()
    }

    /// Position of grid point `(i, j, k)`.
    #[inline]
    pub fn point(&self, i: usize, j: usize, k: usize) -> Vector3<f64> {
        Vector3::new(
            self.coordinate(Axis::X, i),
            self.coordinate(Axis::Y, j),
            self.coordinate(Axis::Z, k),
        )
    }

    /// Every grid point, ordered with x slowest and z fastest.
    pub fn points(&self) -> Vec<Vector3<f64>> {
        let [nx, ny, nz] = self.shape;
        let mut points = Vec::with_capacity(self.len());
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    points.push(self.point(i, j, k));
                }
            }
        }
        points
    }

    /// Index of the grid coordinate along `axis` closest to `location`.
    ///
    /// Ties resolve to the lower index.
    pub fn nearest_index(&self, axis: Axis, location: f64) -> usize {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for i in 0..self.shape[axis.index()] {
            let distance = (self.coordinate(axis, i) - location).abs();
            if distance < best_distance {
                best = i;
                best_distance = distance;
            }
        }
        best
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_malformed_input_is_rejected() {
        assert_eq!(
            SamplingVolume::create(&[0.0; 5], &[1.0; 3]),
            Err(VolumeError::BoundingBoxArity(5))
        );
        assert_eq!(
            SamplingVolume::create(&[0.0; 6], &[1.0; 2]),
            Err(VolumeError::ResolutionArity(2))
        );
        assert_eq!(
            SamplingVolume::create(&[0.0, 0.0, 0.0, 1.0, 1.0, f64::NAN], &[1.0; 3]),
            Err(VolumeError::NonFinite)
        );
        assert!(matches!(
            SamplingVolume::create(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0], &[1.0, 0.0, 1.0]),
            Err(VolumeError::NonPositiveResolution { axis: 'y', .. })
        ));
        assert!(matches!(
            SamplingVolume::create(&[2.0, 0.0, 0.0, 1.0, 1.0, 1.0], &[1.0; 3]),
            Err(VolumeError::InvertedBounds { axis: 'x', .. })
        ));
    }

    #[test]
    fn test_oversized_grid_is_rejected() {
        let huge = SamplingVolume::create(&[0.0, 0.0, 0.0, 1e7, 1e7, 1e7], &[1.0; 3]);
        assert!(matches!(huge, Err(VolumeError::TooLarge { .. })));
        let long = SamplingVolume::new([0.0, 0.0, 0.0, 1e30, 0.0, 0.0], [1.0; 3]);
        assert!(matches!(long, Err(VolumeError::TooLarge { .. })));
        // large but addressable grids are still accepted
        let volume = SamplingVolume::new([0.0, 0.0, 0.0, 999.0, 999.0, 99.0], [1.0; 3]).unwrap();
        assert_eq!(volume.len(), 1000 * 1000 * 100);
    }

    #[test]
    fn test_grid_includes_upper_bound() {
        let volume = SamplingVolume::new([1.0, -5.0, -1.0, 6.0, 5.0, 1.0], [0.5; 3]).unwrap();
        assert_eq!(volume.shape(), [11, 21, 5]);
        assert_eq!(volume.len(), 11 * 21 * 5);
        assert_approx_eq!(volume.coordinate(Axis::X, 10), 6.0);
        assert_approx_eq!(volume.coordinate(Axis::Y, 20), 5.0);
        assert_approx_eq!(volume.coordinate(Axis::Z, 4), 1.0);
    }

    #[test]
    fn test_inexact_spacing() {
        // 0, 0.3, 0.6, 0.9 fit below 1.0; 1.2 does not.
        let volume = SamplingVolume::new([0.0, 0.0, 0.0, 1.0, 0.0, 0.1], [0.3, 1.0, 0.1]).unwrap();
        assert_eq!(volume.shape(), [4, 1, 2]);
    }

    #[test]
    fn test_points_are_x_major() {
        let volume = SamplingVolume::new([0.0, 0.0, 0.0, 1.0, 2.0, 3.0], [1.0; 3]).unwrap();
        let points = volume.points();
        assert_eq!(points.len(), 2 * 3 * 4);
        assert_eq!(points[1], Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(points[4], Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(points[12], Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(points[23], Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_nearest_index() {
        let volume = SamplingVolume::new([-1.0, 0.0, 0.0, 1.0, 0.0, 0.0], [0.5, 1.0, 1.0]).unwrap();
        assert_eq!(volume.nearest_index(Axis::X, 0.1), 2);
        assert_eq!(volume.nearest_index(Axis::X, -7.0), 0);
        assert_eq!(volume.nearest_index(Axis::X, 7.0), 4);
        assert_eq!(volume.nearest_index(Axis::X, 0.25), 2);
        assert_eq!(volume.nearest_index(Axis::X, 0.26), 3);
    }

    #[test]
    fn test_every_volume_has_its_own_generation() {
        let a = SamplingVolume::new([0.0; 6], [1.0; 3]).unwrap();
        let b = SamplingVolume::new([0.0; 6], [1.0; 3]).unwrap();
        assert_ne!(a.generation(), b.generation());
        assert_eq!(a.clone().generation(), a.generation());
        assert_eq!(a.shape(), [1, 1, 1]);
    }
}
