//! Planar cross-sections of field volumes and derived quantities.
//!
//! Slices are taken without interpolation: a physical location selects the nearest
//! grid plane, a slice number selects the plane directly. The complex sensitivity map
//! of a field is `Bx - i By`, the transverse combination an MRI receive coil responds
//! to; magnitude and phase maps are its modulus and argument.

use ndarray::{Array, Array2, Array3, ArrayView, ArrayView3, Dimension};
use num_complex::Complex64;

pub use crate::axis::Axis;
use crate::error::FieldError;
use crate::field::FieldVolume;
use crate::volume::SamplingVolume;

/// Where to cut a volume along the slicing axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SliceLocation {
    /// A physical coordinate; the nearest grid plane is used.
    Coordinate(f64),
    /// A 1-based plane number, at most the number of grid points along the axis.
    Number(usize),
}

/// Resolves a slice location to a 0-based grid index along `axis`.
pub fn slice_index(
    volume: &SamplingVolume,
    axis: Axis,
    location: SliceLocation,
) -> Result<usize, FieldError> {
    match location {
        SliceLocation::Coordinate(c) if !c.is_finite() => Err(FieldError::SliceCoordinate(c)),
        SliceLocation::Coordinate(c) => Ok(volume.nearest_index(axis, c)),
        SliceLocation::Number(number) => {
            let extent = volume.shape()[axis.index()];
            if number == 0 || number > extent {
                return Err(FieldError::SliceNumber { number, extent });
            }
            Ok(number - 1)
        }
    }
}

/// Fails unless an array of shape `found` lies on a grid of shape `expected`.
pub(crate) fn check_grid(expected: Vec<usize>, found: Vec<usize>) -> Result<(), FieldError> {
    if expected == found {
        Ok(())
    } else {
        Err(FieldError::GridMismatch { expected, found })
    }
}

/// Cuts a scalar volume, returning the plane spanned by the other two axes.
///
/// # Arguments
///
/// `data`: scalar volume on the grid of `volume`
///
/// `volume`: sampling volume the data was computed on
///
/// `axis`: axis normal to the slice
///
/// `location`: where along `axis` to cut
pub fn slice_scalar<T: Clone>(
    data: ArrayView3<T>,
    volume: &SamplingVolume,
    axis: Axis,
    location: SliceLocation,
) -> Result<Array2<T>, FieldError> {
    check_grid(volume.shape().to_vec(), data.shape().to_vec())?;
    let index = slice_index(volume, axis, location)?;
    Ok(data.index_axis(ndarray::Axis(axis.index()), index).to_owned())
}

/// Cuts a field volume, returning an `(n1, n2, 3)` array of field vectors on the plane.
pub fn slice_field(
    field: &FieldVolume,
    volume: &SamplingVolume,
    axis: Axis,
    location: SliceLocation,
) -> Result<Array3<f64>, FieldError> {
    check_grid(volume.shape().to_vec(), field.shape().to_vec())?;
    let index = slice_index(volume, axis, location)?;
    Ok(field
        .data()
        .index_axis(ndarray::Axis(axis.index()), index)
        .to_owned())
}

/// Grid coordinates labelling the rows and columns of a slice normal to `axis`.
pub fn plane_coordinates(volume: &SamplingVolume, axis: Axis) -> (Vec<f64>, Vec<f64>) {
    let (rows, cols) = axis.others();
    (volume.coordinates(rows), volume.coordinates(cols))
}

/// Forms the complex sensitivity map `Bx - i By` of a field volume.
pub fn complex_combine(field: &FieldVolume) -> Array3<Complex64> {
    ndarray::Zip::from(field.component(0))
        .and(field.component(1))
        .map_collect(|&bx, &by| Complex64::new(bx, -by))
}

pub fn magnitude<D: Dimension>(data: ArrayView<Complex64, D>) -> Array<f64, D> {
    data.mapv(|c| c.norm())
}

/// Argument of each complex value, in `(-pi, pi]`.
pub fn phase<D: Dimension>(data: ArrayView<Complex64, D>) -> Array<f64, D> {
    data.mapv(|c| c.arg())
}

/// Clamps values into `[-limit, limit]` for display. NaN passes through unchanged.
///
/// This is a presentation step and is never applied by the solver itself.
pub fn clip_for_display<D: Dimension>(data: ArrayView<f64, D>, limit: f64) -> Array<f64, D> {
    data.mapv(|v| if v.is_nan() { v } else { v.max(-limit).min(limit) })
}

/// Maps data values onto `[0, 1]` for colouring.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColorNorm {
    /// Plain min-max scaling.
    Linear { vmin: f64, vmax: f64 },
    /// Piecewise-linear scaling with zero mapped to the middle of the colour range.
    TwoSlope { vmin: f64, vmax: f64 },
}

impl ColorNorm {
    /// Chooses a normalisation for the given values.
    ///
    /// Data whose minimum is exactly zero is treated as non-negative and scaled
    /// min-max; anything else is centred at zero. Non-finite values are ignored.
    pub fn for_data<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> ColorNorm {
        let (vmin, vmax) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if !vmin.is_finite() {
            return ColorNorm::Linear {
                vmin: 0.0,
                vmax: 0.0,
            };
        }
        if vmin == 0.0 {
            ColorNorm::Linear { vmin, vmax }
        } else {
            ColorNorm::TwoSlope {
                vmin: vmin.min(0.0),
                vmax: vmax.max(0.0),
            }
        }
    }

    pub fn normalize(&self, value: f64) -> f64 {
        match *self {
            ColorNorm::Linear { vmin, vmax } => {
                if vmax > vmin {
                    ((value - vmin) / (vmax - vmin)).max(0.0).min(1.0)
                } else {
                    0.0
                }
            }
            ColorNorm::TwoSlope { vmin, vmax } => {
                if value < 0.0 {
                    if vmin < 0.0 {
                        (0.5 - 0.5 * value / vmin).max(0.0)
                    } else {
                        0.5
                    }
                } else if vmax > 0.0 {
                    (0.5 + 0.5 * value / vmax).min(1.0)
                } else {
                    0.5
                }
            }
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use ndarray::{Array3, Array4};
    use std::f64::consts::PI;

    fn test_volume() -> SamplingVolume {
        SamplingVolume::new([0.0, 0.0, -1.0, 1.0, 2.0, 1.0], [0.5; 3]).unwrap()
    }

    fn indexed_field(volume: &SamplingVolume) -> FieldVolume {
        let [nx, ny, nz] = volume.shape();
        let data = Array4::from_shape_fn((nx, ny, nz, 3), |(i, j, k, c)| {
            (1000 * c + 100 * i + 10 * j + k) as f64
        });
        FieldVolume::from_array(data).unwrap()
    }

    #[test]
    fn test_slice_matches_nearest_plane() {
        let volume = test_volume();
        let field = indexed_field(&volume);
        let bz = field.component(2);
        // z grid is -1, -0.5, 0, 0.5, 1; 0.2 is nearest to 0 at index 2.
        let slice = slice_scalar(bz, &volume, Axis::Z, SliceLocation::Coordinate(0.2)).unwrap();
        assert_eq!(slice.dim(), (3, 5));
        for i in 0..3 {
            for j in 0..5 {
                assert_eq!(slice[[i, j]], bz[[i, j, 2]]);
            }
        }
        let vectors = slice_field(&field, &volume, Axis::Z, SliceLocation::Coordinate(0.2)).unwrap();
        assert_eq!(vectors.dim(), (3, 5, 3));
        assert_eq!(vectors[[1, 4, 0]], field.at(1, 4, 2).x);
    }

    #[test]
    fn test_slice_numbers_are_one_based() {
        let volume = test_volume();
        let field = indexed_field(&volume);
        let bx = field.component(0);
        let first = slice_scalar(bx, &volume, Axis::X, SliceLocation::Number(1)).unwrap();
        assert_eq!(first.dim(), (5, 5));
        assert_eq!(first[[2, 3]], bx[[0, 2, 3]]);
        let last = slice_scalar(bx, &volume, Axis::X, SliceLocation::Number(3)).unwrap();
        assert_eq!(last[[0, 0]], bx[[2, 0, 0]]);
        assert_eq!(
            slice_scalar(bx, &volume, Axis::X, SliceLocation::Number(4)),
            Err(FieldError::SliceNumber {
                number: 4,
                extent: 3
            })
        );
        assert!(slice_index(&volume, Axis::Y, SliceLocation::Number(0)).is_err());
    }

    #[test]
    fn test_slicing_data_from_another_grid_fails() {
        let volume = test_volume();
        let coarse = SamplingVolume::new([0.0, 0.0, -1.0, 1.0, 2.0, 1.0], [1.0; 3]).unwrap();
        let field = indexed_field(&coarse);
        assert_eq!(
            slice_scalar(field.component(0), &volume, Axis::Z, SliceLocation::Number(1)),
            Err(FieldError::GridMismatch {
                expected: vec![3, 5, 5],
                found: vec![2, 3, 3],
            })
        );
        assert!(matches!(
            slice_field(&field, &volume, Axis::X, SliceLocation::Coordinate(0.0)),
            Err(FieldError::GridMismatch { .. })
        ));
    }

    #[test]
    fn test_non_finite_coordinate_is_rejected() {
        let volume = test_volume();
        let field = indexed_field(&volume);
        assert!(matches!(
            slice_index(&volume, Axis::Z, SliceLocation::Coordinate(f64::NAN)),
            Err(FieldError::SliceCoordinate(c)) if c.is_nan()
        ));
        assert_eq!(
            slice_field(&field, &volume, Axis::Y, SliceLocation::Coordinate(f64::INFINITY)),
            Err(FieldError::SliceCoordinate(f64::INFINITY))
        );
    }

    #[test]
    fn test_plane_coordinates() {
        let volume = test_volume();
        let (rows, cols) = plane_coordinates(&volume, Axis::Y);
        assert_eq!(rows, vec![0.0, 0.5, 1.0]);
        assert_eq!(cols, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_complex_combination() {
        let bx = Array3::from_elem((1, 1, 2), 1.0);
        let by = Array3::from_elem((1, 1, 2), 1.0);
        let bz = Array3::from_elem((1, 1, 2), 7.0);
        let field = FieldVolume::from_components(bx.view(), by.view(), bz.view()).unwrap();
        let sensitivity = complex_combine(&field);
        assert_eq!(sensitivity[[0, 0, 1]], Complex64::new(1.0, -1.0));
        assert_approx_eq!(magnitude(sensitivity.view())[[0, 0, 0]], 2.0_f64.sqrt());
        assert_approx_eq!(phase(sensitivity.view())[[0, 0, 0]], -PI / 4.0);
    }

    #[test]
    fn test_clip_for_display() {
        let data = ndarray::arr1(&[-50.0, 3.0, 25.0, f64::NAN]);
        let clipped = clip_for_display(data.view(), 20.0);
        assert_eq!(clipped[0], -20.0);
        assert_eq!(clipped[1], 3.0);
        assert_eq!(clipped[2], 20.0);
        assert!(clipped[3].is_nan());
        // the input is untouched
        assert_eq!(data[0], -50.0);
    }

    #[test]
    fn test_color_norm_selection() {
        let signed = [-2.0, 0.5, 4.0];
        let norm = ColorNorm::for_data(signed.iter());
        assert_eq!(norm, ColorNorm::TwoSlope { vmin: -2.0, vmax: 4.0 });
        assert_approx_eq!(norm.normalize(0.0), 0.5);
        assert_approx_eq!(norm.normalize(-2.0), 0.0);
        assert_approx_eq!(norm.normalize(-1.0), 0.25);
        assert_approx_eq!(norm.normalize(4.0), 1.0);

        let non_negative = [0.0, 1.0, 3.0, f64::NAN];
        let norm = ColorNorm::for_data(non_negative.iter());
        assert_eq!(norm, ColorNorm::Linear { vmin: 0.0, vmax: 3.0 });
        assert_approx_eq!(norm.normalize(1.5), 0.5);
    }
}
