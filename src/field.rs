//! Vector field volumes sampled on a grid.

use std::ops::{AddAssign, Neg};

use nalgebra::Vector3;
use ndarray::{s, Array3, Array4, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::FieldError;

/// A magnetic field sampled over a grid.
///
/// The underlying array has shape `(nx, ny, nz, 3)`: three spatial axes matching the
/// sampling grid plus a component axis holding (Bx, By, Bz). Values near a wire may be
/// very large or non-finite; they are stored as computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldVolume {
    data: Array4<f64>,
}

impl FieldVolume {
    /// A zero field over a grid of the given shape.
    pub fn zeros(shape: [usize; 3]) -> FieldVolume {
        FieldVolume {
            data: Array4::zeros((shape[0], shape[1], shape[2], 3)),
        }
    }

    /// Wraps an existing array, which must have a component axis of length 3.
    pub fn from_array(data: Array4<f64>) -> Result<FieldVolume, FieldError> {
        let dim = data.dim();
        if dim.3 != 3 {
            return Err(FieldError::ShapeMismatch {
                expected: [dim.0, dim.1, dim.2, 3],
                found: [dim.0, dim.1, dim.2, dim.3],
            });
        }
        Ok(FieldVolume { data })
    }

    /// Stacks three scalar grids (Bx, By, Bz) along the component axis.
    pub fn from_components<'a>(
        bx: ArrayView3<'a, f64>,
        by: ArrayView3<'a, f64>,
        bz: ArrayView3<'a, f64>,
    ) -> Result<FieldVolume, FieldError> {
        let stacked =
            ndarray::stack(Axis(3), &[bx, by, bz]).map_err(|_| FieldError::ShapeMismatch {
                expected: [bx.dim().0, bx.dim().1, bx.dim().2, 3],
                found: [by.dim().0, by.dim().1, by.dim().2, 3],
            })?;
        Ok(FieldVolume { data: stacked })
    }

    /// Number of grid points along x, y and z.
    pub fn shape(&self) -> [usize; 3] {
        let (nx, ny, nz, _) = self.data.dim();
        [nx, ny, nz]
    }

    pub fn data(&self) -> &Array4<f64> {
        &self.data
    }

    pub fn into_array(self) -> Array4<f64> {
        self.data
    }

    /// One field component (0 = x, 1 = y, 2 = z) over the whole grid.
    pub fn component(&self, component: usize) -> ArrayView3<'_, f64> {
        self.data.index_axis(Axis(3), component)
    }

    /// The field vector at grid point `(i, j, k)`.
    pub fn at(&self, i: usize, j: usize, k: usize) -> Vector3<f64> {
        let v = self.data.slice(s![i, j, k, ..]);
        Vector3::new(v[0], v[1], v[2])
    }

    /// Magnitude of the field at every grid point.
    pub fn magnitude(&self) -> Array3<f64> {
        self.data
            .map_axis(Axis(3), |v| (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt())
    }

    /// Largest absolute elementwise difference to `other`. NaN where either volume is NaN.
    pub fn max_abs_difference(&self, other: &FieldVolume) -> f64 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, |acc: f64, d| {
                if acc.is_nan() || d.is_nan() {
                    f64::NAN
                } else {
                    acc.max(d)
                }
            })
    }
}

impl AddAssign<&FieldVolume> for FieldVolume {
    fn add_assign(&mut self, other: &FieldVolume) {
        self.data += &other.data;
    }
}

impl Neg for FieldVolume {
    type Output = FieldVolume;

    fn neg(self) -> FieldVolume {
        FieldVolume { data: -self.data }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_component_layout() {
        let bx = Array3::from_elem((2, 3, 4), 1.0);
        let by = Array3::from_elem((2, 3, 4), 2.0);
        let bz = Array3::from_elem((2, 3, 4), 3.0);
        let field = FieldVolume::from_components(bx.view(), by.view(), bz.view()).unwrap();
        assert_eq!(field.shape(), [2, 3, 4]);
        assert_eq!(field.data().dim(), (2, 3, 4, 3));
        assert_eq!(field.at(1, 2, 3), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(field.component(1)[[0, 1, 2]], 2.0);
        assert_eq!(field.magnitude()[[0, 0, 0]], 14.0_f64.sqrt());
    }

    #[test]
    fn test_mismatched_components_are_rejected() {
        let bx = Array3::<f64>::zeros((2, 3, 4));
        let by = Array3::<f64>::zeros((2, 3, 5));
        assert!(FieldVolume::from_components(bx.view(), by.view(), bx.view()).is_err());
        assert!(FieldVolume::from_array(Array4::zeros((1, 1, 1, 2))).is_err());
    }

    #[test]
    fn test_sum_and_negation() {
        let mut a = FieldVolume::zeros([2, 2, 2]);
        let b = FieldVolume::from_array(Array4::from_elem((2, 2, 2, 3), 0.5)).unwrap();
        a += &b;
        a += &b;
        assert_eq!(a.at(1, 1, 1), Vector3::new(1.0, 1.0, 1.0));
        let c = -a.clone();
        a += &c;
        assert_eq!(a, FieldVolume::zeros([2, 2, 2]));
        assert_eq!(b.max_abs_difference(&FieldVolume::zeros([2, 2, 2])), 0.5);
    }
}
