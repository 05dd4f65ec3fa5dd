//! Magnetic field of a wire segment from the Biot-Savart law.
//!
//! For a wire following `l(t)` with tangent `l'(t)`, the field at `r` is the line integral
//!
//! ```text
//! B(r) = ∫ l'(t) × (r - l(t)) / |r - l(t)|³ dt
//! ```
//!
//! over the segment's parameter interval. The physical prefactor `mu_0 I / 4 pi` is
//! normalised to 1.
//!
//! The integrand is singular where a field point lies on the wire. Grid points on or
//! very close to the wire therefore get large or non-finite values; they are kept as
//! computed and never clamped here.

use std::time::Instant;

use nalgebra::Vector3;
use ndarray::Array3;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::SolverConfig;
use crate::curve::Curve;
use crate::error::FieldError;
use crate::field::FieldVolume;
use crate::quadrature::{quad, QuadOptions};
use crate::volume::SamplingVolume;

/// The Biot-Savart integrand of one curve.
///
/// The tangent is derived once on construction; evaluation at `(t, r)` only needs
/// the closed-form position and tangent of the curve.
#[derive(Clone, Copy, Debug)]
pub struct BiotSavartIntegrand {
    position: Curve,
    tangent: Curve,
}

impl BiotSavartIntegrand {
    pub fn new(curve: &Curve) -> BiotSavartIntegrand {
        BiotSavartIntegrand {
            position: *curve,
            tangent: curve.tangent(),
        }
    }

    /// `dB/dt` at parameter `t` for the field point `r`.
    #[inline]
    pub fn evaluate(&self, t: f64, r: &Vector3<f64>) -> Vector3<f64> {
        let sep = r - self.position.position(t);
        let distance = sep.norm();
        self.tangent.position(t).cross(&sep) / (distance * distance * distance)
    }

    /// A single Cartesian component (0 = x, 1 = y, 2 = z) of `dB/dt`.
    #[inline]
    pub fn component(&self, component: usize, t: f64, r: &Vector3<f64>) -> f64 {
        let sep = r - self.position.position(t);
        let tangent = self.tangent.position(t);
        let distance = sep.norm();
        let cross = match component {
            0 => tangent.y * sep.z - tangent.z * sep.y,
            1 => tangent.z * sep.x - tangent.x * sep.z,
            _ => tangent.x * sep.y - tangent.y * sep.x,
        };
        cross / (distance * distance * distance)
    }
}

/// The field of a segment at a single point.
pub fn field_at_point(
    curve: &Curve,
    low: f64,
    high: f64,
    point: &Vector3<f64>,
    options: &QuadOptions,
) -> Vector3<f64> {
    let integrand = BiotSavartIntegrand::new(curve);
    Vector3::from_fn(|c, _| {
        quad(|t| integrand.component(c, t, point), low, high, options).integral
    })
}

/// Integrates one component of the integrand at every grid point.
///
/// Grid points are independent, so they are spread over the rayon thread pool in
/// batches of `batch_size`. Each point's integral depends only on that point, which
/// keeps the result identical however the work is split.
fn integrate_component(
    integrand: &BiotSavartIntegrand,
    component: usize,
    low: f64,
    high: f64,
    points: &[Vector3<f64>],
    options: &QuadOptions,
    batch_size: usize,
) -> Vec<f64> {
    points
        .par_iter()
        .with_min_len(batch_size.max(1))
        .map(|r| quad(|t| integrand.component(component, t, r), low, high, options).integral)
        .collect()
}

/// Computes the field of the segment `curve` over `[low, high]` at every point of `volume`.
///
/// `low > high` integrates the reversed interval and negates the result. An empty
/// interval gives an exactly zero field, broadcast to the full grid.
///
/// # Arguments
///
/// `curve`: the wire geometry
///
/// `low`: start of the parameter interval
///
/// `high`: end of the parameter interval
///
/// `volume`: the sampling grid
///
/// `config`: integration tolerances and parallel batch size
///
/// Numerical trouble is not an error; the only failure is an internal shape mismatch.
pub fn integrate_segment(
    curve: &Curve,
    low: f64,
    high: f64,
    volume: &SamplingVolume,
    config: &SolverConfig,
) -> Result<FieldVolume, FieldError> {
    let shape = volume.shape();
    let started = Instant::now();

    if low == high || volume.is_empty() {
        debug!(low, high, "empty segment interval, field is zero");
        return Ok(FieldVolume::zeros(shape));
    }

    let integrand = BiotSavartIntegrand::new(curve);
    let points = volume.points();
    let options = config.quad_options();

    let mut components = Vec::with_capacity(3);
    for (c, name) in ["x", "y", "z"].iter().enumerate() {
        let values = integrate_component(
            &integrand,
            c,
            low,
            high,
            &points,
            &options,
            config.batch_size,
        );
        debug!(component = *name, "finished field component");
        let grid = Array3::from_shape_vec((shape[0], shape[1], shape[2]), values).map_err(|_| {
            FieldError::ShapeMismatch {
                expected: [shape[0], shape[1], shape[2], 3],
                found: [points.len(), 1, 1, 3],
            }
        })?;
        components.push(grid);
    }
    let field = FieldVolume::from_components(
        components[0].view(),
        components[1].view(),
        components[2].view(),
    )?;

    info!(
        points = points.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "integrated segment field"
    );
    Ok(field)
}
