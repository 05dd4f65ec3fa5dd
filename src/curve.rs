//! Parametrised space curves describing wire geometry.
//!
//! A curve is an immutable algebraic object in one free parameter `t`. It knows its
//! position function and can produce its derivative as another curve; it does not know
//! the interval it is evaluated over (see [Segment](crate::segment::Segment)).

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::error::GeometryError;

/// A wire shape, either a straight line or an elliptical arc.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Curve {
    /// `l(t) = point + t * direction`
    Straight {
        point: Vector3<f64>,
        direction: Vector3<f64>,
    },
    /// `l(t) = center + r1 cos(t) + r2 sin(t)`
    Arc {
        center: Vector3<f64>,
        r1: Vector3<f64>,
        r2: Vector3<f64>,
    },
}

fn is_finite(v: &Vector3<f64>) -> bool {
    v.iter().all(|c| c.is_finite())
}

impl Curve {
    /// Creates a straight line through `point` along `direction`.
    ///
    /// The conventional parameter interval is `[0, 1]`, so `direction` is usually
    /// `end - start`.
    pub fn straight(point: Vector3<f64>, direction: Vector3<f64>) -> Result<Curve, GeometryError> {
        if !is_finite(&point) || !is_finite(&direction) {
            return Err(GeometryError::NonFinite);
        }
        if direction.norm_squared() == 0.0 {
            return Err(GeometryError::ZeroDirection);
        }
        Ok(Curve::Straight { point, direction })
    }

    /// Creates an elliptical arc around `center` spanned by the radius vectors `r1`, `r2`.
    ///
    /// The radius vectors are stored so that `center · (r1 × r2) <= 0`: if the raw
    /// input has the opposite sense, `r1` and `r2` are swapped. Every arc therefore
    /// runs counter-clockwise when viewed from the side of its plane facing the
    /// origin, whichever order the radii were entered in. When the plane contains the
    /// origin (`center · (r1 × r2) == 0`), the radii are ordered so that the first
    /// non-zero component of `r1 × r2` is positive.
    ///
    /// # Arguments
    ///
    /// `center`: centre of the ellipse
    ///
    /// `r1`: radius vector reached at `t = 0`
    ///
    /// `r2`: radius vector reached at `t = pi/2`
    pub fn arc(
        center: Vector3<f64>,
        r1: Vector3<f64>,
        r2: Vector3<f64>,
    ) -> Result<Curve, GeometryError> {
        if !is_finite(&center) || !is_finite(&r1) || !is_finite(&r2) {
            return Err(GeometryError::NonFinite);
        }
        if r1.norm_squared() == 0.0 {
            return Err(GeometryError::ZeroRadius(1));
        }
        if r2.norm_squared() == 0.0 {
            return Err(GeometryError::ZeroRadius(2));
        }
        let normal = r1.cross(&r2);
        if normal.norm_squared() == 0.0 {
            return Err(GeometryError::ColinearRadii);
        }
        let facing = center.dot(&normal);
        let swap = if facing != 0.0 {
            facing > 0.0
        } else {
            // Plane through the origin: the first non-zero component of the normal is positive.
            normal.iter().find(|c| **c != 0.0).map_or(false, |c| *c < 0.0)
        };
        let (r1, r2) = if swap { (r2, r1) } else { (r1, r2) };
        Ok(Curve::Arc { center, r1, r2 })
    }

    /// A circle of the given radius in the plane `axis = offset`, centred on `(u, v)` in the
    /// remaining two coordinates (taken in x, y, z order).
    pub fn circle(
        radius: f64,
        axis: Axis,
        offset: f64,
        center: (f64, f64),
    ) -> Result<Curve, GeometryError> {
        let (a, b) = axis.others();
        let mut c = Vector3::zeros();
        c[axis.index()] = offset;
        c[a.index()] = center.0;
        c[b.index()] = center.1;
        let mut r1 = Vector3::zeros();
        r1[a.index()] = radius;
        let mut r2 = Vector3::zeros();
        r2[b.index()] = radius;
        Curve::arc(c, r1, r2)
    }

    /// Position on the curve at parameter `t`.
    #[inline]
    pub fn position(&self, t: f64) -> Vector3<f64> {
        match self {
            Curve::Straight { point, direction } => point + direction * t,
            Curve::Arc { center, r1, r2 } => center + r1 * t.cos() + r2 * t.sin(),
        }
    }

    /// The derivative of the position function with respect to `t`.
    ///
    /// Both variants are closed under differentiation: a straight line has a
    /// constant derivative (a line with zero direction), and the derivative of
    /// `c + r1 cos t + r2 sin t` is the arc `0 + r2 cos t - r1 sin t`.
    pub fn tangent(&self) -> Curve {
        match *self {
            Curve::Straight { direction, .. } => Curve::Straight {
                point: direction,
                direction: Vector3::zeros(),
            },
            Curve::Arc { r1, r2, .. } => Curve::Arc {
                center: Vector3::zeros(),
                r1: r2,
                r2: -r1,
            },
        }
    }

    /// Normal of the plane an arc lies in (`r1 × r2`), `None` for straight lines.
    pub fn normal(&self) -> Option<Vector3<f64>> {
        match self {
            Curve::Straight { .. } => None,
            Curve::Arc { r1, r2, .. } => Some(r1.cross(r2)),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::Rng;
    use std::f64::consts::PI;

    fn random_vector<R: Rng>(rng: &mut R) -> Vector3<f64> {
        Vector3::new(
            rng.gen_range(-2.0..2.0),
            rng.gen_range(-2.0..2.0),
            rng.gen_range(-2.0..2.0),
        )
    }

    #[test]
    fn test_degenerate_geometry_is_rejected() {
        let p = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(
            Curve::straight(p, Vector3::zeros()),
            Err(GeometryError::ZeroDirection)
        );
        assert_eq!(
            Curve::arc(p, Vector3::zeros(), Vector3::x()),
            Err(GeometryError::ZeroRadius(1))
        );
        assert_eq!(
            Curve::arc(p, Vector3::x(), Vector3::zeros()),
            Err(GeometryError::ZeroRadius(2))
        );
        assert_eq!(
            Curve::arc(p, Vector3::x(), Vector3::x() * -3.0),
            Err(GeometryError::ColinearRadii)
        );
        assert_eq!(
            Curve::straight(Vector3::new(f64::NAN, 0.0, 0.0), Vector3::x()),
            Err(GeometryError::NonFinite)
        );
    }

    #[test]
    fn test_straight_tangent_is_constant() {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let direction = random_vector(&mut rng);
            let curve = Curve::straight(random_vector(&mut rng), direction).unwrap();
            let tangent = curve.tangent();
            for i in 0..10 {
                let t = -1.0 + 0.3 * i as f64;
                assert_eq!(tangent.position(t), direction);
            }
        }
    }

    #[test]
    fn test_arc_is_circle_for_orthogonal_radii() {
        let center = Vector3::new(0.5, -1.0, 2.0);
        let curve = Curve::arc(center, Vector3::new(0.0, 2.0, 0.0), Vector3::new(0.0, 0.0, 2.0))
            .unwrap();
        for i in 0..32 {
            let t = 2.0 * PI * i as f64 / 32.0;
            assert_approx_eq!((curve.position(t) - center).norm(), 2.0);
        }
    }

    #[test]
    fn test_arc_tangent_matches_finite_difference() {
        let mut rng = rand::thread_rng();
        let h = 1e-6;
        for _ in 0..20 {
            let r1 = random_vector(&mut rng);
            let r2 = random_vector(&mut rng);
            let curve = match Curve::arc(random_vector(&mut rng), r1, r2) {
                Ok(curve) => curve,
                Err(_) => continue,
            };
            let t: f64 = rng.gen_range(-PI..PI);
            let numeric = (curve.position(t + h) - curve.position(t - h)) / (2.0 * h);
            let analytic = curve.tangent().position(t);
            assert!((numeric - analytic).norm() < 1e-6);
        }
    }

    #[test]
    fn test_arc_orientation_is_independent_of_radius_order() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let center = random_vector(&mut rng);
            let r1 = random_vector(&mut rng);
            let r2 = random_vector(&mut rng);
            let a = Curve::arc(center, r1, r2).unwrap();
            let b = Curve::arc(center, r2, r1).unwrap();
            assert_eq!(a, b);
            assert!(center.dot(&a.normal().unwrap()) <= 0.0);
        }
    }

    #[test]
    fn test_arc_through_origin_plane_has_fixed_sense() {
        let pairs = [
            (Vector3::zeros(), Vector3::y(), Vector3::z()),
            (Vector3::zeros(), Vector3::x() * 2.0, Vector3::y() * 0.5),
            (Vector3::new(0.0, 3.0, 0.0), Vector3::new(0.0, 0.0, -1.0), Vector3::new(0.0, 1.0, 0.0)),
            (Vector3::zeros(), Vector3::new(0.0, 1.0, 1.0), Vector3::new(0.0, 1.0, -1.0)),
        ];
        for (center, r1, r2) in pairs.iter() {
            let a = Curve::arc(*center, *r1, *r2).unwrap();
            let b = Curve::arc(*center, *r2, *r1).unwrap();
            assert_eq!(a, b);
            let normal = a.normal().unwrap();
            let first = normal.iter().find(|c| **c != 0.0).unwrap();
            assert!(*first > 0.0);
        }
        // The reference loop keeps its input order: r1 = y, r2 = z, normal along +x.
        let a = Curve::arc(Vector3::zeros(), Vector3::y(), Vector3::z()).unwrap();
        let b = Curve::arc(Vector3::zeros(), Vector3::z(), Vector3::y()).unwrap();
        assert_eq!(a.normal(), Some(Vector3::x()));
        assert_eq!(b.normal(), Some(Vector3::x()));
    }

    #[test]
    fn test_circle_helper() {
        let curve = Curve::circle(1.0, Axis::X, 0.0, (0.0, 0.0)).unwrap();
        assert_eq!(
            curve,
            Curve::Arc {
                center: Vector3::zeros(),
                r1: Vector3::y(),
                r2: Vector3::z()
            }
        );
        assert_eq!(curve.normal(), Some(Vector3::x()));
    }
}
