//! Collision geometry and segment queries
//!
//! Shapes are boxes (oriented with their body) or capsules (a segment with a
//! radius, used for map walls). Both map onto parry shapes; a thick segment
//! query is a ray cast against the shape grown by the query radius.

use glam::DVec2;
use rapier2d_f64::math::{Isometry, Point, Real, Vector};
use rapier2d_f64::parry::query::{PointQuery, Ray, RayCast};
use rapier2d_f64::parry::shape::{Shape, SharedShape};
use serde::{Deserialize, Serialize};

const EPSILON: f64 = 1e-12;

/// Shape geometry in body-local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// Axis-aligned box centered on the body, rotated with it
    Box { half_extents: DVec2 },
    /// Segment with rounded caps
    Segment { a: DVec2, b: DVec2, radius: f64 },
}

impl Geometry {
    pub fn boxed(width: f64, height: f64) -> Self {
        Self::Box {
            half_extents: DVec2::new(width / 2.0, height / 2.0),
        }
    }

    pub fn segment(a: DVec2, b: DVec2, radius: f64) -> Self {
        Self::Segment { a, b, radius }
    }

    /// Collision shape grown outward by `inflate`
    pub fn shared_shape(&self, inflate: f64) -> SharedShape {
        match *self {
            Geometry::Box { half_extents: h } if inflate > 0.0 => {
                SharedShape::round_cuboid(h.x, h.y, inflate)
            }
            Geometry::Box { half_extents: h } => SharedShape::cuboid(h.x, h.y),
            Geometry::Segment { a, b, radius } => {
                SharedShape::capsule(to_point(a), to_point(b), radius + inflate)
            }
        }
    }

    /// Read back the geometry of a shape built by `shared_shape(0.0)`
    pub fn from_shape(shape: &dyn Shape) -> Option<Self> {
        if let Some(cuboid) = shape.as_cuboid() {
            Some(Geometry::Box {
                half_extents: from_vector(&cuboid.half_extents),
            })
        } else {
            shape.as_capsule().map(|capsule| Geometry::Segment {
                a: from_point(&capsule.segment.a),
                b: from_point(&capsule.segment.b),
                radius: capsule.radius,
            })
        }
    }

    /// Query segment start→end (thickened by `radius`) against this geometry
    /// placed at `position` rotated by `angle`
    pub fn segment_query(
        &self,
        position: DVec2,
        angle: f64,
        start: DVec2,
        end: DVec2,
        radius: f64,
    ) -> Option<SegmentHit> {
        segment_query(&*self.shared_shape(radius), &pose(position, angle), start, end)
    }
}

/// First intersection of a query segment with a shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    pub point: DVec2,
    /// Surface normal at the hit, facing the query start
    pub normal: DVec2,
    /// Position along the query segment (0 = start, 1 = end)
    pub fraction: f64,
}

/// Cast segment start→end against a placed shape.
///
/// A segment starting inside the shape hits at fraction 0.
pub fn segment_query(
    shape: &dyn Shape,
    pose: &Isometry<Real>,
    start: DVec2,
    end: DVec2,
) -> Option<SegmentHit> {
    let dir = end - start;
    if dir.length_squared() < EPSILON {
        return shape
            .contains_point(pose, &to_point(start))
            .then_some(SegmentHit {
                point: start,
                normal: DVec2::ZERO,
                fraction: 0.0,
            });
    }

    let ray = Ray::new(to_point(start), to_vector(dir));
    let hit = shape.cast_ray_and_get_normal(pose, &ray, 1.0, true)?;
    let fraction = hit.time_of_impact;
    Some(SegmentHit {
        point: start + dir * fraction,
        normal: from_vector(&hit.normal),
        fraction,
    })
}

#[inline]
pub(crate) fn pose(position: DVec2, angle: f64) -> Isometry<Real> {
    Isometry::new(to_vector(position), angle)
}

#[inline]
pub(crate) fn to_vector(v: DVec2) -> Vector<Real> {
    Vector::new(v.x, v.y)
}

#[inline]
pub(crate) fn to_point(v: DVec2) -> Point<Real> {
    Point::new(v.x, v.y)
}

#[inline]
pub(crate) fn from_vector(v: &Vector<Real>) -> DVec2 {
    DVec2::new(v.x, v.y)
}

#[inline]
pub(crate) fn from_point(p: &Point<Real>) -> DVec2 {
    DVec2::new(p.x, p.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_unit_box(pos: DVec2, start: DVec2, end: DVec2, radius: f64) -> Option<SegmentHit> {
        Geometry::boxed(2.0, 2.0).segment_query(pos, 0.0, start, end, radius)
    }

    #[test]
    fn test_segment_query_box_from_left() {
        let hit =
            query_unit_box(DVec2::new(10.0, 0.0), DVec2::ZERO, DVec2::new(20.0, 0.0), 0.0).unwrap();
        // Left face at x = 9
        assert!((hit.fraction - 0.45).abs() < 1e-9);
        assert!((hit.point.x - 9.0).abs() < 1e-9);
        assert!(hit.normal.x < 0.0);
    }

    #[test]
    fn test_segment_query_miss() {
        assert!(query_unit_box(DVec2::new(10.0, 5.0), DVec2::ZERO, DVec2::new(20.0, 0.0), 0.0).is_none());
    }

    #[test]
    fn test_segment_query_radius_thickens_ray() {
        let pos = DVec2::new(10.0, 1.8);
        let end = DVec2::new(20.0, 0.0);
        assert!(query_unit_box(pos, DVec2::ZERO, end, 0.0).is_none());
        let hit = query_unit_box(pos, DVec2::ZERO, end, 1.0).unwrap();
        assert!(hit.fraction > 0.4 && hit.fraction < 0.5);
    }

    #[test]
    fn test_segment_query_rotated_box() {
        // 8x2 box stood upright: its face toward the ray is 1 unit from center
        let tall = Geometry::boxed(8.0, 2.0);
        let hit = tall
            .segment_query(
                DVec2::new(10.0, 0.0),
                std::f64::consts::FRAC_PI_2,
                DVec2::ZERO,
                DVec2::new(20.0, 0.0),
                0.0,
            )
            .unwrap();
        assert!((hit.point.x - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_query_capsule_wall() {
        let wall = Geometry::segment(DVec2::new(50.0, -100.0), DVec2::new(50.0, 100.0), 5.0);
        let hit = wall
            .segment_query(DVec2::ZERO, 0.0, DVec2::ZERO, DVec2::new(100.0, 0.0), 0.0)
            .unwrap();
        assert!((hit.fraction - 0.45).abs() < 1e-9);
        assert!((hit.normal - DVec2::new(-1.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_segment_query_capsule_end_cap() {
        let wall = Geometry::segment(DVec2::new(50.0, 10.0), DVec2::new(50.0, 100.0), 5.0);
        // Ray passes below the straight part, through the rounded end
        let hit = wall
            .segment_query(DVec2::ZERO, 0.0, DVec2::new(0.0, 8.0), DVec2::new(100.0, 8.0), 0.0)
            .unwrap();
        assert!(hit.point.x > 45.0 && hit.point.x < 50.0);
    }

    #[test]
    fn test_segment_query_start_inside() {
        let hit = query_unit_box(DVec2::ZERO, DVec2::ZERO, DVec2::new(20.0, 0.0), 0.0).unwrap();
        assert_eq!(hit.fraction, 0.0);
        assert_eq!(hit.point, DVec2::ZERO);
    }

    #[test]
    fn test_zero_length_segment() {
        assert!(query_unit_box(DVec2::ZERO, DVec2::splat(0.5), DVec2::splat(0.5), 0.0).is_some());
        assert!(query_unit_box(DVec2::ZERO, DVec2::splat(5.0), DVec2::splat(5.0), 0.0).is_none());
    }

    #[test]
    fn test_geometry_read_back_from_shape() {
        let wall = Geometry::segment(DVec2::new(0.0, 4.0), DVec2::new(64.0, 4.0), 4.0);
        assert_eq!(Geometry::from_shape(&*wall.shared_shape(0.0)), Some(wall));
        let crate_box = Geometry::boxed(16.0, 8.0);
        assert_eq!(Geometry::from_shape(&*crate_box.shared_shape(0.0)), Some(crate_box));
    }
}
