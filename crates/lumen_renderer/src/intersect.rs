//! Ray/primitive intersection tests.
//!
//! Analytic shapes live in a canonical object space (radius 0.5 sphere,
//! [-0.5, 0.5]^3 box, unit square at z = 0). The world ray is taken into
//! that space with the inverse transform, the canonical equation is solved,
//! and the hit point and normal are taken back out with the transform and
//! inverse transpose. Distances are always world-space.
//!
//! A miss is reported as `t == MAX_INTERSECT_DIST`, never as an error.

use lumen_core::{Geom, GeomKind, Triangle};
use lumen_math::{Ray, Transform, Vec3};

/// Hits closer than this are treated as self-intersections.
pub const MIN_INTERSECT_DIST: f32 = 1e-4;

/// Sentinel distance meaning "no hit".
pub const MAX_INTERSECT_DIST: f32 = 10000.0;

/// Half-extent of the square plane, inflated to close seams between quads.
pub const PLANE_TOLERANCE: f32 = 0.5001;

/// Allowed deviation of the barycentric sum from 1.
pub const BARYCENTRIC_TOLERANCE: f32 = 1e-4;

/// Distance and world normal of the closest hit on one primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub t: f32,
    pub normal: Vec3,
}

impl SurfaceHit {
    pub const MISS: SurfaceHit = SurfaceHit {
        t: MAX_INTERSECT_DIST,
        normal: Vec3::ZERO,
    };

    #[inline]
    pub fn is_hit(&self) -> bool {
        self.t < MAX_INTERSECT_DIST
    }
}

/// Intersect an analytic geometry instance.
///
/// Mesh instances always miss here; their triangles are found through the BVH.
pub fn intersect_geom(geom: &Geom, ray: &Ray) -> SurfaceHit {
    match geom.kind {
        GeomKind::Sphere => intersect_sphere(&geom.transform, ray),
        GeomKind::Cube => intersect_box(&geom.transform, ray),
        GeomKind::SquarePlane => intersect_plane(&geom.transform, ray),
        GeomKind::Mesh { .. } => SurfaceHit::MISS,
    }
}

/// Object-space origin and unit direction, or `None` for a degenerate ray.
#[inline]
fn to_local(transform: &Transform, ray: &Ray) -> Option<(Vec3, Vec3)> {
    let origin = transform.point_to_local(ray.origin());
    let direction = transform.vector_to_local(ray.direction()).try_normalize()?;
    Some((origin, direction))
}

/// Take the first local candidate whose world distance clears the minimum.
///
/// Candidates must be ordered near to far and have `t > 0`.
#[inline]
fn resolve_local_hit(
    transform: &Transform,
    ray: &Ray,
    origin: Vec3,
    direction: Vec3,
    candidates: &[(f32, Vec3)],
) -> SurfaceHit {
    for &(t_local, local_normal) in candidates {
        if t_local <= 0.0 {
            continue;
        }
        let world_point = transform.point_to_world(origin + t_local * direction);
        let t = world_point.distance(ray.origin());
        if t >= MIN_INTERSECT_DIST && t < MAX_INTERSECT_DIST {
            return SurfaceHit {
                t,
                normal: transform.normal_to_world(local_normal),
            };
        }
    }
    SurfaceHit::MISS
}

/// Sphere of radius 0.5 at the origin.
pub fn intersect_sphere(transform: &Transform, ray: &Ray) -> SurfaceHit {
    const RADIUS: f32 = 0.5;

    let Some((o, d)) = to_local(transform, ray) else {
        return SurfaceHit::MISS;
    };

    let b = o.dot(d);
    let c = o.dot(o) - RADIUS * RADIUS;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return SurfaceHit::MISS;
    }

    let root = discriminant.sqrt();
    let near = -b - root;
    let far = -b + root;

    resolve_local_hit(
        transform,
        ray,
        o,
        d,
        &[(near, o + near * d), (far, o + far * d)],
    )
}

/// Box spanning [-0.5, 0.5] on every axis (slab method).
pub fn intersect_box(transform: &Transform, ray: &Ray) -> SurfaceHit {
    let Some((o, d)) = to_local(transform, ray) else {
        return SurfaceHit::MISS;
    };

    let mut tmin = f32::MIN;
    let mut tmax = f32::MAX;
    let mut tmin_n = Vec3::ZERO;
    let mut tmax_n = Vec3::ZERO;

    for axis in 0..3 {
        if d[axis].abs() < 1e-8 {
            // Parallel to this slab: inside it or a miss.
            if o[axis] < -0.5 || o[axis] > 0.5 {
                return SurfaceHit::MISS;
            }
            continue;
        }

        let t1 = (-0.5 - o[axis]) / d[axis];
        let t2 = (0.5 - o[axis]) / d[axis];
        let (ta, tb) = (t1.min(t2), t1.max(t2));

        // Outward normal of the entry face; the exit face is the opposite one.
        let mut n = Vec3::ZERO;
        n[axis] = if t2 < t1 { 1.0 } else { -1.0 };

        if ta > 0.0 && ta > tmin {
            tmin = ta;
            tmin_n = n;
        }
        if tb < tmax {
            tmax = tb;
            tmax_n = -n;
        }
    }

    if tmax < tmin || tmax <= 0.0 {
        return SurfaceHit::MISS;
    }

    resolve_local_hit(transform, ray, o, d, &[(tmin, tmin_n), (tmax, tmax_n)])
}

/// Unit square at z = 0 facing +z.
pub fn intersect_plane(transform: &Transform, ray: &Ray) -> SurfaceHit {
    let Some((o, d)) = to_local(transform, ray) else {
        return SurfaceHit::MISS;
    };
    if d.z.abs() < 1e-8 {
        return SurfaceHit::MISS;
    }

    let t = -o.z / d.z;
    let p = o + t * d;
    if p.x.abs() > PLANE_TOLERANCE || p.y.abs() > PLANE_TOLERANCE {
        return SurfaceHit::MISS;
    }

    resolve_local_hit(transform, ray, o, d, &[(t, Vec3::Z)])
}

/// World-space triangle, with the shading normal interpolated from the
/// vertex normals.
///
/// Barycentrics come from sub-triangle area ratios; a point is inside when
/// each lies in [0, 1] and they sum to 1 within `BARYCENTRIC_TOLERANCE`.
/// Degenerate triangles never hit.
pub fn intersect_triangle(tri: &Triangle, ray: &Ray) -> SurfaceHit {
    if tri.is_degenerate() {
        return SurfaceHit::MISS;
    }

    let denom = tri.plane_normal.dot(ray.direction());
    if denom.abs() < 1e-8 {
        return SurfaceHit::MISS;
    }

    let t = tri.plane_normal.dot(tri.p0 - ray.origin()) / denom;
    if !(MIN_INTERSECT_DIST..MAX_INTERSECT_DIST).contains(&t) {
        return SurfaceHit::MISS;
    }

    let p = ray.at(t);
    let inv_area = 1.0 / tri.double_area;
    let b0 = (p - tri.p1).cross(p - tri.p2).length() * inv_area;
    let b1 = (p - tri.p2).cross(p - tri.p0).length() * inv_area;
    let b2 = (p - tri.p0).cross(p - tri.p1).length() * inv_area;

    let in_range = |b: f32| (0.0..=1.0).contains(&b);
    if !(in_range(b0) && in_range(b1) && in_range(b2)) {
        return SurfaceHit::MISS;
    }
    if ((b0 + b1 + b2) - 1.0).abs() > BARYCENTRIC_TOLERANCE {
        return SurfaceHit::MISS;
    }

    let normal = (b0 * tri.n0 + b1 * tri.n1 + b2 * tri.n2)
        .try_normalize()
        .unwrap_or(tri.plane_normal);

    SurfaceHit { t, normal }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::Placement;

    fn geom(kind: GeomKind, placement: Placement) -> Geom {
        Geom::new(kind, Transform::from_placement(placement), 0)
    }

    fn near(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_sphere_hit_front() {
        let g = geom(GeomKind::Sphere, Placement::default());
        let ray = Ray::new(Vec3::new(0.0, 0.0, -2.0), Vec3::Z);
        let hit = intersect_geom(&g, &ray);

        assert!((hit.t - 1.5).abs() < 1e-5);
        assert!(near(hit.normal, Vec3::NEG_Z));
    }

    #[test]
    fn test_sphere_hit_from_inside() {
        let g = geom(GeomKind::Sphere, Placement::default());
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let hit = intersect_geom(&g, &ray);

        assert!((hit.t - 0.5).abs() < 1e-5);
        assert!(near(hit.normal, Vec3::X));
    }

    #[test]
    fn test_sphere_behind_and_miss() {
        let g = geom(GeomKind::Sphere, Placement::default());

        let behind = Ray::new(Vec3::new(0.0, 0.0, 2.0), Vec3::Z);
        assert!(!intersect_geom(&g, &behind).is_hit());

        let off = Ray::new(Vec3::new(1.0, 0.0, -2.0), Vec3::Z);
        assert_eq!(intersect_geom(&g, &off), SurfaceHit::MISS);
    }

    #[test]
    fn test_scaled_sphere_world_distance() {
        let g = geom(
            GeomKind::Sphere,
            Placement::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::splat(4.0)),
        );
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        let hit = intersect_geom(&g, &ray);

        // radius 2 centered at z = 5
        assert!((hit.t - 3.0).abs() < 1e-4);
        assert!(near(hit.normal, Vec3::NEG_Z));
    }

    #[test]
    fn test_box_hit() {
        let g = geom(GeomKind::Cube, Placement::default());
        let ray = Ray::new(Vec3::new(2.0, 0.0, 0.0), Vec3::NEG_X);
        let hit = intersect_geom(&g, &ray);

        assert!((hit.t - 1.5).abs() < 1e-5);
        assert!(near(hit.normal, Vec3::X));
    }

    #[test]
    fn test_box_exit_normal_from_inside() {
        let g = geom(GeomKind::Cube, Placement::default());
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);
        let hit = intersect_geom(&g, &ray);

        assert!((hit.t - 0.5).abs() < 1e-5);
        assert!(near(hit.normal, Vec3::Y));
    }

    #[test]
    fn test_box_parallel_ray_outside_slab() {
        let g = geom(GeomKind::Cube, Placement::default());
        let ray = Ray::new(Vec3::new(2.0, 0.7, 0.0), Vec3::NEG_X);
        assert!(!intersect_geom(&g, &ray).is_hit());
    }

    #[test]
    fn test_rotated_box() {
        let g = geom(
            GeomKind::Cube,
            Placement::new(Vec3::ZERO, Vec3::new(0.0, 45.0, 0.0), Vec3::ONE),
        );
        let ray = Ray::new(Vec3::new(3.0, 0.0, 0.0), Vec3::NEG_X);
        let hit = intersect_geom(&g, &ray);

        // The corner edge faces +x at distance sqrt(2)/2 from the center.
        assert!((hit.t - (3.0 - std::f32::consts::FRAC_1_SQRT_2)).abs() < 1e-4);
        assert!(hit.normal.x > 0.0);
    }

    #[test]
    fn test_plane_hit_and_tolerance() {
        let g = geom(GeomKind::SquarePlane, Placement::default());

        let hit = intersect_geom(&g, &Ray::new(Vec3::new(0.2, -0.3, 1.0), Vec3::NEG_Z));
        assert!((hit.t - 1.0).abs() < 1e-5);
        assert!(near(hit.normal, Vec3::Z));

        // Inside the inflated edge
        let edge = intersect_geom(&g, &Ray::new(Vec3::new(0.50005, 0.0, 1.0), Vec3::NEG_Z));
        assert!(edge.is_hit());

        let outside = intersect_geom(&g, &Ray::new(Vec3::new(0.6, 0.0, 1.0), Vec3::NEG_Z));
        assert!(!outside.is_hit());

        let parallel = intersect_geom(&g, &Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::X));
        assert!(!parallel.is_hit());
    }

    #[test]
    fn test_plane_normal_is_fixed_side() {
        let g = geom(GeomKind::SquarePlane, Placement::default());
        let from_below = intersect_geom(&g, &Ray::new(Vec3::new(0.0, 0.0, -1.0), Vec3::Z));

        assert!(from_below.is_hit());
        assert!(near(from_below.normal, Vec3::Z));
    }

    #[test]
    fn test_triangle_hit_interpolates_normal() {
        let n = Vec3::new(0.0, 0.6, 0.8);
        let tri = Triangle::new(
            [Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            Some([n, n, n]),
            0,
        );
        let hit = intersect_triangle(&tri, &Ray::new(Vec3::new(0.0, 0.0, 2.0), Vec3::NEG_Z));

        assert!((hit.t - 2.0).abs() < 1e-5);
        assert!(near(hit.normal, n));
    }

    #[test]
    fn test_triangle_miss_outside_and_behind() {
        let tri = Triangle::new([Vec3::ZERO, Vec3::X, Vec3::Y], None, 0);

        let outside = Ray::new(Vec3::new(0.8, 0.8, 1.0), Vec3::NEG_Z);
        assert!(!intersect_triangle(&tri, &outside).is_hit());

        let behind = Ray::new(Vec3::new(0.2, 0.2, -1.0), Vec3::NEG_Z);
        assert!(!intersect_triangle(&tri, &behind).is_hit());
    }

    #[test]
    fn test_degenerate_triangle_never_hits() {
        let tri = Triangle::new([Vec3::ZERO, Vec3::X, Vec3::X * 2.0], None, 0);
        for dir in [Vec3::NEG_Z, Vec3::Y, Vec3::new(0.5, -1.0, 0.0)] {
            let hit = intersect_triangle(&tri, &Ray::new(Vec3::new(0.5, 1.0, 0.0), dir));
            assert_eq!(hit, SurfaceHit::MISS);
        }
    }

    #[test]
    fn test_tiny_triangle_still_hits() {
        let tri = Triangle::new([Vec3::ZERO, Vec3::X * 3e-4, Vec3::Y * 3e-4], None, 0);
        let ray = Ray::new(Vec3::new(0.75e-4, 0.75e-4, 1.0), Vec3::NEG_Z);
        let hit = intersect_triangle(&tri, &ray);

        assert!((hit.t - 1.0).abs() < 1e-5);
        assert!(near(hit.normal, Vec3::Z));
    }

    #[test]
    fn test_mesh_geom_misses_directly() {
        let g = geom(
            GeomKind::Mesh {
                mesh_id: 0,
                first_triangle: 0,
                triangle_count: 1,
            },
            Placement::default(),
        );
        assert!(!intersect_geom(&g, &Ray::new(Vec3::Z, Vec3::NEG_Z)).is_hit());
    }
}
