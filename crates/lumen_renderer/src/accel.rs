//! Scene-level ray queries: the triangle BVH plus analytic instances.

use lumen_core::Scene;
use lumen_math::Ray;

use crate::bvh::Bvh;
use crate::error::RenderError;
use crate::intersect::intersect_geom;
use crate::path::ShadeableIntersection;

/// Acceleration state for one scene generation.
///
/// Triangles go through the BVH; analytic shapes are few and tested one by
/// one. Rebuild when `is_stale` reports the scene has moved on.
#[derive(Debug, Clone)]
pub struct SceneAccel {
    bvh: Option<Bvh>,
    generation: u64,
}

impl SceneAccel {
    pub fn build(scene: &Scene) -> Result<Self, RenderError> {
        let bvh = if scene.triangles().is_empty() {
            None
        } else {
            Some(Bvh::build(scene.triangles())?)
        };

        Ok(Self {
            bvh,
            generation: scene.generation(),
        })
    }

    pub fn bvh(&self) -> Option<&Bvh> {
        self.bvh.as_ref()
    }

    pub fn is_stale(&self, scene: &Scene) -> bool {
        self.generation != scene.generation()
    }

    /// Closest surface along the ray, or `ShadeableIntersection::MISS`.
    pub fn intersect(&self, scene: &Scene, ray: &Ray) -> ShadeableIntersection {
        let mut closest = ShadeableIntersection::MISS;

        if let Some(hit) = self.bvh.as_ref().and_then(|bvh| bvh.intersect(ray)) {
            closest = ShadeableIntersection {
                t: hit.t,
                surface_normal: hit.normal,
                material_id: hit.material_id,
                geom_id: None,
            };
        }

        for (geom_id, geom) in scene.geoms().iter().enumerate() {
            if !geom.kind.is_analytic() {
                continue;
            }
            let hit = intersect_geom(geom, ray);
            if hit.t < closest.t {
                closest = ShadeableIntersection {
                    t: hit.t,
                    surface_normal: hit.normal,
                    material_id: geom.material_id,
                    geom_id: Some(geom_id),
                };
            }
        }

        closest
    }

    /// True if anything lies strictly closer than `t_max` along the ray.
    pub fn occluded(&self, scene: &Scene, ray: &Ray, t_max: f32) -> bool {
        if self.bvh.as_ref().is_some_and(|bvh| bvh.any_hit(ray, t_max)) {
            return true;
        }
        scene
            .geoms()
            .iter()
            .filter(|geom| geom.kind.is_analytic())
            .any(|geom| intersect_geom(geom, ray).t < t_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{CameraParams, GeomKind, Material, Mesh};
    use lumen_math::{Placement, Transform, Vec3};

    fn scene_with_mesh_and_sphere() -> Scene {
        let mut scene = Scene::new(CameraParams::default());
        let grey = scene.add_material(Material::default());
        let red = scene.add_material(Material::diffuse(Vec3::new(0.8, 0.1, 0.1)));

        // Quad at z = -2 facing +z
        let quad = Mesh::new(
            vec![
                Vec3::new(-2.0, -2.0, 0.0),
                Vec3::new(2.0, -2.0, 0.0),
                Vec3::new(-2.0, 2.0, 0.0),
                Vec3::new(2.0, 2.0, 0.0),
            ],
            vec![0, 1, 2, 1, 3, 2],
            None,
        );
        scene
            .add_mesh(quad, Transform::from_translation_scale(Vec3::new(0.0, 0.0, -2.0), Vec3::ONE), grey)
            .unwrap();
        scene.add_geom(GeomKind::Sphere, Transform::default(), red).unwrap();
        scene
    }

    #[test]
    fn test_nearest_of_mesh_and_geom() {
        let scene = scene_with_mesh_and_sphere();
        let accel = SceneAccel::build(&scene).unwrap();

        let through_sphere = accel.intersect(&scene, &Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::NEG_Z));
        assert!((through_sphere.t - 2.5).abs() < 1e-4);
        assert_eq!(through_sphere.geom_id, Some(1));
        assert_eq!(through_sphere.material_id, 1);

        let past_sphere = accel.intersect(&scene, &Ray::new(Vec3::new(1.5, 0.0, 3.0), Vec3::NEG_Z));
        assert!((past_sphere.t - 5.0).abs() < 1e-4);
        assert_eq!(past_sphere.geom_id, None);
        assert_eq!(past_sphere.material_id, 0);

        let miss = accel.intersect(&scene, &Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::Z));
        assert!(!miss.is_hit());
    }

    #[test]
    fn test_occluded() {
        let scene = scene_with_mesh_and_sphere();
        let accel = SceneAccel::build(&scene).unwrap();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::NEG_Z);

        assert!(accel.occluded(&scene, &ray, 3.0));
        assert!(!accel.occluded(&scene, &ray, 2.0));
    }

    #[test]
    fn test_analytic_only_scene_has_no_bvh() {
        let mut scene = Scene::new(CameraParams::default());
        let m = scene.add_material(Material::default());
        scene.add_geom(GeomKind::Cube, Transform::default(), m).unwrap();

        let accel = SceneAccel::build(&scene).unwrap();
        assert!(accel.bvh().is_none());
        assert!(accel.intersect(&scene, &Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::NEG_Z)).is_hit());
    }

    #[test]
    fn test_stale_after_move() {
        let mut scene = scene_with_mesh_and_sphere();
        let accel = SceneAccel::build(&scene).unwrap();
        assert!(!accel.is_stale(&scene));

        scene
            .set_geom_placement(0, Placement::new(Vec3::new(0.0, 0.0, -4.0), Vec3::ZERO, Vec3::ONE))
            .unwrap();
        assert!(accel.is_stale(&scene));
    }
}
