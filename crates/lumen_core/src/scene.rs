//! Scene tables for the renderer.
//!
//! A `Scene` owns the flat arrays the path tracer reads: analytic geometry
//! instances, world-space triangles baked from meshes, the material table,
//! the light list and the camera. The renderer treats all of it as
//! read-only; `generation()` changes whenever geometry moves so cached
//! acceleration structures know to rebuild.

use lumen_math::{Placement, Transform};
use serde::{Deserialize, Serialize};

use crate::camera::CameraParams;
use crate::error::SceneError;
use crate::geometry::{Geom, GeomKind};
use crate::material::{Color, Material};
use crate::mesh::{Mesh, Triangle};

/// An emitting geometry instance that can be sampled for direct lighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Light {
    pub geom_id: usize,
}

/// A complete scene description.
#[derive(Clone, Debug)]
pub struct Scene {
    pub camera: CameraParams,

    /// Radiance returned by rays that leave the scene
    pub background: Color,

    geoms: Vec<Geom>,
    meshes: Vec<Mesh>,
    triangles: Vec<Triangle>,
    materials: Vec<Material>,
    lights: Vec<Light>,
    generation: u64,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(camera: CameraParams) -> Self {
        Self {
            camera,
            background: Color::ZERO,
            geoms: Vec::new(),
            meshes: Vec::new(),
            triangles: Vec::new(),
            materials: Vec::new(),
            lights: Vec::new(),
            generation: 0,
        }
    }

    /// Set background color.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Add a material to the scene and return its ID.
    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Add an analytic shape and return its geometry ID.
    ///
    /// Shapes with an emissive material are registered as lights.
    pub fn add_geom(
        &mut self,
        kind: GeomKind,
        transform: Transform,
        material_id: usize,
    ) -> Result<usize, SceneError> {
        let geom_id = self.geoms.len();
        if !kind.is_analytic() {
            // Mesh instances must come through add_mesh so triangles exist.
            return Err(SceneError::MissingMesh {
                geom: geom_id,
                mesh: self.meshes.len(),
            });
        }
        let material = self
            .materials
            .get(material_id)
            .ok_or(SceneError::MissingMaterial {
                geom: geom_id,
                material: material_id,
            })?;

        if material.is_emissive() {
            self.lights.push(Light { geom_id });
        }
        self.geoms.push(Geom::new(kind, transform, material_id));
        self.generation += 1;
        Ok(geom_id)
    }

    /// Add a mesh instance, baking its triangles into world space.
    ///
    /// Emissive meshes still emit when hit but are not light-sampled.
    pub fn add_mesh(
        &mut self,
        mesh: Mesh,
        transform: Transform,
        material_id: usize,
    ) -> Result<usize, SceneError> {
        let geom_id = self.geoms.len();
        if material_id >= self.materials.len() {
            return Err(SceneError::MissingMaterial {
                geom: geom_id,
                material: material_id,
            });
        }

        let baked = mesh.to_triangles(&transform, material_id);
        let kind = GeomKind::Mesh {
            mesh_id: self.meshes.len(),
            first_triangle: self.triangles.len(),
            triangle_count: baked.len(),
        };

        log::debug!("Baked mesh geometry {}: {} triangles", geom_id, baked.len());

        self.triangles.extend(baked);
        self.meshes.push(mesh);
        self.geoms.push(Geom::new(kind, transform, material_id));
        self.generation += 1;
        Ok(geom_id)
    }

    /// Add a pre-baked world-space triangle outside any mesh instance.
    pub fn add_triangle(&mut self, triangle: Triangle) -> usize {
        self.triangles.push(triangle);
        self.generation += 1;
        self.triangles.len() - 1
    }

    /// Move a geometry instance.
    ///
    /// Its transforms are recomputed; mesh instances are re-baked in place.
    pub fn set_geom_placement(&mut self, geom_id: usize, placement: Placement) -> Result<(), SceneError> {
        let geom = self
            .geoms
            .get_mut(geom_id)
            .ok_or(SceneError::NoSuchGeometry(geom_id))?;
        geom.set_placement(placement);

        if let GeomKind::Mesh {
            mesh_id,
            first_triangle,
            triangle_count,
        } = geom.kind
        {
            let mesh = self.meshes.get(mesh_id).ok_or(SceneError::MissingMesh {
                geom: geom_id,
                mesh: mesh_id,
            })?;
            let baked = mesh.to_triangles(&geom.transform, geom.material_id);
            let range = first_triangle..first_triangle + triangle_count;
            if baked.len() == triangle_count {
                self.triangles[range].copy_from_slice(&baked);
            }
        }

        self.generation += 1;
        Ok(())
    }

    /// Check every cross-table index once, before rendering starts.
    pub fn validate(&self) -> Result<(), SceneError> {
        let res = self.camera.resolution;
        if res.x == 0 || res.y == 0 {
            return Err(SceneError::ZeroResolution {
                width: res.x,
                height: res.y,
            });
        }

        if self.geoms.is_empty() && self.triangles.is_empty() {
            return Err(SceneError::Empty);
        }

        for (material_id, material) in self.materials.iter().enumerate() {
            if let Some(ior) = material.bsdf.ior() {
                if !(ior.is_finite() && ior > 0.0) {
                    return Err(SceneError::InvalidIor {
                        material: material_id,
                        ior,
                    });
                }
            }
        }

        for (geom_id, geom) in self.geoms.iter().enumerate() {
            if geom.material_id >= self.materials.len() {
                return Err(SceneError::MissingMaterial {
                    geom: geom_id,
                    material: geom.material_id,
                });
            }
            if let GeomKind::Mesh {
                mesh_id,
                first_triangle,
                triangle_count,
            } = geom.kind
            {
                if mesh_id >= self.meshes.len() || first_triangle + triangle_count > self.triangles.len() {
                    return Err(SceneError::MissingMesh {
                        geom: geom_id,
                        mesh: mesh_id,
                    });
                }
            }
        }

        for (triangle_id, tri) in self.triangles.iter().enumerate() {
            if tri.material_id >= self.materials.len() {
                return Err(SceneError::MissingTriangleMaterial {
                    triangle: triangle_id,
                    material: tri.material_id,
                });
            }
        }

        for (light_id, light) in self.lights.iter().enumerate() {
            let geom = self.geoms.get(light.geom_id).ok_or(SceneError::MissingLightGeometry {
                light: light_id,
                geom: light.geom_id,
            })?;
            if !geom.kind.is_analytic() {
                return Err(SceneError::UnsupportedLightShape {
                    light: light_id,
                    geom: light.geom_id,
                });
            }
            if !self.materials[geom.material_id].is_emissive() {
                return Err(SceneError::LightNotEmissive {
                    light: light_id,
                    geom: light.geom_id,
                });
            }
        }

        log::info!(
            "Scene validated: {} geoms, {} triangles, {} materials, {} lights",
            self.geoms.len(),
            self.triangles.len(),
            self.materials.len(),
            self.lights.len()
        );

        Ok(())
    }

    pub fn geoms(&self) -> &[Geom] {
        &self.geoms
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Get a material by ID.
    pub fn material(&self, id: usize) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Replace the light list (for loaders that build it themselves).
    pub fn set_lights(&mut self, lights: Vec<Light>) {
        self.lights = lights;
    }

    /// Counter bumped on every geometry change.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn unit_quad_mesh() -> Mesh {
        Mesh::new(
            vec![
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
            ],
            vec![0, 1, 2, 1, 3, 2],
            None,
        )
    }

    #[test]
    fn test_emissive_geom_registers_light() {
        let mut scene = Scene::new(CameraParams::default());
        let white = scene.add_material(Material::diffuse(Vec3::splat(0.8)));
        let lamp = scene.add_material(Material::light(Vec3::ONE, 5.0));

        scene.add_geom(GeomKind::Sphere, Transform::default(), white).unwrap();
        let light_geom = scene.add_geom(GeomKind::SquarePlane, Transform::default(), lamp).unwrap();

        assert_eq!(scene.lights(), &[Light { geom_id: light_geom }]);
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn test_missing_material_rejected() {
        let mut scene = Scene::new(CameraParams::default());
        let err = scene.add_geom(GeomKind::Cube, Transform::default(), 7).unwrap_err();
        assert_eq!(err, SceneError::MissingMaterial { geom: 0, material: 7 });
    }

    #[test]
    fn test_empty_scene_rejected() {
        let scene = Scene::new(CameraParams::default());
        assert_eq!(scene.validate(), Err(SceneError::Empty));
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let mut scene = Scene::new(CameraParams::default().with_resolution(0, 10));
        let m = scene.add_material(Material::default());
        scene.add_geom(GeomKind::Sphere, Transform::default(), m).unwrap();

        assert!(matches!(scene.validate(), Err(SceneError::ZeroResolution { .. })));
    }

    #[test]
    fn test_non_emissive_light_rejected() {
        let mut scene = Scene::new(CameraParams::default());
        let m = scene.add_material(Material::default());
        scene.add_geom(GeomKind::Sphere, Transform::default(), m).unwrap();
        scene.set_lights(vec![Light { geom_id: 0 }]);

        assert_eq!(
            scene.validate(),
            Err(SceneError::LightNotEmissive { light: 0, geom: 0 })
        );
    }

    #[test]
    fn test_mesh_placement_rebakes_triangles() {
        let mut scene = Scene::new(CameraParams::default());
        let m = scene.add_material(Material::default());
        let geom = scene.add_mesh(unit_quad_mesh(), Transform::default(), m).unwrap();
        let before = scene.generation();

        assert_eq!(scene.triangles().len(), 2);
        scene
            .set_geom_placement(geom, Placement::new(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::ONE))
            .unwrap();

        assert!(scene.generation() > before);
        for tri in scene.triangles() {
            assert!((tri.p0.z - 3.0).abs() < 1e-5);
        }
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn test_set_placement_unknown_geom() {
        let mut scene = Scene::new(CameraParams::default());
        assert_eq!(
            scene.set_geom_placement(4, Placement::default()),
            Err(SceneError::NoSuchGeometry(4))
        );
    }
}
