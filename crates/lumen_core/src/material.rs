//! Analytic materials.
//!
//! A material is one tagged BSDF variant with its own parameters plus an
//! emission term. Variants are dispatched with `match` in the renderer, so
//! every material has the same layout regardless of kind.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Color type alias (linear RGB)
pub type Color = Vec3;

/// Scattering model of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Bsdf {
    /// Lambertian reflection.
    DiffuseReflection { reflectance: Color },

    /// Lambertian transmission into the opposite hemisphere.
    DiffuseTransmission { transmittance: Color },

    /// Perfect mirror.
    SpecularReflection { reflectance: Color },

    /// Perfect refraction (no reflected lobe).
    SpecularTransmission { transmittance: Color, ior: f32 },

    /// Fresnel-weighted choice between mirror reflection and refraction.
    Glass {
        reflectance: Color,
        transmittance: Color,
        ior: f32,
    },

    /// Diffuse base under a Fresnel-weighted mirror coat.
    Plastic {
        diffuse: Color,
        specular: Color,
        ior: f32,
    },

    /// GGX microfacet reflection with Schlick Fresnel tinted by `reflectance`.
    Microfacet { reflectance: Color, roughness: f32 },
}

impl Bsdf {
    /// True when every sampled direction is a delta (mirror/refraction).
    ///
    /// Such bounces cannot be light-sampled, so the next hit must count
    /// emission directly.
    pub fn is_delta(&self) -> bool {
        matches!(
            self,
            Bsdf::SpecularReflection { .. } | Bsdf::SpecularTransmission { .. } | Bsdf::Glass { .. }
        )
    }

    /// Index of refraction, for variants that have one.
    pub fn ior(&self) -> Option<f32> {
        match *self {
            Bsdf::SpecularTransmission { ior, .. } | Bsdf::Glass { ior, .. } | Bsdf::Plastic { ior, .. } => {
                Some(ior)
            }
            _ => None,
        }
    }
}

/// A surface material: scattering plus optional emission.
///
/// A non-zero `emittance` makes every surface using this material a light.
/// Emitted radiance is `emission * emittance`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub bsdf: Bsdf,

    /// Emission color (RGB, 0-1)
    #[serde(default = "default_emission")]
    pub emission: Color,

    /// Emission strength; zero for non-lights
    #[serde(default)]
    pub emittance: f32,
}

fn default_emission() -> Color {
    Color::ONE
}

impl Default for Material {
    fn default() -> Self {
        Self::diffuse(Color::new(0.5, 0.5, 0.5))
    }
}

impl Material {
    pub fn new(bsdf: Bsdf) -> Self {
        Self {
            bsdf,
            emission: Color::ONE,
            emittance: 0.0,
        }
    }

    /// Create a Lambertian material with the given albedo color.
    pub fn diffuse(reflectance: Color) -> Self {
        Self::new(Bsdf::DiffuseReflection { reflectance })
    }

    pub fn mirror(reflectance: Color) -> Self {
        Self::new(Bsdf::SpecularReflection { reflectance })
    }

    /// Clear glass with the given index of refraction.
    pub fn glass(ior: f32) -> Self {
        Self::new(Bsdf::Glass {
            reflectance: Color::ONE,
            transmittance: Color::ONE,
            ior,
        })
    }

    pub fn plastic(diffuse: Color, ior: f32) -> Self {
        Self::new(Bsdf::Plastic {
            diffuse,
            specular: Color::ONE,
            ior,
        })
    }

    pub fn microfacet(reflectance: Color, roughness: f32) -> Self {
        Self::new(Bsdf::Microfacet {
            reflectance,
            roughness: roughness.clamp(0.0, 1.0),
        })
    }

    /// Diffuse emitter. The surface itself reflects nothing.
    pub fn light(emission: Color, emittance: f32) -> Self {
        Self {
            bsdf: Bsdf::DiffuseReflection {
                reflectance: Color::ZERO,
            },
            emission,
            emittance,
        }
    }

    /// Check if this material is emissive.
    pub fn is_emissive(&self) -> bool {
        self.emittance > 0.0 && self.emission.max_element() > 0.0
    }

    /// Emitted radiance (zero for non-lights).
    pub fn emitted(&self) -> Color {
        if self.is_emissive() {
            self.emission * self.emittance
        } else {
            Color::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_default_is_grey_diffuse() {
        let mat = Material::default();
        assert!(!mat.is_emissive());
        assert_eq!(mat.emitted(), Color::ZERO);
        assert!(matches!(mat.bsdf, Bsdf::DiffuseReflection { .. }));
    }

    #[test]
    fn test_light_emission() {
        let mat = Material::light(Color::new(1.0, 0.5, 0.25), 4.0);
        assert!(mat.is_emissive());
        assert_eq!(mat.emitted(), Color::new(4.0, 2.0, 1.0));
    }

    #[test]
    fn test_delta_classification() {
        assert!(Material::mirror(Color::ONE).bsdf.is_delta());
        assert!(Material::glass(1.5).bsdf.is_delta());
        assert!(!Material::plastic(Color::ONE, 1.5).bsdf.is_delta());
        assert!(!Material::microfacet(Color::ONE, 0.3).bsdf.is_delta());
        assert!(!Material::diffuse(Color::ONE).bsdf.is_delta());
    }

    #[test]
    fn test_material_from_json() {
        let json = r#"{
            "bsdf": { "type": "glass", "reflectance": [1.0, 1.0, 1.0], "transmittance": [0.9, 0.9, 1.0], "ior": 1.5 },
            "emittance": 0.0
        }"#;
        let mat: Material = serde_json::from_str(json).unwrap();

        assert_eq!(mat.bsdf.ior(), Some(1.5));
        assert_eq!(mat.emission, Color::ONE);
        assert!(!mat.is_emissive());
    }
}
