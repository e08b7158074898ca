//! Surface materials and point lights.

use lumen_math::{Color, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{SceneError, SceneResult};

/// Index of a material in [`crate::Scene::materials`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(pub u32);

impl MaterialId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A surface with three ideal lobes: diffuse, mirror and transmission.
///
/// `reflectivity` and `transparency` are the probabilities of choosing the
/// mirror and refraction lobes; the remainder goes to the diffuse lobe.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Diffuse albedo (RGB, 0-1)
    pub diffuse: Color,

    /// Probability of an ideal mirror bounce
    pub reflectivity: f32,

    /// Probability of an ideal refraction
    pub transparency: f32,

    /// Index of refraction of the object interior
    pub ior: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: Color::new(0.5, 0.5, 0.5),
            reflectivity: 0.0,
            transparency: 0.0,
            ior: 1.0,
        }
    }
}

impl Material {
    /// Purely diffuse material.
    pub fn diffuse(color: Color) -> Self {
        Self {
            diffuse: color,
            ..Default::default()
        }
    }

    /// Mirror with the given reflect probability; the rest is diffuse `color`.
    pub fn mirror(color: Color, reflectivity: f32) -> Self {
        Self {
            diffuse: color,
            reflectivity,
            ..Default::default()
        }
    }

    /// Fully transparent dielectric.
    pub fn glass(ior: f32) -> Self {
        Self {
            diffuse: Color::ONE,
            reflectivity: 0.0,
            transparency: 1.0,
            ior,
        }
    }

    /// Probability mass left for the diffuse lobe.
    #[inline]
    pub fn diffuse_probability(&self) -> f32 {
        (1.0 - self.reflectivity - self.transparency).max(0.0)
    }

    /// Check the lobe probabilities and index of refraction.
    pub fn validate(&self, index: usize) -> SceneResult<()> {
        let invalid = |reason: String| SceneError::InvalidMaterial { index, reason };

        if !(self.reflectivity >= 0.0 && self.transparency >= 0.0) {
            return Err(invalid(format!(
                "negative lobe probability (reflectivity {}, transparency {})",
                self.reflectivity, self.transparency
            )));
        }
        // Small slack for values like 0.7 + 0.3 that round above 1
        if self.reflectivity + self.transparency > 1.0 + 1e-6 {
            return Err(invalid(format!(
                "reflectivity + transparency = {} exceeds 1",
                self.reflectivity + self.transparency
            )));
        }
        if !(self.ior > 0.0) {
            return Err(invalid(format!("index of refraction {} must be positive", self.ior)));
        }
        if !self.diffuse.is_finite() {
            return Err(invalid("diffuse color is not finite".to_string()));
        }
        Ok(())
    }
}

/// A point light with inverse-square falloff.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec3,
    /// Emitted radiance (RGB, unbounded)
    pub radiance: Color,
}

impl Light {
    pub fn new(position: Vec3, radiance: Color) -> Self {
        Self { position, radiance }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diffuse_probability() {
        let m = Material {
            reflectivity: 0.25,
            transparency: 0.5,
            ..Default::default()
        };
        assert!((m.diffuse_probability() - 0.25).abs() < 1e-6);
        assert!(
            (m.reflectivity + m.transparency + m.diffuse_probability() - 1.0).abs() < 1e-6
        );
    }

    #[test]
    fn test_validate_rejects_excess_probability() {
        let m = Material {
            reflectivity: 0.7,
            transparency: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            m.validate(3),
            Err(SceneError::InvalidMaterial { index: 3, .. })
        ));
    }

    #[test]
    fn test_validate_accepts_presets() {
        assert!(Material::diffuse(Color::ONE).validate(0).is_ok());
        assert!(Material::mirror(Color::ONE, 0.9).validate(0).is_ok());
        assert!(Material::glass(1.5).validate(0).is_ok());
        assert!(Material {
            reflectivity: 0.7,
            transparency: 0.3,
            ..Default::default()
        }
        .validate(0)
        .is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_ior() {
        let m = Material {
            ior: 0.0,
            ..Default::default()
        };
        assert!(m.validate(0).is_err());
    }

    #[test]
    fn test_material_json_defaults() {
        let m: Material = serde_json::from_str(r#"{ "reflectivity": 0.5 }"#).unwrap();
        assert_eq!(m.reflectivity, 0.5);
        assert_eq!(m.transparency, 0.0);
        assert_eq!(m.ior, 1.0);
    }
}
