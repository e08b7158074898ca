//! Spatial acceleration structures.
//!
//! Every structure answers the same two queries over an immutable [`Scene`]:
//! [`Accelerator::any_hit`] for shadow rays and [`Accelerator::nearest_hit`]
//! for the integrator. Traversal never allocates and never fails; all
//! validation happens in [`Accelerator::build`].

mod bvh;
mod grid;
mod list;
mod octree;

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use lumen_core::Scene;
use lumen_math::Ray;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::TRAVERSAL_STACK_CAPACITY;
use crate::hit::{PrimitiveHit, ShadingRecord};
use crate::intersect::shade;

pub use bvh::Bvh;
pub use grid::UniformGrid;
pub use list::ListAccel;
pub use octree::Octree;

/// Errors raised while building an acceleration structure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccelError {
    #[error("Invalid grid resolution {0:?}: each axis needs between 1 and 256 cells")]
    InvalidGridResolution([u32; 3]),

    #[error("Invalid grid density {0}: must be positive and finite")]
    InvalidGridDensity(f32),

    #[error("Octree depth {depth} does not fit the traversal stack of {capacity}")]
    OctreeTooDeep { depth: u32, capacity: usize },

    #[error("{0} leaf size must be at least 1")]
    ZeroLeafSize(&'static str),
}

pub type AccelResult<T> = Result<T, AccelError>;

/// Which acceleration structure to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceleratorKind {
    List,
    Grid,
    Octree,
    #[default]
    Bvh,
}

impl AcceleratorKind {
    pub const ALL: [AcceleratorKind; 4] = [
        AcceleratorKind::List,
        AcceleratorKind::Grid,
        AcceleratorKind::Octree,
        AcceleratorKind::Bvh,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AcceleratorKind::List => "list",
            AcceleratorKind::Grid => "grid",
            AcceleratorKind::Octree => "octree",
            AcceleratorKind::Bvh => "bvh",
        }
    }
}

impl fmt::Display for AcceleratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AcceleratorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown accelerator '{}' (expected list, grid, octree or bvh)", s))
    }
}

/// Uniform grid sizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Explicit cells per axis. Overrides `density` when set.
    pub resolution: Option<[u32; 3]>,
    /// Target cells per primitive when `resolution` is unset
    pub density: f32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            resolution: None,
            density: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeSettings {
    pub max_depth: u32,
    /// Nodes with at most this many primitives become leaves
    pub leaf_size: u32,
}

impl Default for OctreeSettings {
    fn default() -> Self {
        Self {
            max_depth: 8,
            leaf_size: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhSettings {
    /// Maximum primitives per leaf node before splitting
    pub leaf_size: u32,
}

impl Default for BvhSettings {
    fn default() -> Self {
        Self { leaf_size: 4 }
    }
}

/// Build parameters for every structure.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccelSettings {
    pub grid: GridSettings,
    pub octree: OctreeSettings,
    pub bvh: BvhSettings,
}

impl AccelSettings {
    pub fn validate(&self) -> AccelResult<()> {
        if let Some(resolution) = self.grid.resolution {
            grid::validate_resolution(resolution)?;
        } else if !(self.grid.density > 0.0 && self.grid.density.is_finite()) {
            return Err(AccelError::InvalidGridDensity(self.grid.density));
        }
        if self.octree.max_depth as usize >= TRAVERSAL_STACK_CAPACITY {
            return Err(AccelError::OctreeTooDeep {
                depth: self.octree.max_depth,
                capacity: TRAVERSAL_STACK_CAPACITY,
            });
        }
        if self.octree.leaf_size == 0 {
            return Err(AccelError::ZeroLeafSize("Octree"));
        }
        if self.bvh.leaf_size == 0 {
            return Err(AccelError::ZeroLeafSize("BVH"));
        }
        Ok(())
    }
}

/// One of the four acceleration structures, built over a scene.
pub enum Accelerator {
    List(ListAccel),
    Grid(UniformGrid),
    Octree(Octree),
    Bvh(Bvh),
}

impl Accelerator {
    /// Build the chosen structure. Fails only on invalid settings.
    pub fn build(scene: &Scene, kind: AcceleratorKind, settings: &AccelSettings) -> AccelResult<Self> {
        settings.validate()?;

        let start = Instant::now();
        let accel = match kind {
            AcceleratorKind::List => Accelerator::List(ListAccel::new(scene)),
            AcceleratorKind::Grid => Accelerator::Grid(UniformGrid::new(scene, &settings.grid)),
            AcceleratorKind::Octree => Accelerator::Octree(Octree::new(scene, &settings.octree)),
            AcceleratorKind::Bvh => Accelerator::Bvh(Bvh::new(scene, &settings.bvh)),
        };
        log::info!(
            "Built {} over {} primitives in {:?}",
            kind,
            scene.primitive_count(),
            start.elapsed()
        );

        Ok(accel)
    }

    pub fn kind(&self) -> AcceleratorKind {
        match self {
            Accelerator::List(_) => AcceleratorKind::List,
            Accelerator::Grid(_) => AcceleratorKind::Grid,
            Accelerator::Octree(_) => AcceleratorKind::Octree,
            Accelerator::Bvh(_) => AcceleratorKind::Bvh,
        }
    }

    /// True if anything blocks the ray inside `[min_t, max_t)`.
    pub fn any_hit(&self, scene: &Scene, ray: &Ray) -> bool {
        match self {
            Accelerator::List(list) => list.any_hit(scene, ray),
            Accelerator::Grid(grid) => grid.any_hit(scene, ray),
            Accelerator::Octree(octree) => octree.any_hit(scene, ray),
            Accelerator::Bvh(bvh) => bvh.any_hit(scene, ray),
        }
    }

    /// The nearest primitive along the ray, without shading.
    pub fn nearest_primitive(&self, scene: &Scene, ray: &Ray) -> Option<PrimitiveHit> {
        match self {
            Accelerator::List(list) => list.nearest(scene, ray),
            Accelerator::Grid(grid) => grid.nearest(scene, ray),
            Accelerator::Octree(octree) => octree.nearest(scene, ray),
            Accelerator::Bvh(bvh) => bvh.nearest(scene, ray),
        }
    }

    /// The nearest hit with full shading data.
    pub fn nearest_hit(&self, scene: &Scene, ray: &Ray) -> Option<ShadingRecord> {
        self.nearest_primitive(scene, ray)
            .map(|hit| shade(scene, ray, hit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{Material, Mesh, SceneBuilder, Sphere};
    use lumen_math::{Color, Vec3};

    fn small_scene() -> Scene {
        let mut builder = SceneBuilder::new();
        let m = builder.add_material(Material::diffuse(Color::ONE));
        for i in 0..5 {
            builder.add_sphere(Sphere::new(Vec3::new(i as f32 * 3.0, 0.0, 10.0), 1.0, m));
        }
        builder.add_mesh(Mesh::quad(
            [
                Vec3::new(-5.0, -2.0, 0.0),
                Vec3::new(20.0, -2.0, 0.0),
                Vec3::new(20.0, -2.0, 20.0),
                Vec3::new(-5.0, -2.0, 20.0),
            ],
            m,
        ));
        builder.build().unwrap()
    }

    #[test]
    fn test_kind_parse_and_display() {
        for kind in AcceleratorKind::ALL {
            assert_eq!(kind.to_string().parse::<AcceleratorKind>().unwrap(), kind);
        }
        assert_eq!("BVH".parse::<AcceleratorKind>().unwrap(), AcceleratorKind::Bvh);
        assert!("kdtree".parse::<AcceleratorKind>().is_err());
    }

    #[test]
    fn test_kind_serde() {
        let kind: AcceleratorKind = serde_json::from_str("\"octree\"").unwrap();
        assert_eq!(kind, AcceleratorKind::Octree);
        assert_eq!(serde_json::to_string(&AcceleratorKind::Grid).unwrap(), "\"grid\"");
    }

    #[test]
    fn test_settings_validation() {
        assert!(AccelSettings::default().validate().is_ok());

        let mut settings = AccelSettings::default();
        settings.octree.max_depth = TRAVERSAL_STACK_CAPACITY as u32;
        assert!(matches!(settings.validate(), Err(AccelError::OctreeTooDeep { .. })));

        let mut settings = AccelSettings::default();
        settings.grid.resolution = Some([4, 0, 4]);
        assert!(matches!(settings.validate(), Err(AccelError::InvalidGridResolution(_))));

        let mut settings = AccelSettings::default();
        settings.grid.density = -1.0;
        assert!(matches!(settings.validate(), Err(AccelError::InvalidGridDensity(_))));

        let mut settings = AccelSettings::default();
        settings.bvh.leaf_size = 0;
        assert_eq!(settings.validate(), Err(AccelError::ZeroLeafSize("BVH")));
    }

    #[test]
    fn test_every_kind_finds_same_sphere() {
        let scene = small_scene();
        let ray = Ray::new(Vec3::new(6.0, 0.0, 0.0), Vec3::Z);

        for kind in AcceleratorKind::ALL {
            let accel = Accelerator::build(&scene, kind, &AccelSettings::default()).unwrap();
            assert_eq!(accel.kind(), kind);

            let rec = accel.nearest_hit(&scene, &ray).unwrap();
            assert!((rec.t - 9.0).abs() < 1e-3, "{}: t = {}", kind, rec.t);
            assert_eq!(rec.primitive, lumen_core::PrimitiveId::Sphere(2));
            assert!(accel.any_hit(&scene, &ray));

            // Shadow ray stopping short of the sphere
            let short = Ray::with_range(Vec3::new(6.0, 0.0, 0.0), Vec3::Z, 0.001, 8.5);
            assert!(!accel.any_hit(&scene, &short), "{}", kind);
        }
    }

    #[test]
    fn test_every_kind_misses_outside_bounds() {
        let scene = small_scene();
        let ray = Ray::new(Vec3::new(0.0, 50.0, 0.0), Vec3::Y);

        for kind in AcceleratorKind::ALL {
            let accel = Accelerator::build(&scene, kind, &AccelSettings::default()).unwrap();
            assert!(accel.nearest_hit(&scene, &ray).is_none());
            assert!(!accel.any_hit(&scene, &ray));
        }
    }

    #[test]
    fn test_every_kind_handles_empty_scene() {
        let scene = SceneBuilder::new().build().unwrap();
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);

        for kind in AcceleratorKind::ALL {
            let accel = Accelerator::build(&scene, kind, &AccelSettings::default()).unwrap();
            assert!(accel.nearest_hit(&scene, &ray).is_none());
            assert!(!accel.any_hit(&scene, &ray));
        }
    }
}
