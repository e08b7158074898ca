//! Uniform grid with 3D-DDA traversal.
//!
//! Cells are stored as index ranges into one shared primitive buffer built by
//! a counting sort. A primitive is referenced by every cell its bounding box
//! overlaps.

use std::ops::ControlFlow;

use lumen_core::{PrimitiveId, Scene};
use lumen_math::{axis_component, Aabb, Ray, Vec3};

use super::{AccelError, AccelResult, GridSettings};
use crate::hit::{Closest, PrimitiveHit};
use crate::intersect::{any_hit_in, nearest_in};

/// Upper bound on cells along one axis.
pub(crate) const MAX_RESOLUTION: u32 = 256;

pub(crate) fn validate_resolution(resolution: [u32; 3]) -> AccelResult<()> {
    if resolution.iter().any(|&r| r == 0 || r > MAX_RESOLUTION) {
        return Err(AccelError::InvalidGridResolution(resolution));
    }
    Ok(())
}

/// Cells per axis for `count` primitives at `density` cells per primitive,
/// keeping cells roughly cubic.
fn resolution_from_density(bounds: &Aabb, count: usize, density: f32) -> [u32; 3] {
    let extent = bounds.extent();
    let volume = bounds.volume().max(f32::MIN_POSITIVE);
    let cells_per_unit = (density * count as f32 / volume).cbrt();
    [extent.x, extent.y, extent.z]
        .map(|e| ((e * cells_per_unit).round() as u32).clamp(1, MAX_RESOLUTION))
}

pub struct UniformGrid {
    bounds: Aabb,
    resolution: [u32; 3],
    cell_size: Vec3,
    /// `cell_starts[c]..cell_starts[c + 1]` indexes `indices` for cell `c`
    cell_starts: Vec<u32>,
    indices: Vec<PrimitiveId>,
}

impl UniformGrid {
    pub fn new(scene: &Scene, settings: &GridSettings) -> Self {
        let bounds = scene.bounds();
        if scene.is_empty() {
            return Self {
                bounds,
                resolution: [1, 1, 1],
                cell_size: Vec3::ONE,
                cell_starts: vec![0, 0],
                indices: Vec::new(),
            };
        }

        let resolution = settings.resolution.unwrap_or_else(|| {
            resolution_from_density(&bounds, scene.primitive_count(), settings.density)
        });
        let cell_size = bounds.extent() / Vec3::new(
            resolution[0] as f32,
            resolution[1] as f32,
            resolution[2] as f32,
        );

        let mut grid = Self {
            bounds,
            resolution,
            cell_size,
            cell_starts: Vec::new(),
            indices: Vec::new(),
        };
        grid.fill(scene);
        grid
    }

    fn fill(&mut self, scene: &Scene) {
        let cell_count = self.cell_count();
        let ranges: Vec<(PrimitiveId, [u32; 3], [u32; 3])> = scene
            .primitive_ids()
            .map(|id| {
                let b = scene.primitive_bounds(id);
                (id, self.cell_of(b.min()), self.cell_of(b.max()))
            })
            .collect();

        // Count references per cell, then turn counts into start offsets
        let mut counts = vec![0u32; cell_count + 1];
        for (_, lo, hi) in &ranges {
            self.for_each_cell(*lo, *hi, |cell| counts[cell] += 1);
        }
        let mut running = 0;
        for count in counts.iter_mut() {
            let c = *count;
            *count = running;
            running += c;
        }

        let mut cursor = counts.clone();
        let mut indices = vec![PrimitiveId::Sphere(0); running as usize];
        for (id, lo, hi) in &ranges {
            self.for_each_cell(*lo, *hi, |cell| {
                indices[cursor[cell] as usize] = *id;
                cursor[cell] += 1;
            });
        }

        let occupied = counts.windows(2).filter(|w| w[1] > w[0]).count();
        log::info!(
            "Grid {}x{}x{}: {} references, {}/{} cells occupied",
            self.resolution[0],
            self.resolution[1],
            self.resolution[2],
            indices.len(),
            occupied,
            cell_count
        );

        self.cell_starts = counts;
        self.indices = indices;
    }

    fn for_each_cell(&self, lo: [u32; 3], hi: [u32; 3], mut f: impl FnMut(usize)) {
        for z in lo[2]..=hi[2] {
            for y in lo[1]..=hi[1] {
                for x in lo[0]..=hi[0] {
                    f(self.cell_index([x, y, z]));
                }
            }
        }
    }

    /// Cell containing `p`, clamped to the grid.
    fn cell_of(&self, p: Vec3) -> [u32; 3] {
        let rel = (p - self.bounds.min()) / self.cell_size;
        let mut cell = [0u32; 3];
        for (axis, c) in cell.iter_mut().enumerate() {
            let max = self.resolution[axis] as i64 - 1;
            *c = (axis_component(rel, axis).floor() as i64).clamp(0, max) as u32;
        }
        cell
    }

    #[inline]
    fn cell_index(&self, cell: [u32; 3]) -> usize {
        let [rx, ry, _] = self.resolution;
        (cell[0] + rx * (cell[1] + ry * cell[2])) as usize
    }

    pub fn cell_count(&self) -> usize {
        self.resolution.iter().map(|&r| r as usize).product()
    }

    pub fn resolution(&self) -> [u32; 3] {
        self.resolution
    }

    #[inline]
    fn cell_primitives(&self, index: usize) -> &[PrimitiveId] {
        let start = self.cell_starts[index] as usize;
        let end = self.cell_starts[index + 1] as usize;
        &self.indices[start..end]
    }

    /// Visit cells front to back. `visit` gets the cell's primitives and
    /// the ray parameter where the ray leaves the cell.
    fn walk(
        &self,
        ray: &Ray,
        mut visit: impl FnMut(&[PrimitiveId], f32) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        if self.indices.is_empty() {
            return ControlFlow::Continue(());
        }
        let Some((t_enter, _)) = self.bounds.intersect(ray, ray.t) else {
            return ControlFlow::Continue(());
        };

        let entry = ray.at(t_enter);
        let cell_start = self.cell_of(entry);
        let min = self.bounds.min();

        let mut cell = [0i64; 3];
        let mut step = [0i64; 3];
        let mut t_next = [f32::INFINITY; 3];
        let mut t_delta = [f32::INFINITY; 3];
        for axis in 0..3 {
            cell[axis] = cell_start[axis] as i64;
            let dir = axis_component(ray.direction, axis);
            let size = axis_component(self.cell_size, axis);
            let origin = axis_component(ray.origin, axis);
            let lo = axis_component(min, axis);
            if dir > 0.0 {
                step[axis] = 1;
                t_next[axis] = (lo + (cell[axis] + 1) as f32 * size - origin) / dir;
                t_delta[axis] = size / dir;
            } else if dir < 0.0 {
                step[axis] = -1;
                t_next[axis] = (lo + cell[axis] as f32 * size - origin) / dir;
                t_delta[axis] = -size / dir;
            }
        }

        loop {
            let index = self.cell_index([cell[0] as u32, cell[1] as u32, cell[2] as u32]);
            let axis = if t_next[0] < t_next[1] && t_next[0] < t_next[2] {
                0
            } else if t_next[1] < t_next[2] {
                1
            } else {
                2
            };
            let cell_exit = t_next[axis];

            visit(self.cell_primitives(index), cell_exit)?;

            if cell_exit >= ray.max_t() {
                return ControlFlow::Continue(());
            }
            cell[axis] += step[axis];
            if cell[axis] < 0 || cell[axis] >= self.resolution[axis] as i64 {
                return ControlFlow::Continue(());
            }
            t_next[axis] += t_delta[axis];
        }
    }

    pub fn any_hit(&self, scene: &Scene, ray: &Ray) -> bool {
        self.walk(ray, |ids, _| {
            if any_hit_in(scene, ids, ray) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .is_break()
    }

    pub fn nearest(&self, scene: &Scene, ray: &Ray) -> Option<PrimitiveHit> {
        let mut closest = Closest::new();
        let _ = self.walk(ray, |ids, cell_exit| {
            nearest_in(scene, ids, ray, &mut closest);
            // Later cells only hold hits past this cell's exit
            if closest.settled_before(cell_exit) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        closest.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{Material, SceneBuilder, Sphere};

    fn row_of_spheres(n: usize) -> Scene {
        let mut builder = SceneBuilder::new();
        let m = builder.add_material(Material::default());
        for i in 0..n {
            builder.add_sphere(Sphere::new(Vec3::new(i as f32 * 4.0, 0.0, 0.0), 1.0, m));
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_density_resolution() {
        let scene = row_of_spheres(8);
        let grid = UniformGrid::new(&scene, &GridSettings::default());
        let [rx, ry, rz] = grid.resolution();

        // Long along X, thin along Y and Z
        assert!(rx > ry && rx > rz);
        assert!(ry >= 1 && rz >= 1);
    }

    #[test]
    fn test_every_primitive_referenced() {
        let scene = row_of_spheres(8);
        let grid = UniformGrid::new(
            &scene,
            &GridSettings {
                resolution: Some([8, 2, 2]),
                ..Default::default()
            },
        );
        assert_eq!(grid.cell_count(), 32);

        for id in scene.primitive_ids() {
            assert!(grid.indices.contains(&id), "{:?} missing", id);
        }
        assert_eq!(*grid.cell_starts.last().unwrap() as usize, grid.indices.len());
    }

    #[test]
    fn test_dda_along_row() {
        let scene = row_of_spheres(8);
        let grid = UniformGrid::new(
            &scene,
            &GridSettings {
                resolution: Some([16, 1, 1]),
                ..Default::default()
            },
        );

        let ray = Ray::new(Vec3::new(-10.0, 0.0, 0.0), Vec3::X);
        let hit = grid.nearest(&scene, &ray).unwrap();
        assert_eq!(hit.primitive, PrimitiveId::Sphere(0));
        assert!((hit.t - 9.0).abs() < 1e-3);

        let back = Ray::new(Vec3::new(100.0, 0.0, 0.0), -Vec3::X);
        let hit = grid.nearest(&scene, &back).unwrap();
        assert_eq!(hit.primitive, PrimitiveId::Sphere(7));
        assert!((hit.t - (100.0 - 29.0)).abs() < 1e-3);
    }

    #[test]
    fn test_dda_starting_inside() {
        let scene = row_of_spheres(8);
        let grid = UniformGrid::new(&scene, &GridSettings::default());

        // Between sphere 2 and sphere 3, looking down +X
        let ray = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::X);
        let hit = grid.nearest(&scene, &ray).unwrap();
        assert_eq!(hit.primitive, PrimitiveId::Sphere(3));
        assert!((hit.t - 1.0).abs() < 1e-3);

        let shadow = Ray::with_range(Vec3::new(10.0, 0.0, 0.0), Vec3::X, 0.001, 0.5);
        assert!(!grid.any_hit(&scene, &shadow));
    }

    #[test]
    fn test_rejects_bad_resolution() {
        assert!(validate_resolution([1, 1, 1]).is_ok());
        assert!(validate_resolution([0, 4, 4]).is_err());
        assert!(validate_resolution([MAX_RESOLUTION + 1, 1, 1]).is_err());
    }
}
