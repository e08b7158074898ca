//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Nodes live in one flat array; the root is node 0. Construction is a simple
//! median split along the longest centroid axis. Traversal is front to back
//! with an explicit fixed-size stack.

use std::ops::ControlFlow;

use lumen_core::{PrimitiveId, Scene};
use lumen_math::{axis_component, Aabb, Interval, Ray, Vec3};

use super::BvhSettings;
use crate::constants::TRAVERSAL_STACK_CAPACITY;
use crate::hit::{Closest, PrimitiveHit};
use crate::intersect::{any_hit_in, nearest_in};
use crate::stack::{report_overflow, FixedStack};

#[derive(Debug, Clone, Copy)]
enum BvhNodeKind {
    /// Primitives `indices[start..start + count]`
    Leaf { start: u32, count: u32 },
    Internal { left: u32, right: u32 },
}

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    bounds: Aabb,
    kind: BvhNodeKind,
}

struct BuildItem {
    id: PrimitiveId,
    bounds: Aabb,
    centroid: Vec3,
}

pub struct Bvh {
    nodes: Vec<BvhNode>,
    indices: Vec<PrimitiveId>,
}

impl Bvh {
    pub fn new(scene: &Scene, settings: &BvhSettings) -> Self {
        let mut items: Vec<BuildItem> = scene
            .primitive_ids()
            .map(|id| {
                let bounds = scene.primitive_bounds(id);
                BuildItem {
                    id,
                    bounds,
                    centroid: bounds.centroid(),
                }
            })
            .collect();

        let mut bvh = Self {
            nodes: Vec::with_capacity(items.len() * 2),
            indices: Vec::with_capacity(items.len()),
        };
        if !items.is_empty() {
            bvh.build(&mut items, settings.leaf_size.max(1) as usize);
        }

        log::info!(
            "BVH: {} nodes over {} primitives",
            bvh.nodes.len(),
            bvh.indices.len()
        );
        bvh
    }

    /// Recursive BVH construction. Returns the index of the new node.
    ///
    /// Sort items by centroid on the axis of largest centroid spread,
    /// split in half, recurse.
    fn build(&mut self, items: &mut [BuildItem], leaf_size: usize) -> u32 {
        let bounds = items
            .iter()
            .fold(Aabb::EMPTY, |acc, item| Aabb::surrounding(&acc, &item.bounds));

        let index = self.nodes.len();
        self.nodes.push(BvhNode {
            bounds,
            kind: BvhNodeKind::Leaf { start: 0, count: 0 },
        });

        if items.len() <= leaf_size {
            let start = self.indices.len() as u32;
            self.indices.extend(items.iter().map(|item| item.id));
            self.nodes[index].kind = BvhNodeKind::Leaf {
                start,
                count: items.len() as u32,
            };
            return index as u32;
        }

        let centroid_bounds = items.iter().fold(Aabb::EMPTY, |acc, item| {
            Aabb::surrounding(&acc, &Aabb::from_points(item.centroid, item.centroid))
        });
        let axis = centroid_bounds.longest_axis();

        items.sort_unstable_by(|a, b| {
            axis_component(a.centroid, axis)
                .partial_cmp(&axis_component(b.centroid, axis))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mid = items.len() / 2;
        let (left_items, right_items) = items.split_at_mut(mid);
        let left = self.build(left_items, leaf_size);
        let right = self.build(right_items, leaf_size);

        self.nodes[index].kind = BvhNodeKind::Internal { left, right };
        index as u32
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Visit leaves front to back. `visit` returns the current limit on hit
    /// distance (nodes entered past it are skipped) or breaks to stop.
    fn walk(&self, ray: &Ray, mut visit: impl FnMut(&[PrimitiveId]) -> ControlFlow<(), f32>) {
        let Some(root) = self.nodes.first() else {
            return;
        };
        let inv_direction = ray.direction.recip();
        let Some((root_entry, _)) = root.bounds.intersect_with_inv(ray.origin, inv_direction, ray.t)
        else {
            return;
        };

        let mut limit = ray.max_t();
        let mut stack: FixedStack<(u32, f32), TRAVERSAL_STACK_CAPACITY> = FixedStack::new();
        let _ = stack.push((0, root_entry));

        while let Some((index, entry)) = stack.pop() {
            if entry >= limit {
                continue;
            }

            match self.nodes[index as usize].kind {
                BvhNodeKind::Leaf { start, count } => {
                    let ids = &self.indices[start as usize..(start + count) as usize];
                    match visit(ids) {
                        ControlFlow::Break(()) => return,
                        ControlFlow::Continue(new_limit) => limit = new_limit,
                    }
                }
                BvhNodeKind::Internal { left, right } => {
                    let range = Interval::new(ray.min_t(), limit);
                    let enter = |child: u32| {
                        self.nodes[child as usize]
                            .bounds
                            .intersect_with_inv(ray.origin, inv_direction, range)
                            .map(|(t, _)| (child, t))
                    };

                    let (near, far) = match (enter(left), enter(right)) {
                        (Some(l), Some(r)) if r.1 < l.1 => (r, Some(l)),
                        (Some(l), r) => (l, r),
                        (None, Some(r)) => (r, None),
                        (None, None) => continue,
                    };

                    // Far child first so the near child is popped next
                    if let Some(far) = far {
                        if far.1 < limit && !stack.push(far) {
                            report_overflow("BVH", TRAVERSAL_STACK_CAPACITY);
                            return;
                        }
                    }
                    if !stack.push(near) {
                        report_overflow("BVH", TRAVERSAL_STACK_CAPACITY);
                        return;
                    }
                }
            }
        }
    }

    pub fn any_hit(&self, scene: &Scene, ray: &Ray) -> bool {
        let mut found = false;
        self.walk(ray, |ids| {
            if any_hit_in(scene, ids, ray) {
                found = true;
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(ray.max_t())
            }
        });
        found
    }

    pub fn nearest(&self, scene: &Scene, ray: &Ray) -> Option<PrimitiveHit> {
        let mut closest = Closest::new();
        self.walk(ray, |ids| {
            nearest_in(scene, ids, ray, &mut closest);
            ControlFlow::Continue(closest.limit(ray.max_t()))
        });
        closest.get()
    }
}
