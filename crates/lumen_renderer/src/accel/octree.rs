//! Octree with parametric (Revelles) traversal.
//!
//! Reference: Revelles, Urena, Lastra, "An Efficient Parametric Algorithm for
//! Octree Traversal" (WSCG 2000).
//!
//! Child `c` of a node covers the upper half along X when `c & 4` is set,
//! along Y for `c & 2` and along Z for `c & 1`. Traversal mirrors the ray so
//! every direction component is positive and records the mirrored axes in a
//! 3-bit flag; the child actually stored at traversal position `c` is
//! `c ^ flag`.

use lumen_core::{PrimitiveId, Scene};
use lumen_math::{Aabb, Ray, Vec3};

use super::OctreeSettings;
use crate::constants::TRAVERSAL_STACK_CAPACITY;
use crate::hit::{Closest, PrimitiveHit};
use crate::intersect::{any_hit_in, nearest_in};
use crate::stack::{report_overflow, FixedStack};

/// Next-node sentinel: all children of the node are done.
const POP: u8 = 8;
/// Frame state before the entry child is chosen.
const UNVISITED: u8 = 9;

/// Next child after leaving child `c` through its X, Y or Z exit plane.
const NEXT_NODE: [[u8; 3]; 8] = [
    [4, 2, 1],
    [5, 3, POP],
    [6, POP, 3],
    [7, POP, POP],
    [POP, 6, 5],
    [POP, 7, POP],
    [POP, POP, 7],
    [POP, POP, POP],
];

/// Stand-in for zero direction components after mirroring.
const MIN_DIRECTION: f32 = 1e-8;

#[derive(Debug, Clone, Copy)]
enum OctreeNode {
    Leaf { start: u32, count: u32 },
    Internal { first_child: u32 },
}

#[derive(Debug, Clone, Copy, Default)]
struct Frame {
    node: u32,
    t0: Vec3,
    t1: Vec3,
    next: u8,
}

pub struct Octree {
    bounds: Aabb,
    nodes: Vec<OctreeNode>,
    indices: Vec<PrimitiveId>,
}

/// Entry child from the node's entry times and midpoints.
fn first_node(t0: Vec3, tm: Vec3) -> u8 {
    let mut child = 0;
    if t0.x >= t0.y && t0.x >= t0.z {
        // Entered through the YZ plane
        if tm.y < t0.x {
            child |= 2;
        }
        if tm.z < t0.x {
            child |= 1;
        }
    } else if t0.y >= t0.z {
        // XZ plane
        if tm.x < t0.y {
            child |= 4;
        }
        if tm.z < t0.y {
            child |= 1;
        }
    } else {
        // XY plane
        if tm.x < t0.z {
            child |= 4;
        }
        if tm.y < t0.z {
            child |= 2;
        }
    }
    child
}

/// Follow the exit plane with the smallest exit time.
fn next_node(child: u8, t1: Vec3) -> u8 {
    let [x, y, z] = NEXT_NODE[child as usize];
    if t1.x < t1.y {
        if t1.x < t1.z {
            return x;
        }
    } else if t1.y < t1.z {
        return y;
    }
    z
}

/// Parametric entry and exit of child `c` given the parent's times.
fn child_interval(child: u8, t0: Vec3, tm: Vec3, t1: Vec3) -> (Vec3, Vec3) {
    let pick = |bit: u8, lo: f32, mid: f32, hi: f32| {
        if child & bit != 0 {
            (mid, hi)
        } else {
            (lo, mid)
        }
    };
    let (x0, x1) = pick(4, t0.x, tm.x, t1.x);
    let (y0, y1) = pick(2, t0.y, tm.y, t1.y);
    let (z0, z1) = pick(1, t0.z, tm.z, t1.z);
    (Vec3::new(x0, y0, z0), Vec3::new(x1, y1, z1))
}

fn child_bounds(bounds: &Aabb, child: u8) -> Aabb {
    let lo = bounds.min();
    let hi = bounds.max();
    let mid = bounds.centroid();
    let split = |bit: u8, l: f32, m: f32, h: f32| if child & bit != 0 { (m, h) } else { (l, m) };
    let (x0, x1) = split(4, lo.x, mid.x, hi.x);
    let (y0, y1) = split(2, lo.y, mid.y, hi.y);
    let (z0, z1) = split(1, lo.z, mid.z, hi.z);
    Aabb::from_points(Vec3::new(x0, y0, z0), Vec3::new(x1, y1, z1))
}

struct OctreeBuilder<'a> {
    primitives: &'a [(PrimitiveId, Aabb)],
    settings: &'a OctreeSettings,
    nodes: Vec<OctreeNode>,
    indices: Vec<PrimitiveId>,
    max_depth_reached: u32,
}

impl OctreeBuilder<'_> {
    fn leaf(&mut self, node: usize, items: &[usize]) {
        let start = self.indices.len() as u32;
        self.indices
            .extend(items.iter().map(|&i| self.primitives[i].0));
        self.nodes[node] = OctreeNode::Leaf {
            start,
            count: items.len() as u32,
        };
    }

    fn subdivide(&mut self, node: usize, bounds: Aabb, items: Vec<usize>, depth: u32) {
        self.max_depth_reached = self.max_depth_reached.max(depth);

        if depth >= self.settings.max_depth || items.len() <= self.settings.leaf_size as usize {
            self.leaf(node, &items);
            return;
        }

        let children: [(Aabb, Vec<usize>); 8] = std::array::from_fn(|child| {
            let cb = child_bounds(&bounds, child as u8);
            let child_items = items
                .iter()
                .copied()
                .filter(|&i| self.primitives[i].1.overlaps(&cb))
                .collect();
            (cb, child_items)
        });

        // Splitting only copies the node into several children: overlapping
        // primitives that no plane will ever separate
        let occupied = children.iter().filter(|(_, c)| !c.is_empty()).count();
        if occupied > 1
            && children
                .iter()
                .all(|(_, c)| c.is_empty() || c.len() == items.len())
        {
            self.leaf(node, &items);
            return;
        }

        let first_child = self.nodes.len();
        self.nodes
            .extend([OctreeNode::Leaf { start: 0, count: 0 }; 8]);
        self.nodes[node] = OctreeNode::Internal {
            first_child: first_child as u32,
        };

        for (child, (cb, child_items)) in children.into_iter().enumerate() {
            self.subdivide(first_child + child, cb, child_items, depth + 1);
        }
    }
}

impl Octree {
    pub fn new(scene: &Scene, settings: &OctreeSettings) -> Self {
        let bounds = scene.bounds();
        let primitives: Vec<(PrimitiveId, Aabb)> = scene
            .primitive_ids()
            .map(|id| (id, scene.primitive_bounds(id)))
            .collect();

        let mut builder = OctreeBuilder {
            primitives: &primitives,
            settings,
            nodes: vec![OctreeNode::Leaf { start: 0, count: 0 }],
            indices: Vec::new(),
            max_depth_reached: 0,
        };
        builder.subdivide(0, bounds, (0..primitives.len()).collect(), 0);

        log::info!(
            "Octree: {} nodes, depth {}, {} references",
            builder.nodes.len(),
            builder.max_depth_reached,
            builder.indices.len()
        );

        Self {
            bounds,
            nodes: builder.nodes,
            indices: builder.indices,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Visit leaves front to back. `visit` gets the leaf's primitives and the
    /// ray parameter where the ray leaves it; returning true stops traversal.
    fn walk(&self, ray: &Ray, mut visit: impl FnMut(&[PrimitiveId], f32) -> bool) {
        if self.indices.is_empty() {
            return;
        }

        let lo = self.bounds.min();
        let hi = self.bounds.max();
        let mut origin = ray.origin;
        let mut direction = ray.direction;
        let mut flag = 0u8;

        if direction.x < 0.0 {
            origin.x = lo.x + hi.x - origin.x;
            direction.x = -direction.x;
            flag |= 4;
        }
        if direction.y < 0.0 {
            origin.y = lo.y + hi.y - origin.y;
            direction.y = -direction.y;
            flag |= 2;
        }
        if direction.z < 0.0 {
            origin.z = lo.z + hi.z - origin.z;
            direction.z = -direction.z;
            flag |= 1;
        }
        let direction = direction.max(Vec3::splat(MIN_DIRECTION));

        let t0 = (lo - origin) / direction;
        let t1 = (hi - origin) / direction;
        if t0.max_element() > t1.min_element() {
            return;
        }

        let mut stack: FixedStack<Frame, TRAVERSAL_STACK_CAPACITY> = FixedStack::new();
        let _ = stack.push(Frame {
            node: 0,
            t0,
            t1,
            next: UNVISITED,
        });

        while let Some(frame) = stack.last_mut() {
            // Entirely behind the ray start or past its end
            if frame.t1.min_element() < ray.min_t() || frame.t0.max_element() >= ray.max_t() {
                stack.pop();
                continue;
            }

            match self.nodes[frame.node as usize] {
                OctreeNode::Leaf { start, count } => {
                    let exit = frame.t1.min_element();
                    stack.pop();
                    let ids = &self.indices[start as usize..(start + count) as usize];
                    if !ids.is_empty() && visit(ids, exit) {
                        return;
                    }
                }
                OctreeNode::Internal { first_child } => {
                    let tm = 0.5 * (frame.t0 + frame.t1);
                    if frame.next == UNVISITED {
                        frame.next = first_node(frame.t0, tm);
                    }
                    if frame.next == POP {
                        stack.pop();
                        continue;
                    }

                    let current = frame.next;
                    let (c0, c1) = child_interval(current, frame.t0, tm, frame.t1);
                    frame.next = next_node(current, c1);

                    let child = Frame {
                        node: first_child + (current ^ flag) as u32,
                        t0: c0,
                        t1: c1,
                        next: UNVISITED,
                    };
                    if !stack.push(child) {
                        report_overflow("Octree", TRAVERSAL_STACK_CAPACITY);
                        return;
                    }
                }
            }
        }
    }

    pub fn any_hit(&self, scene: &Scene, ray: &Ray) -> bool {
        let mut found = false;
        self.walk(ray, |ids, _| {
            found = any_hit_in(scene, ids, ray);
            found
        });
        found
    }

    pub fn nearest(&self, scene: &Scene, ray: &Ray) -> Option<PrimitiveHit> {
        let mut closest = Closest::new();
        self.walk(ray, |ids, exit| {
            nearest_in(scene, ids, ray, &mut closest);
            closest.settled_before(exit)
        });
        closest.get()
    }
}
