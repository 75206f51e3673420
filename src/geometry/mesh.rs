use std::time::Instant;

use crate::direction::{Direction, Dot};
use crate::geometry::{
    Axis, BBox, IntersectionInfo, Ray, INF, MAX_TREE_DEPTH, TRIANGLES_PER_LEAF,
};
use crate::point::Point;
use crate::vector::Vector2f;

/// Indices into the mesh arrays plus everything precomputable per triangle:
/// the two edges, their cross product (the unnormalised geometric normal) and
/// the texture-space normal derivatives used for bump mapping.
#[derive(Debug, Clone)]
pub struct Triangle {
    pub v: [usize; 3],
    pub n: [usize; 3],
    pub t: [usize; 3],
    pub gnormal: Direction,
    pub ab: Direction,
    pub ac: Direction,
    pub ab_cross_ac: Direction,
    pub dndx: Direction,
    pub dndy: Direction,
}

impl Triangle {
    pub fn new(v: [usize; 3], n: [usize; 3], t: [usize; 3]) -> Triangle {
        Triangle {
            v,
            n,
            t,
            gnormal: Direction::zero(),
            ab: Direction::zero(),
            ac: Direction::zero(),
            ab_cross_ac: Direction::zero(),
            dndx: Direction::zero(),
            dndy: Direction::zero(),
        }
    }
}

/// A KD-tree node either owns the indices of the triangles inside its cell,
/// or splits the cell in two along an axis-aligned wall. Triangles straddling
/// a wall are listed in both children, never dropped.
#[derive(Debug, Clone)]
pub enum KdNode {
    Leaf(Vec<usize>),
    Split {
        axis: Axis,
        pos: f64,
        left: Box<KdNode>,
        right: Box<KdNode>,
    },
}

#[derive(Clone)]
pub struct Mesh {
    pub vertices: Vec<Point>,
    pub normals: Vec<Direction>,
    pub uvs: Vec<Vector2f>,
    pub triangles: Vec<Triangle>,
    bbox: BBox,
    kdroot: Option<Box<KdNode>>,
    pub faceted: bool,
    pub back_face_culling: bool,
    pub use_kd_tree: bool,
    pub auto_smooth: bool,
}

struct BuildStats {
    depth_sum: u64,
    num_leaves: u64,
}

impl Mesh {
    pub fn new(
        vertices: Vec<Point>,
        normals: Vec<Direction>,
        uvs: Vec<Vector2f>,
        triangles: Vec<Triangle>,
    ) -> Mesh {
        let mut mesh = Mesh {
            vertices,
            normals,
            uvs,
            triangles,
            bbox: BBox::empty(),
            kdroot: None,
            faceted: false,
            back_face_culling: true,
            use_kd_tree: true,
            auto_smooth: true,
        };
        mesh.setup_triangles();
        mesh
    }

    fn setup_triangles(&mut self) {
        if self.uvs.is_empty() {
            self.uvs.push(Vector2f::zero());
        }
        for t in &mut self.triangles {
            let a = self.vertices[t.v[0]];
            let b = self.vertices[t.v[1]];
            let c = self.vertices[t.v[2]];
            t.ab = b - a;
            t.ac = c - a;
            t.ab_cross_ac = t.ab.cross(t.ac);
            t.gnormal = t.ab_cross_ac.normalize();

            // (1, 0) = px * texAB + qx * texAC
            // (0, 1) = py * texAB + qy * texAC
            let tex_a = self.uvs[t.t[0]];
            let tex_b = self.uvs[t.t[1]];
            let tex_c = self.uvs[t.t[2]];
            let tex_ab = tex_b - tex_a;
            let tex_ac = tex_c - tex_a;

            if let (Some((px, qx)), Some((py, qy))) = (
                solve_2d(tex_ab, tex_ac, Vector2f(1.0, 0.0)),
                solve_2d(tex_ab, tex_ac, Vector2f(0.0, 1.0)),
            ) {
                t.dndx = (t.ab * px + t.ac * qx).normalize();
                t.dndy = (t.ab * py + t.ac * qy).normalize();
            }
        }
    }

    fn compute_bounding_geometry(&mut self) {
        self.bbox = BBox::empty();
        for v in &self.vertices {
            self.bbox.add(*v);
        }
    }

    pub fn begin_render(&mut self) {
        self.compute_bounding_geometry();
        self.kdroot = None;
        println!("Mesh loaded, {} triangles", self.triangles.len());

        if self.triangles.len() > 50 && self.use_kd_tree {
            let started = Instant::now();
            let mut stats = BuildStats {
                depth_sum: 0,
                num_leaves: 0,
            };
            let triangle_list: Vec<usize> = (0..self.triangles.len()).collect();
            let root = self.build_kd(self.bbox, triangle_list, 0, &mut stats);
            self.kdroot = Some(Box::new(root));
            println!(
                " -> KD-tree built in {:.2}s, avg depth = {:.1}",
                started.elapsed().as_secs_f64(),
                stats.depth_sum as f64 / stats.num_leaves.max(1) as f64
            );
        }

        if self.normals.len() <= 1 && self.auto_smooth {
            self.normals = vec![Direction::zero(); self.vertices.len()];
            for t in &mut self.triangles {
                t.n = t.v;
                for i in 0..3 {
                    self.normals[t.n[i]] += t.gnormal;
                }
            }
            for n in self.normals.iter_mut() {
                if n.length_squared() > 1e-9 {
                    *n = n.normalize();
                }
            }
        }
        // smooth shading without normals reverts to faceted
        if self.normals.len() <= 1 {
            self.faceted = true;
        }
    }

    fn build_kd(
        &self,
        bbox: BBox,
        triangle_list: Vec<usize>,
        depth: u32,
        stats: &mut BuildStats,
    ) -> KdNode {
        if depth >= MAX_TREE_DEPTH || triangle_list.len() < TRIANGLES_PER_LEAF {
            stats.depth_sum += u64::from(depth);
            stats.num_leaves += 1;
            return KdNode::Leaf(triangle_list);
        }

        let axis = Axis::from_depth(depth);
        let left_limit = bbox.vmin.component(axis.index());
        let right_limit = bbox.vmax.component(axis.index());
        let split_pos = (left_limit + right_limit) * 0.5;

        let (bbox_left, bbox_right) = bbox.split(axis, split_pos);
        let mut triangles_left = Vec::new();
        let mut triangles_right = Vec::new();

        for triangle_idx in triangle_list {
            let t = &self.triangles[triangle_idx];
            let a = self.vertices[t.v[0]];
            let b = self.vertices[t.v[1]];
            let c = self.vertices[t.v[2]];

            if bbox_left.intersect_triangle(a, b, c) {
                triangles_left.push(triangle_idx);
            }
            if bbox_right.intersect_triangle(a, b, c) {
                triangles_right.push(triangle_idx);
            }
        }

        KdNode::Split {
            axis,
            pos: split_pos,
            left: Box::new(self.build_kd(bbox_left, triangles_left, depth + 1, stats)),
            right: Box::new(self.build_kd(bbox_right, triangles_right, depth + 1, stats)),
        }
    }

    /// Writes into `info` only for an accepted crossing that improves
    /// `info.distance`; callers pre-initialise the distance accordingly.
    fn intersect_triangle(&self, ray: &Ray, t: &Triangle, info: &mut IntersectionInfo) -> bool {
        if self.back_face_culling && ray.dir.dot(t.gnormal) > 0.0 {
            return false;
        }
        let a = self.vertices[t.v[0]];

        let h = ray.start - a;
        let d = ray.dir;

        let dcr = -t.ab_cross_ac.dot(d);
        if dcr.abs() < 1e-12 {
            return false;
        }

        let r_dcr = 1.0 / dcr;
        let gamma = t.ab_cross_ac.dot(h) * r_dcr;
        if gamma < 0.0 || gamma > info.distance {
            return false;
        }

        let h_cross_d = h.cross(d);
        let lambda2 = h_cross_d.dot(t.ac) * r_dcr;
        if !(0.0..=1.0).contains(&lambda2) {
            return false;
        }

        let lambda3 = -t.ab.dot(h_cross_d) * r_dcr;
        if !(0.0..=1.0).contains(&lambda3) {
            return false;
        }

        if lambda2 + lambda3 > 1.0 {
            return false;
        }

        info.distance = gamma;
        info.ip = ray.start + ray.dir * gamma;
        if !self.faceted {
            let na = self.normals[t.n[0]];
            let nb = self.normals[t.n[1]];
            let nc = self.normals[t.n[2]];
            info.normal = (na + (nb - na) * lambda2 + (nc - na) * lambda3).normalize();
        } else {
            info.normal = t.gnormal;
        }

        info.dndx = t.dndx;
        info.dndy = t.dndy;

        let uv_a = self.uvs[t.t[0]];
        let uv_b = self.uvs[t.t[1]];
        let uv_c = self.uvs[t.t[2]];
        let uv = uv_a + (uv_b - uv_a) * lambda2 + (uv_c - uv_a) * lambda3;
        info.u = uv.0;
        info.v = uv.1;

        true
    }

    fn intersect_kd(
        &self,
        node: &KdNode,
        bbox: BBox,
        ray: &Ray,
        info: &mut IntersectionInfo,
    ) -> bool {
        match node {
            KdNode::Leaf(triangles) => {
                let mut found = false;
                for &tri_idx in triangles {
                    if self.intersect_triangle(ray, &self.triangles[tri_idx], info) {
                        found = true;
                    }
                }
                // duplicated straddlers may yield a hit in another leaf's
                // cell; only accept hits inside this one
                found && bbox.inside(info.ip)
            }
            KdNode::Split {
                axis,
                pos,
                left,
                right,
            } => {
                let (bbox_left, bbox_right) = bbox.split(*axis, *pos);
                let (first, first_bb, second, second_bb) =
                    if ray.start.component(axis.index()) > *pos {
                        (right, bbox_right, left, bbox_left)
                    } else {
                        (left, bbox_left, right, bbox_right)
                    };

                // a ray crossing the common wall invariably visits both
                // cells; nearer first, farther only if the nearer misses
                if bbox.intersect_wall(*axis, *pos, ray) {
                    if self.intersect_kd(first, first_bb, ray, info) {
                        return true;
                    }
                    self.intersect_kd(second, second_bb, ray, info)
                } else if first_bb.test_intersect(ray) {
                    self.intersect_kd(first, first_bb, ray, info)
                } else {
                    self.intersect_kd(second, second_bb, ray, info)
                }
            }
        }
    }

    pub fn intersect(&self, ray: &Ray, info: &mut IntersectionInfo) -> bool {
        if !self.bbox.test_intersect(ray) {
            return false;
        }

        info.distance = INF;
        if let Some(root) = &self.kdroot {
            self.intersect_kd(root, self.bbox, ray, info)
        } else {
            let mut found = false;
            for t in &self.triangles {
                if self.intersect_triangle(ray, t, info) {
                    found = true;
                }
            }
            found
        }
    }
}

/// Möller-Trumbore-style test used by the box/triangle overlap code; only
/// the distance is refined, nothing else is computed.
pub(crate) fn intersect_triangle_fast(
    ray: &Ray,
    a: Point,
    b: Point,
    c: Point,
    dist: &mut f64,
) -> bool {
    let ab = b - a;
    let ac = c - a;
    let d = -ray.dir;
    let h = ray.start - a;

    let ab_cross_ac = ab.cross(ac);
    let dcr = ab_cross_ac.dot(d);

    if dcr.abs() < 1e-12 {
        return false;
    }

    let lambda2 = h.cross(ac).dot(d) / dcr;
    let lambda3 = ab.cross(h).dot(d) / dcr;
    let gamma = ab_cross_ac.dot(h) / dcr;

    if gamma < 0.0 || gamma > *dist {
        return false;
    }
    if lambda2 < 0.0 || lambda2 > 1.0 || lambda3 < 0.0 || lambda3 > 1.0 || lambda2 + lambda3 > 1.0
    {
        return false;
    }

    *dist = gamma;
    true
}

/// Solves x * a + y * b = c in 2D; `None` for a degenerate system.
fn solve_2d(a: Vector2f, b: Vector2f, c: Vector2f) -> Option<(f64, f64)> {
    let dcr = a.0 * b.1 - b.0 * a.1;
    if dcr.abs() < 1e-12 {
        return None;
    }
    let x = (c.0 * b.1 - c.1 * b.0) / dcr;
    let y = (a.0 * c.1 - a.1 * c.0) / dcr;
    Some((x, y))
}
