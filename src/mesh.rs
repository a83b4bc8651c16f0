use std::f32::consts::PI;

use glam::Vec3;
use log::warn;
use serde::{Deserialize, Serialize};

/// Index value that terminates one triangle strip and starts the next.
pub const STRIP_RESTART: u32 = u32::MAX;

/// Interleaved attribute layout of a mesh's vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexLayout {
    /// `position.xyz`
    Position,
    /// `position.xyz`, `normal.xyz`, `uv.st`
    PositionNormalUv,
}

impl VertexLayout {
    /// Number of floats per vertex.
    pub const fn stride(self) -> usize {
        match self {
            Self::Position => 3,
            Self::PositionNormalUv => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topology {
    TriangleList,
    /// Indexed strips separated by [`STRIP_RESTART`].
    TriangleStrip,
}

/// CPU-side mesh produced once at startup and uploaded to the GPU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub layout: VertexLayout,
    pub topology: Topology,
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    /// Explicit line-list outline. Empty when the wireframe is derived from the
    /// triangles.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outline: Vec<u32>,
}

impl Mesh {
    pub fn empty(layout: VertexLayout, topology: Topology) -> Self {
        Self {
            layout,
            topology,
            vertices: Vec::new(),
            indices: Vec::new(),
            outline: Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.layout.stride()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iterates over the position attribute of every vertex.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices
            .chunks_exact(self.layout.stride())
            .map(|chunk| Vec3::new(chunk[0], chunk[1], chunk[2]))
    }

    /// Line-list indices used for the wireframe overlay.
    ///
    /// Returns the explicit outline when the mesh carries one, otherwise every
    /// triangle edge. Strip edges never cross a restart marker.
    pub fn wireframe_indices(&self) -> Vec<u32> {
        if !self.outline.is_empty() {
            return self.outline.clone();
        }
        let mut lines = Vec::new();
        match self.topology {
            Topology::TriangleList => {
                for triangle in self.indices.chunks_exact(3) {
                    let [a, b, c] = [triangle[0], triangle[1], triangle[2]];
                    lines.extend_from_slice(&[a, b, b, c, c, a]);
                }
            }
            Topology::TriangleStrip => {
                for strip in self.indices.split(|&index| index == STRIP_RESTART) {
                    for k in 0..strip.len() {
                        if k + 1 < strip.len() {
                            lines.extend_from_slice(&[strip[k], strip[k + 1]]);
                        }
                        if k + 2 < strip.len() {
                            lines.extend_from_slice(&[strip[k], strip[k + 2]]);
                        }
                    }
                }
            }
        }
        lines
    }

    fn push_position(&mut self, position: Vec3) {
        self.vertices
            .extend_from_slice(&[position.x, position.y, position.z]);
    }

    fn push_textured(&mut self, position: Vec3, normal: Vec3, s: f32, t: f32) {
        self.vertices.extend_from_slice(&[
            position.x, position.y, position.z, normal.x, normal.y, normal.z, s, t,
        ]);
    }
}

/// Sequential indices for `strips` strips of `strip_len` vertices each.
fn strip_indices(strips: usize, strip_len: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity(strips * (strip_len + 1));
    for strip in 0..strips {
        if strip > 0 {
            indices.push(STRIP_RESTART);
        }
        let first = strip * strip_len;
        indices.extend((first..first + strip_len).map(|index| index as u32));
    }
    indices
}

/// Indexed UV sphere with the poles on the Z axis.
///
/// Each stack carries `slices + 1` vertices; the seam column repeats the first
/// position with `s = 1`. The first and last stacks only get one triangle per
/// sector since the other one collapses at the pole.
pub fn uv_sphere(radius: f32, stacks: u32, slices: u32) -> Mesh {
    let mut mesh = Mesh::empty(VertexLayout::PositionNormalUv, Topology::TriangleList);
    let sector_step = 2.0 * PI / slices as f32;
    let stack_step = PI / stacks as f32;

    for i in 0..=stacks {
        let stack_angle = PI / 2.0 - i as f32 * stack_step;
        let (sin_u, cos_u) = stack_angle.sin_cos();
        for j in 0..=slices {
            let sector_angle = j as f32 * sector_step;
            let (sin_v, cos_v) = sector_angle.sin_cos();
            let normal = Vec3::new(cos_u * cos_v, cos_u * sin_v, sin_u);
            let s = j as f32 / slices as f32;
            let t = i as f32 / stacks as f32;
            mesh.push_textured(normal * radius, normal, s, t);
        }
    }

    for i in 0..stacks {
        let mut k1 = i * (slices + 1);
        let mut k2 = k1 + slices + 1;
        for _ in 0..slices {
            if i != 0 {
                mesh.indices.extend_from_slice(&[k1, k2, k1 + 1]);
            }
            if i + 1 != stacks {
                mesh.indices.extend_from_slice(&[k1 + 1, k2, k2 + 1]);
            }
            k1 += 1;
            k2 += 1;
        }
    }
    mesh
}

/// Sphere emitted as one triangle strip per stack, north pole first.
pub fn sphere_strip(radius: f32, slices: u32, stacks: u32) -> Mesh {
    let mut mesh = Mesh::empty(VertexLayout::PositionNormalUv, Topology::TriangleStrip);
    let drho = PI / stacks as f32;
    let dtheta = 2.0 * PI / slices as f32;
    let ds = 1.0 / slices as f32;
    let dt = 1.0 / stacks as f32;

    let mut t = 1.0;
    for i in 0..stacks {
        let rho = i as f32 * drho;
        let (srho, crho) = rho.sin_cos();
        let (srho_next, crho_next) = (rho + drho).sin_cos();

        let mut s = 0.0;
        for j in 0..=slices {
            let theta = if j == slices { 0.0 } else { j as f32 * dtheta };
            let (stheta, ctheta) = (-theta.sin(), theta.cos());

            let upper = Vec3::new(stheta * srho, ctheta * srho, crho);
            mesh.push_textured(upper * radius, upper, s, t);
            let lower = Vec3::new(stheta * srho_next, ctheta * srho_next, crho_next);
            mesh.push_textured(lower * radius, lower, s, t - dt);
            s += ds;
        }
        t -= dt;
    }

    mesh.indices = strip_indices(stacks as usize, 2 * (slices as usize + 1));
    mesh
}

/// Torus around the Z axis, one strip per major segment.
pub fn torus(major_radius: f32, minor_radius: f32, num_major: u32, num_minor: u32) -> Mesh {
    let mut mesh = Mesh::empty(VertexLayout::Position, Topology::TriangleStrip);
    let major_step = 2.0 * PI / num_major as f32;
    let minor_step = 2.0 * PI / num_minor as f32;

    for i in 0..num_major {
        let a0 = i as f32 * major_step;
        let a1 = a0 + major_step;
        let (y0, x0) = a0.sin_cos();
        let (y1, x1) = a1.sin_cos();

        for j in 0..=num_minor {
            let b = j as f32 * minor_step;
            let r = minor_radius * b.cos() + major_radius;
            let z = minor_radius * b.sin();
            mesh.push_position(Vec3::new(x0 * r, y0 * r, z));
            mesh.push_position(Vec3::new(x1 * r, y1 * r, z));
        }
    }

    mesh.indices = strip_indices(num_major as usize, 2 * (num_minor as usize + 1));
    mesh
}

/// Default surface height: `sin(b) * sqrt(|a|)`.
pub fn surface_height(a: f32, b: f32) -> f32 {
    b.sin() * a.abs().sqrt()
}

/// Largest grid accepted by [`surface`]; `2 * (n+1)^2` vertices stay well
/// inside `u32` indices.
pub const MAX_GRID_STEPS: usize = 4096;

/// Number of grid steps between `min` and `max`, or `None` for an empty or
/// oversized range.
fn grid_steps(step: f32, min: f32, max: f32) -> Option<usize> {
    if !(step > 0.0) || !(max >= min) {
        return None;
    }
    let steps = ((max - min) / step + 1e-4).floor();
    if !steps.is_finite() || steps > MAX_GRID_STEPS as f32 {
        warn!("surface grid of {steps} steps exceeds {MAX_GRID_STEPS}; emitting an empty mesh");
        return None;
    }
    Some(steps as usize)
}

/// Height field over `[min, max]²` sampled every `step`, one strip per X row.
///
/// Vertices are `(x, height(z, x), z)` paired with the next row at `x + step`.
pub fn surface(step: f32, min: f32, max: f32, height: impl Fn(f32, f32) -> f32) -> Mesh {
    let mut mesh = Mesh::empty(VertexLayout::Position, Topology::TriangleStrip);
    let Some(steps) = grid_steps(step, min, max) else {
        return mesh;
    };

    for i in 0..=steps {
        let x = min + i as f32 * step;
        for k in 0..=steps {
            let z = min + k as f32 * step;
            mesh.push_position(Vec3::new(x, height(z, x), z));
            mesh.push_position(Vec3::new(x + step, height(z, x + step), z));
        }
    }

    mesh.indices = strip_indices(steps + 1, 2 * (steps + 1));
    mesh
}

const CUBE_INDICES: [u32; 36] = [
    0, 1, 2, 2, 3, 0, // back
    4, 5, 6, 6, 7, 4, // front
    5, 1, 2, 2, 6, 5, // right
    0, 4, 7, 7, 3, 0, // left
    7, 6, 2, 2, 3, 7, // top
    0, 1, 5, 5, 4, 0, // bottom
];

const CUBE_OUTLINE: [u32; 48] = [
    0, 1, 1, 2, 2, 3, 3, 0, //
    4, 5, 5, 6, 6, 7, 7, 4, //
    5, 1, 1, 2, 2, 6, 6, 5, //
    4, 0, 0, 3, 3, 7, 7, 4, //
    0, 1, 1, 5, 5, 4, 4, 0, //
    3, 2, 2, 6, 6, 7, 7, 3, //
];

/// Axis-aligned cube centred on the origin with its edges as outline.
pub fn cube(half_extent: f32) -> Mesh {
    let h = half_extent;
    let mut mesh = Mesh::empty(VertexLayout::Position, Topology::TriangleList);
    for corner in [
        Vec3::new(-h, -h, -h),
        Vec3::new(h, -h, -h),
        Vec3::new(h, h, -h),
        Vec3::new(-h, h, -h),
        Vec3::new(-h, -h, h),
        Vec3::new(h, -h, h),
        Vec3::new(h, h, h),
        Vec3::new(-h, h, h),
    ] {
        mesh.push_position(corner);
    }
    mesh.indices = CUBE_INDICES.to_vec();
    mesh.outline = CUBE_OUTLINE.to_vec();
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn sphere_positions_lie_on_radius() {
        let mesh = uv_sphere(3.0, 12, 16);
        for position in mesh.positions() {
            assert!((position.length() - 3.0).abs() < EPS, "{position:?}");
        }
    }

    #[test]
    fn sphere_counts_follow_stacks_and_slices() {
        let mesh = uv_sphere(1.0, 50, 50);
        assert_eq!(mesh.vertex_count(), 51 * 51);
        assert_eq!(mesh.indices.len(), 6 * 50 * 49);
        let max = *mesh.indices.iter().max().unwrap();
        assert!((max as usize) < mesh.vertex_count());
    }

    #[test]
    fn sphere_normals_are_unit_and_uvs_in_range() {
        let mesh = uv_sphere(2.5, 8, 10);
        for vertex in mesh.vertices.chunks_exact(8) {
            let normal = Vec3::new(vertex[3], vertex[4], vertex[5]);
            assert!((normal.length() - 1.0).abs() < EPS);
            assert!((0.0..=1.0).contains(&vertex[6]));
            assert!((0.0..=1.0).contains(&vertex[7]));
        }
    }

    #[test]
    fn single_stack_sphere_has_no_triangles() {
        let mesh = uv_sphere(1.0, 1, 6);
        assert_eq!(mesh.vertex_count(), 2 * 7);
        assert!(mesh.indices.is_empty());
    }

    #[test]
    fn zero_slices_do_not_panic() {
        let mesh = uv_sphere(1.0, 0, 0);
        assert_eq!(mesh.vertex_count(), 1);
        assert!(mesh.indices.is_empty());
        let strip = sphere_strip(1.0, 0, 0);
        assert!(strip.is_empty());
    }

    #[test]
    fn sphere_strip_positions_lie_on_radius() {
        let mesh = sphere_strip(5.0, 20, 10);
        assert_eq!(mesh.vertex_count(), 2 * 10 * 21);
        for position in mesh.positions() {
            assert!((position.length() - 5.0).abs() < EPS);
        }
        let restarts = mesh
            .indices
            .iter()
            .filter(|&&index| index == STRIP_RESTART)
            .count();
        assert_eq!(restarts, 9);
    }

    #[test]
    fn sphere_strip_pairs_share_longitude() {
        let mesh = sphere_strip(2.0, 4, 2);
        let uv = |index: usize| {
            let vertex = &mesh.vertices[index * 8..index * 8 + 8];
            (vertex[6], vertex[7])
        };
        assert_eq!(uv(0), (0.0, 1.0));
        assert_eq!(uv(1), (0.0, 0.5));
        assert_eq!(uv(2), (0.25, 1.0));
        assert_eq!(uv(3), (0.25, 0.5));
        // second stack starts where the first one ended
        assert_eq!(uv(10), (0.0, 0.5));
        assert!((uv(11).1).abs() < EPS);

        for vertex in mesh.vertices.chunks_exact(8) {
            let position = Vec3::new(vertex[0], vertex[1], vertex[2]);
            let normal = Vec3::new(vertex[3], vertex[4], vertex[5]);
            assert!((normal - position / 2.0).length() < EPS);
        }
    }

    #[test]
    fn torus_points_stay_within_tube() {
        let (major, minor) = (5.0, 3.0);
        let mesh = torus(major, minor, 40, 20);
        assert_eq!(mesh.vertex_count(), 2 * 40 * 21);
        for position in mesh.positions() {
            let planar = position.truncate().length();
            assert!(planar >= major - minor - EPS && planar <= major + minor + EPS);
            assert!(position.z.abs() <= minor + EPS);
        }
    }

    #[test]
    fn torus_indices_reference_every_vertex_once() {
        let mesh = torus(2.0, 0.5, 4, 3);
        let referenced: Vec<u32> = mesh
            .indices
            .iter()
            .copied()
            .filter(|&index| index != STRIP_RESTART)
            .collect();
        assert_eq!(referenced, (0..mesh.vertex_count() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn surface_counts_match_grid() {
        let mesh = surface(0.1, -10.0, 10.0, surface_height);
        assert_eq!(mesh.vertex_count(), 2 * 201 * 201);
        assert!(mesh.positions().all(|p| p.is_finite()));
    }

    #[test]
    fn surface_uses_height_function() {
        let mesh = surface(1.0, 0.0, 2.0, |a, b| a + 10.0 * b);
        let first: Vec<Vec3> = mesh.positions().take(2).collect();
        assert_eq!(first[0], Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(first[1], Vec3::new(1.0, 10.0, 0.0));
    }

    #[test]
    fn surface_rejects_bad_step() {
        assert!(surface(0.0, -1.0, 1.0, surface_height).is_empty());
        assert!(surface(-0.5, -1.0, 1.0, surface_height).is_empty());
        assert!(surface(0.5, 1.0, -1.0, surface_height).is_empty());
    }

    #[test]
    fn surface_refuses_oversized_grid() {
        assert!(surface(1e-6, -10.0, 10.0, surface_height).is_empty());
        assert!(surface(f32::MIN_POSITIVE, -1.0, 1.0, surface_height).is_empty());
        assert_eq!(grid_steps(1.0, 0.0, 4096.0), Some(MAX_GRID_STEPS));
        assert_eq!(grid_steps(1.0, 0.0, 4097.0), None);
        assert!(2 * (MAX_GRID_STEPS + 1).pow(2) < STRIP_RESTART as usize);
    }

    #[test]
    fn cube_uses_explicit_outline() {
        let mesh = cube(5.0);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.indices.len(), 36);
        assert_eq!(mesh.wireframe_indices().len(), 48);
        assert!(mesh.positions().all(|p| p.abs() == Vec3::splat(5.0)));
    }

    #[test]
    fn strip_wireframe_respects_restarts() {
        let mut mesh = Mesh::empty(VertexLayout::Position, Topology::TriangleStrip);
        mesh.indices = vec![0, 1, 2, 3, STRIP_RESTART, 4, 5, 6];
        let lines = mesh.wireframe_indices();
        assert_eq!(
            lines,
            vec![0, 1, 0, 2, 1, 2, 1, 3, 2, 3, 4, 5, 4, 6, 5, 6]
        );
    }

    #[test]
    fn list_wireframe_covers_triangle_edges() {
        let mut mesh = Mesh::empty(VertexLayout::Position, Topology::TriangleList);
        mesh.indices = vec![0, 1, 2];
        assert_eq!(mesh.wireframe_indices(), vec![0, 1, 1, 2, 2, 0]);
    }
}
