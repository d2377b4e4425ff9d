//! Heightmap terrain: value noise, bilinear height sampling, meshing.
//!
//! Heights come from 2D fBm over a square grid of `size × size` vertices
//! spanning `[-extent, extent]` on X and Z. The grid is meshed twice: once as
//! coloured render triangles and once as collision triangles named
//! [`TERRAIN`](crate::model::collision::TERRAIN).

use glam::{Vec2, Vec3};

use crate::config::WorldConfig;
use crate::model::collision::Triangle;
use crate::utils::{Mesh, Vertex};

/// 2D value noise in [-1, 1] using an integer hash per lattice point.
fn noise2d(x: f32, z: f32, seed: u32) -> f32 {
    let ix = x.floor() as i32;
    let iz = z.floor() as i32;
    let fx = x - ix as f32;
    let fz = z - iz as f32;

    let hash = |x: i32, z: i32| -> f32 {
        let mut n = x
            .wrapping_mul(374761393)
            .wrapping_add(z.wrapping_mul(668265263))
            .wrapping_add(seed as i32);
        n = (n ^ (n >> 13)).wrapping_mul(1274126177);
        ((n ^ (n >> 16)) as u32 as f32 / 4294967296.0) * 2.0 - 1.0
    };

    let fade = |t: f32| t * t * (3.0 - 2.0 * t);
    let u = fade(fx);
    let v = fade(fz);

    let a = hash(ix, iz);
    let b = hash(ix + 1, iz);
    let c = hash(ix, iz + 1);
    let d = hash(ix + 1, iz + 1);

    let x1 = a * (1.0 - u) + b * u;
    let x2 = c * (1.0 - u) + d * u;
    x1 * (1.0 - v) + x2 * v
}

/// Fractional Brownian motion: `octaves` layers of [`noise2d`], normalised.
pub fn fbm(x: f32, z: f32, seed: u32, base_freq: f32, gain: f32, octaves: u32) -> f32 {
    let mut result = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = base_freq;
    let mut max_amplitude = 0.0;

    for octave in 0..octaves {
        result += noise2d(x * frequency, z * frequency, seed.wrapping_add(octave * 0x9E37)) * amplitude;
        max_amplitude += amplitude;
        amplitude *= gain;
        frequency *= 2.0;
    }

    if max_amplitude > 0.0 { result / max_amplitude } else { 0.0 }
}

/// Colour ramp by height: low grass, high rock.
fn height_color(h: f32, height_scale: f32) -> [f32; 4] {
    let t = if height_scale > 0.0 { (h / height_scale * 0.5 + 0.5).clamp(0.0, 1.0) } else { 0.5 };
    let low = Vec3::new(0.22, 0.45, 0.18);
    let high = Vec3::new(0.52, 0.48, 0.40);
    let c = low.lerp(high, t);
    [c.x, c.y, c.z, 1.0]
}

pub struct Heightmap {
    /// Vertices per side.
    pub size: usize,
    /// World-space half extent.
    pub extent: f32,
    pub heights: Vec<f32>,
    height_scale: f32,
}

impl Heightmap {
    pub fn generate(config: &WorldConfig) -> Self {
        let size = config.grid_size.max(2);
        let extent = config.extent;
        let seed = config.seed as u32;
        let mut heights = vec![0.0f32; size * size];
        for j in 0..size {
            for i in 0..size {
                let p = Self::grid_to_world(size, extent, i, j);
                heights[j * size + i] = config.height_scale * fbm(p.x, p.y, seed, config.noise_frequency, 0.5, 4);
            }
        }
        tracing::debug!(size, extent, "generated heightmap");
        Self {
            size,
            extent,
            heights,
            height_scale: config.height_scale,
        }
    }

    /// Flat map at height `h`. Used by tests and as a fallback world.
    pub fn flat(size: usize, extent: f32, h: f32) -> Self {
        let size = size.max(2);
        Self {
            size,
            extent,
            heights: vec![h; size * size],
            height_scale: 0.0,
        }
    }

    fn grid_to_world(size: usize, extent: f32, i: usize, j: usize) -> Vec2 {
        let step = 2.0 * extent / (size as f32 - 1.0);
        Vec2::new(-extent + i as f32 * step, -extent + j as f32 * step)
    }

    fn vertex(&self, i: usize, j: usize) -> Vec3 {
        let p = Self::grid_to_world(self.size, self.extent, i, j);
        Vec3::new(p.x, self.heights[j * self.size + i], p.y)
    }

    /// Bilinear height at world XZ, clamped to the map edge.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let n = self.size as f32 - 1.0;
        let gx = ((x / self.extent) * 0.5 + 0.5).clamp(0.0, 1.0) * n;
        let gz = ((z / self.extent) * 0.5 + 0.5).clamp(0.0, 1.0) * n;
        let x0 = (gx.floor() as usize).min(self.size - 2);
        let z0 = (gz.floor() as usize).min(self.size - 2);
        let tx = gx - x0 as f32;
        let tz = gz - z0 as f32;
        let h = |i: usize, j: usize| self.heights[j * self.size + i];
        let h0 = h(x0, z0) * (1.0 - tx) + h(x0 + 1, z0) * tx;
        let h1 = h(x0, z0 + 1) * (1.0 - tx) + h(x0 + 1, z0 + 1) * tx;
        h0 * (1.0 - tz) + h1 * tz
    }

    /// Two triangles per grid quad, split along the same diagonal as the mesh.
    pub fn triangles(&self) -> Vec<Triangle> {
        let n = self.size;
        let mut out = Vec::with_capacity((n - 1) * (n - 1) * 2);
        for j in 0..n - 1 {
            for i in 0..n - 1 {
                let v00 = self.vertex(i, j);
                let v10 = self.vertex(i + 1, j);
                let v01 = self.vertex(i, j + 1);
                let v11 = self.vertex(i + 1, j + 1);
                out.push(Triangle::new(v00, v01, v10));
                out.push(Triangle::new(v10, v01, v11));
            }
        }
        out
    }

    pub fn mesh(&self) -> Mesh {
        let n = self.size;
        let step = 2.0 * self.extent / (n as f32 - 1.0);
        let mut mesh = Mesh::empty();
        mesh.vertices.reserve(n * n);
        for j in 0..n {
            for i in 0..n {
                let p = self.vertex(i, j);
                // central differences
                let hl = self.heights[j * n + i.saturating_sub(1)];
                let hr = self.heights[j * n + (i + 1).min(n - 1)];
                let hd = self.heights[j.saturating_sub(1) * n + i];
                let hu = self.heights[(j + 1).min(n - 1) * n + i];
                let normal = Vec3::new((hl - hr) / (2.0 * step), 1.0, (hd - hu) / (2.0 * step)).normalize();
                mesh.vertices.push(Vertex {
                    pos: p.to_array(),
                    normal: normal.to_array(),
                    color: height_color(p.y, self.height_scale),
                    uv: [i as f32 / (n - 1) as f32, j as f32 / (n - 1) as f32],
                });
            }
        }
        mesh.indices.reserve((n - 1) * (n - 1) * 6);
        for j in 0..n - 1 {
            for i in 0..n - 1 {
                let i00 = (j * n + i) as u32;
                let i10 = (j * n + i + 1) as u32;
                let i01 = ((j + 1) * n + i) as u32;
                let i11 = ((j + 1) * n + i + 1) as u32;
                mesh.indices.extend_from_slice(&[i00, i01, i10, i10, i01, i11]);
            }
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fbm_is_deterministic_and_bounded() {
        for k in 0..50 {
            let x = k as f32 * 3.7;
            let a = fbm(x, -x, 7, 0.05, 0.5, 4);
            assert_eq!(a, fbm(x, -x, 7, 0.05, 0.5, 4));
            assert!((-1.0..=1.0).contains(&a));
        }
    }

    #[test]
    fn flat_map_samples_flat() {
        let map = Heightmap::flat(9, 10.0, 3.0);
        assert_eq!(map.height_at(1.3, -4.2), 3.0);
        assert_eq!(map.height_at(100.0, 100.0), 3.0);
    }

    #[test]
    fn sampler_matches_grid_vertices() {
        let config = WorldConfig { grid_size: 17, extent: 32.0, ..WorldConfig::default() };
        let map = Heightmap::generate(&config);
        let v = map.vertex(4, 9);
        assert!((map.height_at(v.x, v.z) - v.y).abs() < 1e-4);
    }

    #[test]
    fn triangles_face_up() {
        let map = Heightmap::flat(3, 1.0, 0.0);
        let tris = map.triangles();
        assert_eq!(tris.len(), 8);
        for t in tris {
            assert!((t.b - t.a).cross(t.c - t.a).y > 0.0);
        }
    }

    #[test]
    fn mesh_indices_stay_in_range() {
        let map = Heightmap::flat(5, 4.0, 0.0);
        let mesh = map.mesh();
        assert_eq!(mesh.vertices.len(), 25);
        assert!(mesh.indices.iter().all(|i| (*i as usize) < mesh.vertices.len()));
    }
}
