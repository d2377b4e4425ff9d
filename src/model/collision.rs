//! Static triangle collision meshes and downward ground rays.

use glam::{Vec2, Vec3};

/// Name of the collision mesh the roamer is allowed to stand on.
pub const TERRAIN: &str = "terrain";

/// Height above the queried point that ground rays start from.
pub const RAY_START_HEIGHT: f32 = 1000.0;

/// Bit set used to filter which meshes a ray may hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollideMask(pub u32);

impl CollideMask {
    pub const NONE: CollideMask = CollideMask(0);
    pub const ALL: CollideMask = CollideMask(u32::MAX);

    pub const fn bit(n: u32) -> Self {
        CollideMask(1 << n)
    }

    pub fn overlaps(self, other: CollideMask) -> bool {
        self.0 & other.0 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Möller–Trumbore, both faces. Returns the ray parameter of the hit.
    pub fn intersect_ray(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        const EPS: f32 = 1e-7;
        // edge slack so rays through shared vertices still land somewhere
        const EDGE: f32 = 1e-5;
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;
        let p = dir.cross(e2);
        let det = e1.dot(p);
        if det.abs() < EPS {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = origin - self.a;
        let u = s.dot(p) * inv_det;
        if !(-EDGE..=1.0 + EDGE).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = dir.dot(q) * inv_det;
        if v < -EDGE || u + v > 1.0 + EDGE {
            return None;
        }
        let t = e2.dot(q) * inv_det;
        (t >= 0.0).then_some(t)
    }

    fn min_xz(&self) -> Vec2 {
        Vec2::new(
            self.a.x.min(self.b.x).min(self.c.x),
            self.a.z.min(self.b.z).min(self.c.z),
        )
    }

    fn max_xz(&self) -> Vec2 {
        Vec2::new(
            self.a.x.max(self.b.x).max(self.c.x),
            self.a.z.max(self.b.z).max(self.c.z),
        )
    }
}

/// Uniform XZ bucket grid over a mesh's triangles.
#[derive(Debug, Clone)]
struct BucketGrid {
    min: Vec2,
    cell: Vec2,
    dims: (usize, usize),
    cells: Vec<Vec<u32>>,
}

impl BucketGrid {
    fn build(triangles: &[Triangle], min: Vec2, max: Vec2) -> Self {
        // roughly one triangle pair per cell
        let side = ((triangles.len() as f32 / 2.0).sqrt().ceil() as usize).clamp(1, 256);
        let extent = (max - min).max(Vec2::splat(1e-3));
        let cell = extent / side as f32;
        let mut cells = vec![Vec::new(); side * side];
        let mut grid = Self {
            min,
            cell,
            dims: (side, side),
            cells: Vec::new(),
        };
        for (i, tri) in triangles.iter().enumerate() {
            let (x0, z0) = grid.cell_of(tri.min_xz());
            let (x1, z1) = grid.cell_of(tri.max_xz());
            for z in z0..=z1 {
                for x in x0..=x1 {
                    cells[z * side + x].push(i as u32);
                }
            }
        }
        grid.cells = cells;
        grid
    }

    fn cell_of(&self, p: Vec2) -> (usize, usize) {
        let rel = (p - self.min) / self.cell;
        let x = (rel.x.floor().max(0.0) as usize).min(self.dims.0 - 1);
        let z = (rel.y.floor().max(0.0) as usize).min(self.dims.1 - 1);
        (x, z)
    }

    fn candidates(&self, p: Vec2) -> &[u32] {
        let (x, z) = self.cell_of(p);
        &self.cells[z * self.dims.0 + x]
    }
}

/// A named triangle soup that rays can collide "into".
#[derive(Debug, Clone)]
pub struct CollisionMesh {
    pub name: String,
    pub into_mask: CollideMask,
    triangles: Vec<Triangle>,
    min: Vec3,
    max: Vec3,
    grid: BucketGrid,
}

impl CollisionMesh {
    pub fn new(name: impl Into<String>, into_mask: CollideMask, triangles: Vec<Triangle>) -> Self {
        let (min, max) = triangles.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(lo, hi), t| (lo.min(t.a).min(t.b).min(t.c), hi.max(t.a).max(t.b).max(t.c)),
        );
        let grid = BucketGrid::build(&triangles, Vec2::new(min.x, min.z), Vec2::new(max.x, max.z));
        Self {
            name: name.into(),
            into_mask,
            triangles,
            min,
            max,
            grid,
        }
    }

    fn contains_xz(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.z >= self.min.z && p.z <= self.max.z
    }

    /// Append the ray parameter of every hit to `out`.
    fn cast(&self, origin: Vec3, dir: Vec3, out: &mut Vec<f32>) {
        if self.triangles.is_empty() {
            return;
        }
        let vertical = dir.x.abs() < 1e-6 && dir.z.abs() < 1e-6;
        if vertical {
            if !self.contains_xz(origin) {
                return;
            }
            for &i in self.grid.candidates(Vec2::new(origin.x, origin.z)) {
                if let Some(t) = self.triangles[i as usize].intersect_ray(origin, dir) {
                    out.push(t);
                }
            }
        } else {
            out.extend(self.triangles.iter().filter_map(|t| t.intersect_ray(origin, dir)));
        }
    }
}

/// One ray hit.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEntry {
    pub surface_point: Vec3,
    pub into_name: String,
}

/// Outcome of resolving a ground ray.
#[derive(Debug, Clone, PartialEq)]
pub enum GroundHit {
    /// Highest hit is walkable terrain at this height.
    Terrain(f32),
    /// Highest hit belongs to something else.
    Obstructed(String),
    Missed,
}

impl GroundHit {
    pub fn terrain_height(&self) -> Option<f32> {
        match self {
            GroundHit::Terrain(h) => Some(*h),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollisionWorld {
    meshes: Vec<CollisionMesh>,
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mesh: CollisionMesh) {
        self.meshes.push(mesh);
    }

    pub fn meshes(&self) -> &[CollisionMesh] {
        &self.meshes
    }

    /// Every hit along the ray in meshes whose into mask overlaps `from_mask`.
    /// Duplicate hits on shared triangle edges are kept, as is hit order.
    pub fn cast_ray(&self, origin: Vec3, dir: Vec3, from_mask: CollideMask) -> Vec<CollisionEntry> {
        let dir = dir.normalize_or_zero();
        if dir == Vec3::ZERO {
            return Vec::new();
        }
        let mut entries = Vec::new();
        let mut hits = Vec::new();
        for mesh in self.meshes.iter().filter(|m| m.into_mask.overlaps(from_mask)) {
            hits.clear();
            mesh.cast(origin, dir, &mut hits);
            entries.extend(hits.iter().map(|t| CollisionEntry {
                surface_point: origin + dir * *t,
                into_name: mesh.name.clone(),
            }));
        }
        entries
    }

    /// Ray straight down from `RAY_START_HEIGHT` above `at`.
    pub fn ground_ray(&self, at: Vec3, from_mask: CollideMask) -> Vec<CollisionEntry> {
        self.cast_ray(at + Vec3::Y * RAY_START_HEIGHT, Vec3::NEG_Y, from_mask)
    }
}

pub fn sort_highest_first(entries: &mut [CollisionEntry]) {
    entries.sort_by(|a, b| b.surface_point.y.total_cmp(&a.surface_point.y));
}

/// Only the highest hit counts. It must be terrain to be walkable.
pub fn resolve_ground(mut entries: Vec<CollisionEntry>) -> GroundHit {
    sort_highest_first(&mut entries);
    match entries.into_iter().next() {
        Some(top) if top.into_name == TERRAIN => GroundHit::Terrain(top.surface_point.y),
        Some(top) => GroundHit::Obstructed(top.into_name),
        None => GroundHit::Missed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(name: &str, y: f32, min: f32, max: f32) -> CollisionMesh {
        let a = Vec3::new(min, y, min);
        let b = Vec3::new(max, y, min);
        let c = Vec3::new(max, y, max);
        let d = Vec3::new(min, y, max);
        CollisionMesh::new(
            name,
            CollideMask::bit(0),
            vec![Triangle::new(a, b, c), Triangle::new(a, c, d)],
        )
    }

    #[test]
    fn triangle_hit_and_miss() {
        let t = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Z);
        let hit = t.intersect_ray(Vec3::new(0.2, 5.0, 0.2), Vec3::NEG_Y);
        assert!((hit.unwrap() - 5.0).abs() < 1e-5);
        assert!(t.intersect_ray(Vec3::new(0.8, 5.0, 0.8), Vec3::NEG_Y).is_none());
        // behind the origin
        assert!(t.intersect_ray(Vec3::new(0.2, -1.0, 0.2), Vec3::NEG_Y).is_none());
    }

    #[test]
    fn ground_ray_reports_every_layer() {
        let mut world = CollisionWorld::new();
        world.add(quad(TERRAIN, 0.0, -10.0, 10.0));
        world.add(quad("rock", 2.5, -1.0, 1.0));
        let mut entries = world.ground_ray(Vec3::new(0.3, 0.0, 0.4), CollideMask::bit(0));
        assert_eq!(entries.len(), 2);
        sort_highest_first(&mut entries);
        assert_eq!(entries[0].into_name, "rock");
        assert!((entries[0].surface_point.y - 2.5).abs() < 1e-3);
    }

    #[test]
    fn obstacle_on_top_blocks_ground() {
        let mut world = CollisionWorld::new();
        world.add(quad(TERRAIN, 0.0, -10.0, 10.0));
        world.add(quad("tree", 4.0, -1.0, 1.0));
        let on_tree = resolve_ground(world.ground_ray(Vec3::new(0.5, 0.0, -0.2), CollideMask::bit(0)));
        assert_eq!(on_tree, GroundHit::Obstructed("tree".into()));
        let beside = resolve_ground(world.ground_ray(Vec3::new(5.0, 0.0, 3.0), CollideMask::bit(0)));
        assert_eq!(beside.terrain_height(), Some(0.0));
    }

    #[test]
    fn off_the_map_misses() {
        let mut world = CollisionWorld::new();
        world.add(quad(TERRAIN, 0.0, -10.0, 10.0));
        let hit = resolve_ground(world.ground_ray(Vec3::new(50.0, 0.0, 0.0), CollideMask::bit(0)));
        assert_eq!(hit, GroundHit::Missed);
    }

    #[test]
    fn masks_filter_meshes() {
        let mut world = CollisionWorld::new();
        world.add(quad(TERRAIN, 0.0, -10.0, 10.0));
        let at = Vec3::new(2.0, 0.0, -3.0);
        assert!(world.ground_ray(at, CollideMask::bit(3)).is_empty());
        assert!(world.ground_ray(at, CollideMask::NONE).is_empty());
        assert_eq!(world.ground_ray(at, CollideMask::ALL).len(), 1);
    }

    #[test]
    fn slanted_rays_test_all_triangles() {
        let mut world = CollisionWorld::new();
        world.add(quad(TERRAIN, 0.0, -10.0, 10.0));
        let entries = world.cast_ray(Vec3::new(-5.0, 5.0, 0.0), Vec3::new(1.0, -1.0, 0.0), CollideMask::ALL);
        assert!(!entries.is_empty());
        assert!(entries[0].surface_point.abs_diff_eq(Vec3::ZERO, 1e-4));
    }
}
