//! The static world the roamer walks on: a heightmap plus scattered rocks and
//! trees, meshed for rendering and for ground rays.

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::WorldConfig;
use crate::model::collision::{CollideMask, CollisionMesh, CollisionWorld, Triangle, TERRAIN};
use crate::model::terrain::Heightmap;
use crate::utils::{create_box_mesh, Mesh};

/// Mask bit shared by ground rays and everything they may hit.
pub const GROUND_MASK: CollideMask = CollideMask::bit(0);

/// Name of the spawn point marker.
pub const START_POINT: &str = "start_point";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleKind {
    Rock,
    Tree,
}

impl ObstacleKind {
    pub fn name(self) -> &'static str {
        match self {
            ObstacleKind::Rock => "rock",
            ObstacleKind::Tree => "tree",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    /// Footprint centre on the terrain.
    pub base: Vec3,
    /// Box parts in world space.
    pub parts: Vec<(Vec3, Vec3, [f32; 4])>,
}

impl Obstacle {
    pub fn rock(base: Vec3, half_width: f32, height: f32) -> Self {
        // sunk a little so slopes don't show a gap under it
        let min = base + Vec3::new(-half_width, -0.3, -half_width);
        let max = base + Vec3::new(half_width, height, half_width);
        Self {
            kind: ObstacleKind::Rock,
            base,
            parts: vec![(min, max, [0.45, 0.44, 0.42, 1.0])],
        }
    }

    pub fn tree(base: Vec3, trunk_height: f32, crown_half_width: f32) -> Self {
        let trunk_min = base + Vec3::new(-0.3, -0.3, -0.3);
        let trunk_max = base + Vec3::new(0.3, trunk_height, 0.3);
        let crown_min = base + Vec3::new(-crown_half_width, trunk_height * 0.6, -crown_half_width);
        let crown_max = base + Vec3::new(crown_half_width, trunk_height + crown_half_width, crown_half_width);
        Self {
            kind: ObstacleKind::Tree,
            base,
            parts: vec![
                (trunk_min, trunk_max, [0.40, 0.27, 0.15, 1.0]),
                (crown_min, crown_max, [0.13, 0.38, 0.14, 1.0]),
            ],
        }
    }

    pub fn mesh(&self) -> Mesh {
        let mut mesh = Mesh::empty();
        for (min, max, color) in &self.parts {
            mesh.append(&create_box_mesh(*min, *max, *color));
        }
        mesh
    }

    pub fn triangles(&self) -> Vec<Triangle> {
        mesh_triangles(&self.mesh())
    }
}

pub fn mesh_triangles(mesh: &Mesh) -> Vec<Triangle> {
    mesh.indices
        .chunks_exact(3)
        .map(|tri| {
            let p = |i: u32| Vec3::from_array(mesh.vertices[i as usize].pos);
            Triangle::new(p(tri[0]), p(tri[1]), p(tri[2]))
        })
        .collect()
}

pub struct Environment {
    pub heightmap: Heightmap,
    pub obstacles: Vec<Obstacle>,
    start_point: Vec3,
    collision: CollisionWorld,
}

impl Environment {
    /// Seeded terrain with rocks and trees kept outside the start clearing.
    pub fn generate(config: &WorldConfig) -> Self {
        let heightmap = Heightmap::generate(config);
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let reach = config.extent * 0.95;
        let mut obstacles = Vec::with_capacity(config.rock_count + config.tree_count);

        let scatter = |rng: &mut ChaCha8Rng| -> Option<Vec2> {
            // bounded retries keep tiny maps from spinning forever
            for _ in 0..32 {
                let p = Vec2::new(rng.gen_range(-reach..reach), rng.gen_range(-reach..reach));
                if p.length() > config.clearing_radius {
                    return Some(p);
                }
            }
            None
        };

        for _ in 0..config.rock_count {
            if let Some(p) = scatter(&mut rng) {
                let half = rng.gen_range(0.6..1.8);
                let height = rng.gen_range(0.5..1.4);
                obstacles.push(Obstacle::rock(Vec3::new(p.x, heightmap.height_at(p.x, p.y), p.y), half, height));
            }
        }
        for _ in 0..config.tree_count {
            if let Some(p) = scatter(&mut rng) {
                let trunk = rng.gen_range(3.0..6.0);
                let crown = rng.gen_range(1.0..2.2);
                obstacles.push(Obstacle::tree(Vec3::new(p.x, heightmap.height_at(p.x, p.y), p.y), trunk, crown));
            }
        }

        tracing::info!(
            seed = config.seed,
            rocks = config.rock_count,
            trees = config.tree_count,
            placed = obstacles.len(),
            "generated environment"
        );
        Self::from_parts(heightmap, obstacles)
    }

    /// Assemble an environment from ready-made pieces.
    pub fn from_parts(heightmap: Heightmap, obstacles: Vec<Obstacle>) -> Self {
        let mut collision = CollisionWorld::new();
        collision.add(CollisionMesh::new(TERRAIN, GROUND_MASK, heightmap.triangles()));
        for obstacle in &obstacles {
            collision.add(CollisionMesh::new(obstacle.kind.name(), GROUND_MASK, obstacle.triangles()));
        }
        let start_point = Vec3::new(0.0, heightmap.height_at(0.0, 0.0), 0.0);
        tracing::debug!(name = START_POINT, ?start_point, "start point");
        Self {
            heightmap,
            obstacles,
            start_point,
            collision,
        }
    }

    pub fn start_point(&self) -> Vec3 {
        self.start_point
    }

    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        self.heightmap.height_at(x, z)
    }

    pub fn collision(&self) -> &CollisionWorld {
        &self.collision
    }

    /// Terrain and obstacles in one static mesh.
    pub fn mesh(&self) -> Mesh {
        let mut mesh = self.heightmap.mesh();
        for obstacle in &self.obstacles {
            mesh.append(&obstacle.mesh());
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::collision::{resolve_ground, GroundHit};

    fn small_config() -> WorldConfig {
        WorldConfig {
            grid_size: 33,
            extent: 32.0,
            rock_count: 10,
            tree_count: 10,
            ..WorldConfig::default()
        }
    }

    #[test]
    fn generation_is_seeded() {
        let a = Environment::generate(&small_config());
        let b = Environment::generate(&small_config());
        assert_eq!(a.obstacles.len(), b.obstacles.len());
        for (x, y) in a.obstacles.iter().zip(&b.obstacles) {
            assert_eq!(x.base, y.base);
            assert_eq!(x.kind, y.kind);
        }
    }

    #[test]
    fn clearing_is_respected() {
        let config = small_config();
        let env = Environment::generate(&config);
        for o in &env.obstacles {
            assert!(Vec2::new(o.base.x, o.base.z).length() > config.clearing_radius);
        }
    }

    #[test]
    fn start_point_is_walkable() {
        let env = Environment::generate(&small_config());
        let start = env.start_point();
        let hit = resolve_ground(env.collision().ground_ray(start, GROUND_MASK));
        let h = hit.terrain_height().expect("start point on terrain");
        assert!((h - start.y).abs() < 1e-3);
    }

    #[test]
    fn rock_obstructs_ground_ray() {
        let map = Heightmap::flat(9, 8.0, 0.0);
        let env = Environment::from_parts(map, vec![Obstacle::rock(Vec3::new(3.0, 0.0, 3.0), 1.0, 1.0)]);
        let hit = resolve_ground(env.collision().ground_ray(Vec3::new(3.1, 0.0, 2.7), GROUND_MASK));
        assert_eq!(hit, GroundHit::Obstructed("rock".to_string()));
    }

    #[test]
    fn tree_crown_obstructs_ground_ray() {
        let map = Heightmap::flat(9, 8.0, 0.0);
        let env = Environment::from_parts(map, vec![Obstacle::tree(Vec3::new(-3.0, 0.0, 0.0), 4.0, 1.5)]);
        // under the crown but beside the trunk
        let hit = resolve_ground(env.collision().ground_ray(Vec3::new(-2.1, 0.0, 0.7), GROUND_MASK));
        assert_eq!(hit, GroundHit::Obstructed("tree".to_string()));
    }

    #[test]
    fn mesh_triangles_match_indices() {
        let obstacle = Obstacle::rock(Vec3::ZERO, 1.0, 1.0);
        assert_eq!(obstacle.triangles().len(), obstacle.mesh().indices.len() / 3);
    }
}
