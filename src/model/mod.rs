// MODEL: Game state and data
pub mod actor;
pub mod camera;
pub mod collision;
pub mod environment;
pub mod keymap;
pub mod terrain;

pub use actor::{AnimationState, Bunny, Roamer};
pub use camera::Camera;
pub use collision::{CollideMask, CollisionEntry, CollisionMesh, CollisionWorld, GroundHit, Triangle};
pub use environment::{Environment, Obstacle, ObstacleKind, GROUND_MASK};
pub use keymap::{Action, ActionState, KeyMap, Section};
pub use terrain::Heightmap;
