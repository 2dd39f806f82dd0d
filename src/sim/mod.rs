//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - Events delivered synchronously, in the order they were raised

pub mod collision;
pub mod coordinator;
pub mod events;
pub mod obstacle;
pub mod path;
pub mod pool;
pub mod spawner;
pub mod weapon;
pub mod world;

pub use collision::{Viewport, circles_overlap, overlap_circle};
pub use coordinator::{LevelCoordinator, LevelOutcome, ScoreKeeper};
pub use events::{
    BulletFired, CoinCollected, Event, EventBus, GameEvent, GameStarted, LevelComplete, LevelFailed,
    MovementKind, ObstacleDamaged, ObstacleDestroyed, ObstacleHit, ObstacleSpawned, PlayerDeath,
    ScoreChanged, SubscriptionId,
};
pub use obstacle::{DestroyCause, Obstacle, ObstacleContext, ObstaclePhase, SpawnParams};
pub use path::{Path, PathTracker, SnakeHead};
pub use pool::{EntityId, PoolRegistry, Poolable, Pooled, Transform};
pub use spawner::Spawner;
pub use weapon::{Bullet, Coin, CoinState, Weapon};
pub use world::{TickInput, World};
