//! Cannon Blast - pooled spawn/split core of a cannon-blast arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (pools, obstacles, spawner, level flow)
//! - `level`: Data-driven level assets loaded from JSON
//! - `error`: Config and pool error types

pub mod error;
pub mod level;
pub mod sim;

pub use error::{ConfigError, Error, PoolError, Result};
pub use level::{LevelCatalog, LevelConfig};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Pool names used by the world
    pub const OBSTACLE_POOL: &str = "ObstaclePool";
    pub const BULLET_POOL: &str = "BulletPool";
    pub const COIN_POOL: &str = "Coin";

    /// Obstacles spawn this far outside the left/right screen edge
    pub const SPAWN_EDGE_OFFSET: f32 = 1.0;
    /// Spawn height band as a fraction of screen height (measured from the bottom)
    pub const SPAWN_HEIGHT_MIN_RATIO: f32 = 0.6;
    pub const SPAWN_HEIGHT_MAX_RATIO: f32 = 0.9;
    /// Free-fall obstacles this far below the bottom edge are culled
    pub const OFFSCREEN_MARGIN: f32 = 2.0;
    /// Visual spin of free-fall obstacles (degrees per second)
    pub const OBSTACLE_ROTATION_SPEED: f32 = 50.0;

    /// Duration of the outward impulse applied to split children (seconds)
    pub const LAUNCH_DURATION: f32 = 0.2;

    /// Coin drop scatter (± units around the destroy position)
    pub const COIN_SCATTER: f32 = 0.5;
    /// Random force range applied to dropped coins
    pub const COIN_FORCE_MIN: f32 = 3.0;
    pub const COIN_FORCE_MAX: f32 = 6.0;
    /// Distance at which a magnetized coin counts as collected
    pub const COIN_COLLECT_DISTANCE: f32 = 0.2;

    /// Fire point offset above the weapon origin
    pub const FIRE_POINT_OFFSET: f32 = 0.5;
    /// Recoil offset below which the barrel snaps back to rest
    pub const RECOIL_EPSILON: f32 = 0.001;
}

/// Move `current` toward `target` by at most `max_delta`
#[inline]
pub fn move_towards(current: Vec2, target: Vec2, max_delta: f32) -> Vec2 {
    let delta = target - current;
    let dist = delta.length();
    if dist <= max_delta || dist == 0.0 {
        target
    } else {
        current + delta / dist * max_delta
    }
}

/// Scalar version of [`move_towards`]
#[inline]
pub fn approach(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}
