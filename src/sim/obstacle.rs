//! Obstacle state machine
//!
//! An obstacle is an aggregate of [`Health`], [`Movement`], [`Splitter`] and
//! [`CoinDropper`]. Its lifecycle is
//! `Spawning -> Active -> Dying -> Pooled`; the pool record only ever sees the
//! entity go active -> idle once per life.

use std::rc::Rc;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::collision::{Viewport, bounce_horizontal};
use super::events::{GameEvent, MovementKind, ObstacleDamaged, ObstacleDestroyed, ObstacleHit, ObstacleSpawned};
use super::path::{Path, PathTracker};
use super::pool::{EntityId, Poolable, PoolRegistry, Transform};
use super::weapon::Coin;
use crate::approach;
use crate::consts::*;
use crate::level::{CoinSettings, ObstacleData, SplitSettings};

/// Lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstaclePhase {
    /// Borrowed from the pool, not yet initialized
    Spawning,
    Active,
    /// Health ran out or it left the screen; teardown in progress
    Dying,
    /// Idle in its pool
    Pooled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    current: i32,
    max: i32,
}

impl Health {
    /// Explicit positive health wins, otherwise uniform in `[min_health, max_health]`
    pub fn roll(data: &ObstacleData, explicit: Option<i32>, rng: &mut impl Rng) -> Self {
        let value = match explicit {
            Some(hp) if hp > 0 => hp,
            _ => rng.random_range(data.min_health..=data.max_health),
        };
        Self {
            current: value,
            max: value,
        }
    }

    /// Subtract `amount`; returns the (possibly negative) remainder
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        self.current -= amount;
        self.current
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn max(&self) -> i32 {
        self.max
    }
}

/// Sideways travel with delayed gravity, used by edge spawns and split children
#[derive(Debug, Clone, PartialEq)]
pub struct Ballistic {
    /// -1, 0 or 1
    pub direction: f32,
    pub velocity: Vec2,
    gravity: bool,
    /// Seconds until gravity engages
    timer: f32,
    /// Velocity forced while the launch timer runs
    impulse: Option<Vec2>,
}

impl Ballistic {
    fn edge(direction: f32, fall_delay: f32) -> Self {
        Self {
            direction,
            velocity: Vec2::ZERO,
            gravity: fall_delay <= 0.0,
            timer: fall_delay.max(0.0),
            impulse: None,
        }
    }

    fn launched(angle_degrees: f32, force: f32) -> Self {
        let side = angle_degrees.to_radians().sin();
        let launch = Vec2::new(side, 1.0).normalize_or_zero() * force;
        Self {
            direction: if side > 0.0 {
                1.0
            } else if side < 0.0 {
                -1.0
            } else {
                0.0
            },
            velocity: launch,
            gravity: false,
            timer: LAUNCH_DURATION,
            impulse: Some(launch),
        }
    }

    pub fn is_falling(&self) -> bool {
        self.gravity
    }

    fn step(&mut self, position: &mut Vec2, dt: f32, data: &ObstacleData, half_extent: f32, viewport: &Viewport) {
        if let Some(impulse) = self.impulse {
            self.velocity = impulse;
        } else {
            self.velocity.x = self.direction * data.horizontal_speed;
            if self.gravity {
                self.velocity.y = approach(self.velocity.y, -data.fall_speed, data.fall_speed * dt);
            }
        }
        *position += self.velocity * dt;

        if self.timer > 0.0 {
            self.timer -= dt;
            if self.timer <= 0.0 {
                self.gravity = true;
                self.impulse = None;
            }
        }

        let (x, direction) = bounce_horizontal(position.x, half_extent, self.direction, viewport);
        position.x = x;
        self.direction = direction;
    }
}

#[derive(Debug, Clone)]
pub enum Movement {
    FreeFall(Ballistic),
    PathFollowing(PathTracker),
    LaunchedChild(Ballistic),
}

impl Movement {
    pub fn kind(&self) -> MovementKind {
        match self {
            Movement::FreeFall(_) => MovementKind::FreeFall,
            Movement::PathFollowing(_) => MovementKind::PathFollowing,
            Movement::LaunchedChild(_) => MovementKind::LaunchedChild,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Splitter {
    pub scale: f32,
    pub generation: u32,
}

impl Splitter {
    pub fn can_split(&self, settings: &SplitSettings) -> bool {
        self.generation < settings.max_generation
    }

    pub fn child_scale(&self, settings: &SplitSettings) -> f32 {
        self.scale * settings.scale_ratio
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinDropper {
    pub can_drop: bool,
}

impl CoinDropper {
    /// Number of coins to drop this time (0 when the roll fails)
    ///
    /// Out-of-range tuning is clamped; a NaN chance never drops.
    pub fn roll(&self, settings: &CoinSettings, rng: &mut impl Rng) -> u32 {
        if !self.can_drop || !settings.enabled {
            return 0;
        }
        let chance = if settings.drop_chance.is_finite() {
            settings.drop_chance.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if !rng.random_bool(f64::from(chance)) {
            return 0;
        }
        rng.random_range(settings.min_coins..=settings.max_coins.max(settings.min_coins))
    }
}

/// How to bring a freshly borrowed obstacle to life
#[derive(Debug, Clone)]
pub struct SpawnParams {
    pub scale: f32,
    pub split_generation: u32,
    /// Positive value forces the health, otherwise it is rolled
    pub health: Option<i32>,
    pub path: Option<Rc<Path>>,
    pub path_start: f32,
    pub rotation_enabled: bool,
}

impl Default for SpawnParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            split_generation: 0,
            health: None,
            path: None,
            path_start: 0.0,
            rotation_enabled: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Obstacle {
    pub phase: ObstaclePhase,
    pub health: Health,
    pub movement: Movement,
    pub splitter: Splitter,
    pub coin_dropper: CoinDropper,
    pub rotation_enabled: bool,
    pub data: ObstacleData,
}

impl Poolable for Obstacle {
    fn validate_template(&self) -> Result<(), String> {
        if self.data.size <= 0.0 {
            return Err(format!("size must be positive, got {}", self.data.size));
        }
        if self.data.min_health > self.data.max_health {
            return Err(format!(
                "health range {}..={} is empty",
                self.data.min_health, self.data.max_health
            ));
        }
        Ok(())
    }
}

impl Obstacle {
    /// Pool template built from the shared archetype
    pub fn template(data: ObstacleData, drops_coins: bool) -> Self {
        Self {
            phase: ObstaclePhase::Pooled,
            health: Health {
                current: data.max_health,
                max: data.max_health,
            },
            movement: Movement::FreeFall(Ballistic::edge(1.0, data.fall_delay)),
            splitter: Splitter {
                scale: 1.0,
                generation: 0,
            },
            coin_dropper: CoinDropper {
                can_drop: drops_coins,
            },
            rotation_enabled: true,
            data,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == ObstaclePhase::Active
    }

    /// Collider radius at the current scale
    pub fn radius(&self) -> f32 {
        self.data.size * self.splitter.scale * 0.5
    }

    /// Enter play from a screen edge, or on the path when one is given
    pub fn initialize(
        &mut self,
        transform: &mut Transform,
        params: &SpawnParams,
        viewport: &Viewport,
        rng: &mut impl Rng,
    ) {
        self.health = Health::roll(&self.data, params.health, rng);
        self.splitter = Splitter {
            scale: params.scale,
            generation: params.split_generation,
        };
        self.rotation_enabled = params.rotation_enabled;
        transform.rotation = 0.0;

        self.movement = match &params.path {
            Some(path) => {
                let tracker = PathTracker::new(path.clone(), params.path_start);
                transform.position = tracker.position();
                Movement::PathFollowing(tracker)
            }
            None => {
                let height = viewport.height();
                let spawn_height =
                    rng.random_range(height * SPAWN_HEIGHT_MIN_RATIO..=height * SPAWN_HEIGHT_MAX_RATIO);
                let from_left = rng.random::<f32>() > 0.5;
                let edge = viewport.half_width + SPAWN_EDGE_OFFSET;
                let (x, direction) = if from_left { (-edge, 1.0) } else { (edge, -1.0) };
                transform.position = Vec2::new(x, spawn_height - viewport.half_height);
                Movement::FreeFall(Ballistic::edge(direction, self.data.fall_delay))
            }
        };
        self.phase = ObstaclePhase::Active;
    }

    /// Enter play as one half of a split, thrown outward from `position`
    #[allow(clippy::too_many_arguments)]
    pub fn initialize_as_child(
        &mut self,
        transform: &mut Transform,
        scale: f32,
        health: i32,
        position: Vec2,
        launch_angle: f32,
        launch_force: f32,
        split_generation: u32,
        rotation_enabled: bool,
    ) {
        self.health = Health {
            current: health,
            max: health,
        };
        self.splitter = Splitter {
            scale,
            generation: split_generation,
        };
        self.rotation_enabled = rotation_enabled;
        transform.position = position;
        self.movement = Movement::LaunchedChild(Ballistic::launched(launch_angle, launch_force));
        self.phase = ObstaclePhase::Active;
    }

    /// Advance movement and visual spin by `dt`
    pub fn step(&mut self, transform: &mut Transform, dt: f32, viewport: &Viewport) {
        if !self.is_active() {
            return;
        }
        let half_extent = self.radius();
        match &mut self.movement {
            Movement::PathFollowing(tracker) => {
                tracker.advance(dt);
                transform.position = tracker.position();
            }
            Movement::FreeFall(ballistic) | Movement::LaunchedChild(ballistic) => {
                ballistic.step(&mut transform.position, dt, &self.data, half_extent, viewport);
            }
        }
        if self.rotation_enabled {
            transform.rotation = (transform.rotation + OBSTACLE_ROTATION_SPEED * dt).rem_euclid(360.0);
        }
    }

    /// Free movers below the bottom edge (plus margin) have escaped
    pub fn is_off_screen(&self, position: Vec2, viewport: &Viewport) -> bool {
        match self.movement {
            Movement::PathFollowing(_) => false,
            _ => position.y < viewport.bottom() - OFFSCREEN_MARGIN,
        }
    }
}

/// Why an obstacle is leaving play
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyCause {
    /// Health ran out: score, coins and split
    Killed,
    /// Fell off screen: no score, no split
    Escaped,
}

/// Everything the obstacle lifecycle touches outside the obstacle itself
pub struct ObstacleContext<'a> {
    pub obstacles: &'a mut PoolRegistry<Obstacle>,
    pub coins: &'a mut PoolRegistry<Coin>,
    pub events: &'a mut Vec<GameEvent>,
    pub rng: &'a mut Pcg32,
    pub split: &'a SplitSettings,
    pub coin_settings: &'a CoinSettings,
    pub viewport: &'a Viewport,
}

impl ObstacleContext<'_> {
    /// Borrow and initialize one obstacle; `None` when the pool refuses
    pub fn spawn(&mut self, pool: &str, params: &SpawnParams) -> Option<EntityId> {
        let id = match self.obstacles.acquire(pool) {
            Ok(id) => id,
            Err(err) => {
                log::warn!("Obstacle spawn skipped: {}", err);
                return None;
            }
        };
        let entity = self.obstacles.get_mut(id)?;
        entity.value.phase = ObstaclePhase::Spawning;
        entity
            .value
            .initialize(&mut entity.transform, params, self.viewport, self.rng);

        let position = entity.transform.position;
        self.events
            .push(GameEvent::ObstacleSpawned(ObstacleSpawned { obstacle: id, position }));
        log::debug!(
            "Spawned obstacle {:?} scale={} generation={} at {:?}",
            id,
            params.scale,
            params.split_generation,
            position
        );
        Some(id)
    }

    /// Apply damage; ignored unless the obstacle is active
    pub fn damage(&mut self, id: EntityId, amount: i32) {
        let Some(entity) = self.obstacles.get_mut(id) else {
            return;
        };
        if !entity.enabled || !entity.value.is_active() {
            return;
        }

        let remaining = entity.value.health.take_damage(amount);
        let dead = entity.value.health.is_dead();
        if dead {
            entity.value.phase = ObstaclePhase::Dying;
        }

        self.events.push(GameEvent::ObstacleDamaged(ObstacleDamaged {
            obstacle: id,
            damage: amount,
            remaining_health: remaining,
        }));
        self.events.push(GameEvent::ObstacleHit(ObstacleHit {
            obstacle: id,
            damage: amount,
        }));

        if dead {
            self.destroy(id, DestroyCause::Killed);
        }
    }

    /// Move every active obstacle and cull the ones that escaped
    pub fn tick(&mut self, dt: f32) {
        for id in self.obstacles.all_active_ids() {
            let Some(entity) = self.obstacles.get_mut(id) else {
                continue;
            };
            entity.value.step(&mut entity.transform, dt, self.viewport);
            if entity.value.is_active() && entity.value.is_off_screen(entity.transform.position, self.viewport) {
                entity.value.phase = ObstaclePhase::Dying;
                self.destroy(id, DestroyCause::Escaped);
            }
        }
    }

    /// Publish, drop coins, return to the pool, then split.
    ///
    /// Runs at most once per life: the release is a no-op for an entity that
    /// is no longer active.
    pub fn destroy(&mut self, id: EntityId, cause: DestroyCause) {
        let Some(pool) = self.obstacles.pool_of(id).map(str::to_string) else {
            return;
        };
        let Some(entity) = self.obstacles.get(id) else {
            return;
        };
        if !entity.enabled {
            return;
        }

        let position = entity.transform.position;
        let obstacle = entity.value.clone();
        let score_value = match cause {
            DestroyCause::Killed => obstacle.data.score_value,
            DestroyCause::Escaped => 0,
        };

        self.events.push(GameEvent::ObstacleDestroyed(ObstacleDestroyed {
            obstacle: id,
            position,
            score_value,
            movement: obstacle.movement.kind(),
        }));

        if cause == DestroyCause::Killed {
            self.drop_coins(position, obstacle.coin_dropper);
        }

        if let Some(entity) = self.obstacles.get_mut(id) {
            entity.value.phase = ObstaclePhase::Pooled;
        }
        self.obstacles.release(&pool, id);

        if cause == DestroyCause::Killed && obstacle.splitter.can_split(self.split) {
            self.spawn_children(&pool, &obstacle, position);
        }
    }

    fn spawn_children(&mut self, pool: &str, parent: &Obstacle, position: Vec2) {
        let scale = parent.splitter.child_scale(self.split);
        let generation = parent.splitter.generation + 1;

        for angle in [-self.split.launch_angle, self.split.launch_angle] {
            let id = match self.obstacles.acquire_at(pool, position, 0.0) {
                Ok(id) => id,
                Err(err) => {
                    log::warn!("Split child skipped: {}", err);
                    continue;
                }
            };
            let Some(entity) = self.obstacles.get_mut(id) else {
                continue;
            };
            let health = self
                .rng
                .random_range(entity.value.data.min_health..=entity.value.data.max_health);
            entity.value.initialize_as_child(
                &mut entity.transform,
                scale,
                health,
                position,
                angle,
                self.split.launch_force,
                generation,
                parent.rotation_enabled,
            );
            self.events
                .push(GameEvent::ObstacleSpawned(ObstacleSpawned { obstacle: id, position }));
        }
    }

    fn drop_coins(&mut self, position: Vec2, dropper: CoinDropper) {
        let settings = self.coin_settings;
        let count = dropper.roll(settings, self.rng);
        for _ in 0..count {
            let offset = Vec2::new(
                self.rng.random_range(-COIN_SCATTER..=COIN_SCATTER),
                self.rng.random_range(-COIN_SCATTER..=COIN_SCATTER),
            );
            match self.coins.acquire_at(COIN_POOL, position + offset, 0.0) {
                Ok(id) => {
                    if let Some(coin) = self.coins.get_mut(id) {
                        coin.value.launch(settings.value, self.rng);
                    }
                }
                Err(err) => {
                    log::debug!("Coin drop skipped: {}", err);
                    break;
                }
            }
        }
    }
}
