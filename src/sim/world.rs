//! The simulation world
//!
//! Owns every pool, the spawner, the level flow and the event bus, and
//! advances them all by one fixed step per [`World::tick`]. Events raised
//! during a step are routed to the world's own systems first and then
//! published on the bus, in the order they were raised.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::collision::{Viewport, circles_overlap, overlap_circle, viewport_or_default};
use super::coordinator::{LevelCoordinator, ScoreKeeper};
use super::events::{CoinCollected, EventBus, GameEvent, PlayerDeath};
use super::obstacle::{Obstacle, ObstacleContext, ObstaclePhase};
use super::path::SnakeHead;
use super::pool::PoolRegistry;
use super::spawner::Spawner;
use super::weapon::{Bullet, Coin, CoinState, Weapon};
use crate::consts::*;
use crate::error::{ConfigError, Result};
use crate::level::{LevelCatalog, LevelConfig};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Fire button / touch held
    pub firing: bool,
    /// Pointer x in world units
    pub target_x: Option<f32>,
    /// Keyboard axis in [-1, 1], used when there is no pointer target
    pub axis: f32,
}

#[derive(Debug)]
pub struct World {
    seed: u64,
    rng: Pcg32,
    catalog: LevelCatalog,
    viewport: Viewport,
    bus: EventBus,
    obstacles: PoolRegistry<Obstacle>,
    bullets: PoolRegistry<Bullet>,
    coins: PoolRegistry<Coin>,
    spawner: Spawner,
    coordinator: LevelCoordinator,
    score_keeper: ScoreKeeper,
    weapon: Weapon,
    snake_head: Option<SnakeHead>,
    /// Player death is raised at most once per level
    player_dead: bool,
    time_ticks: u64,
    accumulator: f32,
    outbox: Vec<GameEvent>,
}

impl World {
    /// Build pools and the weapon; no level is running until one is loaded
    pub fn new(catalog: LevelCatalog, viewport: Option<Viewport>, seed: u64) -> Result<Self> {
        let viewport = viewport_or_default(viewport);
        let game = &catalog.game;
        game.validate()?;

        let mut obstacles = PoolRegistry::new();
        obstacles.create_pool(
            OBSTACLE_POOL,
            Obstacle::template(game.obstacle, game.coin.enabled),
            game.obstacle_pool.initial_size,
            game.obstacle_pool.growable,
        )?;
        let mut bullets = PoolRegistry::new();
        bullets.create_pool(
            BULLET_POOL,
            Bullet::default(),
            game.bullet_pool.initial_size,
            game.bullet_pool.growable,
        )?;
        let mut coins = PoolRegistry::new();
        coins.create_pool(
            COIN_POOL,
            Coin::default(),
            game.coin_pool.initial_size,
            game.coin_pool.growable,
        )?;

        let weapon = Weapon::new(game.weapon, &viewport);
        log::info!("World initialized with seed: {}", seed);

        Ok(Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            catalog,
            viewport,
            bus: EventBus::new(),
            obstacles,
            bullets,
            coins,
            spawner: Spawner::new(),
            coordinator: LevelCoordinator::new(),
            score_keeper: ScoreKeeper::new(),
            weapon,
            snake_head: None,
            player_dead: false,
            time_ticks: 0,
            accumulator: 0.0,
            outbox: Vec::new(),
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn catalog(&self) -> &LevelCatalog {
        &self.catalog
    }

    /// Subscribe here to observe the game
    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn coordinator(&self) -> &LevelCoordinator {
        &self.coordinator
    }

    pub fn score_keeper(&self) -> &ScoreKeeper {
        &self.score_keeper
    }

    pub fn spawner(&self) -> &Spawner {
        &self.spawner
    }

    pub fn weapon(&self) -> &Weapon {
        &self.weapon
    }

    pub fn snake_head(&self) -> Option<&SnakeHead> {
        self.snake_head.as_ref()
    }

    pub fn obstacles(&self) -> &PoolRegistry<Obstacle> {
        &self.obstacles
    }

    pub fn bullets(&self) -> &PoolRegistry<Bullet> {
        &self.bullets
    }

    pub fn coins(&self) -> &PoolRegistry<Coin> {
        &self.coins
    }

    pub fn current_level(&self) -> Option<&LevelConfig> {
        self.coordinator.level()
    }

    /// Clear the field and start level `level_number`; an invalid level leaves the world untouched
    pub fn load_level(&mut self, level_number: u32) -> Result<()> {
        let level = self.catalog.get(level_number)?.clone();
        level.validate()?;

        self.clear_field();
        self.score_keeper.reset();
        self.player_dead = false;
        self.weapon = Weapon::new(self.catalog.game.weapon, &self.viewport);

        self.coordinator.load(&level, &mut self.spawner, &mut self.outbox)?;
        self.snake_head = match (self.spawner.path(), &level.path) {
            (Some(path), Some(config)) if config.snake_head => {
                Some(SnakeHead::new(path.clone(), config.head_lead_distance))
            }
            _ => None,
        };

        self.flush_events();
        Ok(())
    }

    pub fn load_first_level(&mut self) -> Result<()> {
        let first = self
            .catalog
            .first()
            .map(|level| level.level_number)
            .ok_or(ConfigError::EmptyCatalog)?;
        self.load_level(first)
    }

    /// Load the level the current one links to; `false` when there is none
    pub fn load_next_level(&mut self) -> Result<bool> {
        let next = self
            .coordinator
            .level()
            .and_then(|level| self.catalog.next_after(level.level_number))
            .map(|level| level.level_number);
        match next {
            Some(level_number) => {
                self.load_level(level_number)?;
                Ok(true)
            }
            None => {
                log::info!("No next level!");
                Ok(false)
            }
        }
    }

    pub fn restart_level(&mut self) -> Result<()> {
        match self.coordinator.level().map(|level| level.level_number) {
            Some(level_number) => self.load_level(level_number),
            None => self.load_first_level(),
        }
    }

    /// Run as many fixed steps as `frame_dt` covers, capped at [`MAX_SUBSTEPS`]
    pub fn advance(&mut self, frame_dt: f32, input: &TickInput) -> u32 {
        self.accumulator += frame_dt.min(0.1);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.tick(input);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        substeps
    }

    /// Advance the world by one fixed timestep
    pub fn tick(&mut self, input: &TickInput) {
        let dt = SIM_DT;
        self.time_ticks += 1;

        let split = self.coordinator.split_settings();
        let coin_settings = self.catalog.game.coin;
        let bullet_data = self.catalog.game.bullet;

        // Weapon
        self.weapon.tick(dt);
        self.weapon.steer(input.target_x, input.axis, dt);
        if self.weapon.ready_to_fire(input.firing && self.coordinator.is_active()) {
            self.weapon.fire(&mut self.bullets, &bullet_data, &mut self.outbox);
        }

        // Obstacles and bullets
        {
            let mut ctx = ObstacleContext {
                obstacles: &mut self.obstacles,
                coins: &mut self.coins,
                events: &mut self.outbox,
                rng: &mut self.rng,
                split: &split,
                coin_settings: &coin_settings,
                viewport: &self.viewport,
            };
            self.spawner.tick(dt, &mut ctx);
            ctx.tick(dt);

            for id in self.bullets.all_active_ids() {
                let Some(entity) = self.bullets.get_mut(id) else {
                    continue;
                };
                if entity.value.step(&mut entity.transform, dt, &self.viewport) {
                    self.bullets.release(BULLET_POOL, id);
                    continue;
                }

                let (position, radius, damage) =
                    (entity.transform.position, entity.value.radius, entity.value.damage);
                let target = ctx
                    .obstacles
                    .iter_active()
                    .find(|o| {
                        o.value.is_active()
                            && circles_overlap(position, radius, o.transform.position, o.value.radius())
                    })
                    .map(|o| o.id);
                if let Some(target) = target {
                    ctx.damage(target, damage);
                    self.bullets.release(BULLET_POOL, id);
                }
            }
        }

        if let Some(head) = &mut self.snake_head {
            head.tick(dt);
        }

        // Coins
        let collect_point = self.weapon.position;
        let nearby = overlap_circle(
            collect_point,
            self.weapon.settings().collect_radius,
            self.coins
                .iter_active()
                .map(|coin| (coin.id, coin.transform.position, coin_settings.radius)),
        );
        for id in nearby {
            if let Some(coin) = self.coins.get_mut(id) {
                if coin.value.state != CoinState::Magnetized {
                    coin.value.attract();
                }
            }
        }
        for id in self.coins.all_active_ids() {
            let Some(entity) = self.coins.get_mut(id) else {
                continue;
            };
            if entity
                .value
                .step(&mut entity.transform, collect_point, dt, &coin_settings, &self.viewport)
            {
                let amount = entity.value.value;
                self.coins.release(COIN_POOL, id);
                self.outbox.push(GameEvent::CoinCollected(CoinCollected { amount }));
            }
        }

        // Obstacle reaching the weapon
        if self.coordinator.is_active() && !self.player_dead {
            let hit_radius = self.weapon.settings().hit_radius;
            let touching = self.obstacles.iter_active().any(|o| {
                o.value.is_active()
                    && circles_overlap(self.weapon.position, hit_radius, o.transform.position, o.value.radius())
            });
            if touching {
                log::info!("Player hit at tick {}", self.time_ticks);
                self.player_dead = true;
                self.outbox.push(GameEvent::PlayerDeath(PlayerDeath));
            }
        }

        self.coordinator.tick(dt, &mut self.spawner, &mut self.outbox);
        self.flush_events();
    }

    /// Return every entity to its pool without raising events
    fn clear_field(&mut self) {
        for id in self.obstacles.active_ids(OBSTACLE_POOL) {
            if let Some(entity) = self.obstacles.get_mut(id) {
                entity.value.phase = ObstaclePhase::Pooled;
            }
        }
        self.obstacles.release_all(OBSTACLE_POOL);
        self.bullets.release_all(BULLET_POOL);
        self.coins.release_all(COIN_POOL);
    }

    fn flush_events(&mut self) {
        let mut queue: VecDeque<GameEvent> = self.outbox.drain(..).collect();
        while let Some(event) = queue.pop_front() {
            let mut raised = Vec::new();
            self.route(&event, &mut raised);
            event.dispatch(&mut self.bus);
            queue.extend(raised);
        }
    }

    /// Internal consumers run before external subscribers
    fn route(&mut self, event: &GameEvent, raised: &mut Vec<GameEvent>) {
        match event {
            GameEvent::ObstacleDestroyed(e) => {
                self.spawner.on_obstacle_destroyed(e);
                self.coordinator.on_obstacle_destroyed(e, &mut self.spawner, raised);
            }
            GameEvent::ObstacleDamaged(e) => {
                raised.push(self.score_keeper.on_obstacle_damaged(e));
            }
            GameEvent::CoinCollected(e) => self.score_keeper.on_coin_collected(e),
            GameEvent::PlayerDeath(_) => self.coordinator.on_player_death(&mut self.spawner, raised),
            GameEvent::LevelComplete(_) | GameEvent::LevelFailed(_) => {
                if let Some(head) = &mut self.snake_head {
                    head.stop();
                }
            }
            _ => {}
        }
    }
}
