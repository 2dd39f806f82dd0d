//! Timed obstacle spawner with difficulty progression
//!
//! The spawn timer counts down from a random wait and fires once it runs
//! out. The first spawn happens on the first tick after [`Spawner::start`].

use std::rc::Rc;

use rand::Rng;

use super::events::{MovementKind, ObstacleDestroyed};
use super::obstacle::{ObstacleContext, SpawnParams};
use super::path::Path;
use super::pool::EntityId;
use crate::consts::OBSTACLE_POOL;
use crate::error::ConfigError;
use crate::level::{LevelConfig, MovementType};

#[derive(Debug, Clone, Default)]
pub struct Spawner {
    level: Option<LevelConfig>,
    path: Option<Rc<Path>>,
    spawning: bool,
    /// Seconds until the next spawn attempt
    spawn_timer: f32,
    progression_timer: f32,
    current_min: f32,
    current_max: f32,
    /// Live obstacles that entered through the path
    path_count: u32,
}

impl Spawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a level: resets timers, intervals, progression and the path count
    pub fn set_level(&mut self, level: &LevelConfig) -> Result<(), ConfigError> {
        self.path = match &level.path {
            Some(config) if level.uses_path() => Some(Rc::new(Path::from_config(config)?)),
            None if level.movement_type == MovementType::Path => {
                return Err(ConfigError::MissingPath {
                    level: level.level_number,
                });
            }
            _ => None,
        };
        self.current_min = level.min_spawn_interval;
        self.current_max = level.max_spawn_interval;
        self.spawn_timer = 0.0;
        self.progression_timer = 0.0;
        self.path_count = 0;
        self.level = Some(level.clone());
        Ok(())
    }

    pub fn start(&mut self) {
        if self.spawning {
            return;
        }
        self.spawning = true;
        self.spawn_timer = 0.0;
    }

    /// Halt pending spawns; obstacles already in play are unaffected
    pub fn stop(&mut self) {
        self.spawning = false;
        self.progression_timer = 0.0;
    }

    pub fn is_spawning(&self) -> bool {
        self.spawning
    }

    /// Current `(min, max)` spawn interval
    pub fn interval(&self) -> (f32, f32) {
        (self.current_min, self.current_max)
    }

    pub fn path_count(&self) -> u32 {
        self.path_count
    }

    /// Shared path of the current level, if it is a path level
    pub fn path(&self) -> Option<&Rc<Path>> {
        self.path.as_ref()
    }

    /// Advance timers and spawn at most one obstacle
    pub fn tick(&mut self, dt: f32, ctx: &mut ObstacleContext<'_>) -> Option<EntityId> {
        if !self.spawning {
            return None;
        }

        let progression = self.level.as_ref().map(|level| level.progression);
        if let Some(progression) = progression.filter(|p| p.enabled) {
            self.progression_timer += dt;
            if self.progression_timer >= progression.interval {
                self.progression_timer = 0.0;
                self.increase_difficulty();
            }
        }

        self.spawn_timer -= dt;
        if self.spawn_timer > 0.0 {
            return None;
        }

        let spawned = self.spawn_obstacle(ctx);
        self.spawn_timer = ctx
            .rng
            .random_range(self.current_min..=self.current_max.max(self.current_min));
        spawned
    }

    /// One difficulty step: both bounds shrink, floored at the minimum interval
    pub fn increase_difficulty(&mut self) {
        let Some(level) = &self.level else {
            return;
        };
        let p = &level.progression;
        self.current_min = (self.current_min - p.decrease_amount).max(p.minimum_interval);
        self.current_max = (self.current_max - p.decrease_amount).max(p.minimum_interval);
        log::info!(
            "Difficulty increased! New interval: {:.2} - {:.2}",
            self.current_min,
            self.current_max
        );
    }

    /// Path obstacles free a slot when they die; other kinds never held one
    pub fn on_obstacle_destroyed(&mut self, event: &ObstacleDestroyed) {
        if event.movement == MovementKind::PathFollowing && self.path_count > 0 {
            self.path_count -= 1;
        }
    }

    fn spawn_obstacle(&mut self, ctx: &mut ObstacleContext<'_>) -> Option<EntityId> {
        let Some(level) = &self.level else {
            log::error!("Spawner has no level");
            return None;
        };

        let path_cap = match (&self.path, &level.path) {
            (Some(_), Some(config)) => config.max_obstacles_on_path,
            _ => 0,
        };
        if path_cap > 0 && self.path_count >= path_cap {
            log::debug!("Path spawn limit reached: {}/{}", self.path_count, path_cap);
            return None;
        }

        if level.max_obstacles_on_screen > 0
            && ctx.obstacles.active_count(OBSTACLE_POOL) >= level.max_obstacles_on_screen as usize
        {
            log::debug!("Screen spawn limit reached: {}", level.max_obstacles_on_screen);
            return None;
        }

        let Some(info) = level.pick_spawn_info(ctx.rng) else {
            log::error!("Level {} has no spawnable entries", level.level_number);
            return None;
        };

        let params = SpawnParams {
            scale: info.scale,
            split_generation: info.split_generation,
            health: None,
            path: self.path.clone(),
            path_start: 0.0,
            rotation_enabled: self.path.is_none() && level.enable_rotation,
        };
        let id = ctx.spawn(OBSTACLE_POOL, &params)?;
        if self.path.is_some() {
            self.path_count += 1;
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{COIN_POOL, SIM_DT};
    use crate::level::{CoinSettings, ObstacleData, PathConfig, Progression, SpawnInfo, SplitSettings};
    use crate::sim::collision::Viewport;
    use crate::sim::events::GameEvent;
    use crate::sim::obstacle::Obstacle;
    use crate::sim::pool::PoolRegistry;
    use crate::sim::weapon::Coin;
    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    struct Fixture {
        obstacles: PoolRegistry<Obstacle>,
        coins: PoolRegistry<Coin>,
        events: Vec<GameEvent>,
        rng: Pcg32,
        split: SplitSettings,
        coin_settings: CoinSettings,
        viewport: Viewport,
    }

    impl Fixture {
        fn new() -> Self {
            let mut obstacles = PoolRegistry::new();
            obstacles
                .create_pool(OBSTACLE_POOL, Obstacle::template(ObstacleData::default(), false), 20, true)
                .unwrap();
            let mut coins = PoolRegistry::new();
            coins.create_pool(COIN_POOL, Coin::default(), 0, false).unwrap();
            Self {
                obstacles,
                coins,
                events: Vec::new(),
                rng: Pcg32::seed_from_u64(9),
                split: SplitSettings::default(),
                coin_settings: CoinSettings::default(),
                viewport: Viewport::portrait(),
            }
        }

        fn run(&mut self, spawner: &mut Spawner, seconds: f32) -> usize {
            let mut spawned = 0;
            let ticks = (seconds / SIM_DT).round() as usize;
            for _ in 0..ticks {
                let mut ctx = ObstacleContext {
                    obstacles: &mut self.obstacles,
                    coins: &mut self.coins,
                    events: &mut self.events,
                    rng: &mut self.rng,
                    split: &self.split,
                    coin_settings: &self.coin_settings,
                    viewport: &self.viewport,
                };
                if spawner.tick(SIM_DT, &mut ctx).is_some() {
                    spawned += 1;
                }
            }
            spawned
        }
    }

    fn level(min: f32, max: f32) -> LevelConfig {
        LevelConfig {
            min_spawn_interval: min,
            max_spawn_interval: max,
            max_obstacles_on_screen: 0,
            ..Default::default()
        }
    }

    fn path_level(cap: u32) -> LevelConfig {
        LevelConfig {
            movement_type: MovementType::Path,
            path: Some(PathConfig {
                waypoints: vec![Vec2::new(-4.0, 6.0), Vec2::new(4.0, 6.0)],
                max_obstacles_on_path: cap,
                ..Default::default()
            }),
            ..level(1.0, 1.0)
        }
    }

    #[test]
    fn test_spawns_immediately_then_waits() {
        let mut fx = Fixture::new();
        let mut spawner = Spawner::new();
        spawner.set_level(&level(1.0, 1.0)).unwrap();
        spawner.start();

        assert_eq!(fx.run(&mut spawner, SIM_DT), 1);
        assert_eq!(fx.run(&mut spawner, 0.9), 0);
        assert_eq!(fx.run(&mut spawner, 0.2), 1);
    }

    #[test]
    fn test_spawn_rate_stays_within_interval_bounds() {
        let mut fx = Fixture::new();
        let mut spawner = Spawner::new();
        spawner.set_level(&level(1.0, 3.0)).unwrap();
        spawner.start();

        // 60 s with waits in [1, 3]: at least 20 and at most 61 spawns
        let spawned = fx.run(&mut spawner, 60.0);
        assert!((20..=61).contains(&spawned), "{spawned}");
    }

    #[test]
    fn test_stop_halts_spawning() {
        let mut fx = Fixture::new();
        let mut spawner = Spawner::new();
        spawner.set_level(&level(0.5, 0.5)).unwrap();
        spawner.start();
        fx.run(&mut spawner, 1.0);
        spawner.stop();

        let active = fx.obstacles.active_count(OBSTACLE_POOL);
        assert_eq!(fx.run(&mut spawner, 5.0), 0);
        assert!(fx.obstacles.active_count(OBSTACLE_POOL) <= active);
        assert!(!spawner.is_spawning());
    }

    #[test]
    fn test_progression_floors_both_bounds() {
        let mut spawner = Spawner::new();
        let config = LevelConfig {
            progression: Progression {
                enabled: true,
                interval: 30.0,
                decrease_amount: 0.1,
                minimum_interval: 0.3,
            },
            ..level(1.0, 3.0)
        };
        spawner.set_level(&config).unwrap();

        for _ in 0..25 {
            spawner.increase_difficulty();
        }
        let (min, max) = spawner.interval();
        assert_eq!(min, 0.3);
        assert!((max - 0.5).abs() < 1e-4, "{max}");
        assert!(max >= 0.3);

        for _ in 0..100 {
            spawner.increase_difficulty();
        }
        assert_eq!(spawner.interval(), (0.3, 0.3));
    }

    #[test]
    fn test_progression_steps_on_active_time() {
        let mut fx = Fixture::new();
        let mut spawner = Spawner::new();
        let config = LevelConfig {
            progression: Progression {
                enabled: true,
                interval: 1.0,
                decrease_amount: 0.5,
                minimum_interval: 0.3,
            },
            ..level(2.0, 3.0)
        };
        spawner.set_level(&config).unwrap();

        // Stopped: no progression
        fx.run(&mut spawner, 5.0);
        assert_eq!(spawner.interval(), (2.0, 3.0));

        spawner.start();
        fx.run(&mut spawner, 1.05);
        assert_eq!(spawner.interval(), (1.5, 2.5));
    }

    #[test]
    fn test_path_cap_blocks_until_a_path_obstacle_dies() {
        let mut fx = Fixture::new();
        let mut spawner = Spawner::new();
        spawner.set_level(&path_level(2)).unwrap();
        spawner.start();

        fx.run(&mut spawner, 10.0);
        assert_eq!(spawner.path_count(), 2);
        assert_eq!(fx.obstacles.active_count(OBSTACLE_POOL), 2);

        let victim = fx.obstacles.active_ids(OBSTACLE_POOL)[0];
        let non_path = ObstacleDestroyed {
            obstacle: victim,
            position: Vec2::ZERO,
            score_value: 0,
            movement: MovementKind::LaunchedChild,
        };
        spawner.on_obstacle_destroyed(&non_path);
        assert_eq!(spawner.path_count(), 2);

        spawner.on_obstacle_destroyed(&ObstacleDestroyed {
            movement: MovementKind::PathFollowing,
            ..non_path
        });
        assert_eq!(spawner.path_count(), 1);
        assert_eq!(fx.run(&mut spawner, 1.1), 1);
        assert_eq!(spawner.path_count(), 2);
    }

    #[test]
    fn test_path_obstacles_never_rotate() {
        let mut fx = Fixture::new();
        let mut spawner = Spawner::new();
        spawner.set_level(&path_level(0)).unwrap();
        spawner.start();
        fx.run(&mut spawner, 3.0);

        for id in fx.obstacles.active_ids(OBSTACLE_POOL) {
            let entity = fx.obstacles.get(id).unwrap();
            assert!(!entity.value.rotation_enabled);
            assert!((entity.transform.position.y - 6.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_max_on_screen_gates_spawns() {
        let mut fx = Fixture::new();
        let mut spawner = Spawner::new();
        spawner
            .set_level(&LevelConfig {
                max_obstacles_on_screen: 3,
                ..level(0.1, 0.1)
            })
            .unwrap();
        spawner.start();
        fx.run(&mut spawner, 1.0);
        assert_eq!(fx.obstacles.active_count(OBSTACLE_POOL), 3);
    }

    #[test]
    fn test_spawn_table_fields_reach_obstacle() {
        let mut fx = Fixture::new();
        let mut spawner = Spawner::new();
        spawner
            .set_level(&LevelConfig {
                spawn_table: vec![SpawnInfo {
                    type_name: "Tiny".to_string(),
                    scale: 0.4,
                    split_generation: 2,
                    weight: 1,
                }],
                ..level(1.0, 1.0)
            })
            .unwrap();
        spawner.start();
        fx.run(&mut spawner, SIM_DT);

        let id = fx.obstacles.active_ids(OBSTACLE_POOL)[0];
        let obstacle = &fx.obstacles.get(id).unwrap().value;
        assert_eq!(obstacle.splitter.scale, 0.4);
        assert_eq!(obstacle.splitter.generation, 2);
    }

    #[test]
    fn test_exhausted_pool_skips_spawn() {
        let mut fx = Fixture::new();
        fx.obstacles = PoolRegistry::new();
        fx.obstacles
            .create_pool(OBSTACLE_POOL, Obstacle::template(ObstacleData::default(), false), 1, false)
            .unwrap();
        let mut spawner = Spawner::new();
        spawner.set_level(&path_level(0)).unwrap();
        spawner.start();

        assert_eq!(fx.run(&mut spawner, SIM_DT), 1);
        assert_eq!(spawner.path_count(), 1);

        assert_eq!(fx.run(&mut spawner, 5.0), 0);
        assert_eq!(spawner.path_count(), 1);
        assert!(spawner.is_spawning());
        assert_eq!(fx.obstacles.active_count(OBSTACLE_POOL), 1);
        assert_eq!(fx.obstacles.total_count(OBSTACLE_POOL), 1);
    }

    #[test]
    fn test_new_level_resets_spawn_timer() {
        let mut fx = Fixture::new();
        let mut spawner = Spawner::new();
        spawner.set_level(&level(2.0, 3.0)).unwrap();
        spawner.start();
        fx.run(&mut spawner, 50.0);
        assert!(spawner.spawn_timer <= 3.0);

        spawner.stop();
        spawner.set_level(&level(2.0, 3.0)).unwrap();
        assert_eq!(spawner.spawn_timer, 0.0);
        spawner.start();
        assert_eq!(fx.run(&mut spawner, SIM_DT), 1);
    }

    #[test]
    fn test_path_config_ignored_on_normal_level() {
        let mut spawner = Spawner::new();
        let config = LevelConfig {
            movement_type: MovementType::Normal,
            ..path_level(2)
        };
        spawner.set_level(&config).unwrap();
        assert!(spawner.path().is_none());
    }

    #[test]
    fn test_missing_path_rejected() {
        let mut spawner = Spawner::new();
        let config = LevelConfig {
            movement_type: MovementType::Path,
            ..Default::default()
        };
        assert!(matches!(
            spawner.set_level(&config),
            Err(ConfigError::MissingPath { .. })
        ));
    }
}
