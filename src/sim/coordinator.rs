//! Level flow: score, time and victory/defeat
//!
//! The coordinator owns no entities. It reacts to routed events, drives the
//! spawner on and off, and raises the level outcome events.

use super::events::{
    CoinCollected, GameEvent, GameStarted, LevelComplete, LevelFailed, ObstacleDamaged, ObstacleDestroyed,
    ScoreChanged,
};
use super::spawner::Spawner;
use crate::error::ConfigError;
use crate::level::{LevelConfig, SplitSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelOutcome {
    Complete,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct LevelCoordinator {
    level: Option<LevelConfig>,
    score: i64,
    elapsed: f32,
    destroyed: u32,
    active: bool,
    outcome: Option<LevelOutcome>,
}

impl LevelCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset counters, hand the level to the spawner and start it.
    ///
    /// An invalid level is rejected before anything is touched.
    pub fn load(
        &mut self,
        level: &LevelConfig,
        spawner: &mut Spawner,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), ConfigError> {
        level.validate()?;
        spawner.stop();
        spawner.set_level(level)?;

        self.level = Some(level.clone());
        self.score = 0;
        self.elapsed = 0.0;
        self.destroyed = 0;
        self.active = true;
        self.outcome = None;

        spawner.start();
        events.push(GameEvent::GameStarted(GameStarted {
            level_number: level.level_number,
        }));
        log::info!("Loaded {}", level.level_name);
        Ok(())
    }

    pub fn level(&self) -> Option<&LevelConfig> {
        self.level.as_ref()
    }

    /// Split behaviour every obstacle of the current level reads
    pub fn split_settings(&self) -> SplitSettings {
        self.level
            .as_ref()
            .map(|level| level.split)
            .unwrap_or_default()
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn obstacles_destroyed(&self) -> u32 {
        self.destroyed
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn outcome(&self) -> Option<LevelOutcome> {
        self.outcome
    }

    /// Advance the level clock and resolve a time limit
    pub fn tick(&mut self, dt: f32, spawner: &mut Spawner, events: &mut Vec<GameEvent>) {
        if !self.active {
            return;
        }
        self.elapsed += dt;

        let Some(level) = &self.level else {
            return;
        };
        if !level.is_time_up(self.elapsed) {
            return;
        }
        let outcome = if level.check_victory(self.score, self.destroyed) {
            LevelOutcome::Complete
        } else {
            LevelOutcome::Failed
        };
        self.finish(outcome, spawner, events);
    }

    /// Escaped obstacles (score 0) still count toward the destroyed total
    pub fn on_obstacle_destroyed(
        &mut self,
        event: &ObstacleDestroyed,
        spawner: &mut Spawner,
        events: &mut Vec<GameEvent>,
    ) {
        if !self.active {
            return;
        }
        self.score += i64::from(event.score_value);
        self.destroyed += 1;

        let won = self
            .level
            .as_ref()
            .is_some_and(|level| level.check_victory(self.score, self.destroyed));
        if won {
            self.finish(LevelOutcome::Complete, spawner, events);
        }
    }

    pub fn on_player_death(&mut self, spawner: &mut Spawner, events: &mut Vec<GameEvent>) {
        if !self.active {
            return;
        }
        self.finish(LevelOutcome::Failed, spawner, events);
    }

    fn finish(&mut self, outcome: LevelOutcome, spawner: &mut Spawner, events: &mut Vec<GameEvent>) {
        self.active = false;
        self.outcome = Some(outcome);
        spawner.stop();

        let level_number = self.level.as_ref().map_or(0, |level| level.level_number);
        match outcome {
            LevelOutcome::Complete => {
                log::info!("Level Complete! Score: {}", self.score);
                events.push(GameEvent::LevelComplete(LevelComplete {
                    level_number,
                    score: self.score,
                }));
            }
            LevelOutcome::Failed => {
                log::info!("Level Failed! Score: {}", self.score);
                events.push(GameEvent::LevelFailed(LevelFailed {
                    level_number,
                    score: self.score,
                }));
            }
        }
    }
}

/// Damage-based score and coin purse, independent of the level score
#[derive(Debug, Clone, Default)]
pub struct ScoreKeeper {
    score: i64,
    coins: u64,
}

impl ScoreKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn coins(&self) -> u64 {
        self.coins
    }

    /// Every point of damage dealt is a point of score
    pub fn on_obstacle_damaged(&mut self, event: &ObstacleDamaged) -> GameEvent {
        self.add_score(i64::from(event.damage))
    }

    pub fn on_coin_collected(&mut self, event: &CoinCollected) {
        self.coins += u64::from(event.amount);
    }

    pub fn add_score(&mut self, amount: i64) -> GameEvent {
        self.score += amount;
        log::debug!("Score updated: {} (+{})", self.score, amount);
        GameEvent::ScoreChanged(ScoreChanged {
            new_score: self.score,
            score_added: amount,
        })
    }

    pub fn reset(&mut self) {
        self.score = 0;
        self.coins = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::events::MovementKind;
    use crate::sim::pool::EntityId;
    use glam::Vec2;

    fn destroyed(score_value: i32) -> ObstacleDestroyed {
        ObstacleDestroyed {
            obstacle: EntityId(0),
            position: Vec2::ZERO,
            score_value,
            movement: MovementKind::FreeFall,
        }
    }

    fn loaded(level: LevelConfig) -> (LevelCoordinator, Spawner, Vec<GameEvent>) {
        let mut coordinator = LevelCoordinator::new();
        let mut spawner = Spawner::new();
        let mut events = Vec::new();
        coordinator.load(&level, &mut spawner, &mut events).unwrap();
        (coordinator, spawner, events)
    }

    #[test]
    fn test_load_resets_and_starts_spawner() {
        let (coordinator, spawner, events) = loaded(LevelConfig::default());
        assert!(coordinator.is_active());
        assert!(spawner.is_spawning());
        assert_eq!(coordinator.score(), 0);
        assert_eq!(
            events,
            vec![GameEvent::GameStarted(GameStarted { level_number: 1 })]
        );
        assert_eq!(coordinator.split_settings(), SplitSettings::default());
    }

    #[test]
    fn test_score_target_completes_level() {
        let (mut coordinator, mut spawner, mut events) = loaded(LevelConfig {
            target_score: 100,
            target_obstacle_count: 0,
            ..Default::default()
        });
        events.clear();

        for _ in 0..9 {
            coordinator.on_obstacle_destroyed(&destroyed(11), &mut spawner, &mut events);
        }
        assert_eq!(coordinator.score(), 99);
        assert!(events.is_empty());

        coordinator.on_obstacle_destroyed(&destroyed(1), &mut spawner, &mut events);
        assert_eq!(coordinator.outcome(), Some(LevelOutcome::Complete));
        assert!(!spawner.is_spawning());
        assert_eq!(
            events,
            vec![GameEvent::LevelComplete(LevelComplete {
                level_number: 1,
                score: 100
            })]
        );

        // Nothing counts after the level is over
        coordinator.on_obstacle_destroyed(&destroyed(50), &mut spawner, &mut events);
        assert_eq!(coordinator.score(), 100);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_escaped_obstacles_count_toward_destroyed() {
        let (mut coordinator, mut spawner, mut events) = loaded(LevelConfig {
            target_score: 0,
            target_obstacle_count: 2,
            ..Default::default()
        });
        coordinator.on_obstacle_destroyed(&destroyed(0), &mut spawner, &mut events);
        assert!(coordinator.is_active());
        coordinator.on_obstacle_destroyed(&destroyed(0), &mut spawner, &mut events);
        assert_eq!(coordinator.outcome(), Some(LevelOutcome::Complete));
        assert_eq!(coordinator.obstacles_destroyed(), 2);
    }

    #[test]
    fn test_time_up_decides_outcome() {
        let (mut coordinator, mut spawner, mut events) = loaded(LevelConfig {
            target_score: 10,
            time_limit: 1.0,
            ..Default::default()
        });
        for _ in 0..130 {
            coordinator.tick(1.0 / 120.0, &mut spawner, &mut events);
        }
        assert_eq!(coordinator.outcome(), Some(LevelOutcome::Failed));
        assert!(matches!(events.last(), Some(GameEvent::LevelFailed(_))));

        let (mut coordinator, mut spawner, mut events) = loaded(LevelConfig {
            target_score: 0,
            target_obstacle_count: 0,
            time_limit: 1.0,
            ..Default::default()
        });
        coordinator.tick(2.0, &mut spawner, &mut events);
        assert_eq!(coordinator.outcome(), Some(LevelOutcome::Complete));
    }

    #[test]
    fn test_unlimited_time_never_ends() {
        let (mut coordinator, mut spawner, mut events) = loaded(LevelConfig::default());
        coordinator.tick(10_000.0, &mut spawner, &mut events);
        assert!(coordinator.is_active());
        assert_eq!(coordinator.elapsed(), 10_000.0);
    }

    #[test]
    fn test_player_death_fails_once() {
        let (mut coordinator, mut spawner, mut events) = loaded(LevelConfig::default());
        events.clear();
        coordinator.on_player_death(&mut spawner, &mut events);
        coordinator.on_player_death(&mut spawner, &mut events);
        assert_eq!(coordinator.outcome(), Some(LevelOutcome::Failed));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_reload_clears_outcome() {
        let (mut coordinator, mut spawner, mut events) = loaded(LevelConfig::default());
        coordinator.on_player_death(&mut spawner, &mut events);
        coordinator
            .load(&LevelConfig::default(), &mut spawner, &mut events)
            .unwrap();
        assert!(coordinator.is_active());
        assert_eq!(coordinator.outcome(), None);
        assert!(spawner.is_spawning());
    }

    #[test]
    fn test_invalid_level_does_not_start() {
        let (mut coordinator, mut spawner, mut events) = loaded(LevelConfig::default());
        events.clear();

        let zero_weight = LevelConfig {
            level_number: 7,
            spawn_table: vec![crate::level::SpawnInfo {
                weight: 0,
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(matches!(
            coordinator.load(&zero_weight, &mut spawner, &mut events),
            Err(ConfigError::ZeroSpawnWeight { level: 7 })
        ));
        // The running level is left as it was
        assert_eq!(coordinator.level().map(|l| l.level_number), Some(1));
        assert!(spawner.is_spawning());
        assert!(events.is_empty());
    }

    #[test]
    fn test_score_keeper_tracks_damage_and_coins() {
        let mut keeper = ScoreKeeper::new();
        let event = keeper.on_obstacle_damaged(&ObstacleDamaged {
            obstacle: EntityId(1),
            damage: 3,
            remaining_health: 0,
        });
        assert_eq!(
            event,
            GameEvent::ScoreChanged(ScoreChanged {
                new_score: 3,
                score_added: 3
            })
        );
        keeper.on_coin_collected(&CoinCollected { amount: 2 });
        assert_eq!(keeper.coins(), 2);

        keeper.reset();
        assert_eq!(keeper.score(), 0);
        assert_eq!(keeper.coins(), 0);
    }
}
