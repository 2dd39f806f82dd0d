//! Level assets and game tuning data
//!
//! Loaded from JSON once per level and handed to the world as immutable
//! values. Every field has a default so partial files load.

use std::path::Path as FsPath;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::path::Path;

/// How obstacles of a level move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MovementType {
    /// Spawn at a screen edge, bounce sideways and fall
    #[default]
    Normal,
    /// Follow the level's waypoint path
    Path,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Normal => "Normal",
            MovementType::Path => "Path",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" | "fall" => Some(MovementType::Normal),
            "path" => Some(MovementType::Path),
            _ => None,
        }
    }
}

/// One row of the weighted spawn table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnInfo {
    /// Label for logs and tooling
    pub type_name: String,
    /// Size multiplier (1 = normal)
    pub scale: f32,
    /// Splits already "used up" (0 = splits the full number of times)
    pub split_generation: u32,
    /// Relative likelihood
    pub weight: u32,
}

impl Default for SpawnInfo {
    fn default() -> Self {
        Self {
            type_name: "Large".to_string(),
            scale: 1.0,
            split_generation: 0,
            weight: 10,
        }
    }
}

/// Level-wide split behaviour shared by every obstacle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitSettings {
    /// Child scale relative to the parent, in (0, 1)
    pub scale_ratio: f32,
    /// Launch angle of the children (degrees, mirrored left/right)
    pub launch_angle: f32,
    /// Launch impulse magnitude
    pub launch_force: f32,
    /// Generation at which obstacles stop splitting
    pub max_generation: u32,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            scale_ratio: 0.6,
            launch_angle: 45.0,
            launch_force: 3.0,
            max_generation: 2,
        }
    }
}

impl SplitSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.scale_ratio > 0.0 && self.scale_ratio < 1.0) {
            return Err(ConfigError::InvalidValue {
                what: "split scale ratio",
                value: self.scale_ratio,
            });
        }
        if !self.launch_force.is_finite() || self.launch_force < 0.0 {
            return Err(ConfigError::InvalidValue {
                what: "split launch force",
                value: self.launch_force,
            });
        }
        Ok(())
    }
}

/// Runtime difficulty ramp of the spawner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progression {
    pub enabled: bool,
    /// Seconds of active spawning between difficulty steps
    pub interval: f32,
    /// Seconds removed from both spawn interval bounds per step
    pub decrease_amount: f32,
    /// Floor for both spawn interval bounds
    pub minimum_interval: f32,
}

impl Default for Progression {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: 30.0,
            decrease_amount: 0.1,
            minimum_interval: 0.3,
        }
    }
}

/// Waypoint path used by path-movement levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub waypoints: Vec<Vec2>,
    /// Travel speed (units per second)
    pub speed: f32,
    #[serde(rename = "loop")]
    pub looping: bool,
    /// Spawn a snake head that leads the obstacles
    pub snake_head: bool,
    /// How far ahead of the obstacles the head starts
    pub head_lead_distance: f32,
    /// Live obstacles allowed on the path (0 = unlimited)
    pub max_obstacles_on_path: u32,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            waypoints: Vec::new(),
            speed: 2.0,
            looping: true,
            snake_head: false,
            head_lead_distance: 2.0,
            max_obstacles_on_path: 10,
        }
    }
}

/// Obstacle archetype shared by every level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleData {
    pub horizontal_speed: f32,
    /// Terminal fall speed, also used as the downward acceleration
    pub fall_speed: f32,
    /// Seconds of horizontal-only travel before falling starts
    pub fall_delay: f32,
    pub min_health: i32,
    pub max_health: i32,
    pub score_value: i32,
    /// Collider diameter at scale 1
    pub size: f32,
}

impl Default for ObstacleData {
    fn default() -> Self {
        Self {
            horizontal_speed: 3.0,
            fall_speed: 2.0,
            fall_delay: 1.0,
            min_health: 1,
            max_health: 5,
            score_value: 10,
            size: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletData {
    pub speed: f32,
    /// Seconds before an unused bullet returns to its pool
    pub lifetime: f32,
    pub damage: i32,
    pub radius: f32,
}

impl Default for BulletData {
    fn default() -> Self {
        Self {
            speed: 10.0,
            lifetime: 5.0,
            damage: 1,
            radius: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinSettings {
    /// Disables coin drops entirely when false
    pub enabled: bool,
    pub drop_chance: f32,
    pub min_coins: u32,
    pub max_coins: u32,
    pub value: u32,
    /// Speed when magnetized toward the weapon
    pub move_speed: f32,
    pub gravity: f32,
    pub radius: f32,
    /// Height of the ground line above the bottom screen edge
    pub ground_height: f32,
}

impl Default for CoinSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            drop_chance: 0.3,
            min_coins: 1,
            max_coins: 3,
            value: 1,
            move_speed: 3.0,
            gravity: 9.8,
            radius: 0.25,
            ground_height: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponSettings {
    pub move_speed: f32,
    pub screen_padding: f32,
    pub half_width: f32,
    /// Height of the weapon above the bottom screen edge
    pub base_height: f32,
    /// Seconds between shots
    pub fire_rate: f32,
    pub recoil_amount: f32,
    pub recoil_speed: f32,
    /// Coins inside this radius are pulled toward the weapon
    pub collect_radius: f32,
    /// Obstacles inside this radius kill the player
    pub hit_radius: f32,
}

impl Default for WeaponSettings {
    fn default() -> Self {
        Self {
            move_speed: 8.0,
            screen_padding: 0.5,
            half_width: 0.5,
            base_height: 1.0,
            fire_rate: 0.15,
            recoil_amount: 0.1,
            recoil_speed: 10.0,
            collect_radius: 3.0,
            hit_radius: 0.5,
        }
    }
}

/// Pre-warm size and growth policy of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub initial_size: usize,
    pub growable: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            initial_size: 20,
            growable: true,
        }
    }
}

/// Level-independent tuning (archetypes and pool sizes)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub obstacle: ObstacleData,
    pub bullet: BulletData,
    pub coin: CoinSettings,
    pub weapon: WeaponSettings,
    pub obstacle_pool: PoolSettings,
    pub bullet_pool: PoolSettings,
    pub coin_pool: PoolSettings,
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let o = &self.obstacle;
        if o.min_health > o.max_health {
            return Err(ConfigError::InvalidRange {
                what: "obstacle health",
                min: o.min_health as f32,
                max: o.max_health as f32,
            });
        }
        if o.min_health < 1 {
            return Err(ConfigError::InvalidValue {
                what: "obstacle min health",
                value: o.min_health as f32,
            });
        }
        if o.size <= 0.0 {
            return Err(ConfigError::InvalidValue {
                what: "obstacle size",
                value: o.size,
            });
        }
        let c = &self.coin;
        if c.min_coins > c.max_coins {
            return Err(ConfigError::InvalidRange {
                what: "coins per drop",
                min: c.min_coins as f32,
                max: c.max_coins as f32,
            });
        }
        if !(0.0..=1.0).contains(&c.drop_chance) {
            return Err(ConfigError::InvalidValue {
                what: "coin drop chance",
                value: c.drop_chance,
            });
        }
        if self.weapon.fire_rate < 0.0 {
            return Err(ConfigError::InvalidValue {
                what: "weapon fire rate",
                value: self.weapon.fire_rate,
            });
        }
        Ok(())
    }
}

/// Per-level asset: spawn table, split behaviour, win/loss conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub level_number: u32,
    pub level_name: String,
    pub movement_type: MovementType,
    /// Visual spin of obstacles (never applied on path levels)
    pub enable_rotation: bool,

    pub min_spawn_interval: f32,
    pub max_spawn_interval: f32,
    /// Live obstacles allowed before the spawner waits (0 = unlimited)
    pub max_obstacles_on_screen: u32,
    pub spawn_table: Vec<SpawnInfo>,

    pub split: SplitSettings,
    pub progression: Progression,

    /// Score needed to win (0 = no score requirement)
    pub target_score: i64,
    /// Seconds available (0 = unlimited)
    pub time_limit: f32,
    /// Obstacles to destroy (0 = no count requirement)
    pub target_obstacle_count: u32,

    pub path: Option<PathConfig>,
    pub next_level: Option<u32>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            level_number: 1,
            level_name: "Level 1".to_string(),
            movement_type: MovementType::Normal,
            enable_rotation: true,
            min_spawn_interval: 1.0,
            max_spawn_interval: 3.0,
            max_obstacles_on_screen: 5,
            spawn_table: vec![SpawnInfo::default()],
            split: SplitSettings::default(),
            progression: Progression::default(),
            target_score: 100,
            time_limit: 0.0,
            target_obstacle_count: 0,
            path: None,
            next_level: None,
        }
    }
}

impl LevelConfig {
    /// Parse a single level from JSON, sanitize and validate it
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut level: LevelConfig = serde_json::from_str(json)?;
        level.sanitize();
        level.validate()?;
        Ok(level)
    }

    /// Repair values the game tolerates (logged, not fatal)
    pub fn sanitize(&mut self) {
        let max_generation = self.split.max_generation;
        for info in &mut self.spawn_table {
            if info.scale <= 0.0 {
                log::warn!(
                    "Spawn entry '{}' has scale {}, using 1.0",
                    info.type_name,
                    info.scale
                );
                info.scale = 1.0;
            }
            if info.split_generation > max_generation {
                log::warn!(
                    "Spawn entry '{}' split generation {} exceeds max {}, clamping",
                    info.type_name,
                    info.split_generation,
                    max_generation
                );
                info.split_generation = max_generation;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spawn_table.is_empty() {
            return Err(ConfigError::EmptySpawnTable {
                level: self.level_number,
            });
        }
        if self.total_weight() == 0 {
            return Err(ConfigError::ZeroSpawnWeight {
                level: self.level_number,
            });
        }
        if self.min_spawn_interval < 0.0 {
            return Err(ConfigError::InvalidValue {
                what: "min spawn interval",
                value: self.min_spawn_interval,
            });
        }
        if self.min_spawn_interval > self.max_spawn_interval {
            return Err(ConfigError::InvalidRange {
                what: "spawn interval",
                min: self.min_spawn_interval,
                max: self.max_spawn_interval,
            });
        }
        self.split.validate()?;
        let p = &self.progression;
        if p.enabled && p.interval <= 0.0 {
            return Err(ConfigError::InvalidValue {
                what: "progression interval",
                value: p.interval,
            });
        }
        if p.enabled && p.minimum_interval < 0.0 {
            return Err(ConfigError::InvalidValue {
                what: "progression minimum interval",
                value: p.minimum_interval,
            });
        }
        if self.movement_type == MovementType::Path {
            let path = self.path.as_ref().ok_or(ConfigError::MissingPath {
                level: self.level_number,
            })?;
            Path::from_config(path)?;
        }
        Ok(())
    }

    pub fn uses_path(&self) -> bool {
        self.movement_type == MovementType::Path && self.path.is_some()
    }

    /// Summed in `u64` so no table of `u32` weights can overflow
    pub fn total_weight(&self) -> u64 {
        self.spawn_table.iter().map(|info| u64::from(info.weight)).sum()
    }

    /// Weighted random pick from the spawn table
    pub fn pick_spawn_info(&self, rng: &mut impl Rng) -> Option<&SpawnInfo> {
        let total = self.total_weight();
        if total == 0 {
            return None;
        }
        let draw = rng.random_range(0..total);
        pick_weighted(&self.spawn_table, |info| info.weight, draw)
    }

    /// Both requirements must hold; a requirement of 0 is always satisfied
    pub fn check_victory(&self, score: i64, destroyed: u32) -> bool {
        if self.target_score > 0 && score < self.target_score {
            return false;
        }
        if self.target_obstacle_count > 0 && destroyed < self.target_obstacle_count {
            return false;
        }
        true
    }

    pub fn is_time_up(&self, elapsed: f32) -> bool {
        self.time_limit > 0.0 && elapsed >= self.time_limit
    }
}

/// Cumulative-weight scan: the first entry whose running total exceeds `draw` wins.
///
/// `draw` must lie in `[0, total_weight)`.
pub fn pick_weighted<T>(entries: &[T], weight: impl Fn(&T) -> u32, draw: u64) -> Option<&T> {
    let mut cumulative = 0u64;
    for entry in entries {
        cumulative += u64::from(weight(entry));
        if draw < cumulative {
            return Some(entry);
        }
    }
    None
}

/// Every level of the game plus the shared tuning
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelCatalog {
    pub game: GameConfig,
    pub levels: Vec<LevelConfig>,
}

impl LevelCatalog {
    /// Levels bundled with the binary
    const BUILTIN: &'static str = include_str!("../levels/default.json");

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut catalog: LevelCatalog = serde_json::from_str(json)?;
        catalog.game.validate()?;
        for level in &mut catalog.levels {
            level.sanitize();
            level.validate()?;
        }
        log::info!("Loaded {} levels", catalog.levels.len());
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<FsPath>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json(Self::BUILTIN)
    }

    pub fn get(&self, level_number: u32) -> Result<&LevelConfig, ConfigError> {
        self.levels
            .iter()
            .find(|level| level.level_number == level_number)
            .ok_or(ConfigError::UnknownLevel(level_number))
    }

    pub fn first(&self) -> Option<&LevelConfig> {
        self.levels.first()
    }

    /// Level that follows `level_number`, if it names one
    pub fn next_after(&self, level_number: u32) -> Option<&LevelConfig> {
        let next = self.get(level_number).ok()?.next_level?;
        self.get(next).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn table(weights: &[u32]) -> LevelConfig {
        LevelConfig {
            spawn_table: weights
                .iter()
                .enumerate()
                .map(|(i, &weight)| SpawnInfo {
                    type_name: format!("t{i}"),
                    weight,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_pick_weighted_boundaries() {
        let weights = [10u32, 10, 80];
        let pick = |draw| pick_weighted(&weights, |w| *w, draw).copied();
        assert_eq!(pick(0), Some(10));
        assert_eq!(pick(9), Some(10));
        assert_eq!(pick(10), Some(10)); // second entry, also weight 10
        assert_eq!(pick(19), Some(10));
        assert_eq!(pick(20), Some(80));
        assert_eq!(pick(99), Some(80));
        assert_eq!(pick(100), None);
    }

    #[test]
    fn test_pick_weighted_skips_zero_weight() {
        let weights = [0u32, 5];
        assert_eq!(pick_weighted(&weights, |w| *w, 0), Some(&5));
    }

    #[test]
    fn test_huge_weights_do_not_overflow() {
        let level = LevelConfig::from_json(
            r#"{"spawn_table":[{"type_name":"a","weight":4294967295},{"type_name":"b","weight":1}]}"#,
        )
        .unwrap();
        assert_eq!(level.total_weight(), 4_294_967_296);

        let pick = |draw| pick_weighted(&level.spawn_table, |info| info.weight, draw);
        assert_eq!(pick(4_294_967_294).unwrap().type_name, "a");
        assert_eq!(pick(4_294_967_295).unwrap().type_name, "b");

        let mut rng = Pcg32::seed_from_u64(11);
        for _ in 0..100 {
            assert!(level.pick_spawn_info(&mut rng).is_some());
        }
    }

    #[test]
    fn test_weighted_frequencies_converge() {
        let level = table(&[10, 10, 80]);
        let mut rng = Pcg32::seed_from_u64(7);
        let mut counts = [0u32; 3];
        let samples = 100_000;
        for _ in 0..samples {
            let info = level.pick_spawn_info(&mut rng).unwrap();
            let idx = level
                .spawn_table
                .iter()
                .position(|i| i.type_name == info.type_name)
                .unwrap();
            counts[idx] += 1;
        }
        let freq: Vec<f32> = counts.iter().map(|&c| c as f32 / samples as f32).collect();
        assert!((freq[0] - 0.1).abs() < 0.01, "{freq:?}");
        assert!((freq[1] - 0.1).abs() < 0.01, "{freq:?}");
        assert!((freq[2] - 0.8).abs() < 0.01, "{freq:?}");
    }

    #[test]
    fn test_victory_predicate() {
        let level = LevelConfig {
            target_score: 100,
            target_obstacle_count: 0,
            ..Default::default()
        };
        assert!(!level.check_victory(99, 50));
        assert!(level.check_victory(100, 0));

        let level = LevelConfig {
            target_score: 0,
            target_obstacle_count: 3,
            ..Default::default()
        };
        assert!(!level.check_victory(1000, 2));
        assert!(level.check_victory(0, 3));
    }

    #[test]
    fn test_time_up() {
        let unlimited = LevelConfig::default();
        assert!(!unlimited.is_time_up(10_000.0));

        let timed = LevelConfig {
            time_limit: 60.0,
            ..Default::default()
        };
        assert!(!timed.is_time_up(59.9));
        assert!(timed.is_time_up(60.0));
    }

    #[test]
    fn test_zero_weight_rejected() {
        let level = table(&[0, 0]);
        assert!(matches!(
            level.validate(),
            Err(ConfigError::ZeroSpawnWeight { level: 1 })
        ));
        let level = table(&[]);
        assert!(matches!(
            level.validate(),
            Err(ConfigError::EmptySpawnTable { .. })
        ));
    }

    #[test]
    fn test_path_level_requires_valid_path() {
        let mut level = LevelConfig {
            movement_type: MovementType::Path,
            ..Default::default()
        };
        assert!(matches!(level.validate(), Err(ConfigError::MissingPath { .. })));

        level.path = Some(PathConfig {
            waypoints: vec![Vec2::ZERO],
            ..Default::default()
        });
        assert!(matches!(level.validate(), Err(ConfigError::DegeneratePath(1))));

        level.path = Some(PathConfig {
            waypoints: vec![Vec2::ZERO, Vec2::new(10.0, 0.0)],
            ..Default::default()
        });
        assert!(level.validate().is_ok());
        assert!(level.uses_path());
    }

    #[test]
    fn test_sanitize_repairs_scale_and_generation() {
        let mut level = LevelConfig {
            spawn_table: vec![SpawnInfo {
                scale: -1.0,
                split_generation: 9,
                ..Default::default()
            }],
            ..Default::default()
        };
        level.sanitize();
        assert_eq!(level.spawn_table[0].scale, 1.0);
        assert_eq!(level.spawn_table[0].split_generation, 2);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let level = LevelConfig::from_json(r#"{ "level_number": 4, "target_score": 250 }"#)
            .expect("partial level should load");
        assert_eq!(level.level_number, 4);
        assert_eq!(level.target_score, 250);
        assert_eq!(level.min_spawn_interval, 1.0);
        assert_eq!(level.split.max_generation, 2);
        assert_eq!(level.spawn_table.len(), 1);
    }

    #[test]
    fn test_path_json_loop_key() {
        let level = LevelConfig::from_json(
            r#"{
                "movement_type": "Path",
                "path": { "waypoints": [[0, 0], [10, 0]], "loop": false, "speed": 5 }
            }"#,
        )
        .expect("path level should load");
        let path = level.path.unwrap();
        assert!(!path.looping);
        assert_eq!(path.speed, 5.0);
        assert_eq!(path.waypoints[1], Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_builtin_catalog_links_levels() {
        let catalog = LevelCatalog::builtin().expect("builtin levels are valid");
        let first = catalog.first().expect("at least one level");
        assert_eq!(first.level_number, 1);
        let second = catalog.next_after(1).expect("level 1 links to level 2");
        assert_eq!(second.level_number, 2);
        assert!(matches!(catalog.get(99), Err(ConfigError::UnknownLevel(99))));
    }

    #[test]
    fn test_movement_type_from_str() {
        assert_eq!(MovementType::from_str("PATH"), Some(MovementType::Path));
        assert_eq!(MovementType::from_str("normal"), Some(MovementType::Normal));
        assert_eq!(MovementType::from_str("zigzag"), None);
        assert_eq!(MovementType::Path.as_str(), "Path");
    }
}
