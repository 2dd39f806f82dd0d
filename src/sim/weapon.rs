//! Player weapon, its bullets and the coins it collects

use glam::Vec2;
use rand::Rng;

use super::collision::Viewport;
use super::events::{BulletFired, GameEvent};
use super::pool::{EntityId, Poolable, PoolRegistry, Transform};
use crate::consts::*;
use crate::level::{BulletData, CoinSettings, WeaponSettings};
use crate::move_towards;

/// Cannon at the bottom of the screen
#[derive(Debug, Clone)]
pub struct Weapon {
    pub position: Vec2,
    settings: WeaponSettings,
    min_x: f32,
    max_x: f32,
    /// Seconds until the next shot is allowed
    cooldown: f32,
    /// Downward barrel displacement from the last shot
    recoil: f32,
}

impl Weapon {
    pub fn new(settings: WeaponSettings, viewport: &Viewport) -> Self {
        let inset = settings.half_width + settings.screen_padding;
        let (min_x, max_x) = if viewport.half_width > inset {
            (viewport.left() + inset, viewport.right() - inset)
        } else {
            (0.0, 0.0)
        };
        Self {
            position: Vec2::new(0.0, viewport.bottom() + settings.base_height),
            settings,
            min_x,
            max_x,
            cooldown: 0.0,
            recoil: 0.0,
        }
    }

    pub fn settings(&self) -> &WeaponSettings {
        &self.settings
    }

    /// Horizontal travel limits
    pub fn bounds(&self) -> (f32, f32) {
        (self.min_x, self.max_x)
    }

    pub fn fire_point(&self) -> Vec2 {
        self.position + Vec2::new(0.0, FIRE_POINT_OFFSET)
    }

    pub fn recoil(&self) -> f32 {
        self.recoil
    }

    /// Ease toward a pointer target, or slide with a keyboard axis when there is none
    pub fn steer(&mut self, target_x: Option<f32>, axis: f32, dt: f32) {
        let x = match target_x {
            Some(target) => {
                let t = (self.settings.move_speed * dt).clamp(0.0, 1.0);
                self.position.x + (target - self.position.x) * t
            }
            None if axis != 0.0 => self.position.x + axis.clamp(-1.0, 1.0) * self.settings.move_speed * dt,
            None => return,
        };
        self.position.x = x.clamp(self.min_x, self.max_x);
    }

    /// Run down the cooldown and settle the recoil
    pub fn tick(&mut self, dt: f32) {
        self.cooldown = (self.cooldown - dt).max(0.0);
        if self.recoil > RECOIL_EPSILON {
            let t = (self.settings.recoil_speed * dt).clamp(0.0, 1.0);
            self.recoil -= self.recoil * t;
        } else {
            self.recoil = 0.0;
        }
    }

    /// Whether the cooldown allows a shot now; arms the next one if so
    pub fn ready_to_fire(&mut self, firing: bool) -> bool {
        if !firing || self.cooldown > 0.0 {
            return false;
        }
        self.cooldown = self.settings.fire_rate;
        true
    }

    /// Borrow a bullet at the fire point, launch it and kick the barrel
    pub fn fire(
        &mut self,
        bullets: &mut PoolRegistry<Bullet>,
        data: &BulletData,
        events: &mut Vec<GameEvent>,
    ) -> Option<EntityId> {
        let position = self.fire_point();
        let id = match bullets.acquire_at(BULLET_POOL, position, 0.0) {
            Ok(id) => id,
            Err(err) => {
                log::warn!("Shot dropped: {}", err);
                return None;
            }
        };
        if let Some(bullet) = bullets.get_mut(id) {
            bullet.value.launch(data);
        }
        events.push(GameEvent::BulletFired(BulletFired { bullet: id, position }));
        self.recoil = self.settings.recoil_amount;
        Some(id)
    }
}

/// Projectile flying straight up
#[derive(Debug, Clone, Default)]
pub struct Bullet {
    pub velocity: Vec2,
    pub damage: i32,
    pub radius: f32,
    age: f32,
    lifetime: f32,
}

impl Poolable for Bullet {}

impl Bullet {
    pub fn launch(&mut self, data: &BulletData) {
        self.velocity = Vec2::Y * data.speed;
        self.damage = data.damage;
        self.radius = data.radius;
        self.lifetime = data.lifetime;
        self.age = 0.0;
    }

    /// Move; returns true once the bullet should go back to its pool
    pub fn step(&mut self, transform: &mut Transform, dt: f32, viewport: &Viewport) -> bool {
        self.age += dt;
        transform.position += self.velocity * dt;
        self.age >= self.lifetime || transform.position.y - self.radius > viewport.top()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoinState {
    #[default]
    Falling,
    Grounded,
    /// Pulled toward the weapon
    Magnetized,
}

#[derive(Debug, Clone, Default)]
pub struct Coin {
    pub velocity: Vec2,
    pub value: u32,
    pub state: CoinState,
}

impl Poolable for Coin {}

impl Coin {
    /// Throw the coin sideways and slightly up with a random force
    pub fn launch(&mut self, value: u32, rng: &mut impl Rng) {
        let side = if rng.random::<f32>() > 0.5 { 1.0 } else { -1.0 };
        let horizontal = rng.random_range(COIN_FORCE_MIN..=COIN_FORCE_MAX) * side;
        let upward = rng.random_range(COIN_FORCE_MIN * 0.5..=COIN_FORCE_MAX * 0.5);
        self.velocity = Vec2::new(horizontal, upward);
        self.value = value;
        self.state = CoinState::Falling;
    }

    pub fn attract(&mut self) {
        self.state = CoinState::Magnetized;
    }

    /// Advance by `dt`; returns true when the coin reached `collect_point`
    pub fn step(
        &mut self,
        transform: &mut Transform,
        collect_point: Vec2,
        dt: f32,
        settings: &CoinSettings,
        viewport: &Viewport,
    ) -> bool {
        match self.state {
            CoinState::Magnetized => {
                transform.position = move_towards(transform.position, collect_point, settings.move_speed * dt);
                transform.position.distance(collect_point) < COIN_COLLECT_DISTANCE
            }
            CoinState::Grounded => false,
            CoinState::Falling => {
                self.velocity.y -= settings.gravity * dt;
                transform.position += self.velocity * dt;

                if transform.position.x.abs() > viewport.half_width {
                    self.velocity.x = -self.velocity.x;
                    transform.position.x = transform.position.x.clamp(viewport.left(), viewport.right());
                }

                let ground = viewport.bottom() + settings.ground_height;
                if transform.position.y - settings.radius <= ground {
                    self.state = CoinState::Grounded;
                    self.velocity = Vec2::ZERO;
                    transform.position.y = ground + settings.radius;
                }
                false
            }
        }
    }
}
