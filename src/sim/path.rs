//! Waypoint paths and distance-driven followers
//!
//! A follower's position is a pure function of the distance it has travelled
//! along the polyline. Looping paths wrap back to the first waypoint; the
//! last waypoint is not joined to the first.

use std::rc::Rc;

use glam::Vec2;

use crate::error::ConfigError;
use crate::level::PathConfig;

/// Validated polyline with precomputed segment lengths
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    waypoints: Vec<Vec2>,
    segment_lengths: Vec<f32>,
    total_length: f32,
    pub looping: bool,
    /// Units per second
    pub speed: f32,
}

impl Path {
    pub fn new(waypoints: Vec<Vec2>, looping: bool, speed: f32) -> Result<Self, ConfigError> {
        let waypoints: Vec<Vec2> = waypoints.into_iter().filter(|p| p.is_finite()).collect();
        if waypoints.len() < 2 {
            return Err(ConfigError::DegeneratePath(waypoints.len()));
        }
        if !speed.is_finite() || speed < 0.0 {
            return Err(ConfigError::InvalidValue {
                what: "path speed",
                value: speed,
            });
        }

        let segment_lengths: Vec<f32> = waypoints
            .windows(2)
            .map(|pair| pair[0].distance(pair[1]))
            .collect();
        let total_length = segment_lengths.iter().sum::<f32>();
        if total_length <= 0.0 {
            return Err(ConfigError::ZeroLengthPath);
        }

        Ok(Self {
            waypoints,
            segment_lengths,
            total_length,
            looping,
            speed,
        })
    }

    pub fn from_config(config: &PathConfig) -> Result<Self, ConfigError> {
        Self::new(config.waypoints.clone(), config.looping, config.speed)
    }

    pub fn total_length(&self) -> f32 {
        self.total_length
    }

    /// Position after travelling `distance` from the first waypoint
    pub fn position_at(&self, distance: f32) -> Vec2 {
        if distance <= 0.0 {
            return self.waypoints[0];
        }

        let mut accumulated = 0.0;
        for (i, &length) in self.segment_lengths.iter().enumerate() {
            if length <= 0.0 {
                continue;
            }
            if accumulated + length >= distance {
                let t = (distance - accumulated) / length;
                return self.waypoints[i].lerp(self.waypoints[i + 1], t);
            }
            accumulated += length;
        }

        self.waypoints[self.waypoints.len() - 1]
    }

    /// Map a raw distance onto the path: modulo when looping, clamped otherwise
    pub fn wrap_distance(&self, distance: f32) -> f32 {
        if self.looping {
            distance.rem_euclid(self.total_length)
        } else {
            distance.clamp(0.0, self.total_length)
        }
    }
}

/// Distance accumulator following a shared [`Path`]
#[derive(Debug, Clone)]
pub struct PathTracker {
    path: Rc<Path>,
    distance: f32,
    active: bool,
}

impl PathTracker {
    pub fn new(path: Rc<Path>, start_distance: f32) -> Self {
        let distance = path.wrap_distance(start_distance.max(0.0));
        let active = path.looping || distance < path.total_length;
        Self {
            path,
            distance,
            active,
        }
    }

    /// Travel `dt` seconds at the path speed
    pub fn advance(&mut self, dt: f32) {
        if !self.active {
            return;
        }
        self.distance += self.path.speed * dt;

        if self.distance >= self.path.total_length {
            if self.path.looping {
                self.distance %= self.path.total_length;
            } else {
                self.distance = self.path.total_length;
                self.active = false;
            }
        }
    }

    pub fn position(&self) -> Vec2 {
        self.path.position_at(self.distance)
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn path(&self) -> &Rc<Path> {
        &self.path
    }
}

/// Lead follower that starts ahead of the obstacles on a path level
#[derive(Debug, Clone)]
pub struct SnakeHead {
    tracker: PathTracker,
    moving: bool,
}

impl SnakeHead {
    pub fn new(path: Rc<Path>, lead_distance: f32) -> Self {
        let tracker = PathTracker::new(path, lead_distance);
        let moving = tracker.is_active();
        Self { tracker, moving }
    }

    pub fn tick(&mut self, dt: f32) {
        if !self.moving {
            return;
        }
        self.tracker.advance(dt);
        if !self.tracker.is_active() {
            self.moving = false;
        }
    }

    pub fn stop(&mut self) {
        self.moving = false;
    }

    /// Resume travel; a head parked at the end of an open path stays put
    pub fn resume(&mut self) {
        self.moving = self.tracker.is_active();
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn position(&self) -> Vec2 {
        self.tracker.position()
    }

    pub fn distance(&self) -> f32 {
        self.tracker.distance()
    }
}
