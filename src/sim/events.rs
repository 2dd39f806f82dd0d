//! Game events and the publish/subscribe bus
//!
//! Events are immutable records broadcast once. Handlers for a single
//! publish run synchronously, in subscription order, on the caller's thread.
//! The simulation collects [`GameEvent`]s during a tick and the world routes
//! them to its own systems before publishing them on the [`EventBus`].

use std::any::{Any, TypeId};
use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::pool::EntityId;

/// Marker for types that can travel over the [`EventBus`]
pub trait Event: Any + std::fmt::Debug {}

/// How an obstacle was moving when an event was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementKind {
    FreeFall,
    PathFollowing,
    LaunchedChild,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleSpawned {
    pub obstacle: EntityId,
    pub position: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleDestroyed {
    pub obstacle: EntityId,
    pub position: Vec2,
    /// 0 for obstacles that escaped off screen
    pub score_value: i32,
    pub movement: MovementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleDamaged {
    pub obstacle: EntityId,
    pub damage: i32,
    pub remaining_health: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleHit {
    pub obstacle: EntityId,
    pub damage: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulletFired {
    pub bullet: EntityId,
    pub position: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoinCollected {
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreChanged {
    pub new_score: i64,
    pub score_added: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameStarted {
    pub level_number: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelComplete {
    pub level_number: u32,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelFailed {
    pub level_number: u32,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerDeath;

impl Event for ObstacleSpawned {}
impl Event for ObstacleDestroyed {}
impl Event for ObstacleDamaged {}
impl Event for ObstacleHit {}
impl Event for BulletFired {}
impl Event for CoinCollected {}
impl Event for ScoreChanged {}
impl Event for GameStarted {}
impl Event for LevelComplete {}
impl Event for LevelFailed {}
impl Event for PlayerDeath {}

/// Every event the simulation raises, in the order it raised them
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    ObstacleSpawned(ObstacleSpawned),
    ObstacleDestroyed(ObstacleDestroyed),
    ObstacleDamaged(ObstacleDamaged),
    ObstacleHit(ObstacleHit),
    BulletFired(BulletFired),
    CoinCollected(CoinCollected),
    ScoreChanged(ScoreChanged),
    GameStarted(GameStarted),
    LevelComplete(LevelComplete),
    LevelFailed(LevelFailed),
    PlayerDeath(PlayerDeath),
}

impl GameEvent {
    /// Publish the wrapped event under its concrete type
    pub fn dispatch(&self, bus: &mut EventBus) {
        match self {
            GameEvent::ObstacleSpawned(e) => bus.publish(e),
            GameEvent::ObstacleDestroyed(e) => bus.publish(e),
            GameEvent::ObstacleDamaged(e) => bus.publish(e),
            GameEvent::ObstacleHit(e) => bus.publish(e),
            GameEvent::BulletFired(e) => bus.publish(e),
            GameEvent::CoinCollected(e) => bus.publish(e),
            GameEvent::ScoreChanged(e) => bus.publish(e),
            GameEvent::GameStarted(e) => bus.publish(e),
            GameEvent::LevelComplete(e) => bus.publish(e),
            GameEvent::LevelFailed(e) => bus.publish(e),
            GameEvent::PlayerDeath(e) => bus.publish(e),
        }
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&dyn Any)>;

struct Subscriber {
    id: SubscriptionId,
    handler: Handler,
}

/// Publish/subscribe dispatch keyed by event type
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<TypeId, Vec<Subscriber>>,
    next_id: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("event_types", &self.handlers.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for events of type `E`
    pub fn subscribe<E: Event>(&mut self, mut handler: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        let handler: Handler = Box::new(move |event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<E>() {
                handler(event);
            }
        });
        self.handlers
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Subscriber { id, handler });
        id
    }

    /// Remove a handler; returns false if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for subscribers in self.handlers.values_mut() {
            if let Some(pos) = subscribers.iter().position(|s| s.id == id) {
                subscribers.remove(pos);
                return true;
            }
        }
        false
    }

    /// Deliver `event` to every handler of its type, in subscription order
    pub fn publish<E: Event>(&mut self, event: &E) {
        if let Some(subscribers) = self.handlers.get_mut(&TypeId::of::<E>()) {
            for subscriber in subscribers.iter_mut() {
                (subscriber.handler)(event as &dyn Any);
            }
        }
    }

    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.handlers
            .get(&TypeId::of::<E>())
            .map_or(0, |subscribers| subscribers.len())
    }

    /// Drop every handler
    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    /// Drop the handlers of one event type
    pub fn clear_type<E: Event>(&mut self) {
        if let Some(subscribers) = self.handlers.get_mut(&TypeId::of::<E>()) {
            subscribers.clear();
        }
    }
}
