//! Named object pools
//!
//! Entities are created once (pre-warmed or grown on demand) and then only
//! ever toggled between idle and active. Each entity belongs to exactly one
//! pool and sits in exactly one of its idle queue or active set.

use std::collections::{BTreeSet, HashMap, VecDeque};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, PoolError};

/// Stable handle of a pooled entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Spatial state of an entity
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec2,
    /// Orientation in degrees
    pub rotation: f32,
}

/// Types that can be stamped out of a pool template
pub trait Poolable: Clone {
    /// Checked once when a pool is created from this template
    fn validate_template(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A pooled entity: engine-side state plus the game payload
#[derive(Debug, Clone)]
pub struct Pooled<T> {
    pub id: EntityId,
    pub transform: Transform,
    /// Visible/simulated; true exactly while the entity is active
    pub enabled: bool,
    pub value: T,
    pool: usize,
}

#[derive(Debug, Clone)]
struct PoolRecord<T> {
    name: String,
    template: T,
    idle: VecDeque<EntityId>,
    active: BTreeSet<EntityId>,
    growable: bool,
}

/// Registry of named pools sharing one entity store
#[derive(Debug, Clone)]
pub struct PoolRegistry<T> {
    pools: Vec<PoolRecord<T>>,
    by_name: HashMap<String, usize>,
    entities: Vec<Pooled<T>>,
}

impl<T> Default for PoolRegistry<T> {
    fn default() -> Self {
        Self {
            pools: Vec::new(),
            by_name: HashMap::new(),
            entities: Vec::new(),
        }
    }
}

impl<T: Poolable> PoolRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool and pre-instantiate `initial_size` idle entities
    pub fn create_pool(
        &mut self,
        name: &str,
        template: T,
        initial_size: usize,
        growable: bool,
    ) -> Result<(), ConfigError> {
        if self.by_name.contains_key(name) {
            return Err(ConfigError::DuplicatePool(name.to_string()));
        }
        template
            .validate_template()
            .map_err(|reason| ConfigError::InvalidTemplate {
                pool: name.to_string(),
                reason,
            })?;

        let index = self.pools.len();
        self.pools.push(PoolRecord {
            name: name.to_string(),
            template,
            idle: VecDeque::with_capacity(initial_size),
            active: BTreeSet::new(),
            growable,
        });
        self.by_name.insert(name.to_string(), index);

        for _ in 0..initial_size {
            let id = self.instantiate(index);
            self.pools[index].idle.push_back(id);
        }

        log::info!("Initialized pool '{}' with {} objects", name, initial_size);
        Ok(())
    }

    /// Borrow an entity (FIFO), growing the pool if allowed
    pub fn acquire(&mut self, name: &str) -> Result<EntityId, PoolError> {
        let index = self.pool_index(name)?;
        let id = match self.pools[index].idle.pop_front() {
            Some(id) => id,
            None if self.pools[index].growable => {
                log::debug!("Pool '{}' grew to {}", name, self.total_count(name) + 1);
                self.instantiate(index)
            }
            None => {
                log::warn!("Pool '{}' is exhausted and cannot grow", name);
                return Err(PoolError::Exhausted(name.to_string()));
            }
        };

        self.pools[index].active.insert(id);
        self.entities[id.0 as usize].enabled = true;
        Ok(id)
    }

    /// Borrow an entity with its transform set before it becomes enabled
    pub fn acquire_at(&mut self, name: &str, position: Vec2, rotation: f32) -> Result<EntityId, PoolError> {
        let index = self.pool_index(name)?;
        let id = match self.pools[index].idle.front().copied() {
            Some(id) => id,
            None if self.pools[index].growable => {
                let id = self.instantiate(index);
                self.pools[index].idle.push_front(id);
                id
            }
            None => {
                log::warn!("Pool '{}' is exhausted and cannot grow", name);
                return Err(PoolError::Exhausted(name.to_string()));
            }
        };
        self.entities[id.0 as usize].transform = Transform { position, rotation };
        self.acquire(name)
    }

    /// Return an entity; no-op unless it is currently active in `name`
    pub fn release(&mut self, name: &str, id: EntityId) -> bool {
        let Some(&index) = self.by_name.get(name) else {
            return false;
        };
        if !self.pools[index].active.remove(&id) {
            return false;
        }
        self.entities[id.0 as usize].enabled = false;
        self.pools[index].idle.push_back(id);
        true
    }

    /// Return every active entity of `name`; returns how many were released
    pub fn release_all(&mut self, name: &str) -> usize {
        let ids = self.active_ids(name);
        ids.into_iter().filter(|&id| self.release(name, id)).count()
    }

    pub fn get(&self, id: EntityId) -> Option<&Pooled<T>> {
        self.entities.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Pooled<T>> {
        self.entities.get_mut(id.0 as usize)
    }

    /// Name of the pool an entity belongs to
    pub fn pool_of(&self, id: EntityId) -> Option<&str> {
        let entity = self.get(id)?;
        Some(self.pools[entity.pool].name.as_str())
    }

    pub fn template(&self, name: &str) -> Option<&T> {
        self.by_name.get(name).map(|&index| &self.pools[index].template)
    }

    pub fn is_active(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(|entity| entity.enabled)
    }

    /// Active entities of one pool, in id order
    pub fn active_ids(&self, name: &str) -> Vec<EntityId> {
        self.by_name
            .get(name)
            .map(|&index| self.pools[index].active.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Active entities of every pool, in id order
    pub fn all_active_ids(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|entity| entity.enabled)
            .map(|entity| entity.id)
            .collect()
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &Pooled<T>> {
        self.entities.iter().filter(|entity| entity.enabled)
    }

    pub fn idle_count(&self, name: &str) -> usize {
        self.by_name
            .get(name)
            .map_or(0, |&index| self.pools[index].idle.len())
    }

    pub fn active_count(&self, name: &str) -> usize {
        self.by_name
            .get(name)
            .map_or(0, |&index| self.pools[index].active.len())
    }

    pub fn total_count(&self, name: &str) -> usize {
        self.idle_count(name) + self.active_count(name)
    }

    fn pool_index(&self, name: &str) -> Result<usize, PoolError> {
        self.by_name.get(name).copied().ok_or_else(|| {
            log::warn!("Pool '{}' does not exist", name);
            PoolError::UnknownPool(name.to_string())
        })
    }

    fn instantiate(&mut self, pool: usize) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(Pooled {
            id,
            transform: Transform::default(),
            enabled: false,
            value: self.pools[pool].template.clone(),
            pool,
        });
        id
    }
}
