//! Entity state store
//!
//! Owns every actor in the race. Ids are allocated in ascending order and
//! actors are kept in insertion order, so iteration order is stable for
//! deterministic replay.

use serde::{Deserialize, Serialize};

use super::state::{Actor, ActorId};
use crate::error::SimError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorStore {
    /// Sorted by id (insertion order)
    actors: Vec<Actor>,
    next_id: ActorId,
}

impl Default for ActorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorStore {
    pub fn new() -> Self {
        Self {
            actors: Vec::new(),
            next_id: 1,
        }
    }

    /// Rebuild a store from actors captured in a snapshot
    pub fn from_actors(mut actors: Vec<Actor>) -> Self {
        actors.sort_by_key(|a| a.id);
        actors.dedup_by_key(|a| a.id);
        let next_id = actors.last().map(|a| a.id + 1).unwrap_or(1);
        Self { actors, next_id }
    }

    /// Add an actor, assigning it the next id
    pub fn add(&mut self, mut actor: Actor) -> ActorId {
        let id = self.next_id;
        self.next_id += 1;
        actor.id = id;
        self.actors.push(actor);
        id
    }

    fn index_of(&self, id: ActorId) -> Result<usize, SimError> {
        self.actors
            .binary_search_by_key(&id, |a| a.id)
            .map_err(|_| SimError::NotFound(id))
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.index_of(id).is_ok()
    }

    pub fn get(&self, id: ActorId) -> Result<&Actor, SimError> {
        let idx = self.index_of(id)?;
        Ok(&self.actors[idx])
    }

    pub fn get_mut(&mut self, id: ActorId) -> Result<&mut Actor, SimError> {
        let idx = self.index_of(id)?;
        Ok(&mut self.actors[idx])
    }

    /// Mutate one actor in place
    pub fn update<R>(
        &mut self,
        id: ActorId,
        f: impl FnOnce(&mut Actor) -> R,
    ) -> Result<R, SimError> {
        Ok(f(self.get_mut(id)?))
    }

    /// Mutable access to two distinct actors at once
    pub fn pair_mut(
        &mut self,
        a: ActorId,
        b: ActorId,
    ) -> Result<(&mut Actor, &mut Actor), SimError> {
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        assert_ne!(ia, ib, "pair_mut needs two distinct actors");
        if ia < ib {
            let (left, right) = self.actors.split_at_mut(ib);
            Ok((&mut left[ia], &mut right[0]))
        } else {
            let (left, right) = self.actors.split_at_mut(ia);
            Ok((&mut right[0], &mut left[ib]))
        }
    }

    pub fn remove(&mut self, id: ActorId) -> Result<Actor, SimError> {
        let idx = self.index_of(id)?;
        Ok(self.actors.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.actors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Actor> {
        self.actors.iter_mut()
    }

    pub fn as_slice(&self) -> &[Actor] {
        &self.actors
    }

    pub fn ids(&self) -> Vec<ActorId> {
        self.actors.iter().map(|a| a.id).collect()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}
