//! # Entity Registry
//!
//! Sole owner of every entity in a session plus the spatial index that maps
//! positions to the entities standing there.
//!
//! Nothing outside the registry keeps a copy of a position or a health value;
//! everything is read back through it, so there are no stale duplicates to
//! fall out of sync when entities move or die.

use crate::{DungeonError, DungeonResult, Entity, EntityId, Position};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Owns all entities of a session, keyed by id.
///
/// Iteration is always in id order, which is spawn order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "StoredRegistry")]
pub struct EntityRegistry {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u64,
    /// Entities on the map, by tile. Rebuilt on load.
    #[serde(skip)]
    position_index: HashMap<Position, Vec<EntityId>>,
}

#[derive(Deserialize)]
struct StoredRegistry {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u64,
}

impl From<StoredRegistry> for EntityRegistry {
    fn from(stored: StoredRegistry) -> Self {
        let mut registry = EntityRegistry {
            entities: stored.entities,
            next_id: stored.next_id,
            position_index: HashMap::new(),
        };
        registry.rebuild_position_index();
        registry
    }
}

impl PartialEq for EntityRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.entities == other.entities && self.next_id == other.next_id
    }
}

impl EntityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entity and assigns it the next id.
    ///
    /// # Panics
    ///
    /// Panics when a living actor is spawned onto a tile already held by
    /// another living actor.
    ///
    /// # Examples
    ///
    /// ```
    /// use dungeon::{Entity, EntityRegistry, EntityStats, MonsterKind, Position};
    ///
    /// let mut registry = EntityRegistry::new();
    /// let player = registry.spawn(Entity::player(Position::new(1, 1), 10, EntityStats::new(5, 0)));
    /// let orc = registry.spawn(Entity::monster(MonsterKind::Orc, Position::new(2, 1), 12));
    /// assert!(player < orc);
    /// assert_eq!(registry.living_actor_at(Position::new(2, 1)), Some(orc));
    /// ```
    pub fn spawn(&mut self, mut entity: Entity) -> EntityId {
        if entity.is_alive() {
            assert!(
                self.living_actor_at(entity.position).is_none(),
                "spawned {} onto occupied tile {}",
                entity.name(),
                entity.position
            );
        }

        self.next_id += 1;
        let id = EntityId(self.next_id);
        entity.id = id;
        if entity.is_on_map() {
            self.index_insert(id, entity.position);
        }
        self.entities.insert(id, entity);
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Removes an entity, returning it.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        if entity.is_on_map() {
            self.index_remove(id, entity.position);
        }
        Some(entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Every entity, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    /// Entities standing on a tile, in id order.
    pub fn entities_at(&self, pos: Position) -> impl Iterator<Item = &Entity> + '_ {
        self.position_index
            .get(&pos)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.entities.get(id))
    }

    /// The living actor on a tile, if any.
    pub fn living_actor_at(&self, pos: Position) -> Option<EntityId> {
        self.entities_at(pos)
            .find(|entity| entity.is_alive())
            .map(Entity::id)
    }

    /// Items lying on a tile, in id order.
    pub fn items_at(&self, pos: Position) -> Vec<EntityId> {
        self.entities_at(pos)
            .filter(|entity| entity.item_kind().is_some())
            .map(Entity::id)
            .collect()
    }

    /// Living actors in id order.
    ///
    /// The iterator is lazy and can be restarted by calling this again.
    pub fn all_living(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values().filter(|entity| entity.is_alive())
    }

    /// The player entity, if present.
    pub fn player(&self) -> Option<&Entity> {
        self.entities.values().find(|entity| entity.is_player())
    }

    /// Moves an entity on the map, returning where it came from.
    ///
    /// # Panics
    ///
    /// Panics when a living actor is moved onto a tile held by another living
    /// actor; callers validate occupancy first.
    pub fn move_entity(&mut self, id: EntityId, to: Position) -> DungeonResult<Position> {
        let entity = self.entities.get(&id).ok_or(DungeonError::UnknownEntity(id))?;
        if !entity.is_on_map() {
            return Err(DungeonError::InvalidState(format!(
                "{} {} is carried and cannot move",
                entity.name(),
                id
            )));
        }
        let from = entity.position;
        if entity.is_alive() {
            if let Some(occupant) = self.living_actor_at(to) {
                assert!(
                    occupant == id,
                    "{} {} moved onto {} held by {}",
                    entity.name(),
                    id,
                    to,
                    occupant
                );
            }
        }

        self.index_remove(id, from);
        self.index_insert(id, to);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.position = to;
        }
        Ok(from)
    }

    /// Subtracts health, saturating at zero. Returns the remaining health.
    pub fn apply_damage(&mut self, id: EntityId, amount: u32) -> DungeonResult<u32> {
        let entity = self.entity_mut(id)?;
        entity.health = entity.health.saturating_sub(amount);
        Ok(entity.health)
    }

    /// Restores health up to the maximum. Returns how much was restored.
    pub fn heal(&mut self, id: EntityId, amount: u32) -> DungeonResult<u32> {
        let entity = self.entity_mut(id)?;
        let healed = amount.min(entity.max_health.saturating_sub(entity.health));
        entity.health += healed;
        Ok(healed)
    }

    /// Raises attack. Returns the new attack value.
    pub fn boost_attack(&mut self, id: EntityId, bonus: u32) -> DungeonResult<u32> {
        let entity = self.entity_mut(id)?;
        entity.stats.attack = entity.stats.attack.saturating_add(bonus);
        Ok(entity.stats.attack)
    }

    /// Moves a floor item into an actor's inventory.
    pub fn pick_up(&mut self, actor: EntityId, item: EntityId) -> DungeonResult<()> {
        if !self.get(actor).map(Entity::is_actor).unwrap_or(false) {
            return Err(DungeonError::UnknownEntity(actor));
        }
        let entity = self.entities.get(&item).ok_or(DungeonError::UnknownEntity(item))?;
        if entity.item_kind().is_none() || !entity.is_on_map() {
            return Err(DungeonError::InvalidState(format!(
                "{} cannot be picked up",
                item
            )));
        }

        let position = entity.position;
        self.index_remove(item, position);
        if let Some(entity) = self.entities.get_mut(&item) {
            entity.holder = Some(actor);
        }
        self.entity_mut(actor)?.inventory.push(item);
        Ok(())
    }

    /// Takes a carried item out of an actor's inventory and out of the registry.
    ///
    /// Returns `None` when the actor does not carry that item.
    pub fn take_from_inventory(&mut self, actor: EntityId, item: EntityId) -> Option<Entity> {
        let holder = self.entities.get_mut(&actor)?;
        let slot = holder.inventory.iter().position(|&carried| carried == item)?;
        holder.inventory.remove(slot);
        self.entities.remove(&item)
    }

    /// Drops everything an actor carries onto its tile. Returns the dropped ids.
    pub fn drop_inventory(&mut self, actor: EntityId) -> DungeonResult<Vec<EntityId>> {
        let holder = self.entity_mut(actor)?;
        let position = holder.position;
        let dropped = std::mem::take(&mut holder.inventory);
        for &item in &dropped {
            if let Some(entity) = self.entities.get_mut(&item) {
                entity.holder = None;
                entity.position = position;
            }
            self.index_insert(item, position);
        }
        Ok(dropped)
    }

    /// Rebuilds the position index from the entities themselves.
    pub fn rebuild_position_index(&mut self) {
        self.position_index.clear();
        let on_map: Vec<(EntityId, Position)> = self
            .entities
            .values()
            .filter(|entity| entity.is_on_map())
            .map(|entity| (entity.id, entity.position))
            .collect();
        for (id, position) in on_map {
            self.index_insert(id, position);
        }
    }

    fn entity_mut(&mut self, id: EntityId) -> DungeonResult<&mut Entity> {
        self.entities
            .get_mut(&id)
            .ok_or(DungeonError::UnknownEntity(id))
    }

    fn index_insert(&mut self, id: EntityId, position: Position) {
        let ids = self.position_index.entry(position).or_default();
        // Keep id order so lookups are deterministic
        let slot = ids.partition_point(|&other| other < id);
        ids.insert(slot, id);
    }

    fn index_remove(&mut self, id: EntityId, position: Position) {
        if let Some(ids) = self.position_index.get_mut(&position) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.position_index.remove(&position);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityStats, ItemKind, MonsterKind};

    fn player_at(x: i32, y: i32) -> Entity {
        Entity::player(Position::new(x, y), 10, EntityStats::new(5, 0))
    }

    #[test]
    fn test_spawn_assigns_sequential_ids() {
        let mut registry = EntityRegistry::new();
        let a = registry.spawn(player_at(1, 1));
        let b = registry.spawn(Entity::monster(MonsterKind::Goblin, Position::new(2, 2), 6));
        let c = registry.spawn(Entity::item(ItemKind::Flare { radius: 4 }, Position::new(3, 3)));
        assert_eq!((a, b, c), (EntityId(1), EntityId(2), EntityId(3)));
        assert_eq!(registry.get(b).unwrap().id(), b);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_all_living_is_ordered_and_restartable() {
        let mut registry = EntityRegistry::new();
        let p = registry.spawn(player_at(1, 1));
        let g = registry.spawn(Entity::monster(MonsterKind::Goblin, Position::new(2, 2), 6));
        registry.spawn(Entity::item(ItemKind::Flare { radius: 4 }, Position::new(3, 3)));
        let dead = registry.spawn(Entity::monster(MonsterKind::Orc, Position::new(4, 4), 0));

        let first: Vec<EntityId> = registry.all_living().map(Entity::id).collect();
        let second: Vec<EntityId> = registry.all_living().map(Entity::id).collect();
        assert_eq!(first, vec![p, g]);
        assert_eq!(first, second);
        assert!(!first.contains(&dead));
    }

    #[test]
    fn test_move_updates_index() {
        let mut registry = EntityRegistry::new();
        let id = registry.spawn(player_at(1, 1));
        let from = registry.move_entity(id, Position::new(2, 1)).unwrap();

        assert_eq!(from, Position::new(1, 1));
        assert_eq!(registry.entities_at(Position::new(1, 1)).count(), 0);
        assert_eq!(registry.living_actor_at(Position::new(2, 1)), Some(id));
        assert_eq!(registry.get(id).unwrap().position(), Position::new(2, 1));
    }

    #[test]
    #[should_panic]
    fn test_moving_onto_living_actor_panics() {
        let mut registry = EntityRegistry::new();
        let id = registry.spawn(player_at(1, 1));
        registry.spawn(Entity::monster(MonsterKind::Goblin, Position::new(2, 1), 6));
        let _ = registry.move_entity(id, Position::new(2, 1));
    }

    #[test]
    fn test_damage_saturates_and_heal_caps() {
        let mut registry = EntityRegistry::new();
        let id = registry.spawn(player_at(1, 1));

        assert_eq!(registry.apply_damage(id, 4).unwrap(), 6);
        assert_eq!(registry.heal(id, 10).unwrap(), 4);
        assert_eq!(registry.get(id).unwrap().health(), 10);
        assert_eq!(registry.apply_damage(id, 25).unwrap(), 0);
        assert!(!registry.get(id).unwrap().is_alive());
        assert!(registry.apply_damage(EntityId(99), 1).is_err());
    }

    #[test]
    fn test_pick_up_use_and_drop() {
        let mut registry = EntityRegistry::new();
        let orc = registry.spawn(Entity::monster(MonsterKind::Orc, Position::new(2, 2), 12));
        let flare = registry.spawn(Entity::item(ItemKind::Flare { radius: 4 }, Position::new(2, 2)));
        let potion = registry.spawn(Entity::item(
            ItemKind::HealingPotion { amount: 6 },
            Position::new(2, 2),
        ));

        assert_eq!(registry.items_at(Position::new(2, 2)), vec![flare, potion]);
        registry.pick_up(orc, flare).unwrap();
        registry.pick_up(orc, potion).unwrap();
        assert!(registry.items_at(Position::new(2, 2)).is_empty());
        assert_eq!(registry.get(orc).unwrap().inventory(), &[flare, potion]);
        assert_eq!(registry.get(flare).unwrap().holder(), Some(orc));

        let taken = registry.take_from_inventory(orc, potion).unwrap();
        assert_eq!(taken.id(), potion);
        assert!(!registry.contains(potion));
        assert!(registry.take_from_inventory(orc, potion).is_none());

        registry.move_entity(orc, Position::new(3, 2)).unwrap();
        let dropped = registry.drop_inventory(orc).unwrap();
        assert_eq!(dropped, vec![flare]);
        assert_eq!(registry.items_at(Position::new(3, 2)), vec![flare]);
        assert!(registry.get(orc).unwrap().inventory().is_empty());
    }

    #[test]
    fn test_remove_clears_index() {
        let mut registry = EntityRegistry::new();
        let id = registry.spawn(Entity::monster(MonsterKind::Goblin, Position::new(2, 2), 6));
        assert!(registry.remove(id).is_some());
        assert!(registry.remove(id).is_none());
        assert_eq!(registry.living_actor_at(Position::new(2, 2)), None);
    }

    #[test]
    fn test_serde_rebuilds_index() {
        let mut registry = EntityRegistry::new();
        let id = registry.spawn(player_at(4, 2));
        let json = serde_json::to_string(&registry).unwrap();
        let restored: EntityRegistry = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, registry);
        assert_eq!(restored.living_actor_at(Position::new(4, 2)), Some(id));
    }
}
