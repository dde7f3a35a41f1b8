// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! World: the archetype graph, entity index, and the entry points entities
//! are created, queried, and destroyed through.

use rustc_hash::FxHashMap;

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::archetype::{archetype_id, Archetype, ArchetypeId};
use crate::component::{Component, ComponentTypeId, TypeRegistry};
use crate::entity::{EntityHandle, EntityId, EntityManager};
use crate::error::{EcsError, Result};

/// A single component's bytes, tagged with its dense type id. Produced by
/// [`World::component`] and consumed by [`World::create_with_components`].
pub struct ComponentData {
    type_id: ComponentTypeId,
    bytes: Box<[u8]>,
}

/// Move `value`'s bytes into a freshly allocated buffer without running its
/// destructor — ownership of whatever it points to travels with the bytes,
/// the same "forget the source, own the copy" contract `Archetype` uses
/// internally for every cross-archetype move.
fn value_to_bytes<T>(value: T) -> Box<[u8]> {
    let size = std::mem::size_of::<T>();
    let mut buf = vec![0u8; size].into_boxed_slice();
    let value = std::mem::ManuallyDrop::new(value);
    unsafe {
        std::ptr::copy_nonoverlapping(&*value as *const T as *const u8, buf.as_mut_ptr(), size);
    }
    buf
}

/// The archetype graph: owns every archetype table and the index from
/// entity to the archetype currently holding it.
pub struct World {
    entity_manager: EntityManager,
    type_registry: TypeRegistry,
    archetypes: FxHashMap<ArchetypeId, Archetype>,
    entity_index: FxHashMap<EntityId, ArchetypeId>,
}

impl World {
    pub fn new() -> Self {
        let mut world = Self {
            entity_manager: EntityManager::new(),
            type_registry: TypeRegistry::new(),
            archetypes: FxHashMap::default(),
            entity_index: FxHashMap::default(),
        };
        world.archetypes.insert(archetype_id(&[]), Archetype::new(Vec::new(), &[]));
        world
    }

    /// Register `T`, returning its dense type id. Idempotent.
    pub fn register<T: Component>(&mut self) -> ComponentTypeId {
        self.type_registry.register::<T>()
    }

    /// Build a tagged component value for [`World::create_with_components`].
    /// Registers `T` if this is its first use.
    pub fn component<T: Component>(&mut self, value: T) -> ComponentData {
        let type_id = self.type_registry.register::<T>();
        ComponentData {
            type_id,
            bytes: value_to_bytes(value),
        }
    }

    pub fn type_registry(&self) -> &TypeRegistry {
        &self.type_registry
    }

    pub fn entity_manager(&self) -> &EntityManager {
        &self.entity_manager
    }

    pub fn is_alive(&self, handle: EntityHandle) -> bool {
        self.entity_manager.is_alive(handle)
    }

    pub fn alive_count(&self) -> usize {
        self.entity_manager.alive_count()
    }

    /// Spawn an entity with no components, into the empty archetype.
    pub fn create(&mut self) -> EntityHandle {
        let handle = self.entity_manager.create();
        let empty_id = archetype_id(&[]);
        let archetype = self.archetypes.get_mut(&empty_id).expect("empty archetype always exists");
        archetype.add(handle.id(), FxHashMap::default());
        self.entity_index.insert(handle.id(), empty_id);
        handle
    }

    /// Spawn an entity carrying exactly the given components. Fails if the
    /// same component type is supplied twice.
    pub fn create_with_components(&mut self, components: Vec<ComponentData>) -> Result<EntityHandle> {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.create_with_components", count = components.len());
        #[cfg(feature = "profiling")]
        let _guard = span.enter();

        let mut types: Vec<ComponentTypeId> = components.iter().map(|c| c.type_id).collect();
        types.sort_unstable();
        if types.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(EcsError::DuplicateComponent);
        }

        let target_id = self.get_or_create_archetype(types);

        let handle = self.entity_manager.create();
        let mut values = FxHashMap::default();
        for component in components {
            values.insert(component.type_id, component.bytes);
        }
        let archetype = self.archetypes.get_mut(&target_id).expect("just created");
        archetype.add(handle.id(), values);
        self.entity_index.insert(handle.id(), target_id);
        Ok(handle)
    }

    pub fn despawn(&mut self, handle: EntityHandle) -> Result<()> {
        if !self.entity_manager.is_alive(handle) {
            return Err(EcsError::EntityNotFound);
        }
        let id = handle.id();
        if let Some(archetype_id) = self.entity_index.remove(&id) {
            if let Some(archetype) = self.archetypes.get_mut(&archetype_id) {
                archetype.remove(id);
            }
        }
        self.entity_manager.destroy(handle);
        Ok(())
    }

    pub fn get<T: Component>(&self, handle: EntityHandle) -> Option<&T> {
        if !self.entity_manager.is_alive(handle) {
            return None;
        }
        let type_id = self.type_registry.get::<T>()?;
        let archetype_id = self.entity_index.get(&handle.id())?;
        let archetype = self.archetypes.get(archetype_id)?;
        let bytes = archetype.get_component(handle.id(), type_id)?;
        Some(unsafe { &*(bytes.as_ptr() as *const T) })
    }

    pub fn get_mut<T: Component>(&mut self, handle: EntityHandle) -> Option<&mut T> {
        if !self.entity_manager.is_alive(handle) {
            return None;
        }
        let type_id = self.type_registry.get::<T>()?;
        let archetype_id = self.entity_index.get(&handle.id())?;
        let archetype = self.archetypes.get_mut(archetype_id)?;
        let row = archetype.row_of(handle.id())?;
        archetype.touch(type_id);
        let bytes = archetype.get_component_array_mut(type_id)?.get_mut(row)?;
        Some(unsafe { &mut *(bytes.as_mut_ptr() as *mut T) })
    }

    pub fn has<T: Component>(&self, handle: EntityHandle) -> bool {
        let Some(type_id) = self.type_registry.get::<T>() else {
            return false;
        };
        self.entity_manager.is_alive(handle)
            && self
                .entity_index
                .get(&handle.id())
                .and_then(|a| self.archetypes.get(a))
                .is_some_and(|archetype| archetype.has_component_type(type_id))
    }

    /// Move `handle` into the archetype with `T` added, consulting (and
    /// populating) the source archetype's add-edge cache.
    pub fn add<T: Component>(&mut self, handle: EntityHandle, value: T) -> Result<()> {
        if !self.entity_manager.is_alive(handle) {
            return Err(EcsError::EntityNotFound);
        }
        let id = handle.id();
        let type_id = self.type_registry.register::<T>();
        let old_archetype_id = *self.entity_index.get(&id).ok_or(EcsError::EntityNotFound)?;

        if self.archetypes[&old_archetype_id].has_component_type(type_id) {
            return Err(EcsError::DuplicateComponent);
        }

        let new_archetype_id = match self.archetypes[&old_archetype_id].get_add_edge(type_id) {
            Some(cached) => cached,
            None => {
                let mut new_types = self.archetypes[&old_archetype_id].component_types().to_vec();
                new_types.push(type_id);
                new_types.sort_unstable();
                let new_archetype_id = self.get_or_create_archetype(new_types);
                self.archetypes
                    .get_mut(&old_archetype_id)
                    .unwrap()
                    .set_add_edge(type_id, new_archetype_id);
                self.archetypes
                    .get_mut(&new_archetype_id)
                    .unwrap()
                    .set_remove_edge(type_id, old_archetype_id);
                new_archetype_id
            }
        };

        let mut values = self
            .archetypes
            .get_mut(&old_archetype_id)
            .unwrap()
            .extract(id)
            .ok_or(EcsError::EntityNotFound)?;
        values.insert(type_id, value_to_bytes(value));
        self.archetypes.get_mut(&new_archetype_id).unwrap().add(id, values);
        self.entity_index.insert(id, new_archetype_id);
        Ok(())
    }

    /// Move `handle` into the archetype with `T` removed, consulting (and
    /// populating) the source archetype's remove-edge cache. A no-op if the
    /// entity doesn't carry `T`.
    pub fn remove<T: Component>(&mut self, handle: EntityHandle) -> Result<()> {
        if !self.entity_manager.is_alive(handle) {
            return Err(EcsError::EntityNotFound);
        }
        let type_id = self.type_registry.get::<T>().ok_or(EcsError::ComponentNotRegistered)?;
        let id = handle.id();
        let old_archetype_id = *self.entity_index.get(&id).ok_or(EcsError::EntityNotFound)?;

        if !self.archetypes[&old_archetype_id].has_component_type(type_id) {
            return Ok(());
        }

        let new_archetype_id = match self.archetypes[&old_archetype_id].get_remove_edge(type_id) {
            Some(cached) => cached,
            None => {
                let new_types: Vec<ComponentTypeId> = self.archetypes[&old_archetype_id]
                    .component_types()
                    .iter()
                    .copied()
                    .filter(|&t| t != type_id)
                    .collect();
                let new_archetype_id = self.get_or_create_archetype(new_types);
                self.archetypes
                    .get_mut(&old_archetype_id)
                    .unwrap()
                    .set_remove_edge(type_id, new_archetype_id);
                self.archetypes
                    .get_mut(&new_archetype_id)
                    .unwrap()
                    .set_add_edge(type_id, old_archetype_id);
                new_archetype_id
            }
        };

        let mut values = self
            .archetypes
            .get_mut(&old_archetype_id)
            .unwrap()
            .extract(id)
            .ok_or(EcsError::EntityNotFound)?;
        if let Some(dropped) = values.remove(&type_id) {
            if let Some(drop_fn) = self.type_registry.descriptor(type_id).and_then(|d| d.drop_fn) {
                unsafe { drop_fn(dropped.as_ptr() as *mut u8) };
            }
            // `dropped`'s own Drop just frees the raw byte buffer; the line
            // above already ran T's destructor on those bytes.
        }
        self.archetypes.get_mut(&new_archetype_id).unwrap().add(id, values);
        self.entity_index.insert(id, new_archetype_id);
        Ok(())
    }

    fn get_or_create_archetype(&mut self, sorted_types: Vec<ComponentTypeId>) -> ArchetypeId {
        let id = archetype_id(&sorted_types);
        if !self.archetypes.contains_key(&id) {
            let descriptors: Vec<_> = sorted_types
                .iter()
                .map(|t| *self.type_registry.descriptor(*t).expect("component type registered before use in an archetype"))
                .collect();
            self.archetypes.insert(id, Archetype::new(sorted_types, &descriptors));
        }
        id
    }

    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(&id)
    }

    pub fn archetype_mut(&mut self, id: ArchetypeId) -> Option<&mut Archetype> {
        self.archetypes.get_mut(&id)
    }

    pub fn archetype_ids(&self) -> impl Iterator<Item = ArchetypeId> + '_ {
        self.archetypes.keys().copied()
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    pub fn entity_archetype(&self, handle: EntityHandle) -> Option<ArchetypeId> {
        self.entity_index.get(&handle.id()).copied()
    }

    pub fn handle_of(&self, id: EntityId) -> Option<EntityHandle> {
        self.entity_manager.handle_of(id)
    }

    /// One-shot, uncached query: scan every archetype matching `types` and
    /// collect the matching entity handles. For repeated queries prefer a
    /// [`crate::query::QuerySystem`], which caches the archetype scan.
    pub fn query(&self, types: &[ComponentTypeId]) -> Vec<EntityHandle> {
        let mut out = Vec::new();
        for archetype in self.archetypes.values() {
            if !archetype.matches(types) {
                continue;
            }
            for &id in archetype.get_entities() {
                if let Some(handle) = self.entity_manager.handle_of(id) {
                    out.push(handle);
                }
            }
        }
        out
    }

    /// Drop every entity and reset the graph to a single empty archetype.
    pub fn clear(&mut self) {
        self.archetypes.clear();
        self.entity_index.clear();
        self.entity_manager = EntityManager::new();
        self.archetypes.insert(archetype_id(&[]), Archetype::new(Vec::new(), &[]));
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position {
        x: f32,
    }
    struct Velocity {
        y: f32,
    }

    #[test]
    fn create_and_despawn_round_trip() {
        let mut world = World::new();
        let handle = world.create();
        assert!(world.is_alive(handle));
        world.despawn(handle).unwrap();
        assert!(!world.is_alive(handle));
    }

    #[test]
    fn create_with_components_places_values() {
        let mut world = World::new();
        let pos = world.component(Position { x: 1.0 });
        let handle = world.create_with_components(vec![pos]).unwrap();
        assert_eq!(world.get::<Position>(handle).unwrap().x, 1.0);
    }

    #[test]
    fn duplicate_component_in_create_is_rejected() {
        let mut world = World::new();
        let a = world.component(Position { x: 1.0 });
        let b = world.component(Position { x: 2.0 });
        let result = world.create_with_components(vec![a, b]);
        assert!(matches!(result, Err(EcsError::DuplicateComponent)));
    }

    #[test]
    fn add_moves_entity_into_new_archetype_and_preserves_old_components() {
        let mut world = World::new();
        let pos = world.component(Position { x: 5.0 });
        let handle = world.create_with_components(vec![pos]).unwrap();
        let before = world.entity_archetype(handle).unwrap();

        world.add(handle, Velocity { y: 2.0 }).unwrap();

        let after = world.entity_archetype(handle).unwrap();
        assert_ne!(before, after);
        assert_eq!(world.get::<Position>(handle).unwrap().x, 5.0);
        assert_eq!(world.get::<Velocity>(handle).unwrap().y, 2.0);
    }

    #[test]
    fn add_duplicate_component_type_is_rejected() {
        let mut world = World::new();
        let handle = world.create();
        world.add(handle, Position { x: 0.0 }).unwrap();
        let result = world.add(handle, Position { x: 1.0 });
        assert!(matches!(result, Err(EcsError::DuplicateComponent)));
    }

    #[test]
    fn remove_moves_entity_back_and_drops_removed_component() {
        let mut world = World::new();
        let handle = world.create();
        world.add(handle, Position { x: 1.0 }).unwrap();
        world.add(handle, Velocity { y: 1.0 }).unwrap();

        world.remove::<Velocity>(handle).unwrap();

        assert!(world.has::<Position>(handle));
        assert!(!world.has::<Velocity>(handle));
    }

    #[test]
    fn add_remove_edges_are_cached_and_reused() {
        let mut world = World::new();
        let a = world.create();
        world.add(a, Position { x: 0.0 }).unwrap();
        let b = world.create();
        world.add(b, Position { x: 0.0 }).unwrap();

        let empty_id = archetype_id(&[]);
        let pos_type = world.type_registry().get::<Position>().unwrap();
        let cached_edge = world.archetype(empty_id).unwrap().get_add_edge(pos_type);
        assert!(cached_edge.is_some());
        assert_eq!(world.entity_archetype(b), cached_edge);
    }

    #[test]
    fn query_returns_only_matching_archetypes() {
        let mut world = World::new();
        let both = world.create();
        world.add(both, Position { x: 0.0 }).unwrap();
        world.add(both, Velocity { y: 0.0 }).unwrap();

        let only_position = world.create();
        world.add(only_position, Position { x: 0.0 }).unwrap();

        let pos_type = world.type_registry().get::<Position>().unwrap();
        let results = world.query(&[pos_type]);
        assert_eq!(results.len(), 2);

        let vel_type = world.type_registry().get::<Velocity>().unwrap();
        let results = world.query(&[pos_type, vel_type]);
        assert_eq!(results, vec![both]);
    }

    #[test]
    fn despawned_entity_frees_its_generation_for_reuse() {
        let mut world = World::new();
        let handle = world.create();
        world.despawn(handle).unwrap();
        let reused = world.create();
        assert_eq!(handle.id(), reused.id());
        assert!(!world.is_alive(handle));
        assert!(world.is_alive(reused));
    }
}
