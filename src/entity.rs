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

//! Entity identifiers, generations, and the entity manager.

/// Raw, non-generational entity index. Reused once its owner is destroyed.
pub type EntityId = u32;

/// Per-id reuse counter. Bumped on every `destroy` so outstanding handles
/// referring to the old occupant of this id go stale.
pub type EntityGeneration = u32;

/// Opaque, reuse-safe reference to an entity: a 32-bit id packed with a
/// 32-bit generation. Two handles compare equal iff both halves match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(u64);

impl EntityHandle {
    fn pack(id: EntityId, generation: EntityGeneration) -> Self {
        Self(((generation as u64) << 32) | id as u64)
    }

    /// Raw entity index (low 32 bits).
    pub fn id(self) -> EntityId {
        self.0 as u32
    }

    /// Generation stamp (high 32 bits).
    pub fn generation(self) -> EntityGeneration {
        (self.0 >> 32) as u32
    }
}

impl std::fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}v{})", self.id(), self.generation())
    }
}

/// Allocates and recycles `EntityHandle`s with generation stamps.
///
/// `generations[id]` is the generation currently considered live for that
/// id; a handle is alive iff its stored generation matches. Freed ids are
/// kept on a LIFO stack so they're reused promptly (and their generation
/// bumped) rather than letting the id space grow without bound.
#[derive(Debug, Default)]
pub struct EntityManager {
    generations: Vec<EntityGeneration>,
    free_ids: Vec<EntityId>,
    next_id: EntityId,
    alive_count: usize,
}

impl EntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new handle, reusing a freed id (with its generation
    /// bumped) if one is available.
    pub fn create(&mut self) -> EntityHandle {
        self.alive_count += 1;
        if let Some(id) = self.free_ids.pop() {
            let generation = self.generations[id as usize];
            return EntityHandle::pack(id, generation);
        }

        let id = self.next_id;
        self.next_id += 1;
        self.generations.push(0);
        EntityHandle::pack(id, 0)
    }

    /// Invalidate `handle`. Returns `false` (no-op) if it was already stale.
    pub fn destroy(&mut self, handle: EntityHandle) -> bool {
        if !self.is_alive(handle) {
            return false;
        }
        let id = handle.id();
        self.generations[id as usize] = self.generations[id as usize].wrapping_add(1);
        self.free_ids.push(id);
        self.alive_count -= 1;
        true
    }

    /// Pure liveness check; never mutates state.
    pub fn is_alive(&self, handle: EntityHandle) -> bool {
        let id = handle.id() as usize;
        id < self.generations.len() && self.generations[id] == handle.generation()
    }

    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Reconstruct the live handle for `id`, if it currently has one.
    pub fn handle_of(&self, id: EntityId) -> Option<EntityHandle> {
        let generation = *self.generations.get(id as usize)?;
        let handle = EntityHandle::pack(id, generation);
        self.is_alive(handle).then_some(handle)
    }
}
