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

//! Archetype storage: one table per distinct, sorted component-type set.
//!
//! Storage is columnar (Structure of Arrays) — each component type gets its
//! own contiguous byte buffer, indexed by row. Row order is not stable
//! across mutations: removal is swap-remove.

use rustc_hash::FxHashMap;

use crate::component::{ComponentTypeId, TypeDescriptor};
use crate::entity::EntityId;

/// Hash of an archetype's sorted component-type set; a pure function of
/// that set, so two archetypes with the same types always collide to the
/// same id and different sets (almost certainly) don't.
pub type ArchetypeId = u64;

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// FNV-1a over the sorted component-type ids, the archetype's only identity.
pub fn archetype_id(sorted_types: &[ComponentTypeId]) -> ArchetypeId {
    let mut hash = FNV_OFFSET_BASIS;
    for &type_id in sorted_types {
        for byte in type_id.to_le_bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Type-erased, fixed-stride column of component bytes.
pub struct ComponentColumn {
    data: Vec<u8>,
    item_size: usize,
    drop_fn: Option<unsafe fn(*mut u8)>,
}

impl ComponentColumn {
    fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            data: Vec::new(),
            item_size: descriptor.size,
            drop_fn: descriptor.drop_fn,
        }
    }

    pub fn len(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        debug_assert_eq!(bytes.len(), self.item_size);
        self.data.extend_from_slice(bytes);
    }

    pub fn get(&self, row: usize) -> Option<&[u8]> {
        let offset = row.checked_mul(self.item_size)?;
        self.data.get(offset..offset + self.item_size)
    }

    pub fn get_mut(&mut self, row: usize) -> Option<&mut [u8]> {
        let offset = row.checked_mul(self.item_size)?;
        self.data.get_mut(offset..offset + self.item_size)
    }

    /// Raw pointer to row's bytes, for the query engine's result rows.
    /// Valid only until the next structural mutation of this column.
    pub fn ptr_mut(&mut self, row: usize) -> Option<*mut u8> {
        if row >= self.len() {
            return None;
        }
        let offset = row * self.item_size;
        Some(unsafe { self.data.as_mut_ptr().add(offset) })
    }

    unsafe fn drop_row(&mut self, row: usize) {
        if let Some(drop_fn) = self.drop_fn {
            let offset = row * self.item_size;
            unsafe { drop_fn(self.data.as_mut_ptr().add(offset)) };
        }
    }

    /// Swap-remove `row`, running its destructor. Mirrors
    /// `Vec::swap_remove`'s row-stability contract.
    fn swap_remove_drop(&mut self, row: usize) {
        unsafe { self.drop_row(row) };
        self.swap_last_into(row);
    }

    /// Swap-remove `row`, handing the bytes to the caller instead of
    /// running the destructor (used when transferring ownership across
    /// archetypes during add/remove-component moves).
    fn swap_remove_take(&mut self, row: usize) -> Box<[u8]> {
        let offset = row * self.item_size;
        let owned = self.data[offset..offset + self.item_size].to_vec().into_boxed_slice();
        self.swap_last_into(row);
        owned
    }

    fn swap_last_into(&mut self, row: usize) {
        let last_row = self.len() - 1;
        if row != last_row {
            let last_offset = last_row * self.item_size;
            let row_offset = row * self.item_size;
            let mut tmp = vec![0u8; self.item_size];
            tmp.copy_from_slice(&self.data[last_offset..last_offset + self.item_size]);
            self.data[row_offset..row_offset + self.item_size].copy_from_slice(&tmp);
        }
        self.data.truncate(last_row * self.item_size);
    }

    fn clear_drop(&mut self) {
        for row in 0..self.len() {
            unsafe { self.drop_row(row) };
        }
        self.data.clear();
    }
}

impl Drop for ComponentColumn {
    fn drop(&mut self) {
        self.clear_drop();
    }
}

/// One table per distinct sorted component-type set.
pub struct Archetype {
    id: ArchetypeId,
    component_types: Vec<ComponentTypeId>,
    entities: Vec<EntityId>,
    columns: FxHashMap<ComponentTypeId, ComponentColumn>,
    entity_to_row: FxHashMap<EntityId, usize>,
    add_edges: FxHashMap<ComponentTypeId, ArchetypeId>,
    remove_edges: FxHashMap<ComponentTypeId, ArchetypeId>,
    version: u64,
    component_versions: FxHashMap<ComponentTypeId, u64>,
}

impl Archetype {
    /// `component_types` must already be sorted; the caller (the world)
    /// owns canonicalization since it's the one deduping archetypes.
    pub fn new(component_types: Vec<ComponentTypeId>, descriptors: &[TypeDescriptor]) -> Self {
        let id = archetype_id(&component_types);
        let mut columns = FxHashMap::default();
        for (&type_id, descriptor) in component_types.iter().zip(descriptors) {
            columns.insert(type_id, ComponentColumn::new(*descriptor));
        }
        Self {
            id,
            component_types,
            entities: Vec::new(),
            columns,
            entity_to_row: FxHashMap::default(),
            add_edges: FxHashMap::default(),
            remove_edges: FxHashMap::default(),
            version: 0,
            component_versions: FxHashMap::default(),
        }
    }

    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    pub fn component_types(&self) -> &[ComponentTypeId] {
        &self.component_types
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn size(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get_entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn has_component_type(&self, type_id: ComponentTypeId) -> bool {
        self.columns.contains_key(&type_id)
    }

    /// True iff every type in `required` is present in this archetype.
    pub fn matches(&self, required: &[ComponentTypeId]) -> bool {
        required.iter().all(|t| self.has_component_type(*t))
    }

    pub fn get_component_array(&self, type_id: ComponentTypeId) -> Option<&ComponentColumn> {
        self.columns.get(&type_id)
    }

    pub fn get_component_array_mut(&mut self, type_id: ComponentTypeId) -> Option<&mut ComponentColumn> {
        self.columns.get_mut(&type_id)
    }

    pub fn row_of(&self, entity: EntityId) -> Option<usize> {
        self.entity_to_row.get(&entity).copied()
    }

    pub fn get_component(&self, entity: EntityId, type_id: ComponentTypeId) -> Option<&[u8]> {
        let row = self.row_of(entity)?;
        self.columns.get(&type_id)?.get(row)
    }

    /// Append `entity` with one value per declared component type. Fails if
    /// the entity is already present, or any declared type is missing from
    /// `values`.
    pub fn add(&mut self, entity: EntityId, mut values: FxHashMap<ComponentTypeId, Box<[u8]>>) -> bool {
        if self.entity_to_row.contains_key(&entity) {
            return false;
        }
        if !self.component_types.iter().all(|t| values.contains_key(t)) {
            return false;
        }

        let row = self.entities.len();
        for &type_id in &self.component_types {
            let bytes = values.remove(&type_id).expect("checked above");
            self.columns.get_mut(&type_id).unwrap().push_bytes(&bytes);
        }
        self.entities.push(entity);
        self.entity_to_row.insert(entity, row);
        self.version += 1;
        true
    }

    /// Swap-remove `entity`, running destructors on its components.
    pub fn remove(&mut self, entity: EntityId) -> bool {
        let Some(row) = self.entity_to_row.remove(&entity) else {
            return false;
        };
        for column in self.columns.values_mut() {
            column.swap_remove_drop(row);
        }
        self.swap_remove_entity_row(row);
        self.version += 1;
        true
    }

    /// Swap-remove `entity`, transferring ownership of its component bytes
    /// to the caller instead of destroying them. Used for archetype moves.
    pub fn extract(&mut self, entity: EntityId) -> Option<FxHashMap<ComponentTypeId, Box<[u8]>>> {
        let row = self.entity_to_row.remove(&entity)?;
        let mut out = FxHashMap::default();
        for (&type_id, column) in self.columns.iter_mut() {
            out.insert(type_id, column.swap_remove_take(row));
        }
        self.swap_remove_entity_row(row);
        self.version += 1;
        Some(out)
    }

    fn swap_remove_entity_row(&mut self, row: usize) {
        self.entities.swap_remove(row);
        if row < self.entities.len() {
            let moved_entity = self.entities[row];
            self.entity_to_row.insert(moved_entity, row);
        }
    }

    pub fn clear(&mut self) {
        for column in self.columns.values_mut() {
            column.clear_drop();
        }
        self.entities.clear();
        self.entity_to_row.clear();
        self.version += 1;
    }

    pub fn set_add_edge(&mut self, type_id: ComponentTypeId, target: ArchetypeId) {
        self.add_edges.insert(type_id, target);
    }

    pub fn get_add_edge(&self, type_id: ComponentTypeId) -> Option<ArchetypeId> {
        self.add_edges.get(&type_id).copied()
    }

    pub fn set_remove_edge(&mut self, type_id: ComponentTypeId, target: ArchetypeId) {
        self.remove_edges.insert(type_id, target);
    }

    pub fn get_remove_edge(&self, type_id: ComponentTypeId) -> Option<ArchetypeId> {
        self.remove_edges.get(&type_id).copied()
    }

    /// Per-type change counter, bumped by [`Self::touch`]. Used by the query
    /// engine's `Changed` filter; unset types read as version `0`.
    pub fn component_version(&self, type_id: ComponentTypeId) -> u64 {
        self.component_versions.get(&type_id).copied().unwrap_or(0)
    }

    /// Record that `type_id`'s data (not structure) was mutated, e.g. via a
    /// `get_mut` accessor.
    pub fn touch(&mut self, type_id: ComponentTypeId) {
        self.version += 1;
        *self.component_versions.entry(type_id).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::TypeRegistry;

    fn bytes_of<T>(value: T) -> Box<[u8]> {
        let size = std::mem::size_of::<T>();
        let mut buf = vec![0u8; size];
        unsafe { std::ptr::write(buf.as_mut_ptr() as *mut T, value) };
        buf.into_boxed_slice()
    }

    #[test]
    fn id_is_pure_function_of_sorted_types() {
        assert_eq!(archetype_id(&[1, 2, 3]), archetype_id(&[1, 2, 3]));
        assert_ne!(archetype_id(&[1, 2, 3]), archetype_id(&[1, 2, 4]));
    }

    #[test]
    fn add_remove_round_trip_preserves_component_set() {
        let mut reg = TypeRegistry::new();
        let pos = reg.register::<i32>();
        let descriptors = vec![*reg.descriptor(pos).unwrap()];
        let mut arch = Archetype::new(vec![pos], &descriptors);

        let mut values = FxHashMap::default();
        values.insert(pos, bytes_of(42i32));
        assert!(arch.add(1, values));
        assert_eq!(arch.size(), 1);
        let before_version = arch.version();

        assert!(arch.remove(1));
        assert!(arch.version() > before_version);
        assert_eq!(arch.size(), 0);
    }

    #[test]
    fn swap_remove_updates_moved_entity_row() {
        let mut reg = TypeRegistry::new();
        let comp = reg.register::<i32>();
        let descriptors = vec![*reg.descriptor(comp).unwrap()];
        let mut arch = Archetype::new(vec![comp], &descriptors);

        for (entity, value) in [(1u32, 10i32), (2, 20), (3, 30)] {
            let mut values = FxHashMap::default();
            values.insert(comp, bytes_of(value));
            arch.add(entity, values);
        }

        // Removing row 0 should swap entity 3 into its place.
        assert!(arch.remove(1));
        assert_eq!(arch.row_of(3), Some(0));
        assert_eq!(arch.row_of(2), Some(1));
    }

    #[test]
    fn version_advances_on_every_structural_mutation() {
        let mut reg = TypeRegistry::new();
        let comp = reg.register::<i32>();
        let descriptors = vec![*reg.descriptor(comp).unwrap()];
        let mut arch = Archetype::new(vec![comp], &descriptors);

        let v0 = arch.version();
        let mut values = FxHashMap::default();
        values.insert(comp, bytes_of(1i32));
        arch.add(1, values);
        assert!(arch.version() > v0);

        let v1 = arch.version();
        arch.clear();
        assert!(arch.version() > v1);
    }

    #[test]
    fn extract_transfers_ownership_without_dropping() {
        let mut reg = TypeRegistry::new();
        let comp = reg.register::<i32>();
        let descriptors = vec![*reg.descriptor(comp).unwrap()];
        let mut arch = Archetype::new(vec![comp], &descriptors);

        let mut values = FxHashMap::default();
        values.insert(comp, bytes_of(99i32));
        arch.add(1, values);

        let extracted = arch.extract(1).unwrap();
        let bytes = &extracted[&comp];
        let value = unsafe { std::ptr::read(bytes.as_ptr() as *const i32) };
        assert_eq!(value, 99);
        assert_eq!(arch.size(), 0);
    }

    #[test]
    fn matches_requires_every_type_present() {
        let mut reg = TypeRegistry::new();
        let a = reg.register::<i32>();
        let b = reg.register::<f32>();
        let descriptors = vec![*reg.descriptor(a).unwrap(), *reg.descriptor(b).unwrap()];
        let arch = Archetype::new(vec![a, b], &descriptors);

        assert!(arch.matches(&[a]));
        assert!(arch.matches(&[a, b]));
        assert!(!arch.matches(&[a, b, 99]));
    }
}
