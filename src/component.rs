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

//! Component marker trait and the dense type registry.
//!
//! Components are plain data attached to entities. The registry hands out
//! a dense, append-only `ComponentTypeID` for every distinct Rust type the
//! first time it's seen; archetypes and columns are indexed by that id
//! rather than by `TypeId` so they stay small and cache-friendly.

use std::any::TypeId;

use rustc_hash::FxHashMap;

/// Marker trait for components. Components must be `'static` (no borrowed
/// data) and safe to move across archetype boundaries by raw copy.
pub trait Component: 'static + Send + Sync {}

impl<T: 'static + Send + Sync> Component for T {}

/// Dense runtime id assigned to a component type on first registration.
pub type ComponentTypeId = u32;

/// Per-type metadata the registry and archetype columns need: how many
/// bytes one instance occupies, and how to run its destructor in place.
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    pub size: usize,
    pub drop_fn: Option<unsafe fn(*mut u8)>,
}

/// Append-only map from Rust type to dense `ComponentTypeId`.
///
/// `register::<T>()` is idempotent: the first call assigns the next
/// sequential id and records `T`'s layout; later calls return the same id.
#[derive(Default)]
pub struct TypeRegistry {
    ids: FxHashMap<TypeId, ComponentTypeId>,
    descriptors: Vec<TypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T`, returning its (possibly pre-existing) dense id.
    pub fn register<T: Component>(&mut self) -> ComponentTypeId {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.ids.get(&type_id) {
            return id;
        }

        let id = self.descriptors.len() as ComponentTypeId;
        let drop_fn = if std::mem::needs_drop::<T>() {
            Some((|ptr: *mut u8| unsafe { std::ptr::drop_in_place(ptr as *mut T) }) as unsafe fn(*mut u8))
        } else {
            None
        };
        self.descriptors.push(TypeDescriptor {
            size: std::mem::size_of::<T>(),
            drop_fn,
        });
        self.ids.insert(type_id, id);
        id
    }

    /// Look up the id for an already-registered type.
    pub fn get<T: Component>(&self) -> Option<ComponentTypeId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    pub fn descriptor(&self, id: ComponentTypeId) -> Option<&TypeDescriptor> {
        self.descriptors.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
