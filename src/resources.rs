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

//! Process-wide singleton values, one per type, separate from entity
//! storage. `insert`/`get`/`get_mut` hold the canonical instance directly;
//! `insert_ref`/`get_ref` hand out clones of a shared handle instead, for
//! values meant to be held onto across a borrow of the store itself.

use std::any::{Any, TypeId};
use std::sync::Arc;

use rustc_hash::FxHashMap;

pub struct ResourceStore {
    values: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
    refs: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self {
            values: FxHashMap::default(),
            refs: FxHashMap::default(),
        }
    }

    /// Store `value` as the canonical instance of `T`, replacing any
    /// previous one.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values.get(&TypeId::of::<T>()).and_then(|v| v.downcast_ref())
    }

    /// A mutable view onto the one stored instance of `T`, not a copy.
    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.values.get_mut(&TypeId::of::<T>()).and_then(|v| v.downcast_mut())
    }

    pub fn has<T: Send + Sync + 'static>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.values
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Store `value` behind an `Arc`. Later `get_ref::<T>()` calls return
    /// clones of the same `Arc`, sharing the one underlying instance.
    pub fn insert_ref<T: Send + Sync + 'static>(&mut self, value: T) {
        self.refs.insert(TypeId::of::<T>(), Box::new(Arc::new(value)));
    }

    pub fn get_ref<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.refs.get(&TypeId::of::<T>()).and_then(|v| v.downcast_ref::<Arc<T>>()).cloned()
    }

    pub fn has_ref<T: Send + Sync + 'static>(&self) -> bool {
        self.refs.contains_key(&TypeId::of::<T>())
    }

    pub fn remove_ref<T: Send + Sync + 'static>(&mut self) -> bool {
        self.refs.remove(&TypeId::of::<T>()).is_some()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.refs.clear();
    }
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::new()
    }
}
