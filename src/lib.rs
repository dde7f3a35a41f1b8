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

//! Archetype-indexed entity component system core.
//!
//! Entities are rows in per-archetype, columnar component tables; adding
//! or removing a component moves an entity to the archetype matching its
//! new component set, following cached edges in an archetype graph.
//! Systems run in a fixed five-stage frame (`pre_update`, `update`,
//! `post_update`, `render`, `cleanup`), with intra-stage dependencies
//! resolved by topological sort.

pub mod app;
pub mod archetype;
pub mod builtin;
pub mod component;
pub mod entity;
pub mod error;
pub mod plugin;
pub mod query;
pub mod resources;
pub mod schedule;
pub mod system;
pub mod time;
pub mod world;

pub mod prelude;

pub use app::App;
pub use archetype::{Archetype, ArchetypeId};
pub use component::{Component, ComponentTypeId, TypeRegistry};
pub use entity::{EntityHandle, EntityId, EntityManager};
pub use error::{EcsError, Result};
pub use plugin::{Plugin, PluginManager};
pub use query::{FilterOp, QueryResult, QuerySystem};
pub use resources::ResourceStore;
pub use schedule::Scheduler;
pub use system::{BoxedSystem, Stage, System, SystemStats};
pub use world::{ComponentData, World};
