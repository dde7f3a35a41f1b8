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

//! Query engine: a stateful, archetype-cached query over component types,
//! plus the one-shot variant that doesn't keep any state around.
//!
//! `QuerySystem` rebuilds its matching-archetype cache only when needed
//! (the set of archetypes grew, or a tracked archetype's data moved on),
//! and only scans the archetypes created since the last rebuild rather
//! than the whole graph.

use rustc_hash::{FxHashMap, FxHashSet};

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::archetype::ArchetypeId;
use crate::component::{Component, ComponentTypeId};
use crate::entity::{EntityHandle, EntityId};
use crate::world::World;

/// A single query filter, beyond "must carry this component type".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    With(ComponentTypeId),
    Without(ComponentTypeId),
    /// Matches entities whose `ComponentTypeId`'s data was touched (via a
    /// `World::get_mut` or equivalent) since this query last ran. Tracked
    /// at archetype granularity, not per-row.
    Changed(ComponentTypeId),
}

/// One matched entity from a query: a handle plus type-erased pointers to
/// each requested component's bytes. Pointers are valid until the next
/// structural mutation of the entity's archetype (an add/remove/despawn).
#[derive(Clone)]
pub struct QueryResult {
    pub entity: EntityHandle,
    components: FxHashMap<ComponentTypeId, *mut u8>,
}

impl QueryResult {
    pub fn get<T: Component>(&self, world: &World) -> Option<&T> {
        let type_id = world.type_registry().get::<T>()?;
        let ptr = *self.components.get(&type_id)?;
        Some(unsafe { &*(ptr as *const T) })
    }

    /// # Safety-adjacent note
    /// Returns a mutable reference derived from a raw pointer captured at
    /// query time. Callers must not hold two such references to the same
    /// component alive at once; see the query engine's aliasing notes.
    pub fn get_mut<T: Component>(&self, world: &World) -> Option<&mut T> {
        let type_id = world.type_registry().get::<T>()?;
        let ptr = *self.components.get(&type_id)?;
        Some(unsafe { &mut *(ptr as *mut T) })
    }
}

/// A stateful query: the set of component types required, plus filters,
/// with its matching-archetype set cached across calls.
pub struct QuerySystem {
    component_types: Vec<ComponentTypeId>,
    filters: Vec<FilterOp>,
    cached_archetypes: Vec<ArchetypeId>,
    considered_archetypes: FxHashSet<ArchetypeId>,
    changed_baseline: FxHashMap<(ArchetypeId, ComponentTypeId), u64>,
    last_seen_archetype_count: usize,
    cache_dirty: bool,
}

impl QuerySystem {
    pub fn new(component_types: Vec<ComponentTypeId>, filters: Vec<FilterOp>) -> Self {
        Self {
            component_types,
            filters,
            cached_archetypes: Vec::new(),
            considered_archetypes: FxHashSet::default(),
            changed_baseline: FxHashMap::default(),
            last_seen_archetype_count: 0,
            cache_dirty: true,
        }
    }

    /// Force the next `query`/`count`/`query_chunked` call to rebuild the
    /// archetype cache from scratch, e.g. after registering a new
    /// component type this query should now consider.
    pub fn mark_dirty(&mut self) {
        self.cache_dirty = true;
        self.cached_archetypes.clear();
        self.considered_archetypes.clear();
        self.last_seen_archetype_count = 0;
    }

    fn required_types(&self) -> Vec<ComponentTypeId> {
        let mut required = self.component_types.clone();
        for filter in &self.filters {
            if let FilterOp::With(t) | FilterOp::Changed(t) = filter {
                required.push(*t);
            }
        }
        required
    }

    /// An archetype's component-type signature never changes after it's
    /// created, so once an archetype has been considered (matched or not)
    /// that verdict never goes stale — rebuilding only ever needs to look
    /// at archetypes created since the last rebuild.
    fn is_stale(&self, world: &World) -> bool {
        self.cache_dirty || world.archetype_count() != self.last_seen_archetype_count
    }

    /// Scan archetypes created since the last rebuild and fold any new
    /// matches into the cache; previously considered archetypes are never
    /// re-examined.
    pub fn rebuild(&mut self, world: &World) {
        #[cfg(feature = "profiling")]
        let span = info_span!("query.rebuild", archetypes = world.archetype_count());
        #[cfg(feature = "profiling")]
        let _guard = span.enter();

        let required = self.required_types();

        for archetype_id in world.archetype_ids() {
            if self.considered_archetypes.contains(&archetype_id) {
                continue;
            }
            self.considered_archetypes.insert(archetype_id);

            let Some(archetype) = world.archetype(archetype_id) else {
                continue;
            };
            if !archetype.matches(&required) {
                continue;
            }
            if self
                .filters
                .iter()
                .any(|f| matches!(f, FilterOp::Without(t) if archetype.has_component_type(*t)))
            {
                continue;
            }
            self.cached_archetypes.push(archetype_id);
        }

        self.last_seen_archetype_count = world.archetype_count();
        self.cache_dirty = false;
    }

    fn ensure_fresh(&mut self, world: &World) {
        if self.is_stale(world) {
            self.rebuild(world);
        }
    }

    fn passes_changed_filters(&mut self, world: &World, archetype_id: ArchetypeId) -> bool {
        let Some(archetype) = world.archetype(archetype_id) else {
            return false;
        };
        let mut passes = true;
        for filter in &self.filters {
            if let FilterOp::Changed(type_id) = filter {
                let current = archetype.component_version(*type_id);
                let baseline = self
                    .changed_baseline
                    .get(&(archetype_id, *type_id))
                    .copied()
                    .unwrap_or(0);
                if current <= baseline {
                    passes = false;
                }
                self.changed_baseline.insert((archetype_id, *type_id), current);
            }
        }
        passes
    }

    /// Run the query, returning one `QueryResult` per matching entity.
    pub fn query(&mut self, world: &mut World) -> Vec<QueryResult> {
        self.ensure_fresh(world);
        let archetype_ids = self.cached_archetypes.clone();
        let mut results = Vec::new();

        for archetype_id in archetype_ids {
            if !self.passes_changed_filters(world, archetype_id) {
                continue;
            }

            let rows: Vec<(EntityId, FxHashMap<ComponentTypeId, *mut u8>)> = {
                let Some(archetype) = world.archetype_mut(archetype_id) else {
                    continue;
                };
                let entities = archetype.get_entities().to_vec();
                let mut rows = Vec::with_capacity(entities.len());
                for (row, &entity_id) in entities.iter().enumerate() {
                    let mut components = FxHashMap::default();
                    let mut complete = true;
                    for &type_id in &self.component_types {
                        match archetype.get_component_array_mut(type_id).and_then(|c| c.ptr_mut(row)) {
                            Some(ptr) => {
                                components.insert(type_id, ptr);
                            }
                            None => {
                                complete = false;
                                break;
                            }
                        }
                    }
                    if complete {
                        rows.push((entity_id, components));
                    }
                }
                rows
            };

            for (entity_id, components) in rows {
                if let Some(entity) = world.handle_of(entity_id) {
                    results.push(QueryResult { entity, components });
                }
            }
        }

        results
    }

    /// Number of entities the query currently matches, without allocating
    /// the per-entity component-pointer maps `query` builds.
    pub fn count(&mut self, world: &World) -> usize {
        self.ensure_fresh(world);
        self.cached_archetypes
            .iter()
            .filter_map(|id| world.archetype(*id))
            .map(|a| a.size())
            .sum()
    }

    /// Run the query and split the results into chunks of at most
    /// `chunk_size` entities. `ceil(matched / chunk_size)` chunks are
    /// returned; the last chunk may be shorter. Chunks borrow independent
    /// `QueryResult` clones, so aliasing across chunks is exactly the
    /// aliasing already allowed within one `QueryResult` list.
    pub fn query_chunked(&mut self, world: &mut World, chunk_size: usize) -> Vec<Vec<QueryResult>> {
        let chunk_size = chunk_size.max(1);
        self.query(world).chunks(chunk_size).map(|c| c.to_vec()).collect()
    }
}

/// One-shot, uncached query: scan every archetype once. Prefer
/// [`QuerySystem`] for a query run every frame.
pub fn immediate_query(world: &mut World, component_types: &[ComponentTypeId], filters: &[FilterOp]) -> Vec<QueryResult> {
    let mut system = QuerySystem::new(component_types.to_vec(), filters.to_vec());
    system.query(world)
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
    struct Dead;

    #[test]
    fn query_matches_only_archetypes_with_required_types() {
        let mut world = World::new();
        let both = world.create();
        world.add(both, Position { x: 1.0 }).unwrap();
        world.add(both, Velocity { y: 2.0 }).unwrap();
        let only_pos = world.create();
        world.add(only_pos, Position { x: 3.0 }).unwrap();

        let pos_type = world.register::<Position>();
        let vel_type = world.register::<Velocity>();
        let mut query = QuerySystem::new(vec![pos_type, vel_type], vec![]);
        let results = query.query(&mut world);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity, both);
        assert_eq!(results[0].get::<Velocity>(&world).unwrap().y, 2.0);
    }

    #[test]
    fn without_filter_excludes_archetype() {
        let mut world = World::new();
        let alive = world.create();
        world.add(alive, Position { x: 1.0 }).unwrap();
        let dead = world.create();
        world.add(dead, Position { x: 2.0 }).unwrap();
        world.add(dead, Dead).unwrap();

        let pos_type = world.register::<Position>();
        let dead_type = world.register::<Dead>();
        let mut query = QuerySystem::new(vec![pos_type], vec![FilterOp::Without(dead_type)]);
        let results = query.query(&mut world);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity, alive);
    }

    #[test]
    fn cache_survives_unrelated_archetype_additions() {
        let mut world = World::new();
        let e = world.create();
        world.add(e, Position { x: 1.0 }).unwrap();

        let pos_type = world.register::<Position>();
        let mut query = QuerySystem::new(vec![pos_type], vec![]);
        assert_eq!(query.count(&world), 1);

        // A new, unrelated archetype appears; the cached archetype list for
        // this query must still include the original plus re-scan cleanly.
        let other = world.create();
        world.add(other, Velocity { y: 1.0 }).unwrap();
        assert_eq!(query.count(&world), 1);
    }

    #[test]
    fn query_chunked_splits_into_ceil_division_chunks() {
        let mut world = World::new();
        for i in 0..5 {
            let e = world.create();
            world.add(e, Position { x: i as f32 }).unwrap();
        }
        let pos_type = world.register::<Position>();
        let mut query = QuerySystem::new(vec![pos_type], vec![]);
        let chunks = query.query_chunked(&mut world, 2);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 2);
        assert_eq!(chunks[1].len(), 2);
        assert_eq!(chunks[2].len(), 1);
    }

    #[test]
    fn changed_filter_matches_only_after_a_mutation() {
        let mut world = World::new();
        let e = world.create();
        world.add(e, Position { x: 0.0 }).unwrap();

        let pos_type = world.register::<Position>();
        let mut query = QuerySystem::new(vec![], vec![FilterOp::Changed(pos_type)]);
        assert_eq!(query.query(&mut world).len(), 0, "no mutation has happened yet");

        world.get_mut::<Position>(e).unwrap().x = 9.0;
        assert_eq!(query.query(&mut world).len(), 1);
        assert_eq!(query.query(&mut world).len(), 0, "baseline advanced past the single mutation");
    }

    #[test]
    fn immediate_query_does_not_require_caller_state() {
        let mut world = World::new();
        let e = world.create();
        world.add(e, Position { x: 4.0 }).unwrap();
        let pos_type = world.register::<Position>();

        let results = immediate_query(&mut world, &[pos_type], &[]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get::<Position>(&world).unwrap().x, 4.0);
    }
}
