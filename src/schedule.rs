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

//! Schedules systems into the five fixed frame stages, ordering each
//! stage's systems by a topological sort of their `depends_on()` edges.
//!
//! Systems within a stage that share no dependency relationship land in
//! the same tier; `execution_order = tier_index * 1000 - priority` keeps
//! tiers in order while letting `priority()` break ties inside a tier.
//! Tiers mark which systems were parallel-eligible, but `update_stage`
//! still runs them one at a time, in `execution_order`.

use rustc_hash::FxHashMap;

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::app::App;
use crate::error::{EcsError, Result};
use crate::system::{BoxedSystem, Stage, SystemWrapper};

#[derive(Default)]
pub struct Scheduler {
    stages: FxHashMap<Stage, Vec<SystemWrapper>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `system` into `stage` and recompute that stage's
    /// execution order.
    pub fn add(&mut self, system: BoxedSystem, stage: Stage) -> Result<()> {
        let name = system.name().to_string();
        let bucket = self.stages.entry(stage).or_default();
        if bucket.iter().any(|w| w.name() == name) {
            return Err(EcsError::DuplicateName(name));
        }
        bucket.push(SystemWrapper::new(system, stage));
        compute_execution_order(bucket)?;
        Ok(())
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        for bucket in self.stages.values_mut() {
            if let Some(wrapper) = bucket.iter_mut().find(|w| w.name() == name) {
                wrapper.set_enabled(enabled);
                return true;
            }
        }
        false
    }

    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.stages.values().flatten().find(|w| w.name() == name).map(|w| w.enabled())
    }

    /// Remove the system named `name` from whichever stage holds it.
    pub fn remove(&mut self, name: &str) -> bool {
        for bucket in self.stages.values_mut() {
            if let Some(pos) = bucket.iter().position(|w| w.name() == name) {
                bucket.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn clear(&mut self) {
        for bucket in self.stages.values_mut() {
            bucket.clear();
        }
    }

    pub fn system_count(&self) -> usize {
        self.stages.values().map(Vec::len).sum()
    }

    pub fn stage_system_count(&self, stage: Stage) -> usize {
        self.stages.get(&stage).map_or(0, Vec::len)
    }

    /// Run every enabled system in `stage`, in `execution_order`.
    pub fn update_stage(&mut self, app: &mut App, stage: Stage, delta_seconds: f32) -> Result<()> {
        #[cfg(feature = "profiling")]
        let _span = info_span!("scheduler.update_stage", ?stage).entered();

        let Some(bucket) = self.stages.get_mut(&stage) else {
            return Ok(());
        };
        bucket.sort_by_key(SystemWrapper::execution_order);
        for wrapper in bucket.iter_mut() {
            if wrapper.enabled() {
                wrapper.run(app, delta_seconds)?;
            }
        }
        Ok(())
    }

    /// Run every stage, in fixed order: `pre_update`, `update`,
    /// `post_update`, `render`, `cleanup`.
    pub fn update_all(&mut self, app: &mut App, delta_seconds: f32) -> Result<()> {
        for &stage in &Stage::ORDER {
            self.update_stage(app, stage, delta_seconds)?;
        }
        Ok(())
    }
}

/// Topologically sort `wrappers` by their `depends_on()` edges and assign
/// `execution_order` by tier. `EcsError::UnknownDependency` if a dependency
/// name isn't present in this same group; `EcsError::CircularDependency` if
/// no tier can be peeled off and systems remain.
fn compute_execution_order(wrappers: &mut [SystemWrapper]) -> Result<()> {
    let n = wrappers.len();
    let name_to_index: FxHashMap<String, usize> =
        wrappers.iter().enumerate().map(|(i, w)| (w.name().to_string(), i)).collect();

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];
    for (i, wrapper) in wrappers.iter().enumerate() {
        for dep_name in wrapper.depends_on() {
            let &dep_index = name_to_index
                .get(&dep_name)
                .ok_or_else(|| EcsError::UnknownDependency(dep_name.clone()))?;
            dependents[dep_index].push(i);
            in_degree[i] += 1;
        }
    }

    let mut done = vec![false; n];
    let mut processed = 0usize;
    let mut tier_index: i64 = 0;

    while processed < n {
        let tier: Vec<usize> = (0..n).filter(|&i| !done[i] && in_degree[i] == 0).collect();
        if tier.is_empty() {
            return Err(EcsError::CircularDependency);
        }
        for &i in &tier {
            let order = tier_index * 1000 - wrappers[i].priority() as i64;
            wrappers[i].set_execution_order(order);
            done[i] = true;
        }
        for &i in &tier {
            for &dependent in &dependents[i] {
                in_degree[dependent] -= 1;
            }
        }
        processed += tier.len();
        tier_index += 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::System;

    struct Recording {
        name: &'static str,
        deps: Vec<String>,
        priority: i32,
        log: std::sync::Arc<std::sync::Mutex<Vec<&'static str>>>,
    }
    impl System for Recording {
        fn name(&self) -> &str {
            self.name
        }
        fn update(&mut self, _app: &mut App, _delta_seconds: f32) -> Result<()> {
            self.log.lock().unwrap().push(self.name);
            Ok(())
        }
        fn depends_on(&self) -> Vec<String> {
            self.deps.clone()
        }
        fn priority(&self) -> i32 {
            self.priority
        }
    }

    #[test]
    fn systems_run_in_dependency_order() {
        let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::new();
        scheduler
            .add(
                Box::new(Recording { name: "second", deps: vec!["first".to_string()], priority: 0, log: log.clone() }),
                Stage::Update,
            )
            .unwrap();
        scheduler
            .add(Box::new(Recording { name: "first", deps: Vec::new(), priority: 0, log: log.clone() }), Stage::Update)
            .unwrap();

        let mut app = App::new();
        scheduler.update_stage(&mut app, Stage::Update, 0.016).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::new();
        let result = scheduler.add(
            Box::new(Recording { name: "a", deps: vec!["ghost".to_string()], priority: 0, log }),
            Stage::Update,
        );
        assert!(matches!(result, Err(EcsError::UnknownDependency(_))));
    }

    #[test]
    fn circular_dependency_is_rejected() {
        let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::new();
        scheduler
            .add(Box::new(Recording { name: "a", deps: vec!["b".to_string()], priority: 0, log: log.clone() }), Stage::Update)
            .unwrap();
        let result = scheduler.add(
            Box::new(Recording { name: "b", deps: vec!["a".to_string()], priority: 0, log }),
            Stage::Update,
        );
        assert!(matches!(result, Err(EcsError::CircularDependency)));
    }

    #[test]
    fn disabled_systems_do_not_run() {
        let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::new();
        scheduler
            .add(Box::new(Recording { name: "a", deps: Vec::new(), priority: 0, log: log.clone() }), Stage::Update)
            .unwrap();
        scheduler.set_enabled("a", false);
        let mut app = App::new();
        scheduler.update_stage(&mut app, Stage::Update, 0.016).unwrap();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn stages_run_in_fixed_order() {
        let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::new();
        scheduler
            .add(Box::new(Recording { name: "render", deps: Vec::new(), priority: 0, log: log.clone() }), Stage::Render)
            .unwrap();
        scheduler
            .add(Box::new(Recording { name: "pre", deps: Vec::new(), priority: 0, log: log.clone() }), Stage::PreUpdate)
            .unwrap();
        let mut app = App::new();
        scheduler.update_all(&mut app, 0.016).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["pre", "render"]);
    }

    #[test]
    fn priority_breaks_ties_within_a_tier() {
        let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::new();
        scheduler
            .add(Box::new(Recording { name: "low", deps: Vec::new(), priority: -5, log: log.clone() }), Stage::Update)
            .unwrap();
        scheduler
            .add(Box::new(Recording { name: "high", deps: Vec::new(), priority: 5, log: log.clone() }), Stage::Update)
            .unwrap();
        let mut app = App::new();
        scheduler.update_stage(&mut app, Stage::Update, 0.016).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["high", "low"]);
    }
}
