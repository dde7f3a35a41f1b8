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

//! The `System` trait, the five fixed frame stages, and per-system
//! scheduling/runtime bookkeeping.

use std::time::Instant;

use crate::app::App;
use crate::error::{EcsError, Result};

/// One unit of per-frame logic. A system owns no world state itself —
/// everything it reads or writes lives on the `App` it's handed.
pub trait System: Send + Sync {
    fn name(&self) -> &str;

    fn update(&mut self, app: &mut App, delta_seconds: f32) -> Result<()>;

    /// Tiebreak within a topological tier: higher runs first. Systems with
    /// no dependency relationship to each other fall into the same tier
    /// regardless of priority; priority only orders within it.
    fn priority(&self) -> i32 {
        0
    }

    /// Names of systems in the same stage that must run before this one.
    fn depends_on(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether this system could safely run concurrently with other
    /// parallel-eligible systems in its tier. The scheduler currently
    /// always runs systems sequentially regardless of this flag.
    fn can_run_parallel(&self) -> bool {
        false
    }

    fn init(&mut self, _app: &mut App) -> Result<()> {
        Ok(())
    }

    fn finalize(&mut self, _app: &mut App) -> Result<()> {
        Ok(())
    }
}

pub type BoxedSystem = Box<dyn System>;

/// The five fixed points in a frame a system can be scheduled into, always
/// run in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    PreUpdate,
    Update,
    PostUpdate,
    Render,
    Cleanup,
}

impl Stage {
    pub const ORDER: [Stage; 5] = [Stage::PreUpdate, Stage::Update, Stage::PostUpdate, Stage::Render, Stage::Cleanup];
}

/// Rolling per-system execution stats, accumulated across every `update`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemStats {
    pub total_time_ns: u64,
    pub call_count: u64,
    pub error_count: u64,
}

/// A registered system plus its scheduling state.
pub struct SystemWrapper {
    system: BoxedSystem,
    stage: Stage,
    enabled: bool,
    stats: SystemStats,
    execution_order: i64,
}

impl SystemWrapper {
    pub fn new(system: BoxedSystem, stage: Stage) -> Self {
        Self {
            system,
            stage,
            enabled: true,
            stats: SystemStats::default(),
            execution_order: 0,
        }
    }

    pub fn name(&self) -> &str {
        self.system.name()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn stats(&self) -> SystemStats {
        self.stats
    }

    pub fn execution_order(&self) -> i64 {
        self.execution_order
    }

    pub(crate) fn depends_on(&self) -> Vec<String> {
        self.system.depends_on()
    }

    pub(crate) fn priority(&self) -> i32 {
        self.system.priority()
    }

    pub(crate) fn set_execution_order(&mut self, order: i64) {
        self.execution_order = order;
    }

    /// Run the system once, recording timing and error stats. Turns a
    /// returned error into `EcsError::SystemUpdate` tagged with the
    /// system's name.
    pub(crate) fn run(&mut self, app: &mut App, delta_seconds: f32) -> Result<()> {
        let start = Instant::now();
        let outcome = self.system.update(app, delta_seconds);
        self.stats.total_time_ns = self.stats.total_time_ns.saturating_add(start.elapsed().as_nanos() as u64);
        self.stats.call_count += 1;
        match outcome {
            Ok(()) => Ok(()),
            Err(err) => {
                self.stats.error_count += 1;
                Err(EcsError::SystemUpdate(format!("{}: {err}", self.name())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl System for Noop {
        fn name(&self) -> &str {
            "Noop"
        }
        fn update(&mut self, _app: &mut App, _delta_seconds: f32) -> Result<()> {
            Ok(())
        }
    }

    struct Failing;
    impl System for Failing {
        fn name(&self) -> &str {
            "Failing"
        }
        fn update(&mut self, _app: &mut App, _delta_seconds: f32) -> Result<()> {
            Err(EcsError::EntityNotFound)
        }
    }

    #[test]
    fn run_records_call_count_and_timing() {
        let mut wrapper = SystemWrapper::new(Box::new(Noop), Stage::Update);
        let mut app = App::new();
        wrapper.run(&mut app, 0.016).unwrap();
        assert_eq!(wrapper.stats().call_count, 1);
        assert_eq!(wrapper.stats().error_count, 0);
    }

    #[test]
    fn run_wraps_system_errors_and_counts_them() {
        let mut wrapper = SystemWrapper::new(Box::new(Failing), Stage::Update);
        let mut app = App::new();
        let result = wrapper.run(&mut app, 0.016);
        assert!(matches!(result, Err(EcsError::SystemUpdate(_))));
        assert_eq!(wrapper.stats().error_count, 1);
    }

    #[test]
    fn defaults_are_sequential_and_unprioritized() {
        let system = Noop;
        assert_eq!(system.priority(), 0);
        assert!(system.depends_on().is_empty());
        assert!(!system.can_run_parallel());
    }
}
