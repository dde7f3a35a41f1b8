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

//! `App`: the world, resources, scheduler, and plugin registry bundled
//! into one frame-advancing entry point.

use crate::error::Result;
use crate::plugin::{Plugin, PluginManager};
use crate::resources::ResourceStore;
use crate::schedule::Scheduler;
use crate::system::{BoxedSystem, Stage};
use crate::world::World;

pub struct App {
    pub world: World,
    pub resources: ResourceStore,
    pub scheduler: Scheduler,
    plugins: PluginManager,
}

impl App {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            resources: ResourceStore::new(),
            scheduler: Scheduler::new(),
            plugins: PluginManager::new(),
        }
    }

    /// Register a plugin. Its `build` doesn't run until `build_plugins` is
    /// called.
    pub fn add_plugin<P: Plugin>(&mut self, plugin: P) -> Result<&mut Self> {
        self.plugins.add(Box::new(plugin))?;
        Ok(self)
    }

    pub fn add_plugin_before<P: Plugin>(&mut self, plugin: P, before: &str) -> Result<&mut Self> {
        self.plugins.add_before(Box::new(plugin), before)?;
        Ok(self)
    }

    pub fn add_plugin_after<P: Plugin>(&mut self, plugin: P, after: &str) -> Result<&mut Self> {
        self.plugins.add_after(Box::new(plugin), after)?;
        Ok(self)
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    /// Build every registered plugin, in registration order. Callable
    /// exactly once.
    pub fn build_plugins(&mut self) -> Result<()> {
        let mut plugins = std::mem::take(&mut self.plugins);
        let result = plugins.build(self);
        self.plugins = plugins;
        result
    }

    pub fn add_system(&mut self, system: BoxedSystem, stage: Stage) -> Result<&mut Self> {
        self.scheduler.add(system, stage)?;
        Ok(self)
    }

    /// Run one frame: every enabled system, in every stage, in order.
    pub fn update(&mut self, delta_seconds: f32) -> Result<()> {
        let mut scheduler = std::mem::take(&mut self.scheduler);
        let result = scheduler.update_all(self, delta_seconds);
        self.scheduler = scheduler;
        result
    }

    /// Build plugins if needed, then run frames back to back until a
    /// system returns an error.
    pub fn run(&mut self) -> Result<()> {
        if !self.plugins.is_built() {
            self.build_plugins()?;
        }
        loop {
            self.update(1.0 / 60.0)?;
            std::thread::sleep(std::time::Duration::from_millis(16));
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
