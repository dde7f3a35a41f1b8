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

//! Plugins bundle systems and resources into one reusable unit. The
//! `PluginManager` keeps them in registration order and wires them into an
//! `App` exactly once.

use crate::app::App;
use crate::error::{EcsError, Result};

/// A self-contained bundle of systems and resources. `build` runs once, in
/// registration order, when `PluginManager::build` is called.
pub trait Plugin: 'static {
    fn name(&self) -> &str;

    fn build(&self, app: &mut App);

    /// Names of plugins that must already be registered before this one.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    fn on_enable(&self, _app: &mut App) {}
    fn on_disable(&self, _app: &mut App) {}
}

pub type BoxedPlugin = Box<dyn Plugin>;

/// Ordered plugin registry with dependency checking at add time and
/// build-once semantics.
#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<BoxedPlugin>,
    built: bool,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `plugin` at the end of the list. Every name in its
    /// `dependencies()` must already be registered.
    pub fn add(&mut self, plugin: BoxedPlugin) -> Result<()> {
        self.check_insertable(plugin.as_ref())?;
        self.plugins.push(plugin);
        Ok(())
    }

    /// Register `plugin` immediately before the plugin named `before`.
    pub fn add_before(&mut self, plugin: BoxedPlugin, before: &str) -> Result<()> {
        let position = self.position_of(before).ok_or_else(|| EcsError::UnknownDependency(before.to_string()))?;
        self.check_insertable(plugin.as_ref())?;
        self.plugins.insert(position, plugin);
        Ok(())
    }

    /// Register `plugin` immediately after the plugin named `after`.
    pub fn add_after(&mut self, plugin: BoxedPlugin, after: &str) -> Result<()> {
        let position = self.position_of(after).ok_or_else(|| EcsError::UnknownDependency(after.to_string()))? + 1;
        self.check_insertable(plugin.as_ref())?;
        self.plugins.insert(position, plugin);
        Ok(())
    }

    fn check_insertable(&self, plugin: &dyn Plugin) -> Result<()> {
        if self.has(plugin.name()) {
            return Err(EcsError::DuplicateName(plugin.name().to_string()));
        }
        for dep in plugin.dependencies() {
            if !self.has(&dep) {
                return Err(EcsError::MissingPluginDependency(dep));
            }
        }
        Ok(())
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.plugins.iter().position(|p| p.name() == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.position_of(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins.iter().find(|p| p.name() == name).map(|p| p.as_ref())
    }

    pub fn list(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Only valid before `build`.
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        if self.built {
            return Err(EcsError::AlreadyBuilt);
        }
        Ok(if let Some(pos) = self.position_of(name) {
            self.plugins.remove(pos);
            true
        } else {
            false
        })
    }

    /// Call every registered plugin's `build`, then its `on_enable`, in
    /// registration order. Callable exactly once; a second call is
    /// `EcsError::AlreadyBuilt`.
    pub fn build(&mut self, app: &mut App) -> Result<()> {
        if self.built {
            return Err(EcsError::AlreadyBuilt);
        }
        for plugin in &self.plugins {
            plugin.build(app);
            plugin.on_enable(app);
        }
        self.built = true;
        Ok(())
    }

    pub fn enable(&self, name: &str, app: &mut App) {
        if let Some(plugin) = self.plugins.iter().find(|p| p.name() == name) {
            plugin.on_enable(app);
        }
    }

    pub fn disable(&self, name: &str, app: &mut App) {
        if let Some(plugin) = self.plugins.iter().find(|p| p.name() == name) {
            plugin.on_disable(app);
        }
    }
}
