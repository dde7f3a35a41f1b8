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

//! Error types

use std::fmt;

/// ECS error type
#[derive(Debug, Clone)]
pub enum EcsError {
    /// Entity handle is stale (despawned) or never existed
    EntityNotFound,

    /// A component type was used before `TypeRegistry::register` was called for it
    ComponentNotRegistered,

    /// `World::add` called on an entity that already carries this component
    DuplicateComponent,

    /// `add` (system or plugin) called with a name already registered
    DuplicateName(String),

    /// Intra-stage `depends_on` graph has a cycle
    CircularDependency,

    /// `depends_on` names a system that either doesn't exist or lives in another stage
    UnknownDependency(String),

    /// A system's `update` returned an error
    SystemUpdate(String),

    /// A plugin's `dependencies()` named a plugin not yet added
    MissingPluginDependency(String),

    /// `PluginManager::build` called more than once
    AlreadyBuilt,
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::EntityNotFound => write!(f, "entity not found"),
            EcsError::ComponentNotRegistered => write!(f, "component type not registered"),
            EcsError::DuplicateComponent => write!(f, "entity already has this component"),
            EcsError::DuplicateName(name) => write!(f, "name already registered: {name}"),
            EcsError::CircularDependency => write!(f, "circular system dependency"),
            EcsError::UnknownDependency(name) => {
                write!(f, "dependency not found in same stage: {name}")
            }
            EcsError::SystemUpdate(msg) => write!(f, "system update failed: {msg}"),
            EcsError::MissingPluginDependency(name) => {
                write!(f, "plugin dependency not yet added: {name}")
            }
            EcsError::AlreadyBuilt => write!(f, "plugin manager already built"),
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, EcsError>;
