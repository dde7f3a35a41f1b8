//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use lattice_ecs::prelude::*;
//! ```

pub use crate::app::App;
pub use crate::archetype::{Archetype, ArchetypeId};
pub use crate::builtin::{
    InputPlugin, InputState, KeyCode, KeyboardState, MouseButton, MousePosition, MouseState,
};
pub use crate::component::{Component, ComponentTypeId};
pub use crate::entity::{EntityHandle, EntityId};
pub use crate::error::{EcsError, Result};
pub use crate::plugin::{Plugin, PluginManager};
pub use crate::query::{FilterOp, QueryResult, QuerySystem};
pub use crate::resources::ResourceStore;
pub use crate::schedule::Scheduler;
pub use crate::system::{Stage, System};
pub use crate::time::{FixedTime, Time, TimePlugin};
pub use crate::world::{ComponentData, World};
