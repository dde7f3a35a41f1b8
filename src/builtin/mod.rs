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

//! Off-the-shelf plugins built on the core `App`/`ResourceStore` API.

mod input;

pub use input::{InputState, KeyCode, KeyboardState, MouseButton, MousePosition, MouseState};

use crate::app::App;
use crate::plugin::Plugin;

/// Inserts [`KeyboardState`], [`MouseState`], and [`MousePosition`] as
/// resources. Input events themselves come from outside the crate —
/// callers drive `app.resources.get_mut::<KeyboardState>()` etc. directly
/// from their event loop; this plugin only owns the storage and the
/// per-frame `clear_just_changed`/`clear_delta` reset.
pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn name(&self) -> &str {
        "InputPlugin"
    }

    fn build(&self, app: &mut App) {
        app.resources.insert(KeyboardState::new());
        app.resources.insert(MouseState::new());
        app.resources.insert(MousePosition::new());
        let _ = app.add_system(Box::new(ClearInputEdges), crate::system::Stage::Cleanup);
    }
}

struct ClearInputEdges;

impl crate::system::System for ClearInputEdges {
    fn name(&self) -> &str {
        "lattice_ecs::builtin::clear_input_edges"
    }

    fn update(&mut self, app: &mut App, _delta_seconds: f32) -> crate::error::Result<()> {
        if let Some(keyboard) = app.resources.get_mut::<KeyboardState>() {
            keyboard.clear_just_changed();
        }
        if let Some(mouse) = app.resources.get_mut::<MouseState>() {
            mouse.clear_just_changed();
        }
        if let Some(position) = app.resources.get_mut::<MousePosition>() {
            position.clear_delta();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_plugin_inserts_all_three_resources() {
        let mut app = App::new();
        app.add_plugin(InputPlugin).unwrap();
        app.build_plugins().unwrap();
        assert!(app.resources.get::<KeyboardState>().is_some());
        assert!(app.resources.get::<MouseState>().is_some());
        assert!(app.resources.get::<MousePosition>().is_some());
    }

    #[test]
    fn cleanup_stage_clears_just_pressed_edges() {
        let mut app = App::new();
        app.add_plugin(InputPlugin).unwrap();
        app.build_plugins().unwrap();
        app.resources.get_mut::<KeyboardState>().unwrap().press(KeyCode::Space);
        app.update(0.016).unwrap();
        assert!(!app.resources.get::<KeyboardState>().unwrap().just_pressed(KeyCode::Space));
        assert!(app.resources.get::<KeyboardState>().unwrap().pressed(KeyCode::Space));
    }
}
