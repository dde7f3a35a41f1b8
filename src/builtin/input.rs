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

//! Input tracking for keyboard and mouse, exposed as `App` resources.
//!
//! Provides generic pressed/just_pressed/just_released state tracking.
//!
//! # Examples
//!
//! ```
//! use lattice_ecs::builtin::{KeyboardState, KeyCode};
//!
//! let mut input = KeyboardState::new();
//! input.press(KeyCode::Space);
//!
//! if input.just_pressed(KeyCode::Space) {
//!     println!("Jump!");
//! }
//!
//! input.clear_just_changed(); // Call at end of frame
//! ```

use std::collections::HashSet;
use std::hash::Hash;

/// Generic press/release tracker for any `Copy + Eq + Hash` input code.
#[derive(Clone, Debug)]
pub struct InputState<T: Copy + Eq + Hash> {
    pressed: HashSet<T>,
    just_pressed: HashSet<T>,
    just_released: HashSet<T>,
}

impl<T: Copy + Eq + Hash> InputState<T> {
    pub fn new() -> Self {
        Self {
            pressed: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    pub fn press(&mut self, input: T) {
        if !self.pressed.contains(&input) {
            self.just_pressed.insert(input);
        }
        self.pressed.insert(input);
    }

    pub fn release(&mut self, input: T) {
        if self.pressed.contains(&input) {
            self.just_released.insert(input);
        }
        self.pressed.remove(&input);
    }

    pub fn pressed(&self, input: T) -> bool {
        self.pressed.contains(&input)
    }

    pub fn just_pressed(&self, input: T) -> bool {
        self.just_pressed.contains(&input)
    }

    pub fn just_released(&self, input: T) -> bool {
        self.just_released.contains(&input)
    }

    pub fn get_pressed(&self) -> impl Iterator<Item = &T> {
        self.pressed.iter()
    }

    /// Clear just_pressed and just_released. Call once per frame, after
    /// systems have had a chance to observe this frame's edges.
    pub fn clear_just_changed(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }

    pub fn reset(&mut self) {
        self.pressed.clear();
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

impl<T: Copy + Eq + Hash> Default for InputState<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyCode {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,

    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,

    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    Space,
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,

    Left,
    Right,
    Up,
    Down,

    LShift,
    RShift,
    LControl,
    RControl,
    LAlt,
    RAlt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

pub type KeyboardState = InputState<KeyCode>;
pub type MouseState = InputState<MouseButton>;

/// Cursor position and per-frame movement delta.
#[derive(Clone, Copy, Debug, Default)]
pub struct MousePosition {
    pub x: f32,
    pub y: f32,
    pub delta_x: f32,
    pub delta_y: f32,
}

impl MousePosition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, x: f32, y: f32) {
        self.delta_x = x - self.x;
        self.delta_y = y - self.y;
        self.x = x;
        self.y = y;
    }

    pub fn clear_delta(&mut self) {
        self.delta_x = 0.0;
        self.delta_y = 0.0;
    }
}
