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

//! Frame timing as a resource. [`TimePlugin`] installs a [`Time`] and a
//! `pre_update` system that advances it once per frame from the wall
//! clock, plus [`FixedTime`] for code that needs a stable simulation
//! step independent of frame rate.

use std::time::{Duration, Instant};

use crate::app::App;
use crate::error::Result;
use crate::plugin::Plugin;
use crate::system::{Stage, System};

/// Wall-clock frame timing, stored as an `App` resource.
#[derive(Debug, Clone, Copy)]
pub struct Time {
    pub delta_seconds: f32,
    pub elapsed_seconds: f32,
    pub frame_number: u64,
    pub last_update: Instant,
    time_scale: f32,
    paused: bool,
}

impl Time {
    pub fn new() -> Self {
        Self {
            delta_seconds: 0.0,
            elapsed_seconds: 0.0,
            frame_number: 0,
            last_update: Instant::now(),
            time_scale: 1.0,
            paused: false,
        }
    }

    /// Advance the clock to `now`, scaling the step by `time_scale` and
    /// producing a zero step while paused. Always bumps `frame_number`
    /// and `last_update`, even while paused, so `elapsed_seconds` stays a
    /// faithful running total of unpaused time.
    pub fn update(&mut self, now: Instant) {
        let raw_delta = now.duration_since(self.last_update).as_secs_f32();
        self.delta_seconds = if self.paused { 0.0 } else { raw_delta * self.time_scale };
        self.elapsed_seconds += self.delta_seconds;
        self.last_update = now;
        self.frame_number += 1;
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixed-timestep accumulator, independent of `Time`'s variable frame
/// delta. Feed it the frame's real delta via `tick`; it tells you how many
/// whole simulation steps to run.
#[derive(Debug, Clone, Copy)]
pub struct FixedTime {
    timestep: Duration,
    accumulator: Duration,
}

impl FixedTime {
    pub fn new(hz: f64) -> Self {
        Self::from_duration(Duration::from_secs_f64(1.0 / hz))
    }

    pub fn from_duration(timestep: Duration) -> Self {
        Self { timestep, accumulator: Duration::ZERO }
    }

    /// Accumulate `delta` and return how many fixed steps are now due.
    pub fn tick(&mut self, delta: Duration) -> usize {
        self.accumulator += delta;
        let mut steps = 0;
        while self.accumulator >= self.timestep {
            self.accumulator -= self.timestep;
            steps += 1;
        }
        steps
    }

    pub fn timestep(&self) -> Duration {
        self.timestep
    }

    pub fn timestep_seconds(&self) -> f32 {
        self.timestep.as_secs_f32()
    }

    pub fn overstep(&self) -> Duration {
        self.accumulator
    }

    /// How far into the next fixed step the accumulator sits, as a
    /// fraction in `[0, 1)`, useful for interpolating render state.
    pub fn overstep_fraction(&self) -> f32 {
        self.accumulator.as_secs_f32() / self.timestep.as_secs_f32()
    }
}

struct AdvanceTime;

impl System for AdvanceTime {
    fn name(&self) -> &str {
        "lattice_ecs::time::advance_time"
    }

    fn update(&mut self, app: &mut App, _delta_seconds: f32) -> Result<()> {
        let now = Instant::now();
        if let Some(time) = app.resources.get_mut::<Time>() {
            time.update(now);
        }
        Ok(())
    }
}

/// Inserts a default [`Time`] resource and a `pre_update` system that
/// advances it every frame from the wall clock.
pub struct TimePlugin;

impl Plugin for TimePlugin {
    fn name(&self) -> &str {
        "TimePlugin"
    }

    fn build(&self, app: &mut App) {
        app.resources.insert(Time::new());
        let _ = app.add_system(Box::new(AdvanceTime), Stage::PreUpdate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn time_creation_starts_at_zero() {
        let time = Time::new();
        assert_eq!(time.frame_number, 0);
        assert_eq!(time.elapsed_seconds, 0.0);
    }

    #[test]
    fn update_advances_elapsed_and_frame_count() {
        let mut time = Time::new();
        thread::sleep(Duration::from_millis(5));
        time.update(Instant::now());
        assert!(time.delta_seconds > 0.0);
        assert_eq!(time.frame_number, 1);
        assert_eq!(time.elapsed_seconds, time.delta_seconds);
    }

    #[test]
    fn pausing_zeroes_delta_but_keeps_advancing_frame_count() {
        let mut time = Time::new();
        time.pause();
        thread::sleep(Duration::from_millis(5));
        time.update(Instant::now());
        assert_eq!(time.delta_seconds, 0.0);
        assert_eq!(time.frame_number, 1);
        assert!(time.is_paused());
    }

    #[test]
    fn fixed_time_60hz_steps_at_the_expected_rate() {
        let mut fixed = FixedTime::new(60.0);
        let steps = fixed.tick(Duration::from_secs_f64(1.0 / 60.0));
        assert_eq!(steps, 1);
        assert!(fixed.overstep() < Duration::from_micros(1));
    }

    #[test]
    fn fixed_time_slow_frame_produces_multiple_steps() {
        let mut fixed = FixedTime::new(60.0);
        let steps = fixed.tick(Duration::from_secs_f64(3.0 / 60.0));
        assert_eq!(steps, 3);
    }

    #[test]
    fn overstep_fraction_is_between_zero_and_one() {
        let mut fixed = FixedTime::new(60.0);
        fixed.tick(Duration::from_secs_f64(1.5 / 60.0));
        let fraction = fixed.overstep_fraction();
        assert!(fraction >= 0.0 && fraction < 1.0);
    }

    #[test]
    fn time_plugin_inserts_time_resource() {
        let mut app = App::new();
        app.add_plugin(TimePlugin).unwrap();
        app.build_plugins().unwrap();
        assert!(app.resources.get::<Time>().is_some());
    }
}
