#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame-indexed playback of a completed simulation.
//!
//! The engine advances on a fixed delay derived from the speed slider, stops
//! on the last frame, and pauses whenever the user seeks. Time is supplied by
//! the caller through [`ReplayEngine::tick`] so playback stays deterministic.

use std::time::Duration;

use evacsim_core::{AgentFrame, CellCoord, Frame, SimulationResult};

/// Shortest delay between two frames regardless of speed.
pub const MIN_FRAME_DELAY: Duration = Duration::from_millis(16);

/// Default delay between frames at the middle speed.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Slowest speed slider value.
pub const MIN_SPEED: u8 = 1;

/// Fastest speed slider value.
pub const MAX_SPEED: u8 = 10;

/// Speed at which the base delay applies unchanged.
pub const DEFAULT_SPEED: u8 = 5;

/// Everything needed to draw the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayView<'a> {
    /// Index of the frame within the history.
    pub index: usize,
    /// Simulation step of the frame; defaults to the index.
    pub step: u32,
    /// Agents in agent-index order.
    pub agents: &'a [AgentFrame],
    /// Cells on fire.
    pub fire: &'a [CellCoord],
    /// Exits to draw: the frame's own, else the result's corrected exits.
    pub exits: &'a [CellCoord],
}

/// Playback controller over a frame history.
#[derive(Clone, Debug)]
pub struct ReplayEngine {
    frames: Vec<Frame>,
    fallback_exits: Vec<CellCoord>,
    index: usize,
    playing: bool,
    speed: u8,
    base_delay: Duration,
    accumulator: Duration,
}

impl ReplayEngine {
    /// Creates a paused engine over the result's frame history.
    #[must_use]
    pub fn new(result: &SimulationResult, base_delay: Duration) -> Self {
        let mut engine = Self::from_frames(result.frames().to_vec(), base_delay);
        engine.fallback_exits = result.exits.clone().unwrap_or_default();
        engine
    }

    /// Creates a paused engine over raw frames.
    #[must_use]
    pub fn from_frames(frames: Vec<Frame>, base_delay: Duration) -> Self {
        Self {
            frames,
            fallback_exits: Vec::new(),
            index: 0,
            playing: false,
            speed: DEFAULT_SPEED,
            base_delay,
            accumulator: Duration::ZERO,
        }
    }

    /// Number of frames in the history.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Index of the frame currently shown.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.index
    }

    /// Whether playback is advancing.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.playing
    }

    /// Current speed slider value.
    #[must_use]
    pub const fn speed(&self) -> u8 {
        self.speed
    }

    /// Sets the speed, clamped to `MIN_SPEED..=MAX_SPEED`.
    pub fn set_speed(&mut self, speed: u8) {
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
    }

    /// Delay between frames at the current speed.
    #[must_use]
    pub fn frame_delay(&self) -> Duration {
        let scaled = self.base_delay * u32::from(DEFAULT_SPEED) / u32::from(self.speed);
        scaled.max(MIN_FRAME_DELAY)
    }

    /// Starts playback; a no-op on the last frame or an empty history.
    pub fn play(&mut self) {
        self.accumulator = Duration::ZERO;
        self.playing = !self.frames.is_empty() && !self.at_end();
    }

    /// Stops playback without moving.
    pub fn pause(&mut self) {
        self.playing = false;
        self.accumulator = Duration::ZERO;
    }

    /// Flips between playing and paused.
    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Jumps to a frame, clamped into range, and pauses.
    pub fn seek(&mut self, index: usize) {
        self.pause();
        if let Some(last) = self.last_index() {
            self.index = index.min(last);
        }
    }

    /// Jumps to the first frame and pauses.
    pub fn reset(&mut self) {
        self.seek(0);
    }

    /// Jumps to the last frame and pauses.
    pub fn jump_to_end(&mut self) {
        self.seek(usize::MAX);
    }

    /// Advances playback by elapsed time; returns whether the frame changed.
    pub fn tick(&mut self, dt: Duration) -> bool {
        if !self.playing {
            return false;
        }
        let delay = self.frame_delay();
        self.accumulator += dt;
        let start = self.index;
        while self.accumulator >= delay && !self.at_end() {
            self.accumulator -= delay;
            self.index += 1;
        }
        if self.at_end() {
            self.pause();
        }
        self.index != start
    }

    /// View of the current frame, or `None` for an empty history.
    #[must_use]
    pub fn current_view(&self) -> Option<ReplayView<'_>> {
        let frame = self.frames.get(self.index)?;
        let exits = frame
            .exits
            .as_deref()
            .unwrap_or(self.fallback_exits.as_slice());
        Some(ReplayView {
            index: self.index,
            step: frame.step.unwrap_or(self.index as u32),
            agents: &frame.agents,
            fire: &frame.fire_map,
            exits,
        })
    }

    fn last_index(&self) -> Option<usize> {
        self.frames.len().checked_sub(1)
    }

    fn at_end(&self) -> bool {
        self.last_index().map_or(true, |last| self.index >= last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_inversely_proportional_to_speed() {
        let mut engine = ReplayEngine::from_frames(Vec::new(), DEFAULT_BASE_DELAY);
        assert_eq!(engine.frame_delay(), Duration::from_millis(500));
        engine.set_speed(10);
        assert_eq!(engine.frame_delay(), Duration::from_millis(250));
        engine.set_speed(1);
        assert_eq!(engine.frame_delay(), Duration::from_millis(2500));
        engine.set_speed(0);
        assert_eq!(engine.speed(), MIN_SPEED);
    }

    #[test]
    fn delay_never_drops_below_floor() {
        let mut engine = ReplayEngine::from_frames(Vec::new(), Duration::from_millis(10));
        engine.set_speed(MAX_SPEED);
        assert_eq!(engine.frame_delay(), MIN_FRAME_DELAY);
    }
}
