use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use evacsim_core::CellCoord;

use crate::FireSprite;

/// Fixed animation step, independent of replay stepping.
pub const FIRE_TICK: Duration = Duration::from_millis(16);

/// Time for a burning cell to grow to full size.
pub const FIRE_GROW: Duration = Duration::from_millis(600);

/// Time for a burning cell to become fully opaque.
pub const FIRE_FADE_IN: Duration = Duration::from_millis(300);

/// Relative alpha swing of the flicker.
pub const FLICKER_AMPLITUDE: f32 = 0.15;

// Angular speed of the flicker in radians per second.
const FLICKER_RATE: f32 = 12.0;

/// Tracks how long each cell has been continuously on fire.
#[derive(Clone, Debug, Default)]
pub struct FireAnimator {
    burning: BTreeSet<CellCoord>,
    ages: HashMap<CellCoord, Duration>,
    accumulator: Duration,
}

impl FireAnimator {
    /// Creates an animator with no burning cells.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the set of burning cells.
    ///
    /// Cells missing from `cells` keep their age until the next tick drops them.
    pub fn set_burning<I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = CellCoord>,
    {
        self.burning = cells.into_iter().collect();
    }

    /// Advances the animation clock by `dt`, in whole [`FIRE_TICK`] steps.
    ///
    /// Returns the number of steps taken.
    pub fn tick(&mut self, dt: Duration) -> u32 {
        self.accumulator += dt;
        let mut steps = 0;
        while self.accumulator >= FIRE_TICK {
            self.accumulator -= FIRE_TICK;
            self.step();
            steps += 1;
        }
        steps
    }

    fn step(&mut self) {
        let burning = &self.burning;
        self.ages.retain(|cell, _| burning.contains(cell));
        for cell in burning {
            *self.ages.entry(*cell).or_default() += FIRE_TICK;
        }
    }

    /// Brings every burning cell to full size for a single still frame.
    ///
    /// Cells that are no longer burning are dropped; older cells keep their age.
    pub fn settle(&mut self) {
        let burning = &self.burning;
        self.ages.retain(|cell, _| burning.contains(cell));
        for cell in burning {
            let age = self.ages.entry(*cell).or_default();
            *age = (*age).max(FIRE_GROW);
        }
    }

    /// Continuous burn age of the cell, if tracked.
    #[must_use]
    pub fn age(&self, cell: CellCoord) -> Option<Duration> {
        self.ages.get(&cell).copied()
    }

    /// Number of cells whose age is tracked.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.ages.len()
    }

    /// Sprites for the currently burning cells in row-major order.
    #[must_use]
    pub fn sprites(&self) -> Vec<FireSprite> {
        let mut sprites: Vec<_> = self
            .burning
            .iter()
            .map(|cell| {
                let age = self.ages.get(cell).copied().unwrap_or_default();
                let (scale, alpha) = appearance(age);
                FireSprite {
                    cell: *cell,
                    scale,
                    alpha,
                }
            })
            .collect();
        sprites.sort_by_key(|sprite| (sprite.cell.row(), sprite.cell.column()));
        sprites
    }

    /// Stops tracking everything.
    pub fn clear(&mut self) {
        self.burning.clear();
        self.ages.clear();
        self.accumulator = Duration::ZERO;
    }
}

fn appearance(age: Duration) -> (f32, f32) {
    let seconds = age.as_secs_f32();
    let scale = (seconds / FIRE_GROW.as_secs_f32()).min(1.0);
    let fade = (seconds / FIRE_FADE_IN.as_secs_f32()).min(1.0);
    let flicker = 1.0 + FLICKER_AMPLITUDE * (seconds * FLICKER_RATE).sin();
    (scale, (fade * flicker).clamp(0.0, 1.0))
}
