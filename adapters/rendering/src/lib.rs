#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared grid visualization used by exit placement, setup and replay.
//!
//! Adapters describe what should be on screen with a [`Scene`], assembled by
//! [`SceneBuilder`] in a fixed layer order: background, wall overlay, exits,
//! assembly point, fire, agents and finally the hover highlight. Backends
//! implement [`RenderingBackend`]; [`RasterRenderer`] is the built-in one.

mod fire;
mod raster;

use evacsim_core::{AgentFrame, AgentStatus, CellCode, CellCoord, Grid, GridSpace, GridStats};
use image::RgbaImage;
use thiserror::Error;

pub use fire::{FireAnimator, FIRE_FADE_IN, FIRE_GROW, FIRE_TICK, FLICKER_AMPLITUDE};
pub use raster::{encode_png, thumbnail_png, RasterRenderer, THUMBNAIL_SIZE};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns the same color with a different alpha.
    #[must_use]
    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }

    /// Converts to 8-bit RGBA.
    #[must_use]
    pub fn to_rgba8(self) -> [u8; 4] {
        [self.red, self.green, self.blue, self.alpha].map(|channel| {
            (channel.clamp(0.0, 1.0) * 255.0).round() as u8
        })
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Colors used by every backend.
pub mod palette {
    use super::Color;

    /// Canvas fill under the background image.
    pub const CANVAS: Color = Color::from_rgb_u8(0xff, 0xff, 0xff);
    /// Wall tint drawn over the background.
    pub const WALL_OVERLAY: Color = Color::new(1.0, 0.0, 0.0, 0.25);
    /// Exterior tint drawn over the background.
    pub const EXTERIOR_OVERLAY: Color = Color::new(0.5, 0.5, 0.5, 0.2);
    /// Exit marker.
    pub const EXIT: Color = Color::new(34.0 / 255.0, 197.0 / 255.0, 94.0 / 255.0, 0.7);
    /// Assembly point marker.
    pub const ASSEMBLY: Color = Color::from_rgb_u8(0x3b, 0x82, 0xf6);
    /// Fire marker before alpha animation.
    pub const FIRE: Color = Color::from_rgb_u8(0xf9, 0x73, 0x16);
    /// Agent still evacuating.
    pub const AGENT_ACTIVE: Color = Color::from_rgb_u8(0x25, 0x63, 0xeb);
    /// Agent that escaped.
    pub const AGENT_ESCAPED: Color = Color::from_rgb_u8(0x16, 0xa3, 0x4a);
    /// Agent caught by the fire.
    pub const AGENT_BURNED: Color = Color::from_rgb_u8(0x57, 0x53, 0x4e);
    /// Hover highlight.
    pub const HOVER: Color = Color::new(1.0, 1.0, 0.0, 0.5);
}

/// Errors that can occur when constructing or drawing scenes.
#[derive(Debug, Error)]
pub enum RenderingError {
    /// Background bytes could not be decoded.
    #[error("failed to decode background image: {0}")]
    Background(#[source] image::ImageError),
    /// Output could not be encoded.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

/// Small fixed icon set cycled by agent index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentIcon {
    /// Generic person, drawn as a disc.
    Person,
    /// Runner, drawn as a diamond.
    Runner,
    /// Helper, drawn as a square.
    Helper,
    /// Elder, drawn as a triangle.
    Elder,
}

impl AgentIcon {
    const ALL: [AgentIcon; 4] = [Self::Person, Self::Runner, Self::Helper, Self::Elder];

    /// Icon for the agent at the provided index.
    #[must_use]
    pub const fn for_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }
}

/// Exit marker with its 1-based label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitMarker {
    /// Exit cell.
    pub cell: CellCoord,
    /// Label shown on the marker, starting at 1.
    pub number: usize,
    /// Whether the marker is hovered.
    pub emphasized: bool,
}

/// Animated fire cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FireSprite {
    /// Burning cell.
    pub cell: CellCoord,
    /// Size relative to a full cell, `0.0..=1.0`.
    pub scale: f32,
    /// Opacity, `0.0..=1.0`.
    pub alpha: f32,
}

/// Agent marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentMarker {
    /// Agent cell.
    pub cell: CellCoord,
    /// Icon chosen by agent index.
    pub icon: AgentIcon,
    /// Status used for tinting.
    pub status: AgentStatus,
}

impl AgentMarker {
    /// Tint for the marker's status.
    #[must_use]
    pub const fn color(&self) -> Color {
        match self.status {
            AgentStatus::Escaped => palette::AGENT_ESCAPED,
            AgentStatus::Burned => palette::AGENT_BURNED,
            AgentStatus::Evacuating | AgentStatus::Unknown => palette::AGENT_ACTIVE,
        }
    }
}

/// Tinted overlay cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayCell {
    /// Tinted cell.
    pub cell: CellCoord,
    /// Tint.
    pub color: Color,
}

/// Figures shown next to the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Legend {
    /// Cell counts of the grid.
    pub stats: GridStats,
    /// Exit markers drawn.
    pub exits: usize,
    /// Agent markers drawn.
    pub agents: usize,
    /// Whether any cell is burning.
    pub fire_present: bool,
}

/// Declarative description of one rendered frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Grid width in cells.
    pub columns: u32,
    /// Grid height in cells.
    pub rows: u32,
    /// Shared pixel/cell conversion.
    pub space: GridSpace,
    /// Decoded background, scaled by the backend to the canvas.
    pub background: Option<RgbaImage>,
    /// Wall and exterior tints; empty when the overlay is hidden.
    pub overlay: Vec<OverlayCell>,
    /// Exit markers.
    pub exits: Vec<ExitMarker>,
    /// Assembly point marker.
    pub assembly_point: Option<CellCoord>,
    /// Burning cells.
    pub fire: Vec<FireSprite>,
    /// Agents.
    pub agents: Vec<AgentMarker>,
    /// Hovered cell, only in interactive modes.
    pub hover: Option<CellCoord>,
    /// Figures for the legend.
    pub legend: Legend,
}

impl Scene {
    /// Canvas size in pixels.
    #[must_use]
    pub const fn canvas_size(&self) -> (u32, u32) {
        self.space.canvas_size(self.columns, self.rows)
    }
}

/// Assembles a [`Scene`] layer by layer.
#[derive(Debug)]
pub struct SceneBuilder<'a> {
    grid: &'a Grid,
    scene: Scene,
}

impl<'a> SceneBuilder<'a> {
    /// Starts a scene over the grid.
    #[must_use]
    pub fn new(grid: &'a Grid, space: GridSpace) -> Self {
        Self {
            grid,
            scene: Scene {
                columns: grid.columns(),
                rows: grid.rows(),
                space,
                background: None,
                overlay: Vec::new(),
                exits: Vec::new(),
                assembly_point: None,
                fire: Vec::new(),
                agents: Vec::new(),
                hover: None,
                legend: Legend {
                    stats: grid.stats(),
                    ..Legend::default()
                },
            },
        }
    }

    /// Decodes and attaches the background image.
    pub fn background(mut self, bytes: Option<&[u8]>) -> Result<Self, RenderingError> {
        self.scene.background = bytes
            .map(|bytes| image::load_from_memory(bytes).map(|image| image.to_rgba8()))
            .transpose()
            .map_err(RenderingError::Background)?;
        Ok(self)
    }

    /// Adds the wall and exterior tints when `visible`.
    #[must_use]
    pub fn overlay(mut self, visible: bool) -> Self {
        if !visible {
            self.scene.overlay.clear();
            return self;
        }
        self.scene.overlay = self
            .grid
            .iter()
            .filter_map(|(cell, code)| match code {
                CellCode::Wall => Some(OverlayCell {
                    cell,
                    color: palette::WALL_OVERLAY,
                }),
                CellCode::Exterior => Some(OverlayCell {
                    cell,
                    color: palette::EXTERIOR_OVERLAY,
                }),
                _ => None,
            })
            .collect();
        self
    }

    /// Adds numbered exit markers; `emphasized` is a position in `cells`.
    #[must_use]
    pub fn exits<I>(mut self, cells: I, emphasized: Option<usize>) -> Self
    where
        I: IntoIterator<Item = CellCoord>,
    {
        self.scene.exits = cells
            .into_iter()
            .enumerate()
            .map(|(index, cell)| ExitMarker {
                cell,
                number: index + 1,
                emphasized: emphasized == Some(index),
            })
            .collect();
        self.scene.legend.exits = self.scene.exits.len();
        self
    }

    /// Sets the assembly point marker.
    #[must_use]
    pub fn assembly_point(mut self, cell: Option<CellCoord>) -> Self {
        self.scene.assembly_point = cell;
        self
    }

    /// Adds the animated fire cells.
    #[must_use]
    pub fn fire(mut self, animator: &FireAnimator) -> Self {
        self.scene.fire = animator.sprites();
        self.scene.legend.fire_present = !self.scene.fire.is_empty();
        self
    }

    /// Adds replay agents, cycling icons by index.
    #[must_use]
    pub fn agents(mut self, agents: &[AgentFrame]) -> Self {
        self.scene.agents = agents
            .iter()
            .enumerate()
            .map(|(index, agent)| AgentMarker {
                cell: agent.pos,
                icon: AgentIcon::for_index(index),
                status: agent.status,
            })
            .collect();
        self.scene.legend.agents = self.scene.agents.len();
        self
    }

    /// Adds agent starting cells shown during setup.
    #[must_use]
    pub fn agent_starts(mut self, cells: &[CellCoord]) -> Self {
        self.scene.agents = cells
            .iter()
            .enumerate()
            .map(|(index, cell)| AgentMarker {
                cell: *cell,
                icon: AgentIcon::for_index(index),
                status: AgentStatus::Evacuating,
            })
            .collect();
        self.scene.legend.agents = self.scene.agents.len();
        self
    }

    /// Sets the hover highlight; cells outside the grid are ignored.
    #[must_use]
    pub fn hover(mut self, cell: Option<CellCoord>) -> Self {
        self.scene.hover = cell.filter(|cell| self.grid.contains(*cell));
        self
    }

    /// Finishes the scene.
    #[must_use]
    pub fn build(self) -> Scene {
        self.scene
    }
}

/// Rendering backend capable of presenting scenes.
pub trait RenderingBackend {
    /// Backend-specific output of one frame.
    type Output;

    /// Draws the scene.
    fn render(&mut self, scene: &Scene) -> Result<Self::Output, RenderingError>;
}
