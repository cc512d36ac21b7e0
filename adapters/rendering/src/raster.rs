use std::io::Cursor;

use evacsim_core::{CellCoord, GridSpace};
use glam::Vec2;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Pixel, Rgba, RgbaImage};

use crate::{palette, AgentIcon, Color, RenderingBackend, RenderingError, Scene};

/// Longest side of thumbnails attached to saved floor plans.
pub const THUMBNAIL_SIZE: u32 = 64;

/// Draws scenes into an RGBA image of `columns * cs` by `rows * cs` pixels.
///
/// Exit numbers are carried by the scene for text-capable backends; the raster
/// output shows the markers only.
#[derive(Clone, Copy, Debug, Default)]
pub struct RasterRenderer;

#[derive(Clone, Copy)]
enum Shape {
    Square(f32),
    Disc,
    Diamond,
    Triangle,
}

impl From<AgentIcon> for Shape {
    fn from(icon: AgentIcon) -> Self {
        match icon {
            AgentIcon::Person => Self::Disc,
            AgentIcon::Runner => Self::Diamond,
            AgentIcon::Helper => Self::Square(0.8),
            AgentIcon::Elder => Self::Triangle,
        }
    }
}

impl Shape {
    fn covers(self, offset: Vec2) -> bool {
        match self {
            Self::Square(extent) => offset.x.abs() <= extent && offset.y.abs() <= extent,
            Self::Disc => offset.length_squared() <= 1.0,
            Self::Diamond => offset.x.abs() + offset.y.abs() <= 1.0,
            Self::Triangle => offset.y >= -1.0 && offset.x.abs() <= (offset.y + 1.0) / 2.0,
        }
    }
}

impl RasterRenderer {
    /// Draws every layer of the scene in order.
    #[must_use]
    pub fn draw(&self, scene: &Scene) -> RgbaImage {
        let (width, height) = scene.canvas_size();
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba(palette::CANVAS.to_rgba8()));

        if let Some(background) = &scene.background {
            let scaled = imageops::resize(background, width, height, FilterType::Triangle);
            imageops::overlay(&mut canvas, &scaled, 0, 0);
        }

        let space = scene.space;
        for overlay in &scene.overlay {
            paint(&mut canvas, space, overlay.cell, Shape::Square(1.0), overlay.color);
        }
        for exit in &scene.exits {
            let alpha = if exit.emphasized { 0.9 } else { 0.7 };
            paint(&mut canvas, space, exit.cell, Shape::Square(1.0), palette::EXIT.with_alpha(alpha));
        }
        if let Some(cell) = scene.assembly_point {
            paint(&mut canvas, space, cell, Shape::Disc, palette::ASSEMBLY);
        }
        for sprite in &scene.fire {
            paint(
                &mut canvas,
                space,
                sprite.cell,
                Shape::Square(sprite.scale),
                palette::FIRE.with_alpha(sprite.alpha),
            );
        }
        for agent in &scene.agents {
            paint(&mut canvas, space, agent.cell, agent.icon.into(), agent.color());
        }
        if let Some(cell) = scene.hover {
            paint(&mut canvas, space, cell, Shape::Square(1.0), palette::HOVER);
        }

        canvas
    }
}

impl RenderingBackend for RasterRenderer {
    type Output = RgbaImage;

    fn render(&mut self, scene: &Scene) -> Result<RgbaImage, RenderingError> {
        Ok(self.draw(scene))
    }
}

fn paint(canvas: &mut RgbaImage, space: GridSpace, cell: CellCoord, shape: Shape, color: Color) {
    if color.alpha <= 0.0 {
        return;
    }
    let origin = space.cell_origin(cell);
    let center = space.cell_center(cell);
    let half = space.cell_size() as f32 / 2.0;
    let source = Rgba(color.to_rgba8());

    for dy in 0..space.cell_size() {
        for dx in 0..space.cell_size() {
            let x = origin.x as u32 + dx;
            let y = origin.y as u32 + dy;
            if x >= canvas.width() || y >= canvas.height() {
                continue;
            }
            let pixel_center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            if shape.covers((pixel_center - center) / half) {
                canvas.get_pixel_mut(x, y).blend(&source);
            }
        }
    }
}

/// Encodes an image as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RenderingError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(RenderingError::Encode)?;
    Ok(bytes)
}

/// Downscales so the longest side is at most `max_side` and encodes as PNG.
pub fn thumbnail_png(image: &RgbaImage, max_side: u32) -> Result<Vec<u8>, RenderingError> {
    let (width, height) = image.dimensions();
    let longest = width.max(height).max(1);
    if longest <= max_side {
        return encode_png(image);
    }
    let scale = max_side as f32 / longest as f32;
    let target_width = ((width as f32 * scale).round() as u32).max(1);
    let target_height = ((height as f32 * scale).round() as u32).max(1);
    encode_png(&imageops::thumbnail(image, target_width, target_height))
}
