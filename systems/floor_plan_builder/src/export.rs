//! Raster export of a drawing.

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

use crate::{BuilderError, FloorPlanBuilder, ObjectKind, PixelRect};

/// Fill used for walls.
pub const WALL_COLOR: [u8; 3] = [0x1a, 0x1a, 0x1a];

/// Fill used for doors.
pub const DOOR_COLOR: [u8; 3] = [0x8b, 0x45, 0x13];

const BACKGROUND_COLOR: [u8; 3] = [0xff, 0xff, 0xff];

/// Renders the drawing as a square PNG of `export_size` pixels.
///
/// Grid lines are never part of the export and the result does not depend
/// on the editing canvas resolution.
pub fn export_png(builder: &FloorPlanBuilder, export_size: u32) -> Result<Vec<u8>, BuilderError> {
    let scale = export_size as f32 / builder.space().canvas_size() as f32;
    let mut image = RgbImage::from_pixel(export_size, export_size, Rgb(BACKGROUND_COLOR));

    for object in builder.objects() {
        let color = match object.kind {
            ObjectKind::Wall => WALL_COLOR,
            ObjectKind::Door => DOOR_COLOR,
        };
        fill_rect(&mut image, object.rect, scale, Rgb(color));
    }

    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

fn fill_rect(image: &mut RgbImage, rect: PixelRect, scale: f32, color: Rgb<u8>) {
    let x0 = (rect.x as f32 * scale).floor() as u32;
    let y0 = (rect.y as f32 * scale).floor() as u32;
    let x1 = ((rect.right() as f32 * scale).ceil() as u32).min(image.width());
    let y1 = ((rect.bottom() as f32 * scale).ceil() as u32).min(image.height());
    for y in y0..y1 {
        for x in x0..x1 {
            image.put_pixel(x, y, color);
        }
    }
}
