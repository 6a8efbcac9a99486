use std::borrow::Cow;

use image::imageops::FilterType;
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use log::{debug, warn};

use crate::placement::Rect;

/// What a [`composite`] call actually touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeReport {
    /// Blended region of the base image, `None` if the rectangle missed it.
    pub blended: Option<Rect>,
    /// True when part of the garment fell outside the base image.
    pub clipped: bool,
}

/// Resizes `garment` to `rect` and alpha-blends it onto `base` in place.
///
/// Pixels of the resized garment that fall outside `base` are dropped;
/// nothing outside the clipped rectangle is modified.
pub fn composite(base: &mut RgbImage, garment: &RgbaImage, rect: Rect) -> CompositeReport {
    let (base_w, base_h) = base.dimensions();

    let Some(visible) = rect.clip_to(base_w, base_h) else {
        warn!("garment at {:?} lies outside the {}x{} image", rect, base_w, base_h);
        return CompositeReport {
            blended: None,
            clipped: true,
        };
    };

    let resized = resize_garment(garment, rect.width, rect.height);

    // offset of the visible region inside the resized garment
    let off_x = (visible.x as i64 - rect.x as i64) as u32;
    let off_y = (visible.y as i64 - rect.y as i64) as u32;

    for dy in 0..visible.height {
        for dx in 0..visible.width {
            let fg = resized.get_pixel(off_x + dx, off_y + dy);
            let bx = visible.x as u32 + dx;
            let by = visible.y as u32 + dy;
            let bg = base.get_pixel_mut(bx, by);
            *bg = blend(*bg, *fg);
        }
    }

    let clipped = visible != rect;
    if clipped {
        debug!("garment clipped from {:?} to {:?}", rect, visible);
    }

    CompositeReport {
        blended: Some(visible),
        clipped,
    }
}

fn resize_garment(garment: &RgbaImage, width: u32, height: u32) -> Cow<'_, RgbaImage> {
    if garment.dimensions() == (width, height) {
        return Cow::Borrowed(garment);
    }
    debug!(
        "resizing garment {:?} -> {}x{}",
        garment.dimensions(),
        width,
        height
    );
    Cow::Owned(image::imageops::resize(garment, width, height, FilterType::Triangle))
}

/// `a * fg + (1 - a) * bg` per channel, with `a` the foreground alpha in 0..=1.
pub fn blend(bg: Rgb<u8>, fg: Rgba<u8>) -> Rgb<u8> {
    match fg[3] {
        0 => bg,
        255 => Rgb([fg[0], fg[1], fg[2]]),
        a => {
            let alpha = a as f32 / 255.0;
            let mix = |f: u8, b: u8| (alpha * f as f32 + (1.0 - alpha) * b as f32).round() as u8;
            Rgb([mix(fg[0], bg[0]), mix(fg[1], bg[1]), mix(fg[2], bg[2])])
        }
    }
}
