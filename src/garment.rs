use std::path::Path;

use image::{RgbImage, RgbaImage};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GarmentCategory {
    /// Shirts, anchored on the shoulders
    Upper,
    /// Pants, anchored on the hips
    Lower,
}

/// A transparent-background clothing image.
#[derive(Debug, Clone)]
pub struct Garment {
    pub category: GarmentCategory,
    pub image: RgbaImage,
}

impl Garment {
    pub fn new(category: GarmentCategory, image: RgbaImage) -> Self {
        Self { category, image }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

pub fn load_person_image(bytes: &[u8]) -> Result<RgbImage> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

pub fn load_garment_image(bytes: &[u8], category: GarmentCategory) -> Result<Garment> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    Ok(Garment::new(category, image))
}

pub fn open_person_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    Ok(image::open(path)?.to_rgb8())
}

pub fn open_garment_image<P: AsRef<Path>>(path: P, category: GarmentCategory) -> Result<Garment> {
    let image = image::open(path)?.to_rgba8();
    Ok(Garment::new(category, image))
}
