use log::debug;
use nalgebra::Point2;

use crate::config::{PlacementConfig, UpperHeight};
use crate::error::{Result, TryOnError};
use crate::garment::{Garment, GarmentCategory};
use crate::pose_landmarks::{BodyLandmark, LandmarkSet};

/// Destination rectangle in base-image pixels.
///
/// The origin may lie outside the image; use [`Rect::clip_to`] before
/// touching pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Intersection with a `width` x `height` image, or `None` when the
    /// rectangle misses it entirely.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Rect> {
        let x0 = (self.x as i64).max(0);
        let y0 = (self.y as i64).max(0);
        let x1 = self.right().min(width as i64);
        let y1 = self.bottom().min(height as i64);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(Rect {
            x: x0 as i32,
            y: y0 as i32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

/// Maps body landmarks to where a garment should be drawn.
#[derive(Debug, Clone, Default)]
pub struct PlacementCalculator {
    config: PlacementConfig,
}

impl PlacementCalculator {
    pub fn new(config: PlacementConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Destination rectangle for `garment` on an image of
    /// `image_width` x `image_height`.
    ///
    /// Upper garments are centered on the shoulder midpoint, lower garments
    /// on the hip midpoint. The result is not clipped.
    pub fn compute_rect(
        &self,
        landmarks: &LandmarkSet,
        garment: &Garment,
        image_width: u32,
        image_height: u32,
    ) -> Result<Rect> {
        if landmarks.is_empty() {
            return Err(TryOnError::invalid_input("landmark set is empty"));
        }
        if image_width == 0 || image_height == 0 {
            return Err(TryOnError::invalid_input("base image has no pixels"));
        }

        let size = (image_width, image_height);
        let rect = match garment.category {
            GarmentCategory::Upper => self.upper_rect(landmarks, garment, size)?,
            GarmentCategory::Lower => self.lower_rect(landmarks, size)?,
        };

        if rect.width == 0 || rect.height == 0 {
            return Err(TryOnError::DegeneratePlacement {
                message: format!("{:?} garment would be {}x{}", garment.category, rect.width, rect.height),
            });
        }

        debug!("{:?} garment placed at {:?}", garment.category, rect);
        Ok(rect)
    }

    fn upper_rect(&self, landmarks: &LandmarkSet, garment: &Garment, size: (u32, u32)) -> Result<Rect> {
        let left = self.pixel(landmarks, BodyLandmark::LeftShoulder, size)?;
        let right = self.pixel(landmarks, BodyLandmark::RightShoulder, size)?;

        let shoulder_width = (left.x - right.x).unsigned_abs();
        let width = scale(shoulder_width as f64, self.config.upper_width_scale);

        let height = match self.config.upper_height {
            UpperHeight::AspectRatio => {
                let (garment_w, garment_h) = garment.dimensions();
                if garment_w == 0 {
                    return Err(TryOnError::DegeneratePlacement {
                        message: "garment image has zero width".to_string(),
                    });
                }
                (width as f64 * garment_h as f64 / garment_w as f64).round() as u64
            }
            UpperHeight::Torso { scale: torso_scale } => {
                let left_hip = self.pixel(landmarks, BodyLandmark::LeftHip, size)?;
                let right_hip = self.pixel(landmarks, BodyLandmark::RightHip, size)?;
                let torso = (line_y(left_hip, right_hip) - line_y(left, right)).abs();
                scale(torso, torso_scale)
            }
        };

        to_rect(
            centered(left, right, width),
            left.y.min(right.y),
            width,
            height,
        )
    }

    fn lower_rect(&self, landmarks: &LandmarkSet, size: (u32, u32)) -> Result<Rect> {
        let left_hip = self.pixel(landmarks, BodyLandmark::LeftHip, size)?;
        let right_hip = self.pixel(landmarks, BodyLandmark::RightHip, size)?;
        let left_ankle = self.pixel(landmarks, BodyLandmark::LeftAnkle, size)?;
        let right_ankle = self.pixel(landmarks, BodyLandmark::RightAnkle, size)?;

        let hip_width = (left_hip.x - right_hip.x).unsigned_abs();
        let width = scale(hip_width as f64, self.config.lower_width_scale);

        let leg = (line_y(left_ankle, right_ankle) - line_y(left_hip, right_hip)).abs();
        let height = scale(leg, self.config.lower_height_scale);

        to_rect(
            centered(left_hip, right_hip, width),
            left_hip.y.min(right_hip.y),
            width,
            height,
        )
    }

    fn pixel(&self, landmarks: &LandmarkSet, name: BodyLandmark, size: (u32, u32)) -> Result<Point2<i64>> {
        match landmarks.get(name) {
            Some(lm) if lm.is_visible(self.config.min_visibility) => Ok(lm.to_pixel(size.0, size.1)),
            _ => Err(TryOnError::MissingLandmark(name)),
        }
    }
}

fn scale(pixels: f64, factor: f32) -> u64 {
    (pixels * factor as f64).round() as u64
}

fn line_y(a: Point2<i64>, b: Point2<i64>) -> f64 {
    (a.y + b.y) as f64 / 2.0
}

/// Left edge of a `width`-wide span centered between `a` and `b`.
fn centered(a: Point2<i64>, b: Point2<i64>, width: u64) -> i64 {
    let mid_x = (a.x + b.x).div_euclid(2);
    mid_x - (width / 2) as i64
}

fn to_rect(x: i64, y: i64, width: u64, height: u64) -> Result<Rect> {
    let out_of_range = || TryOnError::DegeneratePlacement {
        message: format!("rectangle ({x}, {y}, {width}x{height}) does not fit pixel coordinates"),
    };
    Ok(Rect::new(
        i32::try_from(x).map_err(|_| out_of_range())?,
        i32::try_from(y).map_err(|_| out_of_range())?,
        u32::try_from(width).map_err(|_| out_of_range())?,
        u32::try_from(height).map_err(|_| out_of_range())?,
    ))
}
