use image::RgbImage;
use log::info;

use crate::compositor::composite;
use crate::config::PlacementConfig;
use crate::error::{Result, TryOnError};
use crate::garment::{Garment, GarmentCategory};
use crate::placement::PlacementCalculator;
use crate::pose_landmarks::{LandmarkSet, PoseEstimator};

/// One person photo in, one dressed photo out.
///
/// Holds the pose estimator for its whole lifetime so a loaded model is
/// reused across requests.
pub struct TryOn<E: PoseEstimator> {
    estimator: E,
    placement: PlacementCalculator,
}

impl<E: PoseEstimator> TryOn<E> {
    pub fn new(estimator: E, config: PlacementConfig) -> Self {
        Self {
            estimator,
            placement: PlacementCalculator::new(config),
        }
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn placement(&self) -> &PlacementCalculator {
        &self.placement
    }

    /// Detects the person and draws the shirt, then the pants.
    pub fn dress(
        &self,
        person: RgbImage,
        upper: Option<&Garment>,
        lower: Option<&Garment>,
    ) -> Result<RgbImage> {
        check_garments(upper, lower)?;

        let landmarks = self
            .estimator
            .detect(&person)?
            .ok_or(TryOnError::NoPersonDetected)?;
        info!("pose detected with {} landmarks", landmarks.len());

        self.apply(person, &landmarks, upper, lower)
    }

    /// Same as [`TryOn::dress`] with landmarks supplied by the caller.
    pub fn dress_with_landmarks(
        &self,
        person: RgbImage,
        landmarks: &LandmarkSet,
        upper: Option<&Garment>,
        lower: Option<&Garment>,
    ) -> Result<RgbImage> {
        check_garments(upper, lower)?;
        self.apply(person, landmarks, upper, lower)
    }

    fn apply(
        &self,
        mut person: RgbImage,
        landmarks: &LandmarkSet,
        upper: Option<&Garment>,
        lower: Option<&Garment>,
    ) -> Result<RgbImage> {
        let (width, height) = person.dimensions();

        for garment in [upper, lower].into_iter().flatten() {
            let rect = self.placement.compute_rect(landmarks, garment, width, height)?;
            let report = composite(&mut person, &garment.image, rect);
            info!(
                "{:?} garment composited into {:?} (clipped: {})",
                garment.category, report.blended, report.clipped
            );
        }

        Ok(person)
    }
}

fn check_garments(upper: Option<&Garment>, lower: Option<&Garment>) -> Result<()> {
    if upper.is_none() && lower.is_none() {
        return Err(TryOnError::invalid_input("no garment supplied"));
    }
    if let Some(g) = upper {
        if g.category != GarmentCategory::Upper {
            return Err(TryOnError::invalid_input("upper slot holds a lower-body garment"));
        }
    }
    if let Some(g) = lower {
        if g.category != GarmentCategory::Lower {
            return Err(TryOnError::invalid_input("lower slot holds an upper-body garment"));
        }
    }
    Ok(())
}
