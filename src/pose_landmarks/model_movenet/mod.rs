use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use image::imageops::FilterType;
use image::RgbImage;
use log::debug;
use ndarray::{Array, ArrayViewD, CowArray, Ix4};
use ort::tensor::OrtOwnedTensor;
use ort::{Environment, GraphOptimizationLevel, Session, SessionBuilder, Value};

use crate::error::{Result, TryOnError};
use crate::pose_landmarks::{BodyLandmark, Landmark, LandmarkSet, PoseEstimator};

pub const MOVENET_INPUT_SIZE: u32 = 192;

/// MoveNet single-pose estimator backed by onnxruntime.
///
/// Expects a model taking a `[1, 192, 192, 3]` f32 tensor (RGB, 0-255) and
/// returning `[1, 1, 17, 3]` as (y, x, score) per keypoint.
pub struct MoveNetEstimator {
    _environment: Arc<Environment>,
    session: Session,
    min_score: f32,
}

impl MoveNetEstimator {
    /// Loads the model once. `min_score` is the mean keypoint score below
    /// which a frame is reported as "no person".
    pub fn new<P: AsRef<Path>>(model_path: P, min_score: f32) -> Result<Self> {
        let environment = Environment::builder()
            .with_name("movenet")
            .build()?
            .into_arc();

        let session = SessionBuilder::new(&environment)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path.as_ref())?;

        Ok(Self {
            _environment: environment,
            session,
            min_score,
        })
    }

    fn preprocess(image: &RgbImage) -> Result<CowArray<'static, f32, ndarray::IxDyn>> {
        // stretch to the model input; normalized outputs map straight back
        let resized = image::imageops::resize(
            image,
            MOVENET_INPUT_SIZE,
            MOVENET_INPUT_SIZE,
            FilterType::Triangle,
        );

        let input: Vec<f32> = resized
            .pixels()
            .flat_map(|p| p.0)
            .map(|v| v as f32)
            .collect();

        let size = MOVENET_INPUT_SIZE as usize;
        let array = Array::from_shape_vec((1, size, size, 3), input)
            .map_err(|e| model_shape(format!("bad MoveNet input shape: {e}")))?;

        Ok(array.into_dyn().into())
    }
}

impl PoseEstimator for MoveNetEstimator {
    fn detect(&self, image: &RgbImage) -> Result<Option<LandmarkSet>> {
        let array = Self::preprocess(image)?;
        let inputs = vec![Value::from_array(self.session.allocator(), &array)?];
        let outputs: Vec<Value> = self.session.run(inputs)?;

        let first = outputs
            .first()
            .ok_or_else(|| model_shape("MoveNet returned no outputs".to_string()))?;
        let output: OrtOwnedTensor<f32, _> = first.try_extract()?;
        let points = decode_keypoints(output.view().deref().clone())?;

        let landmarks = LandmarkSet::new(points)?;
        let score = landmarks.average_visibility();
        debug!("movenet mean keypoint score {score:.3}");

        if score < self.min_score {
            return Ok(None);
        }
        Ok(Some(landmarks))
    }
}

/// Reads a `[1, 1, 17, 3]` (y, x, score) tensor into landmarks.
fn decode_keypoints(output: ArrayViewD<f32>) -> Result<Vec<Landmark>> {
    let output = output
        .into_dimensionality::<Ix4>()
        .map_err(|e| model_shape(format!("bad MoveNet output shape: {e}")))?;
    if output.shape()[..3] != [1, 1, BodyLandmark::COUNT] || output.shape()[3] < 3 {
        return Err(model_shape(format!(
            "bad MoveNet output shape: {:?}",
            output.shape()
        )));
    }

    Ok((0..BodyLandmark::COUNT)
        .map(|i| {
            let y = output[[0, 0, i, 0]];
            let x = output[[0, 0, i, 1]];
            let score = output[[0, 0, i, 2]];
            Landmark::new(x, y, score)
        })
        .collect())
}

fn model_shape(message: String) -> TryOnError {
    TryOnError::ModelOutput { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array4};

    #[test]
    fn decodes_yx_score_triples() {
        let mut raw = Array4::<f32>::zeros((1, 1, BodyLandmark::COUNT, 3));
        raw[[0, 0, BodyLandmark::LeftShoulder.index(), 0]] = 0.2;
        raw[[0, 0, BodyLandmark::LeftShoulder.index(), 1]] = 0.7;
        raw[[0, 0, BodyLandmark::LeftShoulder.index(), 2]] = 0.9;

        let points = decode_keypoints(raw.view().into_dyn()).unwrap();
        assert_eq!(points.len(), BodyLandmark::COUNT);
        assert_eq!(
            points[BodyLandmark::LeftShoulder.index()],
            Landmark::new(0.7, 0.2, 0.9)
        );
    }

    #[test]
    fn wrong_rank_is_a_model_error() {
        let raw = Array2::<f32>::zeros((17, 3));
        let err = decode_keypoints(raw.view().into_dyn()).unwrap_err();
        assert!(matches!(err, TryOnError::ModelOutput { .. }));
    }

    #[test]
    fn too_few_keypoints_is_a_model_error() {
        let raw = Array4::<f32>::zeros((1, 1, 5, 3));
        let err = decode_keypoints(raw.view().into_dyn()).unwrap_err();
        assert!(matches!(err, TryOnError::ModelOutput { .. }));
    }
}
