use thiserror::Error;

use crate::pose_landmarks::BodyLandmark;

#[derive(Error, Debug)]
pub enum TryOnError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("no person detected")]
    NoPersonDetected,

    #[error("landmark {0:?} is missing or below the visibility threshold")]
    MissingLandmark(BodyLandmark),

    #[error("degenerate placement: {message}")]
    DegeneratePlacement { message: String },

    #[error("image decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {message}")]
    Config { message: String },

    #[cfg(feature = "movenet")]
    #[error("pose inference failed: {0}")]
    Inference(#[from] ort::OrtError),

    #[cfg(feature = "movenet")]
    #[error("unexpected pose model output: {message}")]
    ModelOutput { message: String },
}

impl TryOnError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        TryOnError::InvalidInput {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TryOnError>;
