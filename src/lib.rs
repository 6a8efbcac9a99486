pub mod compositor;
pub mod config;
pub mod error;
pub mod garment;
pub mod placement;
pub mod pose_landmarks;
pub mod tryon;

pub use compositor::{composite, CompositeReport};
pub use config::{Config, PlacementConfig, UpperHeight};
pub use error::{Result, TryOnError};
pub use garment::{Garment, GarmentCategory};
pub use placement::{PlacementCalculator, Rect};
pub use pose_landmarks::{BodyLandmark, Landmark, LandmarkSet, PoseEstimator};
pub use tryon::TryOn;
