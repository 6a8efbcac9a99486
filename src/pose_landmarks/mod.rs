#[cfg(feature = "movenet")]
pub mod model_movenet;

use std::collections::BTreeMap;

use image::RgbImage;
use nalgebra::Point2;
use serde::Deserialize;

use crate::error::{Result, TryOnError};

/// Body keypoints in COCO order, the layout MoveNet and most single-person
/// pose models emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum BodyLandmark {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl BodyLandmark {
    pub const COUNT: usize = 17;

    pub const ALL: [BodyLandmark; BodyLandmark::COUNT] = [
        BodyLandmark::Nose,
        BodyLandmark::LeftEye,
        BodyLandmark::RightEye,
        BodyLandmark::LeftEar,
        BodyLandmark::RightEar,
        BodyLandmark::LeftShoulder,
        BodyLandmark::RightShoulder,
        BodyLandmark::LeftElbow,
        BodyLandmark::RightElbow,
        BodyLandmark::LeftWrist,
        BodyLandmark::RightWrist,
        BodyLandmark::LeftHip,
        BodyLandmark::RightHip,
        BodyLandmark::LeftKnee,
        BodyLandmark::RightKnee,
        BodyLandmark::LeftAnkle,
        BodyLandmark::RightAnkle,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

fn default_visibility() -> f32 {
    1.0
}

/// How far outside the frame a landmark may sit, in normalized units.
/// Models place occluded limbs slightly off-image; anything further is junk.
pub const COORDINATE_MARGIN: f32 = 1.0;

/// A single landmark in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Landmark {
    /// x in 0.0..=1.0, relative to image width
    pub x: f32,
    /// y in 0.0..=1.0, relative to image height
    pub y: f32,
    #[serde(default = "default_visibility", alias = "score", alias = "confidence")]
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self { x, y, visibility }
    }

    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility >= threshold
    }

    /// Nearest pixel for an image of the given size.
    pub fn to_pixel(&self, width: u32, height: u32) -> Point2<i64> {
        Point2::new(
            (self.x as f64 * width as f64).round() as i64,
            (self.y as f64 * height as f64).round() as i64,
        )
    }

    /// Rejects non-finite values and coordinates beyond
    /// [`COORDINATE_MARGIN`] of the 0..=1 range.
    pub fn validate(&self) -> Result<()> {
        if !(self.x.is_finite() && self.y.is_finite() && self.visibility.is_finite()) {
            return Err(TryOnError::invalid_input(format!(
                "landmark has non-finite values: {self:?}"
            )));
        }
        let range = -COORDINATE_MARGIN..=1.0 + COORDINATE_MARGIN;
        if !range.contains(&self.x) || !range.contains(&self.y) {
            return Err(TryOnError::invalid_input(format!(
                "landmark ({}, {}) is far outside the image",
                self.x, self.y
            )));
        }
        Ok(())
    }
}

/// Landmarks for one detected person, indexed by [`BodyLandmark`].
///
/// Produced once per image and never mutated afterwards. A set may be
/// partial: estimators that skip a point leave its slot empty.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "LandmarkSetRepr")]
pub struct LandmarkSet {
    points: Vec<Option<Landmark>>,
}

impl LandmarkSet {
    /// Builds a set from landmarks listed in [`BodyLandmark`] order.
    pub fn new(points: Vec<Landmark>) -> Result<Self> {
        if points.is_empty() {
            return Err(TryOnError::invalid_input("landmark set is empty"));
        }
        for landmark in &points {
            landmark.validate()?;
        }
        Ok(Self {
            points: points.into_iter().map(Some).collect(),
        })
    }

    pub fn from_named<I>(named: I) -> Result<Self>
    where
        I: IntoIterator<Item = (BodyLandmark, Landmark)>,
    {
        let mut points = vec![None; BodyLandmark::COUNT];
        for (name, landmark) in named {
            landmark.validate()?;
            points[name.index()] = Some(landmark);
        }
        let set = Self { points };
        if set.is_empty() {
            return Err(TryOnError::invalid_input("landmark set is empty"));
        }
        Ok(set)
    }

    pub fn get(&self, landmark: BodyLandmark) -> Option<&Landmark> {
        self.points.get(landmark.index()).and_then(|p| p.as_ref())
    }

    /// Number of slots that hold a landmark.
    pub fn len(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyLandmark, &Landmark)> {
        self.points.iter().enumerate().filter_map(|(i, p)| {
            let name = BodyLandmark::from_index(i)?;
            p.as_ref().map(|lm| (name, lm))
        })
    }

    pub fn average_visibility(&self) -> f32 {
        let count = self.len();
        if count == 0 {
            return 0.0;
        }
        self.iter().map(|(_, lm)| lm.visibility).sum::<f32>() / count as f32
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LandmarkSetRepr {
    List(Vec<Landmark>),
    Named(BTreeMap<BodyLandmark, Landmark>),
}

impl TryFrom<LandmarkSetRepr> for LandmarkSet {
    type Error = TryOnError;

    fn try_from(repr: LandmarkSetRepr) -> Result<Self> {
        match repr {
            LandmarkSetRepr::List(points) => LandmarkSet::new(points),
            LandmarkSetRepr::Named(named) => LandmarkSet::from_named(named),
        }
    }
}

/// External body pose model.
///
/// `Ok(None)` means the model ran but found nobody in the picture.
/// Implementations are built once by the caller and reused across requests.
pub trait PoseEstimator {
    fn detect(&self, image: &RgbImage) -> Result<Option<LandmarkSet>>;
}

impl<T: PoseEstimator + ?Sized> PoseEstimator for Box<T> {
    fn detect(&self, image: &RgbImage) -> Result<Option<LandmarkSet>> {
        (**self).detect(image)
    }
}

/// Estimator that always answers with the same landmarks. Used when the
/// landmarks come from somewhere other than a live model, e.g. a JSON file.
#[derive(Debug, Clone)]
pub struct FixedLandmarks(pub Option<LandmarkSet>);

impl PoseEstimator for FixedLandmarks {
    fn detect(&self, _image: &RgbImage) -> Result<Option<LandmarkSet>> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_landmark_from_index() {
        assert_eq!(BodyLandmark::from_index(0), Some(BodyLandmark::Nose));
        assert_eq!(BodyLandmark::from_index(16), Some(BodyLandmark::RightAnkle));
        assert_eq!(BodyLandmark::from_index(17), None);
        for (i, lm) in BodyLandmark::ALL.iter().enumerate() {
            assert_eq!(lm.index(), i);
        }
    }

    #[test]
    fn landmark_to_pixel_rounds() {
        // normalized f32 products land a hair off whole pixels
        let lm = Landmark::new(0.7, 0.2, 1.0);
        let p = lm.to_pixel(400, 600);
        assert_eq!(p, Point2::new(280, 120));
    }

    #[test]
    fn empty_set_is_rejected() {
        assert!(matches!(
            LandmarkSet::new(vec![]),
            Err(TryOnError::InvalidInput { .. })
        ));
        assert!(matches!(
            LandmarkSet::from_named(Vec::new()),
            Err(TryOnError::InvalidInput { .. })
        ));
    }

    #[test]
    fn non_finite_landmarks_are_rejected() {
        for bad in [
            Landmark::new(f32::NAN, 0.2, 1.0),
            Landmark::new(0.3, f32::INFINITY, 1.0),
            Landmark::new(0.3, 0.2, f32::NAN),
        ] {
            assert!(matches!(
                LandmarkSet::new(vec![bad]),
                Err(TryOnError::InvalidInput { .. })
            ));
            assert!(matches!(
                LandmarkSet::from_named([(BodyLandmark::LeftShoulder, bad)]),
                Err(TryOnError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn far_out_of_range_landmarks_are_rejected() {
        for bad in [
            Landmark::new(3.0e6, 0.2, 1.0),
            Landmark::new(-3.0e6, 0.2, 1.0),
            Landmark::new(1000.0, 0.2, 1.0),
            Landmark::new(0.5, -1.5, 1.0),
        ] {
            assert!(matches!(
                LandmarkSet::new(vec![bad]),
                Err(TryOnError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn slightly_off_image_landmarks_are_kept() {
        let set = LandmarkSet::from_named([
            (BodyLandmark::LeftAnkle, Landmark::new(-0.2, 1.3, 0.4)),
            (BodyLandmark::RightAnkle, Landmark::new(2.0, -1.0, 0.4)),
        ])
        .unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn json_with_huge_coordinate_fails() {
        let json = r#"{"left_shoulder": {"x": 3000000.0, "y": 0.2}}"#;
        assert!(serde_json::from_str::<LandmarkSet>(json).is_err());
    }

    #[test]
    fn short_set_has_no_trailing_points() {
        let set = LandmarkSet::new(vec![Landmark::new(0.5, 0.1, 0.9); 7]).unwrap();
        assert!(set.get(BodyLandmark::RightShoulder).is_some());
        assert!(set.get(BodyLandmark::LeftHip).is_none());
        assert_eq!(set.len(), 7);
    }

    #[test]
    fn parse_list_json() {
        let json = r#"[{"x":0.5,"y":0.1,"visibility":0.8},{"x":0.4,"y":0.1}]"#;
        let set: LandmarkSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(BodyLandmark::Nose).unwrap().visibility, 0.8);
        assert_eq!(set.get(BodyLandmark::LeftEye).unwrap().visibility, 1.0);
    }

    #[test]
    fn parse_named_json() {
        let json = r#"{
            "left_shoulder": {"x": 0.7, "y": 0.2, "score": 0.9},
            "right_shoulder": {"x": 0.3, "y": 0.2}
        }"#;
        let set: LandmarkSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(BodyLandmark::LeftShoulder).unwrap().x, 0.7);
        assert_eq!(set.get(BodyLandmark::LeftShoulder).unwrap().visibility, 0.9);
        assert!(set.get(BodyLandmark::Nose).is_none());
    }

    #[test]
    fn parse_empty_json_fails() {
        assert!(serde_json::from_str::<LandmarkSet>("[]").is_err());
        assert!(serde_json::from_str::<LandmarkSet>("{}").is_err());
    }

    #[test]
    fn average_visibility_ignores_empty_slots() {
        let set = LandmarkSet::from_named([
            (BodyLandmark::LeftHip, Landmark::new(0.4, 0.5, 0.5)),
            (BodyLandmark::RightHip, Landmark::new(0.6, 0.5, 1.0)),
        ])
        .unwrap();
        assert!((set.average_visibility() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn fixed_landmarks_returns_clone() {
        let set = LandmarkSet::new(vec![Landmark::new(0.5, 0.5, 1.0)]).unwrap();
        let estimator = FixedLandmarks(Some(set.clone()));
        let image = RgbImage::new(4, 4);
        assert_eq!(estimator.detect(&image).unwrap(), Some(set));
        assert_eq!(FixedLandmarks(None).detect(&image).unwrap(), None);
    }
}
