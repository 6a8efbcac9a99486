use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, TryOnError};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
}

/// How tall an upper-body garment is drawn.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum UpperHeight {
    /// Keep the garment image's own proportions.
    #[default]
    AspectRatio,
    /// Shoulder line to hip line, times `scale`.
    Torso { scale: f32 },
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlacementConfig {
    /// Shirt width as a multiple of shoulder width
    #[serde(default = "default_upper_width_scale")]
    pub upper_width_scale: f32,
    #[serde(default)]
    pub upper_height: UpperHeight,
    /// Pants width as a multiple of hip width
    #[serde(default = "default_lower_width_scale")]
    pub lower_width_scale: f32,
    /// Pants height as a multiple of hip-to-ankle distance
    #[serde(default = "default_lower_height_scale")]
    pub lower_height_scale: f32,
    /// Anchor landmarks below this visibility are treated as missing
    #[serde(default)]
    pub min_visibility: f32,
}

fn default_upper_width_scale() -> f32 {
    1.3
}

fn default_lower_width_scale() -> f32 {
    1.1
}

fn default_lower_height_scale() -> f32 {
    1.05
}

fn default_min_score() -> f32 {
    0.2
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            upper_width_scale: default_upper_width_scale(),
            upper_height: UpperHeight::default(),
            lower_width_scale: default_lower_width_scale(),
            lower_height_scale: default_lower_height_scale(),
            min_visibility: 0.0,
        }
    }
}

impl PlacementConfig {
    pub fn validate(&self) -> Result<()> {
        let mut scales = vec![
            ("upper_width_scale", self.upper_width_scale),
            ("lower_width_scale", self.lower_width_scale),
            ("lower_height_scale", self.lower_height_scale),
        ];
        if let UpperHeight::Torso { scale } = self.upper_height {
            scales.push(("upper_height.scale", scale));
        }

        for (name, value) in scales {
            if !value.is_finite() || value <= 0.0 {
                return Err(TryOnError::Config {
                    message: format!("{name} must be a positive number, got {value}"),
                });
            }
        }

        if !(0.0..=1.0).contains(&self.min_visibility) {
            return Err(TryOnError::Config {
                message: format!(
                    "min_visibility must be within [0, 1], got {}",
                    self.min_visibility
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DetectorConfig {
    /// Mean keypoint score below which the model reports "no person"
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(TryOnError::Config {
                message: format!("min_score must be within [0, 1], got {}", self.min_score),
            });
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| TryOnError::Config {
            message: e.to_string(),
        })?;
        config.placement.validate()?;
        config.detector.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.placement.upper_width_scale, 1.3);
        assert_eq!(config.placement.lower_width_scale, 1.1);
        assert_eq!(config.placement.lower_height_scale, 1.05);
        assert_eq!(config.placement.upper_height, UpperHeight::AspectRatio);
        assert_eq!(config.detector.min_score, 0.2);
    }

    #[test]
    fn torso_mode_parses() {
        let config = Config::from_toml(
            r#"
            [placement]
            upper_width_scale = 1.8
            upper_height = { mode = "torso", scale = 1.2 }
            "#,
        )
        .unwrap();
        assert_eq!(config.placement.upper_width_scale, 1.8);
        assert_eq!(config.placement.upper_height, UpperHeight::Torso { scale: 1.2 });
        assert_eq!(config.placement.lower_width_scale, 1.1);
    }

    #[test]
    fn rejects_non_positive_scale() {
        let err = Config::from_toml("[placement]\nlower_width_scale = 0.0\n").unwrap_err();
        assert!(matches!(err, TryOnError::Config { .. }));

        let err = Config::from_toml(
            "[placement]\nupper_height = { mode = \"torso\", scale = -1.0 }\n",
        )
        .unwrap_err();
        assert!(matches!(err, TryOnError::Config { .. }));
    }

    #[test]
    fn rejects_out_of_range_visibility() {
        let err = Config::from_toml("[placement]\nmin_visibility = 1.5\n").unwrap_err();
        assert!(matches!(err, TryOnError::Config { .. }));
    }

    #[test]
    fn rejects_out_of_range_min_score() {
        let err = Config::from_toml("[detector]\nmin_score = nan\n").unwrap_err();
        assert!(matches!(err, TryOnError::Config { .. }));

        let err = Config::from_toml("[detector]\nmin_score = -0.1\n").unwrap_err();
        assert!(matches!(err, TryOnError::Config { .. }));

        let config = Config::from_toml("[detector]\nmin_score = 1.0\n").unwrap();
        assert_eq!(config.detector.min_score, 1.0);
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = Config::from_toml("[placement\n").unwrap_err();
        assert!(matches!(err, TryOnError::Config { .. }));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[detector]\nmin_score = 0.35").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.detector.min_score, 0.35);
        assert_eq!(config.placement, PlacementConfig::default());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/tryon.toml").unwrap_err();
        assert!(matches!(err, TryOnError::Io(_)));
    }
}
