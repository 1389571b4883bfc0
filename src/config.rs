// src/config.rs
use crate::clip::{SliceAxis, CLIP_EPSILON};
use crate::error::ConfigError;
use crate::highlight::HighlightStyle;
use crate::loader::DEFAULT_MODEL_SCALE;
use crate::scene::{CameraConfig, OrbitControls};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Compressed mesh resource.
    pub asset_path: String,
    /// Directory the host fetches the mesh decoder from.
    pub codec_path: String,
    /// Region metadata feed consumed by the description panel.
    pub region_feed_path: String,
    pub model_scale: f32,
    pub slice_axis: SliceAxis,
    pub clip_epsilon: f32,
    pub highlight: HighlightStyle,
    pub camera: CameraConfig,
    pub orbit: OrbitControls,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_path: "/models/brain-draco.glb".to_string(),
            codec_path: "/draco/".to_string(),
            region_feed_path: "/data/regions.json".to_string(),
            model_scale: DEFAULT_MODEL_SCALE,
            slice_axis: SliceAxis::Z,
            clip_epsilon: CLIP_EPSILON,
            highlight: HighlightStyle::default(),
            camera: CameraConfig::default(),
            orbit: OrbitControls::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.model_scale.is_finite() && self.model_scale > 0.0) {
            return Err(ConfigError::Invalid {
                field: "model_scale",
                message: format!("must be positive, got {}", self.model_scale),
            });
        }
        if !(self.clip_epsilon.is_finite() && self.clip_epsilon >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "clip_epsilon",
                message: format!("must be non-negative, got {}", self.clip_epsilon),
            });
        }
        if self.orbit.min_distance > self.orbit.max_distance {
            return Err(ConfigError::Invalid {
                field: "orbit",
                message: format!(
                    "min_distance {} exceeds max_distance {}",
                    self.orbit.min_distance, self.orbit.max_distance
                ),
            });
        }
        if !(self.camera.vfov > 0.0 && self.camera.vfov < 180.0) {
            return Err(ConfigError::Invalid {
                field: "camera.vfov",
                message: format!("must be within (0, 180), got {}", self.camera.vfov),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = ViewerConfig::from_json("{}").expect("config");
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.model_scale, 6.0);
        assert_eq!(config.slice_axis, SliceAxis::Z);
    }

    #[test]
    fn partial_override() {
        let config =
            ViewerConfig::from_json(r#"{"slice_axis": "x", "highlight": {"amplitude": 0.1}}"#)
                .expect("config");
        assert_eq!(config.slice_axis, SliceAxis::X);
        assert_eq!(config.highlight.amplitude, 0.1);
        assert_eq!(config.highlight.baseline, 0.8);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            ViewerConfig::from_json(r#"{"model_scale": 0}"#),
            Err(ConfigError::Invalid { field: "model_scale", .. })
        ));
        assert!(matches!(
            ViewerConfig::from_json(r#"{"orbit": {"min_distance": 5, "max_distance": 1}}"#),
            Err(ConfigError::Invalid { field: "orbit", .. })
        ));
        assert!(matches!(
            ViewerConfig::from_json(r#"{"slice_axis": "w"}"#),
            Err(ConfigError::Json(_))
        ));
    }
}
