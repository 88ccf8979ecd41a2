//! Viewer configuration
//!
//! Every knob has the default the viewers have always used, so an empty JSON
//! object (or no configuration at all) yields the stock look.

use serde::{Deserialize, Serialize};

use crate::edges::EdgeThreshold;
use crate::error::ConfigError;
use crate::scene::{AmbientLight, Color, DirectionalLight, LineMaterial, PhongMaterial};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Class marking viewer containers in the page
    pub container_class: String,
    /// Attribute holding the model URL
    pub source_attribute: String,
    /// Prefix for generated container ids
    pub id_prefix: String,
    pub background: Color,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    pub material: PhongMaterial,
    pub edges: EdgeConfig,
    pub controls: ControlsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    /// Half the height of the view volume before a model is fitted
    pub half_height: f32,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient: AmbientLight,
    pub directional: Vec<DirectionalLight>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    pub color: Color,
    /// Facets meeting at more than this angle get an outline
    pub threshold_degrees: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub enable_rotate: bool,
    pub enable_zoom: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            container_class: "stl-viewer".to_string(),
            source_attribute: "data-src".to_string(),
            id_prefix: "stl-viewer-".to_string(),
            background: Color(0x2d2d2d),
            camera: CameraConfig::default(),
            lighting: LightingConfig::default(),
            material: PhongMaterial {
                color: Color(0xd3d3d3),
                shininess: 50.0,
                specular: Color(0x666666),
            },
            edges: EdgeConfig::default(),
            controls: ControlsConfig::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [100.0, 100.0, 100.0],
            half_height: 50.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        let soft = |position| DirectionalLight {
            color: Color::WHITE,
            intensity: 0.5,
            position,
        };
        Self {
            ambient: AmbientLight {
                color: Color::WHITE,
                intensity: 0.5,
            },
            // Opposing pair so no side of the model is left in shadow
            directional: vec![soft([50.0, 50.0, 50.0]), soft([-50.0, -50.0, -50.0])],
        }
    }
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            threshold_degrees: 30.0,
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_rotate: true,
            enable_zoom: true,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        }
    }
}

impl ViewerConfig {
    /// Parse and validate a JSON document; missing keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };

        if self.container_class.trim().is_empty() {
            return invalid("container_class", "must not be empty");
        }
        if self.source_attribute.trim().is_empty() {
            return invalid("source_attribute", "must not be empty");
        }
        if !(self.camera.half_height > 0.0) {
            return invalid("camera.half_height", "must be positive");
        }
        if !(self.camera.near < self.camera.far) {
            return invalid("camera.near", "must be less than camera.far");
        }
        if self.controls.rotate_speed < 0.0 || self.controls.zoom_speed < 0.0 {
            return invalid("controls", "speeds must not be negative");
        }
        self.edge_threshold().map(|_| ())
    }

    pub fn edge_threshold(&self) -> Result<EdgeThreshold, ConfigError> {
        EdgeThreshold::from_degrees(self.edges.threshold_degrees)
    }

    pub fn line_material(&self) -> LineMaterial {
        LineMaterial {
            color: self.edges.color,
        }
    }
}
