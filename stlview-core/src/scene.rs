/// Scene graph: lights, materials and the objects a renderer draws
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::edges::EdgeSegment;
use crate::geometry::Mesh;

/// 24-bit RGB color, written as `0xRRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const WHITE: Color = Color(0xffffff);
    pub const BLACK: Color = Color(0x000000);

    /// Channels scaled to `0.0..=1.0`
    pub fn rgb(&self) -> [f32; 3] {
        [
            ((self.0 >> 16) & 0xff) as f32 / 255.0,
            ((self.0 >> 8) & 0xff) as f32 / 255.0,
            (self.0 & 0xff) as f32 / 255.0,
        ]
    }

    pub fn scaled(&self, intensity: f32) -> [f32; 3] {
        self.rgb().map(|c| c * intensity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

/// Light shining from `position` towards the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    pub position: [f32; 3],
}

impl DirectionalLight {
    /// Unit vector pointing from the lit surface towards the light
    pub fn direction(&self) -> Vector3<f32> {
        let [x, y, z] = self.position;
        Vector3::new(x, y, z)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::y)
    }
}

/// Phong-style shaded surface material
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhongMaterial {
    pub color: Color,
    pub shininess: f32,
    pub specular: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineMaterial {
    pub color: Color,
}

/// Something drawn by the renderer
#[derive(Debug, Clone)]
pub enum SceneObject {
    Mesh { mesh: Mesh, material: PhongMaterial },
    Lines { segments: Vec<EdgeSegment>, material: LineMaterial },
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub background: Color,
    pub ambient: Option<AmbientLight>,
    pub directional: Vec<DirectionalLight>,
    objects: Vec<SceneObject>,
    revision: u64,
}

impl Scene {
    pub fn new(background: Color) -> Self {
        Self {
            background,
            ambient: None,
            directional: Vec::new(),
            objects: Vec::new(),
            revision: 0,
        }
    }

    pub fn add(&mut self, object: SceneObject) {
        self.objects.push(object);
        self.revision += 1;
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Bumped on every `add`; renderers compare it to decide when to
    /// re-upload geometry
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Phong lighting of a surface point with normal `normal`, seen from
    /// direction `view_dir` (both unit vectors pointing away from the surface)
    pub fn illuminate(
        &self,
        normal: &Vector3<f32>,
        view_dir: &Vector3<f32>,
        material: &PhongMaterial,
    ) -> [f32; 3] {
        let base = material.color.rgb();
        let specular = material.specular.rgb();
        let mut out = [0.0f32; 3];

        if let Some(ambient) = &self.ambient {
            let light = ambient.color.scaled(ambient.intensity);
            for i in 0..3 {
                out[i] += light[i] * base[i];
            }
        }

        for light in &self.directional {
            let to_light = light.direction();
            let diffuse = normal.dot(&to_light).max(0.0);
            if diffuse == 0.0 {
                continue;
            }
            let reflected = 2.0 * normal.dot(&to_light) * normal - to_light;
            let highlight = reflected.dot(view_dir).max(0.0).powf(material.shininess.max(1.0));
            let color = light.color.scaled(light.intensity);
            for i in 0..3 {
                out[i] += color[i] * (diffuse * base[i] + highlight * specular[i]);
            }
        }

        out.map(|c| c.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_scene() -> Scene {
        let mut scene = Scene::new(Color(0x2d2d2d));
        scene.ambient = Some(AmbientLight {
            color: Color::WHITE,
            intensity: 0.5,
        });
        scene.directional.push(DirectionalLight {
            color: Color::WHITE,
            intensity: 0.5,
            position: [0.0, 0.0, 50.0],
        });
        scene
    }

    const GREY: PhongMaterial = PhongMaterial {
        color: Color(0xd3d3d3),
        shininess: 50.0,
        specular: Color(0x666666),
    };

    #[test]
    fn test_color_channels() {
        assert_eq!(Color(0xff0080).rgb(), [1.0, 0.0, 128.0 / 255.0]);
    }

    #[test]
    fn test_color_deserializes_from_integer() {
        let color: Color = serde_json::from_str("2960685").unwrap();
        assert_eq!(color, Color(0x2d2d2d));
    }

    #[test]
    fn test_facing_light_is_brighter_than_facing_away() {
        let scene = lit_scene();
        let view = Vector3::z();
        let lit = scene.illuminate(&Vector3::z(), &view, &GREY);
        let unlit = scene.illuminate(&-Vector3::z(), &view, &GREY);

        assert!(lit[0] > unlit[0]);
        // Ambient only
        assert!((unlit[0] - 0.5 * GREY.color.rgb()[0]).abs() < 1e-6);
    }

    #[test]
    fn test_add_bumps_revision() {
        let mut scene = Scene::new(Color::BLACK);
        assert!(scene.is_empty());
        scene.add(SceneObject::Lines {
            segments: Vec::new(),
            material: LineMaterial { color: Color::BLACK },
        });
        assert_eq!(scene.revision(), 1);
        assert_eq!(scene.objects().len(), 1);
    }
}
