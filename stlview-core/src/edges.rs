//! Sharp-edge extraction for outline overlays
//!
//! Vertices are welded by position before edges are compared, so meshes
//! decoded from STL (where every facet carries its own copy of each corner)
//! still share edges between neighbouring facets.

use std::collections::HashMap;
use std::f32::consts::PI;

use nalgebra::{Point3, Vector3};

use crate::error::ConfigError;
use crate::geometry::Mesh;

/// Decimal digits kept when welding vertex positions
const PRECISION_POINTS: i32 = 4;

/// Angle between adjacent face normals above which their shared edge is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeThreshold {
    radians: f32,
}

impl EdgeThreshold {
    pub fn from_radians(radians: f32) -> Result<Self, ConfigError> {
        if !(0.0..=PI).contains(&radians) {
            return Err(ConfigError::Invalid {
                field: "edges.threshold_degrees",
                reason: format!("{} rad is outside [0, pi]", radians),
            });
        }
        Ok(Self { radians })
    }

    pub fn from_degrees(degrees: f32) -> Result<Self, ConfigError> {
        if !(0.0..=180.0).contains(&degrees) {
            return Err(ConfigError::Invalid {
                field: "edges.threshold_degrees",
                reason: format!("{} is outside [0, 180]", degrees),
            });
        }
        Self::from_radians(degrees.to_radians().min(PI))
    }

    pub fn radians(&self) -> f32 {
        self.radians
    }
}

impl Default for EdgeThreshold {
    fn default() -> Self {
        Self { radians: PI / 6.0 }
    }
}

/// A line segment of the outline overlay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSegment {
    pub start: Point3<f32>,
    pub end: Point3<f32>,
}

type WeldKey = [i64; 3];

struct EdgeRecord {
    segment: EdgeSegment,
    normal: Vector3<f32>,
}

fn weld_key(p: &Point3<f32>, scale: f32) -> WeldKey {
    [
        (p.x * scale).round() as i64,
        (p.y * scale).round() as i64,
        (p.z * scale).round() as i64,
    ]
}

/// Collect the sharp edges of `mesh`.
///
/// An edge shared by two facets is kept when the dot product of their normals
/// is at most `cos(threshold)`. Edges used by a single facet (open
/// boundaries) are always kept. Degenerate facets are ignored. Pairing relies
/// on neighbours traversing the shared edge in opposite directions, which
/// holds for consistently wound meshes.
pub fn sharp_edges(mesh: &Mesh, threshold: EdgeThreshold) -> Vec<EdgeSegment> {
    let threshold_dot = threshold.radians().cos();
    let scale = 10f32.powi(PRECISION_POINTS);

    let mut segments = Vec::new();
    // Unpaired edges in first-seen order; paired slots become None
    let mut pending: Vec<Option<EdgeRecord>> = Vec::new();
    let mut index: HashMap<(WeldKey, WeldKey), usize> = HashMap::new();

    for triangle in &mesh.triangles {
        let positions = triangle.vertices.map(|v| v.position);
        let keys = positions.map(|p| weld_key(&p, scale));
        if keys[0] == keys[1] || keys[1] == keys[2] || keys[2] == keys[0] {
            continue;
        }
        let normal = triangle.calculate_normal();

        for j in 0..3 {
            let next = (j + 1) % 3;
            let (k0, k1) = (keys[j], keys[next]);

            if let Some(&slot) = index.get(&(k1, k0)) {
                if let Some(record) = pending[slot].take() {
                    if normal.dot(&record.normal) <= threshold_dot {
                        segments.push(EdgeSegment {
                            start: positions[j],
                            end: positions[next],
                        });
                    }
                    continue;
                }
            }

            index.entry((k0, k1)).or_insert_with(|| {
                pending.push(Some(EdgeRecord {
                    segment: EdgeSegment {
                        start: positions[j],
                        end: positions[next],
                    },
                    normal,
                }));
                pending.len() - 1
            });
        }
    }

    segments.extend(pending.into_iter().flatten().map(|record| record.segment));
    segments
}
