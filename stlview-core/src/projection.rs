/// Orthographic camera and projection utilities
use nalgebra::{Matrix4, Point3, Vector3};

/// Measured size of a viewer container, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height. A collapsed container (zero height) is treated as
    /// square so the view volume stays finite.
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Orthographic camera with an explicit view volume
#[derive(Debug, Clone, PartialEq)]
pub struct OrthographicCamera {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
    /// Magnification applied to the view volume; orbit zoom changes this
    pub zoom: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    projection: Matrix4<f32>,
}

impl OrthographicCamera {
    pub fn new(left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            left,
            right,
            top,
            bottom,
            near,
            far,
            zoom: 1.0,
            position: Point3::new(0.0, 0.0, 1.0),
            target: Point3::origin(),
            up: Vector3::y(),
            projection: Matrix4::identity(),
        };
        camera.update_projection_matrix();
        camera
    }

    /// Camera with a `±half_height·aspect × ±half_height` view volume, placed
    /// at `position` and looking at the origin
    pub fn isometric(
        viewport: Viewport,
        half_height: f32,
        position: Point3<f32>,
        near: f32,
        far: f32,
    ) -> Self {
        let aspect = viewport.aspect();
        let mut camera = Self::new(
            -half_height * aspect,
            half_height * aspect,
            half_height,
            -half_height,
            near,
            far,
        );
        camera.position = position;
        camera.look_at(Point3::origin());
        camera
    }

    pub fn look_at(&mut self, target: Point3<f32>) {
        self.target = target;
    }

    /// Resize the view volume to frame an extent of `max_dimension` at the
    /// given aspect ratio
    pub fn fit_to_extent(&mut self, max_dimension: f32, aspect: f32) {
        self.left = -max_dimension * aspect / 2.0;
        self.right = max_dimension * aspect / 2.0;
        self.top = max_dimension / 2.0;
        self.bottom = -max_dimension / 2.0;
        self.update_projection_matrix();
    }

    /// Recompute the cached projection after changing the view volume or zoom.
    /// A zoom that is not a positive finite number keeps the previous
    /// projection.
    pub fn update_projection_matrix(&mut self) {
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            log::warn!("Ignoring invalid camera zoom {}", self.zoom);
            return;
        }
        let dx = (self.right - self.left) / (2.0 * self.zoom);
        let dy = (self.top - self.bottom) / (2.0 * self.zoom);
        let cx = (self.right + self.left) / 2.0;
        let cy = (self.top + self.bottom) / 2.0;

        self.projection =
            Matrix4::new_orthographic(cx - dx, cx + dx, cy - dy, cy + dy, self.near, self.far);
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    pub fn projection_matrix(&self) -> &Matrix4<f32> {
        &self.projection
    }

    /// Unit vector from the target towards the camera
    pub fn view_direction(&self) -> Vector3<f32> {
        (self.position - self.target)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::z)
    }

    /// Project a world-space point to screen space.
    ///
    /// Returns `(x, y, depth)` with depth in normalized device units (smaller
    /// is closer), or `None` when the point falls outside the view volume.
    pub fn project_to_screen(&self, point: &Point3<f32>, width: u32, height: u32) -> Option<(f32, f32, f32)> {
        let view_projection = self.projection * self.view_matrix();
        let ndc = view_projection.transform_point(point);

        if ndc.x < -1.0 || ndc.x > 1.0 || ndc.y < -1.0 || ndc.y > 1.0 || ndc.z < -1.0 || ndc.z > 1.0 {
            return None;
        }

        let screen_x = (ndc.x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc.y) * 0.5 * height as f32;

        Some((screen_x, screen_y, ndc.z))
    }
}
