/// ASCII rasterizer for terminal rendering
use crossterm::{
    cursor,
    style::{Color as TermColor, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::Vector3;
use std::io::Write;
use stlview_core::scene::PhongMaterial;
use stlview_core::{
    Color, EdgeSegment, OrthographicCamera, RenderError, Renderer, Scene, SceneObject, Triangle,
    Viewport,
};

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

const EDGE_CHAR: char = '#';

/// Pulls outline segments in front of the faces they lie on
const EDGE_DEPTH_BIAS: f32 = 1e-3;

/// Terminal cells are roughly twice as tall as they are wide, so a viewport
/// of `rows * 2` pixels keeps the model's proportions.
pub fn terminal_viewport(columns: u16, rows: u16) -> Viewport {
    Viewport::new(u32::from(columns), u32::from(rows) * 2)
}

/// One drawn character and its color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub rgb: [u8; 3],
}

/// Renderer that rasterizes a scene into a grid of colored characters
#[derive(Debug)]
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    cells: Vec<Option<Cell>>,
    clear_color: Color,
}

impl AsciiRenderer {
    pub fn new(viewport: Viewport) -> Self {
        let mut renderer = Self {
            width: 0,
            height: 0,
            depth_buffer: Vec::new(),
            cells: Vec::new(),
            clear_color: Color::BLACK,
        };
        renderer.set_size(viewport);
        renderer
    }

    /// Grid size in character cells
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Drawn cell at `(x, y)`, `None` for background
    pub fn cell(&self, x: usize, y: usize) -> Option<Cell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells[y * self.width + x]
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.cells.fill(None);
    }

    fn render_triangle(
        &mut self,
        triangle: &Triangle,
        scene: &Scene,
        camera: &OrthographicCamera,
        material: &PhongMaterial,
    ) {
        let normal = triangle.calculate_normal();
        let view_dir = camera.view_direction();
        // Back faces and degenerate facets are not drawn
        if normal.dot(&view_dir) <= 0.0 {
            return;
        }

        let mut coords = [(0.0, 0.0, 0.0); 3];
        for (slot, vertex) in coords.iter_mut().zip(&triangle.vertices) {
            match camera.project_to_screen(&vertex.position, self.width as u32, self.height as u32) {
                Some(projected) => *slot = projected,
                None => return, // Triangle is clipped
            }
        }

        let rgb = scene.illuminate(&normal, &view_dir, material);
        let cell = Cell {
            ch: shade_char(&rgb),
            rgb: to_bytes(rgb),
        };
        self.rasterize_triangle(&coords, cell);
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], cell: Cell) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box, clipped to the grid
        let min_x = (v0.0.min(v1.0).min(v2.0).floor() as i32).max(0);
        let max_x = (v0.0.max(v1.0).max(v2.0).ceil() as i32).min(self.width as i32 - 1);
        let min_y = (v0.1.min(v1.1).min(v2.1).floor() as i32).max(0);
        let max_y = (v0.1.max(v1.1).max(v2.1).ceil() as i32).min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                if let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                        self.plot(x, y, depth, cell);
                    }
                }
            }
        }
    }

    fn render_segment(&mut self, segment: &EdgeSegment, camera: &OrthographicCamera, cell: Cell) {
        let (w, h) = (self.width as u32, self.height as u32);
        let (Some(a), Some(b)) = (
            camera.project_to_screen(&segment.start, w, h),
            camera.project_to_screen(&segment.end, w, h),
        ) else {
            return;
        };

        // Bresenham over cell coordinates, interpolating depth along the way
        let (mut x, mut y) = (a.0.floor() as i32, a.1.floor() as i32);
        let (x1, y1) = (b.0.floor() as i32, b.1.floor() as i32);
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let steps = dx.max(-dy).max(1) as f32;
        let mut err = dx + dy;
        let mut step = 0.0;

        loop {
            let depth = a.2 + (b.2 - a.2) * (step / steps) - EDGE_DEPTH_BIAS;
            self.plot(x, y, depth, cell);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
            step += 1.0;
        }
    }

    fn plot(&mut self, x: i32, y: i32, depth: f32, cell: Cell) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        if depth < self.depth_buffer[idx] {
            self.depth_buffer[idx] = depth;
            self.cells[idx] = Some(cell);
        }
    }

    /// Queue the grid at the top-left of the terminal
    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let [r, g, b] = to_bytes(self.clear_color.rgb());
        writer.queue(SetBackgroundColor(TermColor::Rgb { r, g, b }))?;

        let mut current = None;
        for y in 0..self.height {
            writer.queue(cursor::MoveTo(0, y as u16))?;
            for x in 0..self.width {
                let (ch, rgb) = match self.cells[y * self.width + x] {
                    Some(cell) => (cell.ch, cell.rgb),
                    None => (' ', [r, g, b]),
                };
                if current != Some(rgb) {
                    let [r, g, b] = rgb;
                    writer.queue(SetForegroundColor(TermColor::Rgb { r, g, b }))?;
                    current = Some(rgb);
                }
                writer.queue(Print(ch))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl Renderer for AsciiRenderer {
    fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    fn set_size(&mut self, viewport: Viewport) {
        self.width = viewport.width as usize;
        self.height = viewport.height.div_ceil(2) as usize;
        let size = self.width * self.height;
        self.depth_buffer = vec![f32::INFINITY; size];
        self.cells = vec![None; size];
    }

    fn render(&mut self, scene: &Scene, camera: &OrthographicCamera) -> Result<(), RenderError> {
        self.clear();
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }

        for object in scene.objects() {
            match object {
                SceneObject::Mesh { mesh, material } => {
                    for triangle in &mesh.triangles {
                        self.render_triangle(triangle, scene, camera, material);
                    }
                }
                SceneObject::Lines { segments, material } => {
                    let cell = Cell {
                        ch: EDGE_CHAR,
                        rgb: to_bytes(material.color.rgb()),
                    };
                    for segment in segments {
                        self.render_segment(segment, camera, cell);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Ramp character for a lit color, by perceived luminance
fn shade_char(rgb: &[f32; 3]) -> char {
    let luminance = Vector3::new(0.2126, 0.7152, 0.0722).dot(&Vector3::from(*rgb));
    let index = (luminance.clamp(0.0, 1.0) * (LUMINOSITY_RAMP.len() - 1) as f32).round() as usize;
    LUMINOSITY_RAMP[index.min(LUMINOSITY_RAMP.len() - 1)]
}

fn to_bytes(rgb: [f32; 3]) -> [u8; 3] {
    rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use stlview_core::edges::sharp_edges;
    use stlview_core::scene::{AmbientLight, LineMaterial};
    use stlview_core::{EdgeThreshold, Mesh};

    fn camera(viewport: Viewport) -> OrthographicCamera {
        let mut camera =
            OrthographicCamera::isometric(viewport, 50.0, Point3::new(100.0, 100.0, 100.0), 0.1, 1000.0);
        camera.fit_to_extent(4.0, viewport.aspect());
        camera
    }

    fn cube_scene() -> Scene {
        let mut scene = Scene::new(Color(0x2d2d2d));
        scene.ambient = Some(AmbientLight {
            color: Color::WHITE,
            intensity: 0.5,
        });
        let mesh = Mesh::cube(2.0);
        let segments = sharp_edges(&mesh, EdgeThreshold::default());
        scene.add(SceneObject::Mesh {
            mesh,
            material: PhongMaterial {
                color: Color(0xd3d3d3),
                shininess: 50.0,
                specular: Color(0x666666),
            },
        });
        scene.add(SceneObject::Lines {
            segments,
            material: LineMaterial { color: Color::BLACK },
        });
        scene
    }

    fn drawn_cells(renderer: &AsciiRenderer) -> Vec<Cell> {
        let (w, h) = renderer.size();
        (0..h)
            .flat_map(|y| (0..w).map(move |x| (x, y)))
            .filter_map(|(x, y)| renderer.cell(x, y))
            .collect()
    }

    #[test]
    fn test_terminal_viewport_doubles_rows() {
        let viewport = terminal_viewport(80, 24);
        assert_eq!(viewport, Viewport::new(80, 48));

        let renderer = AsciiRenderer::new(viewport);
        assert_eq!(renderer.size(), (80, 24));
    }

    #[test]
    fn test_empty_scene_draws_nothing() {
        let viewport = terminal_viewport(40, 20);
        let mut renderer = AsciiRenderer::new(viewport);
        renderer
            .render(&Scene::new(Color::BLACK), &camera(viewport))
            .unwrap();
        assert!(drawn_cells(&renderer).is_empty());
    }

    #[test]
    fn test_cube_is_shaded_and_outlined() {
        let viewport = terminal_viewport(60, 30);
        let mut renderer = AsciiRenderer::new(viewport);
        renderer.render(&cube_scene(), &camera(viewport)).unwrap();

        let cells = drawn_cells(&renderer);
        assert!(!cells.is_empty());
        assert!(cells.iter().any(|c| c.ch == EDGE_CHAR && c.rgb == [0, 0, 0]));
        assert!(cells.iter().any(|c| c.rgb != [0, 0, 0]));

        // The model sits in the middle of the grid
        assert!(renderer.cell(30, 15).is_some());
        assert!(renderer.cell(0, 0).is_none());
    }

    #[test]
    fn test_render_clears_previous_frame() {
        let viewport = terminal_viewport(40, 20);
        let mut renderer = AsciiRenderer::new(viewport);
        renderer.render(&cube_scene(), &camera(viewport)).unwrap();
        renderer
            .render(&Scene::new(Color::BLACK), &camera(viewport))
            .unwrap();
        assert!(drawn_cells(&renderer).is_empty());
    }

    #[test]
    fn test_shade_char_follows_brightness() {
        assert_eq!(shade_char(&[0.0, 0.0, 0.0]), '.');
        assert_eq!(shade_char(&[1.0, 1.0, 1.0]), '@');
    }

    #[test]
    fn test_draw_writes_every_cell() {
        let viewport = terminal_viewport(8, 2);
        let renderer = AsciiRenderer::new(viewport);
        let mut out = Vec::new();
        renderer.draw(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches(' ').count(), 16);
    }

    #[test]
    fn test_barycentric_inside_and_degenerate() {
        let (w0, w1, w2) = barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (1.0, 1.0)).unwrap();
        assert!(w0 > 0.0 && w1 > 0.0 && w2 > 0.0);
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (1.0, 1.0)).is_none());
    }
}
