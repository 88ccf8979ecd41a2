//! WebGL2 renderer: Phong-shaded meshes with an edge-line overlay

use nalgebra::Vector3;
use stlview_core::scene::PhongMaterial;
use stlview_core::{
    Color, EdgeSegment, Mesh, OrthographicCamera, RenderError, Renderer, Scene, SceneObject,
    Viewport,
};
use wasm_bindgen::JsCast;
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext as Gl, WebGlBuffer, WebGlProgram, WebGlShader,
    WebGlUniformLocation,
};

/// Directional lights beyond this count are ignored by the mesh shader
pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;

const MESH_VERTEX_SHADER: &str = r#"#version 300 es
in vec3 a_position;
in vec3 a_normal;
uniform mat4 u_view;
uniform mat4 u_projection;
out vec3 v_normal;
void main() {
    v_normal = a_normal;
    gl_Position = u_projection * u_view * vec4(a_position, 1.0);
}
"#;

const MESH_FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;
in vec3 v_normal;
uniform vec3 u_color;
uniform vec3 u_specular;
uniform float u_shininess;
uniform vec3 u_ambient;
uniform vec3 u_view_dir;
uniform int u_light_count;
uniform vec3 u_light_dir[4];
uniform vec3 u_light_color[4];
out vec4 frag_color;
void main() {
    vec3 n = normalize(v_normal);
    vec3 color = u_ambient * u_color;
    for (int i = 0; i < 4; i++) {
        if (i >= u_light_count) break;
        float diffuse = max(dot(n, u_light_dir[i]), 0.0);
        if (diffuse <= 0.0) continue;
        vec3 reflected = reflect(-u_light_dir[i], n);
        float highlight = pow(max(dot(reflected, u_view_dir), 0.0), max(u_shininess, 1.0));
        color += u_light_color[i] * (diffuse * u_color + highlight * u_specular);
    }
    frag_color = vec4(clamp(color, 0.0, 1.0), 1.0);
}
"#;

const LINE_VERTEX_SHADER: &str = r#"#version 300 es
in vec3 a_position;
uniform mat4 u_view;
uniform mat4 u_projection;
void main() {
    gl_Position = u_projection * u_view * vec4(a_position, 1.0);
}
"#;

const LINE_FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;
uniform vec3 u_color;
out vec4 frag_color;
void main() {
    frag_color = vec4(u_color, 1.0);
}
"#;

/// Interleaved `position, normal` floats, three vertices per triangle, with
/// each facet's normal recomputed from its winding
pub fn mesh_vertex_data(mesh: &Mesh) -> Vec<f32> {
    let mut data = Vec::with_capacity(mesh.triangles.len() * 18);
    for triangle in &mesh.triangles {
        let normal = triangle.calculate_normal();
        for vertex in &triangle.vertices {
            data.extend_from_slice(&[
                vertex.position.x,
                vertex.position.y,
                vertex.position.z,
                normal.x,
                normal.y,
                normal.z,
            ]);
        }
    }
    data
}

/// Endpoint positions, two vertices per segment
pub fn line_vertex_data(segments: &[EdgeSegment]) -> Vec<f32> {
    segments
        .iter()
        .flat_map(|s| [s.start.x, s.start.y, s.start.z, s.end.x, s.end.y, s.end.z])
        .collect()
}

/// Light uniforms for the mesh shader: ambient color, then direction and
/// color of the first [`MAX_DIRECTIONAL_LIGHTS`] directional lights
pub fn light_uniforms(scene: &Scene) -> ([f32; 3], Vec<f32>, Vec<f32>) {
    let ambient = scene
        .ambient
        .map(|light| light.color.scaled(light.intensity))
        .unwrap_or([0.0; 3]);
    let mut directions = Vec::new();
    let mut colors = Vec::new();
    for light in scene.directional.iter().take(MAX_DIRECTIONAL_LIGHTS) {
        let dir: Vector3<f32> = light.direction();
        directions.extend_from_slice(dir.as_slice());
        colors.extend_from_slice(&light.color.scaled(light.intensity));
    }
    (ambient, directions, colors)
}

fn render_error(context: &str, value: wasm_bindgen::JsValue) -> RenderError {
    RenderError::new(format!("{context}: {value:?}"))
}

fn compile_shader(gl: &Gl, kind: u32, source: &str) -> Result<WebGlShader, RenderError> {
    let shader = gl
        .create_shader(kind)
        .ok_or_else(|| RenderError::new("Unable to create shader object"))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    if gl
        .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(shader)
    } else {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        Err(RenderError::new(format!("Shader compilation failed: {log}")))
    }
}

fn link_program(gl: &Gl, vertex: &str, fragment: &str) -> Result<WebGlProgram, RenderError> {
    let vertex = compile_shader(gl, Gl::VERTEX_SHADER, vertex)?;
    let fragment = compile_shader(gl, Gl::FRAGMENT_SHADER, fragment)?;
    let program = gl
        .create_program()
        .ok_or_else(|| RenderError::new("Unable to create program object"))?;
    gl.attach_shader(&program, &vertex);
    gl.attach_shader(&program, &fragment);
    gl.link_program(&program);
    gl.delete_shader(Some(&vertex));
    gl.delete_shader(Some(&fragment));

    if gl
        .get_program_parameter(&program, Gl::LINK_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(program)
    } else {
        let log = gl.get_program_info_log(&program).unwrap_or_default();
        gl.delete_program(Some(&program));
        Err(RenderError::new(format!("Program link failed: {log}")))
    }
}

enum Batch {
    Mesh {
        buffer: WebGlBuffer,
        vertices: i32,
        material: PhongMaterial,
    },
    Lines {
        buffer: WebGlBuffer,
        vertices: i32,
        color: Color,
    },
}

/// Renderer drawing into a WebGL2 canvas mounted in a viewer container
pub struct WebGlRenderer {
    gl: Gl,
    canvas: HtmlCanvasElement,
    mesh_program: WebGlProgram,
    line_program: WebGlProgram,
    batches: Vec<Batch>,
    uploaded_revision: Option<u64>,
}

impl WebGlRenderer {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, RenderError> {
        let gl = canvas
            .get_context("webgl2")
            .map_err(|err| render_error("Failed to get WebGL2 context", err))?
            .ok_or_else(|| RenderError::new("WebGL2 is not supported"))?
            .dyn_into::<Gl>()
            .map_err(|_| RenderError::new("Context is not WebGL2"))?;

        let mesh_program = link_program(&gl, MESH_VERTEX_SHADER, MESH_FRAGMENT_SHADER)?;
        let line_program = link_program(&gl, LINE_VERTEX_SHADER, LINE_FRAGMENT_SHADER)?;
        gl.enable(Gl::DEPTH_TEST);
        gl.polygon_offset(1.0, 1.0);

        Ok(Self {
            gl,
            canvas,
            mesh_program,
            line_program,
            batches: Vec::new(),
            uploaded_revision: None,
        })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn upload(&mut self, scene: &Scene) -> Result<(), RenderError> {
        for batch in self.batches.drain(..) {
            let buffer = match &batch {
                Batch::Mesh { buffer, .. } | Batch::Lines { buffer, .. } => buffer,
            };
            self.gl.delete_buffer(Some(buffer));
        }

        for object in scene.objects() {
            let batch = match object {
                SceneObject::Mesh { mesh, material } => {
                    let data = mesh_vertex_data(mesh);
                    Batch::Mesh {
                        buffer: self.create_buffer(&data)?,
                        vertices: (data.len() / 6) as i32,
                        material: *material,
                    }
                }
                SceneObject::Lines { segments, material } => {
                    let data = line_vertex_data(segments);
                    Batch::Lines {
                        buffer: self.create_buffer(&data)?,
                        vertices: (data.len() / 3) as i32,
                        color: material.color,
                    }
                }
            };
            self.batches.push(batch);
        }
        self.uploaded_revision = Some(scene.revision());
        log::debug!("Uploaded {} scene objects to the GPU", self.batches.len());
        Ok(())
    }

    fn create_buffer(&self, data: &[f32]) -> Result<WebGlBuffer, RenderError> {
        let buffer = self
            .gl
            .create_buffer()
            .ok_or_else(|| RenderError::new("Unable to create vertex buffer"))?;
        self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&buffer));
        let array = js_sys::Float32Array::from(data);
        self.gl
            .buffer_data_with_array_buffer_view(Gl::ARRAY_BUFFER, &array, Gl::STATIC_DRAW);
        Ok(buffer)
    }

    fn uniform(&self, program: &WebGlProgram, name: &str) -> Option<WebGlUniformLocation> {
        self.gl.get_uniform_location(program, name)
    }

    fn bind_attribute(&self, program: &WebGlProgram, name: &str, size: i32, stride: i32, offset: i32) {
        let location = self.gl.get_attrib_location(program, name);
        if location < 0 {
            return;
        }
        let location = location as u32;
        self.gl.enable_vertex_attrib_array(location);
        self.gl
            .vertex_attrib_pointer_with_i32(location, size, Gl::FLOAT, false, stride, offset);
    }

    fn set_camera(&self, program: &WebGlProgram, camera: &OrthographicCamera) {
        let view = camera.view_matrix();
        self.gl.uniform_matrix4fv_with_f32_array(
            self.uniform(program, "u_view").as_ref(),
            false,
            view.as_slice(),
        );
        self.gl.uniform_matrix4fv_with_f32_array(
            self.uniform(program, "u_projection").as_ref(),
            false,
            camera.projection_matrix().as_slice(),
        );
    }

    fn draw_mesh(&self, scene: &Scene, camera: &OrthographicCamera, buffer: &WebGlBuffer, vertices: i32, material: &PhongMaterial) {
        let gl = &self.gl;
        let program = &self.mesh_program;
        gl.use_program(Some(program));
        self.set_camera(program, camera);

        let (ambient, directions, colors) = light_uniforms(scene);
        let view_dir = camera.view_direction();
        gl.uniform3fv_with_f32_array(self.uniform(program, "u_color").as_ref(), &material.color.rgb());
        gl.uniform3fv_with_f32_array(self.uniform(program, "u_specular").as_ref(), &material.specular.rgb());
        gl.uniform1f(self.uniform(program, "u_shininess").as_ref(), material.shininess);
        gl.uniform3fv_with_f32_array(self.uniform(program, "u_ambient").as_ref(), &ambient);
        gl.uniform3fv_with_f32_array(self.uniform(program, "u_view_dir").as_ref(), view_dir.as_slice());
        gl.uniform1i(self.uniform(program, "u_light_count").as_ref(), (directions.len() / 3) as i32);
        if !directions.is_empty() {
            gl.uniform3fv_with_f32_array(self.uniform(program, "u_light_dir").as_ref(), &directions);
            gl.uniform3fv_with_f32_array(self.uniform(program, "u_light_color").as_ref(), &colors);
        }

        gl.bind_buffer(Gl::ARRAY_BUFFER, Some(buffer));
        self.bind_attribute(program, "a_position", 3, 24, 0);
        self.bind_attribute(program, "a_normal", 3, 24, 12);

        // Push faces back so coplanar edge lines win the depth test
        gl.enable(Gl::POLYGON_OFFSET_FILL);
        gl.draw_arrays(Gl::TRIANGLES, 0, vertices);
        gl.disable(Gl::POLYGON_OFFSET_FILL);
    }

    fn draw_lines(&self, camera: &OrthographicCamera, buffer: &WebGlBuffer, vertices: i32, color: Color) {
        let gl = &self.gl;
        let program = &self.line_program;
        gl.use_program(Some(program));
        self.set_camera(program, camera);
        gl.uniform3fv_with_f32_array(self.uniform(program, "u_color").as_ref(), &color.rgb());

        gl.bind_buffer(Gl::ARRAY_BUFFER, Some(buffer));
        self.bind_attribute(program, "a_position", 3, 12, 0);
        gl.draw_arrays(Gl::LINES, 0, vertices);
    }
}

impl Renderer for WebGlRenderer {
    fn set_clear_color(&mut self, color: Color) {
        let [r, g, b] = color.rgb();
        self.gl.clear_color(r, g, b, 1.0);
    }

    fn set_size(&mut self, viewport: Viewport) {
        self.canvas.set_width(viewport.width);
        self.canvas.set_height(viewport.height);
        self.gl
            .viewport(0, 0, viewport.width as i32, viewport.height as i32);
    }

    fn render(&mut self, scene: &Scene, camera: &OrthographicCamera) -> Result<(), RenderError> {
        if self.gl.is_context_lost() {
            return Err(RenderError::new("WebGL context lost"));
        }
        if self.uploaded_revision != Some(scene.revision()) {
            self.upload(scene)?;
        }

        self.gl.clear(Gl::COLOR_BUFFER_BIT | Gl::DEPTH_BUFFER_BIT);
        for batch in &self.batches {
            match batch {
                Batch::Mesh {
                    buffer,
                    vertices,
                    material,
                } => self.draw_mesh(scene, camera, buffer, *vertices, material),
                Batch::Lines {
                    buffer,
                    vertices,
                    color,
                } => self.draw_lines(camera, buffer, *vertices, *color),
            }
        }
        Ok(())
    }
}
