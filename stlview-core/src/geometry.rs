/// Geometry primitives for decoded STL meshes
use nalgebra::{Point3, Vector3};

/// A 3D vertex with position and facet normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            normal: Vector3::new(nx, ny, nz),
        }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Calculate the face normal from the triangle's vertices.
    ///
    /// Degenerate triangles yield a zero vector instead of NaNs.
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1
            .cross(&edge2)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Normal used for shading: the stored facet normal, or the computed one
    /// when the file left it zeroed.
    pub fn shading_normal(&self) -> Vector3<f32> {
        let stored = self.vertices[0].normal;
        if stored.norm_squared() > f32::EPSILON {
            stored.normalize()
        } else {
            self.calculate_normal()
        }
    }
}

/// Axis-aligned box containing every vertex of a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Smallest box containing all `points`, or `None` when there are none
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f32>>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let bounds = iter.fold(Self::new(first, first), |mut bounds, p| {
            bounds.min = bounds.min.inf(p);
            bounds.max = bounds.max.sup(p);
            bounds
        });
        Some(bounds)
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Largest of the three extents
    pub fn max_dimension(&self) -> f32 {
        self.size().max()
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = &Point3<f32>> {
        self.triangles
            .iter()
            .flat_map(|t| t.vertices.iter().map(|v| &v.position))
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.positions())
    }

    /// Move every vertex by `offset`
    pub fn translate(&mut self, offset: &Vector3<f32>) {
        for triangle in &mut self.triangles {
            for vertex in &mut triangle.vertices {
                vertex.position += *offset;
            }
        }
    }

    /// Translate the mesh so its bounding box is centered at the origin.
    ///
    /// Returns the applied offset (the negated midpoint), or `None` for an
    /// empty mesh.
    pub fn center(&mut self) -> Option<Vector3<f32>> {
        let offset = -self.bounding_box()?.center().coords;
        self.translate(&offset);
        Some(offset)
    }

    /// Axis-aligned cube centered at the origin, outward-facing and
    /// consistently wound
    pub fn cube(size: f32) -> Self {
        let half = size / 2.0;
        let (x, y, z) = (Vector3::x(), Vector3::y(), Vector3::z());
        // (normal, u, v) with u x v == normal
        let faces = [(z, x, y), (-z, y, x), (y, z, x), (-y, x, z), (x, y, z), (-x, z, y)];

        let mut mesh = Self::with_capacity(12);
        for (n, u, v) in faces {
            let corner = |su: f32, sv: f32| {
                let p = (n + u * su + v * sv) * half;
                Vertex::new(p.x, p.y, p.z, n.x, n.y, n.z)
            };
            let (a, b, c, d) = (corner(-1.0, -1.0), corner(1.0, -1.0), corner(1.0, 1.0), corner(-1.0, 1.0));
            mesh.add_triangle(Triangle::new(a, b, c));
            mesh.add_triangle(Triangle::new(a, c, d));
        }
        mesh
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}
