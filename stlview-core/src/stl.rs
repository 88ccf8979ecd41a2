/// STL decoder for binary and ASCII formats
use nom::{
    bytes::complete::{tag, take},
    character::complete::{multispace0, multispace1, not_line_ending},
    combinator::opt,
    multi::{count, many0, many1},
    number::complete::{float, le_f32, le_u16, le_u32},
    sequence::{preceded, terminated, tuple},
    IResult,
};

use crate::error::StlError;
use crate::geometry::{Mesh, Triangle, Vertex};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, StlError> {
    let triangle_count =
        binary_triangle_count(data).ok_or(StlError::TooSmall(data.len()))?;
    let expected = binary_len(triangle_count).unwrap_or(usize::MAX);
    if data.len() < expected {
        return Err(StlError::Truncated {
            expected,
            actual: data.len(),
        });
    }

    let body = &data[HEADER_LEN + 4..];
    let (_, triangles) = count(binary_facet, triangle_count)(body).map_err(|_| {
        StlError::Truncated {
            expected,
            actual: data.len(),
        }
    })?;

    Ok(Mesh { triangles })
}

fn binary_header(input: &[u8]) -> IResult<&[u8], u32> {
    preceded(take(HEADER_LEN), le_u32)(input)
}

fn binary_triangle_count(data: &[u8]) -> Option<usize> {
    binary_header(data).ok().map(|(_, n)| n as usize)
}

/// Byte length of a binary STL holding `triangle_count` facets
fn binary_len(triangle_count: usize) -> Option<usize> {
    triangle_count
        .checked_mul(FACET_LEN)?
        .checked_add(HEADER_LEN + 4)
}

fn le_vector3(input: &[u8]) -> IResult<&[u8], (f32, f32, f32)> {
    tuple((le_f32, le_f32, le_f32))(input)
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Triangle> {
    let (input, (nx, ny, nz)) = le_vector3(input)?;
    let (input, corners) = count(le_vector3, 3)(input)?;
    // Attribute byte count, unused
    let (input, _) = le_u16(input)?;

    let vertex = |(x, y, z): (f32, f32, f32)| Vertex::new(x, y, z, nx, ny, nz);
    Ok((
        input,
        Triangle::new(vertex(corners[0]), vertex(corners[1]), vertex(corners[2])),
    ))
}

/// Parse an ASCII STL file.
///
/// Several `solid ... endsolid` blocks may follow each other; their facets
/// are merged into one mesh.
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, StlError> {
    match many1(parse_solid)(input) {
        Ok((_, solids)) => {
            let mut mesh = Mesh::with_capacity(solids.iter().map(Vec::len).sum());
            for triangle in solids.into_iter().flatten() {
                mesh.add_triangle(triangle);
            }
            Ok(mesh)
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(StlError::Ascii(format!(
            "unexpected input at byte {} ({:?})",
            input.len() - e.input.len(),
            e.code
        ))),
        Err(nom::Err::Incomplete(_)) => Err(StlError::Ascii("incomplete input".to_string())),
    }
}

fn parse_solid(input: &str) -> IResult<&str, Vec<Triangle>> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    // Optional name up to end of line
    let (input, _) = not_line_ending(input)?;
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _) = terminated(not_line_ending, opt(multispace1))(input)?;
    Ok((input, triangles))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input, normal)?;
    let (input, v2) = parse_vertex(input, normal)?;
    let (input, v3) = parse_vertex(input, normal)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, Triangle::new(v1, v2, v3)))
}

fn parse_vertex(input: &str, normal: (f32, f32, f32)) -> IResult<&str, Vertex> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, (x, y, z)) = parse_vector3(input)?;
    Ok((input, Vertex::new(x, y, z, normal.0, normal.1, normal.2)))
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

/// Whether `data` should be decoded as binary STL.
///
/// A file whose length matches the binary layout exactly is binary even if
/// its header happens to start with `solid`. Otherwise a leading `solid`
/// keyword (after whitespace) marks ASCII.
pub fn is_binary(data: &[u8]) -> bool {
    let expected = binary_triangle_count(data).and_then(binary_len);
    if expected == Some(data.len()) {
        return true;
    }

    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let probe: IResult<&[u8], &[u8]> = tag("solid")(&data[start..]);
    probe.is_err()
}

/// Detect and parse STL file (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh, StlError> {
    let mesh = if is_binary(data) {
        parse_binary_stl(data)?
    } else {
        let text = String::from_utf8_lossy(data);
        parse_ascii_stl(&text)?
    };

    if mesh.is_empty() {
        return Err(StlError::Empty);
    }
    log::debug!("Decoded STL with {} triangles", mesh.triangles.len());
    Ok(mesh)
}

/// Encode a mesh as binary STL
pub fn write_binary_stl(mesh: &Mesh) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + 4 + mesh.triangles.len() * FACET_LEN);
    out.extend_from_slice(&[0u8; HEADER_LEN]);
    out.extend_from_slice(&(mesh.triangles.len() as u32).to_le_bytes());

    for triangle in &mesh.triangles {
        let normal = triangle.vertices[0].normal;
        for value in normal.iter() {
            out.extend_from_slice(&value.to_le_bytes());
        }
        for vertex in &triangle.vertices {
            for value in vertex.position.coords.iter() {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }
    out
}
