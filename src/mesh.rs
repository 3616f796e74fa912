use anyhow::{anyhow, Result};
use glam::{Vec2, Vec3};

pub const FLOATS_PER_POSITION: usize = 3;
pub const FLOATS_PER_NORMAL: usize = 3;
pub const FLOATS_PER_UV: usize = 2;
pub const FLOATS_PER_VERTEX: usize = FLOATS_PER_POSITION + FLOATS_PER_NORMAL + FLOATS_PER_UV;

/// Bytes between consecutive vertices in the GPU buffer.
pub const VERTEX_STRIDE: u64 = (FLOATS_PER_VERTEX * std::mem::size_of::<f32>()) as u64;

/// Non-indexed triangle list with interleaved vertices.
///
/// Each vertex is `position.xyz`, `normal.xyz`, `uv.xy`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    vertices: Vec<f32>,
}

/// One vertex unpacked from the interleaved buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Mesh {
    /// Wraps interleaved floats, rejecting buffers that do not hold whole triangles.
    pub fn from_interleaved(vertices: Vec<f32>) -> Result<Self> {
        if vertices.is_empty() {
            return Err(anyhow!("mesh does not define any vertices"));
        }
        if vertices.len() % FLOATS_PER_VERTEX != 0 {
            return Err(anyhow!(
                "vertex data holds {} floats, which is not a multiple of {FLOATS_PER_VERTEX}",
                vertices.len()
            ));
        }
        if (vertices.len() / FLOATS_PER_VERTEX) % 3 != 0 {
            return Err(anyhow!("vertex count is not a multiple of 3"));
        }
        Ok(Self { vertices })
    }

    /// Square-based pyramid: two base triangles and four sides, flat normals.
    pub fn pyramid() -> Self {
        Self {
            vertices: PYRAMID_VERTICES.to_vec(),
        }
    }

    pub fn vertex_count(&self) -> u32 {
        (self.vertices.len() / FLOATS_PER_VERTEX) as u32
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn vertex(&self, index: usize) -> Option<Vertex> {
        let start = index * FLOATS_PER_VERTEX;
        let chunk = self.vertices.get(start..start + FLOATS_PER_VERTEX)?;
        Some(Vertex {
            position: Vec3::from_slice(&chunk[0..3]),
            normal: Vec3::from_slice(&chunk[3..6]),
            uv: Vec2::from_slice(&chunk[6..8]),
        })
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vertex; 3]> + '_ {
        (0..self.vertex_count() as usize / 3).filter_map(move |tri| {
            Some([
                self.vertex(tri * 3)?,
                self.vertex(tri * 3 + 1)?,
                self.vertex(tri * 3 + 2)?,
            ])
        })
    }
}

#[rustfmt::skip]
const PYRAMID_VERTICES: &[f32] = &[
    // position          // normal           // uv
    -1.0, 0.0, -1.0,     0.0, -1.0, 0.0,     0.0, 0.0, // base
    -1.0, 0.0,  1.0,     0.0, -1.0, 0.0,     0.0, 1.0,
     1.0, 0.0,  1.0,     0.0, -1.0, 0.0,     1.0, 1.0,

     1.0, 0.0,  1.0,     0.0, -1.0, 0.0,     1.0, 1.0,
     1.0, 0.0, -1.0,     0.0, -1.0, 0.0,     1.0, 0.0,
    -1.0, 0.0, -1.0,     0.0, -1.0, 0.0,     0.0, 0.0,

    -1.0, 0.0, -1.0,    -1.0,  0.0, 0.0,     0.0, 0.0, // left
    -1.0, 0.0,  1.0,    -1.0,  0.0, 0.0,     1.0, 0.0,
     0.0, 1.0,  0.0,    -1.0,  0.0, 0.0,     0.5, 1.0,

    -1.0, 0.0, -1.0,     0.0,  0.0, -1.0,    0.0, 0.0, // back
     1.0, 0.0, -1.0,     0.0,  0.0, -1.0,    1.0, 0.0,
     0.0, 1.0,  0.0,     0.0,  0.0, -1.0,    0.5, 1.0,

     1.0, 0.0,  1.0,     1.0,  0.0, 0.0,     0.0, 0.0, // right
     1.0, 0.0, -1.0,     1.0,  0.0, 0.0,     1.0, 0.0,
     0.0, 1.0,  0.0,     1.0,  0.0, 0.0,     0.5, 1.0,

    -1.0, 0.0,  1.0,     0.0,  0.0, 1.0,     0.0, 0.0, // front
     1.0, 0.0,  1.0,     0.0,  0.0, 1.0,     1.0, 0.0,
     0.0, 1.0,  0.0,     0.0,  0.0, 1.0,     0.5, 1.0,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pyramid_has_eighteen_vertices() {
        let mesh = Mesh::pyramid();
        assert_eq!(mesh.vertices().len(), 18 * FLOATS_PER_VERTEX);
        assert_eq!(mesh.vertex_count(), 18);
        assert_eq!(mesh.triangles().count(), 6);
    }

    #[test]
    fn vertex_count_is_float_count_over_eight() {
        let mesh = Mesh::from_interleaved(vec![0.0; 18 * 8]).unwrap();
        assert_eq!(mesh.vertex_count(), 18);
    }

    #[test]
    fn rejects_partial_vertices() {
        assert!(Mesh::from_interleaved(vec![0.0; 8 * 3 + 5]).is_err());
        assert!(Mesh::from_interleaved(vec![0.0; 8 * 4]).is_err());
        assert!(Mesh::from_interleaved(Vec::new()).is_err());
    }

    #[test]
    fn unpacks_interleaved_attributes() {
        let mesh = Mesh::pyramid();
        let apex = mesh.vertex(8).unwrap();
        assert_eq!(apex.position, Vec3::Y);
        assert_eq!(apex.normal, Vec3::NEG_X);
        assert_eq!(apex.uv, Vec2::new(0.5, 1.0));
        assert!(mesh.vertex(18).is_none());
    }

    #[test]
    fn stride_is_thirty_two_bytes() {
        assert_eq!(VERTEX_STRIDE, 32);
    }
}
