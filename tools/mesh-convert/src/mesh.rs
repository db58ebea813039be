//! Canonical in-memory mesh

use anyhow::{bail, Result};

/// Polygonal surface passed from a decoder to an encoder
///
/// Optional per-vertex attributes, when present, always hold exactly
/// `positions.len()` entries. Use the `set_*` methods to attach them; meshes
/// built by hand are checked with [`Mesh::validate`] before they are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Per-vertex normals
    pub normals: Option<Vec<[f32; 3]>>,
    /// Per-vertex RGBA colors in 0.0..=1.0
    pub colors: Option<Vec<[f32; 4]>>,
    /// Per-vertex texture coordinates
    pub uvs: Option<Vec<[f32; 2]>>,
    /// Polygon index lists
    pub faces: Vec<Vec<u32>>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Attach normals; dropped with a warning on length mismatch
    pub fn set_normals(&mut self, normals: Vec<[f32; 3]>) -> bool {
        self.normals = self.matching("normals", normals);
        self.normals.is_some()
    }

    /// Attach colors; dropped with a warning on length mismatch
    pub fn set_colors(&mut self, colors: Vec<[f32; 4]>) -> bool {
        self.colors = self.matching("colors", colors);
        self.colors.is_some()
    }

    /// Attach texture coordinates; dropped with a warning on length mismatch
    pub fn set_uvs(&mut self, uvs: Vec<[f32; 2]>) -> bool {
        self.uvs = self.matching("texture coordinates", uvs);
        self.uvs.is_some()
    }

    fn matching<T>(&self, attribute: &str, values: Vec<T>) -> Option<Vec<T>> {
        if values.len() == self.positions.len() {
            Some(values)
        } else {
            tracing::warn!(
                "Ignoring {}: {} values for {} vertices",
                attribute,
                values.len(),
                self.positions.len()
            );
            None
        }
    }

    pub fn position(&self, index: u32) -> Option<[f32; 3]> {
        self.positions.get(index as usize).copied()
    }

    /// Fan-triangulate every face (convex polygons), skipping faces with fewer than 3 indices
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.faces.iter().flat_map(|face| {
            (1..face.len().saturating_sub(1)).map(move |i| [face[0], face[i], face[i + 1]])
        })
    }

    /// Check attribute lengths and face indices against the vertex count
    pub fn validate(&self) -> Result<()> {
        let count = self.positions.len();
        let lengths = [
            ("normals", self.normals.as_ref().map(Vec::len)),
            ("colors", self.colors.as_ref().map(Vec::len)),
            ("texture coordinates", self.uvs.as_ref().map(Vec::len)),
        ];
        for (attribute, len) in lengths {
            if let Some(len) = len.filter(|&len| len != count) {
                bail!("Mesh has {} {} for {} vertices", len, attribute, count);
            }
        }
        for (i, face) in self.faces.iter().enumerate() {
            if let Some(&index) = face.iter().find(|&&index| index as usize >= count) {
                bail!(
                    "Face {} references vertex {} outside 0..{}",
                    i,
                    index,
                    count
                );
            }
        }
        Ok(())
    }

    /// Total number of indices across all faces
    pub fn index_count(&self) -> usize {
        self.faces.iter().map(Vec::len).sum()
    }
}

/// Unit normal of a triangle, zero for degenerate triangles
pub fn triangle_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > f32::EPSILON {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0; 3]
    }
}
