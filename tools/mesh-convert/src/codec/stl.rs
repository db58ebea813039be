//! STL codec

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::mesh::{triangle_normal, Mesh};

/// Read an ASCII or binary STL file
///
/// Identical corner positions are merged by the reader, so the result is an
/// indexed triangle mesh. Facet normals are not kept (they are per face, not per vertex).
pub(crate) fn decode(path: &Path) -> Result<Mesh> {
    let mut file = File::open(path).with_context(|| format!("Failed to open STL: {:?}", path))?;
    let stl = stl_io::read_stl(&mut file).with_context(|| format!("Failed to parse STL: {:?}", path))?;

    let mut mesh = Mesh::new();
    mesh.positions = stl
        .vertices
        .iter()
        .map(|v| [v[0], v[1], v[2]])
        .collect();
    mesh.faces = stl
        .faces
        .iter()
        .map(|f| f.vertices.iter().map(|&i| i as u32).collect())
        .collect();

    tracing::debug!(
        "Read STL: {} unique vertices, {} facets",
        mesh.vertex_count(),
        mesh.face_count()
    );

    Ok(mesh)
}

/// Write a binary STL file
///
/// Polygons are fan-triangulated and facet normals are computed from the geometry.
pub(crate) fn encode(path: &Path, mesh: &Mesh) -> Result<()> {
    let mut triangles = Vec::with_capacity(mesh.index_count());
    for tri in mesh.triangles() {
        let (Some(a), Some(b), Some(c)) = (
            mesh.position(tri[0]),
            mesh.position(tri[1]),
            mesh.position(tri[2]),
        ) else {
            bail!(
                "Triangle {:?} references a vertex outside 0..{}",
                tri,
                mesh.vertex_count()
            );
        };
        triangles.push(stl_io::Triangle {
            normal: stl_io::Normal::new(triangle_normal(a, b, c)),
            vertices: [
                stl_io::Vertex::new(a),
                stl_io::Vertex::new(b),
                stl_io::Vertex::new(c),
            ],
        });
    }

    if triangles.len() < mesh.face_count() {
        tracing::warn!(
            "Dropped {} faces with fewer than 3 vertices",
            mesh.faces.iter().filter(|f| f.len() < 3).count()
        );
    }

    let file = File::create(path).with_context(|| format!("Failed to create output: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    stl_io::write_stl(&mut writer, triangles.iter())
        .with_context(|| format!("Failed to write STL: {:?}", path))?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::{attributed_quad, tetrahedron};
    use tempfile::tempdir;

    #[test]
    fn test_round_trip_preserves_counts() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("tetra.stl");

        encode(&path, &tetrahedron()).expect("Failed to write STL");
        // 80-byte header + u32 count + 50 bytes per facet
        let size = std::fs::metadata(&path).unwrap().len();
        assert_eq!(size, 84 + 4 * 50);

        let mesh = decode(&path).expect("Failed to read STL");
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 4);
    }

    #[test]
    fn test_quad_is_triangulated() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("quad.stl");

        encode(&path, &attributed_quad()).expect("Failed to write STL");
        let mesh = decode(&path).expect("Failed to read STL");

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        assert!(mesh.normals.is_none());
        assert!(mesh.colors.is_none());
    }

    #[test]
    fn test_decode_ascii() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("tri.stl");
        std::fs::write(
            &path,
            "solid tri\n\
             facet normal 0 0 1\n\
             outer loop\n\
             vertex 0 0 0\n\
             vertex 1 0 0\n\
             vertex 0 1 0\n\
             endloop\n\
             endfacet\n\
             endsolid tri\n",
        )
        .unwrap();

        let mesh = decode(&path).expect("Failed to read STL");
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    fn test_encode_out_of_range_index() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut mesh = tetrahedron();
        mesh.faces.push(vec![0, 1, 9]);
        assert!(encode(&dir.path().join("bad.stl"), &mesh).is_err());
    }
}
