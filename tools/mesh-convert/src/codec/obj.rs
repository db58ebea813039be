//! Wavefront OBJ codec

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::chunked;
use crate::mesh::Mesh;

/// Read an OBJ file, merging every object/group into one mesh
///
/// Position, texture and normal indices are unified so each output vertex carries
/// its own attributes. Polygons are kept as-is (no triangulation); points and lines
/// are skipped. Missing or broken material libraries are ignored.
pub(crate) fn decode(path: &Path) -> Result<Mesh> {
    let options = tobj::LoadOptions {
        single_index: true,
        triangulate: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    };
    let (models, materials) =
        tobj::load_obj(path, &options).with_context(|| format!("Failed to load OBJ: {:?}", path))?;
    if let Err(e) = materials {
        tracing::debug!("Ignoring OBJ materials: {}", e);
    }

    let mut mesh = Mesh::new();
    let mut normals = Some(Vec::new());
    let mut colors = Some(Vec::new());
    let mut uvs = Some(Vec::new());

    for model in &models {
        let m = &model.mesh;
        let base = mesh.positions.len() as u32;
        let positions: Vec<[f32; 3]> = chunked(&m.positions);
        let count = positions.len();
        mesh.positions.extend(positions);

        let n: Vec<[f32; 3]> = chunked(&m.normals);
        extend_if_complete(&mut normals, n, count);
        let c: Vec<[f32; 4]> = chunked::<3>(&m.vertex_color)
            .into_iter()
            .map(|[r, g, b]| [r, g, b, 1.0])
            .collect();
        extend_if_complete(&mut colors, c, count);
        let t: Vec<[f32; 2]> = chunked(&m.texcoords);
        extend_if_complete(&mut uvs, t, count);

        let mut start = 0usize;
        let mut push_face = |arity: usize| {
            let end = (start + arity).min(m.indices.len());
            mesh.faces
                .push(m.indices[start..end].iter().map(|&i| i + base).collect());
            start = end;
        };
        if m.face_arities.is_empty() {
            for _ in 0..m.indices.len() / 3 {
                push_face(3);
            }
        } else {
            for &arity in &m.face_arities {
                push_face(arity as usize);
            }
        }

        tracing::debug!(
            "OBJ object {:?}: {} vertices, {} indices",
            model.name,
            count,
            m.indices.len()
        );
    }

    if let Some(normals) = normals.filter(|n| !n.is_empty()) {
        mesh.set_normals(normals);
    }
    if let Some(colors) = colors.filter(|c| !c.is_empty()) {
        mesh.set_colors(colors);
    }
    if let Some(uvs) = uvs.filter(|u| !u.is_empty()) {
        mesh.set_uvs(uvs);
    }

    Ok(mesh)
}

/// An attribute survives only if every object provides it for all its vertices
fn extend_if_complete<T>(acc: &mut Option<Vec<T>>, values: Vec<T>, count: usize) {
    *acc = match acc.take() {
        Some(mut all) if values.len() == count => {
            all.extend(values);
            Some(all)
        }
        _ => None,
    };
}

/// Write a text OBJ file
///
/// Vertex colors use the common `v x y z r g b` extension. Faces reference the
/// same index for position, texture coordinate and normal.
pub(crate) fn encode(path: &Path, mesh: &Mesh) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create output: {:?}", path))?;
    let mut w = BufWriter::new(file);

    writeln!(w, "# written by mesh-convert")?;
    writeln!(
        w,
        "# {} vertices, {} faces",
        mesh.vertex_count(),
        mesh.face_count()
    )?;

    for (i, p) in mesh.positions.iter().enumerate() {
        match &mesh.colors {
            Some(colors) => {
                let c = colors[i];
                writeln!(w, "v {} {} {} {} {} {}", p[0], p[1], p[2], c[0], c[1], c[2])?;
            }
            None => writeln!(w, "v {} {} {}", p[0], p[1], p[2])?,
        }
    }
    if let Some(uvs) = &mesh.uvs {
        for uv in uvs {
            writeln!(w, "vt {} {}", uv[0], uv[1])?;
        }
    }
    if let Some(normals) = &mesh.normals {
        for n in normals {
            writeln!(w, "vn {} {} {}", n[0], n[1], n[2])?;
        }
    }

    let has_uvs = mesh.uvs.is_some();
    let has_normals = mesh.normals.is_some();
    for face in &mesh.faces {
        write!(w, "f")?;
        for &i in face {
            // OBJ indices are 1-based
            let i = i as u64 + 1;
            match (has_uvs, has_normals) {
                (true, true) => write!(w, " {i}/{i}/{i}")?,
                (true, false) => write!(w, " {i}/{i}")?,
                (false, true) => write!(w, " {i}//{i}")?,
                (false, false) => write!(w, " {i}")?,
            }
        }
        writeln!(w)?;
    }

    w.flush()?;
    Ok(())
}
