//! VTK PolyData codec (legacy `.vtk` and XML `.vtp`)

use anyhow::{anyhow, bail, Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use vtkio::model::{
    Attribute, Attributes, ByteOrder, DataArray, DataSet, ElementType, IOBuffer, Piece,
    PolyDataPiece, Version, VertexNumbers, Vtk,
};

use super::{chunked, unorm8_to_f32};
use crate::mesh::Mesh;

const TITLE: &str = "written by mesh-convert";

/// Read a legacy VTK file (ASCII or binary) holding a POLYDATA dataset
pub(crate) fn decode_legacy(path: &Path) -> Result<Mesh> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to open VTK: {:?}", path))?;
    let vtk = Vtk::parse_legacy_be(bytes.as_slice())
        .map_err(|e| anyhow!("Failed to parse VTK {:?}: {}", path, e))?;
    mesh_from_vtk(vtk)
}

/// Read an XML PolyData (`.vtp`) file
pub(crate) fn decode_xml(path: &Path) -> Result<Mesh> {
    let file = File::open(path).with_context(|| format!("Failed to open VTP: {:?}", path))?;
    let vtk = Vtk::parse_xml(BufReader::new(file))
        .map_err(|e| anyhow!("Failed to parse VTP {:?}: {}", path, e))?;
    mesh_from_vtk(vtk)
}

/// Write a legacy ASCII VTK POLYDATA file
pub(crate) fn encode_legacy(path: &Path, mesh: &Mesh) -> Result<()> {
    let vtk = vtk_from_mesh(mesh, Version { major: 4, minor: 2 }, legacy_polys(mesh));
    let mut text = String::new();
    vtk.write_legacy_ascii(&mut text)
        .map_err(|e| anyhow!("Failed to encode VTK: {}", e))?;
    std::fs::write(path, text).with_context(|| format!("Failed to write VTK: {:?}", path))?;
    Ok(())
}

/// Write an XML PolyData (`.vtp`) file
pub(crate) fn encode_xml(path: &Path, mesh: &Mesh) -> Result<()> {
    let vtk = vtk_from_mesh(mesh, Version { major: 1, minor: 0 }, xml_polys(mesh));
    let file = File::create(path).with_context(|| format!("Failed to create output: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    vtk.write_xml(&mut writer)
        .map_err(|e| anyhow!("Failed to encode VTP: {}", e))?;
    writer.flush()?;
    Ok(())
}

fn mesh_from_vtk(vtk: Vtk) -> Result<Mesh> {
    let pieces = match vtk.data {
        DataSet::PolyData { pieces, .. } => pieces,
        _ => bail!("VTK dataset is not POLYDATA"),
    };

    let mut mesh = Mesh::new();
    let mut normals = Some(Vec::new());
    let mut colors = Some(Vec::new());
    let mut uvs = Some(Vec::new());

    for piece in pieces {
        let piece = match piece {
            Piece::Inline(piece) => *piece,
            _ => bail!("PolyData pieces stored in external files are not supported"),
        };

        let base = mesh.positions.len() as u32;
        let points = buffer_to_f32(&piece.points).context("Unsupported point coordinate type")?;
        let positions: Vec<[f32; 3]> = chunked(&points);
        let count = positions.len();
        mesh.positions.extend(positions);

        if let Some(polys) = piece.polys {
            for face in cells(polys)? {
                mesh.faces.push(face.into_iter().map(|i| i + base).collect());
            }
        }

        let attributes = PointAttributes::collect(&piece.data.point, count);
        merge(&mut normals, attributes.normals);
        merge(&mut colors, attributes.colors);
        merge(&mut uvs, attributes.uvs);
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

    tracing::debug!(
        "Read VTK PolyData: {} vertices, {} faces",
        mesh.vertex_count(),
        mesh.face_count()
    );

    Ok(mesh)
}

/// An attribute survives only if every piece provides it
fn merge<T>(acc: &mut Option<Vec<T>>, piece: Option<Vec<T>>) {
    *acc = match (acc.take(), piece) {
        (Some(mut all), Some(values)) => {
            all.extend(values);
            Some(all)
        }
        _ => None,
    };
}

/// Point attributes understood by the router
#[derive(Default)]
struct PointAttributes {
    normals: Option<Vec<[f32; 3]>>,
    colors: Option<Vec<[f32; 4]>>,
    uvs: Option<Vec<[f32; 2]>>,
}

impl PointAttributes {
    fn collect(attributes: &[Attribute], count: usize) -> Self {
        let mut out = Self::default();
        for attribute in attributes {
            let Attribute::DataArray(DataArray { name, elem, data, .. }) = attribute else {
                continue;
            };
            let Some(values) = buffer_to_f32(data) else {
                tracing::warn!("Skipping point attribute {:?}: unsupported data type", name);
                continue;
            };
            let is_u8 = matches!(data, IOBuffer::U8(_));

            match elem {
                ElementType::Normals if out.normals.is_none() => {
                    out.normals = Some(chunked(&values)).filter(|v| v.len() == count);
                }
                ElementType::TCoords(2) if out.uvs.is_none() => {
                    out.uvs = Some(chunked(&values)).filter(|v| v.len() == count);
                }
                ElementType::ColorScalars(n) if out.colors.is_none() => {
                    out.colors = colors(&values, *n as usize, is_u8, count);
                }
                ElementType::Scalars { num_comp, .. } if out.colors.is_none() && is_u8 => {
                    out.colors = colors(&values, *num_comp as usize, true, count);
                }
                // XML files carry no color designation, so float colors come back as Generic
                ElementType::Generic(n)
                    if out.colors.is_none() && (is_u8 || is_color_name(name)) =>
                {
                    out.colors = colors(&values, *n as usize, is_u8, count);
                }
                _ => tracing::debug!("Ignoring point attribute {:?}", name),
            }
        }
        out
    }
}

fn is_color_name(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.starts_with("rgb") || name.contains("color") || name.contains("colour")
}

fn colors(values: &[f32], components: usize, is_u8: bool, count: usize) -> Option<Vec<[f32; 4]>> {
    if !(components == 3 || components == 4) || values.len() != components * count {
        return None;
    }
    let scale = |v: f32| if is_u8 { unorm8_to_f32(v as u8) } else { v };
    Some(
        values
            .chunks_exact(components)
            .map(|c| {
                let alpha = if components == 4 { scale(c[3]) } else { 1.0 };
                [scale(c[0]), scale(c[1]), scale(c[2]), alpha]
            })
            .collect(),
    )
}

fn buffer_to_f32(buffer: &IOBuffer) -> Option<Vec<f32>> {
    let values = match buffer {
        IOBuffer::F32(v) => v.clone(),
        IOBuffer::F64(v) => v.iter().map(|&x| x as f32).collect(),
        IOBuffer::U8(v) => v.iter().map(|&x| x as f32).collect(),
        IOBuffer::I8(v) => v.iter().map(|&x| x as f32).collect(),
        IOBuffer::U16(v) => v.iter().map(|&x| x as f32).collect(),
        IOBuffer::I16(v) => v.iter().map(|&x| x as f32).collect(),
        IOBuffer::U32(v) => v.iter().map(|&x| x as f32).collect(),
        IOBuffer::I32(v) => v.iter().map(|&x| x as f32).collect(),
        IOBuffer::U64(v) => v.iter().map(|&x| x as f32).collect(),
        IOBuffer::I64(v) => v.iter().map(|&x| x as f32).collect(),
        _ => return None,
    };
    Some(values)
}

/// Split cell connectivity into polygons
fn cells(numbers: VertexNumbers) -> Result<Vec<Vec<u32>>> {
    match numbers {
        VertexNumbers::Legacy {
            num_cells,
            vertices,
        } => {
            let mut out = Vec::with_capacity(num_cells as usize);
            let mut rest = vertices.as_slice();
            while let Some((&n, tail)) = rest.split_first() {
                let n = n as usize;
                if n > tail.len() {
                    bail!(
                        "Cell {} declares {} points but only {} values remain",
                        out.len(),
                        n,
                        tail.len()
                    );
                }
                out.push(tail[..n].to_vec());
                rest = &tail[n..];
            }
            if out.len() != num_cells as usize {
                bail!("Expected {} cells, found {}", num_cells, out.len());
            }
            Ok(out)
        }
        VertexNumbers::XML {
            connectivity,
            offsets,
        } => {
            let mut out = Vec::with_capacity(offsets.len());
            let mut start = 0usize;
            for end in offsets {
                let end = end as usize;
                if end < start || end > connectivity.len() {
                    bail!(
                        "Cell {} has offset {} outside {}..={}",
                        out.len(),
                        end,
                        start,
                        connectivity.len()
                    );
                }
                let face = connectivity[start..end]
                    .iter()
                    .map(|&i| u32::try_from(i).context("Point index does not fit in 32 bits"))
                    .collect::<Result<Vec<u32>>>()?;
                out.push(face);
                start = end;
            }
            Ok(out)
        }
    }
}

fn legacy_polys(mesh: &Mesh) -> Option<VertexNumbers> {
    if mesh.faces.is_empty() {
        return None;
    }
    let mut vertices = Vec::with_capacity(mesh.faces.len() + mesh.index_count());
    for face in &mesh.faces {
        vertices.push(face.len() as u32);
        vertices.extend_from_slice(face);
    }
    Some(VertexNumbers::Legacy {
        num_cells: mesh.faces.len() as u32,
        vertices,
    })
}

fn xml_polys(mesh: &Mesh) -> Option<VertexNumbers> {
    if mesh.faces.is_empty() {
        return None;
    }
    let mut connectivity = Vec::with_capacity(mesh.index_count());
    let mut offsets = Vec::with_capacity(mesh.faces.len());
    for face in &mesh.faces {
        connectivity.extend(face.iter().map(|&i| i as u64));
        offsets.push(connectivity.len() as u64);
    }
    Some(VertexNumbers::XML {
        connectivity,
        offsets,
    })
}

fn vtk_from_mesh(mesh: &Mesh, version: Version, polys: Option<VertexNumbers>) -> Vtk {
    let mut point = Vec::new();
    if let Some(normals) = &mesh.normals {
        point.push(Attribute::DataArray(DataArray {
            name: "Normals".to_string(),
            elem: ElementType::Normals,
            data: IOBuffer::F32(normals.iter().flatten().copied().collect()),
        }));
    }
    if let Some(colors) = &mesh.colors {
        point.push(Attribute::DataArray(DataArray {
            name: "RGBA".to_string(),
            elem: ElementType::ColorScalars(4),
            data: IOBuffer::F32(colors.iter().flatten().copied().collect()),
        }));
    }
    if let Some(uvs) = &mesh.uvs {
        point.push(Attribute::DataArray(DataArray {
            name: "TCoords".to_string(),
            elem: ElementType::TCoords(2),
            data: IOBuffer::F32(uvs.iter().flatten().copied().collect()),
        }));
    }

    let piece = PolyDataPiece {
        points: IOBuffer::F32(mesh.positions.iter().flatten().copied().collect()),
        verts: None,
        lines: None,
        polys,
        strips: None,
        data: Attributes {
            point,
            cell: Vec::new(),
        },
    };

    Vtk {
        version,
        title: TITLE.to_string(),
        byte_order: ByteOrder::BigEndian,
        file_path: None,
        data: DataSet::PolyData {
            meta: None,
            pieces: vec![Piece::Inline(Box::new(piece))],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::{attributed_quad, tetrahedron};
    use tempfile::tempdir;

    #[test]
    fn test_legacy_round_trip() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("tetra.vtk");

        encode_legacy(&path, &tetrahedron()).expect("Failed to write VTK");
        let text = std::fs::read_to_string(&path).expect("Failed to read VTK text");
        assert!(text.starts_with("# vtk DataFile Version"));
        assert!(text.contains("POLYDATA"));

        let mesh = decode_legacy(&path).expect("Failed to read VTK");
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces, tetrahedron().faces);
    }

    #[test]
    fn test_legacy_round_trip_normals() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("quad.vtk");

        let source = attributed_quad();

        encode_legacy(&path, &source).expect("Failed to write VTK");
        let mesh = decode_legacy(&path).expect("Failed to read VTK");

        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.faces[0], vec![0, 1, 2, 3]);
        assert_eq!(mesh.normals, source.normals);
        assert_eq!(mesh.colors, source.colors);
        assert_eq!(mesh.uvs, source.uvs);
    }

    #[test]
    fn test_xml_round_trip() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("quad.vtp");

        let source = attributed_quad();

        encode_xml(&path, &source).expect("Failed to write VTP");
        let mesh = decode_xml(&path).expect("Failed to read VTP");

        assert_eq!(mesh.positions, source.positions);
        assert_eq!(mesh.faces, vec![vec![0, 1, 2, 3]]);
        assert_eq!(mesh.colors, source.colors);
    }

    #[test]
    fn test_decode_ascii_legacy_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("square.vtk");
        std::fs::write(
            &path,
            "# vtk DataFile Version 4.2\n\
             square\n\
             ASCII\n\
             DATASET POLYDATA\n\
             POINTS 4 float\n\
             0 0 0 1 0 0 1 1 0 0 1 0\n\
             POLYGONS 2 8\n\
             3 0 1 2\n\
             3 0 2 3\n",
        )
        .unwrap();

        let mesh = decode_legacy(&path).expect("Failed to read VTK");
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces, vec![vec![0, 1, 2], vec![0, 2, 3]]);
    }

    #[test]
    fn test_cells_split() {
        let legacy = VertexNumbers::Legacy {
            num_cells: 2,
            vertices: vec![3, 0, 1, 2, 4, 0, 2, 3, 4],
        };
        assert_eq!(cells(legacy).unwrap(), vec![vec![0, 1, 2], vec![0, 2, 3, 4]]);

        let xml = VertexNumbers::XML {
            connectivity: vec![0, 1, 2, 0, 2, 3],
            offsets: vec![3, 6],
        };
        assert_eq!(cells(xml).unwrap(), vec![vec![0, 1, 2], vec![0, 2, 3]]);
    }

    #[test]
    fn test_cells_malformed_rejected() {
        // Second cell claims 5 points, only 3 follow
        let short = VertexNumbers::Legacy {
            num_cells: 2,
            vertices: vec![3, 0, 1, 2, 5, 0, 2, 3],
        };
        assert!(cells(short).is_err());

        let miscounted = VertexNumbers::Legacy {
            num_cells: 3,
            vertices: vec![3, 0, 1, 2],
        };
        assert!(cells(miscounted).is_err());

        let decreasing = VertexNumbers::XML {
            connectivity: vec![0, 1, 2, 0, 2, 3],
            offsets: vec![3, 2],
        };
        assert!(cells(decreasing).is_err());

        let past_end = VertexNumbers::XML {
            connectivity: vec![0, 1, 2],
            offsets: vec![3, 6],
        };
        assert!(cells(past_end).is_err());
    }

    #[test]
    fn test_decode_truncated_polygons() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("short.vtk");
        std::fs::write(
            &path,
            "# vtk DataFile Version 4.2\n\
             short\n\
             ASCII\n\
             DATASET POLYDATA\n\
             POINTS 4 float\n\
             0 0 0 1 0 0 1 1 0 0 1 0\n\
             POLYGONS 2 8\n\
             3 0 1 2\n\
             6 0 2 3\n",
        )
        .unwrap();

        assert!(decode_legacy(&path).is_err());
    }

    #[test]
    fn test_decode_non_polydata_rejected() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("grid.vtk");
        std::fs::write(
            &path,
            "# vtk DataFile Version 4.2\n\
             grid\n\
             ASCII\n\
             DATASET STRUCTURED_POINTS\n\
             DIMENSIONS 2 2 2\n\
             ORIGIN 0 0 0\n\
             SPACING 1 1 1\n",
        )
        .unwrap();
        assert!(decode_legacy(&path).is_err());
    }
}
