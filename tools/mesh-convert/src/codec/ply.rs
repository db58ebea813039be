//! Stanford PLY codec

use anyhow::{anyhow, bail, Context, Result};
use ply_rs_bw::parser::Parser;
use ply_rs_bw::ply::{
    DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType, ScalarType,
};
use ply_rs_bw::writer::Writer;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use super::{f32_to_unorm8, unorm8_to_f32};
use crate::mesh::Mesh;

/// Read an ASCII or binary PLY file
///
/// The `vertex` element must carry `x`, `y`, `z`. Normals (`nx/ny/nz`), colors
/// (`red/green/blue[/alpha]`) and texture coordinates (`u/v`, `s/t` or
/// `texture_u/texture_v`) are picked up when every vertex has them. A file without a
/// `face` element decodes as a point set.
pub(crate) fn decode(path: &Path) -> Result<Mesh> {
    let file = File::open(path).with_context(|| format!("Failed to open PLY: {:?}", path))?;
    let mut reader = BufReader::new(file);
    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .with_context(|| format!("Failed to parse PLY: {:?}", path))?;

    let vertices = ply
        .payload
        .get("vertex")
        .context("PLY file has no vertex element")?;

    let mut mesh = Mesh::new();
    let mut normals = Vec::with_capacity(vertices.len());
    let mut colors = Vec::with_capacity(vertices.len());
    let mut uvs = Vec::with_capacity(vertices.len());

    for (i, v) in vertices.iter().enumerate() {
        let position = scalar3(v, ["x", "y", "z"])
            .with_context(|| format!("Vertex {} is missing x/y/z", i))?;
        mesh.positions.push(position);

        if let Some(n) = scalar3(v, ["nx", "ny", "nz"]) {
            normals.push(n);
        }
        if let Some(c) = color(v) {
            colors.push(c);
        }
        let uv = scalar2(v, ["u", "v"])
            .or_else(|| scalar2(v, ["s", "t"]))
            .or_else(|| scalar2(v, ["texture_u", "texture_v"]));
        if let Some(uv) = uv {
            uvs.push(uv);
        }
    }

    if !normals.is_empty() {
        mesh.set_normals(normals);
    }
    if !colors.is_empty() {
        mesh.set_colors(colors);
    }
    if !uvs.is_empty() {
        mesh.set_uvs(uvs);
    }

    if let Some(faces) = ply.payload.get("face") {
        for (i, face) in faces.iter().enumerate() {
            let indices = face
                .get("vertex_indices")
                .or_else(|| face.get("vertex_index"))
                .with_context(|| format!("Face {} has no vertex_indices list", i))?;
            let indices =
                index_list(indices).with_context(|| format!("Face {} has invalid indices", i))?;
            mesh.faces.push(indices);
        }
    }

    tracing::debug!(
        "Read PLY: {} vertices, {} faces",
        mesh.vertex_count(),
        mesh.face_count()
    );

    Ok(mesh)
}

/// Write an ASCII PLY file
///
/// The binary writer of `ply-rs-bw` prefixes every list with the element count
/// instead of the list length, so faces are only written correctly as ASCII.
pub(crate) fn encode(path: &Path, mesh: &Mesh) -> Result<()> {
    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;
    ply.header
        .comments
        .push("written by mesh-convert".to_string());

    let mut vertex_def = ElementDef::new("vertex".to_string());
    let mut add_scalar = |name: &str, scalar: ScalarType| {
        vertex_def.properties.insert(
            name.to_string(),
            PropertyDef::new(name.to_string(), PropertyType::Scalar(scalar)),
        );
    };
    for name in ["x", "y", "z"] {
        add_scalar(name, ScalarType::Float);
    }
    if mesh.normals.is_some() {
        for name in ["nx", "ny", "nz"] {
            add_scalar(name, ScalarType::Float);
        }
    }
    if mesh.colors.is_some() {
        for name in ["red", "green", "blue", "alpha"] {
            add_scalar(name, ScalarType::UChar);
        }
    }
    if mesh.uvs.is_some() {
        for name in ["u", "v"] {
            add_scalar(name, ScalarType::Float);
        }
    }
    ply.header.elements.insert("vertex".to_string(), vertex_def);

    let mut vertices = Vec::with_capacity(mesh.vertex_count());
    for (i, p) in mesh.positions.iter().enumerate() {
        let mut element = DefaultElement::new();
        element.insert("x".to_string(), Property::Float(p[0]));
        element.insert("y".to_string(), Property::Float(p[1]));
        element.insert("z".to_string(), Property::Float(p[2]));
        if let Some(normals) = &mesh.normals {
            let n = normals[i];
            element.insert("nx".to_string(), Property::Float(n[0]));
            element.insert("ny".to_string(), Property::Float(n[1]));
            element.insert("nz".to_string(), Property::Float(n[2]));
        }
        if let Some(colors) = &mesh.colors {
            let c = colors[i];
            element.insert("red".to_string(), Property::UChar(f32_to_unorm8(c[0])));
            element.insert("green".to_string(), Property::UChar(f32_to_unorm8(c[1])));
            element.insert("blue".to_string(), Property::UChar(f32_to_unorm8(c[2])));
            element.insert("alpha".to_string(), Property::UChar(f32_to_unorm8(c[3])));
        }
        if let Some(uvs) = &mesh.uvs {
            element.insert("u".to_string(), Property::Float(uvs[i][0]));
            element.insert("v".to_string(), Property::Float(uvs[i][1]));
        }
        vertices.push(element);
    }
    ply.payload.insert("vertex".to_string(), vertices);

    let mut face_def = ElementDef::new("face".to_string());
    face_def.properties.insert(
        "vertex_indices".to_string(),
        PropertyDef::new(
            "vertex_indices".to_string(),
            PropertyType::List(ScalarType::UChar, ScalarType::UInt),
        ),
    );
    ply.header.elements.insert("face".to_string(), face_def);

    let mut faces = Vec::with_capacity(mesh.face_count());
    for (i, face) in mesh.faces.iter().enumerate() {
        if face.len() > u8::MAX as usize {
            bail!("Face {} has {} indices (PLY lists hold at most 255)", i, face.len());
        }
        let mut element = DefaultElement::new();
        element.insert("vertex_indices".to_string(), Property::ListUInt(face.clone()));
        faces.push(element);
    }
    ply.payload.insert("face".to_string(), faces);

    ply.make_consistent()
        .map_err(|e| anyhow!("Inconsistent PLY document: {:?}", e))?;

    let file = File::create(path).with_context(|| format!("Failed to create output: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    Writer::<DefaultElement>::new()
        .write_ply(&mut writer, &mut ply)
        .with_context(|| format!("Failed to write PLY: {:?}", path))?;
    writer.flush()?;

    Ok(())
}

fn scalar(element: &DefaultElement, name: &str) -> Option<f32> {
    match element.get(name)? {
        Property::Float(v) => Some(*v),
        Property::Double(v) => Some(*v as f32),
        Property::Int(v) => Some(*v as f32),
        Property::UInt(v) => Some(*v as f32),
        Property::Short(v) => Some(*v as f32),
        Property::UShort(v) => Some(*v as f32),
        Property::Char(v) => Some(*v as f32),
        Property::UChar(v) => Some(*v as f32),
        _ => None,
    }
}

fn scalar2(element: &DefaultElement, names: [&str; 2]) -> Option<[f32; 2]> {
    Some([scalar(element, names[0])?, scalar(element, names[1])?])
}

fn scalar3(element: &DefaultElement, names: [&str; 3]) -> Option<[f32; 3]> {
    Some([
        scalar(element, names[0])?,
        scalar(element, names[1])?,
        scalar(element, names[2])?,
    ])
}

/// Integer channels are 0..=255, float channels are already normalized
fn channel(element: &DefaultElement, name: &str) -> Option<f32> {
    match element.get(name)? {
        Property::UChar(v) => Some(unorm8_to_f32(*v)),
        Property::Float(v) => Some(*v),
        Property::Double(v) => Some(*v as f32),
        _ => scalar(element, name).map(|v| v / 255.0),
    }
}

fn color(element: &DefaultElement) -> Option<[f32; 4]> {
    let r = channel(element, "red").or_else(|| channel(element, "diffuse_red"))?;
    let g = channel(element, "green").or_else(|| channel(element, "diffuse_green"))?;
    let b = channel(element, "blue").or_else(|| channel(element, "diffuse_blue"))?;
    let a = channel(element, "alpha").unwrap_or(1.0);
    Some([r, g, b, a])
}

fn index_list(prop: &Property) -> Option<Vec<u32>> {
    fn signed<T: Copy + TryInto<u32>>(v: &[T]) -> Option<Vec<u32>> {
        v.iter().map(|&x| x.try_into().ok()).collect()
    }
    match prop {
        Property::ListUInt(v) => Some(v.clone()),
        Property::ListInt(v) => signed(v.as_slice()),
        Property::ListUShort(v) => Some(v.iter().map(|&x| x as u32).collect()),
        Property::ListShort(v) => signed(v.as_slice()),
        Property::ListUChar(v) => Some(v.iter().map(|&x| x as u32).collect()),
        Property::ListChar(v) => signed(v.as_slice()),
        _ => None,
    }
}
