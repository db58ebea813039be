//! Format-specific decoders and encoders
//!
//! Each submodule adapts one codec crate to the canonical [`Mesh`]:
//! - `ply` - Stanford PLY via `ply-rs-bw`
//! - `vtk` - legacy VTK and XML VTP PolyData via `vtkio`
//! - `obj` - Wavefront OBJ via `tobj` (read) and a text writer
//! - `stl` - STL via `stl_io`

mod obj;
mod ply;
mod stl;
mod vtk;

use anyhow::{bail, Result};
use std::path::Path;

use crate::format::FormatKind;
use crate::mesh::Mesh;

/// Read `path` with the codec for `kind`
pub fn decode(kind: FormatKind, path: &Path) -> Result<Mesh> {
    match kind {
        FormatKind::Ply => ply::decode(path),
        FormatKind::Vtk => vtk::decode_legacy(path),
        FormatKind::Vtp => vtk::decode_xml(path),
        FormatKind::Obj => obj::decode(path),
        FormatKind::Stl => stl::decode(path),
        FormatKind::Unknown => bail!("no eligible reader for this type of file"),
    }
}

/// Write `mesh` to `path` with the codec for `kind`
///
/// The mesh is validated before the output file is created.
pub fn encode(kind: FormatKind, path: &Path, mesh: &Mesh) -> Result<()> {
    let write: fn(&Path, &Mesh) -> Result<()> = match kind {
        FormatKind::Ply => ply::encode,
        FormatKind::Vtk => vtk::encode_legacy,
        FormatKind::Vtp => vtk::encode_xml,
        FormatKind::Obj => obj::encode,
        FormatKind::Stl => stl::encode,
        FormatKind::Unknown => bail!("no eligible writer for this type of file"),
    };
    mesh.validate()?;
    write(path, mesh)
}

/// Flat `[x, y, z, x, y, z, ...]` → `[[x, y, z], ...]`, ignoring a trailing partial chunk
pub(crate) fn chunked<const N: usize>(flat: &[f32]) -> Vec<[f32; N]> {
    flat.chunks_exact(N)
        .map(|chunk| {
            let mut out = [0.0; N];
            out.copy_from_slice(chunk);
            out
        })
        .collect()
}

/// Color channel stored as an 8-bit integer → 0.0..=1.0
pub(crate) fn unorm8_to_f32(v: u8) -> f32 {
    v as f32 / 255.0
}

/// 0.0..=1.0 → 8-bit color channel
pub(crate) fn f32_to_unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
