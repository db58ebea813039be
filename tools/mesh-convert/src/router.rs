//! Format dispatch: path → codec → canonical mesh → codec → path

use serde::Deserialize;
use std::path::Path;

use crate::codec;
use crate::error::{ConvertError, Result};
use crate::format::{classify_with, FormatKind, MatchMode};
use crate::mesh::Mesh;

/// Runtime options shared by single and batch conversions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ConvertOptions {
    /// How paths are mapped to formats
    #[serde(default, rename = "match")]
    pub match_mode: MatchMode,
}

/// Counts reported after a successful conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshStats {
    pub input_format: FormatKind,
    pub output_format: FormatKind,
    pub vertices: usize,
    pub faces: usize,
}

/// Picks a decoder/encoder from a path and moves a [`Mesh`] between them
#[derive(Debug, Clone, Default)]
pub struct FormatRouter {
    options: ConvertOptions,
}

impl FormatRouter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ConvertOptions {
        self.options
    }

    pub fn classify(&self, path: &Path) -> FormatKind {
        classify_with(path, self.options.match_mode)
    }

    /// Decode `path` into a mesh
    ///
    /// Fails with `UnsupportedFormat` before touching the file when the path
    /// matches no known format.
    pub fn decode(&self, path: &Path) -> Result<Mesh> {
        let kind = self.known_kind(path)?;
        tracing::debug!("Reading {:?} as {}", path, kind);
        codec::decode(kind, path).map_err(|e| ConvertError::decode(path, kind, format!("{:#}", e)))
    }

    /// Encode `mesh` to `path`
    ///
    /// A failed write may leave a truncated file behind; it is not cleaned up.
    pub fn encode(&self, path: &Path, mesh: &Mesh) -> Result<()> {
        let kind = self.known_kind(path)?;
        tracing::debug!("Writing {:?} as {}", path, kind);
        codec::encode(kind, path, mesh)
            .map_err(|e| ConvertError::encode(path, kind, format!("{:#}", e)))
    }

    /// Decode `input`, then encode the result to `output`
    pub fn convert(&self, input: &Path, output: &Path) -> Result<MeshStats> {
        // Classify both ends first so an unknown output fails before any I/O
        let input_format = self.known_kind(input)?;
        let output_format = self.known_kind(output)?;

        let mesh = self.decode(input)?;
        self.encode(output, &mesh)?;

        let stats = MeshStats {
            input_format,
            output_format,
            vertices: mesh.vertex_count(),
            faces: mesh.face_count(),
        };
        tracing::info!(
            "Converted {} -> {}: {} vertices, {} faces",
            input_format,
            output_format,
            stats.vertices,
            stats.faces
        );
        Ok(stats)
    }

    fn known_kind(&self, path: &Path) -> Result<FormatKind> {
        match self.classify(path) {
            FormatKind::Unknown => Err(ConvertError::unsupported(path)),
            kind => Ok(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::tetrahedron;
    use tempfile::tempdir;

    #[test]
    fn test_decode_unknown_format() {
        let router = FormatRouter::default();
        let err = router.decode(Path::new("readme.txt")).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_encode_unknown_format_writes_nothing() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("mesh.txt");
        let err = FormatRouter::default()
            .encode(&path, &tetrahedron())
            .unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_decode_missing_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let err = FormatRouter::default()
            .decode(&dir.path().join("absent.ply"))
            .unwrap_err();
        match err {
            ConvertError::Decode { format, .. } => assert_eq!(format, FormatKind::Ply),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_into_missing_directory() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("no_such_dir").join("mesh.stl");
        let err = FormatRouter::default()
            .encode(&path, &tetrahedron())
            .unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Encode {
                format: FormatKind::Stl,
                ..
            }
        ));
    }

    #[test]
    fn test_convert_unknown_output_skips_input() {
        let dir = tempdir().expect("Failed to create temp dir");
        // input does not exist: the unknown output must be reported first
        let err = FormatRouter::default()
            .convert(&dir.path().join("absent.ply"), &dir.path().join("out.txt"))
            .unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_convert_same_format_round_trip() {
        let dir = tempdir().expect("Failed to create temp dir");
        let router = FormatRouter::default();
        let input = dir.path().join("in.ply");
        let output = dir.path().join("out.ply");
        router.encode(&input, &tetrahedron()).unwrap();

        let stats = router.convert(&input, &output).unwrap();
        assert_eq!(stats.vertices, 4);
        assert_eq!(stats.faces, 4);

        let mesh = router.decode(&output).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces, tetrahedron().faces);
    }

    #[test]
    fn test_encode_inconsistent_mesh_is_an_error() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut mesh = tetrahedron();
        mesh.normals = Some(vec![[0.0, 0.0, 1.0]; 2]);

        let err = FormatRouter::default()
            .encode(&dir.path().join("mesh.ply"), &mesh)
            .unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Encode {
                format: FormatKind::Ply,
                ..
            }
        ));
    }

    #[test]
    fn test_match_mode_changes_dispatch() {
        let substring = FormatRouter::default();
        let extension = FormatRouter::new(ConvertOptions {
            match_mode: MatchMode::Extension,
        });
        let path = Path::new("scan.vtp.d/out.obj");
        assert_eq!(substring.classify(path), FormatKind::Vtp);
        assert_eq!(extension.classify(path), FormatKind::Obj);
    }
}
