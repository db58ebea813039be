//! Batch conversion manifest (`conversions.toml`)
//!
//! ```toml
//! [options]
//! match = "extension"
//!
//! [[convert]]
//! input = "scans/bunny.ply"
//! output = "out/bunny.stl"
//! ```
//!
//! Relative paths resolve against the directory holding the manifest.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, Result};
use crate::router::{ConvertOptions, FormatRouter, MeshStats};

/// Parsed manifest
#[derive(Debug, Default, Deserialize)]
pub struct ConversionManifest {
    #[serde(default)]
    pub options: ConvertOptions,
    #[serde(default, rename = "convert")]
    pub conversions: Vec<ConversionEntry>,
}

/// Single input → output pair
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversionEntry {
    #[serde(default)]
    pub input: PathBuf,
    #[serde(default)]
    pub output: PathBuf,
}

impl ConversionEntry {
    /// Reject entries with an empty input or output path
    pub fn check(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            return Err(ConvertError::MissingArgument("input"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConvertError::MissingArgument("output"));
        }
        Ok(())
    }
}

impl ConversionManifest {
    /// Load manifest from file, resolving relative entry paths against its directory
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConvertError::manifest(path, e))?;
        let mut manifest =
            Self::parse(&content).map_err(|e| ConvertError::manifest(path, e))?;

        if let Some(base) = path.parent() {
            for entry in &mut manifest.conversions {
                entry.input = resolve(base, &entry.input);
                entry.output = resolve(base, &entry.output);
            }
        }
        Ok(manifest)
    }

    /// Parse manifest from string
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Run every entry in order, stopping at the first failure
    ///
    /// All entries are checked for missing paths before any file is read.
    pub fn run(&self) -> Result<Vec<(PathBuf, MeshStats)>> {
        let mut written = Vec::with_capacity(self.conversions.len());
        self.run_with(|output, stats| written.push((output.to_path_buf(), *stats)))?;
        Ok(written)
    }

    /// Like [`run`](Self::run), calling `on_written` as soon as each output is written
    ///
    /// Returns the number of completed conversions.
    pub fn run_with(&self, mut on_written: impl FnMut(&Path, &MeshStats)) -> Result<usize> {
        for entry in &self.conversions {
            entry.check()?;
        }

        let router = FormatRouter::new(self.options);
        for entry in &self.conversions {
            tracing::info!("Converting {:?} -> {:?}", entry.input, entry.output);
            let stats = router.convert(&entry.input, &entry.output)?;
            on_written(&entry.output, &stats);
        }
        Ok(self.conversions.len())
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() || path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::MatchMode;
    use crate::mesh::tests::tetrahedron;
    use tempfile::tempdir;

    #[test]
    fn test_manifest_minimal() {
        let manifest = ConversionManifest::parse(
            r#"
[[convert]]
input = "a.ply"
output = "a.stl"
"#,
        )
        .unwrap();

        assert_eq!(manifest.options.match_mode, MatchMode::Substring);
        assert_eq!(manifest.conversions.len(), 1);
        assert_eq!(manifest.conversions[0].input, PathBuf::from("a.ply"));
    }

    #[test]
    fn test_manifest_options() {
        let manifest = ConversionManifest::parse(
            r#"
[options]
match = "extension"
"#,
        )
        .unwrap();

        assert_eq!(manifest.options.match_mode, MatchMode::Extension);
        assert!(manifest.conversions.is_empty());
    }

    #[test]
    fn test_manifest_bad_match_mode() {
        assert!(ConversionManifest::parse("[options]\nmatch = \"prefix\"\n").is_err());
    }

    #[test]
    fn test_missing_output_reported_before_io() {
        let manifest = ConversionManifest::parse(
            r#"
[[convert]]
input = "exists-nowhere.ply"
"#,
        )
        .unwrap();

        let err = manifest.run().unwrap_err();
        assert!(matches!(err, ConvertError::MissingArgument("output")));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempdir().expect("Failed to create temp dir");
        let manifest_path = dir.path().join("conversions.toml");
        std::fs::write(
            &manifest_path,
            "[[convert]]\ninput = \"in.ply\"\noutput = \"out.vtk\"\n",
        )
        .unwrap();

        let manifest = ConversionManifest::load(&manifest_path).unwrap();
        assert_eq!(manifest.conversions[0].input, dir.path().join("in.ply"));
        assert_eq!(manifest.conversions[0].output, dir.path().join("out.vtk"));
    }

    #[test]
    fn test_run_batch() {
        let dir = tempdir().expect("Failed to create temp dir");
        FormatRouter::default()
            .encode(&dir.path().join("in.ply"), &tetrahedron())
            .unwrap();
        let manifest_path = dir.path().join("conversions.toml");
        std::fs::write(
            &manifest_path,
            r#"
[[convert]]
input = "in.ply"
output = "out.stl"

[[convert]]
input = "out.stl"
output = "out.obj"
"#,
        )
        .unwrap();

        let written = ConversionManifest::load(&manifest_path).unwrap().run().unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[1].1.faces, 4);
        assert!(dir.path().join("out.obj").exists());
    }

    #[test]
    fn test_run_with_reports_outputs_before_failure() {
        let dir = tempdir().expect("Failed to create temp dir");
        FormatRouter::default()
            .encode(&dir.path().join("in.obj"), &tetrahedron())
            .unwrap();
        let manifest_path = dir.path().join("conversions.toml");
        std::fs::write(
            &manifest_path,
            r#"
[[convert]]
input = "in.obj"
output = "first.vtk"

[[convert]]
input = "absent.ply"
output = "second.stl"

[[convert]]
input = "in.obj"
output = "third.vtp"
"#,
        )
        .unwrap();

        let mut reported = Vec::new();
        let err = ConversionManifest::load(&manifest_path)
            .unwrap()
            .run_with(|output, _| reported.push(output.to_path_buf()))
            .unwrap_err();

        assert!(matches!(err, ConvertError::Decode { .. }));
        assert_eq!(reported, vec![dir.path().join("first.vtk")]);
        assert!(!dir.path().join("third.vtp").exists());
    }

    #[test]
    fn test_load_missing_manifest() {
        let dir = tempdir().expect("Failed to create temp dir");
        let err = ConversionManifest::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConvertError::Manifest { .. }));
    }
}
