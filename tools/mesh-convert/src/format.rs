//! File format classification
//!
//! Two strategies are available:
//! - [`MatchMode::Substring`] scans the whole path, case-insensitively, for `.ply`,
//!   `.vtk`, `.vtp`, `.obj` and `.stl` in that order and takes the first hit. This is
//!   the legacy behaviour, so `scan.vtp.d/out.obj` classifies as VTP.
//! - [`MatchMode::Extension`] only looks at the extension of the final path component.

use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Mesh file formats known to the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// Stanford polygon file
    Ply,
    /// Legacy VTK POLYDATA
    Vtk,
    /// VTK XML PolyData
    Vtp,
    /// Wavefront OBJ
    Obj,
    /// Stereolithography
    Stl,
    Unknown,
}

impl FormatKind {
    /// Known formats, in the order substring matching checks them
    pub const KNOWN: [FormatKind; 5] = [
        FormatKind::Ply,
        FormatKind::Vtk,
        FormatKind::Vtp,
        FormatKind::Obj,
        FormatKind::Stl,
    ];

    /// Lowercase file extension without the dot
    pub fn extension(self) -> Option<&'static str> {
        match self {
            FormatKind::Ply => Some("ply"),
            FormatKind::Vtk => Some("vtk"),
            FormatKind::Vtp => Some("vtp"),
            FormatKind::Obj => Some("obj"),
            FormatKind::Stl => Some("stl"),
            FormatKind::Unknown => None,
        }
    }

    /// Map a bare extension (any case) to a format
    pub fn from_extension(ext: &str) -> FormatKind {
        let ext = ext.to_lowercase();
        Self::KNOWN
            .into_iter()
            .find(|kind| kind.extension() == Some(ext.as_str()))
            .unwrap_or(FormatKind::Unknown)
    }

    pub fn is_known(self) -> bool {
        self != FormatKind::Unknown
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatKind::Ply => "PLY",
            FormatKind::Vtk => "VTK",
            FormatKind::Vtp => "VTP",
            FormatKind::Obj => "OBJ",
            FormatKind::Stl => "STL",
            FormatKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// How a path is mapped to a [`FormatKind`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// First of `.ply`, `.vtk`, `.vtp`, `.obj`, `.stl` found anywhere in the path
    #[default]
    Substring,
    /// Extension of the final path component
    Extension,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Substring => f.write_str("substring"),
            MatchMode::Extension => f.write_str("extension"),
        }
    }
}

/// Classify a path with the default (substring) strategy
pub fn classify(path: impl AsRef<Path>) -> FormatKind {
    classify_with(path, MatchMode::Substring)
}

/// Classify a path with an explicit strategy
pub fn classify_with(path: impl AsRef<Path>, mode: MatchMode) -> FormatKind {
    let path = path.as_ref();
    match mode {
        MatchMode::Substring => {
            let haystack = path.to_string_lossy().to_lowercase();
            FormatKind::KNOWN
                .into_iter()
                .find(|kind| {
                    kind.extension()
                        .map(|ext| haystack.contains(&format!(".{ext}")))
                        .unwrap_or(false)
                })
                .unwrap_or(FormatKind::Unknown)
        }
        MatchMode::Extension => path
            .extension()
            .and_then(|e| e.to_str())
            .map(FormatKind::from_extension)
            .unwrap_or(FormatKind::Unknown),
    }
}
