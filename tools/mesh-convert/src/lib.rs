//! mesh-convert library
//!
//! Converts polygonal meshes between PLY, legacy VTK, XML VTP, Wavefront OBJ and STL.
//! Decoding and encoding are handled by the codec crates; this crate picks the codec
//! from the file path and moves a canonical [`Mesh`] between them.

pub mod codec;
pub mod error;
pub mod format;
pub mod manifest;
pub mod mesh;
pub mod router;

pub use error::{ConvertError, Result};
pub use format::{classify, classify_with, FormatKind, MatchMode};
pub use manifest::{ConversionEntry, ConversionManifest};
pub use mesh::Mesh;
pub use router::{ConvertOptions, FormatRouter, MeshStats};
