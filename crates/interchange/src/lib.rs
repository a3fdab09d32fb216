//! Scene Interchange Format
//!
//! KDL-based persistence for scene graphs. Every object is written as one
//! `object` node carrying its attributes; references to parents and look-at
//! targets are stored as guids and resolved once the whole scene is loaded.
//!
//! # Document Format
//!
//! ```kdl
//! scene version="0.1" {
//!   object type="Group" id="5b3c..." name="Rack1" hide-order=0 color=16777215 {
//!     rotate 0.0 0.0 0.0 1.0
//!   }
//!   object type="Box" id="9e1f..." name="Crate1" hide-order=0 parent="5b3c..." color=16777215 {
//!     pos 0.0 2.0 0.0
//!     rotate 0.0 0.0 0.0 1.0
//!     half-extents 0.5 0.5 0.5
//!   }
//! }
//! ```

mod archive;
mod document;
pub mod scene_file;
mod serialize;

pub use archive::ObjectArchive;
pub use document::SceneDocument;
pub use serialize::{read_kind, serialize_object, write_kind};

pub const FORMAT_VERSION: &str = "0.1";

/// Error type for interchange operations.
#[derive(Debug)]
pub enum InterchangeError {
    Parse(String),
    InvalidStructure(String),
    MissingField(String),
    InvalidValue(String),
}

impl std::fmt::Display for InterchangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "Parse error: {}", msg),
            Self::InvalidStructure(msg) => write!(f, "Invalid structure: {}", msg),
            Self::MissingField(msg) => write!(f, "Missing field: {}", msg),
            Self::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
        }
    }
}

impl std::error::Error for InterchangeError {}
