//! Identity and classification for scene objects.
//!
//! Objects are addressed two ways: by a persistent [`ObjectGuid`] that
//! survives save/load and undo, and by an arena handle owned by the scene
//! graph crate. This crate only knows about the former.

mod flags;
mod object_guid;
mod object_kind;

pub use flags::{ObjectFlags, UpdateFlags};
pub use object_guid::ObjectGuid;
pub use object_kind::ObjectKind;
