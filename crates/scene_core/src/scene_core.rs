//! # Core math types shared by the scene crates
//!
//! Value types with no knowledge of the scene graph: axis-aligned boxes,
//! rays, packed object colors and the pose helpers used to build and split
//! object matrices.

pub mod bounds;
pub mod color;
pub mod transform;

pub use bounds::{Aabb, Ray};
pub use color::Color;
pub use transform::LocalPose;
