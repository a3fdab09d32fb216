use glam::Vec3;
use serde::{Deserialize, Serialize};
use strum::EnumIter;

/// The concrete kind of a scene object.
///
/// Per-kind behavior (local bounds, hit testing) dispatches on this enum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, EnumIter)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectKind {
    /// A bare transform with no geometry
    Empty,
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    /// Bounds follow the union of its children
    Group,
}

impl Default for ObjectKind {
    fn default() -> Self {
        Self::Empty
    }
}

impl ObjectKind {
    /// Human-readable class name, also the base for generated object names.
    pub fn class_name(&self) -> &'static str {
        match self {
            ObjectKind::Empty => "Empty",
            ObjectKind::Box { .. } => "Box",
            ObjectKind::Sphere { .. } => "Sphere",
            ObjectKind::Group => "Group",
        }
    }

    /// Numeric type tag stored alongside the class name.
    pub fn type_tag(&self) -> u32 {
        match self {
            ObjectKind::Empty => 1,
            ObjectKind::Box { .. } => 2,
            ObjectKind::Sphere { .. } => 3,
            ObjectKind::Group => 4,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, ObjectKind::Group)
    }

    /// Builds a kind with default parameters from its class name.
    pub fn from_class_name(name: &str) -> Option<Self> {
        match name {
            "Empty" => Some(ObjectKind::Empty),
            "Box" => Some(ObjectKind::Box {
                half_extents: Vec3::splat(0.5),
            }),
            "Sphere" => Some(ObjectKind::Sphere { radius: 0.5 }),
            "Group" => Some(ObjectKind::Group),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_class_names_roundtrip() {
        for kind in ObjectKind::iter() {
            let rebuilt = ObjectKind::from_class_name(kind.class_name()).unwrap();
            assert_eq!(rebuilt.type_tag(), kind.type_tag());
        }
        assert_eq!(ObjectKind::from_class_name("Teapot"), None);
    }

    #[test]
    fn test_type_tags_are_distinct() {
        let mut tags: Vec<u32> = ObjectKind::iter().map(|k| k.type_tag()).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), 4);
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_string(&ObjectKind::Sphere { radius: 2.0 }).unwrap();
        assert_eq!(json, r#"{"kind":"sphere","radius":2.0}"#);
    }
}
