//! Tunable limits for pose mutators.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Tolerance under which a new position or scale counts as unchanged.
    /// Move tool edits always compare exactly.
    pub position_epsilon: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Largest accepted magnitude of a position component
    pub max_position: f32,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            position_epsilon: 0.001,
            min_scale: 0.01,
            max_scale: 1000.0,
            max_position: 100_000.0,
        }
    }
}

impl SceneSettings {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings = SceneSettings::from_json(r#"{ "min_scale": 0.1 }"#).unwrap();
        assert_eq!(settings.min_scale, 0.1);
        assert_eq!(settings.max_scale, 1000.0);
        assert_eq!(settings.position_epsilon, 0.001);
    }

    #[test]
    fn test_json_roundtrip() {
        let settings = SceneSettings {
            max_position: 500.0,
            ..Default::default()
        };
        let json = settings.to_json().unwrap();
        assert_eq!(SceneSettings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(SceneSettings::from_json("{ min_scale: }").is_err());
    }
}
