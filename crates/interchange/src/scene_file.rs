//! Reading and writing scene documents on disk.

use crate::SceneDocument;
use anyhow::{Context, Result};
use scene_graph::{ErrorReport, SceneGraph};
use std::path::Path;

pub const SCENE_EXTENSION: &str = "kdl";

/// Writes the scene to `path`, creating parent directories as needed.
pub fn save_scene(path: impl AsRef<Path>, graph: &mut SceneGraph) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    let text = SceneDocument::save(graph);
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write scene {}", path.display()))?;
    log::info!("Saved {} objects to {}", graph.len(), path.display());
    Ok(())
}

/// Loads the scene at `path` into `graph`.
pub fn load_scene(path: impl AsRef<Path>, graph: &mut SceneGraph) -> Result<ErrorReport> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scene {}", path.display()))?;
    let report = SceneDocument::load(&text, graph)
        .with_context(|| format!("Failed to load scene {}", path.display()))?;
    Ok(report)
}
