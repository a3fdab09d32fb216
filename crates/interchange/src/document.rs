use crate::archive::{ObjectArchive, OBJECT_NODE};
use crate::serialize::{read_kind, serialize_object};
use crate::{InterchangeError, FORMAT_VERSION};
use kdl::{KdlDocument, KdlEntry, KdlNode};
use node::ObjectFlags;
use scene_graph::{ErrorKind, ErrorRecord, ErrorReport, ObjectId, SceneError, SceneGraph};

const SCENE_NODE: &str = "scene";

/// A whole scene as a KDL document.
pub struct SceneDocument;

impl SceneDocument {
    /// Serializes every saveable object. Parents are written before their
    /// children and siblings keep their order, so loading rebuilds the same
    /// child lists.
    pub fn save(graph: &mut SceneGraph) -> String {
        let mut order = Vec::with_capacity(graph.len());
        for root in graph.root_objects() {
            collect_saveable(graph, root, &mut order);
        }

        let mut scene = KdlNode::new(SCENE_NODE);
        scene.push(KdlEntry::new_prop("version", FORMAT_VERSION));
        let children = scene.children_mut().get_or_insert_with(KdlDocument::new);
        for id in order {
            let mut ar = ObjectArchive::saving();
            serialize_object(graph, id, &mut ar);
            children.nodes_mut().push(ar.into_node());
        }

        let mut doc = KdlDocument::new();
        doc.nodes_mut().push(scene);
        doc.to_string()
    }

    /// Creates the objects of a document in `graph`.
    ///
    /// Problems with single objects (unknown types, missing or duplicate
    /// ids, taken names, dangling references, bad poses) don't stop the load; they come back in the
    /// report. Only a malformed document is an error. Undo recording is
    /// suspended for the duration.
    pub fn load(input: &str, graph: &mut SceneGraph) -> Result<ErrorReport, InterchangeError> {
        let doc: KdlDocument = input
            .parse()
            .map_err(|e| InterchangeError::Parse(format!("{}", e)))?;

        let scene = doc
            .get(SCENE_NODE)
            .ok_or_else(|| InterchangeError::InvalidStructure("Missing 'scene' node".into()))?;

        let version = scene
            .get("version")
            .and_then(|v| v.as_string())
            .unwrap_or(FORMAT_VERSION);
        if version != FORMAT_VERSION {
            log::warn!("Loading scene version {version}, expected {FORMAT_VERSION}");
        }

        graph.suspend_undo();
        let report = load_objects(scene, graph);
        graph.resume_undo();
        Ok(report)
    }
}

fn collect_saveable(graph: &SceneGraph, id: ObjectId, order: &mut Vec<ObjectId>) {
    let Some(object) = graph.object(id) else {
        return;
    };
    if object.check_flags(ObjectFlags::DONT_SAVE) {
        return;
    }
    order.push(id);
    for &child in object.children() {
        collect_saveable(graph, child, order);
    }
}

fn load_objects(scene: &KdlNode, graph: &mut SceneGraph) -> ErrorReport {
    let mut report = ErrorReport::new();
    let mut loaded = Vec::new();

    for node in scene.children().map(|c| c.nodes()).unwrap_or_default() {
        if node.name().value() != OBJECT_NODE {
            log::debug!("Skipping unknown scene node '{}'", node.name().value());
            continue;
        }

        let mut ar = ObjectArchive::loading(node.clone());
        let name = ar.string("name").unwrap_or_default().to_string();
        let Some(guid) = ar.guid("id") else {
            report.report(ErrorRecord::error(
                ErrorKind::InvalidObject,
                format!("Object \"{}\" has no valid id, skipped", name),
            ));
            continue;
        };
        let kind = match read_kind(&ar) {
            Ok(kind) => kind,
            Err(error) => {
                report.report(
                    ErrorRecord::error(
                        ErrorKind::InvalidObject,
                        format!("Object \"{}\" skipped: {}", name, error),
                    )
                    .with_object(guid),
                );
                continue;
            }
        };

        let id = match graph.insert_object(guid, kind, &name) {
            Ok(id) => id,
            Err(error @ SceneError::DuplicateGuid { .. }) => {
                report.report(ErrorRecord::from(&error));
                continue;
            }
            Err(error @ SceneError::NameTaken { .. }) => {
                report.report(ErrorRecord::from(&error).with_object(guid));
                let unique = graph.generate_unique_name(&name);
                match graph.insert_object(guid, kind, &unique) {
                    Ok(id) => id,
                    Err(error) => {
                        report.report(ErrorRecord::from(&error));
                        continue;
                    }
                }
            }
        };

        serialize_object(graph, id, &mut ar);
        loaded.push(ar);
    }

    for ar in &mut loaded {
        ar.resolve_objects(graph);
        report.append(&mut ar.take_errors());
    }

    log::info!("Loaded {} objects with {} problems", loaded.len(), report.len());
    report
}
