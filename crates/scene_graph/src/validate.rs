use crate::error::{ErrorKind, ErrorRecord, ErrorReport};
use crate::{ObjectId, SceneGraph};
use scene_core::transform;

impl SceneGraph {
    /// Checks the stored pose against the current limits. Problems are
    /// reported as warnings; nothing is changed.
    pub fn validate(&self, id: ObjectId, report: &mut ErrorReport) {
        let Some(object) = self.objects.get(id) else {
            return;
        };

        let pos = object.pos();
        if !transform::is_valid_position(pos, self.settings.max_position) {
            report.report(
                ErrorRecord::warning(
                    ErrorKind::InvalidPosition,
                    format!("Object \"{}\" has an invalid position {pos}", object.name),
                )
                .with_object(object.guid),
            );
        }

        let scale = object.scale();
        if !self.is_valid_scale(scale) {
            report.report(
                ErrorRecord::warning(
                    ErrorKind::InvalidScale,
                    format!("Object \"{}\" has an out of range scale {scale}", object.name),
                )
                .with_object(object.guid),
            );
        }
    }
}
