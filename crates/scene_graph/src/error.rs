//! Error types and the non-fatal error collection surface.

use node::ObjectGuid;
use std::fmt;
use strum::Display;

/// Errors returned by registry operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Another live object already uses this guid
    DuplicateGuid { guid: ObjectGuid, name: String },
    NameTaken { name: String },
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateGuid { guid, name } => {
                write!(
                    f,
                    "Duplicate object id {} for object \"{}\"",
                    guid.to_uuid_string(),
                    name
                )
            }
            Self::NameTaken { name } => write!(f, "Object name \"{}\" is already in use", name),
        }
    }
}

impl std::error::Error for SceneError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    InvalidPosition,
    InvalidRotation,
    InvalidScale,
    /// An object entry that can't be created at all, e.g. unknown type
    InvalidObject,
    UnresolvedReference,
    DuplicateGuid,
    DuplicateName,
}

/// One diagnostic collected during a load, a validation pass or a
/// registry operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub severity: Severity,
    pub kind: ErrorKind,
    pub message: String,
    pub object: Option<ObjectGuid>,
}

impl ErrorRecord {
    pub fn warning(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            message: message.into(),
            object: None,
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            message: message.into(),
            object: None,
        }
    }

    pub fn with_object(mut self, guid: ObjectGuid) -> Self {
        self.object = Some(guid);
        self
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object {
            Some(guid) => write!(f, "[{}] {} ({}): {}", self.severity, self.kind, guid, self.message),
            None => write!(f, "[{}] {}: {}", self.severity, self.kind, self.message),
        }
    }
}

impl From<&SceneError> for ErrorRecord {
    fn from(error: &SceneError) -> Self {
        match error {
            SceneError::DuplicateGuid { guid, .. } => {
                ErrorRecord::error(ErrorKind::DuplicateGuid, error.to_string()).with_object(*guid)
            }
            SceneError::NameTaken { .. } => {
                ErrorRecord::warning(ErrorKind::DuplicateName, error.to_string())
            }
        }
    }
}

/// Collects diagnostics without aborting the operation that produced them.
#[derive(Debug, Default, Clone)]
pub struct ErrorReport {
    records: Vec<ErrorRecord>,
}

impl ErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, record: ErrorRecord) {
        match record.severity {
            Severity::Warning => log::warn!("{record}"),
            Severity::Error => log::error!("{record}"),
        }
        self.records.push(record);
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.records.iter().any(|r| r.severity == Severity::Error)
    }

    pub fn count(&self, kind: ErrorKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    /// Moves every record of `other` into this report.
    pub fn append(&mut self, other: &mut ErrorReport) {
        self.records.append(&mut other.records);
    }
}
