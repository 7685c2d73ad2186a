use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("compare against main subjects or an explicit subject list, not both")]
    ConflictingComparisonScope,
    #[error("subject {0} appears more than once")]
    DuplicateSubject(Uuid),
    #[error("subject {subject} references unknown parent {parent}")]
    UnknownParent { subject: Uuid, parent: Uuid },
    #[error("subject {0} is part of a parent cycle")]
    CyclicSubject(Uuid),
    #[error("custom average {0} not found")]
    UnknownCustomAverage(Uuid),
}
