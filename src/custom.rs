use std::collections::HashSet;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::average::average;
use crate::error::EngineError;
use crate::models::{CustomAverage, Subject};

/// Builds the forest a custom average is computed on.
///
/// Every listed subject becomes a root, carrying its custom coefficient when
/// one is set. Its descendants follow it unless `include_children` is
/// `false`. A listed subject found inside another listed subject's subtree is
/// cut out of it and stands on its own, so it is counted once.
pub fn apply(custom: &CustomAverage, subjects: &[Subject]) -> Vec<Subject> {
    let listed: HashSet<Uuid> = custom.subjects.iter().map(|entry| entry.id).collect();
    let mut view: Vec<Subject> = Vec::new();
    let mut placed: HashSet<Uuid> = HashSet::new();

    for entry in &custom.subjects {
        let Some(subject) = subjects.iter().find(|subject| subject.id == entry.id) else {
            warn!(custom_average = %custom.id, subject = %entry.id, "custom average lists unknown subject");
            continue;
        };
        if !placed.insert(subject.id) {
            continue;
        }

        let mut root = subject.clone();
        root.parent_id = None;
        if let Some(coefficient) = entry.custom_coefficient {
            root.coefficient = coefficient;
        }
        view.push(root);

        if entry.include_children.unwrap_or(true) {
            for descendant in descendants_until(subjects, subject.id, &listed) {
                if placed.insert(descendant.id) {
                    view.push(descendant.clone());
                }
            }
        }
    }

    debug!(custom_average = %custom.id, subjects = view.len(), "custom average view built");
    view
}

/// Descendants of `subject_id`, not descending into subjects in `stop`.
fn descendants_until<'a>(subjects: &'a [Subject], subject_id: Uuid, stop: &HashSet<Uuid>) -> Vec<&'a Subject> {
    let mut found = Vec::new();
    let mut seen = HashSet::from([subject_id]);
    let mut stack = vec![subject_id];

    while let Some(current) = stack.pop() {
        for child in subjects.iter().filter(|s| s.parent_id == Some(current)) {
            if stop.contains(&child.id) || !seen.insert(child.id) {
                continue;
            }
            found.push(child);
            stack.push(child.id);
        }
    }

    found
}

pub fn custom_average(custom: &CustomAverage, subjects: &[Subject]) -> Option<f64> {
    average(None, &apply(custom, subjects))
}

pub fn find_custom_average(customs: &[CustomAverage], id: Uuid) -> Result<&CustomAverage, EngineError> {
    customs
        .iter()
        .find(|custom| custom.id == id)
        .ok_or(EngineError::UnknownCustomAverage(id))
}
