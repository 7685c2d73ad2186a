use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::error::EngineError;
use crate::models::Subject;

/// Every id reachable below `subject_id` through `parent_id` edges, depth first.
pub fn children(subjects: &[Subject], subject_id: Uuid) -> Vec<Uuid> {
    let mut found = Vec::new();
    let mut seen = HashSet::from([subject_id]);
    let mut stack = vec![subject_id];

    while let Some(current) = stack.pop() {
        let direct: Vec<Uuid> = subjects
            .iter()
            .filter(|subject| subject.parent_id == Some(current))
            .map(|subject| subject.id)
            .collect();

        // Reversed so the first child is expanded first.
        for id in direct.into_iter().rev() {
            if seen.insert(id) {
                stack.push(id);
            }
        }

        if current != subject_id {
            found.push(current);
        }
    }

    found
}

/// Ancestors of `subject_id`, nearest first, excluding the subject itself.
pub fn parents(subjects: &[Subject], subject_id: Uuid) -> Vec<Uuid> {
    let by_id: HashMap<Uuid, &Subject> = subjects.iter().map(|s| (s.id, s)).collect();
    let mut ancestors = Vec::new();
    let mut seen = HashSet::from([subject_id]);
    let mut current = by_id.get(&subject_id).and_then(|s| s.parent_id);

    while let Some(parent_id) = current {
        if !seen.insert(parent_id) {
            break;
        }
        ancestors.push(parent_id);
        current = by_id.get(&parent_id).and_then(|s| s.parent_id);
    }

    ancestors
}

/// The weighting units owed to `subject`: the subject itself unless it is a
/// display subject, followed by its direct children, with display children
/// replaced by their own resolution. Descendants of a non-display child are
/// not listed here; they are reached when that child is averaged.
pub fn non_display_subjects<'a>(subject: &'a Subject, subjects: &'a [Subject]) -> Vec<&'a Subject> {
    let mut units = Vec::new();
    if !subject.is_display_subject {
        units.push(subject);
    }

    let mut seen = HashSet::from([subject.id]);
    let mut stack: Vec<&Subject> = direct_children(subject.id, subjects).rev().collect();

    while let Some(child) = stack.pop() {
        if !seen.insert(child.id) {
            continue;
        }
        if child.is_display_subject {
            stack.extend(direct_children(child.id, subjects).rev());
        } else {
            units.push(child);
        }
    }

    units
}

pub fn find(subjects: &[Subject], subject_id: Uuid) -> Option<&Subject> {
    subjects.iter().find(|subject| subject.id == subject_id)
}

pub fn roots(subjects: &[Subject]) -> impl Iterator<Item = &Subject> {
    subjects.iter().filter(|subject| subject.is_root())
}

fn direct_children(
    parent_id: Uuid,
    subjects: &[Subject],
) -> impl DoubleEndedIterator<Item = &Subject> {
    subjects
        .iter()
        .filter(move |subject| subject.parent_id == Some(parent_id))
}

/// Checks that ids are unique, that every parent exists in the collection and
/// that no parent chain loops back on itself.
pub fn validate(subjects: &[Subject]) -> Result<(), EngineError> {
    let mut parent_of: HashMap<Uuid, Option<Uuid>> = HashMap::with_capacity(subjects.len());
    for subject in subjects {
        if parent_of.insert(subject.id, subject.parent_id).is_some() {
            return Err(EngineError::DuplicateSubject(subject.id));
        }
    }

    for subject in subjects {
        if let Some(parent) = subject.parent_id {
            if !parent_of.contains_key(&parent) {
                return Err(EngineError::UnknownParent {
                    subject: subject.id,
                    parent,
                });
            }
        }
    }

    let mut acyclic: HashSet<Uuid> = HashSet::new();
    for subject in subjects {
        let mut path = HashSet::new();
        let mut current = Some(subject.id);

        while let Some(id) = current {
            if acyclic.contains(&id) {
                break;
            }
            if !path.insert(id) {
                return Err(EngineError::CyclicSubject(id));
            }
            current = parent_of.get(&id).copied().flatten();
        }

        acyclic.extend(path);
    }

    Ok(())
}
