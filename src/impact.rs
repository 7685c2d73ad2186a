use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use crate::average::average;
use crate::models::{AverageDelta, Subject};
use crate::tree;

/// How much one grade moves the average of `subject_id` (or the global
/// average): the average with the grade minus the average without it.
/// Returns `None` when the grade does not exist or the average has no data.
pub fn grade_impact(grade_id: Uuid, subject_id: Option<Uuid>, subjects: &[Subject]) -> Option<AverageDelta> {
    let mut working = subjects.to_vec();
    let (owner, position) = working.iter().enumerate().find_map(|(index, subject)| {
        subject
            .grades
            .iter()
            .position(|grade| grade.id == grade_id)
            .map(|position| (index, position))
    })?;

    let with = average(subject_id, &working)?;
    working[owner].grades.remove(position);
    let without = average(subject_id, &working);

    debug!(%grade_id, with, ?without, "grade impact computed");
    Some(delta(with, without))
}

/// Leave-one-out impact of a whole subtree (`impacting_id` and its
/// descendants) on `impacted_id` or on the global average.
pub fn subject_impact(
    impacting_id: Uuid,
    impacted_id: Option<Uuid>,
    subjects: &[Subject],
) -> Option<AverageDelta> {
    tree::find(subjects, impacting_id)?;

    let with = average(impacted_id, subjects)?;
    let mut removed: HashSet<Uuid> = tree::children(subjects, impacting_id).into_iter().collect();
    removed.insert(impacting_id);

    let working: Vec<Subject> = subjects
        .iter()
        .filter(|subject| !removed.contains(&subject.id))
        .cloned()
        .collect();
    let without = average(impacted_id, &working);

    debug!(%impacting_id, removed = removed.len(), with, ?without, "subject impact computed");
    Some(delta(with, without))
}

/// A baseline with no data counts as zero, so the whole average is the impact.
fn delta(with: f64, without: Option<f64>) -> AverageDelta {
    AverageDelta::between(with, without.unwrap_or(0.0))
}

/// Impact of every grade on the global average, largest magnitude first.
pub fn grade_impacts(subjects: &[Subject]) -> Vec<(Uuid, AverageDelta)> {
    let mut impacts: Vec<(Uuid, AverageDelta)> = subjects
        .iter()
        .flat_map(|subject| subject.grades.iter().map(|grade| grade.id))
        .filter_map(|grade_id| grade_impact(grade_id, None, subjects).map(|delta| (grade_id, delta)))
        .collect();

    impacts.sort_by(|a, b| {
        b.1.difference
            .abs()
            .partial_cmp(&a.1.difference.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    impacts
}
