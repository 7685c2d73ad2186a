use std::cmp::Ordering;
use std::collections::HashSet;

use uuid::Uuid;

use crate::average::average_for_subject;
use crate::error::EngineError;
use crate::models::{AverageDelta, GradeHighlight, Subject, SubjectAverage};
use crate::tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extreme {
    Best,
    Worst,
}

impl Extreme {
    /// Whether `candidate` beats `current` on the compared value.
    fn beats(self, candidate: f64, current: f64) -> bool {
        match self {
            Extreme::Best => candidate > current,
            Extreme::Worst => candidate < current,
        }
    }
}

/// Average of every subject that has data, in input order.
pub fn subject_averages(subjects: &[Subject]) -> Vec<SubjectAverage> {
    subjects
        .iter()
        .filter_map(|subject| {
            average_for_subject(subject, subjects).map(|average| SubjectAverage {
                id: subject.id,
                average,
                is_main_subject: subject.is_main_subject,
            })
        })
        .collect()
}

pub fn best_subject(subjects: &[Subject], main_only: bool) -> Option<&Subject> {
    extreme_subject(subjects, main_only, Extreme::Best)
}

pub fn worst_subject(subjects: &[Subject], main_only: bool) -> Option<&Subject> {
    extreme_subject(subjects, main_only, Extreme::Worst)
}

fn extreme_subject(subjects: &[Subject], main_only: bool, extreme: Extreme) -> Option<&Subject> {
    let mut chosen: Option<(&Subject, f64)> = None;

    for entry in subject_averages(subjects) {
        if main_only && !entry.is_main_subject {
            continue;
        }
        let Some(subject) = tree::find(subjects, entry.id) else {
            continue;
        };

        chosen = match chosen {
            None => Some((subject, entry.average)),
            Some((current, current_avg)) => {
                let replace = extreme.beats(entry.average, current_avg)
                    || (entry.average == current_avg && subject.coefficient > current.coefficient);
                if replace {
                    Some((subject, entry.average))
                } else {
                    Some((current, current_avg))
                }
            }
        };
    }

    chosen.map(|(subject, _)| subject)
}

pub fn best_grade(subjects: &[Subject]) -> Option<GradeHighlight<'_>> {
    extreme_grade(subjects.iter(), Extreme::Best)
}

pub fn worst_grade(subjects: &[Subject]) -> Option<GradeHighlight<'_>> {
    extreme_grade(subjects.iter(), Extreme::Worst)
}

/// Best grade of `subject_id` and everything below it.
pub fn best_grade_in_subject(subjects: &[Subject], subject_id: Uuid) -> Option<GradeHighlight<'_>> {
    let scope = subtree(subjects, subject_id);
    extreme_grade(subjects.iter().filter(|s| scope.contains(&s.id)), Extreme::Best)
}

pub fn worst_grade_in_subject(subjects: &[Subject], subject_id: Uuid) -> Option<GradeHighlight<'_>> {
    let scope = subtree(subjects, subject_id);
    extreme_grade(subjects.iter().filter(|s| scope.contains(&s.id)), Extreme::Worst)
}

fn subtree(subjects: &[Subject], subject_id: Uuid) -> HashSet<Uuid> {
    let mut scope: HashSet<Uuid> = tree::children(subjects, subject_id).into_iter().collect();
    scope.insert(subject_id);
    scope
}

/// Flat scan over grades, ignoring subject weights. Ties go to the grade with
/// the larger coefficient, then to the first one seen.
fn extreme_grade<'a>(
    subjects: impl Iterator<Item = &'a Subject>,
    extreme: Extreme,
) -> Option<GradeHighlight<'a>> {
    let mut chosen: Option<(GradeHighlight<'a>, f64)> = None;

    for subject in subjects {
        for grade in &subject.grades {
            let Some(percentage) = grade.percentage() else {
                continue;
            };
            let candidate = GradeHighlight { grade, subject };

            let replace = match &chosen {
                None => true,
                Some((current, current_pct)) => {
                    extreme.beats(percentage, *current_pct)
                        || (percentage == *current_pct
                            && grade.weight() > current.grade.weight())
                }
            };

            if replace {
                chosen = Some((candidate, percentage));
            }
        }
    }

    chosen.map(|(highlight, _)| highlight)
}

/// Which subjects a comparison measures the target against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonScope<'a> {
    AllOthers,
    MainSubjects,
    Subjects(&'a [Uuid]),
}

impl<'a> ComparisonScope<'a> {
    pub fn from_flags(main_only: bool, subject_ids: Option<&'a [Uuid]>) -> Result<Self, EngineError> {
        match (main_only, subject_ids) {
            (true, Some(_)) => Err(EngineError::ConflictingComparisonScope),
            (true, None) => Ok(Self::MainSubjects),
            (false, Some(ids)) => Ok(Self::Subjects(ids)),
            (false, None) => Ok(Self::AllOthers),
        }
    }

    fn includes(&self, entry: &SubjectAverage) -> bool {
        match self {
            Self::AllOthers => true,
            Self::MainSubjects => entry.is_main_subject,
            Self::Subjects(ids) => ids.contains(&entry.id),
        }
    }
}

/// Compares a subject's average to the plain mean of the other subjects'
/// averages. Asking for main subjects and an explicit list at once is an error.
/// Returns `Ok(None)` when the target has no average or nothing to compare to.
pub fn subject_average_comparison(
    subjects: &[Subject],
    subject_id: Uuid,
    main_only: bool,
    subject_ids: Option<&[Uuid]>,
) -> Result<Option<AverageDelta>, EngineError> {
    let scope = ComparisonScope::from_flags(main_only, subject_ids)?;
    Ok(compare_within(subjects, subject_id, scope))
}

pub fn compare_within(
    subjects: &[Subject],
    subject_id: Uuid,
    scope: ComparisonScope<'_>,
) -> Option<AverageDelta> {
    let averages = subject_averages(subjects);
    let subject_average = averages.iter().find(|entry| entry.id == subject_id)?.average;

    let others: Vec<f64> = averages
        .iter()
        .filter(|entry| entry.id != subject_id && scope.includes(entry))
        .map(|entry| entry.average)
        .collect();

    if others.is_empty() {
        return None;
    }

    let comparison_average = others.iter().sum::<f64>() / others.len() as f64;
    Some(AverageDelta::between(subject_average, comparison_average))
}

/// Orders subject averages from highest to lowest.
pub fn ranked(mut averages: Vec<SubjectAverage>) -> Vec<SubjectAverage> {
    averages.sort_by(|a, b| b.average.partial_cmp(&a.average).unwrap_or(Ordering::Equal));
    averages
}
