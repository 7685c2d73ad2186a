use uuid::Uuid;

use crate::models::Subject;
use crate::tree;

/// Upper bound of the grading scale every average is expressed on.
pub const GRADING_SCALE: f64 = 20.0;

/// Running sums of weighted percentages and their weights.
#[derive(Debug, Default, Clone, Copy)]
struct WeightedTotals {
    weighted_percentages: f64,
    coefficients: f64,
}

impl WeightedTotals {
    fn add(&mut self, percentage: f64, coefficient: f64) {
        self.weighted_percentages += percentage * coefficient;
        self.coefficients += coefficient;
    }

    fn add_average(&mut self, average: Option<f64>, coefficient: f64) {
        if let Some(average) = average {
            self.add(average / GRADING_SCALE, coefficient);
        }
    }

    fn on_grading_scale(self) -> Option<f64> {
        if self.coefficients == 0.0 {
            return None;
        }
        Some((self.weighted_percentages / self.coefficients) * GRADING_SCALE)
    }
}

/// Average of one subject, or of every root subject when `subject_id` is
/// `None`. Unknown subjects and subjects without data yield `None`.
pub fn average(subject_id: Option<Uuid>, subjects: &[Subject]) -> Option<f64> {
    match subject_id {
        None => {
            let roots: Vec<&Subject> = tree::roots(subjects).collect();
            average_for_subjects(&roots, subjects)
        }
        Some(id) => tree::find(subjects, id).and_then(|subject| average_for_subject(subject, subjects)),
    }
}

/// Weighted average of a subject's own grades and of the weighting units
/// below it, on the 0-20 scale.
pub fn average_for_subject(subject: &Subject, subjects: &[Subject]) -> Option<f64> {
    let mut totals = WeightedTotals::default();

    for grade in &subject.grades {
        if let Some(percentage) = grade.percentage() {
            totals.add(percentage, grade.weight());
        }
    }

    for child in tree::non_display_subjects(subject, subjects) {
        if child.id == subject.id {
            continue;
        }
        totals.add_average(average_for_subject(child, subjects), child.weight());
    }

    totals.on_grading_scale()
}

/// Weighted average across a set of subjects. Each member is expanded through
/// [`tree::non_display_subjects`], so a non-display member counts alongside
/// its direct weighting units.
pub fn average_for_subjects(set: &[&Subject], subjects: &[Subject]) -> Option<f64> {
    let mut totals = WeightedTotals::default();

    for subject in set {
        for unit in tree::non_display_subjects(subject, subjects) {
            totals.add_average(average_for_subject(unit, subjects), unit.weight());
        }
    }

    totals.on_grading_scale()
}
