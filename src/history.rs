use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::average::average;
use crate::models::{Subject, TrendPoint};
use crate::tree;

/// One value per day in `[start, end]`. A day is recomputed only when some
/// grade was passed on it, or when it is the last day; every other day is
/// `None` and left for the caller to fill.
pub fn average_over_time(
    subjects: &[Subject],
    subject_id: Option<Uuid>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Option<f64>> {
    let days = date_range(start, end, 1);
    let grade_days: BTreeSet<NaiveDate> = grade_dates(subjects, subject_id).into_iter().collect();
    let last = days.len().saturating_sub(1);

    debug!(
        days = days.len(),
        grade_days = grade_days.len(),
        "reconstructing average history"
    );

    days.iter()
        .enumerate()
        .map(|(index, day)| {
            if index == last || grade_days.contains(day) {
                average(subject_id, &as_of(subjects, *day))
            } else {
                None
            }
        })
        .collect()
}

/// [`average_over_time`] paired with the day each value belongs to.
pub fn average_history(
    subjects: &[Subject],
    subject_id: Option<Uuid>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<TrendPoint> {
    date_range(start, end, 1)
        .into_iter()
        .zip(average_over_time(subjects, subject_id, start, end))
        .map(|(date, average)| TrendPoint { date, average })
        .collect()
}

/// The forest as it stood at the end of `day`: grades passed later are dropped.
pub fn as_of(subjects: &[Subject], day: NaiveDate) -> Vec<Subject> {
    subjects
        .iter()
        .map(|subject| Subject {
            grades: subject
                .grades
                .iter()
                .filter(|grade| grade.passed_at <= day)
                .cloned()
                .collect(),
            ..subject.clone()
        })
        .collect()
}

/// Distinct days on which grades were passed, sorted. With a subject id, only
/// that subject and its descendants are scanned.
pub fn grade_dates(subjects: &[Subject], subject_id: Option<Uuid>) -> Vec<NaiveDate> {
    let scope: Option<BTreeSet<Uuid>> = subject_id.map(|id| {
        let mut ids: BTreeSet<Uuid> = tree::children(subjects, id).into_iter().collect();
        ids.insert(id);
        ids
    });

    let dates: BTreeSet<NaiveDate> = subjects
        .iter()
        .filter(|subject| scope.as_ref().map_or(true, |ids| ids.contains(&subject.id)))
        .flat_map(|subject| subject.grades.iter().map(|grade| grade.passed_at))
        .collect();

    dates.into_iter().collect()
}

/// Inclusive sequence from `start` to `end` in steps of `interval_days`.
pub fn date_range(start: NaiveDate, end: NaiveDate, interval_days: i64) -> Vec<NaiveDate> {
    let step = Duration::days(interval_days.max(1));
    let mut dates = Vec::new();
    let mut current = start;

    while current <= end {
        dates.push(current);
        current = match current.checked_add_signed(step) {
            Some(next) => next,
            None => break,
        };
    }

    dates
}

pub fn cutoff_date(since_days: i64) -> NaiveDate {
    Utc::now().date_naive() - Duration::days(since_days.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Grade;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).expect("valid date")
    }

    fn history_fixture() -> (Subject, Vec<Subject>) {
        let maths = Subject::new("Maths")
            .with_grade(Grade::new("quiz", 1000, 2000, day(3)))
            .with_grade(Grade::new("exam", 1800, 2000, day(6)));
        let french = Subject::new("French").with_grade(Grade::new("essay", 1200, 2000, day(4)));
        (maths.clone(), vec![maths, french])
    }

    #[test]
    fn date_range_is_inclusive() {
        let range = date_range(day(1), day(5), 1);
        assert_eq!(range.len(), 5);
        assert_eq!(range.first(), Some(&day(1)));
        assert_eq!(range.last(), Some(&day(5)));

        assert_eq!(date_range(day(1), day(7), 3), vec![day(1), day(4), day(7)]);
        assert!(date_range(day(5), day(1), 1).is_empty());
        assert_eq!(date_range(day(1), day(2), 0).len(), 2);
    }

    #[test]
    fn grade_dates_are_distinct_and_scoped() {
        let root = Subject::new("Sciences");
        let physics = Subject::new("Physics")
            .with_parent(root.id)
            .with_grade(Grade::new("lab", 1000, 2000, day(9)))
            .with_grade(Grade::new("quiz", 1000, 2000, day(2)));
        let french = Subject::new("French").with_grade(Grade::new("essay", 1200, 2000, day(9)));
        let other = Subject::new("Art").with_grade(Grade::new("sketch", 1200, 2000, day(5)));
        let subjects = vec![root.clone(), physics, french, other];

        assert_eq!(grade_dates(&subjects, Some(root.id)), vec![day(2), day(9)]);
        assert_eq!(grade_dates(&subjects, None), vec![day(2), day(5), day(9)]);
    }

    #[test]
    fn sparse_series_samples_grade_days_and_last_day() {
        let (maths, subjects) = history_fixture();
        let series = average_over_time(&subjects, Some(maths.id), day(1), day(8));

        assert_eq!(series.len(), 8);
        assert_eq!(series[0], None);
        assert_eq!(series[1], None);
        assert_eq!(series[2], Some(10.0));
        assert_eq!(series[3], None);
        assert!((series[5].expect("exam day") - 14.0).abs() < 1e-9);
        assert_eq!(series[6], None);
        assert!(series[7].is_some());
    }

    #[test]
    fn last_value_matches_unfiltered_average() {
        let (_, subjects) = history_fixture();
        let series = average_over_time(&subjects, None, day(1), day(20));
        assert_eq!(series.last().copied().flatten(), average(None, &subjects));
    }

    #[test]
    fn last_day_is_always_sampled() {
        let (maths, subjects) = history_fixture();
        let series = average_over_time(&subjects, Some(maths.id), day(1), day(4));
        assert_eq!(series, vec![None, None, Some(10.0), Some(10.0)]);

        let empty = average_over_time(&subjects, Some(maths.id), day(1), day(2));
        assert_eq!(empty, vec![None, None]);
    }

    #[test]
    fn history_pairs_values_with_days() {
        let (maths, subjects) = history_fixture();
        let points = average_history(&subjects, Some(maths.id), day(2), day(3));
        assert_eq!(
            points,
            vec![
                TrendPoint { date: day(2), average: None },
                TrendPoint { date: day(3), average: Some(10.0) },
            ]
        );
    }

    #[test]
    fn as_of_leaves_input_untouched() {
        let (_, subjects) = history_fixture();
        let snapshot = as_of(&subjects, day(3));
        assert_eq!(snapshot[0].grades.len(), 1);
        assert!(snapshot[1].grades.is_empty());
        assert_eq!(subjects[0].grades.len(), 2);
    }

    #[test]
    fn cutoff_date_respects_since_days() {
        let expected = Utc::now().date_naive() - Duration::days(14);
        assert_eq!(cutoff_date(14), expected);
        assert_eq!(cutoff_date(0), Utc::now().date_naive() - Duration::days(1));
    }
}
