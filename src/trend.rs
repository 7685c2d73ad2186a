use chrono::NaiveDate;
use uuid::Uuid;

use crate::history::average_history;
use crate::models::{Subject, SubjectTrend, TrendPoint};

/// Least-squares slope of the average against days elapsed since the first
/// point, in grade points per day. Points without an average are dropped;
/// fewer than two points or a constant x axis give `0.0`.
pub fn trend(points: &[TrendPoint]) -> f64 {
    let known: Vec<(NaiveDate, f64)> = points
        .iter()
        .filter_map(|point| point.average.map(|average| (point.date, average)))
        .collect();

    let Some(&(origin, _)) = known.first() else {
        return 0.0;
    };
    if known.len() < 2 {
        return 0.0;
    }

    let n = known.len() as f64;
    let xs: Vec<f64> = known
        .iter()
        .map(|(date, _)| (*date - origin).num_days() as f64)
        .collect();
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = known.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = xs.iter().zip(&known).map(|(x, (_, y))| x * y).sum();
    let sum_xx: f64 = xs.iter().map(|x| x * x).sum();

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }

    (n * sum_xy - sum_x * sum_y) / denominator
}

/// Slope of a subject's reconstructed history over `[start, end]`.
pub fn subject_trend(subjects: &[Subject], subject_id: Option<Uuid>, start: NaiveDate, end: NaiveDate) -> f64 {
    trend(&average_history(subjects, subject_id, start, end))
}

pub fn best_trend_subject(
    subjects: &[Subject],
    start: NaiveDate,
    end: NaiveDate,
    main_only: bool,
) -> Option<SubjectTrend<'_>> {
    subject_trends(subjects, start, end, main_only)
        .into_iter()
        .fold(None::<SubjectTrend<'_>>, |best, candidate| match best {
            Some(current) if current.trend >= candidate.trend => Some(current),
            _ => Some(candidate),
        })
}

pub fn worst_trend_subject(
    subjects: &[Subject],
    start: NaiveDate,
    end: NaiveDate,
    main_only: bool,
) -> Option<SubjectTrend<'_>> {
    subject_trends(subjects, start, end, main_only)
        .into_iter()
        .fold(None::<SubjectTrend<'_>>, |worst, candidate| match worst {
            Some(current) if current.trend <= candidate.trend => Some(current),
            _ => Some(candidate),
        })
}

/// Slopes of every subject (or every main subject) whose history holds at
/// least one value.
pub fn subject_trends(
    subjects: &[Subject],
    start: NaiveDate,
    end: NaiveDate,
    main_only: bool,
) -> Vec<SubjectTrend<'_>> {
    subjects
        .iter()
        .filter(|subject| !main_only || subject.is_main_subject)
        .filter_map(|subject| {
            let history = average_history(subjects, Some(subject.id), start, end);
            if history.iter().all(|point| point.average.is_none()) {
                return None;
            }
            Some(SubjectTrend {
                subject,
                trend: trend(&history),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Grade;

    const EPS: f64 = 1e-9;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).expect("valid date")
    }

    fn point(d: u32, average: Option<f64>) -> TrendPoint {
        TrendPoint {
            date: day(d),
            average,
        }
    }

    #[test]
    fn slope_of_linear_series() {
        let points = vec![point(1, Some(10.0)), point(2, None), point(3, Some(11.0)), point(5, Some(12.0))];
        assert!((trend(&points) - 0.5).abs() < EPS);
    }

    #[test]
    fn degenerate_series_is_flat() {
        assert_eq!(trend(&[]), 0.0);
        assert_eq!(trend(&[point(1, Some(12.0))]), 0.0);
        assert_eq!(trend(&[point(1, None), point(2, None)]), 0.0);
        assert_eq!(trend(&[point(4, Some(8.0)), point(4, Some(16.0))]), 0.0);
    }

    #[test]
    fn falling_series_has_negative_slope() {
        let points = vec![point(1, Some(16.0)), point(11, Some(12.0))];
        assert!((trend(&points) + 0.4).abs() < EPS);
    }

    fn trend_fixture() -> Vec<Subject> {
        let rising = Subject::new("Rising")
            .main()
            .with_grade(Grade::new("q1", 800, 2000, day(1)))
            .with_grade(Grade::new("q2", 1600, 2000, day(5)));
        let falling = Subject::new("Falling")
            .with_grade(Grade::new("q1", 1800, 2000, day(1)))
            .with_grade(Grade::new("q2", 600, 2000, day(5)));
        let flat = Subject::new("Flat")
            .main()
            .with_grade(Grade::new("q1", 1200, 2000, day(2)))
            .with_grade(Grade::new("q2", 1200, 2000, day(6)));
        let empty = Subject::new("Empty");
        vec![rising, falling, flat, empty]
    }

    #[test]
    fn subject_trend_follows_history() {
        let subjects = trend_fixture();
        let slope = subject_trend(&subjects, Some(subjects[0].id), day(1), day(5));
        assert!((slope - 1.0).abs() < EPS);
    }

    #[test]
    fn best_and_worst_trend_subjects() {
        let subjects = trend_fixture();

        let best = best_trend_subject(&subjects, day(1), day(10), false).expect("trends");
        assert_eq!(best.subject.name, "Rising");
        let worst = worst_trend_subject(&subjects, day(1), day(10), false).expect("trends");
        assert_eq!(worst.subject.name, "Falling");

        let worst_main = worst_trend_subject(&subjects, day(1), day(10), true).expect("trends");
        assert_eq!(worst_main.subject.name, "Flat");
    }

    #[test]
    fn subjects_without_history_are_skipped() {
        let subjects = trend_fixture();
        let trends = subject_trends(&subjects, day(1), day(10), false);
        assert_eq!(trends.len(), 3);
        assert!(trends.iter().all(|entry| entry.subject.name != "Empty"));
        assert_eq!(best_trend_subject(&[Subject::new("Empty")], day(1), day(3), false), None);
    }
}
