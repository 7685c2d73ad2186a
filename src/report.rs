use std::collections::HashMap;
use std::fmt::Write;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::average::average;
use crate::impact::grade_impacts;
use crate::models::{unscale, GradeHighlight, Subject, SubjectAverage};
use crate::{ranking, trend, tree};

fn describe_grade(highlight: &GradeHighlight<'_>) -> String {
    format!(
        "{} in {}: {}/{} (coefficient {}) on {}",
        highlight.grade.name,
        highlight.subject.name,
        unscale(highlight.grade.value),
        unscale(highlight.grade.out_of),
        highlight.grade.weight(),
        highlight.grade.passed_at
    )
}

fn format_average(value: Option<f64>) -> String {
    value.map_or_else(|| "no data".to_string(), |value| format!("{value:.2}/20"))
}

/// Every subject with its depth, each root followed by its subtree.
fn tree_order(subjects: &[Subject]) -> Vec<(&Subject, usize)> {
    tree::roots(subjects)
        .flat_map(|root| {
            std::iter::once(root.id)
                .chain(tree::children(subjects, root.id))
                .filter_map(|id| tree::find(subjects, id))
                .map(|subject| (subject, tree::parents(subjects, subject.id).len()))
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn build_report(label: Option<&str>, cutoff: NaiveDate, today: NaiveDate, subjects: &[Subject]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Grade Averages Report");
    let _ = writeln!(
        output,
        "Generated for {} (trend window {} to {})",
        label.unwrap_or("all subjects"),
        cutoff,
        today
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "Overall average: {}", format_average(average(None, subjects)));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subject Averages");

    let averages: HashMap<Uuid, SubjectAverage> = ranking::subject_averages(subjects)
        .into_iter()
        .map(|entry| (entry.id, entry))
        .collect();
    if averages.is_empty() {
        let _ = writeln!(output, "No graded subjects yet.");
    } else {
        for (subject, depth) in tree_order(subjects) {
            let Some(entry) = averages.get(&subject.id) else {
                continue;
            };
            let _ = writeln!(
                output,
                "{}- {}: {:.2}/20{}",
                "  ".repeat(depth),
                subject.name,
                entry.average,
                if entry.is_main_subject { " (main)" } else { "" }
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highlights");
    match (ranking::best_subject(subjects, false), ranking::worst_subject(subjects, false)) {
        (Some(best), Some(worst)) => {
            let _ = writeln!(output, "- Best subject: {}", best.name);
            let _ = writeln!(output, "- Worst subject: {}", worst.name);
        }
        _ => {
            let _ = writeln!(output, "- No subject has an average yet.");
        }
    }
    if let Some(best) = ranking::best_grade(subjects) {
        let _ = writeln!(output, "- Best grade: {}", describe_grade(&best));
    }
    if let Some(worst) = ranking::worst_grade(subjects) {
        let _ = writeln!(output, "- Worst grade: {}", describe_grade(&worst));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Trend");
    let slope = trend::subject_trend(subjects, None, cutoff, today);
    let _ = writeln!(output, "- Overall: {:+.3} points/day", slope);
    if let Some(rising) = trend::best_trend_subject(subjects, cutoff, today, false) {
        let _ = writeln!(output, "- Rising fastest: {} ({:+.3})", rising.subject.name, rising.trend);
    }
    if let Some(falling) = trend::worst_trend_subject(subjects, cutoff, today, false) {
        let _ = writeln!(output, "- Falling fastest: {} ({:+.3})", falling.subject.name, falling.trend);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Most Impactful Grades");
    let impacts = grade_impacts(subjects);
    if impacts.is_empty() {
        let _ = writeln!(output, "No grades recorded.");
    } else {
        let grades: HashMap<Uuid, (&str, &str)> = subjects
            .iter()
            .flat_map(|s| s.grades.iter().map(move |g| (g.id, (g.name.as_str(), s.name.as_str()))))
            .collect();
        for (grade_id, delta) in impacts.iter().take(5) {
            let (grade, subject) = grades.get(grade_id).copied().unwrap_or(("unknown", "unknown"));
            let _ = writeln!(
                output,
                "- {} ({}): {:+.2} points{}",
                grade,
                subject,
                delta.difference,
                delta
                    .percentage_change
                    .map(|pct| format!(" ({pct:+.1}%)"))
                    .unwrap_or_default()
            );
        }
    }

    output
}
