use serde::Serialize;
use uuid::Uuid;

use crate::average::average;
use crate::custom::{custom_average, find_custom_average};
use crate::error::EngineError;
use crate::impact::grade_impact;
use crate::models::{AverageDelta, CustomAverage, GradeHighlight, Subject};
use crate::ranking;

/// A summary card's computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calculator {
    GlobalAverage,
    CustomAverage(Uuid),
    BestGrade,
    WorstGrade,
    BestSubject { main_only: bool },
    WorstSubject { main_only: bool },
    GradeImpact(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum CardValue<'a> {
    Average(Option<f64>),
    Grade(Option<GradeHighlight<'a>>),
    Subject(Option<&'a Subject>),
    Impact(Option<AverageDelta>),
}

impl Calculator {
    pub fn evaluate<'a>(
        &self,
        subjects: &'a [Subject],
        customs: &[CustomAverage],
    ) -> Result<CardValue<'a>, EngineError> {
        let value = match *self {
            Calculator::GlobalAverage => CardValue::Average(average(None, subjects)),
            Calculator::CustomAverage(id) => {
                let custom = find_custom_average(customs, id)?;
                CardValue::Average(custom_average(custom, subjects))
            }
            Calculator::BestGrade => CardValue::Grade(ranking::best_grade(subjects)),
            Calculator::WorstGrade => CardValue::Grade(ranking::worst_grade(subjects)),
            Calculator::BestSubject { main_only } => {
                CardValue::Subject(ranking::best_subject(subjects, main_only))
            }
            Calculator::WorstSubject { main_only } => {
                CardValue::Subject(ranking::worst_subject(subjects, main_only))
            }
            Calculator::GradeImpact(grade_id) => {
                CardValue::Impact(grade_impact(grade_id, None, subjects))
            }
        };

        Ok(value)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Calculator::GlobalAverage => "Overall average",
            Calculator::CustomAverage(_) => "Custom average",
            Calculator::BestGrade => "Best grade",
            Calculator::WorstGrade => "Worst grade",
            Calculator::BestSubject { .. } => "Best subject",
            Calculator::WorstSubject { .. } => "Worst subject",
            Calculator::GradeImpact(_) => "Grade impact",
        }
    }
}
