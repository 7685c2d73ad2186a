use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Weight of a subject or grade that carries no explicit coefficient (1.0).
pub const DEFAULT_COEFFICIENT: i32 = 100;

/// Scale applied to stored values, totals and coefficients.
pub const SCALE: f64 = 100.0;

/// Converts a real-unit number (e.g. `15.5`) into its stored ×100 form.
/// `None` when the value is not finite or does not fit the stored integer.
pub fn scale(value: f64) -> Option<i32> {
    let scaled = (value * SCALE).round();
    if !scaled.is_finite() || scaled < i32::MIN as f64 || scaled > i32::MAX as f64 {
        return None;
    }
    Some(scaled as i32)
}

/// Converts a stored ×100 integer back to real units.
pub fn unscale(value: i32) -> f64 {
    value as f64 / SCALE
}

/// A node of the subject forest, with the grades it directly owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub coefficient: i32,
    #[serde(default)]
    pub is_display_subject: bool,
    #[serde(default)]
    pub is_main_subject: bool,
    #[serde(default)]
    pub grades: Vec<Grade>,
}

impl Subject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            parent_id: None,
            coefficient: DEFAULT_COEFFICIENT,
            is_display_subject: false,
            is_main_subject: false,
            grades: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_coefficient(mut self, coefficient: i32) -> Self {
        self.coefficient = coefficient;
        self
    }

    pub fn display(mut self) -> Self {
        self.is_display_subject = true;
        self
    }

    pub fn main(mut self) -> Self {
        self.is_main_subject = true;
        self
    }

    pub fn with_grade(mut self, mut grade: Grade) -> Self {
        grade.subject_id = self.id;
        self.grades.push(grade);
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Real-unit weight of this subject inside its parent.
    pub fn weight(&self) -> f64 {
        unscale(self.coefficient)
    }
}

/// A single graded assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: Uuid,
    pub name: String,
    pub value: i32,
    pub out_of: i32,
    pub coefficient: Option<i32>,
    pub passed_at: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub subject_id: Uuid,
}

impl Grade {
    /// Builds a grade from stored ×100 `value` and `out_of`. The owning
    /// subject is set when the grade is attached with [`Subject::with_grade`].
    pub fn new(name: impl Into<String>, value: i32, out_of: i32, passed_at: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            value,
            out_of,
            coefficient: None,
            passed_at,
            created_at: Utc::now(),
            subject_id: Uuid::nil(),
        }
    }

    pub fn with_coefficient(mut self, coefficient: i32) -> Self {
        self.coefficient = Some(coefficient);
        self
    }

    pub fn weight(&self) -> f64 {
        unscale(self.coefficient.unwrap_or(DEFAULT_COEFFICIENT))
    }

    /// Share of the maximum obtained, or `None` when `out_of` is zero.
    pub fn percentage(&self) -> Option<f64> {
        if self.out_of == 0 {
            return None;
        }
        Some(unscale(self.value) / unscale(self.out_of))
    }
}

/// One entry of a user-defined average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAverageSubject {
    pub id: Uuid,
    #[serde(default)]
    pub custom_coefficient: Option<i32>,
    #[serde(default)]
    pub include_children: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAverage {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    pub subjects: Vec<CustomAverageSubject>,
    #[serde(default)]
    pub is_main_average: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverage {
    pub id: Uuid,
    pub average: f64,
    pub is_main_subject: bool,
}

/// A grade together with the subject that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradeHighlight<'a> {
    pub grade: &'a Grade,
    pub subject: &'a Subject,
}

/// Signed gap between two averages, with the gap relative to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageDelta {
    pub difference: f64,
    pub percentage_change: Option<f64>,
}

impl AverageDelta {
    pub fn between(value: f64, baseline: f64) -> Self {
        let difference = value - baseline;
        let percentage_change = if baseline == 0.0 {
            None
        } else {
            Some((difference / baseline) * 100.0)
        };

        Self {
            difference,
            percentage_change,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubjectTrend<'a> {
    pub subject: &'a Subject,
    pub trend: f64,
}
