//! Hierarchical weighted averages over a forest of graded subjects.
//!
//! The engine modules (`tree`, `average`, `ranking`, `history`, `impact`,
//! `trend`) are pure functions of the subjects they are given. `custom`,
//! `calculator`, `snapshot`, `db` and `report` sit around them and feed or
//! present their results.

pub mod average;
pub mod calculator;
pub mod config;
pub mod custom;
pub mod db;
pub mod error;
pub mod history;
pub mod impact;
pub mod models;
pub mod ranking;
pub mod report;
pub mod snapshot;
pub mod telemetry;
pub mod trend;
pub mod tree;

pub use average::{average, average_for_subject, average_for_subjects, GRADING_SCALE};
pub use calculator::{CardValue, Calculator};
pub use error::EngineError;
pub use history::{average_over_time, date_range, grade_dates};
pub use impact::{grade_impact, subject_impact};
pub use models::{AverageDelta, CustomAverage, CustomAverageSubject, Grade, GradeHighlight, Subject};
pub use trend::{subject_trend, trend};
