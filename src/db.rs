use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{scale, CustomAverage, CustomAverageSubject, Grade, Subject};
use crate::tree;

/// Owner of the rows inserted by [`seed`].
pub const DEMO_USER: &str = "6b0f3c1e-5a7d-4c25-9f0e-2d8a1b7c4e90";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let user_id = Uuid::parse_str(DEMO_USER)?;
    let maths = Uuid::parse_str("a3c6e0f2-1b4d-4e8a-9c7f-0d2e5b8a1c3f")?;
    let sciences = Uuid::parse_str("b7d1f4a9-2c5e-4f0b-8a6d-1e3c9f2b7d40")?;
    let physics = Uuid::parse_str("c2e8a5b1-3d6f-4a1c-9b7e-2f4d0a3c8e51")?;
    let chemistry = Uuid::parse_str("d9f3b6c2-4e7a-4b2d-8c8f-3a5e1b4d9f62")?;
    let french = Uuid::parse_str("e4a0c7d3-5f8b-4c3e-9d9a-4b6f2c5e0a73")?;

    let subjects = vec![
        (maths, "Maths", None, 400, false, true),
        (sciences, "Sciences", None, 300, true, false),
        (physics, "Physics", Some(sciences), 300, false, true),
        (chemistry, "Chemistry", Some(sciences), 200, false, false),
        (french, "French", None, 300, false, true),
    ];

    for (id, name, parent_id, coefficient, is_display, is_main) in subjects {
        sqlx::query(
            r#"
            INSERT INTO grade_averages.subjects
            (id, user_id, name, parent_id, coefficient, is_display_subject, is_main_subject)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, parent_id = EXCLUDED.parent_id,
                coefficient = EXCLUDED.coefficient,
                is_display_subject = EXCLUDED.is_display_subject,
                is_main_subject = EXCLUDED.is_main_subject
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(name)
        .bind(parent_id)
        .bind(coefficient)
        .bind(is_display)
        .bind(is_main)
        .execute(pool)
        .await?;
    }

    let grades = vec![
        ("seed-001", maths, "Algebra quiz", 1450, 2000, None, (2025, 9, 12)),
        ("seed-002", maths, "Geometry test", 1200, 2000, Some(200), (2025, 10, 3)),
        ("seed-003", physics, "Optics lab", 3600, 4000, None, (2025, 9, 19)),
        ("seed-004", physics, "Mechanics exam", 1100, 2000, Some(300), (2025, 10, 10)),
        ("seed-005", chemistry, "Titration lab", 850, 1000, None, (2025, 9, 26)),
        ("seed-006", french, "Essay", 1350, 2000, Some(200), (2025, 9, 22)),
        ("seed-007", french, "Oral", 1650, 2000, None, (2025, 10, 14)),
    ];

    for (source_key, subject_id, name, value, out_of, coefficient, (y, m, d)) in grades {
        let passed_at = NaiveDate::from_ymd_opt(y, m, d).context("invalid date")?;
        insert_grade(pool, user_id, subject_id, name, value, out_of, coefficient, passed_at, source_key).await?;
    }

    let custom_id = Uuid::parse_str("f5b1d8e4-6a9c-4d4f-8e0b-5c7a3d6f1b84")?;
    sqlx::query(
        r#"
        INSERT INTO grade_averages.custom_averages (id, user_id, name, is_main_average)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(custom_id)
    .bind(user_id)
    .bind("Science track")
    .bind(true)
    .execute(pool)
    .await?;

    let entries = vec![(physics, 0, Some(500), None), (maths, 1, None, Some(false))];
    for (subject_id, position, custom_coefficient, include_children) in entries {
        sqlx::query(
            r#"
            INSERT INTO grade_averages.custom_average_subjects
            (custom_average_id, subject_id, position, custom_coefficient, include_children)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (custom_average_id, subject_id) DO NOTHING
            "#,
        )
        .bind(custom_id)
        .bind(subject_id)
        .bind(position)
        .bind(custom_coefficient)
        .bind(include_children)
        .execute(pool)
        .await?;
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn insert_grade(
    pool: &PgPool,
    user_id: Uuid,
    subject_id: Uuid,
    name: &str,
    value: i32,
    out_of: i32,
    coefficient: Option<i32>,
    passed_at: NaiveDate,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO grade_averages.grades
        (id, user_id, subject_id, name, value, out_of, coefficient, passed_at, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(subject_id)
    .bind(name)
    .bind(value)
    .bind(out_of)
    .bind(coefficient)
    .bind(passed_at)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Materializes a user's full subject forest with grades embedded.
pub async fn fetch_subjects(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Subject>> {
    let grade_rows = sqlx::query(
        "SELECT id, subject_id, name, value, out_of, coefficient, passed_at, created_at \
         FROM grade_averages.grades \
         WHERE user_id = $1 \
         ORDER BY passed_at, created_at",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut grades: HashMap<Uuid, Vec<Grade>> = HashMap::new();
    for row in grade_rows {
        let subject_id: Uuid = row.get("subject_id");
        let created_at: DateTime<Utc> = row.get("created_at");
        grades.entry(subject_id).or_default().push(Grade {
            id: row.get("id"),
            name: row.get("name"),
            value: row.get("value"),
            out_of: row.get("out_of"),
            coefficient: row.get("coefficient"),
            passed_at: row.get("passed_at"),
            created_at,
            subject_id,
        });
    }

    let subject_rows = sqlx::query(
        "SELECT id, name, parent_id, coefficient, is_display_subject, is_main_subject \
         FROM grade_averages.subjects \
         WHERE user_id = $1 \
         ORDER BY created_at, name",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut subjects = Vec::with_capacity(subject_rows.len());
    for row in subject_rows {
        let id: Uuid = row.get("id");
        subjects.push(Subject {
            id,
            name: row.get("name"),
            parent_id: row.get("parent_id"),
            coefficient: row.get("coefficient"),
            is_display_subject: row.get("is_display_subject"),
            is_main_subject: row.get("is_main_subject"),
            grades: grades.remove(&id).unwrap_or_default(),
        });
    }

    tree::validate(&subjects).context("stored subjects do not form a valid tree")?;
    info!(%user_id, subjects = subjects.len(), "subjects loaded from database");
    Ok(subjects)
}

pub async fn fetch_custom_averages(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<CustomAverage>> {
    let rows = sqlx::query(
        "SELECT ca.id, ca.name, ca.is_main_average, \
         cas.subject_id, cas.custom_coefficient, cas.include_children \
         FROM grade_averages.custom_averages ca \
         LEFT JOIN grade_averages.custom_average_subjects cas ON cas.custom_average_id = ca.id \
         WHERE ca.user_id = $1 \
         ORDER BY ca.name, ca.id, cas.position",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut averages: Vec<CustomAverage> = Vec::new();
    for row in rows {
        let id: Uuid = row.get("id");
        if averages.last().map(|average| average.id) != Some(id) {
            averages.push(CustomAverage {
                id,
                name: row.get("name"),
                user_id,
                subjects: Vec::new(),
                is_main_average: row.get("is_main_average"),
            });
        }

        let subject_id: Option<Uuid> = row.get("subject_id");
        if let (Some(subject_id), Some(average)) = (subject_id, averages.last_mut()) {
            average.subjects.push(CustomAverageSubject {
                id: subject_id,
                custom_coefficient: row.get("custom_coefficient"),
                include_children: row.get("include_children"),
            });
        }
    }

    Ok(averages)
}

fn scaled_field(grade: &str, field: &str, value: f64) -> anyhow::Result<i32> {
    scale(value).with_context(|| format!("grade {grade:?} has an unusable {field}: {value}"))
}

/// Imports grades from a CSV with real-unit values (`15.5`, `20`), scaled on
/// the way in. Subjects are matched by name for `user_id`.
pub async fn import_csv(pool: &PgPool, user_id: Uuid, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        subject: String,
        name: String,
        value: f64,
        out_of: f64,
        coefficient: Option<f64>,
        passed_at: NaiveDate,
        source_key: Option<String>,
    }

    let subject_ids: HashMap<String, Uuid> = sqlx::query(
        "SELECT id, name FROM grade_averages.subjects WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| (row.get("name"), row.get("id")))
    .collect();

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let Some(&subject_id) = subject_ids.get(&row.subject) else {
            warn!(subject = %row.subject, grade = %row.name, "skipping grade for unknown subject");
            continue;
        };

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let value = scaled_field(&row.name, "value", row.value)?;
        let out_of = scaled_field(&row.name, "out_of", row.out_of)?;
        let coefficient = row
            .coefficient
            .map(|coefficient| scaled_field(&row.name, "coefficient", coefficient))
            .transpose()?;

        let added = insert_grade(
            pool,
            user_id,
            subject_id,
            &row.name,
            value,
            out_of,
            coefficient,
            row.passed_at,
            &source_key,
        )
        .await?;

        if added {
            inserted += 1;
        }
    }

    Ok(inserted)
}
