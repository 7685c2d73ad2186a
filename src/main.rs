use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use grade_averages::config::AppConfig;
use grade_averages::custom::{custom_average, find_custom_average};
use grade_averages::history::{average_history, cutoff_date};
use grade_averages::models::{AverageDelta, CustomAverage, Subject};
use grade_averages::snapshot::Snapshot;
use grade_averages::{db, impact, ranking, report, telemetry, trend, Calculator, CardValue};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "grade-averages")]
#[command(about = "Weighted grade averages across Group Scholar subject trees", long_about = None)]
struct Cli {
    /// Read subjects from a JSON snapshot instead of Postgres
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,
    /// Owner of the subjects to load from Postgres (defaults to the demo user)
    #[arg(long, global = true)]
    user: Option<Uuid>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import grades from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Compute the overall, a subject's or a custom average
    #[command(group(
        ArgGroup::new("scope")
            .args(["subject", "custom"])
            .multiple(false)
    ))]
    Average {
        #[arg(long)]
        subject: Option<Uuid>,
        #[arg(long)]
        custom: Option<Uuid>,
    },
    /// Rank subjects by average
    Rankings {
        #[arg(long)]
        main_only: bool,
    },
    /// Compare a subject with the mean of other subjects
    #[command(group(
        ArgGroup::new("peers")
            .args(["main_only", "against"])
            .multiple(false)
    ))]
    Compare {
        #[arg(long)]
        subject: Uuid,
        #[arg(long)]
        main_only: bool,
        #[arg(long, num_args = 1..)]
        against: Vec<Uuid>,
    },
    /// Replay the average day by day
    History {
        #[arg(long)]
        subject: Option<Uuid>,
        #[arg(long, default_value_t = 30)]
        since_days: i64,
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,
    },
    /// Measure what a grade or a subject contributes to an average
    #[command(group(
        ArgGroup::new("removed")
            .args(["grade", "impacting"])
            .required(true)
            .multiple(false)
    ))]
    Impact {
        #[arg(long)]
        grade: Option<Uuid>,
        #[arg(long)]
        impacting: Option<Uuid>,
        /// Subject whose average is measured (overall average when omitted)
        #[arg(long)]
        target: Option<Uuid>,
    },
    /// Estimate how fast averages move
    Trend {
        #[arg(long)]
        subject: Option<Uuid>,
        #[arg(long)]
        main_only: bool,
        #[arg(long, default_value_t = 30)]
        since_days: i64,
    },
    /// Evaluate a summary card
    Card {
        #[command(subcommand)]
        kind: CardKind,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value_t = 30)]
        since_days: i64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum CardKind {
    GlobalAverage,
    CustomAverage {
        #[arg(long)]
        id: Uuid,
    },
    BestGrade,
    WorstGrade,
    BestSubject {
        #[arg(long)]
        main_only: bool,
    },
    WorstSubject {
        #[arg(long)]
        main_only: bool,
    },
    GradeImpact {
        #[arg(long)]
        grade: Uuid,
    },
}

impl From<CardKind> for Calculator {
    fn from(kind: CardKind) -> Self {
        match kind {
            CardKind::GlobalAverage => Calculator::GlobalAverage,
            CardKind::CustomAverage { id } => Calculator::CustomAverage(id),
            CardKind::BestGrade => Calculator::BestGrade,
            CardKind::WorstGrade => Calculator::WorstGrade,
            CardKind::BestSubject { main_only } => Calculator::BestSubject { main_only },
            CardKind::WorstSubject { main_only } => Calculator::WorstSubject { main_only },
            CardKind::GradeImpact { grade } => Calculator::GradeImpact(grade),
        }
    }
}

/// Everything a command computes on.
struct Workspace {
    subjects: Vec<Subject>,
    custom_averages: Vec<CustomAverage>,
}

impl Workspace {
    fn name_of(&self, id: Uuid) -> &str {
        self.subjects
            .iter()
            .find(|subject| subject.id == id)
            .map_or("unknown subject", |subject| subject.name.as_str())
    }
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let database_url = config.database.require_url()?;
    PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

fn demo_user() -> anyhow::Result<Uuid> {
    Uuid::parse_str(db::DEMO_USER).context("invalid demo user id")
}

async fn load_workspace(cli: &Cli, config: &AppConfig) -> anyhow::Result<Workspace> {
    if let Some(path) = &cli.snapshot {
        let snapshot = Snapshot::load(path)?;
        return Ok(Workspace {
            subjects: snapshot.subjects,
            custom_averages: snapshot.custom_averages,
        });
    }

    let user_id = match cli.user {
        Some(user_id) => user_id,
        None => demo_user()?,
    };
    let pool = connect(config).await?;
    Ok(Workspace {
        subjects: db::fetch_subjects(&pool, user_id).await?,
        custom_averages: db::fetch_custom_averages(&pool, user_id).await?,
    })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_average(value: Option<f64>) -> String {
    value.map_or_else(|| "no data".to_string(), |value| format!("{value:.2}/20"))
}

fn format_delta(delta: &AverageDelta) -> String {
    match delta.percentage_change {
        Some(pct) => format!("{:+.2} points ({pct:+.1}%)", delta.difference),
        None => format!("{:+.2} points", delta.difference),
    }
}

/// Carries the last known value over the days the history left empty.
fn fill_forward(values: impl IntoIterator<Item = Option<f64>>) -> Vec<Option<f64>> {
    let mut last = None;
    values
        .into_iter()
        .map(|value| {
            if value.is_some() {
                last = value;
            }
            last
        })
        .collect()
}

fn window(since_days: i64, start: Option<NaiveDate>, end: Option<NaiveDate>) -> (NaiveDate, NaiveDate) {
    match (start, end) {
        (Some(start), Some(end)) => (start, end),
        _ => (cutoff_date(since_days), Utc::now().date_naive()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match &cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect(&config).await?;
            let user_id = match cli.user {
                Some(user_id) => user_id,
                None => demo_user()?,
            };
            let inserted = db::import_csv(&pool, user_id, csv).await?;
            println!("Inserted {inserted} grades from {}.", csv.display());
        }
        Commands::Average { subject, custom } => {
            let workspace = load_workspace(&cli, &config).await?;
            let value = match (subject, custom) {
                (_, Some(custom_id)) => {
                    let custom = find_custom_average(&workspace.custom_averages, *custom_id)?;
                    custom_average(custom, &workspace.subjects)
                }
                (subject, None) => grade_averages::average(*subject, &workspace.subjects),
            };

            if cli.json {
                print_json(&value)?;
            } else {
                println!("Average: {}", format_average(value));
            }
        }
        Commands::Rankings { main_only } => {
            let workspace = load_workspace(&cli, &config).await?;
            let averages: Vec<_> = ranking::ranked(ranking::subject_averages(&workspace.subjects))
                .into_iter()
                .filter(|entry| !main_only || entry.is_main_subject)
                .collect();

            if cli.json {
                print_json(&averages)?;
            } else if averages.is_empty() {
                println!("No graded subjects found.");
            } else {
                println!("Subjects by average:");
                for entry in &averages {
                    println!("- {} {:.2}/20", workspace.name_of(entry.id), entry.average);
                }
            }
        }
        Commands::Compare {
            subject,
            main_only,
            against,
        } => {
            let workspace = load_workspace(&cli, &config).await?;
            let peers = (!against.is_empty()).then_some(against.as_slice());
            let comparison =
                ranking::subject_average_comparison(&workspace.subjects, *subject, *main_only, peers)?;

            if cli.json {
                print_json(&comparison)?;
            } else {
                match comparison {
                    Some(delta) => println!(
                        "{} vs peers: {}",
                        workspace.name_of(*subject),
                        format_delta(&delta)
                    ),
                    None => println!("Nothing to compare for this subject."),
                }
            }
        }
        Commands::History {
            subject,
            since_days,
            start,
            end,
        } => {
            let workspace = load_workspace(&cli, &config).await?;
            let (start, end) = window(*since_days, *start, *end);
            let points = average_history(&workspace.subjects, *subject, start, end);
            debug!(points = points.len(), %start, %end, "history computed");

            if cli.json {
                print_json(&points)?;
            } else {
                let filled = fill_forward(points.iter().map(|point| point.average));
                for (point, shown) in points.iter().zip(filled) {
                    let marker = if point.average.is_some() { "*" } else { " " };
                    println!("{} {} {}", point.date, marker, format_average(shown));
                }
            }
        }
        Commands::Impact {
            grade,
            impacting,
            target,
        } => {
            let workspace = load_workspace(&cli, &config).await?;
            let delta = match (grade, impacting) {
                (Some(grade_id), _) => impact::grade_impact(*grade_id, *target, &workspace.subjects),
                (None, Some(subject_id)) => {
                    impact::subject_impact(*subject_id, *target, &workspace.subjects)
                }
                (None, None) => None,
            };

            if cli.json {
                print_json(&delta)?;
            } else {
                match delta {
                    Some(delta) => println!("Impact: {}", format_delta(&delta)),
                    None => println!("No impact could be measured."),
                }
            }
        }
        Commands::Trend {
            subject,
            main_only,
            since_days,
        } => {
            let workspace = load_workspace(&cli, &config).await?;
            let (start, end) = window(*since_days, None, None);

            if subject.is_some() || cli.json {
                let slope = trend::subject_trend(&workspace.subjects, *subject, start, end);
                if cli.json {
                    print_json(&slope)?;
                } else {
                    println!("Trend: {slope:+.3} points/day");
                }
                return Ok(());
            }

            let best = trend::best_trend_subject(&workspace.subjects, start, end, *main_only);
            let worst = trend::worst_trend_subject(&workspace.subjects, start, end, *main_only);
            println!(
                "Overall trend: {:+.3} points/day",
                trend::subject_trend(&workspace.subjects, None, start, end)
            );
            match (best, worst) {
                (Some(best), Some(worst)) => {
                    println!("Rising fastest: {} ({:+.3})", best.subject.name, best.trend);
                    println!("Falling fastest: {} ({:+.3})", worst.subject.name, worst.trend);
                }
                _ => println!("No subject has grades in this window."),
            }
        }
        Commands::Card { kind } => {
            let workspace = load_workspace(&cli, &config).await?;
            let calculator = Calculator::from(*kind);
            let value = calculator.evaluate(&workspace.subjects, &workspace.custom_averages)?;

            if cli.json {
                print_json(&value)?;
            } else {
                let shown = match &value {
                    CardValue::Average(average) => format_average(*average),
                    CardValue::Grade(Some(highlight)) => format!(
                        "{} in {} ({:.1}%)",
                        highlight.grade.name,
                        highlight.subject.name,
                        highlight.grade.percentage().unwrap_or_default() * 100.0
                    ),
                    CardValue::Subject(Some(subject)) => subject.name.clone(),
                    CardValue::Impact(Some(delta)) => format_delta(delta),
                    CardValue::Grade(None) | CardValue::Subject(None) | CardValue::Impact(None) => {
                        "no data".to_string()
                    }
                };
                println!("{}: {}", calculator.title(), shown);
            }
        }
        Commands::Report { since_days, out } => {
            let workspace = load_workspace(&cli, &config).await?;
            let (start, end) = window(*since_days, None, None);
            let label = cli.snapshot.as_ref().map(|path| path.display().to_string());
            let report = report::build_report(label.as_deref(), start, end, &workspace.subjects);
            std::fs::write(out, report)?;
            info!(path = %out.display(), "report written");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_forward_carries_last_value() {
        let filled = fill_forward(vec![None, Some(10.0), None, Some(12.0), None]);
        assert_eq!(filled, vec![None, Some(10.0), Some(10.0), Some(12.0), Some(12.0)]);
    }

    #[test]
    fn window_prefers_explicit_range() {
        let start = NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid date");
        let end = NaiveDate::from_ymd_opt(2025, 9, 30).expect("valid date");
        assert_eq!(window(7, Some(start), Some(end)), (start, end));

        let (from, to) = window(7, None, None);
        assert_eq!((to - from).num_days(), 7);
    }

    #[test]
    fn cli_rejects_conflicting_peer_scopes() {
        let id = Uuid::new_v4().to_string();
        let parsed = Cli::try_parse_from([
            "grade-averages",
            "compare",
            "--subject",
            id.as_str(),
            "--main-only",
            "--against",
            id.as_str(),
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn card_kind_maps_to_calculator() {
        let grade = Uuid::new_v4();
        assert_eq!(
            Calculator::from(CardKind::GradeImpact { grade }),
            Calculator::GradeImpact(grade)
        );
        assert_eq!(
            Calculator::from(CardKind::BestSubject { main_only: true }),
            Calculator::BestSubject { main_only: true }
        );
    }
}
