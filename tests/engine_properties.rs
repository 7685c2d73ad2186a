use chrono::NaiveDate;
use grade_averages::history::average_over_time;
use grade_averages::ranking::{best_grade, worst_grade};
use grade_averages::{average, grade_impact, subject_impact, Grade, Subject};
use uuid::Uuid;

const EPS: f64 = 1e-9;

fn day(month: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, d).expect("valid date")
}

/// A school year: a display group of options, nested sciences and a plain root.
fn school_year() -> Vec<Subject> {
    let year = Subject::new("Year 11").main();
    let options = Subject::new("Options").display().with_parent(year.id);
    let latin = Subject::new("Latin")
        .with_parent(options.id)
        .with_coefficient(150)
        .with_grade(Grade::new("Translation", 1400, 2000, day(9, 15)))
        .with_grade(Grade::new("Vocabulary", 900, 1000, day(10, 6)));
    let sciences = Subject::new("Sciences")
        .with_parent(year.id)
        .with_coefficient(300)
        .main();
    let physics = Subject::new("Physics")
        .with_parent(sciences.id)
        .with_coefficient(200)
        .with_grade(Grade::new("Optics", 3000, 4000, day(9, 20)).with_coefficient(200))
        .with_grade(Grade::new("Retake", 1200, 0, day(9, 22)));
    let chemistry = Subject::new("Chemistry")
        .with_parent(sciences.id)
        .with_grade(Grade::new("Titration", 1100, 2000, day(10, 1)));
    let french = Subject::new("French")
        .main()
        .with_coefficient(250)
        .with_grade(Grade::new("Essay", 1250, 2000, day(9, 30)));
    let art = Subject::new("Art");

    vec![year, options, latin, sciences, physics, chemistry, french, art]
}

#[test]
fn subject_without_data_has_no_average() {
    let subjects = school_year();
    let art = subjects.iter().find(|s| s.name == "Art").expect("fixture");
    assert_eq!(average(Some(art.id), &subjects), None);
}

#[test]
fn display_group_is_transparent() {
    let subjects = school_year();
    let year_id = subjects[0].id;
    let options_id = subjects[1].id;

    let flattened: Vec<Subject> = subjects
        .iter()
        .filter(|s| s.id != options_id)
        .cloned()
        .map(|mut s| {
            if s.parent_id == Some(options_id) {
                s.parent_id = Some(year_id);
            }
            s
        })
        .collect();

    let wrapped = average(Some(year_id), &subjects).expect("year has data");
    let direct = average(Some(year_id), &flattened).expect("year has data");
    assert!((wrapped - direct).abs() < EPS);
}

#[test]
fn coefficients_weight_percentages() {
    let subject = Subject::new("S")
        .with_grade(Grade::new("a", 1000, 2000, day(1, 1)).with_coefficient(100))
        .with_grade(Grade::new("b", 1600, 2000, day(1, 2)).with_coefficient(300));
    let id = subject.id;
    let value = average(Some(id), &[subject]).expect("graded");
    assert!((value - 14.0).abs() < EPS);
}

#[test]
fn zero_total_grade_changes_nothing() {
    let subjects = school_year();
    let physics_id = subjects[4].id;
    let with_retake = average(Some(physics_id), &subjects);

    let mut without = subjects.clone();
    without[4].grades.retain(|grade| grade.out_of != 0);
    assert_eq!(with_retake, average(Some(physics_id), &without));
    assert!((with_retake.expect("graded") - 15.0).abs() < EPS);
}

#[test]
fn grade_impact_matches_manual_removal_and_leaves_input_alone() {
    let subjects = school_year();
    let before = subjects.clone();
    let latin = &subjects[2];
    let grade_id = latin.grades[1].id;

    for target in [Some(latin.id), Some(subjects[0].id), None] {
        let impact = grade_impact(grade_id, target, &subjects).expect("grade exists");

        let mut removed = subjects.clone();
        removed[2].grades.retain(|grade| grade.id != grade_id);
        let with = average(target, &subjects).expect("data");
        let without = average(target, &removed).expect("data");

        assert_eq!(impact.difference, with - without);
    }

    assert_eq!(subjects, before);
}

#[test]
fn subject_impact_measures_subtree() {
    let subjects = school_year();
    let sciences_id = subjects[3].id;
    let year_id = subjects[0].id;

    let impact = subject_impact(sciences_id, Some(year_id), &subjects).expect("subject exists");
    let removed: Vec<Subject> = subjects
        .iter()
        .filter(|s| s.id != sciences_id && s.parent_id != Some(sciences_id))
        .cloned()
        .collect();
    let expected = average(Some(year_id), &subjects).expect("data")
        - average(Some(year_id), &removed).expect("data");
    assert_eq!(impact.difference, expected);
    assert_eq!(subject_impact(Uuid::new_v4(), None, &subjects), None);
}

#[test]
fn history_ends_on_current_average() {
    let subjects = school_year();
    for target in [None, Some(subjects[0].id), Some(subjects[3].id)] {
        let series = average_over_time(&subjects, target, day(9, 1), day(10, 31));
        assert_eq!(series.len(), 61);
        assert_eq!(series.last().copied().flatten(), average(target, &subjects));
    }
}

#[test]
fn best_grade_breaks_ties_by_coefficient() {
    let subject = Subject::new("Maths")
        .with_grade(Grade::new("plain", 1500, 2000, day(3, 1)))
        .with_grade(Grade::new("weighted", 1500, 2000, day(3, 2)).with_coefficient(400))
        .with_grade(Grade::new("low", 500, 2000, day(3, 3)).with_coefficient(200))
        .with_grade(Grade::new("low heavy", 500, 2000, day(3, 4)).with_coefficient(300));
    let subjects = vec![subject];

    assert_eq!(best_grade(&subjects).map(|h| h.grade.name.as_str()), Some("weighted"));
    assert_eq!(worst_grade(&subjects).map(|h| h.grade.name.as_str()), Some("low heavy"));
}

#[test]
fn single_root_scenario() {
    let maths = Subject::new("M").with_grade(Grade::new("g", 1000, 2000, day(4, 1)).with_coefficient(100));
    let id = maths.id;
    let subjects = vec![maths];

    assert_eq!(average(None, &subjects), Some(10.0));
    assert_eq!(average(Some(id), &subjects), Some(10.0));
    assert_eq!(average(Some(Uuid::new_v4()), &subjects), None);
}
