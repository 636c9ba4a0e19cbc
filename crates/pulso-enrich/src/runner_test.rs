use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tempfile::TempDir;

use super::*;
use crate::classification::Classification;
use crate::error::ClassifierError;

#[derive(Clone, Copy)]
enum Outcome {
    Malformed,
    Unavailable,
}

/// Classifier double: answers every text with the same classification unless
/// scripted otherwise, and records the texts it was asked about.
#[derive(Default)]
struct Scripted {
    outcomes: HashMap<&'static str, Outcome>,
    calls: RefCell<Vec<String>>,
}

impl Scripted {
    fn with(mut self, text: &'static str, outcome: Outcome) -> Self {
        self.outcomes.insert(text, outcome);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl Classifier for Scripted {
    async fn classify(&self, text: &str, prefix: &str) -> Result<Classification, ClassifierError> {
        self.calls.borrow_mut().push(text.to_string());
        match self.outcomes.get(text) {
            Some(Outcome::Malformed) => Err(ClassifierError::Malformed("not JSON".to_string())),
            Some(Outcome::Unavailable) => Err(ClassifierError::RateLimited),
            None => Classification::parse(&completion(prefix), prefix),
        }
    }
}

fn completion(prefix: &str) -> String {
    format!(
        r#"{{"{p}valencia": "neutro", "{p}emocion": "otro", "{p}postura": "indiferencia",
            "{p}tono": "informativo", "{p}amabilidad": 0.5, "{p}legibilidad": 0.9,
            "{p}controversialidad": 0.2, "{p}informatividad": 0.7}}"#,
        p = prefix
    )
}

fn write_input(path: &Path, rows: &[[&str; 3]]) {
    let rows = rows
        .iter()
        .map(|r| vec![r[0].to_string(), r[1].to_string(), r[2].to_string(), "0".to_string()])
        .collect();
    Table::from_rows(["tw_tweet", "tw_texto", "candidato", "tw_likes"], rows)
        .unwrap()
        .write_csv(path)
        .unwrap();
}

fn settings(dir: &TempDir) -> RunnerSettings {
    let mut settings = RunnerSettings::new(dir.path().join("tweets.csv"), dir.path().join("out.csv"));
    settings.pace = Duration::ZERO;
    settings
}

fn three_records(dir: &TempDir) {
    write_input(
        &dir.path().join("tweets.csv"),
        &[
            ["1", "uno", "sandra torres"],
            ["2", "dos", "zury ríos"],
            ["3", "tres", "sandra torres"],
        ],
    );
}

#[tokio::test]
async fn first_run_classifies_each_unique_text_once() {
    let dir = TempDir::new().unwrap();
    write_input(
        &dir.path().join("tweets.csv"),
        &[
            ["1", "uno", "sandra torres"],
            ["2", "uno", "zury ríos"],
            ["3", "dos", "sandra torres"],
        ],
    );
    let settings = settings(&dir);
    let classifier = Scripted::default();

    let summary = run(&classifier, &settings).await.unwrap();

    assert_eq!(classifier.calls(), ["uno", "dos"]);
    assert_eq!(summary.classified, 2);
    let out = Table::read_csv(&settings.output).unwrap();
    assert_eq!(out.columns(), settings.output_columns().as_slice());
    assert_eq!(out.value(0, "tw_candidate"), Some("sandra torres"));
    assert_eq!(out.value(1, "tw_tweet"), Some("3"));
    assert_eq!(out.value(1, "tw_tono"), Some("informativo"));
    assert_eq!(out.value(1, "tw_legibilidad"), Some("0.9"));
}

#[tokio::test]
async fn second_run_without_new_records_changes_nothing() {
    let dir = TempDir::new().unwrap();
    three_records(&dir);
    let settings = settings(&dir);

    run(&Scripted::default(), &settings).await.unwrap();
    let before = fs::read_to_string(&settings.output).unwrap();

    let classifier = Scripted::default();
    let summary = run(&classifier, &settings).await.unwrap();

    assert_eq!(summary.pending, 0);
    assert!(classifier.calls().is_empty());
    assert_eq!(fs::read_to_string(&settings.output).unwrap(), before);
}

#[tokio::test]
async fn resume_after_abort_processes_only_the_rest() {
    let dir = TempDir::new().unwrap();
    three_records(&dir);
    let settings = settings(&dir);

    let failing = Scripted::default().with("tres", Outcome::Unavailable);
    let err = run(&failing, &settings).await.unwrap_err();
    assert!(matches!(
        err,
        EnrichError::Aborted {
            processed: 2,
            source: ClassifierError::RateLimited
        }
    ));
    assert_eq!(Table::read_csv(&settings.output).unwrap().len(), 2);

    let classifier = Scripted::default();
    let summary = run(&classifier, &settings).await.unwrap();
    assert_eq!(classifier.calls(), ["tres"]);
    assert_eq!(summary.classified, 1);

    let out = Table::read_csv(&settings.output).unwrap();
    let texts: Vec<&str> = out.column_values("tw_texto").unwrap().collect();
    assert_eq!(texts, ["uno", "dos", "tres"]);
}

#[tokio::test]
async fn malformed_response_writes_placeholder_and_is_not_retried() {
    let dir = TempDir::new().unwrap();
    three_records(&dir);
    let settings = settings(&dir);

    let classifier = Scripted::default().with("dos", Outcome::Malformed);
    let summary = run(&classifier, &settings).await.unwrap();
    assert_eq!((summary.classified, summary.failed), (2, 1));

    let out = Table::read_csv(&settings.output).unwrap();
    assert_eq!(out.len(), 3);
    assert_eq!(out.value(1, "tw_texto"), Some("dos"));
    assert_eq!(out.value(1, "tw_candidate"), Some("zury ríos"));
    assert_eq!(out.value(1, "tw_valencia"), Some(""));
    assert_eq!(out.value(1, "tw_informatividad"), Some(""));

    let again = Scripted::default();
    run(&again, &settings).await.unwrap();
    assert!(again.calls().is_empty());
}

#[tokio::test]
async fn skip_policy_leaves_failed_record_for_next_run() {
    let dir = TempDir::new().unwrap();
    three_records(&dir);
    let mut settings = settings(&dir);
    settings.on_failure = FailurePolicy::Skip;

    let classifier = Scripted::default().with("dos", Outcome::Malformed);
    let summary = run(&classifier, &settings).await.unwrap();
    assert_eq!((summary.classified, summary.skipped), (2, 1));
    assert_eq!(Table::read_csv(&settings.output).unwrap().len(), 2);

    let again = Scripted::default();
    run(&again, &settings).await.unwrap();
    assert_eq!(again.calls(), ["dos"]);
}

#[tokio::test]
async fn records_with_missing_values_are_dropped_silently() {
    let dir = TempDir::new().unwrap();
    write_input(
        &dir.path().join("tweets.csv"),
        &[
            ["1", "uno", "sandra torres"],
            ["2", "dos", ""],
            ["", "tres", "zury ríos"],
        ],
    );
    let settings = settings(&dir);

    let plan = plan(&settings).unwrap();
    assert_eq!(plan.incomplete, 2);
    assert_eq!(plan.input_records, 3);

    let classifier = Scripted::default();
    let summary = run(&classifier, &settings).await.unwrap();
    assert_eq!(classifier.calls(), ["uno"]);
    assert_eq!((summary.failed, summary.skipped), (0, 0));
}

#[tokio::test]
async fn classifier_receives_sanitized_text_but_output_keeps_original() {
    let dir = TempDir::new().unwrap();
    write_input(
        &dir.path().join("tweets.csv"),
        &[["1", "mira http://x.co ya 😀", "sandra torres"]],
    );
    let settings = settings(&dir);

    let classifier = Scripted::default();
    run(&classifier, &settings).await.unwrap();

    assert_eq!(classifier.calls(), ["mira  ya "]);
    let out = Table::read_csv(&settings.output).unwrap();
    assert_eq!(out.value(0, "tw_texto"), Some("mira http://x.co ya 😀"));
}

#[tokio::test]
async fn match_by_id_ignores_edited_text() {
    let dir = TempDir::new().unwrap();
    three_records(&dir);
    let mut settings = settings(&dir);
    settings.match_key = MatchKey::Id;
    run(&Scripted::default(), &settings).await.unwrap();

    write_input(
        &settings.input,
        &[
            ["1", "uno (editado)", "sandra torres"],
            ["2", "dos", "zury ríos"],
            ["3", "tres", "sandra torres"],
            ["4", "cuatro", "zury ríos"],
        ],
    );

    let by_id = Scripted::default();
    run(&by_id, &settings).await.unwrap();
    assert_eq!(by_id.calls(), ["cuatro"]);

    settings.match_key = MatchKey::Text;
    let by_text = plan(&settings).unwrap();
    let pending: Vec<&str> = by_text.work.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(pending, ["uno (editado)"]);
}

#[tokio::test]
async fn existing_output_is_deduplicated_and_normalized() {
    let dir = TempDir::new().unwrap();
    three_records(&dir);
    let settings = settings(&dir);

    // Legacy layout: no id column, a duplicate row, and an extra column.
    let legacy = Table::from_rows(
        ["tw_texto", "tw_candidate", "tw_valencia", "extra"],
        vec![
            vec!["uno".into(), "sandra torres".into(), "positivo".into(), "x".into()],
            vec!["uno".into(), "sandra torres".into(), "negativo".into(), "y".into()],
        ],
    )
    .unwrap();
    legacy.write_csv(&settings.output).unwrap();

    let plan = plan(&settings).unwrap();
    assert_eq!(plan.output.columns(), settings.output_columns().as_slice());
    assert_eq!(plan.output.len(), 1);
    assert_eq!(plan.output.value(0, "tw_valencia"), Some("positivo"));
    assert_eq!(plan.output.value(0, "tw_tweet"), Some(""));
    assert_eq!(plan.work.len(), 2);
}

#[tokio::test]
async fn append_mode_produces_same_file_as_rewrite() {
    let rewrite_dir = TempDir::new().unwrap();
    three_records(&rewrite_dir);
    let rewrite = settings(&rewrite_dir);
    run(&Scripted::default().with("dos", Outcome::Malformed), &rewrite)
        .await
        .unwrap();

    let append_dir = TempDir::new().unwrap();
    three_records(&append_dir);
    let mut append = settings(&append_dir);
    append.checkpoint = CheckpointMode::Append;
    run(&Scripted::default().with("dos", Outcome::Malformed), &append)
        .await
        .unwrap();

    assert_eq!(
        fs::read_to_string(&append.output).unwrap(),
        fs::read_to_string(&rewrite.output).unwrap()
    );
}

#[tokio::test]
async fn append_mode_resumes_after_abort() {
    let dir = TempDir::new().unwrap();
    three_records(&dir);
    let mut settings = settings(&dir);
    settings.checkpoint = CheckpointMode::Append;

    let failing = Scripted::default().with("dos", Outcome::Unavailable);
    assert!(run(&failing, &settings).await.is_err());
    assert_eq!(Table::read_csv(&settings.output).unwrap().len(), 1);

    let classifier = Scripted::default();
    run(&classifier, &settings).await.unwrap();
    assert_eq!(classifier.calls(), ["dos", "tres"]);
    assert_eq!(Table::read_csv(&settings.output).unwrap().len(), 3);
}

#[tokio::test]
async fn append_mode_recovers_from_half_written_last_row() {
    use std::io::Write;

    let dir = TempDir::new().unwrap();
    three_records(&dir);
    let mut settings = settings(&dir);
    settings.checkpoint = CheckpointMode::Append;

    let failing = Scripted::default().with("tres", Outcome::Unavailable);
    assert!(run(&failing, &settings).await.is_err());
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(&settings.output)
        .unwrap();
    file.write_all(b"tres,sandra").unwrap();
    drop(file);

    let classifier = Scripted::default();
    run(&classifier, &settings).await.unwrap();
    assert_eq!(classifier.calls(), ["tres"]);
    let out = Table::read_csv(&settings.output).unwrap();
    assert_eq!(out.len(), 3);
    let texts: Vec<&str> = out.column_values("tw_texto").unwrap().collect();
    assert_eq!(texts, ["uno", "dos", "tres"]);
}

#[tokio::test]
async fn every_successful_row_holds_valid_scores() {
    let dir = TempDir::new().unwrap();
    three_records(&dir);
    let settings = settings(&dir);
    run(&Scripted::default(), &settings).await.unwrap();

    let out = Table::read_csv(&settings.output).unwrap();
    for field in FIELDS.iter().filter(|f| f.kind == crate::FieldKind::Score) {
        let column = format!("tw_{}", field.name);
        for value in out.column_values(&column).unwrap() {
            let score: f64 = value.parse().unwrap();
            assert!((0.0..=1.0).contains(&score), "{column} = {score}");
        }
    }
}

#[test]
fn missing_input_is_a_table_error() {
    let dir = TempDir::new().unwrap();
    let err = plan(&settings(&dir)).unwrap_err();
    assert!(matches!(err, EnrichError::Table(_)));
}
