use bonus_bench::orchestrator::mock_steps::MockSteps;
use bonus_bench::orchestrator::{
    BenchOrchestrator, BenchRunState, FileStateStore, RunParams, StateStore,
};
use bonus_bench::runlog::RunLog;
use bonus_bench::TableVariant;
use tempfile::TempDir;

fn params(table: TableVariant) -> RunParams {
    RunParams {
        table,
        record_max: 2000,
        batch_size: 1000,
        fill_batch: 500,
    }
}

fn setup() -> (TempDir, FileStateStore, RunLog) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::new(dir.path().join("logs").join("bench-full-state.json"));
    let log = RunLog::open(dir.path().join("logs").join("run.log"))
        .unwrap()
        .quiet();
    (dir, store, log)
}

fn run_log(dir: &TempDir) -> String {
    std::fs::read_to_string(dir.path().join("logs").join("run.log")).unwrap()
}

#[tokio::test]
async fn test_two_rounds_reach_target_exactly() {
    let (_dir, store, log) = setup();
    let steps = MockSteps::new();

    let outcome = BenchOrchestrator::new(&steps, &store, params(TableVariant::Plain), &log)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.rounds, 2);
    assert_eq!(outcome.total_rows, 2000);
    assert!(!outcome.resumed);
    assert_eq!(steps.rows(TableVariant::Plain), Some(2000));

    let fills: Vec<String> = steps
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("fill"))
        .collect();
    assert_eq!(fills, vec!["fill 1000", "fill 1000"]);
    assert_eq!(steps.calls().iter().filter(|c| *c == "create").count(), 1);

    let state = store.load().unwrap().unwrap();
    assert_eq!(state.total_rows, 2000);
    assert!(state.completed_this_round.queries);
}

#[tokio::test]
async fn test_plain_round_toggles_logging_around_fill() {
    let (_dir, store, log) = setup();
    let steps = MockSteps::new();
    let p = RunParams {
        record_max: 1000,
        ..params(TableVariant::Plain)
    };

    BenchOrchestrator::new(&steps, &store, p, &log)
        .run()
        .await
        .unwrap();

    assert_eq!(
        steps.calls(),
        vec![
            "create", "count", "unlogged", "fill 1000", "count", "logged", "read", "queries"
        ]
    );
}

#[tokio::test]
async fn test_indexed_partitioned_round_rebuilds_index_only() {
    let (_dir, store, log) = setup();
    let steps = MockSteps::new();
    let p = RunParams {
        record_max: 1000,
        ..params(TableVariant::IdxPart)
    };

    BenchOrchestrator::new(&steps, &store, p, &log)
        .run()
        .await
        .unwrap();

    assert_eq!(
        steps.calls(),
        vec![
            "create",
            "count",
            "drop_index",
            "fill 1000",
            "count",
            "create_index",
            "analyze",
            "read",
            "queries"
        ]
    );
}

#[tokio::test]
async fn test_resume_after_fill_goes_straight_to_read() {
    let (dir, store, log) = setup();
    let steps = MockSteps::new();
    steps.fail_next("read");

    let err = BenchOrchestrator::new(&steps, &store, params(TableVariant::Idx), &log)
        .run()
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("injected failure in read"));
    assert!(run_log(&dir).contains("[ERROR] Read benchmark failed"));

    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.current_round, 1);
    assert_eq!(saved.total_rows, 1000);
    assert!(saved.completed_this_round.fill);
    assert!(saved.completed_this_round.maintenance);
    assert!(!saved.completed_this_round.read);

    steps.clear_calls();
    let outcome = BenchOrchestrator::new(&steps, &store, params(TableVariant::Idx), &log)
        .run()
        .await
        .unwrap();
    assert!(outcome.resumed);
    assert_eq!(outcome.total_rows, 2000);

    let calls = steps.calls();
    let first_work = calls.iter().position(|c| c != "count").unwrap();
    assert_eq!(calls[first_work], "read");
    assert_eq!(calls.iter().filter(|c| *c == "create").count(), 0);
    assert_eq!(calls.iter().filter(|c| c.starts_with("fill")).count(), 1);
    assert!(run_log(&dir).contains("State: resuming (round 1, 1000 rows"));
}

#[tokio::test]
async fn test_failed_fill_is_retried() {
    let (_dir, store, log) = setup();
    let steps = MockSteps::new();
    steps.fail_next("fill");

    assert!(
        BenchOrchestrator::new(&steps, &store, params(TableVariant::Part), &log)
            .run()
            .await
            .is_err()
    );
    let saved = store.load().unwrap().unwrap();
    assert!(saved.completed_this_round.create);
    assert!(!saved.completed_this_round.fill);

    let outcome = BenchOrchestrator::new(&steps, &store, params(TableVariant::Part), &log)
        .run()
        .await
        .unwrap();
    assert_eq!(outcome.total_rows, 2000);
    assert_eq!(outcome.rounds, 2);
}

#[tokio::test]
async fn test_missing_table_is_recreated_on_resume() {
    let (dir, store, log) = setup();
    let steps = MockSteps::new();

    let mut state = BenchRunState::fresh(params(TableVariant::Plain));
    state.completed_this_round.create = true;
    state.total_rows = 700;
    store.save(&state).unwrap();

    let outcome = BenchOrchestrator::new(&steps, &store, params(TableVariant::Plain), &log)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.total_rows, 2000);
    assert!(run_log(&dir).contains("Table missing, creating..."));
    let calls = steps.calls();
    assert_eq!(&calls[..3], &["count", "create", "count"]);
}

#[tokio::test]
async fn test_changed_params_start_fresh() {
    let (dir, store, log) = setup();
    let steps = MockSteps::new();

    let mut state = BenchRunState::fresh(RunParams {
        batch_size: 10,
        ..params(TableVariant::Plain)
    });
    state.current_round = 7;
    state.completed_this_round.create = true;
    store.save(&state).unwrap();

    let outcome = BenchOrchestrator::new(&steps, &store, params(TableVariant::Plain), &log)
        .run()
        .await
        .unwrap();

    assert!(!outcome.resumed);
    assert_eq!(outcome.rounds, 2);
    assert!(run_log(&dir).contains("State: new run"));
    assert_eq!(steps.calls()[0], "create");
}

#[tokio::test]
async fn test_prefilled_table_still_benchmarks_once() {
    let (_dir, store, log) = setup();
    let steps = MockSteps::new();
    steps.set_rows(TableVariant::Idx, 5000);

    let outcome = BenchOrchestrator::new(&steps, &store, params(TableVariant::Idx), &log)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.rounds, 1);
    assert_eq!(outcome.total_rows, 5000);
    let calls = steps.calls();
    assert!(!calls.iter().any(|c| c.starts_with("fill")));
    assert!(calls.contains(&"read".to_string()));
    assert!(calls.contains(&"queries".to_string()));
}

#[tokio::test]
async fn test_fill_without_progress_fails() {
    let (_dir, store, log) = setup();
    let steps = MockSteps::new();
    steps.fill_inserts(0);

    let err = BenchOrchestrator::new(&steps, &store, params(TableVariant::Plain), &log)
        .run()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("made no progress"));
}
