use std::time::Duration;

use sql_value_search::prelude::*;
use sql_value_search::test_utils::FakeDatabase;

fn three_tables() -> FakeDatabase {
    FakeDatabase::new()
        .with_table("A", &[("NAME", "varchar")])
        .with_row("A", vec![RowValues::Text("acme 50tender".into())])
        .with_table("B", &[("NAME", "varchar")])
        .with_row("B", vec![RowValues::Text("50tender b".into())])
        .with_table("C", &[("CODE", "nvarchar"), ("NOTE", "text")])
        .with_row(
            "C",
            vec![
                RowValues::Text("X-50TENDER".into()),
                RowValues::Text("see 50tender".into()),
            ],
        )
}

fn tables(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

#[tokio::test]
async fn sequential_search_survives_a_failing_table() {
    let db = three_tables().failing_on("B");
    let mut conn = db.connection();

    let report = search_tables(&mut conn, &tables(&["A", "B", "C"]), "50tender", None).await;

    let found: Vec<String> = report.matches.iter().map(ToString::to_string).collect();
    assert_eq!(
        found,
        [
            "A:NAME = acme 50tender",
            "C:CODE = X-50TENDER",
            "C:NOTE = see 50tender",
        ]
    );
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].table_name, "B");
    assert_eq!(report.tables_searched, 3);
}

#[tokio::test]
async fn repeated_tables_do_not_duplicate_matches() {
    let db = three_tables();
    let mut conn = db.connection();

    let report = search_tables(&mut conn, &tables(&["A", "A"]), "50tender", None).await;

    assert_eq!(report.matches.len(), 1);
}

#[tokio::test]
async fn absent_value_gives_empty_report_without_failures() {
    let db = three_tables();
    let searcher = Searcher::new(db, tables(&["A", "B", "C"]), SearchOptions::default());

    let report = searcher.search("nothing-like-this").await;

    assert!(report.is_empty());
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn concurrent_search_keeps_table_order_and_uses_own_connections() {
    let db = three_tables()
        .slow_on("A", Duration::from_millis(50))
        .failing_on("B");
    let options = SearchOptions {
        concurrency: 3,
        table_timeout: Some(Duration::from_secs(5)),
    };
    let searcher = Searcher::new(db.clone(), tables(&["A", "B", "C"]), options);

    let report = searcher.search("50tender").await;

    let order: Vec<&str> = report.matches.iter().map(|m| m.table_name.as_str()).collect();
    assert_eq!(order, ["A", "C", "C"]);
    assert_eq!(report.failures[0].table_name, "B");
    assert_eq!(db.connections_opened(), 3);
}

#[tokio::test]
async fn slow_table_times_out_without_stopping_the_rest() {
    let db = three_tables().slow_on("B", Duration::from_millis(500));
    let options = SearchOptions {
        concurrency: 2,
        table_timeout: Some(Duration::from_millis(50)),
    };
    let searcher = Searcher::new(db, tables(&["A", "B", "C"]), options);

    let report = searcher.search("50tender").await;

    assert_eq!(report.matches.len(), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].table_name, "B");
    assert!(report.failures[0].error.contains("deadline"));
}

#[tokio::test]
async fn unreachable_server_fails_every_table_individually() {
    let db = three_tables().unreachable();
    let searcher = Searcher::new(db, tables(&["A", "B"]), SearchOptions::default());

    let report = searcher.search("50tender").await;

    assert!(report.matches.is_empty());
    assert_eq!(report.failures.len(), 2);
}

#[tokio::test]
async fn sequential_search_stops_using_a_timed_out_connection() {
    let db = three_tables().slow_on("B", Duration::from_millis(500));
    let mut conn = db.connection();

    let report = search_tables(
        &mut conn,
        &tables(&["A", "B", "C"]),
        "50tender",
        Some(Duration::from_millis(50)),
    )
    .await;

    assert_eq!(report.matches.len(), 1);
    assert_eq!(report.matches[0].table_name, "A");
    let failed: Vec<&str> = report.failures.iter().map(|f| f.table_name.as_str()).collect();
    assert_eq!(failed, ["B", "C"]);
    assert!(report.failures[0].error.contains("deadline"));
    assert!(report.failures[1].error.contains("abandoned"));
    assert_eq!(report.tables_searched, 3);
    // catalog and row query for A and B only
    assert_eq!(db.statements().len(), 4);
}
