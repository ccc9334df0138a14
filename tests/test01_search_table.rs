use chrono::NaiveDate;
use sql_value_search::prelude::*;
use sql_value_search::test_utils::FakeDatabase;

fn stock_db() -> FakeDatabase {
    FakeDatabase::new()
        .with_table(
            "STK_STOCK",
            &[
                ("ID", "int"),
                ("NAME", "nvarchar"),
                ("ORDER_DATE", "date"),
                ("PAYLOAD", "varbinary"),
            ],
        )
        .with_row(
            "STK_STOCK",
            vec![
                RowValues::Int(7),
                RowValues::Text("50tender co".into()),
                RowValues::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()),
                RowValues::Blob(vec![1, 2, 3]),
            ],
        )
}

#[tokio::test]
async fn text_column_match_is_reported_once() {
    let db = stock_db();
    let mut conn = db.connection();

    let found = search_table(&mut conn, &SearchRequest::new("STK_STOCK", "50tender"))
        .await
        .unwrap();

    assert_eq!(
        found,
        vec![MatchResult {
            table_name: "STK_STOCK".into(),
            column_name: "NAME".into(),
            value: RowValues::Text("50tender co".into()),
        }]
    );
}

#[tokio::test]
async fn date_column_matches_iso_and_us_formats() {
    let db = stock_db();
    let mut conn = db.connection();

    for term in ["2024-03", "03/05/2024"] {
        let found = search_table(&mut conn, &SearchRequest::new("STK_STOCK", term))
            .await
            .unwrap();
        assert_eq!(found.len(), 1, "searching {term}");
        assert_eq!(found[0].column_name, "ORDER_DATE");
    }
}

#[tokio::test]
async fn integer_column_matches_exact_value() {
    let db = stock_db();
    let mut conn = db.connection();

    let found = search_table(&mut conn, &SearchRequest::new("STK_STOCK", "7"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].column_name, "ID");
    assert_eq!(found[0].value, RowValues::Int(7));
}

#[tokio::test]
async fn unknown_table_issues_no_probe_query() {
    let db = stock_db();
    let mut conn = db.connection();

    let found = search_table(&mut conn, &SearchRequest::new("NOPE", "50tender"))
        .await
        .unwrap();

    assert!(found.is_empty());
    assert_eq!(db.statements().len(), 1);
    assert!(db.probe_statements().is_empty());
}

#[tokio::test]
async fn incompatible_value_issues_no_probe_query() {
    let db = FakeDatabase::new()
        .with_table("NUMS", &[("QTY", "int"), ("PRICE", "decimal"), ("DAY", "date")])
        .with_row(
            "NUMS",
            vec![RowValues::Int(1), RowValues::Decimal("2.50".into()), RowValues::Null],
        );
    let mut conn = db.connection();

    let found = search_table(&mut conn, &SearchRequest::new("NUMS", "abc"))
        .await
        .unwrap();

    assert!(found.is_empty());
    assert!(db.probe_statements().is_empty());
}

#[tokio::test]
async fn absent_value_yields_empty_result() {
    let db = stock_db();
    let mut conn = db.connection();

    let found = search_table(&mut conn, &SearchRequest::new("STK_STOCK", "zzz-not-there"))
        .await
        .unwrap();

    assert!(found.is_empty());
    assert_eq!(db.probe_statements().len(), 1);
}

#[tokio::test]
async fn probe_query_selects_all_columns_and_binds_the_value() {
    let db = stock_db();
    let mut conn = db.connection();

    search_table(&mut conn, &SearchRequest::new("STK_STOCK", "50tender"))
        .await
        .unwrap();

    let probes = db.probe_statements();
    assert_eq!(probes.len(), 1);
    let sql = &probes[0];
    assert!(sql.starts_with(
        "SELECT TOP (1) [ID], [NAME], [ORDER_DATE], [PAYLOAD] FROM [STK_STOCK] WHERE "
    ));
    assert!(sql.contains("[NAME] LIKE @P2"));
    assert!(!sql.contains("[PAYLOAD] LIKE"));
    assert!(!sql.contains("50tender"));
}

#[tokio::test]
async fn binary_only_match_is_not_reported() {
    let db = FakeDatabase::new()
        .with_table("T", &[("NAME", "nvarchar"), ("CODE", "varbinary")])
        .with_row("T", vec![RowValues::Text("x".into()), RowValues::Blob(vec![0x12, 0x34])]);
    let mut conn = db.connection();

    let found = search_table(&mut conn, &SearchRequest::new("T", "1234"))
        .await
        .unwrap();

    assert!(found.is_empty());
    assert_eq!(db.probe_statements().len(), 1);
    assert!(db.probe_statements()[0].ends_with("WHERE [NAME] LIKE @P2"));
}

#[tokio::test]
async fn like_wildcards_in_the_value_match_literally() {
    let db = FakeDatabase::new()
        .with_table("T", &[("NAME", "nvarchar")])
        .with_row("T", vec![RowValues::Text("500 units".into())])
        .with_row("T", vec![RowValues::Text("50% off".into())]);
    let mut conn = db.connection();

    let found = search_table(&mut conn, &SearchRequest::new("T", "50%"))
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].value, RowValues::Text("50% off".into()));
}

#[tokio::test]
async fn long_number_skips_narrow_decimal_column() {
    let db = FakeDatabase::new()
        .with_table("PRODUCTS", &[("PRICE", "decimal(10,2)"), ("BARCODE", "nvarchar")])
        .with_row(
            "PRODUCTS",
            vec![
                RowValues::Decimal("12.50".into()),
                RowValues::Text("400638133393112345678901234567".into()),
            ],
        );
    let mut conn = db.connection();

    let found = search_table(
        &mut conn,
        &SearchRequest::new("PRODUCTS", "400638133393112345678901234567"),
    )
    .await
    .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].column_name, "BARCODE");
    assert!(!db.probe_statements()[0].contains("[PRICE] = @P1"));

    let found = search_table(&mut conn, &SearchRequest::new("PRODUCTS", "12.5"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].column_name, "PRICE");
}
