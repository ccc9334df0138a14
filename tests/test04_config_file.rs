use std::io::Write;

use sql_value_search::prelude::*;

#[test]
fn loads_config_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "database": {{"server": "db.local", "name": "stock", "id": "reader", "port": 14330}},
            "tables": ["STK_STOCK", "STK_DETAIL_PLUGINS_VCHAR"]
        }}"#
    )
    .unwrap();

    let cfg = SearchConfig::load(file.path()).unwrap();

    assert_eq!(cfg.database.port, Some(14330));
    assert_eq!(cfg.tables, ["STK_STOCK", "STK_DETAIL_PLUGINS_VCHAR"]);
}

#[test]
fn missing_file_is_reported_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = SearchConfig::load(dir.path().join("config.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Missing { .. }));
}

#[test]
fn table_override_replaces_configured_list() {
    let cfg = SearchConfig::from_json(
        r#"{"database": {"server": "s", "name": "n", "id": "u"}, "tables": ["A"]}"#,
    )
    .unwrap()
    .with_tables(vec!["B".into(), "C".into()])
    .unwrap();
    assert_eq!(cfg.tables, ["B", "C"]);

    let err = cfg.with_tables(Vec::new()).unwrap_err();
    assert!(matches!(err, ConfigError::Missing { .. }));
}
