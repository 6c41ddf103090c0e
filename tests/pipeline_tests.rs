//! End-to-end pipeline tests over real files.

use std::io::Write;
use storescout_core::{
    DataFormat, ParseStrategy, Result, ScheduleHint, StorageType, StoreScout,
    StoreScoutConfig,
};
use tempfile::NamedTempFile;

fn write_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn scout() -> StoreScout {
    StoreScout::new(StoreScoutConfig::default())
}

#[test]
fn test_csv_analysis_roundtrip() -> Result<()> {
    let file = write_file("id,created_at,price\n1,2024-01-01 10:00:00,9.99\n2,2024-01-02 11:30:00,19.50\n3,2024-01-03 08:15:00,4.25\n");
    let report = scout().analyze(file.path(), Some(DataFormat::Csv))?;

    assert_eq!(report.data_profile.format, DataFormat::Csv);
    assert_eq!(report.data_profile.record_count, 3);
    assert_eq!(report.data_profile.field_count, 3);
    assert!(report.data_profile.has_temporal);
    assert!(report.data_profile.has_numeric);
    assert!(report.data_profile.unique_ids.contains(&"id".to_string()));
    assert!(report.validation_warnings.is_empty());
    assert_eq!(
        report.file_info.unwrap().parsing_strategy,
        ParseStrategy::Full
    );
    Ok(())
}

#[test]
fn test_json_analysis_roundtrip() -> Result<()> {
    let file = write_file(
        r#"[{"id": 1, "name": "a", "meta": {"score": 0.5}},
            {"id": 2, "name": "b", "meta": {"score": 0.9}}]"#,
    );
    let report = scout().analyze(file.path(), Some(DataFormat::Json))?;

    assert_eq!(report.data_profile.record_count, 2);
    assert!(report.features.columns.contains(&"meta_score".to_string()));
    assert!(report.data_profile.has_numeric);
    Ok(())
}

#[test]
fn test_xml_analysis_roundtrip() -> Result<()> {
    let mut body = String::from("<export>");
    for i in 0..12 {
        body.push_str(&format!(
            "<row><code>{i}</code><amount>{}</amount></row>",
            i * 10
        ));
    }
    body.push_str("</export>");
    let file = write_file(&body);

    let report = scout().analyze(file.path(), Some(DataFormat::Xml))?;
    assert_eq!(report.data_profile.record_count, 12);
    assert_eq!(report.data_profile.field_count, 2);
    assert!(report.data_profile.has_numeric);
    Ok(())
}

#[test]
fn test_feature_extraction_is_idempotent() -> Result<()> {
    let file = write_file("id,category,price\n1,a,5.0\n2,b,6.0\n3,a,7.0\n4,b,8.0\n");
    let scout = scout();
    let first = scout.analyze(file.path(), Some(DataFormat::Csv))?;
    let second = scout.analyze(file.path(), Some(DataFormat::Csv))?;
    assert_eq!(first.features, second.features);
    assert_eq!(first.data_profile, second.data_profile);
    Ok(())
}

#[tokio::test]
async fn test_recommendation_for_small_temporal_dataset() -> Result<()> {
    let file = write_file("id,created_at,price\n1,2024-01-01 10:00:00,9.99\n2,2024-01-02 11:30:00,19.50\n3,2024-01-03 08:15:00,4.25\n");
    let rec = scout()
        .recommend(file.path(), Some(DataFormat::Csv), "orders")
        .await?;

    // Small datasets land on the relational default path.
    assert_eq!(rec.target, StorageType::PostgreSql);
    assert_eq!(rec.schedule_hint, ScheduleHint::Daily);
    assert!(rec.confidence >= 0.6);
    assert!(!rec.augmented);

    // The generated schema keys on the identifier and indexes the time axis.
    // Small integer ids narrow during optimization.
    assert!(rec.ddl_script.contains("id INTEGER PRIMARY KEY"));
    assert!(rec
        .ddl_script
        .contains("CREATE INDEX idx_orders_created_at ON orders (created_at);"));
    Ok(())
}

#[tokio::test]
async fn test_recommendation_is_deterministic() -> Result<()> {
    let file = write_file("id,name,price\n1,a,5.0\n2,b,6.0\n3,c,7.0\n");
    let scout = scout();
    let first = scout
        .recommend(file.path(), Some(DataFormat::Csv), "t")
        .await?;
    let second = scout
        .recommend(file.path(), Some(DataFormat::Csv), "t")
        .await?;
    assert_eq!(first.target, second.target);
    assert_eq!(first.rationale, second.rationale);
    assert_eq!(first.ddl_script, second.ddl_script);
    Ok(())
}

#[tokio::test]
async fn test_cadastral_csv_gets_spatial_schema() -> Result<()> {
    let file = write_file(
        "cad_number,latitude,longitude,status\n\
         16:50:010101:1,55.79,49.12,active\n\
         16:50:010101:2,55.80,49.13,archived\n\
         16:50:010101:3,55.81,49.14,active\n",
    );
    let rec = scout()
        .recommend(file.path(), Some(DataFormat::Csv), "parcels")
        .await?;

    assert!(rec.data_profile.has_spatial);
    assert_eq!(rec.target, StorageType::PostgreSql);
    assert!(rec.ddl_script.contains("CREATE EXTENSION IF NOT EXISTS postgis;"));
    assert!(rec.ddl_script.contains("latitude GEOMETRY(POINT, 4326)"));
    assert!(rec
        .ddl_script
        .contains("CREATE INDEX idx_parcels_latitude ON parcels USING GIST (latitude);"));
    Ok(())
}

#[test]
fn test_empty_file_is_rejected() {
    let file = write_file("a,b,c\n");
    let result = scout().analyze(file.path(), Some(DataFormat::Csv));
    assert!(result.is_err());
}

#[test]
fn test_unknown_format_is_rejected() {
    let file = write_file("whatever");
    // No extension, no filename keyword.
    let result = scout().analyze(file.path(), None);
    assert!(result.is_err());
}

#[test]
fn test_format_override_beats_detection() -> Result<()> {
    // JSON content in a file with no telling name.
    let file = write_file(r#"[{"id": 1, "v": 2}, {"id": 2, "v": 3}]"#);
    let report = scout().analyze(file.path(), Some(DataFormat::Json))?;
    assert_eq!(report.data_profile.format, DataFormat::Json);
    Ok(())
}

#[test]
fn test_validation_warnings_surface_in_report() -> Result<()> {
    let file = write_file("id,note\n1,\n2,\n3,\n4,\n5,\n6,x\n");
    let report = scout().analyze(file.path(), Some(DataFormat::Csv))?;
    assert!(report
        .validation_warnings
        .iter()
        .any(|w| w.contains("note")));
    Ok(())
}
