use super::*;
use serde_json::json;

#[test]
fn inspect_response_tolerates_missing_optional_fields() {
    let parsed: InspectResponse =
        serde_json::from_value(json!({ "ok": false, "error": "bad upload" })).expect("parse");
    assert!(!parsed.is_ok());
    assert_eq!(parsed.error_message(), Some("bad upload"));
    assert!(parsed.columns.is_empty());
    assert!(parsed.previews.is_empty());
}

#[test]
fn blank_error_text_counts_as_absent() {
    let parsed: AckResponse =
        serde_json::from_value(json!({ "ok": false, "error": "  " })).expect("parse");
    assert_eq!(parsed.error_message(), None);
}

#[test]
fn inspect_response_reads_columns_previews_and_mapping() {
    let parsed: InspectResponse = serde_json::from_value(json!({
        "ok": true,
        "columns": [
            { "name": "来源文件", "is_meta": true, "sources": ["a.xlsx-Sheet1"] },
            { "name": "amount", "is_meta": false, "sources": ["a.xlsx-Sheet1", "b.csv-Sheet1"] }
        ],
        "previews": [
            { "file": "a.xlsx", "sheet": "Sheet1", "columns": ["amount"], "rows": [{ "amount": 3 }] }
        ],
        "mapping": { "a.xlsx-Sheet1": { "Amt": "amount" } }
    }))
    .expect("parse");

    assert!(parsed.is_ok());
    assert_eq!(parsed.columns.len(), 2);
    assert!(parsed.columns[0].is_meta);
    assert_eq!(parsed.columns[1].sources.len(), 2);
    assert_eq!(parsed.previews[0].file, "a.xlsx");
    assert!(parsed.mapping.contains_key("a.xlsx-Sheet1"));
}

#[test]
fn row_cells_follow_column_order_and_blank_nulls() {
    let entry: PreviewEntry = serde_json::from_value(json!({
        "file": "a.xlsx",
        "sheet": "Sheet1",
        "columns": ["name", "qty", "note", "paid"],
        "rows": [{ "paid": true, "note": null, "qty": 2.5, "name": "widget" }]
    }))
    .expect("parse");

    assert_eq!(
        entry.row_cells(&entry.rows[0]),
        vec!["widget", "2.5", "", "true"]
    );
}

#[test]
fn row_cells_leave_missing_columns_blank() {
    let entry: PreviewEntry = serde_json::from_value(json!({
        "file": "a.xlsx",
        "sheet": "Sheet1",
        "columns": ["name", "qty"],
        "rows": [{ "name": "widget" }]
    }))
    .expect("parse");

    assert_eq!(entry.row_cells(&entry.rows[0]), vec!["widget", ""]);
}

#[test]
fn save_mapping_request_wraps_value_under_mappings_key() {
    let body = serde_json::to_value(SaveMappingRequest {
        mappings: json!({ "amount": ["Amt", "金额"] }),
    })
    .expect("serialize");
    assert_eq!(body, json!({ "mappings": { "amount": ["Amt", "金额"] } }));
}

#[test]
fn cleanup_response_defaults_error_list() {
    let parsed: CleanupResponse =
        serde_json::from_value(json!({ "ok": true, "removed": 5 })).expect("parse");
    assert_eq!(parsed.removed, Some(5));
    assert!(parsed.errors.is_empty());
}
