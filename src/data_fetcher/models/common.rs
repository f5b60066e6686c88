//! Envelope handling shared by every NEIS dataset.
//!
//! A populated response looks like
//! `{ "<dataset>": [ { "head": [...] }, { "row": [ {...}, ... ] } ] }`.
//! When nothing matches, the hub answers with a bare
//! `{ "RESULT": { "CODE": "INFO-200", "MESSAGE": "..." } }` instead.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::constants::neis::NO_DATA_CODE;

/// A normalized row built from one upstream row object.
pub trait FromUpstreamRow: Sized {
    fn from_row(row: &Map<String, Value>) -> Self;
}

/// Reads `key` from an upstream row as a string.
///
/// Missing keys and nulls become `""`; numbers and booleans are rendered in
/// their plain string form so callers never deal with absent values.
pub fn text_field(row: &Map<String, Value>, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Result code and message of the top-level `RESULT` object, if present.
pub fn upstream_result(body: &Value) -> Option<(String, String)> {
    let result = body.get("RESULT")?;
    let code = result.get("CODE")?.as_str()?.to_string();
    let message = result
        .get("MESSAGE")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some((code, message))
}

/// Total matching rows across all pages, from the dataset's `head` section.
pub fn list_total_count(body: &Value, dataset: &str) -> Option<u64> {
    body.get(dataset)?
        .as_array()?
        .iter()
        .filter_map(|section| section.get("head").and_then(Value::as_array))
        .flatten()
        .find_map(|item| item.get("list_total_count").and_then(Value::as_u64))
}

/// Extracts the raw row objects for `dataset` from a response body.
///
/// A missing dataset key, a dataset without a `row` section, or an empty
/// row array all mean zero rows. Non-object rows are skipped.
pub fn extract_rows<'a>(body: &'a Value, dataset: &str) -> Vec<&'a Map<String, Value>> {
    let Some(sections) = body.get(dataset).and_then(Value::as_array) else {
        match upstream_result(body) {
            Some((code, message)) if code == NO_DATA_CODE => {
                debug!("{dataset}: no data ({code}: {message})");
            }
            Some((code, message)) => {
                warn!("{dataset}: upstream answered {code}: {message}");
            }
            None => debug!("{dataset}: dataset key missing from response"),
        }
        return Vec::new();
    };

    sections
        .iter()
        .filter_map(|section| section.get("row").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_object)
        .collect()
}

/// Extracts and normalizes every row for `dataset`.
pub fn normalize_rows<T: FromUpstreamRow>(body: &Value, dataset: &str) -> Vec<T> {
    extract_rows(body, dataset)
        .into_iter()
        .map(T::from_row)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn populated() -> Value {
        json!({
            "hisTimetable": [
                { "head": [ { "list_total_count": 2 }, { "RESULT": { "CODE": "INFO-000", "MESSAGE": "ok" } } ] },
                { "row": [ { "PERIO": "1" }, { "PERIO": 2 } ] }
            ]
        })
    }

    #[test]
    fn test_extract_rows_from_populated_envelope() {
        let body = populated();
        let rows = extract_rows(&body, "hisTimetable");
        assert_eq!(rows.len(), 2);
        assert_eq!(text_field(rows[0], "PERIO"), "1");
        assert_eq!(text_field(rows[1], "PERIO"), "2");
    }

    #[test]
    fn test_missing_dataset_key_is_zero_rows() {
        let body = json!({ "RESULT": { "CODE": "INFO-200", "MESSAGE": "해당하는 데이터가 없습니다." } });
        assert!(extract_rows(&body, "hisTimetable").is_empty());
        assert!(extract_rows(&populated(), "misTimetable").is_empty());
    }

    #[test]
    fn test_error_envelope_is_zero_rows() {
        let body = json!({ "RESULT": { "CODE": "ERROR-290", "MESSAGE": "인증키가 유효하지 않습니다." } });
        assert!(extract_rows(&body, "schoolInfo").is_empty());
        assert_eq!(
            upstream_result(&body).map(|(code, _)| code),
            Some("ERROR-290".to_string())
        );
    }

    #[test]
    fn test_list_total_count_reads_head() {
        assert_eq!(list_total_count(&populated(), "hisTimetable"), Some(2));
        assert_eq!(list_total_count(&populated(), "misTimetable"), None);

        let no_count = json!({ "elsTimetable": [ { "head": [] }, { "row": [] } ] });
        assert_eq!(list_total_count(&no_count, "elsTimetable"), None);
    }

    #[test]
    fn test_head_only_or_empty_row_array_is_zero_rows() {
        let head_only = json!({ "elsTimetable": [ { "head": [] } ] });
        assert!(extract_rows(&head_only, "elsTimetable").is_empty());

        let empty_rows = json!({ "elsTimetable": [ { "head": [] }, { "row": [] } ] });
        assert!(extract_rows(&empty_rows, "elsTimetable").is_empty());
    }

    #[test]
    fn test_text_field_defaults_to_empty_string() {
        let row = json!({ "A": null, "B": "  x ", "C": true });
        let row = row.as_object().unwrap();
        assert_eq!(text_field(row, "A"), "");
        assert_eq!(text_field(row, "B"), "x");
        assert_eq!(text_field(row, "C"), "true");
        assert_eq!(text_field(row, "missing"), "");
    }
}
