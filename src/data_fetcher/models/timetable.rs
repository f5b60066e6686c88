use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::common::{FromUpstreamRow, text_field};

/// One class period, as handed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub date: String,
    pub period: String,
    pub subject: String,
    /// Only some timetable feeds carry a teacher column; empty otherwise.
    pub teacher: String,
}

impl FromUpstreamRow for ScheduleRow {
    fn from_row(row: &Map<String, Value>) -> Self {
        Self {
            date: text_field(row, "ALL_TI_YMD"),
            period: text_field(row, "PERIO"),
            subject: text_field(row, "ITRT_CNTNT"),
            teacher: text_field(row, "TEACHER_NM"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_fetcher::models::common::normalize_rows;
    use serde_json::json;

    #[test]
    fn test_schedule_row_from_upstream() {
        let body = json!({
            "misTimetable": [
                { "head": [] },
                { "row": [
                    { "ALL_TI_YMD": "20240304", "PERIO": "1", "ITRT_CNTNT": "국어", "GRADE": "2" },
                    { "ALL_TI_YMD": "20240304", "PERIO": "2", "ITRT_CNTNT": null }
                ] }
            ]
        });
        let rows: Vec<ScheduleRow> = normalize_rows(&body, "misTimetable");
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            ScheduleRow {
                date: "20240304".to_string(),
                period: "1".to_string(),
                subject: "국어".to_string(),
                teacher: String::new(),
            }
        );
        assert_eq!(rows[1].subject, "");
    }

    #[test]
    fn test_schedule_row_serializes_all_fields() {
        let row = ScheduleRow {
            date: "20240304".to_string(),
            period: "3".to_string(),
            subject: "수학".to_string(),
            teacher: String::new(),
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["teacher"], "");
        assert_eq!(value["period"], "3");
    }
}
