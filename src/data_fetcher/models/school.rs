use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::common::{FromUpstreamRow, text_field};
use crate::data_fetcher::api::urls::SchoolRef;

/// A school search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolInfo {
    pub office_code: String,
    pub school_code: String,
    pub name: String,
    /// School kind such as 고등학교; usable as a category hint.
    pub kind: String,
    pub address: String,
}

impl SchoolInfo {
    pub fn school_ref(&self) -> SchoolRef {
        SchoolRef::new(self.office_code.clone(), self.school_code.clone())
    }
}

impl FromUpstreamRow for SchoolInfo {
    fn from_row(row: &Map<String, Value>) -> Self {
        Self {
            office_code: text_field(row, "ATPT_OFCDC_SC_CODE"),
            school_code: text_field(row, "SD_SCHUL_CODE"),
            name: text_field(row, "SCHUL_NM"),
            kind: text_field(row, "SCHUL_KND_SC_NM"),
            address: text_field(row, "ORG_RDNMA"),
        }
    }
}
