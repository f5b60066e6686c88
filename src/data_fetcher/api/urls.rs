//! Request signatures and URL building for NEIS hub endpoints

use std::fmt;

use crate::constants::neis::PAGE_SIZE;

use super::date_logic::DateWindow;

/// Dataset identifier for cafeteria menus.
pub const MEAL_DATASET: &str = "mealServiceDietInfo";

/// Dataset identifier for school search.
pub const SCHOOL_INFO_DATASET: &str = "schoolInfo";

/// A fully resolved upstream query: dataset plus its query parameters in a
/// fixed order.
///
/// The `Display` form is the cache key. Builders always push parameters in
/// the same order, so two equal queries render the same bytes. The API key
/// and paging parameters are transport details and stay out of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestSignature {
    dataset: String,
    params: Vec<(&'static str, String)>,
}

impl RequestSignature {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter. Empty values are skipped so an absent optional
    /// filter and an empty one produce the same signature.
    pub fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        let value = value.trim();
        if !value.is_empty() {
            self.params.push((name, value.to_string()));
        }
        self
    }

    /// Appends an optional parameter.
    pub fn opt_param(self, name: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// Cache key for this query.
    pub fn cache_key(&self) -> String {
        self.to_string()
    }

    /// Complete request URL for the first page against `api_domain`, with
    /// transport parameters.
    pub fn to_url(&self, api_domain: &str, api_key: Option<&str>) -> String {
        self.to_page_url(api_domain, api_key, 1)
    }

    /// Request URL for page `page` (1-based) of this query.
    pub fn to_page_url(&self, api_domain: &str, api_key: Option<&str>, page: u32) -> String {
        let mut url = format!(
            "{}/{}?Type=json&pIndex={page}&pSize={PAGE_SIZE}",
            api_domain.trim_end_matches('/'),
            self.dataset
        );
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            url.push_str("&KEY=");
            url.push_str(&encode_component(key));
        }
        for (name, value) in &self.params {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.push_str(&encode_component(value));
        }
        url
    }
}

impl fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dataset)?;
        for (index, (name, value)) in self.params.iter().enumerate() {
            let sep = if index == 0 { '?' } else { '&' };
            write!(f, "{sep}{name}={}", encode_component(value))?;
        }
        Ok(())
    }
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
pub fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Identifies one school for NEIS: office of education code plus school code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchoolRef {
    pub office_code: String,
    pub school_code: String,
}

impl SchoolRef {
    pub fn new(office_code: impl Into<String>, school_code: impl Into<String>) -> Self {
        Self {
            office_code: office_code.into(),
            school_code: school_code.into(),
        }
    }
}

/// Builds the signature for a timetable query on one dataset.
///
/// A single-day window sends `ALL_TI_YMD`; anything longer sends the
/// `TI_FROM_YMD`/`TI_TO_YMD` pair.
pub fn build_timetable_signature(
    dataset: &str,
    school: &SchoolRef,
    grade: Option<&str>,
    class_no: Option<&str>,
    window: &DateWindow,
) -> RequestSignature {
    let signature = RequestSignature::new(dataset)
        .param("ATPT_OFCDC_SC_CODE", school.office_code.as_str())
        .param("SD_SCHUL_CODE", school.school_code.as_str())
        .opt_param("GRADE", grade)
        .opt_param("CLASS_NM", class_no);

    if window.is_single_day() {
        signature.param("ALL_TI_YMD", window.from_ymd())
    } else {
        signature
            .param("TI_FROM_YMD", window.from_ymd())
            .param("TI_TO_YMD", window.to_ymd())
    }
}

/// Builds the signature for a meal query.
pub fn build_meal_signature(school: &SchoolRef, window: &DateWindow) -> RequestSignature {
    let signature = RequestSignature::new(MEAL_DATASET)
        .param("ATPT_OFCDC_SC_CODE", school.office_code.as_str())
        .param("SD_SCHUL_CODE", school.school_code.as_str());

    if window.is_single_day() {
        signature.param("MLSV_YMD", window.from_ymd())
    } else {
        signature
            .param("MLSV_FROM_YMD", window.from_ymd())
            .param("MLSV_TO_YMD", window.to_ymd())
    }
}

/// Builds the signature for a school search by name.
pub fn build_school_search_signature(name: &str) -> RequestSignature {
    RequestSignature::new(SCHOOL_INFO_DATASET).param("SCHUL_NM", name)
}
