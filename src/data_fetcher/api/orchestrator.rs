//! Lookup orchestration: turns a query into cached, retried upstream calls
//! and picks the first timetable dataset that actually has rows.

use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::constants::neis::MAX_PAGES;
use crate::data_fetcher::cache::ResponseCache;
use crate::data_fetcher::models::{
    MealRow, ScheduleRow, SchoolInfo, extract_rows, list_total_count, normalize_rows,
    pick_daily_meal,
};
use crate::error::AppError;

use super::category::{TimetableDataset, candidates_for};
use super::date_logic::{
    DateWindow, current_month_window, day_window, month_window, today, week_window,
};
use super::fetch_utils::RetryingFetcher;
use super::http_client::create_http_client_with_timeout;
use super::retry::RetryPolicy;
use super::urls::{
    MEAL_DATASET, RequestSignature, SCHOOL_INFO_DATASET, SchoolRef, build_meal_signature,
    build_school_search_signature, build_timetable_signature,
};

/// Which days a timetable query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulePeriod {
    /// Today in Korea Standard Time.
    Today,
    /// A single day, `YYYYMMDD` or `YYYY-MM-DD`.
    Day(String),
    /// Monday to Friday of the week containing the anchor date.
    Week(String),
    Range(DateWindow),
}

/// A timetable lookup request.
///
/// `grade` and `class_no` are required; a query without them is rejected
/// before anything goes upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableQuery {
    pub school: SchoolRef,
    /// School kind or level code used to order the candidate datasets.
    pub category_hint: Option<String>,
    pub grade: Option<String>,
    pub class_no: Option<String>,
    pub period: SchedulePeriod,
}

impl TimetableQuery {
    pub fn new(school: SchoolRef, period: SchedulePeriod) -> Self {
        Self {
            school,
            category_hint: None,
            grade: None,
            class_no: None,
            period,
        }
    }

    pub fn with_category_hint(mut self, hint: impl Into<String>) -> Self {
        self.category_hint = Some(hint.into());
        self
    }

    pub fn with_grade(mut self, grade: impl Into<String>) -> Self {
        self.grade = Some(grade.into());
        self
    }

    pub fn with_class(mut self, class_no: impl Into<String>) -> Self {
        self.class_no = Some(class_no.into());
        self
    }
}

#[derive(Debug)]
enum CandidateOutcome {
    Rows(Vec<ScheduleRow>),
    Empty,
    Failed(AppError),
}

#[derive(Debug)]
enum Resolution {
    Pending,
    Trying(usize),
    Found(Vec<ScheduleRow>),
    Exhausted,
}

/// Entry point for timetable, meal and school lookups.
///
/// Holds the fetcher, the response cache and the clock. Construct it once
/// and share it; the cache only helps if requests go through the same one.
pub struct Lookup {
    api_domain: String,
    api_key: Option<String>,
    fetcher: RetryingFetcher,
    cache: Arc<ResponseCache>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lookup")
            .field("api_domain", &self.api_domain)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("fetcher", &self.fetcher)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Lookup {
    pub fn new(
        api_domain: impl Into<String>,
        api_key: Option<String>,
        fetcher: RetryingFetcher,
        cache: Arc<ResponseCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            api_domain: api_domain.into(),
            api_key: api_key.filter(|key| !key.is_empty()),
            fetcher,
            cache,
            clock,
        }
    }

    /// Builds a lookup with the wall clock, an HTTP client and a cache
    /// sized from `config`.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let client = create_http_client_with_timeout(config.http_timeout_seconds)?;
        let policy = RetryPolicy::new(
            config.max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
        )
        .with_retry_client_errors(config.retry_client_errors);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = Arc::new(ResponseCache::new(
            Duration::from_secs(config.cache_ttl_seconds),
            config.cache_capacity,
            clock.clone(),
        ));

        Ok(Self::new(
            config.api_domain.clone(),
            config.api_key.clone(),
            RetryingFetcher::new(client, policy),
            cache,
            clock,
        ))
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Timetable rows from the first candidate dataset that has any.
    ///
    /// Candidates are tried in order. A failing candidate does not stop the
    /// ones after it. When none has rows, the result is an empty list if all
    /// of them answered, or the first failure if any of them failed.
    #[instrument(skip(self, query), fields(school = %query.school.school_code))]
    pub async fn resolve_schedule(
        &self,
        query: &TimetableQuery,
    ) -> Result<Vec<ScheduleRow>, AppError> {
        validate_school(&query.school)?;
        validate_class(query)?;
        let window = self.schedule_window(&query.period)?;
        let candidates = candidates_for(query.category_hint.as_deref().unwrap_or_default());
        info!(
            "Resolving timetable {}..{} over {} candidate datasets",
            window.from_ymd(),
            window.to_ymd(),
            candidates.len()
        );

        let mut first_failure: Option<AppError> = None;
        let mut state = Resolution::Pending;
        loop {
            state = match state {
                Resolution::Pending if candidates.is_empty() => Resolution::Exhausted,
                Resolution::Pending => Resolution::Trying(0),
                Resolution::Trying(index) => {
                    let dataset = candidates[index];
                    let next = if index + 1 < candidates.len() {
                        Resolution::Trying(index + 1)
                    } else {
                        Resolution::Exhausted
                    };
                    match self.try_candidate(dataset, query, &window).await {
                        CandidateOutcome::Rows(rows) => {
                            info!("Found {} rows in {}", rows.len(), dataset);
                            Resolution::Found(rows)
                        }
                        CandidateOutcome::Empty => {
                            debug!("No rows in {dataset}, moving on");
                            next
                        }
                        CandidateOutcome::Failed(error) => {
                            warn!("Candidate {} failed: {}", dataset, error);
                            first_failure.get_or_insert(error);
                            next
                        }
                    }
                }
                Resolution::Found(rows) => return Ok(rows),
                Resolution::Exhausted => {
                    return match first_failure {
                        Some(error) => Err(error),
                        None => {
                            info!("No timetable rows in any candidate dataset");
                            Ok(Vec::new())
                        }
                    };
                }
            };
        }
    }

    async fn try_candidate(
        &self,
        dataset: TimetableDataset,
        query: &TimetableQuery,
        window: &DateWindow,
    ) -> CandidateOutcome {
        let signature = build_timetable_signature(
            dataset.id(),
            &query.school,
            query.grade.as_deref(),
            query.class_no.as_deref(),
            window,
        );
        match self.fetch_dataset(&signature).await {
            Ok(body) => {
                let rows: Vec<ScheduleRow> = normalize_rows(&body, dataset.id());
                if rows.is_empty() {
                    CandidateOutcome::Empty
                } else {
                    CandidateOutcome::Rows(rows)
                }
            }
            Err(error) => CandidateOutcome::Failed(error),
        }
    }

    fn schedule_window(&self, period: &SchedulePeriod) -> Result<DateWindow, AppError> {
        match period {
            SchedulePeriod::Today => day_window(&today(self.clock.as_ref())),
            SchedulePeriod::Day(ymd) => day_window(ymd),
            SchedulePeriod::Week(anchor) => week_window(anchor),
            SchedulePeriod::Range(window) => Ok(window.clone()),
        }
    }

    /// Every meal served in `window`.
    #[instrument(skip(self, school, window), fields(school = %school.school_code))]
    pub async fn resolve_meal(
        &self,
        school: &SchoolRef,
        window: &DateWindow,
    ) -> Result<Vec<MealRow>, AppError> {
        validate_school(school)?;
        let signature = build_meal_signature(school, window);
        let body = self.fetch_dataset(&signature).await?;
        let meals: Vec<MealRow> = normalize_rows(&body, MEAL_DATASET);
        info!(
            "Resolved {} meals for {}..{}",
            meals.len(),
            window.from_ymd(),
            window.to_ymd()
        );
        Ok(meals)
    }

    /// The meal for one day (today when `ymd` is `None`): lunch when served,
    /// otherwise the first meal listed.
    pub async fn resolve_daily_meal(
        &self,
        school: &SchoolRef,
        ymd: Option<&str>,
    ) -> Result<Option<MealRow>, AppError> {
        validate_school(school)?;
        let window = match ymd {
            Some(ymd) => day_window(ymd)?,
            None => day_window(&today(self.clock.as_ref()))?,
        };
        let meals = self.resolve_meal(school, &window).await?;
        Ok(pick_daily_meal(meals))
    }

    /// Every meal of a month (`YYYYMM` or `YYYY-MM`; the current month when `None`).
    pub async fn resolve_monthly_meal(
        &self,
        school: &SchoolRef,
        year_month: Option<&str>,
    ) -> Result<Vec<MealRow>, AppError> {
        validate_school(school)?;
        let window = match year_month {
            Some(year_month) => month_window(year_month)?,
            None => current_month_window(self.clock.as_ref())?,
        };
        self.resolve_meal(school, &window).await
    }

    /// Schools whose name contains `name`.
    #[instrument(skip(self))]
    pub async fn search_school(&self, name: &str) -> Result<Vec<SchoolInfo>, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::invalid_input("school name is required"));
        }
        let signature = build_school_search_signature(name);
        let body = self.fetch_dataset(&signature).await?;
        let schools: Vec<SchoolInfo> = normalize_rows(&body, SCHOOL_INFO_DATASET);
        info!("School search '{}' matched {} schools", name, schools.len());
        Ok(schools)
    }

    async fn fetch_dataset(&self, signature: &RequestSignature) -> Result<Value, AppError> {
        let key = signature.cache_key();
        self.cache
            .get_or_fetch(&key, || self.fetch_all_pages(signature))
            .await
    }

    /// Fetches page after page until `list_total_count` rows are in hand
    /// and merges them into a single envelope.
    async fn fetch_all_pages(&self, signature: &RequestSignature) -> Result<Value, AppError> {
        let dataset = signature.dataset();
        let api_key = self.api_key.as_deref();
        let first = self
            .fetcher
            .fetch_json(&signature.to_url(&self.api_domain, api_key))
            .await?;

        let Some(total) = list_total_count(&first, dataset) else {
            return Ok(first);
        };
        let mut rows: Vec<Value> = extract_rows(&first, dataset)
            .into_iter()
            .map(|row| Value::Object(row.clone()))
            .collect();
        if rows.len() as u64 >= total {
            return Ok(first);
        }

        let mut page = 1;
        while (rows.len() as u64) < total && page < MAX_PAGES {
            page += 1;
            debug!("{dataset}: fetching page {page} ({} of {total} rows so far)", rows.len());
            let body = self
                .fetcher
                .fetch_json(&signature.to_page_url(&self.api_domain, api_key, page))
                .await?;
            let page_rows = extract_rows(&body, dataset);
            if page_rows.is_empty() {
                break;
            }
            rows.extend(page_rows.into_iter().map(|row| Value::Object(row.clone())));
        }
        if (rows.len() as u64) < total {
            warn!("{dataset}: collected {} of {total} rows", rows.len());
        }

        Ok(json!({
            dataset: [
                { "head": [ { "list_total_count": total } ] },
                { "row": rows }
            ]
        }))
    }
}

fn validate_school(school: &SchoolRef) -> Result<(), AppError> {
    if school.office_code.trim().is_empty() {
        return Err(AppError::invalid_input("office code is required"));
    }
    if school.school_code.trim().is_empty() {
        return Err(AppError::invalid_input("school code is required"));
    }
    Ok(())
}

fn validate_class(query: &TimetableQuery) -> Result<(), AppError> {
    let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
    if !present(&query.grade) {
        return Err(AppError::invalid_input("grade is required"));
    }
    if !present(&query.class_no) {
        return Err(AppError::invalid_input("class number is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::data_fetcher::api::http_client::create_test_http_client;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1))
    }

    // 2024-03-04 12:00 KST, a Monday
    fn monday_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 4, 3, 0, 0).unwrap(),
        ))
    }

    fn lookup_for(server: &MockServer, attempts: u32) -> Lookup {
        let clock = monday_clock();
        let cache = Arc::new(ResponseCache::new(
            Duration::from_secs(300),
            100,
            clock.clone(),
        ));
        Lookup::new(
            server.uri(),
            Some("test-key".to_string()),
            RetryingFetcher::new(create_test_http_client(), fast_policy(attempts)),
            cache,
            clock,
        )
    }

    fn school() -> SchoolRef {
        SchoolRef::new("B10", "7010536")
    }

    fn timetable_body(dataset: &str, subjects: &[&str]) -> Value {
        let rows: Vec<Value> = subjects
            .iter()
            .enumerate()
            .map(|(i, subject)| {
                json!({
                    "ALL_TI_YMD": "20240304",
                    "PERIO": (i + 1).to_string(),
                    "ITRT_CNTNT": subject,
                })
            })
            .collect();
        json!({
            dataset: [
                { "head": [ { "list_total_count": rows.len() } ] },
                { "row": rows }
            ]
        })
    }

    fn no_data_body() -> Value {
        json!({ "RESULT": { "CODE": "INFO-200", "MESSAGE": "해당하는 데이터가 없습니다." } })
    }

    async fn mount_json(server: &MockServer, dataset: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/{dataset}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_status(server: &MockServer, dataset: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/{dataset}")))
            .respond_with(ResponseTemplate::new(status))
            .mount(server)
            .await;
    }

    fn high_school_query() -> TimetableQuery {
        TimetableQuery::new(school(), SchedulePeriod::Day("20240304".to_string()))
            .with_category_hint("고등학교")
            .with_grade("1")
            .with_class("1")
    }

    #[tokio::test]
    async fn test_first_candidate_empty_second_has_rows() {
        let server = MockServer::start().await;
        mount_json(&server, "hisTimetable", no_data_body()).await;
        mount_json(
            &server,
            "elsTimetable",
            timetable_body("elsTimetable", &["국어", "수학"]),
        )
        .await;

        let lookup = lookup_for(&server, 1);
        let rows = lookup.resolve_schedule(&high_school_query()).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].subject, "국어");
        assert_eq!(rows[1].period, "2");
    }

    #[tokio::test]
    async fn test_all_candidates_empty_returns_empty_list() {
        let server = MockServer::start().await;
        for dataset in TimetableDataset::ALL {
            mount_json(&server, dataset.id(), no_data_body()).await;
        }

        let lookup = lookup_for(&server, 1);
        let rows = lookup.resolve_schedule(&high_school_query()).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_failing_candidate_does_not_stop_later_ones() {
        let server = MockServer::start().await;
        mount_status(&server, "hisTimetable", 500).await;
        mount_json(
            &server,
            "elsTimetable",
            timetable_body("elsTimetable", &["과학"]),
        )
        .await;

        let lookup = lookup_for(&server, 2);
        let rows = lookup.resolve_schedule(&high_school_query()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subject, "과학");
    }

    #[tokio::test]
    async fn test_all_candidates_failing_returns_first_error() {
        let server = MockServer::start().await;
        mount_status(&server, "hisTimetable", 503).await;
        mount_status(&server, "elsTimetable", 500).await;
        mount_status(&server, "misTimetable", 500).await;
        mount_status(&server, "spsTimetable", 500).await;

        let lookup = lookup_for(&server, 1);
        let result = lookup.resolve_schedule(&high_school_query()).await;
        assert!(matches!(
            result,
            Err(AppError::ApiServiceUnavailable { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_and_failing_mix_returns_error() {
        let server = MockServer::start().await;
        mount_json(&server, "hisTimetable", no_data_body()).await;
        mount_status(&server, "elsTimetable", 500).await;
        mount_json(&server, "misTimetable", no_data_body()).await;
        mount_json(&server, "spsTimetable", no_data_body()).await;

        let lookup = lookup_for(&server, 1);
        let result = lookup.resolve_schedule(&high_school_query()).await;
        assert!(matches!(result, Err(AppError::ApiServerError { .. })));
    }

    #[tokio::test]
    async fn test_single_day_sends_all_ti_ymd_and_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hisTimetable"))
            .and(query_param("ALL_TI_YMD", "20240304"))
            .and(query_param("GRADE", "2"))
            .and(query_param("CLASS_NM", "3"))
            .and(query_param("KEY", "test-key"))
            .and(query_param("Type", "json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(timetable_body("hisTimetable", &["영어"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let lookup = lookup_for(&server, 1);
        let query = high_school_query().with_grade("2").with_class("3");
        let rows = lookup.resolve_schedule(&query).await.unwrap();
        assert_eq!(rows[0].subject, "영어");
    }

    #[tokio::test]
    async fn test_week_period_sends_monday_to_friday() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/misTimetable"))
            .and(query_param("TI_FROM_YMD", "20240304"))
            .and(query_param("TI_TO_YMD", "20240308"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(timetable_body("misTimetable", &["음악"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let lookup = lookup_for(&server, 1);
        let query = TimetableQuery::new(school(), SchedulePeriod::Week("20240307".to_string()))
            .with_category_hint("mis")
            .with_grade("3")
            .with_class("2");
        let rows = lookup.resolve_schedule(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_today_period_uses_clock() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/elsTimetable"))
            .and(query_param("ALL_TI_YMD", "20240304"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(timetable_body("elsTimetable", &["체육"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let lookup = lookup_for(&server, 1);
        let query = TimetableQuery::new(school(), SchedulePeriod::Today)
            .with_grade("1")
            .with_class("4");
        let rows = lookup.resolve_schedule(&query).await.unwrap();
        assert_eq!(rows[0].subject, "체육");
    }

    #[tokio::test]
    async fn test_repeated_query_is_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hisTimetable"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(timetable_body("hisTimetable", &["국어"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let lookup = lookup_for(&server, 1);
        let first = lookup.resolve_schedule(&high_school_query()).await.unwrap();
        let second = lookup.resolve_schedule(&high_school_query()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(lookup.cache().stats().await.hits, 1);
    }

    #[tokio::test]
    async fn test_invalid_input_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(no_data_body()))
            .expect(0)
            .mount(&server)
            .await;

        let lookup = lookup_for(&server, 1);

        let missing_school = TimetableQuery::new(
            SchoolRef::new("B10", " "),
            SchedulePeriod::Day("20240304".to_string()),
        )
        .with_grade("1")
        .with_class("1");
        assert!(matches!(
            lookup.resolve_schedule(&missing_school).await,
            Err(AppError::InvalidInput(_))
        ));

        let bad_date = TimetableQuery::new(school(), SchedulePeriod::Day("2024-13-01".to_string()))
            .with_grade("1")
            .with_class("1");
        assert!(matches!(
            lookup.resolve_schedule(&bad_date).await,
            Err(AppError::InvalidInput(_))
        ));

        assert!(matches!(
            lookup.search_school("  ").await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            lookup
                .resolve_meal(&SchoolRef::new("", "7010536"), &day_window("20240304").unwrap())
                .await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(lookup.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_missing_grade_or_class_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(no_data_body()))
            .expect(0)
            .mount(&server)
            .await;

        let lookup = lookup_for(&server, 1);
        let period = SchedulePeriod::Day("20240304".to_string());

        let no_class = TimetableQuery::new(school(), period.clone()).with_grade("2");
        assert!(matches!(
            lookup.resolve_schedule(&no_class).await,
            Err(AppError::InvalidInput(_))
        ));

        let no_grade = TimetableQuery::new(school(), period.clone()).with_class("3");
        assert!(matches!(
            lookup.resolve_schedule(&no_grade).await,
            Err(AppError::InvalidInput(_))
        ));

        let blank_grade = TimetableQuery::new(school(), period)
            .with_grade(" ")
            .with_class("3");
        assert!(matches!(
            lookup.resolve_schedule(&blank_grade).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_range_window_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(no_data_body()))
            .expect(0)
            .mount(&server)
            .await;

        let reversed =
            serde_json::from_value::<DateWindow>(json!({ "from_ymd": "20240310", "to_ymd": "20240301" }));
        assert!(reversed.is_err());
        let garbage =
            serde_json::from_value::<DateWindow>(json!({ "from_ymd": "garbage", "to_ymd": "x" }));
        assert!(garbage.is_err());

        let lookup = lookup_for(&server, 1);
        let reversed = DateWindow::range("20240310", "20240301").map(SchedulePeriod::Range);
        assert!(matches!(reversed, Err(AppError::InvalidInput(_))));
        assert!(lookup.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_results_beyond_one_page_are_merged() {
        let server = MockServer::start().await;
        let page = |subjects: &[&str]| {
            let mut body = timetable_body("hisTimetable", subjects);
            body["hisTimetable"][0]["head"][0]["list_total_count"] = json!(3);
            body
        };
        Mock::given(method("GET"))
            .and(path("/hisTimetable"))
            .and(query_param("pIndex", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["국어", "수학"])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/hisTimetable"))
            .and(query_param("pIndex", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["영어"])))
            .expect(1)
            .mount(&server)
            .await;

        let lookup = lookup_for(&server, 1);
        let rows = lookup.resolve_schedule(&high_school_query()).await.unwrap();
        let subjects: Vec<&str> = rows.iter().map(|row| row.subject.as_str()).collect();
        assert_eq!(subjects, ["국어", "수학", "영어"]);

        let again = lookup.resolve_schedule(&high_school_query()).await.unwrap();
        assert_eq!(again, rows);
    }

    #[tokio::test]
    async fn test_short_page_stops_paging() {
        let server = MockServer::start().await;
        let mut first = timetable_body("hisTimetable", &["국어"]);
        first["hisTimetable"][0]["head"][0]["list_total_count"] = json!(5);
        Mock::given(method("GET"))
            .and(path("/hisTimetable"))
            .and(query_param("pIndex", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(first))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/hisTimetable"))
            .and(query_param("pIndex", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(no_data_body()))
            .expect(1)
            .mount(&server)
            .await;

        let lookup = lookup_for(&server, 1);
        let rows = lookup.resolve_schedule(&high_school_query()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_error_result_code_is_reported_and_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/schoolInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "RESULT": { "CODE": "ERROR-290", "MESSAGE": "인증키가 유효하지 않습니다." }
            })))
            .expect(2)
            .mount(&server)
            .await;

        let lookup = lookup_for(&server, 3);
        for _ in 0..2 {
            let result = lookup.search_school("서울").await;
            assert!(matches!(result, Err(AppError::ApiResult { ref code, .. }) if code == "ERROR-290"));
        }
        assert!(lookup.cache().is_empty().await);
    }

    fn meal_body(meals: &[(&str, &str, &str)]) -> Value {
        let rows: Vec<Value> = meals
            .iter()
            .map(|(date, code, menu)| {
                let kind = match *code {
                    "1" => "조식",
                    "2" => "중식",
                    _ => "석식",
                };
                json!({
                    "MLSV_YMD": date,
                    "MMEAL_SC_CODE": code,
                    "MMEAL_SC_NM": kind,
                    "DDISH_NM": menu,
                })
            })
            .collect();
        json!({ "mealServiceDietInfo": [ { "head": [] }, { "row": rows } ] })
    }

    #[tokio::test]
    async fn test_daily_meal_prefers_lunch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mealServiceDietInfo"))
            .and(query_param("MLSV_YMD", "20240305"))
            .respond_with(ResponseTemplate::new(200).set_body_json(meal_body(&[
                ("20240305", "1", "토스트"),
                ("20240305", "2", "비빔밥<br/>미역국"),
                ("20240305", "3", "카레"),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let lookup = lookup_for(&server, 1);
        let meal = lookup
            .resolve_daily_meal(&school(), Some("2024-03-05"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(meal.menu, "비빔밥<br/>미역국");
        assert_eq!(meal.kind, "중식");
    }

    #[tokio::test]
    async fn test_daily_meal_none_when_nothing_served() {
        let server = MockServer::start().await;
        mount_json(&server, "mealServiceDietInfo", no_data_body()).await;

        let lookup = lookup_for(&server, 1);
        let meal = lookup.resolve_daily_meal(&school(), None).await.unwrap();
        assert_eq!(meal, None);
    }

    #[tokio::test]
    async fn test_monthly_meal_sends_month_range() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mealServiceDietInfo"))
            .and(query_param("MLSV_FROM_YMD", "20240201"))
            .and(query_param("MLSV_TO_YMD", "20240229"))
            .respond_with(ResponseTemplate::new(200).set_body_json(meal_body(&[
                ("20240201", "2", "김치찌개"),
                ("20240229", "2", "짜장면"),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let lookup = lookup_for(&server, 1);
        let meals = lookup
            .resolve_monthly_meal(&school(), Some("202402"))
            .await
            .unwrap();
        assert_eq!(meals.len(), 2);
        assert_eq!(meals[1].date, "20240229");
    }

    #[tokio::test]
    async fn test_meal_upstream_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mealServiceDietInfo"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let lookup = lookup_for(&server, 2);
        let result = lookup.resolve_monthly_meal(&school(), None).await;
        assert!(matches!(result, Err(AppError::ApiServerError { .. })));
        assert!(lookup.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_search_school_returns_matches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/schoolInfo"))
            .and(query_param("SCHUL_NM", "서울"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "schoolInfo": [
                    { "head": [] },
                    { "row": [
                        {
                            "ATPT_OFCDC_SC_CODE": "B10",
                            "SD_SCHUL_CODE": "7010536",
                            "SCHUL_NM": "서울고등학교",
                            "SCHUL_KND_SC_NM": "고등학교",
                            "ORG_RDNMA": "서울특별시 서초구 효령로 197"
                        },
                        {
                            "ATPT_OFCDC_SC_CODE": "B10",
                            "SD_SCHUL_CODE": "7021100",
                            "SCHUL_NM": "서울중학교",
                            "SCHUL_KND_SC_NM": "중학교",
                            "ORG_RDNMA": null
                        }
                    ] }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let lookup = lookup_for(&server, 1);
        let schools = lookup.search_school(" 서울 ").await.unwrap();
        assert_eq!(schools.len(), 2);
        assert_eq!(schools[1].kind, "중학교");
        assert_eq!(schools[1].address, "");
    }
}
