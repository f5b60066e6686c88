//! NEIS school timetable and meal lookup library
//!
//! Looks up class timetables, cafeteria menus and schools on the Korean
//! NEIS open data hub, with retries, a TTL response cache and automatic
//! fallback across the per-level timetable datasets.
//!
//! # Examples
//!
//! ```rust,no_run
//! use neis_lookup::{AppError, Config, Lookup, SchedulePeriod, SchoolRef, TimetableQuery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AppError> {
//!     let config = Config::load().await?;
//!     let lookup = Lookup::from_config(&config)?;
//!
//!     let query = TimetableQuery::new(
//!         SchoolRef::new("B10", "7010536"),
//!         SchedulePeriod::Week("2024-03-07".to_string()),
//!     )
//!     .with_category_hint("고등학교")
//!     .with_grade("2")
//!     .with_class("3");
//!
//!     for row in lookup.resolve_schedule(&query).await? {
//!         println!("{} {}교시 {}", row.date, row.period, row.subject);
//!     }
//!
//!     if let Some(meal) = lookup.resolve_daily_meal(&query.school, None).await? {
//!         println!("{}", meal.menu);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod constants;
pub mod data_fetcher;
pub mod error;
pub mod logging;

// Re-export commonly used types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use data_fetcher::api::{DateWindow, Lookup, RetryPolicy, SchedulePeriod, SchoolRef, TimetableQuery};
pub use data_fetcher::cache::{CacheStats, ResponseCache};
pub use data_fetcher::models::{MealRow, ScheduleRow, SchoolInfo};
pub use error::AppError;

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
