pub mod api;
pub mod cache;
pub mod models;

pub use api::{Lookup, SchedulePeriod, SchoolRef, TimetableQuery};
pub use cache::ResponseCache;
pub use models::{MealRow, ScheduleRow, SchoolInfo};
