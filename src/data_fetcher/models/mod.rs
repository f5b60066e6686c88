pub mod common;
pub mod meal;
pub mod school;
pub mod timetable;

pub use common::{FromUpstreamRow, extract_rows, list_total_count, normalize_rows, text_field};
pub use meal::{MealRow, pick_daily_meal};
pub use school::SchoolInfo;
pub use timetable::ScheduleRow;
