pub mod category;
pub mod date_logic;
pub mod fetch_utils;
pub mod http_client;
pub mod orchestrator;
pub mod retry;
pub mod urls;

pub use category::{TimetableDataset, candidates_for, classify};
pub use date_logic::{
    DateWindow, current_month_window, day_window, month_window, month_window_for, today,
    week_window,
};
pub use fetch_utils::RetryingFetcher;
pub use http_client::create_http_client_with_timeout;
pub use orchestrator::{Lookup, SchedulePeriod, TimetableQuery};
pub use retry::RetryPolicy;
pub use urls::{RequestSignature, SchoolRef};
