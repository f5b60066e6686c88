use crate::cli::{Args, Command};
use crate::config::Config;
use crate::data_fetcher::api::{DateWindow, Lookup, SchedulePeriod, SchoolRef, TimetableQuery};
use crate::error::AppError;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

/// Handles the --list-config command.
pub async fn handle_list_config_command() -> Result<(), AppError> {
    Config::display().await
}

/// Handles configuration update commands (--set-api-key, --set-log-file, --clear-log-file).
///
/// Only the file contents are updated; environment overrides are never
/// written back.
pub async fn handle_config_update_command(args: &Args) -> Result<(), AppError> {
    let config_path = Config::get_config_path();
    let mut config = if Path::new(&config_path).exists() {
        Config::load_from_path(&config_path).await?
    } else {
        Config::default()
    };

    if let Some(new_key) = &args.new_api_key {
        config.api_key = Some(new_key.trim().to_string()).filter(|key| !key.is_empty());
    }

    if let Some(new_log_path) = &args.new_log_file_path {
        config.log_file_path = Some(new_log_path.clone());
    } else if args.clear_log_file_path {
        config.log_file_path = None;
        println!("Custom log file path cleared. Using default location.");
    }

    config.validate()?;
    config.save_to_path(&config_path).await?;
    println!("Config updated successfully!");

    Ok(())
}

/// Runs a lookup command and returns its result as JSON.
pub async fn execute(lookup: &Lookup, command: &Command) -> Result<Value, AppError> {
    match command {
        Command::Search { name } => {
            let schools = lookup.search_school(name).await?;
            Ok(serde_json::to_value(schools)?)
        }
        Command::Timetable {
            school,
            office,
            level,
            grade,
            class_no,
            date,
            week,
            from,
            to,
        } => {
            let period = match (date, week, from, to) {
                (Some(date), _, _, _) => SchedulePeriod::Day(date.clone()),
                (None, Some(week), _, _) => SchedulePeriod::Week(week.clone()),
                (None, None, Some(from), Some(to)) => {
                    SchedulePeriod::Range(DateWindow::range(from, to)?)
                }
                _ => SchedulePeriod::Today,
            };
            let query = TimetableQuery {
                school: SchoolRef::new(office.as_str(), school.as_str()),
                category_hint: level.clone(),
                grade: Some(grade.clone()),
                class_no: Some(class_no.clone()),
                period,
            };
            let rows = lookup.resolve_schedule(&query).await?;
            Ok(serde_json::to_value(rows)?)
        }
        Command::Meal {
            school,
            office,
            date,
            month,
            from,
            to,
        } => {
            let school = SchoolRef::new(office.as_str(), school.as_str());
            match (month, from, to) {
                (Some(month), _, _) => {
                    let meals = lookup.resolve_monthly_meal(&school, Some(month)).await?;
                    Ok(serde_json::to_value(meals)?)
                }
                (None, Some(from), Some(to)) => {
                    let meals = lookup
                        .resolve_meal(&school, &DateWindow::range(from, to)?)
                        .await?;
                    Ok(serde_json::to_value(meals)?)
                }
                _ => {
                    let meal = lookup
                        .resolve_daily_meal(&school, date.as_deref())
                        .await?;
                    Ok(serde_json::to_value(meal)?)
                }
            }
        }
    }
}

/// Notice printed on stderr when a lookup succeeds with nothing in it.
pub const NO_DATA_NOTICE: &str =
    "No data for this period (likely a weekend, holiday or school break).";

/// Stderr message for a lookup that failed upstream.
pub fn upstream_failure_message(error: &AppError) -> String {
    format!("Could not reach the data source: {error}")
}

fn is_empty_result(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Runs a lookup command and prints the JSON result on stdout.
///
/// Empty results still print (`[]` or `null`) with a notice on stderr.
pub async fn handle_lookup_command(lookup: &Lookup, command: &Command) -> Result<(), AppError> {
    let value = match execute(lookup, command).await {
        Ok(value) => value,
        Err(e) if e.is_upstream() => {
            warn!("Upstream lookup failed: {e}");
            eprintln!("{}", upstream_failure_message(&e));
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    if is_empty_result(&value) {
        info!("Lookup returned no data");
        eprintln!("{NO_DATA_NOTICE}");
    }

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
