use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};

fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .usage(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Red.on_default())
}

/// NEIS school timetable and cafeteria menu lookup
///
/// Queries the Korean NEIS open data hub and prints the result as JSON on
/// stdout. Find the office and school codes with `search` first, then use
/// them with `timetable` or `meal`.
#[derive(Parser, Debug)]
#[command(about, long_about = None, version)]
#[command(styles = get_styles())]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Store the NEIS API key in the config file.
    #[arg(long = "set-api-key", help_heading = "Configuration")]
    pub new_api_key: Option<String>,

    /// Update log file path in config. This sets a persistent custom log file location.
    #[arg(long = "set-log-file", help_heading = "Configuration")]
    pub new_log_file_path: Option<String>,

    /// Clear the custom log file path from config. This reverts to using the default log location.
    #[arg(long = "clear-log-file", help_heading = "Configuration")]
    pub clear_log_file_path: bool,

    /// List current configuration settings
    #[arg(long = "list-config", short = 'l', help_heading = "Configuration")]
    pub list_config: bool,

    /// Mirror log output to stderr in addition to the log file.
    #[arg(long = "debug", global = true, help_heading = "Debug")]
    pub debug: bool,

    /// Specify a custom log file path. If not provided, logs will be written to the default location.
    #[arg(long = "log-file", global = true, help_heading = "Debug")]
    pub log_file: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Find schools by (partial) name
    Search {
        #[arg(long, short = 'n')]
        name: String,
    },

    /// Class timetable for a day, a school week or a date range
    Timetable {
        /// School code (SD_SCHUL_CODE)
        #[arg(long, short = 's')]
        school: String,

        /// Education office code (ATPT_OFCDC_SC_CODE)
        #[arg(long, short = 'o')]
        office: String,

        /// School level or kind: els, mis, his, sps, or a name such as 고등학교
        #[arg(long)]
        level: Option<String>,

        #[arg(long, short = 'g')]
        grade: String,

        /// Class number within the grade (CLASS_NM)
        #[arg(long = "class", short = 'c')]
        class_no: String,

        /// Single day, YYYYMMDD or YYYY-MM-DD. Defaults to today.
        #[arg(long, short = 'd', conflicts_with_all = ["week", "from", "to"])]
        date: Option<String>,

        /// Any day of the wanted week; shows Monday to Friday.
        #[arg(long, short = 'w', conflicts_with_all = ["from", "to"])]
        week: Option<String>,

        #[arg(long, requires = "to")]
        from: Option<String>,

        #[arg(long, requires = "from")]
        to: Option<String>,
    },

    /// Cafeteria menu for a day, a month or a date range
    Meal {
        /// School code (SD_SCHUL_CODE)
        #[arg(long, short = 's')]
        school: String,

        /// Education office code (ATPT_OFCDC_SC_CODE)
        #[arg(long, short = 'o')]
        office: String,

        /// Single day, YYYYMMDD or YYYY-MM-DD. Defaults to today.
        #[arg(long, short = 'd', conflicts_with_all = ["month", "from", "to"])]
        date: Option<String>,

        /// Whole month, YYYYMM or YYYY-MM.
        #[arg(long, short = 'm', conflicts_with_all = ["from", "to"])]
        month: Option<String>,

        #[arg(long, requires = "to")]
        from: Option<String>,

        #[arg(long, requires = "from")]
        to: Option<String>,
    },
}

impl Args {
    /// Whether any of the config-editing flags was given.
    pub fn is_config_update(&self) -> bool {
        self.new_api_key.is_some() || self.new_log_file_path.is_some() || self.clear_log_file_path
    }
}
