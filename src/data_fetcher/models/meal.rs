use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::common::{FromUpstreamRow, text_field};
use crate::constants::neis::LUNCH_MEAL_CODE;

/// One served meal. `menu` is passed through as the hub sends it, dishes
/// separated by `<br/>`; turning that into display text is the consumer's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealRow {
    pub date: String,
    pub menu: String,
    /// Meal name such as 조식, 중식 or 석식.
    #[serde(default)]
    pub kind: String,
    /// Meal code: 1 breakfast, 2 lunch, 3 dinner.
    #[serde(default)]
    pub meal_code: String,
}

impl MealRow {
    pub fn is_lunch(&self) -> bool {
        self.meal_code == LUNCH_MEAL_CODE
    }
}

impl FromUpstreamRow for MealRow {
    fn from_row(row: &Map<String, Value>) -> Self {
        Self {
            date: text_field(row, "MLSV_YMD"),
            menu: text_field(row, "DDISH_NM"),
            kind: text_field(row, "MMEAL_SC_NM"),
            meal_code: text_field(row, "MMEAL_SC_CODE"),
        }
    }
}

/// Picks the meal to show for a single day: lunch when served, otherwise
/// whatever comes first.
pub fn pick_daily_meal(meals: Vec<MealRow>) -> Option<MealRow> {
    let lunch = meals.iter().position(MealRow::is_lunch);
    meals.into_iter().nth(lunch.unwrap_or(0))
}
