//! Tool catalogue advertised to the model.
//!
//! None of the schemas has a `user_id` parameter: the caller's id is
//! attached by the agent, never chosen by the model.

use serde_json::{Value, json};

use crate::llm::ToolSpec;
use crate::subsystems::storage::types::{GoalType, MealSource, MealType, MemoryType};

pub const TOOL_NAMES: &[&str] = &[
    "save_meal",
    "get_today_meals",
    "get_meals_by_date",
    "get_week_meals",
    "edit_meal",
    "delete_meal",
    "delete_last_meal",
    "get_user_goals",
    "update_user_goals",
    "get_daily_progress",
    "calculate_daily_totals",
    "save_weight",
    "get_weight_history",
    "delete_weight",
    "get_weight_nutrition_analysis",
    "store_memory",
    "recall_memories",
    "forget_memory",
];

fn spec(name: &str, description: &str, properties: Value, required: &[&str]) -> ToolSpec {
    ToolSpec {
        name: name.to_string(),
        description: description.to_string(),
        parameters: json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    }
}

fn number(description: &str) -> Value {
    json!({ "type": "number", "description": description })
}

fn text(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn choice(values: &[&str], description: &str) -> Value {
    json!({ "type": "string", "enum": values, "description": description })
}

fn date(description: &str) -> Value {
    json!({ "type": "string", "format": "date", "description": description })
}

fn days(default: i64) -> Value {
    json!({ "type": "integer", "minimum": 1, "description": format!("Window length in days (default {default})") })
}

pub fn specs() -> Vec<ToolSpec> {
    vec![
        spec(
            "save_meal",
            "Record a meal the user ate with its estimated calories and macros (grams). \
             Refuses near-identical meals saved in the last few minutes unless force is true.",
            json!({
                "description": text("Short description of the food and portion"),
                "calories": number("Energy in kcal"),
                "protein": number("Protein in grams"),
                "fat": number("Fat in grams"),
                "carbs": number("Carbohydrates in grams"),
                "meal_type": choice(MealType::ALL, "Meal of the day (default snack)"),
                "source": choice(MealSource::ALL, "How the meal was reported (default text)"),
                "force": { "type": "boolean", "description": "Save even if a similar meal was just recorded" },
            }),
            &["description", "calories", "protein", "fat", "carbs"],
        ),
        spec("get_today_meals", "List today's meals with totals.", json!({}), &[]),
        spec(
            "get_meals_by_date",
            "List the meals of one day with totals.",
            json!({ "date": date("Day in YYYY-MM-DD") }),
            &["date"],
        ),
        spec(
            "get_week_meals",
            "Per-day totals for the last 7 days with daily averages compared to goals.",
            json!({}),
            &[],
        ),
        spec(
            "edit_meal",
            "Change fields of a recorded meal. Only the given fields change. \
             Without meal_id the most recent meal is edited.",
            json!({
                "meal_id": { "type": "integer", "description": "Id of the meal; omit for the most recent" },
                "description": text("New description"),
                "calories": number("New kcal"),
                "protein": number("New protein grams"),
                "fat": number("New fat grams"),
                "carbs": number("New carbohydrate grams"),
                "meal_type": choice(MealType::ALL, "New meal type"),
            }),
            &[],
        ),
        spec(
            "delete_meal",
            "Delete a recorded meal; the most recent one when meal_id is omitted.",
            json!({ "meal_id": { "type": "integer", "description": "Id of the meal" } }),
            &[],
        ),
        spec("delete_last_meal", "Delete the most recently recorded meal.", json!({}), &[]),
        spec(
            "get_user_goals",
            "The user's goal type and daily targets; defaults are created on first use.",
            json!({}),
            &[],
        ),
        spec(
            "update_user_goals",
            "Set the goal type and/or daily targets. Only the given fields change.",
            json!({
                "goal_type": choice(GoalType::ALL, "Overall goal"),
                "daily_calories": number("Daily kcal target"),
                "daily_protein": number("Daily protein grams"),
                "daily_fat": number("Daily fat grams"),
                "daily_carbs": number("Daily carbohydrate grams"),
                "name": text("How to address the user"),
            }),
            &[],
        ),
        spec(
            "get_daily_progress",
            "Consumed versus target for a day: percent, remaining and status per nutrient.",
            json!({ "date": date("Day in YYYY-MM-DD (default today)") }),
            &[],
        ),
        spec(
            "calculate_daily_totals",
            "Sum calories and macros of the given items without saving anything.",
            json!({
                "meals": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "calories": number("kcal"),
                            "protein": number("grams"),
                            "fat": number("grams"),
                            "carbs": number("grams"),
                        },
                    },
                },
            }),
            &["meals"],
        ),
        spec(
            "save_weight",
            "Record today's body weight in kg. A second entry on the same day replaces the first.",
            json!({ "weight": number("Body weight in kg"), "note": text("Optional remark") }),
            &["weight"],
        ),
        spec(
            "get_weight_history",
            "Weight entries in a window, newest first, with current/start/change/min/max/average.",
            json!({ "days": days(30) }),
            &[],
        ),
        spec(
            "delete_weight",
            "Delete the weight entry of a date, or the most recent one.",
            json!({ "date": date("Day in YYYY-MM-DD") }),
            &[],
        ),
        spec(
            "get_weight_nutrition_analysis",
            "Compare weight change with calorie intake against the goal over a window and explain the trend.",
            json!({ "days": days(14) }),
            &[],
        ),
        spec(
            "store_memory",
            "Remember a durable fact about the user such as an allergy, preference or habit.",
            json!({
                "memory_type": choice(MemoryType::ALL, "Kind of fact"),
                "content": text("The fact in a short sentence"),
                "metadata": text("Optional extra detail"),
            }),
            &["memory_type", "content"],
        ),
        spec(
            "recall_memories",
            "List remembered facts, grouped by type.",
            json!({ "memory_type": choice(MemoryType::ALL, "Only this kind") }),
            &[],
        ),
        spec(
            "forget_memory",
            "Forget every remembered fact containing the given text.",
            json!({ "content_substring": text("Text to match, case-insensitive") }),
            &["content_substring"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tool_has_one_spec() {
        let specs = specs();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, TOOL_NAMES);
    }

    #[test]
    fn no_schema_exposes_user_id() {
        for spec in specs() {
            assert_eq!(spec.parameters["type"], "object", "{}", spec.name);
            assert!(spec.parameters["properties"].get("user_id").is_none(), "{}", spec.name);
            for required in spec.parameters["required"].as_array().unwrap() {
                let key = required.as_str().unwrap();
                assert!(spec.parameters["properties"].get(key).is_some(), "{}: {key}", spec.name);
            }
        }
    }
}
