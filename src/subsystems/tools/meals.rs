//! Meal tools: save (with the duplicate guard), fetch, edit, delete, totals.

use std::collections::BTreeMap;

use chrono::Duration;
use serde_json::{Value, json};
use tracing::info;

use super::args::Args;
use super::duplicate::find_duplicate;
use super::goals::progress;
use super::outcome::{ToolError, ToolOutcome, ToolStatus};
use super::NutritionTools;
use crate::subsystems::storage::types::{Macros, Meal, MealSource, MealType, NewMeal, round1};
use crate::subsystems::storage::{DATE_FORMAT, TIME_FORMAT, TIMESTAMP_FORMAT};

/// Days covered by `get_week_meals`, today included.
pub const WEEK_DAYS: i64 = 7;

impl NutritionTools {
    pub(super) fn save_meal(&self, user_id: &str, args: &Args) -> Result<ToolOutcome, ToolError> {
        let description = args.str("description")?;
        let macros = Macros {
            calories: args.required_amount("calories")?,
            protein: args.required_amount("protein")?,
            fat: args.required_amount("fat")?,
            carbs: args.required_amount("carbs")?,
        };
        let meal_type = args.opt_enum::<MealType>("meal_type")?.unwrap_or(MealType::Snack);
        let source = args.opt_enum::<MealSource>("source")?.unwrap_or(MealSource::Text);
        let force = args.bool("force")?;

        let now = self.clock.now();
        if !force {
            let since = (now - Duration::seconds(self.settings.duplicate_window_secs))
                .format(TIMESTAMP_FORMAT)
                .to_string();
            let recent = self.store.meals_created_since(user_id, &since)?;
            if let Some(existing) = find_duplicate(&description, &recent) {
                info!(user_id, existing_id = existing.id, "tools: duplicate meal prevented");
                return Ok(ToolOutcome::new(
                    ToolStatus::DuplicatePrevented,
                    format!(
                        "A similar meal was already recorded at {}: \"{}\" (id {}). \
                         Not saved again; pass force=true if this really is a second portion.",
                        existing.time, existing.description, existing.id
                    ),
                    json!({ "existing_meal": existing }),
                ));
            }
        }

        let meal = self.store.insert_meal(NewMeal {
            user_id: user_id.to_string(),
            date: now.format(DATE_FORMAT).to_string(),
            time: now.format(TIME_FORMAT).to_string(),
            meal_type,
            description,
            macros: macros.rounded(),
            source,
            created_at: now.format(TIMESTAMP_FORMAT).to_string(),
        })?;
        info!(user_id, meal_id = meal.id, calories = meal.macros.calories, "tools: meal saved");

        let totals = self.day_totals(user_id, &meal.date)?;
        Ok(ToolOutcome::success(
            format!(
                "Saved {} \"{}\": {} kcal (P {} / F {} / C {}). Today so far: {} kcal.",
                meal.meal_type, meal.description, meal.macros.calories, meal.macros.protein,
                meal.macros.fat, meal.macros.carbs, totals.calories
            ),
            json!({ "meal": meal, "daily_totals": totals }),
        ))
    }

    pub(super) fn get_today_meals(&self, user_id: &str) -> Result<ToolOutcome, ToolError> {
        self.meals_on(user_id, &self.clock.today())
    }

    pub(super) fn get_meals_by_date(&self, user_id: &str, args: &Args) -> Result<ToolOutcome, ToolError> {
        let date = args
            .opt_date("date")?
            .ok_or_else(|| ToolError::Validation("missing required argument 'date'".into()))?;
        self.meals_on(user_id, &date)
    }

    fn meals_on(&self, user_id: &str, date: &str) -> Result<ToolOutcome, ToolError> {
        let meals = self.store.meals_between(user_id, date, date)?;
        let totals = Macros::sum(meals.iter().map(|m| &m.macros));
        let message = if meals.is_empty() {
            format!("No meals recorded for {date}.")
        } else {
            let mut lines = vec![format!("{} meal(s) on {date}:", meals.len())];
            lines.extend(meals.iter().map(meal_line));
            lines.push(format!(
                "Total: {} kcal (P {} / F {} / C {})",
                totals.calories, totals.protein, totals.fat, totals.carbs
            ));
            lines.join("\n")
        };
        Ok(ToolOutcome::success(
            message,
            json!({ "date": date, "count": meals.len(), "meals": meals, "totals": totals }),
        ))
    }

    pub(super) fn get_week_meals(&self, user_id: &str) -> Result<ToolOutcome, ToolError> {
        let today = self.clock.now().date();
        let from = (today - Duration::days(WEEK_DAYS - 1)).format(DATE_FORMAT).to_string();
        let to = today.format(DATE_FORMAT).to_string();
        let meals = self.store.meals_between(user_id, &from, &to)?;

        let mut by_day: BTreeMap<&str, (usize, Macros)> = BTreeMap::new();
        for meal in &meals {
            let day = by_day.entry(meal.date.as_str()).or_default();
            day.0 += 1;
            day.1.add(&meal.macros);
        }

        let days: Vec<Value> = by_day
            .iter()
            .map(|(date, (count, totals))| json!({ "date": date, "meals": count, "totals": totals.rounded() }))
            .collect();
        let days_with_data = by_day.len();
        let goals = self.ensure_goals(user_id)?;

        if days_with_data == 0 {
            return Ok(ToolOutcome::success(
                format!("No meals recorded between {from} and {to}."),
                json!({ "from": from, "to": to, "days": days, "days_with_data": 0 }),
            ));
        }

        let mut sum = Macros::default();
        for (_, totals) in by_day.values() {
            sum.add(totals);
        }
        let n = days_with_data as f64;
        let average = Macros {
            calories: round1(sum.calories / n),
            protein: round1(sum.protein / n),
            fat: round1(sum.fat / n),
            carbs: round1(sum.carbs / n),
        };
        let target = goals.targets();
        let vs_goal = json!({
            "calories": progress(average.calories, target.calories),
            "protein": progress(average.protein, target.protein),
            "fat": progress(average.fat, target.fat),
            "carbs": progress(average.carbs, target.carbs),
        });

        let mut lines = vec![format!("Week {from} .. {to} ({days_with_data} day(s) with meals):")];
        lines.extend(by_day.iter().map(|(date, (count, totals))| {
            format!("{date}: {} kcal from {count} meal(s)", round1(totals.calories))
        }));
        lines.push(format!(
            "Daily average: {} kcal (goal {}), P {} / F {} / C {}",
            average.calories, target.calories, average.protein, average.fat, average.carbs
        ));

        Ok(ToolOutcome::success(
            lines.join("\n"),
            json!({
                "from": from,
                "to": to,
                "days": days,
                "days_with_data": days_with_data,
                "total": sum.rounded(),
                "daily_average": average,
                "goals": goals,
                "average_vs_goal": vs_goal,
            }),
        ))
    }

    pub(super) fn edit_meal(&self, user_id: &str, args: &Args) -> Result<ToolOutcome, ToolError> {
        const FIELDS: [&str; 6] = ["description", "calories", "protein", "fat", "carbs", "meal_type"];
        // Blank strings parse to None, so decide emptiness after parsing.
        let description = args.opt_str("description")?;
        let calories = args.opt_amount("calories")?;
        let protein = args.opt_amount("protein")?;
        let fat = args.opt_amount("fat")?;
        let carbs = args.opt_amount("carbs")?;
        let meal_type = args.opt_enum::<MealType>("meal_type")?;
        let given = description.is_some()
            || meal_type.is_some()
            || [calories, protein, fat, carbs].iter().any(Option::is_some);
        if !given {
            return Err(ToolError::Validation(format!(
                "nothing to update; give at least one of: {}",
                FIELDS.join(", ")
            )));
        }

        let before = self.addressed_meal(user_id, args)?;
        let mut meal = before.clone();
        if let Some(description) = description {
            meal.description = description;
        }
        if let Some(v) = calories {
            meal.macros.calories = round1(v);
        }
        if let Some(v) = protein {
            meal.macros.protein = round1(v);
        }
        if let Some(v) = fat {
            meal.macros.fat = round1(v);
        }
        if let Some(v) = carbs {
            meal.macros.carbs = round1(v);
        }
        if let Some(meal_type) = meal_type {
            meal.meal_type = meal_type;
        }

        if !self.store.update_meal(&meal)? {
            return Err(ToolError::NotFound(format!("meal {} no longer exists", meal.id)));
        }
        info!(user_id, meal_id = meal.id, "tools: meal edited");
        Ok(ToolOutcome::updated(
            format!("Updated meal {}: {}", meal.id, meal_line(&meal)),
            json!({ "meal": meal, "previous": before }),
        ))
    }

    pub(super) fn delete_meal(&self, user_id: &str, args: &Args) -> Result<ToolOutcome, ToolError> {
        let meal = self.addressed_meal(user_id, args)?;
        if !self.store.delete_meal(user_id, meal.id)? {
            return Err(ToolError::NotFound(format!("meal {} not found", meal.id)));
        }
        info!(user_id, meal_id = meal.id, "tools: meal deleted");
        let totals = self.day_totals(user_id, &meal.date)?;
        Ok(ToolOutcome::success(
            format!(
                "Deleted \"{}\" ({} kcal). Remaining total for {}: {} kcal.",
                meal.description, meal.macros.calories, meal.date, totals.calories
            ),
            json!({ "deleted": meal, "daily_totals": totals }),
        ))
    }

    pub(super) fn calculate_daily_totals(&self, args: &Args) -> Result<ToolOutcome, ToolError> {
        let items = args.array("meals")?;
        let mut parsed = Vec::with_capacity(items.len());
        for item in items {
            let item = Args::new(item)?;
            parsed.push(Macros {
                calories: item.amount("calories")?,
                protein: item.amount("protein")?,
                fat: item.amount("fat")?,
                carbs: item.amount("carbs")?,
            });
        }
        let totals = Macros::sum(parsed.iter());
        Ok(ToolOutcome::success(
            format!(
                "{} item(s): {} kcal (P {} / F {} / C {})",
                parsed.len(),
                totals.calories,
                totals.protein,
                totals.fat,
                totals.carbs
            ),
            json!({ "count": parsed.len(), "totals": totals }),
        ))
    }

    /// The meal named by `meal_id`, or the most recent one.
    fn addressed_meal(&self, user_id: &str, args: &Args) -> Result<Meal, ToolError> {
        match args.opt_i64("meal_id")? {
            Some(id) => self
                .store
                .meal(user_id, id)?
                .ok_or_else(|| ToolError::NotFound(format!("meal {id} not found"))),
            None => self
                .store
                .latest_meal(user_id)?
                .ok_or_else(|| ToolError::NotFound("no meals recorded yet".into())),
        }
    }

    pub(super) fn day_totals(&self, user_id: &str, date: &str) -> Result<Macros, ToolError> {
        let meals = self.store.meals_between(user_id, date, date)?;
        Ok(Macros::sum(meals.iter().map(|m| &m.macros)))
    }
}

fn meal_line(meal: &Meal) -> String {
    format!(
        "#{} {} {} \"{}\" {} kcal (P {} / F {} / C {})",
        meal.id,
        meal.time,
        meal.meal_type,
        meal.description,
        meal.macros.calories,
        meal.macros.protein,
        meal.macros.fat,
        meal.macros.carbs
    )
}
