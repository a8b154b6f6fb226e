//! Goal tools and daily progress against goals.

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::args::Args;
use super::outcome::{ToolError, ToolOutcome};
use super::NutritionTools;
use crate::subsystems::storage::types::{GoalType, UserGoals, round1};

/// Progress toward one daily target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    InProgress,
    AlmostDone,
    Exceeded,
}

impl ProgressStatus {
    /// `> 100 %` exceeded, `> 80 %` almost done, otherwise in progress.
    pub fn from_percent(percent: f64) -> Self {
        if percent > 100.0 {
            ProgressStatus::Exceeded
        } else if percent > 80.0 {
            ProgressStatus::AlmostDone
        } else {
            ProgressStatus::InProgress
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub consumed: f64,
    pub target: f64,
    pub remaining: f64,
    pub percent: f64,
    pub status: ProgressStatus,
}

pub fn progress(consumed: f64, target: f64) -> Progress {
    let percent = if target > 0.0 { round1(consumed / target * 100.0) } else { 0.0 };
    Progress {
        consumed: round1(consumed),
        target: round1(target),
        remaining: round1((target - consumed).max(0.0)),
        percent,
        status: ProgressStatus::from_percent(percent),
    }
}

impl NutritionTools {
    /// Stored goals, or the configured defaults written as the user's row.
    pub(super) fn ensure_goals(&self, user_id: &str) -> Result<UserGoals, ToolError> {
        if let Some(goals) = self.store.goals(user_id)? {
            return Ok(goals);
        }
        let defaults = &self.settings.default_goals;
        let goal_type = defaults.goal_type.parse::<GoalType>().unwrap_or_else(|e| {
            warn!(error = %e, "tools: bad default goal type; using maintenance");
            GoalType::Maintenance
        });
        let goals = UserGoals {
            user_id: user_id.to_string(),
            name: None,
            goal_type,
            daily_calories: defaults.daily_calories,
            daily_protein: defaults.daily_protein,
            daily_fat: defaults.daily_fat,
            daily_carbs: defaults.daily_carbs,
            updated_at: self.clock.timestamp(),
        };
        self.store.upsert_goals(&goals)?;
        info!(user_id, "tools: default goals created");
        Ok(goals)
    }

    pub(super) fn get_user_goals(&self, user_id: &str) -> Result<ToolOutcome, ToolError> {
        let goals = self.ensure_goals(user_id)?;
        Ok(ToolOutcome::success(goals_text(&goals), json!({ "goals": goals })))
    }

    pub(super) fn update_user_goals(&self, user_id: &str, args: &Args) -> Result<ToolOutcome, ToolError> {
        const FIELDS: [&str; 6] = [
            "goal_type",
            "daily_calories",
            "daily_protein",
            "daily_fat",
            "daily_carbs",
            "name",
        ];
        let goal_type = args.opt_enum::<GoalType>("goal_type")?;
        let calories = args.opt_amount("daily_calories")?;
        let protein = args.opt_amount("daily_protein")?;
        let fat = args.opt_amount("daily_fat")?;
        let carbs = args.opt_amount("daily_carbs")?;
        let name = args.opt_str("name")?;
        let given = goal_type.is_some()
            || name.is_some()
            || [calories, protein, fat, carbs].iter().any(Option::is_some);
        if !given {
            return Err(ToolError::Validation(format!(
                "nothing to update; give at least one of: {}",
                FIELDS.join(", ")
            )));
        }

        let mut goals = self.ensure_goals(user_id)?;
        if let Some(goal_type) = goal_type {
            goals.goal_type = goal_type;
        }
        if let Some(v) = calories {
            goals.daily_calories = round1(v);
        }
        if let Some(v) = protein {
            goals.daily_protein = round1(v);
        }
        if let Some(v) = fat {
            goals.daily_fat = round1(v);
        }
        if let Some(v) = carbs {
            goals.daily_carbs = round1(v);
        }
        if let Some(name) = name {
            goals.name = Some(name);
        }
        goals.updated_at = self.clock.timestamp();
        self.store.upsert_goals(&goals)?;
        info!(user_id, goal_type = %goals.goal_type, calories = goals.daily_calories, "tools: goals updated");

        Ok(ToolOutcome::updated(
            format!("Goals updated. {}", goals_text(&goals)),
            json!({ "goals": goals }),
        ))
    }

    pub(super) fn get_daily_progress(&self, user_id: &str, args: &Args) -> Result<ToolOutcome, ToolError> {
        let date = match args.opt_date("date")? {
            Some(date) => date,
            None => self.clock.today(),
        };
        let consumed = self.day_totals(user_id, &date)?;
        let goals = self.ensure_goals(user_id)?;
        let target = goals.targets();

        let calories = progress(consumed.calories, target.calories);
        let protein = progress(consumed.protein, target.protein);
        let fat = progress(consumed.fat, target.fat);
        let carbs = progress(consumed.carbs, target.carbs);

        let message = format!(
            "Progress for {date}:\n\
             Calories: {} / {} kcal ({}%), {} left\n\
             Protein: {} / {} g ({}%)\n\
             Fat: {} / {} g ({}%)\n\
             Carbs: {} / {} g ({}%)",
            calories.consumed, calories.target, calories.percent, calories.remaining,
            protein.consumed, protein.target, protein.percent,
            fat.consumed, fat.target, fat.percent,
            carbs.consumed, carbs.target, carbs.percent,
        );
        Ok(ToolOutcome::success(
            message,
            json!({
                "date": date,
                "status": calories.status,
                "calories": calories,
                "protein": protein,
                "fat": fat,
                "carbs": carbs,
            }),
        ))
    }
}

fn goals_text(goals: &UserGoals) -> String {
    format!(
        "Goal: {}. Daily targets: {} kcal, protein {} g, fat {} g, carbs {} g.",
        goals.goal_type.as_str().replace('_', " "),
        goals.daily_calories,
        goals.daily_protein,
        goals.daily_fat,
        goals.daily_carbs
    )
}
