//! Weight log tools and the weight/nutrition correlation.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use super::args::Args;
use super::outcome::{ToolError, ToolOutcome};
use super::NutritionTools;
use crate::subsystems::storage::types::{NewWeight, WeightEntry, round1};
use crate::subsystems::storage::DATE_FORMAT;

/// kcal per kilogram of body weight.
pub const KCAL_PER_KG: f64 = 7700.0;
/// Upper bound accepted for a weight entry, in kg.
pub const MAX_WEIGHT_KG: f64 = 1000.0;
/// Observed and expected change closer than this (kg) count as matching.
const ON_TRACK_TOLERANCE: f64 = 0.5;

/// Categorical reading of weight change against calorie balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Insight {
    InsufficientData,
    OnTrack,
    FasterThanExpected,
    SlowerThanExpected,
    GainingDespiteDeficit,
    GainingWithSurplus,
    GainDiffers,
    NotGainingDespiteSurplus,
    Maintenance,
}

impl Insight {
    pub fn classify(weight_change: Option<f64>, expected_change: Option<f64>, avg_deficit: f64) -> Self {
        let (Some(change), Some(expected)) = (weight_change, expected_change) else {
            return Insight::InsufficientData;
        };
        let close = (change - expected).abs() < ON_TRACK_TOLERANCE;
        if avg_deficit > 0.0 {
            if change >= 0.0 {
                Insight::GainingDespiteDeficit
            } else if close {
                Insight::OnTrack
            } else if change < expected {
                Insight::FasterThanExpected
            } else {
                Insight::SlowerThanExpected
            }
        } else if avg_deficit < 0.0 {
            if change <= 0.0 {
                Insight::NotGainingDespiteSurplus
            } else if close {
                Insight::GainingWithSurplus
            } else {
                Insight::GainDiffers
            }
        } else {
            Insight::Maintenance
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Insight::InsufficientData => {
                "Not enough data yet: log your weight at least twice and your meals for a few days."
            }
            Insight::OnTrack => "Weight is dropping in line with your calorie deficit.",
            Insight::FasterThanExpected => {
                "Weight is dropping faster than the deficit explains; part of it is likely water."
            }
            Insight::SlowerThanExpected => {
                "Weight is dropping slower than expected; some meals may be going unrecorded or underestimated."
            }
            Insight::GainingDespiteDeficit => {
                "Weight is not dropping despite a calorie deficit; check portion estimates and water retention."
            }
            Insight::GainingWithSurplus => "Weight gain matches your calorie surplus.",
            Insight::GainDiffers => "Weight is rising, but not at the rate the surplus predicts.",
            Insight::NotGainingDespiteSurplus => {
                "Weight is not rising despite a calorie surplus; activity may be higher than assumed."
            }
            Insight::Maintenance => "Calories are at maintenance and weight should hold steady.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightStats {
    pub current: f64,
    pub start: f64,
    pub change: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl WeightStats {
    /// `entries` newest first; `None` when empty.
    pub fn from_entries(entries: &[WeightEntry]) -> Option<Self> {
        let current = entries.first()?.weight;
        let start = entries.last()?.weight;
        let weights = entries.iter().map(|e| e.weight);
        let min = weights.clone().fold(f64::INFINITY, f64::min);
        let max = weights.clone().fold(f64::NEG_INFINITY, f64::max);
        let avg = weights.sum::<f64>() / entries.len() as f64;
        Some(Self {
            current,
            start,
            change: round1(current - start),
            min,
            max,
            avg: round1(avg),
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl NutritionTools {
    fn days_ago(&self, days: i64) -> String {
        (self.clock.now().date() - Duration::days(days)).format(DATE_FORMAT).to_string()
    }

    pub(super) fn save_weight(&self, user_id: &str, args: &Args) -> Result<ToolOutcome, ToolError> {
        let weight = args
            .opt_f64("weight")?
            .ok_or_else(|| ToolError::Validation("missing required argument 'weight'".into()))?;
        if weight <= 0.0 || weight >= MAX_WEIGHT_KG {
            return Err(ToolError::Validation(format!(
                "'weight' must be between 0 and {MAX_WEIGHT_KG} kg, got {weight}"
            )));
        }
        let weight = round1(weight);
        let note = args.opt_str("note")?;
        let today = self.clock.today();

        let previous = self.store.weight_before(user_id, &today)?;
        let (entry, updated) = match self.store.weight_on(user_id, &today)? {
            Some(mut existing) => {
                existing.weight = weight;
                existing.time = self.clock.time_of_day();
                if note.is_some() {
                    existing.note = note;
                }
                if !self.store.update_weight(&existing)? {
                    return Err(ToolError::NotFound(format!("weight entry {} not found", existing.id)));
                }
                (existing, true)
            }
            None => {
                let entry = self.store.insert_weight(NewWeight {
                    user_id: user_id.to_string(),
                    date: today.clone(),
                    time: self.clock.time_of_day(),
                    weight,
                    note,
                    created_at: self.clock.timestamp(),
                })?;
                (entry, false)
            }
        };
        info!(user_id, weight, updated, "tools: weight saved");

        let change = previous.as_ref().map(|p| round1(weight - p.weight));
        let mut message = if updated {
            format!("Updated today's weight to {weight} kg.")
        } else {
            format!("Recorded {weight} kg for {today}.")
        };
        if let (Some(prev), Some(change)) = (&previous, change) {
            message.push_str(&format!(" Change since {}: {change:+} kg.", prev.date));
        }
        let data = json!({ "entry": entry, "previous": previous, "change": change });
        Ok(if updated {
            ToolOutcome::updated(message, data)
        } else {
            ToolOutcome::success(message, data)
        })
    }

    pub(super) fn get_weight_history(&self, user_id: &str, args: &Args) -> Result<ToolOutcome, ToolError> {
        let days = args.days("days", 30, 3650)?;
        let from = self.days_ago(days);
        let entries = self.store.weights_since(user_id, &from)?;
        let Some(stats) = WeightStats::from_entries(&entries) else {
            return Ok(ToolOutcome::success(
                format!("No weight entries in the last {days} days."),
                json!({ "days": days, "entries": entries }),
            ));
        };

        let mut lines = vec![format!(
            "{} entr{} over {days} days. Current {} kg, change {:+} kg, range {}..{} kg, average {} kg.",
            entries.len(),
            if entries.len() == 1 { "y" } else { "ies" },
            stats.current,
            stats.change,
            stats.min,
            stats.max,
            stats.avg
        )];
        lines.extend(entries.iter().map(|e| match &e.note {
            Some(note) => format!("{}: {} kg ({note})", e.date, e.weight),
            None => format!("{}: {} kg", e.date, e.weight),
        }));
        Ok(ToolOutcome::success(
            lines.join("\n"),
            json!({ "days": days, "entries": entries, "stats": stats }),
        ))
    }

    pub(super) fn delete_weight(&self, user_id: &str, args: &Args) -> Result<ToolOutcome, ToolError> {
        let entry = match args.opt_date("date")? {
            Some(date) => self
                .store
                .weight_on(user_id, &date)?
                .ok_or_else(|| ToolError::NotFound(format!("no weight entry for {date}")))?,
            None => self
                .store
                .latest_weight(user_id)?
                .ok_or_else(|| ToolError::NotFound("no weight entries recorded yet".into()))?,
        };
        if !self.store.delete_weight(user_id, entry.id)? {
            return Err(ToolError::NotFound(format!("weight entry {} not found", entry.id)));
        }
        info!(user_id, date = %entry.date, "tools: weight deleted");
        Ok(ToolOutcome::success(
            format!("Deleted the {} kg entry from {}.", entry.weight, entry.date),
            json!({ "deleted": entry }),
        ))
    }

    pub(super) fn get_weight_nutrition_analysis(
        &self,
        user_id: &str,
        args: &Args,
    ) -> Result<ToolOutcome, ToolError> {
        let days = args.days("days", 14, 365)?;
        let from = self.days_ago(days);
        let to = self.clock.today();

        let mut weights = self.store.weights_since(user_id, &from)?;
        weights.reverse();
        let meals = self.store.meals_between(user_id, &from, &to)?;
        let goal_calories = self.ensure_goals(user_id)?.daily_calories;

        let mut calories_by_day: BTreeMap<&str, f64> = BTreeMap::new();
        for meal in &meals {
            *calories_by_day.entry(meal.date.as_str()).or_default() += meal.macros.calories;
        }
        let days_with_meals = calories_by_day.len();

        let avg_calories = (days_with_meals > 0)
            .then(|| round1(calories_by_day.values().sum::<f64>() / days_with_meals as f64));
        let avg_deficit = avg_calories.map(|avg| round1(goal_calories - avg));
        let expected_change =
            avg_deficit.map(|deficit| round2(-deficit * days_with_meals as f64 / KCAL_PER_KG));
        let weight_change = match (weights.first(), weights.last()) {
            (Some(first), Some(last)) if weights.len() >= 2 => Some(round1(last.weight - first.weight)),
            _ => None,
        };
        let insight = Insight::classify(weight_change, expected_change, avg_deficit.unwrap_or(0.0));

        let mut daily: BTreeMap<&str, (Option<f64>, Option<f64>)> = BTreeMap::new();
        for w in &weights {
            daily.entry(w.date.as_str()).or_default().0 = Some(w.weight);
        }
        for (date, calories) in &calories_by_day {
            daily.entry(*date).or_default().1 = Some(round1(*calories));
        }
        let daily_data: Vec<_> = daily
            .iter()
            .map(|(date, (weight, calories))| {
                json!({
                    "date": date,
                    "weight": weight,
                    "calories": calories,
                    "deficit_surplus": calories.map(|c| round1(goal_calories - c)),
                })
            })
            .collect();

        let mut lines = vec![format!("Analysis for the last {days} days ({from} .. {to}):")];
        match weight_change {
            Some(change) => lines.push(format!("Weight change: {change:+} kg over {} entries.", weights.len())),
            None => lines.push(format!("Weight entries: {} (need at least 2).", weights.len())),
        }
        if let (Some(avg), Some(deficit)) = (avg_calories, avg_deficit) {
            lines.push(format!(
                "Average intake {avg} kcal on {days_with_meals} day(s) with meals; goal {goal_calories}, \
                 average {} of {} kcal.",
                if deficit >= 0.0 { "deficit" } else { "surplus" },
                deficit.abs()
            ));
        }
        if let Some(expected) = expected_change {
            lines.push(format!("Expected change from calories: {expected:+} kg."));
        }
        lines.push(insight.describe().to_string());

        Ok(ToolOutcome::success(
            lines.join("\n"),
            json!({
                "days": days,
                "from": from,
                "to": to,
                "weight_entries": weights.len(),
                "weight_change": weight_change,
                "days_with_meals": days_with_meals,
                "avg_calories": avg_calories,
                "goal_calories": goal_calories,
                "avg_deficit": avg_deficit,
                "expected_weight_change": expected_change,
                "insight": insight,
                "insight_text": insight.describe(),
                "daily_data": daily_data,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::outcome::{ErrorKind, ToolStatus};
    use super::super::testing::tools_at;
    use super::*;

    #[test]
    fn classify_deficit_cases() {
        assert_eq!(Insight::classify(Some(-0.8), Some(-0.6), 400.0), Insight::OnTrack);
        assert_eq!(Insight::classify(Some(-2.0), Some(-0.6), 400.0), Insight::FasterThanExpected);
        assert_eq!(Insight::classify(Some(-0.1), Some(-1.2), 400.0), Insight::SlowerThanExpected);
        assert_eq!(Insight::classify(Some(0.3), Some(-0.6), 400.0), Insight::GainingDespiteDeficit);
    }

    #[test]
    fn classify_surplus_and_maintenance_cases() {
        assert_eq!(Insight::classify(Some(0.5), Some(0.4), -300.0), Insight::GainingWithSurplus);
        assert_eq!(Insight::classify(Some(2.0), Some(0.4), -300.0), Insight::GainDiffers);
        assert_eq!(Insight::classify(Some(-0.2), Some(0.4), -300.0), Insight::NotGainingDespiteSurplus);
        assert_eq!(Insight::classify(Some(0.1), Some(0.0), 0.0), Insight::Maintenance);
        assert_eq!(Insight::classify(None, Some(0.4), -300.0), Insight::InsufficientData);
        assert_eq!(Insight::classify(Some(0.4), None, 0.0), Insight::InsufficientData);
    }

    #[test]
    fn second_save_same_day_updates() {
        let (_dir, tools, clock) = tools_at("2026-10-15 07:00:00");
        assert_eq!(tools.execute("save_weight", "u1", &json!({ "weight": 82.4 })).status, ToolStatus::Success);
        clock.advance(chrono::Duration::days(1));
        let first = tools.execute("save_weight", "u1", &json!({ "weight": 82.0, "note": "after run" }));
        assert_eq!(first.status, ToolStatus::Success);
        assert_eq!(first.data["change"], -0.4);

        clock.advance(chrono::Duration::hours(2));
        let second = tools.execute("save_weight", "u1", &json!({ "weight": "81.8" }));
        assert_eq!(second.status, ToolStatus::Updated);
        assert_eq!(second.data["entry"]["id"], first.data["entry"]["id"]);
        assert_eq!(second.data["entry"]["note"], "after run");

        let history = tools.execute("get_weight_history", "u1", &json!({}));
        assert_eq!(history.data["entries"].as_array().unwrap().len(), 2);
        assert_eq!(history.data["stats"]["current"], 81.8);
        assert_eq!(history.data["stats"]["start"], 82.4);
        assert_eq!(history.data["stats"]["change"], -0.6);
    }

    #[test]
    fn weight_out_of_range_rejected() {
        let (_dir, tools, _clock) = tools_at("2026-10-16 07:00:00");
        for bad in [json!({ "weight": 0 }), json!({ "weight": 1200 }), json!({ "weight": "heavy" }), json!({})] {
            assert_eq!(tools.execute("save_weight", "u1", &bad).kind, Some(ErrorKind::Validation));
        }
    }

    #[test]
    fn delete_weight_by_date_and_latest() {
        let (_dir, tools, clock) = tools_at("2026-10-14 07:00:00");
        tools.execute("save_weight", "u1", &json!({ "weight": 80 }));
        clock.advance(chrono::Duration::days(1));
        tools.execute("save_weight", "u1", &json!({ "weight": 79.5 }));

        let missing = tools.execute("delete_weight", "u1", &json!({ "date": "2026-10-01" }));
        assert_eq!(missing.kind, Some(ErrorKind::NotFound));

        let latest = tools.execute("delete_weight", "u1", &json!({}));
        assert_eq!(latest.data["deleted"]["date"], "2026-10-15");
        let dated = tools.execute("delete_weight", "u1", &json!({ "date": "2026-10-14" }));
        assert_eq!(dated.data["deleted"]["weight"], 80.0);
        let empty = tools.execute("get_weight_history", "u1", &json!({}));
        assert_eq!(empty.data["entries"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn analysis_reports_deficit_and_expected_change() {
        let (_dir, tools, clock) = tools_at("2026-10-10 08:00:00");
        tools.execute("save_weight", "u1", &json!({ "weight": 80.0 }));
        for (i, desc) in ["day one", "day two", "day three", "day four", "day five", "day six", "day seven"]
            .iter()
            .enumerate()
        {
            if i > 0 {
                clock.advance(chrono::Duration::days(1));
            }
            tools.execute(
                "save_meal",
                "u1",
                &json!({ "description": desc, "calories": 1450, "protein": 100, "fat": 50, "carbs": 150 }),
            );
        }
        tools.execute("save_weight", "u1", &json!({ "weight": 79.4 }));

        let out = tools.execute("get_weight_nutrition_analysis", "u1", &json!({ "days": 14 }));
        assert_eq!(out.data["days_with_meals"], 7);
        assert_eq!(out.data["avg_calories"], 1450.0);
        assert_eq!(out.data["avg_deficit"], 550.0);
        // -550 * 7 / 7700
        assert_eq!(out.data["expected_weight_change"], -0.5);
        assert_eq!(out.data["weight_change"], -0.6);
        assert_eq!(out.data["insight"], "on_track");
        assert_eq!(out.data["daily_data"][0]["deficit_surplus"], 550.0);
        assert_eq!(out.data["daily_data"][0]["weight"], 80.0);
    }

    #[test]
    fn analysis_without_data_is_insufficient() {
        let (_dir, tools, _clock) = tools_at("2026-10-16 08:00:00");
        let out = tools.execute("get_weight_nutrition_analysis", "u1", &json!({}));
        assert_eq!(out.data["insight"], "insufficient_data");
        assert_eq!(out.data["days"], 14);
    }
}
