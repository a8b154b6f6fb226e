//! Row types for the four nutrition tables plus their enumerations.
//!
//! Dates are `YYYY-MM-DD`, times `HH:MM`, timestamps `YYYY-MM-DD HH:MM:SS`
//! (local time).  They are kept as strings so that both backends store and
//! compare them the same way; ISO ordering is lexicographic ordering.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Error returned when parsing an enumeration from user-supplied text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static [&'static str],
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown {} '{}' (expected one of: {})",
            self.kind,
            self.value,
            self.expected.join(", ")
        )
    }
}

impl std::error::Error for UnknownVariant {}

/// Declares a snake_case string enum with `as_str`, `Display`, `FromStr`.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [&'static str] = &[$($text),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant { kind: $kind, value: s.to_string(), expected: Self::ALL }),
                }
            }
        }
    };
}

string_enum!(
    /// Which meal of the day an entry belongs to.
    MealType, "meal type", {
        Breakfast => "breakfast",
        Lunch => "lunch",
        Dinner => "dinner",
        Snack => "snack",
    }
);

string_enum!(
    /// How the meal was reported.
    MealSource, "meal source", {
        Text => "text",
        Photo => "photo",
        Voice => "voice",
    }
);

string_enum!(
    GoalType, "goal type", {
        WeightLoss => "weight_loss",
        MuscleGain => "muscle_gain",
        Maintenance => "maintenance",
    }
);

string_enum!(
    MemoryType, "memory type", {
        Preference => "preference",
        Allergy => "allergy",
        Habit => "habit",
        Fact => "fact",
    }
);

/// Calories plus the three macronutrients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Macros {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

impl Macros {
    pub fn add(&mut self, other: &Macros) {
        self.calories += other.calories;
        self.protein += other.protein;
        self.fat += other.fat;
        self.carbs += other.carbs;
    }

    /// Each field rounded to one decimal place.
    pub fn rounded(&self) -> Macros {
        Macros {
            calories: round1(self.calories),
            protein: round1(self.protein),
            fat: round1(self.fat),
            carbs: round1(self.carbs),
        }
    }

    pub fn sum<'a>(items: impl IntoIterator<Item = &'a Macros>) -> Macros {
        let mut total = Macros::default();
        for m in items {
            total.add(m);
        }
        total.rounded()
    }
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ── meals ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meal {
    pub id: i64,
    pub user_id: String,
    pub date: String,
    pub time: String,
    pub meal_type: MealType,
    pub description: String,
    #[serde(flatten)]
    pub macros: Macros,
    pub source: MealSource,
    pub created_at: String,
}

/// A meal about to be inserted; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeal {
    pub user_id: String,
    pub date: String,
    pub time: String,
    pub meal_type: MealType,
    pub description: String,
    pub macros: Macros,
    pub source: MealSource,
    pub created_at: String,
}

impl NewMeal {
    pub fn with_id(self, id: i64) -> Meal {
        Meal {
            id,
            user_id: self.user_id,
            date: self.date,
            time: self.time,
            meal_type: self.meal_type,
            description: self.description,
            macros: self.macros,
            source: self.source,
            created_at: self.created_at,
        }
    }
}

// ── goals ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserGoals {
    pub user_id: String,
    pub name: Option<String>,
    pub goal_type: GoalType,
    pub daily_calories: f64,
    pub daily_protein: f64,
    pub daily_fat: f64,
    pub daily_carbs: f64,
    pub updated_at: String,
}

impl UserGoals {
    pub fn targets(&self) -> Macros {
        Macros {
            calories: self.daily_calories,
            protein: self.daily_protein,
            fat: self.daily_fat,
            carbs: self.daily_carbs,
        }
    }
}

// ── weight ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightEntry {
    pub id: i64,
    pub user_id: String,
    pub date: String,
    pub time: String,
    pub weight: f64,
    pub note: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWeight {
    pub user_id: String,
    pub date: String,
    pub time: String,
    pub weight: f64,
    pub note: Option<String>,
    pub created_at: String,
}

impl NewWeight {
    pub fn with_id(self, id: i64) -> WeightEntry {
        WeightEntry {
            id,
            user_id: self.user_id,
            date: self.date,
            time: self.time,
            weight: self.weight,
            note: self.note,
            created_at: self.created_at,
        }
    }
}

// ── memory bank ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryItem {
    pub id: i64,
    pub user_id: String,
    pub memory_type: MemoryType,
    pub content: String,
    pub metadata: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMemory {
    pub user_id: String,
    pub memory_type: MemoryType,
    pub content: String,
    pub metadata: Option<String>,
    pub created_at: String,
}

impl NewMemory {
    pub fn with_id(self, id: i64) -> MemoryItem {
        MemoryItem {
            id,
            user_id: self.user_id,
            memory_type: self.memory_type,
            content: self.content,
            metadata: self.metadata,
            created_at: self.created_at,
        }
    }
}
