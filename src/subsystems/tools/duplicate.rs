//! Near-duplicate detection for meal descriptions.
//!
//! Two descriptions match when, after lower-casing and collapsing
//! whitespace, they are equal, one contains the other, or their word sets
//! have a Jaccard similarity of at least [`JACCARD_THRESHOLD`].

use std::collections::HashSet;

use super::super::storage::types::Meal;

pub const JACCARD_THRESHOLD: f64 = 0.8;

pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// |A ∩ B| / |A ∪ B| over whitespace-separated words.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let wa: HashSet<&str> = a.split_whitespace().collect();
    let wb: HashSet<&str> = b.split_whitespace().collect();
    let union = wa.union(&wb).count();
    if union == 0 {
        return 0.0;
    }
    wa.intersection(&wb).count() as f64 / union as f64
}

pub fn is_near_duplicate(a: &str, b: &str) -> bool {
    let (a, b) = (normalize(a), normalize(b));
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(&b) || b.contains(&a) || jaccard(&a, &b) >= JACCARD_THRESHOLD
}

/// First meal in `recent` whose description nearly matches `description`.
pub fn find_duplicate<'a>(description: &str, recent: &'a [Meal]) -> Option<&'a Meal> {
    recent.iter().find(|m| is_near_duplicate(description, &m.description))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_after_normalisation() {
        assert!(is_near_duplicate("Greek  Yogurt", "greek yogurt"));
        assert!(is_near_duplicate("  oatmeal\twith honey ", "Oatmeal with honey"));
    }

    #[test]
    fn substring_either_direction() {
        assert!(is_near_duplicate("chicken caesar salad", "caesar salad"));
        assert!(is_near_duplicate("caesar salad", "chicken caesar salad"));
    }

    #[test]
    fn word_reordering_matches() {
        assert!(is_near_duplicate("rice chicken broccoli", "broccoli chicken rice"));
    }

    #[test]
    fn different_meals_do_not_match() {
        assert!(!is_near_duplicate("banana", "apple"));
        assert!(!is_near_duplicate("rice with chicken", "rice with beef"));
        assert!(!is_near_duplicate("", ""));
    }

    #[test]
    fn jaccard_values() {
        assert_eq!(jaccard("a b c d", "a b c d"), 1.0);
        assert_eq!(jaccard("a b", "c d"), 0.0);
        assert!((jaccard("a b c d e", "a b c d f") - 4.0 / 6.0).abs() < 1e-9);
    }
}
