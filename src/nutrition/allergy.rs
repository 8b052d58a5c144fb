//! Allergy cross-checker
//!
//! Keyword overlap between meal text and the children's declared allergies.
//! Results are informational and never block editing or saving.

use chrono::{NaiveDate, Weekday};
use serde::Serialize;

use crate::models::{ChildAllergyRecord, MenuItem};

use super::aggregate::day_name;
use super::normalize::{fold, tokens};
use super::units::lookup_unit;

/// Shortest keyword considered
pub const MIN_KEYWORD_LEN: usize = 3;

/// Connectives and qualifiers that must never trigger a match on their own
const STOPWORDS: &[&str] = &[
    "com", "sem", "de", "do", "da", "dos", "das", "em", "no", "na", "nos", "nas", "um", "uma",
    "uns", "umas", "para", "por", "pra", "que", "ou", "ao", "aos", "mais", "menos", "muito",
    "pouco", "leve", "tipo", "alergia", "alergico", "alergica", "intolerancia", "intolerante",
    "with", "without", "and", "the", "for", "allergy", "allergic", "free",
];

fn is_keyword(token: &str) -> bool {
    token.chars().count() >= MIN_KEYWORD_LEN && !STOPWORDS.contains(&token)
}

/// One child whose allergies overlap with a meal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllergyAlert {
    pub child_id: i64,
    pub child_name: String,
    pub allergies: String,
    /// Folded terms that produced the match, sorted
    pub matched_terms: Vec<String>,
}

/// Children in `roster` whose allergy text overlaps `meal_text`.
/// Inactive children and children without allergies are skipped.
pub fn check_allergies(meal_text: &str, roster: &[ChildAllergyRecord]) -> Vec<AllergyAlert> {
    let meal = fold(meal_text);
    if meal.is_empty() {
        return Vec::new();
    }

    let meal_tokens: Vec<String> = tokens(meal_text)
        .into_iter()
        .filter(|t| is_keyword(t))
        .filter(|t| !t.chars().any(|c| c.is_ascii_digit()))
        .filter(|t| lookup_unit(t).is_none())
        .collect();

    let mut alerts = Vec::new();
    for child in roster.iter().filter(|c| c.active) {
        let allergy = fold(child.allergy_text());
        if allergy.is_empty() {
            continue;
        }

        let mut matched: Vec<String> = tokens(&allergy)
            .into_iter()
            .filter(|k| is_keyword(k) && meal.contains(k.as_str()))
            .collect();
        matched.extend(
            meal_tokens
                .iter()
                .filter(|t| allergy.contains(t.as_str()))
                .cloned(),
        );
        matched.sort();
        matched.dedup();

        if !matched.is_empty() {
            alerts.push(AllergyAlert {
                child_id: child.id,
                child_name: child.name.clone(),
                allergies: child.allergy_text().to_string(),
                matched_terms: matched,
            });
        }
    }

    alerts
}

/// Alerts for one weekday of a week
#[derive(Debug, Clone, Serialize)]
pub struct DayAllergyAlerts {
    pub weekday: Weekday,
    pub day_name: &'static str,
    pub date: NaiveDate,
    pub alerts: Vec<AllergyAlert>,
}

/// Run the check per weekday over the text of that day's applicable slots.
/// Days without alerts are omitted.
pub fn week_allergy_alerts(items: &[MenuItem], roster: &[ChildAllergyRecord]) -> Vec<DayAllergyAlerts> {
    items
        .iter()
        .filter_map(|item| {
            let alerts = check_allergies(&item.applicable_text(), roster);
            if alerts.is_empty() {
                return None;
            }
            Some(DayAllergyAlerts {
                weekday: item.weekday,
                day_name: day_name(item.weekday),
                date: item.date(),
                alerts,
            })
        })
        .collect()
}
