//! Shared nutrition record
//!
//! Used by the fact table, meal slots, day totals and the weekly summary.
//! "No data" is modelled as `Option::None`, never as a zeroed record.

use serde::{Deserialize, Serialize};

/// Ten-field nutrient aggregate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionTotals {
    pub energy: f64,       // kcal
    pub protein: f64,      // grams
    pub lipid: f64,        // grams
    pub carbohydrate: f64, // grams
    pub fiber: f64,        // grams
    pub calcium: f64,      // milligrams
    pub iron: f64,         // milligrams
    pub sodium: f64,       // milligrams
    pub vitamin_c: f64,    // milligrams
    pub vitamin_a: f64,    // micrograms
}

impl NutritionTotals {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Scale every field by a multiplier
    pub fn scale(&self, multiplier: f64) -> Self {
        Self {
            energy: self.energy * multiplier,
            protein: self.protein * multiplier,
            lipid: self.lipid * multiplier,
            carbohydrate: self.carbohydrate * multiplier,
            fiber: self.fiber * multiplier,
            calcium: self.calcium * multiplier,
            iron: self.iron * multiplier,
            sodium: self.sodium * multiplier,
            vitamin_c: self.vitamin_c * multiplier,
            vitamin_a: self.vitamin_a * multiplier,
        }
    }

    /// Field-wise sum
    pub fn add(&self, other: &NutritionTotals) -> Self {
        Self {
            energy: self.energy + other.energy,
            protein: self.protein + other.protein,
            lipid: self.lipid + other.lipid,
            carbohydrate: self.carbohydrate + other.carbohydrate,
            fiber: self.fiber + other.fiber,
            calcium: self.calcium + other.calcium,
            iron: self.iron + other.iron,
            sodium: self.sodium + other.sodium,
            vitamin_c: self.vitamin_c + other.vitamin_c,
            vitamin_a: self.vitamin_a + other.vitamin_a,
        }
    }

    /// True when every field is finite and non-negative
    pub fn is_valid(&self) -> bool {
        self.fields().iter().all(|(_, v)| v.is_finite() && *v >= 0.0)
    }

    /// (name, value) pairs in display order
    pub fn fields(&self) -> [(&'static str, f64); 10] {
        [
            ("energy", self.energy),
            ("protein", self.protein),
            ("lipid", self.lipid),
            ("carbohydrate", self.carbohydrate),
            ("fiber", self.fiber),
            ("calcium", self.calcium),
            ("iron", self.iron),
            ("sodium", self.sodium),
            ("vitamin_c", self.vitamin_c),
            ("vitamin_a", self.vitamin_a),
        ]
    }
}

impl std::ops::Add for NutritionTotals {
    type Output = NutritionTotals;

    fn add(self, other: NutritionTotals) -> NutritionTotals {
        NutritionTotals::add(&self, &other)
    }
}

impl std::ops::Mul<f64> for NutritionTotals {
    type Output = NutritionTotals;

    fn mul(self, multiplier: f64) -> NutritionTotals {
        self.scale(multiplier)
    }
}

impl std::iter::Sum for NutritionTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(NutritionTotals::zero(), |acc, n| acc + n)
    }
}

/// Sum the present records; `None` iff every item is `None` (or there are none)
pub fn sum_present<I>(iter: I) -> Option<NutritionTotals>
where
    I: IntoIterator<Item = Option<NutritionTotals>>,
{
    iter.into_iter().flatten().fold(None, |acc, n| match acc {
        Some(total) => Some(total + n),
        None => Some(n),
    })
}
