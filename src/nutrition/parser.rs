//! Meal text parser
//!
//! Turns free meal text such as "Arroz 100g, Frango grelhado 80g e salada"
//! into ingredient candidates. Parsing is best-effort and never fails:
//! a fragment with no recognizable quantity becomes one portion of its text.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::normalize::fold;
use super::units::{lookup_unit, COUNT_UNIT, MAX_UNIT_WORDS, PORTION_UNIT};

/// One ingredient candidate extracted from meal text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedIngredient {
    /// Ingredient name as written (trimmed)
    pub name: String,
    pub quantity: f64,
    /// Canonical unit ("g", "ml", "colher de sopa", "unidade", "porcao"...)
    pub unit: String,
    /// False when the text gave no quantity and one portion was assumed
    pub explicit_quantity: bool,
    /// Source fragment
    pub fragment: String,
}

const QUANTITY: &str = r"\d+(?:[.,]\d+)?(?:\s*/\s*\d+)?";

/// Connective words allowed between a unit and the food name
const LINKING_WORDS: &[&str] = &["de", "do", "da", "dos", "das", "of"];

fn quantity_first_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"^(?P<qty>{QUANTITY})\s*(?P<rest>.*)$")).ok())
        .as_ref()
}

fn name_first_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"^(?P<name>.*?[^\d\s.,/])\s*(?P<qty>{QUANTITY})\s*(?P<rest>.*)$"
        ))
        .ok()
    })
    .as_ref()
}

fn conjunction_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s+(?:e|and)\s+").ok())
        .as_ref()
}

/// Split meal text into raw fragments on `,` `;` `+`, line breaks and the
/// conjunctions "e"/"and". A comma between two digits is a decimal comma.
pub fn split_fragments(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut pieces = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        let is_separator = match c {
            ';' | '+' | '\n' | '\r' => true,
            ',' => {
                let prev_digit = i > 0 && chars[i - 1].is_ascii_digit();
                let next_digit = chars.get(i + 1).map_or(false, |n| n.is_ascii_digit());
                !(prev_digit && next_digit)
            }
            _ => false,
        };
        if is_separator {
            pieces.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    pieces.push(current);

    pieces
        .iter()
        .flat_map(|piece| match conjunction_regex() {
            Some(re) => re.split(piece).map(str::to_string).collect::<Vec<_>>(),
            None => vec![piece.clone()],
        })
        .map(|f| f.trim().to_string())
        .filter(|f| !fold(f).is_empty())
        .collect()
}

/// Parse "1,5", "2.5" or "1/2"
fn parse_quantity(s: &str) -> Option<f64> {
    let s = s.replace(',', ".");
    let value = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.trim().parse().ok()?,
    };
    value.is_finite().then_some(value)
}

/// Match the longest unit at the start of `words`.
/// Returns the canonical unit and the number of words consumed.
fn match_unit_prefix(words: &[&str]) -> Option<(&'static str, usize)> {
    let max = MAX_UNIT_WORDS.min(words.len());
    (1..=max).rev().find_map(|n| {
        lookup_unit(&words[..n].join(" ")).map(|info| (info.canonical, n))
    })
}

/// Split a leading glued unit: "100g" leaves "g arroz" after the quantity,
/// which tokenizes the same as "100 g arroz".
fn split_unit_and_rest(rest: &str) -> (Option<&'static str>, String) {
    let words: Vec<&str> = rest.split_whitespace().collect();
    match match_unit_prefix(&words) {
        Some((unit, consumed)) => {
            let mut remaining = &words[consumed..];
            if let Some(first) = remaining.first() {
                if LINKING_WORDS.contains(&fold(first).as_str()) {
                    remaining = &remaining[1..];
                }
            }
            (Some(unit), remaining.join(" "))
        }
        None => (None, words.join(" ")),
    }
}

fn clean_name(name: &str) -> String {
    name.trim_matches(|c: char| !c.is_alphanumeric() && c != ')')
        .trim()
        .to_string()
}

fn portion_of(fragment: &str) -> Option<ParsedIngredient> {
    let name = clean_name(fragment);
    if fold(&name).is_empty() {
        return None;
    }
    Some(ParsedIngredient {
        name,
        quantity: 1.0,
        unit: PORTION_UNIT.to_string(),
        explicit_quantity: false,
        fragment: fragment.to_string(),
    })
}

/// Parse one fragment. Returns None for fragments with no food name.
pub fn parse_fragment(fragment: &str) -> Option<ParsedIngredient> {
    let fragment = fragment.trim();
    if fold(fragment).is_empty() {
        return None;
    }

    // "100g de arroz", "2 bananas", "1/2 xícara de leite"
    if let Some(caps) = quantity_first_regex().and_then(|re| re.captures(fragment)) {
        if let Some(quantity) = parse_quantity(&caps["qty"]) {
            let (unit, name) = split_unit_and_rest(&caps["rest"]);
            let name = clean_name(&name);
            if fold(&name).is_empty() {
                return None;
            }
            return Some(ParsedIngredient {
                name,
                quantity,
                unit: unit.unwrap_or(COUNT_UNIT).to_string(),
                explicit_quantity: true,
                fragment: fragment.to_string(),
            });
        }
    }

    // "Frango grelhado 80g", "Leite 180 ml", "Pão 2 fatias"
    if let Some(caps) = name_first_regex().and_then(|re| re.captures(fragment)) {
        if let Some(quantity) = parse_quantity(&caps["qty"]) {
            let rest = caps["rest"].trim();
            let (unit, trailing) = split_unit_and_rest(rest);
            if rest.is_empty() || unit.is_some() {
                let mut name = caps["name"].to_string();
                if !trailing.is_empty() {
                    name.push(' ');
                    name.push_str(&trailing);
                }
                return Some(ParsedIngredient {
                    name: clean_name(&name),
                    quantity,
                    unit: unit.unwrap_or(COUNT_UNIT).to_string(),
                    explicit_quantity: true,
                    fragment: fragment.to_string(),
                });
            }
        }
    }

    portion_of(fragment)
}

/// Parse a whole meal text field
pub fn parse_meal_text(text: &str) -> Vec<ParsedIngredient> {
    split_fragments(text)
        .iter()
        .filter_map(|fragment| parse_fragment(fragment))
        .collect()
}
