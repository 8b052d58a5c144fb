//! In-memory fact table used for ingredient resolution

use rusqlite::Connection;

use crate::db::DbResult;
use crate::models::NutrientFact;

use super::normalize::{contains_all_words, contains_words, fold, singular};

#[derive(Debug, Clone)]
struct Entry {
    folded: String,
    fact: NutrientFact,
}

/// Nutrient facts indexed by folded name. Resolution is deterministic:
/// entries are kept sorted by (folded name, id).
#[derive(Debug, Clone, Default)]
pub struct FactTable {
    entries: Vec<Entry>,
}

impl FactTable {
    pub fn new(facts: Vec<NutrientFact>) -> Self {
        let mut entries: Vec<Entry> = facts
            .into_iter()
            .map(|fact| Entry { folded: fold(&fact.name), fact })
            .filter(|e| !e.folded.is_empty())
            .collect();
        entries.sort_by(|a, b| a.folded.cmp(&b.folded).then(a.fact.id.cmp(&b.fact.id)));
        Self { entries }
    }

    /// Snapshot of the persisted fact table
    pub fn load(conn: &Connection) -> DbResult<Self> {
        let facts = NutrientFact::list_all(conn)?;
        tracing::debug!("Loaded {} nutrient facts", facts.len());
        Ok(Self::new(facts))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NutrientFact> {
        self.entries.iter().map(|e| &e.fact)
    }

    /// Resolve an ingredient name to a fact.
    ///
    /// Order: exact folded match, then the longest fact name found as whole
    /// words inside the ingredient, then the shortest fact name containing
    /// the ingredient, then the shortest fact name holding every ingredient
    /// word in any order. The whole chain is retried on singularized text.
    pub fn lookup(&self, name: &str) -> Option<&NutrientFact> {
        let folded = fold(name);
        if folded.is_empty() {
            return None;
        }

        self.resolve(&folded).or_else(|| {
            let single = singular(&folded);
            if single == folded {
                None
            } else {
                self.resolve(&single)
            }
        })
    }

    fn resolve(&self, folded: &str) -> Option<&NutrientFact> {
        if let Some(e) = self.entries.iter().find(|e| e.folded == folded) {
            return Some(&e.fact);
        }

        // "frango grelhado desfiado" -> "frango grelhado". Ties keep sorted order.
        let mut best: Option<&Entry> = None;
        for e in self.entries.iter().filter(|e| contains_words(folded, &e.folded)) {
            if best.map_or(true, |b| e.folded.len() > b.folded.len()) {
                best = Some(e);
            }
        }
        if let Some(e) = best {
            return Some(&e.fact);
        }

        // "feijao" -> "feijao preto cozido"
        if let Some(e) = shortest(self.entries.iter().filter(|e| contains_words(&e.folded, folded))) {
            return Some(&e.fact);
        }

        // "frango grelhado" -> "frango peito grelhado"
        shortest(self.entries.iter().filter(|e| contains_all_words(&e.folded, folded))).map(|e| &e.fact)
    }
}

/// First entry with the shortest folded name; ties keep sorted order
fn shortest<'a>(candidates: impl Iterator<Item = &'a Entry>) -> Option<&'a Entry> {
    let mut best: Option<&Entry> = None;
    for e in candidates {
        if best.map_or(true, |b| e.folded.len() < b.folded.len()) {
            best = Some(e);
        }
    }
    best
}
