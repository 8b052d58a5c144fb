//! Text folding for case- and diacritic-insensitive matching

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase, strip diacritics, turn punctuation into spaces and collapse
/// whitespace. "Feijão  Preto!" -> "feijao preto"
pub fn fold(s: &str) -> String {
    let stripped: String = s
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Folded words
pub fn tokens(s: &str) -> Vec<String> {
    fold(s).split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect()
}

/// Crude Portuguese/English plural folding on an already folded string:
/// drops a trailing "s" from words longer than three letters.
pub fn singular(folded: &str) -> String {
    folded
        .split(' ')
        .map(|w| {
            if w.len() > 3 && w.ends_with('s') {
                &w[..w.len() - 1]
            } else {
                w
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when `needle` occurs in `haystack` as whole words. Both folded.
pub fn contains_words(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    format!(" {} ", haystack).contains(&format!(" {} ", needle))
}

/// True when every word of `needle` appears somewhere in `haystack`. Both folded.
pub fn contains_all_words(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let words: Vec<&str> = haystack.split(' ').collect();
    needle.split(' ').all(|w| words.contains(&w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_strips_accents_and_case() {
        assert_eq!(fold("Feijão  Preto!"), "feijao preto");
        assert_eq!(fold("GLÚTEN"), "gluten");
        assert_eq!(fold("Maçã, pêra"), "maca pera");
        assert_eq!(fold(""), "");
    }

    #[test]
    fn test_tokens() {
        assert_eq!(tokens("Pasta de amendoim."), vec!["pasta", "de", "amendoim"]);
    }

    #[test]
    fn test_singular() {
        assert_eq!(singular("bananas maduras"), "banana madura");
        assert_eq!(singular("ovos"), "ovo");
        assert_eq!(singular("gas"), "gas");
    }

    #[test]
    fn test_contains_words() {
        assert!(contains_words("frango grelhado", "frango"));
        assert!(!contains_words("renovo", "ovo"));
        assert!(!contains_words("arroz", ""));
    }

    #[test]
    fn test_contains_all_words() {
        assert!(contains_all_words("frango peito grelhado", "frango grelhado"));
        assert!(contains_all_words("frango peito grelhado", "grelhado frango"));
        assert!(!contains_all_words("frango peito grelhado", "frango assado"));
        assert!(!contains_all_words("frango", ""));
    }
}
