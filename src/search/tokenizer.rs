//! Lexical tokenizer shared by indexing and querying.

use std::collections::HashMap;

use unicode_general_category::{get_general_category, GeneralCategory};

/// Lower-case `text` and split it on every character that is not a letter
/// or decimal digit. Empty runs are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !is_token_char(c))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Letters (`L*`) and decimal digits (`Nd`). Other numerics such as
/// superscripts, fractions and letter-like numerals are separators.
fn is_token_char(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::UppercaseLetter
            | GeneralCategory::LowercaseLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::ModifierLetter
            | GeneralCategory::OtherLetter
            | GeneralCategory::DecimalNumber
    )
}

/// Count occurrences of each token.
pub fn term_frequencies(tokens: &[String]) -> HashMap<String, u32> {
    let mut counts = HashMap::with_capacity(tokens.len());
    for token in tokens {
        *counts.entry(token.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_splits_on_punctuation() {
        assert_eq!(
            tokenize("Search the Web! fetch_page, v2.0"),
            vec!["search", "the", "web", "fetch", "page", "v2", "0"]
        );
    }

    #[test]
    fn test_tokenize_drops_empty_runs() {
        assert!(tokenize("  --- ,, ").is_empty());
        assert!(tokenize("").is_empty());
        assert_eq!(tokenize("--a--b--"), vec!["a", "b"]);
    }

    #[test]
    fn test_tokenize_keeps_unicode_letters() {
        assert_eq!(tokenize("Café naïve"), vec!["café", "naïve"]);
    }

    #[test]
    fn test_tokenize_splits_on_non_decimal_numerics() {
        assert_eq!(tokenize("x² ½"), vec!["x"]);
        assert_eq!(tokenize("x² ½ Ⅻ"), vec!["x"]);
        assert_eq!(tokenize("page٣ v²2"), vec!["page٣", "v", "2"]);
    }

    #[test]
    fn test_term_frequencies() {
        let tf = term_frequencies(&tokenize("web search web"));
        assert_eq!(tf.get("web"), Some(&2));
        assert_eq!(tf.get("search"), Some(&1));
        assert_eq!(tf.len(), 2);
    }
}
