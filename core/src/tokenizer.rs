use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref RE: Regex = Regex::new(r"\b\w+\b").expect("valid regex");
}

/// Tokenize text into lower-cased words, in order of appearance, repeats kept.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    RE.find_iter(&lowered).map(|m| m.as_str().to_string()).collect()
}

/// Distinct lower-cased words of a text, in sorted order.
pub fn unique_terms(text: &str) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    RE.find_iter(&lowered).map(|m| m.as_str().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("The cat, the HAT!");
        assert_eq!(t, vec!["the", "cat", "the", "hat"]);
    }

    #[test]
    fn unique_terms_dedups() {
        let t = unique_terms("b a B a");
        assert_eq!(t.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
