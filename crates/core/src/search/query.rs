//! Query normalization
//!
//! A query wrapped in matching quotes is a literal phrase. An unquoted single
//! alphanumeric token matches whole words only. Anything else is a literal
//! substring. Matching is case-insensitive in every mode.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    Phrase,
    WholeWord,
    Substring,
}

#[derive(Debug, Clone)]
pub struct SearchPattern {
    mode: QueryMode,
    needle: String,
    regex: Regex,
}

impl PartialEq for SearchPattern {
    fn eq(&self, other: &Self) -> bool {
        self.mode == other.mode && self.needle == other.needle
    }
}

impl SearchPattern {
    /// Returns `None` for a query with nothing to match.
    pub fn compile(query: &str) -> Option<Self> {
        let trimmed = query.trim();

        let (mode, needle) = match strip_quotes(trimmed) {
            Some(inner) => (QueryMode::Phrase, inner),
            None if is_single_token(trimmed) => (QueryMode::WholeWord, trimmed),
            None => (QueryMode::Substring, trimmed),
        };

        if needle.is_empty() {
            return None;
        }

        let escaped = regex::escape(needle);
        let pattern = match mode {
            QueryMode::WholeWord => format!(r"\b{escaped}\b"),
            QueryMode::Phrase | QueryMode::Substring => escaped,
        };

        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .ok()?;
        Some(Self {
            mode,
            needle: needle.to_string(),
            regex,
        })
    }

    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// Non-overlapping matches as character (not byte) ranges.
    pub fn find_char_ranges(&self, text: &str) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut chars_before = 0;
        let mut last_byte = 0;

        for found in self.regex.find_iter(text) {
            if found.start() == found.end() {
                continue;
            }

            chars_before += text[last_byte..found.start()].chars().count();
            let len = found.as_str().chars().count();
            ranges.push(chars_before..chars_before + len);

            chars_before += len;
            last_byte = found.end();
        }

        ranges
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

fn strip_quotes(query: &str) -> Option<&str> {
    const PAIRS: [(char, char); 3] = [('"', '"'), ('\'', '\''), ('\u{201c}', '\u{201d}')];

    for (open, close) in PAIRS {
        if query.chars().count() >= 2 && query.starts_with(open) && query.ends_with(close) {
            let inner = &query[open.len_utf8()..query.len() - close.len_utf8()];
            return Some(inner);
        }
    }

    None
}

fn is_single_token(query: &str) -> bool {
    !query.is_empty() && query.chars().all(char::is_alphanumeric)
}

/// Splits a query into the terms used for result-line highlighting.
///
/// Surrounding quotes are dropped and the rest is split on whitespace.
pub fn query_terms(query: &str) -> Vec<String> {
    let trimmed = query.trim();
    let inner = strip_quotes(trimmed).unwrap_or(trimmed);
    inner.split_whitespace().map(str::to_string).collect()
}

/// Case-insensitive alternation over `terms`, longest first so that a term
/// never shadows a longer one that starts the same way.
pub fn terms_regex(terms: &[String]) -> Option<Regex> {
    if terms.is_empty() {
        return None;
    }

    let mut sorted: Vec<&String> = terms.iter().collect();
    sorted.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    let alternation = sorted
        .iter()
        .map(|term| regex::escape(term))
        .collect::<Vec<_>>()
        .join("|");

    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_word_matches_whole_words_only() {
        let pattern = SearchPattern::compile("person").unwrap();

        assert_eq!(pattern.mode(), QueryMode::WholeWord);
        assert_eq!(
            pattern.find_char_ranges("a person, a Person"),
            vec![2..8, 12..18]
        );
        assert!(pattern.find_char_ranges("personal persons").is_empty());
    }

    #[test]
    fn quoted_phrase_matches_the_literal_sequence() {
        let pattern = SearchPattern::compile("\"a b\"").unwrap();

        assert_eq!(pattern.mode(), QueryMode::Phrase);
        assert_eq!(pattern.find_char_ranges("x a b y"), vec![2..5]);
        assert!(pattern.find_char_ranges("a  b").is_empty());
        assert!(pattern.find_char_ranges("b a").is_empty());
    }

    #[test]
    fn single_quotes_and_curly_quotes_are_phrases() {
        let single = SearchPattern::compile("'of the'").unwrap();
        let curly = SearchPattern::compile("\u{201c}of the\u{201d}").unwrap();

        assert_eq!(single.needle(), "of the");
        assert_eq!(curly.needle(), "of the");
    }

    #[test]
    fn punctuated_query_is_a_substring() {
        let pattern = SearchPattern::compile("e.g.").unwrap();

        assert_eq!(pattern.mode(), QueryMode::Substring);
        assert_eq!(pattern.find_char_ranges("see E.G. here"), vec![4..8]);
        assert!(pattern.find_char_ranges("eXgY").is_empty());
    }

    #[test]
    fn ranges_count_characters_not_bytes() {
        let pattern = SearchPattern::compile("cafe").unwrap();

        assert_eq!(pattern.find_char_ranges("é cafe"), vec![2..6]);
    }

    #[test]
    fn blank_queries_compile_to_nothing() {
        assert!(SearchPattern::compile("").is_none());
        assert!(SearchPattern::compile("   ").is_none());
        assert!(SearchPattern::compile("\"\"").is_none());
    }

    #[test]
    fn terms_drop_quotes_and_split_on_whitespace() {
        assert_eq!(
            query_terms("  \"tyger burning\" "),
            vec!["tyger", "burning"]
        );
        assert!(terms_regex(&[]).is_none());

        let regex = terms_regex(&query_terms("in into")).unwrap();
        assert_eq!(regex.find("INTO").map(|m| m.as_str()), Some("INTO"));
    }
}
