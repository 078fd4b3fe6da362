//! Whole-word phrase matching
//!
//! Phrase lists are compiled once into word-bounded regexes. A phrase counts
//! at most once per transcript, however often it repeats.

use regex::Regex;

#[derive(Debug, Clone)]
struct Entry {
    phrase: &'static str,
    weight: f32,
    regex: Regex,
}

/// Compiled list of (optionally weighted) phrases
#[derive(Debug, Clone)]
pub struct Lexicon {
    entries: Vec<Entry>,
}

/// A phrase found in a transcript
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhraseHit {
    pub phrase: &'static str,
    pub weight: f32,
    /// Byte offset of the first occurrence
    pub position: usize,
}

impl Lexicon {
    /// Lexicon where every phrase weighs 1.0
    pub fn new(phrases: &[&'static str]) -> Self {
        let weighted: Vec<(&'static str, f32)> = phrases.iter().map(|p| (*p, 1.0)).collect();
        Self::weighted(&weighted)
    }

    pub fn weighted(phrases: &[(&'static str, f32)]) -> Self {
        let entries = phrases
            .iter()
            .map(|(phrase, weight)| Entry {
                phrase,
                weight: *weight,
                regex: phrase_regex(phrase),
            })
            .collect();
        Self { entries }
    }

    /// Every phrase present in `text`, in declaration order
    pub fn hits(&self, text: &str) -> Vec<PhraseHit> {
        self.entries
            .iter()
            .filter_map(|e| {
                e.regex.find(text).map(|m| PhraseHit {
                    phrase: e.phrase,
                    weight: e.weight,
                    position: m.start(),
                })
            })
            .collect()
    }

    pub fn any(&self, text: &str) -> bool {
        self.entries.iter().any(|e| e.regex.is_match(text))
    }

    /// First declared phrase present in `text`
    pub fn first(&self, text: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|e| e.regex.is_match(text))
            .map(|e| e.phrase)
    }

    /// Copy of `text` with every occurrence of every phrase blanked out
    ///
    /// Byte offsets are preserved.
    pub fn mask(&self, text: &str) -> String {
        let mut masked = text.to_string();
        for entry in &self.entries {
            let spans: Vec<(usize, usize)> = entry
                .regex
                .find_iter(&masked)
                .map(|m| (m.start(), m.end()))
                .collect();
            for (start, end) in spans {
                masked.replace_range(start..end, &" ".repeat(end - start));
            }
        }
        masked
    }

    /// True if `word` is exactly one of the phrases
    pub fn contains_word(&self, word: &str) -> bool {
        self.entries.iter().any(|e| e.phrase == word)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Word-bounded regex for a literal phrase
///
/// Interior whitespace matches any whitespace run. Boundaries are only
/// asserted on sides where the phrase starts or ends with a word character,
/// so phrases such as `"$"`-prefixed tokens still match.
pub fn phrase_regex(phrase: &str) -> Regex {
    let body = phrase
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    let starts_word = phrase.chars().next().is_some_and(is_word_char);
    let ends_word = phrase.chars().last().is_some_and(is_word_char);
    let pattern = format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        body,
        if ends_word { r"\b" } else { "" }
    );
    compile(&pattern)
}

/// Compile a built-in pattern
///
/// Only called on literal patterns defined in this crate; a failure is a
/// programming error caught by the unit tests.
pub fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {:?}: {}", pattern, e))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Text up to `len` bytes before `position`, snapped to a char boundary
pub fn window_before(text: &str, position: usize, len: usize) -> &str {
    let end = position.min(text.len());
    let mut start = end.saturating_sub(len);
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = end;
    while end > start && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[start..end]
}

/// Text up to `len` bytes after `position`, snapped to a char boundary
pub fn window_after(text: &str, position: usize, len: usize) -> &str {
    let mut start = position.min(text.len());
    while start < text.len() && !text.is_char_boundary(start) {
        start += 1;
    }
    let mut end = (start + len).min(text.len());
    while end > start && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_word_only() {
        let lex = Lexicon::new(&["rent", "due"]);
        assert!(lex.any("my rent is due"));
        assert!(!lex.any("the parents were overdue"));
    }

    #[test]
    fn test_phrase_counted_once() {
        let lex = Lexicon::weighted(&[("urgent", 0.3)]);
        let hits = lex.hits("urgent, so urgent, really urgent");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].position, 0);
    }

    #[test]
    fn test_multiword_phrase_spans_whitespace() {
        let lex = Lexicon::new(&["past due"]);
        assert!(lex.any("it is past  due"));
        assert_eq!(lex.first("it is past due"), Some("past due"));
    }

    #[test]
    fn test_mask_blanks_every_occurrence() {
        let lex = Lexicon::new(&["not urgent"]);
        let masked = lex.mask("not urgent, really not urgent");
        assert_eq!(masked.len(), "not urgent, really not urgent".len());
        assert!(!masked.contains("urgent"));
        assert!(masked.contains("really"));
    }

    #[test]
    fn test_non_word_edges() {
        let re = phrase_regex("3-day notice");
        assert!(re.is_match("got a 3-day notice today"));
        let re = phrase_regex("can't breathe");
        assert!(re.is_match("he can't breathe"));
    }

    #[test]
    fn test_windows_respect_char_boundaries() {
        let text = "café owes $20";
        let pos = text.find('$').unwrap();
        assert_eq!(window_before(text, pos, 6), " owes ");
        let w = window_before(text, pos, 8);
        assert!(w.ends_with("owes "));
        assert_eq!(window_after(text, pos, 3), "$20");
        assert_eq!(window_after(text, 100, 3), "");
    }
}
