//! Caller name extraction
//!
//! # Algorithm
//! 1. Try intro patterns in declared order ("my name is", "name's",
//!    "call me", title prefix, "this is", "I am"); within a pattern, try
//!    matches in transcript order.
//! 2. Take up to [`MAX_NAME_TOKENS`] alphabetic tokens after the intro,
//!    stopping at a connective stop-word or trailing punctuation.
//! 3. When the transcript carries casing, tokens after the first must be
//!    capitalised (and the first too for weak intros such as "this is").
//! 4. Reject candidates overlapping the blacklist (sentiment and state
//!    words, places, employers) or followed by an age phrase.
//!
//! The first surviving candidate wins. Output is title-cased.

use crate::extractors::lexicon::{compile, window_after, Lexicon};
use crate::types::{Candidate, Field, Transcript};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

pub const SOURCE: &str = "name";

/// Longest accepted name, in tokens
pub const MAX_NAME_TOKENS: usize = 3;

struct IntroPattern {
    label: &'static str,
    regex: Regex,
    confidence: f32,
    /// First token must be capitalised when the transcript carries casing
    needs_capital: bool,
}

static INTRO_PATTERNS: Lazy<Vec<IntroPattern>> = Lazy::new(|| {
    let pattern = |label, re: &str, confidence, needs_capital| IntroPattern {
        label,
        regex: compile(re),
        confidence,
        needs_capital,
    };
    vec![
        pattern("my_name_is", r"(?i)\bmy\s+name\s+is\s+", 0.90, false),
        pattern("name_is", r"(?i)\bname(?:'s|\s+is)\s+", 0.80, false),
        pattern("call_me", r"(?i)\b(?:you\s+can\s+)?call\s+me\s+", 0.75, true),
        pattern("title", r"(?i)\b(?:mr|mrs|ms|miss|dr)\.?\s+", 0.70, true),
        pattern("this_is", r"(?i)\bthis\s+is\s+", 0.65, true),
        pattern("i_am", r"(?i)\b(?:i\s+am|i'm|im)\s+", 0.60, true),
    ]
});

/// Captured tokens were an age ("I am forty-two years old")
static AGE_AFTER: Lazy<Regex> = Lazy::new(|| compile(r"^\s*(?:years?|yrs?)(?:\s+old)?\b"));

static STOP_WORDS: Lazy<Lexicon> = Lazy::new(|| {
    Lexicon::new(&[
        "and", "but", "so", "i", "im", "i'm", "my", "me", "from", "with", "who", "calling",
        "here", "to", "because", "cause", "the", "a", "an", "in", "at", "of", "for", "on", "is",
        "was", "we", "it", "this", "that", "need", "needs", "trying", "just", "also", "or",
        "then", "um", "uh", "like", "yeah", "okay", "ok", "please", "thank", "thanks", "hi",
        "hello", "hey", "not", "currently", "about", "have", "had", "am", "are", "be", "been",
        "your", "our", "their", "his", "her", "years", "year", "old", "you", "all", "again",
        "much", "everyone", "everybody", "guys", "god", "bless", "lord", "regards",
        "sincerely",
    ])
});

static SENTIMENT_WORDS: Lazy<Lexicon> = Lazy::new(|| {
    Lexicon::new(&[
        "struggling", "desperate", "sorry", "scared", "worried", "stressed", "sad", "tired",
        "afraid", "grateful", "thankful", "happy", "frustrated", "overwhelmed", "broke",
        "homeless", "unemployed", "pregnant", "disabled", "sick", "single", "behind", "late",
        "really", "very", "going", "having", "looking", "asking", "reaching", "writing",
        "unable", "still", "gonna", "able", "sure", "glad", "fine", "good", "new", "alone",
        "ready", "hoping", "facing", "dealing", "being", "getting", "working", "living",
        "staying", "married", "divorced", "retired", "veteran", "mother", "father", "mom",
        "dad", "parent", "student", "caregiver", "widow", "widowed", "out", "down", "short",
        "terrified", "exhausted", "hurt", "injured", "kind", "honest", "embarrassed", "ashamed",
        "wondering", "hungry", "cold", "stuck", "desperately", "literally", "basically",
        "actually", "totally", "too",
    ])
});

static PLACE_WORDS: Lazy<Lexicon> = Lazy::new(|| {
    Lexicon::new(&[
        "alabama", "alaska", "arizona", "arkansas", "california", "colorado", "connecticut",
        "delaware", "florida", "georgia", "hawaii", "idaho", "illinois", "indiana", "iowa",
        "kansas", "kentucky", "louisiana", "maine", "maryland", "massachusetts", "michigan",
        "minnesota", "mississippi", "missouri", "montana", "nebraska", "nevada", "ohio",
        "oklahoma", "oregon", "pennsylvania", "tennessee", "texas", "utah", "vermont",
        "virginia", "washington", "wisconsin", "wyoming", "new york", "new jersey",
        "new mexico", "north carolina", "south carolina", "north dakota", "south dakota",
        "rhode island", "west virginia", "new hampshire", "chicago", "houston", "phoenix",
        "philadelphia", "dallas", "austin", "detroit", "boston", "seattle", "denver",
        "atlanta", "miami", "memphis", "baltimore", "cleveland", "portland", "oakland",
        "los angeles", "san diego", "san antonio", "san francisco", "san jose", "las vegas",
        "new orleans", "brooklyn", "bronx", "queens", "harlem", "america", "mexico", "canada",
        "downtown", "town", "city", "county",
    ])
});

static EMPLOYER_WORDS: Lazy<Lexicon> = Lazy::new(|| {
    Lexicon::new(&[
        "walmart", "amazon", "target", "mcdonalds", "mcdonald's", "starbucks", "costco",
        "kroger", "walgreens", "cvs", "fedex", "ups", "usps", "uber", "lyft", "doordash",
        "instacart", "home depot", "lowes", "lowe's", "safeway", "publix", "wendys",
        "wendy's", "subway", "dollar general", "dollar tree", "best buy", "tesla", "google",
        "apple", "microsoft", "hospital", "school", "church", "company", "shelter",
    ])
});

/// True when `name` is rejected by any false-positive blacklist
pub fn is_blacklisted(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.split_whitespace().any(|t| {
        SENTIMENT_WORDS.contains_word(t) || STOP_WORDS.contains_word(t)
    }) || PLACE_WORDS.any(&lower)
        || EMPLOYER_WORDS.any(&lower)
}

/// True when `candidate` could be a person's name on its own
pub fn plausible_name(candidate: &str) -> bool {
    let count = candidate.split_whitespace().count();
    (1..=MAX_NAME_TOKENS).contains(&count)
        && candidate.split_whitespace().all(is_name_token)
        && !is_blacklisted(candidate)
}

/// Title-case each token ("o'brien-smith" → "O'Brien-Smith")
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|token| {
            let mut out = String::with_capacity(token.len());
            let mut upper_next = true;
            for c in token.chars() {
                if upper_next {
                    out.extend(c.to_uppercase());
                } else {
                    out.extend(c.to_lowercase());
                }
                upper_next = matches!(c, '-' | '\'');
            }
            out
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_name_token(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_alphabetic)
        && token.chars().all(|c| c.is_alphabetic() || c == '-' || c == '\'')
        && token.chars().any(char::is_alphabetic)
}

fn starts_upper(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_uppercase)
}

/// Collect name tokens following an intro phrase
///
/// Returns the tokens and the byte offset (in `text`) just past the last one.
fn capture_tokens(
    text: &str,
    start: usize,
    casing: bool,
    needs_capital: bool,
) -> Option<(Vec<String>, usize)> {
    let rest = &text[start..];
    let mut tokens = Vec::new();
    let mut end = start;
    let mut offset = 0;

    for piece in rest.split(' ') {
        let piece_start = offset;
        offset += piece.len() + 1;
        if piece.is_empty() {
            break;
        }
        let word = piece.trim_end_matches([',', '.', ';', ':', '!', '?', '"', ')']);
        let punctuated = word.len() != piece.len();

        if !is_name_token(word) || STOP_WORDS.contains_word(&word.to_lowercase()) {
            break;
        }
        let capital_required = if tokens.is_empty() { needs_capital } else { true };
        if casing && capital_required && !starts_upper(word) {
            break;
        }

        tokens.push(word.to_string());
        end = start + piece_start + word.len();
        if punctuated || tokens.len() == MAX_NAME_TOKENS {
            break;
        }
    }

    (!tokens.is_empty()).then_some((tokens, end))
}

/// Extract the caller's name
pub fn extract_name(transcript: &Transcript) -> Candidate<String> {
    let text = transcript.cleaned();
    let casing = transcript.has_casing();

    for pattern in INTRO_PATTERNS.iter() {
        for m in pattern.regex.find_iter(text) {
            let Some((tokens, end)) = capture_tokens(text, m.end(), casing, pattern.needs_capital)
            else {
                continue;
            };
            let joined = tokens.join(" ");
            if is_blacklisted(&joined) {
                debug!(pattern = pattern.label, "Name candidate rejected by blacklist");
                continue;
            }
            if AGE_AFTER.is_match(&window_after(text, end, 24).to_lowercase()) {
                debug!(pattern = pattern.label, "Name candidate rejected as age phrase");
                continue;
            }

            let confidence = if tokens.len() > 1 {
                pattern.confidence + 0.05
            } else {
                pattern.confidence
            };
            debug!(pattern = pattern.label, tokens = tokens.len(), "Name extracted");
            return Candidate::found(
                Field::Name,
                title_case(&joined),
                confidence,
                pattern.label,
                SOURCE,
            );
        }
    }

    Candidate::missing(Field::Name, SOURCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> Option<String> {
        extract_name(&Transcript::new(text)).value
    }

    #[test]
    fn test_my_name_is() {
        assert_eq!(
            name("My name is Sarah Johnson and I need help"),
            Some("Sarah Johnson".to_string())
        );
        assert_eq!(name("hi my name is maria lopez"), Some("Maria Lopez".to_string()));
    }

    #[test]
    fn test_stops_at_punctuation_and_stop_words() {
        assert_eq!(
            name("My name is David, I lost my job"),
            Some("David".to_string())
        );
        assert_eq!(
            name("my name is james from ohio"),
            Some("James".to_string())
        );
    }

    #[test]
    fn test_casing_limits_trailing_tokens() {
        assert_eq!(
            name("My name is Sarah really need help"),
            Some("Sarah".to_string())
        );
    }

    #[test]
    fn test_i_am_rejects_sentiment() {
        assert_eq!(name("I am struggling to pay rent"), None);
        assert_eq!(name("I'm so stressed"), None);
        assert_eq!(name("i'm desperate"), None);
        assert_eq!(name("Hi, I'm Tanya Brooks."), Some("Tanya Brooks".to_string()));
    }

    #[test]
    fn test_weak_intro_needs_capital_when_cased() {
        assert_eq!(name("This is hard for me. My name is Ana"), Some("Ana".to_string()));
        assert_eq!(name("Hello this is Kevin Hart"), Some("Kevin Hart".to_string()));
    }

    #[test]
    fn test_places_and_employers_rejected() {
        assert_eq!(name("I'm in Texas right now"), None);
        assert_eq!(name("This is Walmart calling"), None);
    }

    #[test]
    fn test_age_phrase_rejected() {
        assert_eq!(name("I am 34 years old"), None);
        assert_eq!(name("I'm Forty-Two years old"), None);
    }

    #[test]
    fn test_title_prefix() {
        assert_eq!(
            name("Please help Mrs. Alvarez with her bills"),
            Some("Alvarez".to_string())
        );
    }

    #[test]
    fn test_max_tokens() {
        assert_eq!(
            name("my name is anna maria de silva"),
            Some("Anna Maria De".to_string())
        );
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("o'brien-smith"), "O'Brien-Smith");
        assert_eq!(title_case("SARAH"), "Sarah");
    }

    #[test]
    fn test_no_match_is_missing() {
        let candidate = extract_name(&Transcript::new("I need help with rent"));
        assert!(candidate.is_missing());
        assert_eq!(candidate.confidence, 0.0);
    }
}
