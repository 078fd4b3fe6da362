//! Requested amount extraction
//!
//! # Algorithm
//! 1. Collect mentions in precedence order: currency ranges (midpoint),
//!    currency-marked digits (`$`, "dollars", `k`), spelled-out numbers
//!    followed by a currency word, bare numbers directly after a need verb.
//!    A later mention overlapping an earlier one is dropped.
//! 2. Drop mentions followed by a rate ("an hour", "per week").
//! 3. Adjust confidence: need language just before a mention adds
//!    [`NEED_CONTEXT_BONUS`]; income or savings language subtracts
//!    [`INCOME_CONTEXT_PENALTY`].
//! 4. Discard mentions outside the configured bounds (treated as missing,
//!    never clamped), then pick the highest confidence; ties go to the
//!    earliest mention.

use crate::extractors::lexicon::{compile, window_after, window_before, Lexicon};
use crate::extractors::number_words::find_spelled_numbers;
use crate::scoring::AmountBounds;
use crate::types::{Candidate, Field, Transcript};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

pub const SOURCE: &str = "amount";

/// Added when need language precedes a mention
pub const NEED_CONTEXT_BONUS: f32 = 0.10;

/// Subtracted when income or savings language precedes a mention
pub const INCOME_CONTEXT_PENALTY: f32 = 0.30;

/// Bytes inspected before a mention for need cues
const NEED_WINDOW: usize = 48;

/// Bytes inspected before a mention for income cues
const INCOME_WINDOW: usize = 24;

const NUM: &str = r"\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?";

/// How an amount was stated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountKind {
    /// "$1,000 to $2,000": midpoint
    Range,
    /// "$2500", "2500 dollars", "2.5k"
    Currency,
    /// "fifteen hundred dollars"
    Spelled,
    /// "need 800", "owe about two thousand"
    Contextual,
}

impl AmountKind {
    pub fn base_confidence(self) -> f32 {
        match self {
            AmountKind::Currency => 0.85,
            AmountKind::Range => 0.80,
            AmountKind::Spelled => 0.75,
            AmountKind::Contextual => 0.60,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AmountKind::Range => "range_midpoint",
            AmountKind::Currency => "currency",
            AmountKind::Spelled => "spelled_number",
            AmountKind::Contextual => "need_context",
        }
    }
}

/// One amount stated in a transcript
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountMention {
    pub value: f64,
    pub kind: AmountKind,
    /// Byte span in the normalized transcript
    pub start: usize,
    pub end: usize,
    pub confidence: f32,
}

static RANGE_BETWEEN: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"\bbetween\s+(?P<c1>\$)?\s?(?P<lo>{NUM})(?:\s?(?P<lk>k)\b)?\s*(?:dollars\s+)?and\s+(?P<c2>\$)?\s?(?P<hi>{NUM})(?:\s?(?P<hk>k)\b)?(?P<c3>\s*(?:dollars|bucks))?"
    ))
});

static RANGE_DASH: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"(?P<c1>\$)?\s?(?P<lo>{NUM})(?:\s?(?P<lk>k)\b)?\s*(?:-|to)\s*(?P<c2>\$)?\s?(?P<hi>{NUM})(?:\s?(?P<hk>k)\b)?(?P<c3>\s*(?:dollars|bucks))?"
    ))
});

static CURRENCY_SYMBOL: Lazy<Regex> =
    Lazy::new(|| compile(&format!(r"\$\s?(?P<n>{NUM})(?:\s?(?P<k>k)\b)?")));

static CURRENCY_WORD: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"\b(?P<n>{NUM})(?:\s?(?P<k>k)\b)?\s*(?:dollars|dollar|bucks|usd)\b"
    ))
});

static THOUSANDS_SUFFIX: Lazy<Regex> = Lazy::new(|| compile(&format!(r"\b(?P<n>{NUM})k\b")));

static NEED_VERB_NUMBER: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"\b(?:need|needs|needed|owe|owes|owed|short|cost|costs|raise|raising|requesting|asking for|looking for)\s+(?:about\s+|around\s+|roughly\s+|approximately\s+|like\s+|maybe\s+|at least\s+|only\s+|just\s+)?(?P<n>{NUM})(?:\s?(?P<k>k)\b)?(?:\s+(?P<tail>[a-z]+))?"
    ))
});

static RATE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"^(?:\s*(?:dollars?|bucks))?\s*(?:(?:an?|per|/|every|each)\s*(?:hour|hr|day|week|shift)s?\b|(?:hourly|daily|weekly)\b)",
    )
});

static TOKEN: Lazy<Regex> = Lazy::new(|| compile(r"[a-z0-9]+(?:[-'][a-z0-9]+)*"));

static NEED_CUES: Lazy<Lexicon> = Lazy::new(|| {
    Lexicon::new(&[
        "need", "needs", "needed", "owe", "owes", "owed", "short", "behind", "cover", "pay",
        "help with", "raise", "goal", "total", "cost", "costs", "asking for", "requesting",
    ])
});

static INCOME_CUES: Lazy<Lexicon> = Lazy::new(|| {
    Lexicon::new(&[
        "make", "makes", "making", "made", "earn", "earns", "earning", "income", "salary",
        "paycheck", "get paid", "paid", "wage", "wages", "bring home", "disability check",
        "social security", "ssi", "i have", "i've saved", "saved", "savings", "in the bank",
    ])
});

const SPELLED_NEED_VERBS: &[&str] = &[
    "need", "needs", "needed", "owe", "owes", "owed", "short", "cost", "costs", "raise",
    "about", "around",
];

const UNIT_WORDS: &[&str] = &[
    "day", "days", "week", "weeks", "month", "months", "year", "years", "hour", "hours",
    "minute", "minutes", "kid", "kids", "child", "children", "people", "times", "percent",
    "miles", "pounds", "am", "pm", "o'clock",
];

/// Parse a numeric literal such as `1,200`, `2.5` or `2.5k`
pub fn parse_amount_text(text: &str) -> Option<f64> {
    let trimmed = text.trim().trim_start_matches('$').trim();
    let (digits, thousands) = match trimmed.strip_suffix('k') {
        Some(rest) => (rest.trim(), true),
        None => (trimmed, false),
    };
    let value: f64 = digits.replace(',', "").parse().ok()?;
    let value = if thousands { value * 1000.0 } else { value };
    value.is_finite().then_some(value)
}

fn number_from(caps: &Captures<'_>, num: &str, k: &str) -> Option<f64> {
    let base: f64 = caps.name(num)?.as_str().replace(',', "").parse().ok()?;
    Some(if caps.name(k).is_some() { base * 1000.0 } else { base })
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// All amount mentions in a transcript, before bounds are applied
///
/// Rates are already removed. Used by the extractor and by the evaluation
/// bucketizer to tell a wrong selection from a missed amount.
pub fn amount_mentions(transcript: &Transcript) -> Vec<AmountMention> {
    let text = transcript.normalized();
    let mut mentions: Vec<AmountMention> = Vec::new();

    let push = |mentions: &mut Vec<AmountMention>, value: f64, kind: AmountKind, start: usize, end: usize| {
        if mentions.iter().any(|m| start < m.end && m.start < end) {
            return;
        }
        mentions.push(AmountMention {
            value: round_cents(value),
            kind,
            start,
            end,
            confidence: kind.base_confidence(),
        });
    };

    // Ranges need a currency marker on either side
    for regex in [&*RANGE_BETWEEN, &*RANGE_DASH] {
        for caps in regex.captures_iter(text) {
            let marked = ["c1", "c2", "c3"].iter().any(|g| caps.name(g).is_some());
            if !marked {
                continue;
            }
            let (Some(mut lo), Some(hi)) = (number_from(&caps, "lo", "lk"), number_from(&caps, "hi", "hk")) else {
                continue;
            };
            if caps.name("hk").is_some() && caps.name("lk").is_none() && lo * 1000.0 <= hi {
                lo *= 1000.0;
            }
            if lo >= hi {
                continue;
            }
            let Some(whole) = caps.get(0) else { continue };
            push(&mut mentions, (lo + hi) / 2.0, AmountKind::Range, whole.start(), whole.end());
        }
    }

    for regex in [&*CURRENCY_SYMBOL, &*CURRENCY_WORD, &*THOUSANDS_SUFFIX] {
        for caps in regex.captures_iter(text) {
            let (Some(value), Some(whole)) = (number_from(&caps, "n", "k"), caps.get(0)) else {
                continue;
            };
            push(&mut mentions, value, AmountKind::Currency, whole.start(), whole.end());
        }
    }

    // Spelled-out numbers
    let spans: Vec<(usize, usize)> = TOKEN.find_iter(text).map(|m| (m.start(), m.end())).collect();
    let tokens: Vec<&str> = spans.iter().map(|(s, e)| &text[*s..*e]).collect();
    for number in find_spelled_numbers(&tokens) {
        let next = tokens.get(number.end).copied();
        let currency_marked = matches!(next, Some("dollars" | "dollar" | "bucks"))
            || tokens.get(number.end - 1) == Some(&"grand");
        let after_need_verb = tokens[number.start.saturating_sub(3)..number.start]
            .iter()
            .any(|t| SPELLED_NEED_VERBS.contains(t));
        let followed_by_unit = next.is_some_and(|t| UNIT_WORDS.contains(&t));

        let kind = if currency_marked {
            AmountKind::Spelled
        } else if after_need_verb && !followed_by_unit && number.value >= 10.0 {
            AmountKind::Contextual
        } else {
            continue;
        };
        let start = spans[number.start].0;
        let end = match (currency_marked, next) {
            (true, Some(_)) if tokens[number.end - 1] != "grand" => spans[number.end].1,
            _ => spans[number.end - 1].1,
        };
        push(&mut mentions, number.value, kind, start, end);
    }

    for caps in NEED_VERB_NUMBER.captures_iter(text) {
        if caps
            .name("tail")
            .is_some_and(|t| UNIT_WORDS.contains(&t.as_str()))
        {
            continue;
        }
        let (Some(value), Some(n)) = (number_from(&caps, "n", "k"), caps.name("n")) else {
            continue;
        };
        let end = caps.name("k").map(|k| k.end()).unwrap_or(n.end());
        push(&mut mentions, value, AmountKind::Contextual, n.start(), end);
    }

    mentions.retain(|m| !RATE_SUFFIX.is_match(window_after(text, m.end, 24)));

    for mention in &mut mentions {
        if NEED_CUES.any(window_before(text, mention.start, NEED_WINDOW)) {
            mention.confidence += NEED_CONTEXT_BONUS;
        }
        if INCOME_CUES.any(window_before(text, mention.start, INCOME_WINDOW)) {
            mention.confidence -= INCOME_CONTEXT_PENALTY;
        }
        mention.confidence = mention.confidence.clamp(0.0, 1.0);
    }

    mentions.sort_by_key(|m| m.start);
    mentions
}

/// True when every mention of `amount` is preceded by income or savings
/// language
pub fn stated_only_as_income(transcript: &Transcript, amount: f64) -> bool {
    let text = transcript.normalized();
    let matching: Vec<AmountMention> = amount_mentions(transcript)
        .into_iter()
        .filter(|m| (m.value - amount).abs() < 0.005)
        .collect();
    !matching.is_empty()
        && matching
            .iter()
            .all(|m| INCOME_CUES.any(window_before(text, m.start, INCOME_WINDOW)))
}

/// Extract the requested amount
pub fn extract_amount(transcript: &Transcript, bounds: AmountBounds) -> Candidate<f64> {
    let mut best: Option<AmountMention> = None;

    for mention in amount_mentions(transcript) {
        if !bounds.contains(mention.value) {
            debug!(
                value = mention.value,
                min = bounds.min,
                max = bounds.max,
                "Amount mention outside bounds, discarded"
            );
            continue;
        }
        // Mentions arrive sorted by position, so strict > keeps the earliest on ties
        match best {
            Some(current) if mention.confidence <= current.confidence => {}
            _ => best = Some(mention),
        }
    }

    match best {
        Some(mention) => {
            debug!(kind = mention.kind.label(), confidence = mention.confidence, "Amount selected");
            Candidate::found(
                Field::Amount,
                mention.value,
                mention.confidence,
                mention.kind.label(),
                SOURCE,
            )
        }
        None => Candidate::missing(Field::Amount, SOURCE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(text: &str) -> Option<f64> {
        extract_amount(&Transcript::new(text), AmountBounds::default()).value
    }

    #[test]
    fn test_currency_digits() {
        assert_eq!(amount("I need $2500 for rent"), Some(2500.0));
        assert_eq!(amount("I need $1,250.50 for rent"), Some(1250.5));
        assert_eq!(amount("about 300 dollars"), Some(300.0));
        assert_eq!(amount("we need 2.5k to catch up"), Some(2500.0));
        assert_eq!(amount("I need $ 400"), Some(400.0));
    }

    #[test]
    fn test_spelled_numbers() {
        assert_eq!(amount("I need fifteen hundred dollars"), Some(1500.0));
        assert_eq!(amount("it costs about two thousand five hundred"), Some(2500.0));
        assert_eq!(amount("they want three grand"), Some(3000.0));
    }

    #[test]
    fn test_range_midpoint() {
        assert_eq!(amount("somewhere between $1,000 and $2,000"), Some(1500.0));
        assert_eq!(amount("maybe $500-$700"), Some(600.0));
        assert_eq!(amount("around 2 to 3k dollars"), Some(2500.0));
    }

    #[test]
    fn test_rates_rejected() {
        assert_eq!(amount("I make $15 per hour"), None);
        assert_eq!(amount("they pay fifteen dollars an hour"), None);
        assert_eq!(
            amount("I only make $12 an hour and need $900 for rent"),
            Some(900.0)
        );
    }

    #[test]
    fn test_out_of_bounds_is_missing() {
        assert_eq!(amount("I need $250,000 for a house"), None);
        assert_eq!(amount("I have $0.50 left"), None);
        assert_eq!(
            amount("the house was $250,000 but I need $3,000 for repairs"),
            Some(3000.0)
        );
    }

    #[test]
    fn test_bare_numbers_need_a_verb() {
        assert_eq!(amount("I need 800 for the deposit"), Some(800.0));
        assert_eq!(amount("I have 3 kids and 2 jobs"), None);
        assert_eq!(amount("I need 2 weeks"), None);
    }

    #[test]
    fn test_income_is_deprioritised() {
        assert_eq!(
            amount("I make $2,000 a month but I need $1,200 for rent"),
            Some(1200.0)
        );
        let candidate = extract_amount(
            &Transcript::new("I make $2,000 a month"),
            AmountBounds::default(),
        );
        assert_eq!(candidate.value, Some(2000.0));
        assert!(candidate.confidence < AmountKind::Currency.base_confidence());
    }

    #[test]
    fn test_tie_goes_to_earliest() {
        assert_eq!(amount("$300 for food and $500 for gas"), Some(300.0));
    }

    #[test]
    fn test_nothing_found() {
        let candidate = extract_amount(&Transcript::new(""), AmountBounds::default());
        assert!(candidate.is_missing());
        assert_eq!(candidate.confidence, 0.0);
    }

    #[test]
    fn test_stated_only_as_income() {
        let t = Transcript::new("I make $2,000 a month");
        assert!(stated_only_as_income(&t, 2000.0));
        let t = Transcript::new("I need $2,000 for rent");
        assert!(!stated_only_as_income(&t, 2000.0));
    }

    #[test]
    fn test_parse_amount_text() {
        assert_eq!(parse_amount_text("1,200"), Some(1200.0));
        assert_eq!(parse_amount_text("$2.5k"), Some(2500.0));
        assert_eq!(parse_amount_text("abc"), None);
    }
}
