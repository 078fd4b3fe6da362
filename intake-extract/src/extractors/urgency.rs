//! Urgency scoring
//!
//! # Algorithm
//! 1. Find hedging phrases ("no rush", "not urgent") and blank them out so
//!    that "not urgent" does not also count as "urgent".
//! 2. Sum the weights of crisis and deadline phrases present in the rest of
//!    the text (each phrase counted once), minus the hedging weights.
//! 3. Clamp to [0, 1] and map through the shared urgency thresholds.
//!
//! With no phrase hits the candidate is missing (LOW, confidence 0).

use crate::extractors::lexicon::{Lexicon, PhraseHit};
use crate::scoring::{urgency_level_for, Score};
use crate::types::{Candidate, Field, Transcript, UrgencyLevel};
use once_cell::sync::Lazy;
use tracing::debug;

pub const SOURCE: &str = "urgency";

static CRISIS: Lazy<Lexicon> = Lazy::new(|| {
    Lexicon::weighted(&[
        ("life or death", 0.50),
        ("scared for my life", 0.50),
        ("abuse", 0.40),
        ("abusive", 0.40),
        ("violence", 0.40),
        ("emergency", 0.35),
        ("evicted", 0.35),
        ("no food", 0.35),
        ("haven't eaten", 0.35),
        ("sleeping in my car", 0.35),
        ("unsafe", 0.35),
        ("danger", 0.35),
        ("urgent", 0.30),
        ("urgently", 0.30),
        ("immediately", 0.30),
        ("crisis", 0.30),
        ("eviction", 0.30),
        ("homeless", 0.30),
        ("on the street", 0.30),
        ("shut off", 0.30),
        ("right away", 0.25),
        ("asap", 0.25),
        ("desperate", 0.25),
        ("disconnected", 0.25),
        ("hospital", 0.25),
        ("surgery", 0.25),
    ])
});

static DEADLINE: Lazy<Lexicon> = Lazy::new(|| {
    Lexicon::weighted(&[
        ("within 24 hours", 0.35),
        ("tonight", 0.35),
        ("final notice", 0.35),
        ("within 48 hours", 0.30),
        ("today", 0.30),
        ("tomorrow", 0.30),
        ("deadline", 0.25),
        ("overdue", 0.25),
        ("past due", 0.25),
        ("running out of time", 0.25),
        ("due", 0.20),
        ("this week", 0.20),
        ("by friday", 0.20),
        ("by monday", 0.20),
        ("in two days", 0.20),
        ("in a few days", 0.15),
        ("behind on", 0.15),
        ("end of the month", 0.10),
        ("next week", 0.10),
        ("soon", 0.10),
        ("late", 0.10),
    ])
});

/// Hedging and de-escalation phrases
pub static HEDGING: Lazy<Lexicon> = Lazy::new(|| {
    Lexicon::weighted(&[
        ("not an emergency", 0.35),
        ("not urgent", 0.35),
        ("no rush", 0.30),
        ("no hurry", 0.30),
        ("not in a hurry", 0.30),
        ("planning ahead", 0.25),
        ("can wait", 0.25),
        ("whenever", 0.20),
        ("someday", 0.20),
        ("in a few months", 0.20),
        ("eventually", 0.15),
        ("in the future", 0.15),
        ("next year", 0.15),
        ("would be nice", 0.15),
        ("when possible", 0.10),
    ])
});

/// Urgency level together with the score behind it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UrgencyReading {
    pub level: UrgencyLevel,
    pub score: f32,
}

/// Crisis and deadline hits outside hedged spans, and the hedges themselves
fn phrase_hits(text: &str) -> (Vec<PhraseHit>, Vec<PhraseHit>) {
    let hedges = HEDGING.hits(text);
    let masked = HEDGING.mask(text);
    let positives = CRISIS
        .hits(&masked)
        .into_iter()
        .chain(DEADLINE.hits(&masked))
        .collect();
    (positives, hedges)
}

fn net_score(positives: &[PhraseHit], hedges: &[PhraseHit]) -> f32 {
    let mut score = Score::new();
    for hit in positives {
        score.add(hit.weight);
    }
    for hit in hedges {
        score.add(-hit.weight);
    }
    score.value()
}

/// Urgency score with every phrase of `excluded` blanked out first
pub fn score_without(transcript: &Transcript, excluded: &Lexicon) -> f32 {
    let (positives, hedges) = phrase_hits(&excluded.mask(transcript.normalized()));
    net_score(&positives, &hedges)
}

/// Score urgency
pub fn extract_urgency(transcript: &Transcript) -> Candidate<UrgencyReading> {
    let (positives, hedges) = phrase_hits(transcript.normalized());
    if positives.is_empty() && hedges.is_empty() {
        return Candidate::missing(Field::Urgency, SOURCE);
    }

    let score = net_score(&positives, &hedges);
    let level = urgency_level_for(score);

    let strongest = positives
        .iter()
        .chain(hedges.iter())
        .fold(None::<&PhraseHit>, |best, hit| match best {
            Some(b) if b.weight >= hit.weight => Some(b),
            _ => Some(hit),
        })
        .map(|hit| hit.phrase)
        .unwrap_or("none");

    let hits = positives.len() + hedges.len();
    let confidence = (0.5 + 0.1 * hits as f32).min(0.95);
    debug!(
        score,
        level = level.as_str(),
        positive_hits = positives.len(),
        hedge_hits = hedges.len(),
        "Urgency scored"
    );

    Candidate::found(
        Field::Urgency,
        UrgencyReading { level, score },
        confidence,
        strongest,
        SOURCE,
    )
}
