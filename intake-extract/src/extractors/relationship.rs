//! Beneficiary relationship classification
//!
//! # Algorithm
//! Cue patterns capture the person a possessive refers to ("my son needs…",
//! "on behalf of my neighbor"); the captured word is classified as kin or
//! non-kin. Each cue adds its weight to the matching class:
//!
//! | Cue                                             | Weight |
//! |-------------------------------------------------|--------|
//! | "my X needs / is sick / passed away", "my X's surgery", "on behalf of my X", "calling for my X" | 0.60 |
//! | "help my X"                                     | 0.50   |
//! | "for my X"                                      | 0.25   |
//! | "for me", "for myself"                          | 0.50   |
//! | "I need", "I am", "I lost" …                    | 0.30   |
//! | "my rent", "my bills" …                         | 0.20   |
//!
//! The class with the highest total wins. Ties, and the no-cue case, resolve
//! to `myself` (confidence 0 when nothing matched).

use crate::extractors::lexicon::compile;
use crate::scoring::Score;
use crate::types::{Candidate, Field, Relationship, Transcript};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

pub const SOURCE: &str = "relationship";

const KIN: &[&str] = &[
    "mother", "mom", "mommy", "mama", "father", "dad", "daddy", "papa", "parents", "son",
    "sons", "daughter", "daughters", "child", "children", "kid", "kids", "baby", "wife",
    "husband", "sister", "brother", "sisters", "brothers", "grandmother", "grandma",
    "grandfather", "grandpa", "grandson", "granddaughter", "grandchildren", "grandkids", "aunt",
    "uncle", "niece", "nephew", "cousin", "fiance", "fiancee", "partner", "stepson",
    "stepdaughter", "stepmom", "stepdad", "family", "boyfriend", "girlfriend", "in-laws",
    "mother-in-law", "father-in-law",
];

const NON_KIN: &[&str] = &[
    "friend", "friends", "neighbor", "neighbour", "neighbors", "coworker", "co-worker",
    "roommate", "client", "boss", "colleague", "classmate", "pastor", "tenant", "student",
    "students", "patient", "community", "congregation",
];

/// Classify the word a possessive cue captured
pub fn classify_person(word: &str) -> Option<Relationship> {
    let word = word.trim_end_matches("'s");
    if KIN.contains(&word) {
        Some(Relationship::FamilyMember)
    } else if NON_KIN.contains(&word) {
        Some(Relationship::Other)
    } else {
        None
    }
}

struct Cue {
    label: &'static str,
    regex: Regex,
    weight: f32,
}

static THIRD_PARTY_CUES: Lazy<Vec<Cue>> = Lazy::new(|| {
    let cue = |label, re: &str, weight| Cue {
        label,
        regex: compile(re),
        weight,
    };
    vec![
        cue(
            "my_x_needs",
            r"\bmy\s+(?P<who>[a-z'\-]+)\s+(?:needs?|is sick|is ill|is in the hospital|was diagnosed|has cancer|passed away|died|got arrested|is facing|was evicted|is being evicted|can't afford|cannot afford|lost (?:his|her|their) job)\b",
            0.60,
        ),
        cue(
            "my_x_possessive",
            r"\bmy\s+(?P<who>[a-z\-]+)'s\s+(?:surgery|medical|treatment|funeral|hospital|medication|bail|tuition|rent|bills)\b",
            0.60,
        ),
        cue(
            "on_behalf_of",
            r"\b(?:on behalf of|for the sake of)\s+my\s+(?P<who>[a-z'\-]+)",
            0.60,
        ),
        cue(
            "calling_for",
            r"\b(?:raising money|fundraising|asking for help|calling|reaching out|writing)\s+(?:for|about)\s+my\s+(?P<who>[a-z'\-]+)",
            0.60,
        ),
        cue("help_my", r"\bhelp(?:ing)?\s+my\s+(?P<who>[a-z'\-]+)", 0.50),
        cue("for_my", r"\bfor\s+my\s+(?P<who>[a-z'\-]+)", 0.25),
    ]
});

static SELF_CUES: Lazy<Vec<Cue>> = Lazy::new(|| {
    let cue = |label, re: &str, weight| Cue {
        label,
        regex: compile(re),
        weight,
    };
    vec![
        cue("for_me", r"\bfor\s+(?:me|myself)\b", 0.50),
        cue(
            "first_person_need",
            r"\bi\s+(?:need|am|can't|cannot|lost|have been|was|got)\b|\bi'm\b",
            0.30,
        ),
        cue(
            "my_obligation",
            r"\bmy\s+(?:rent|bills|electric|car|landlord|lease|job|apartment|medical|own)\b",
            0.20,
        ),
    ]
});

/// Classify the beneficiary relationship
pub fn extract_relationship(transcript: &Transcript) -> Candidate<Relationship> {
    let text = transcript.normalized();
    let mut myself = Score::new();
    let mut family = Score::new();
    let mut other = Score::new();
    let mut strongest: Option<(&'static str, f32, Relationship)> = None;

    let mut note = |label: &'static str, weight: f32, class: Relationship| {
        if strongest.map_or(true, |(_, w, _)| weight > w) {
            strongest = Some((label, weight, class));
        }
    };

    for cue in THIRD_PARTY_CUES.iter() {
        // A cue counts once per class, however many people it names
        let mut seen_family = false;
        let mut seen_other = false;
        for caps in cue.regex.captures_iter(text) {
            let Some(who) = caps.name("who") else { continue };
            match classify_person(who.as_str()) {
                Some(Relationship::FamilyMember) if !seen_family => {
                    seen_family = true;
                    family.add(cue.weight);
                    note(cue.label, cue.weight, Relationship::FamilyMember);
                }
                Some(Relationship::Other) if !seen_other => {
                    seen_other = true;
                    other.add(cue.weight);
                    note(cue.label, cue.weight, Relationship::Other);
                }
                _ => {}
            }
        }
    }

    for cue in SELF_CUES.iter() {
        if cue.regex.is_match(text) {
            myself.add(cue.weight);
            note(cue.label, cue.weight, Relationship::Myself);
        }
    }

    let Some((pattern, _, _)) = strongest else {
        return Candidate::missing(Field::Relationship, SOURCE);
    };

    let (myself, family, other) = (myself.value(), family.value(), other.value());
    let (relationship, score) = if family > myself && family > other {
        (Relationship::FamilyMember, family)
    } else if other > myself && other > family {
        (Relationship::Other, other)
    } else {
        (Relationship::Myself, myself)
    };

    debug!(
        relationship = relationship.as_str(),
        myself, family, other, "Relationship classified"
    );
    Candidate::found(
        Field::Relationship,
        relationship,
        score.min(0.95),
        pattern,
        SOURCE,
    )
}
