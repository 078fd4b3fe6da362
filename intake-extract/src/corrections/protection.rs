//! Protection allow-list
//!
//! Explicit markers of danger or imminent loss. When any is present, no
//! correction may lower urgency or clear a field, and urgency is floored.

use crate::extractors::lexicon::Lexicon;
use crate::types::{Transcript, UrgencyLevel};
use once_cell::sync::Lazy;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionMarker {
    DomesticViolence,
    ImminentEviction,
    MedicalEmergency,
    UtilityShutoff,
}

impl ProtectionMarker {
    pub const ALL: [ProtectionMarker; 4] = [
        ProtectionMarker::DomesticViolence,
        ProtectionMarker::ImminentEviction,
        ProtectionMarker::MedicalEmergency,
        ProtectionMarker::UtilityShutoff,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProtectionMarker::DomesticViolence => "domestic_violence",
            ProtectionMarker::ImminentEviction => "imminent_eviction",
            ProtectionMarker::MedicalEmergency => "medical_emergency",
            ProtectionMarker::UtilityShutoff => "utility_shutoff",
        }
    }

    /// Lowest urgency a transcript carrying this marker may end with
    pub fn urgency_floor(self) -> UrgencyLevel {
        match self {
            ProtectionMarker::DomesticViolence | ProtectionMarker::MedicalEmergency => {
                UrgencyLevel::Critical
            }
            ProtectionMarker::ImminentEviction | ProtectionMarker::UtilityShutoff => {
                UrgencyLevel::High
            }
        }
    }

    /// Phrases that signal this marker
    pub fn lexicon(self) -> &'static Lexicon {
        match self {
            ProtectionMarker::DomesticViolence => &*DOMESTIC_VIOLENCE,
            ProtectionMarker::ImminentEviction => &*IMMINENT_EVICTION,
            ProtectionMarker::MedicalEmergency => &*MEDICAL_EMERGENCY,
            ProtectionMarker::UtilityShutoff => &*UTILITY_SHUTOFF,
        }
    }
}

static DOMESTIC_VIOLENCE: Lazy<Lexicon> = Lazy::new(|| {
    Lexicon::new(&[
        "domestic violence", "domestic abuse", "abusive", "abuser", "restraining order",
        "protective order", "fleeing", "hits me", "beats me", "beat me", "threatened to kill",
        "unsafe at home", "afraid for my life", "scared for my life",
    ])
});

static IMMINENT_EVICTION: Lazy<Lexicon> = Lazy::new(|| {
    Lexicon::new(&[
        "eviction notice", "being evicted", "getting evicted", "evicted today",
        "evicted tomorrow", "notice to vacate", "pay or quit", "3-day notice",
        "three day notice", "three-day notice", "lockout", "locked out", "sheriff",
        "writ of possession", "eviction hearing",
    ])
});

static MEDICAL_EMERGENCY: Lazy<Lexicon> = Lazy::new(|| {
    Lexicon::new(&[
        "emergency room", "icu", "intensive care", "ambulance", "heart attack", "stroke",
        "overdose", "can't breathe", "cannot breathe", "life support", "emergency surgery",
        "in the er",
    ])
});

static UTILITY_SHUTOFF: Lazy<Lexicon> = Lazy::new(|| {
    Lexicon::new(&[
        "shut off notice", "shutoff notice", "disconnection notice", "disconnect notice",
        "being shut off", "getting shut off", "will be shut off", "shut off tomorrow",
        "shut off today", "power is off", "no electricity", "no heat", "water is off",
        "water shut off", "lights shut off",
    ])
});

/// Markers present in a transcript, in declaration order
pub fn detect(transcript: &Transcript) -> Vec<ProtectionMarker> {
    let text = transcript.normalized();
    ProtectionMarker::ALL
        .into_iter()
        .filter(|m| m.lexicon().any(text))
        .collect()
}

/// True when any protection marker is present
pub fn is_protected(transcript: &Transcript) -> bool {
    let text = transcript.normalized();
    ProtectionMarker::ALL.iter().any(|m| m.lexicon().any(text))
}

/// Highest urgency floor among the markers present
pub fn urgency_floor(transcript: &Transcript) -> Option<UrgencyLevel> {
    detect(transcript).into_iter().map(|m| m.urgency_floor()).max()
}
