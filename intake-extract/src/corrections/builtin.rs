//! Built-in correction rules
//!
//! Ordered by field: urgency escalations run before the caps that yield to
//! them, category before name, name before amount, relationship last.

use crate::corrections::protection::ProtectionMarker;
use crate::corrections::rule::{Adjustment, Evidence, Rule};
use crate::extractors::lexicon::{compile, Lexicon};
use crate::extractors::urgency::HEDGING;
use crate::scoring::AmountBounds;
use crate::types::{NeedCategory, UrgencyLevel};

pub const PROTECTION_FLOOR: &str = "protection.urgency_floor";
pub const DEADLINE_ESCALATION: &str = "urgency.deadline_escalation";
pub const CRISIS_ESCALATION: &str = "urgency.crisis_escalation";
pub const HEDGE_CAP: &str = "urgency.hedge_cap";
pub const GENERIC_CUE_CAP: &str = "urgency.generic_cue_cap";
pub const SAFETY_OVERRIDE: &str = "category.safety_override";
pub const GENERIC_RECOVERY: &str = "category.generic_recovery";
pub const PLACE_OR_EMPLOYER_FILTER: &str = "name.place_or_employer_filter";
pub const SIGN_OFF_RECOVERY: &str = "name.sign_off_recovery";
pub const INCOME_REJECTION: &str = "amount.income_rejection";
pub const CONTEXTUAL_RECOVERY: &str = "amount.contextual_recovery";
pub const THIRD_PARTY_CALLER: &str = "relationship.third_party_caller";

/// Every built-in rule id, in chain order
pub const BUILTIN_IDS: [&str; 12] = [
    PROTECTION_FLOOR,
    DEADLINE_ESCALATION,
    CRISIS_ESCALATION,
    HEDGE_CAP,
    GENERIC_CUE_CAP,
    SAFETY_OVERRIDE,
    GENERIC_RECOVERY,
    PLACE_OR_EMPLOYER_FILTER,
    SIGN_OFF_RECOVERY,
    INCOME_REJECTION,
    CONTEXTUAL_RECOVERY,
    THIRD_PARTY_CALLER,
];

const DEADLINE_PATTERN: &str = r"\b(?:due|by|before|until)\s+(?:today|tonight|tomorrow|(?:this\s+)?(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday|weekend|week))\b|\bwithin\s+(?:24|48|72|twenty[- ]four|forty[- ]eight)\s+hours\b|\bfinal\s+notice\b|\b(?:3|three)[- ]day\s+notice\b|\bpay\s+or\s+quit\b|\bdeadline\s+is\s+(?:today|tonight|tomorrow|monday|tuesday|wednesday|thursday|friday)\b|\bcourt\s+date\b";

const CRISIS_PHRASES: &[&str] = &[
    "life or death", "haven't eaten in", "have not eaten in", "no food in the house",
    "sleeping in my car", "sleeping in the car", "sleeping outside", "on the street tonight",
    "nowhere to sleep", "nowhere to go tonight", "kids are hungry", "children are hungry",
    "suicidal", "going to die", "out on the street today",
];

/// Intensity words that on their own say nothing about timing
const GENERIC_INTENSITY: &[&str] = &[
    "urgent", "urgently", "emergency", "asap", "desperate", "desperately", "immediately",
    "right away", "crisis", "please help", "really need",
];

/// Phrases that keep a hedged request from being capped
const HEDGE_BLOCKERS: &[&str] = &[
    "notice", "deadline", "due", "overdue", "past due", "evict", "evicted", "eviction",
    "shut off", "shutoff", "disconnect", "tomorrow", "tonight", "today",
];

const PLACE_CUE: &str = r"\b(?:work(?:s|ed|ing)?\s+(?:at|for)|employed\s+(?:at|by)|live[sd]?\s+in|living\s+in|moved\s+(?:to|from)|located\s+in|based\s+in|from)\s+";

const SIGN_OFF: &str = r"\b(?i:thanks|thank\s+you|sincerely|regards|best\s+wishes|god\s+bless|blessings)\s*[,.!-]*\s*(?:-\s*)?(?P<value>\p{Lu}[\p{L}'\-]+(?:\s+\p{Lu}[\p{L}'\-]+)?)\s*[.!]*\s*$";

const CONTEXTUAL_AMOUNT: &str = r"(?:^|[^\d.,])(?P<value>(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{1,2})?k?)\s+(?:dollars\s+)?(?:for|towards|toward|to\s+cover|to\s+pay(?:\s+for)?)\s+(?:the\s+|my\s+|our\s+|a\s+)?(?:rent|bills?|groceries|food|repairs?|deposit|tuition|surgery|medication|medicine|funeral|utilities|electric(?:ity)?|car|lights|water|daycare|childcare|bail|lawyer|gas)\b";

const THIRD_PARTY: &str = r"\b(?:(?:it's|it\s+is|this\s+is|the\s+money\s+is|the\s+money's|the\s+funds\s+are|the\s+help\s+is)\s+(?:all\s+|really\s+)?for|(?:asking|applying|calling|reaching\s+out)\s+on\s+behalf\s+of)\s+my\s+(?P<value>[a-z'\-]+)";

/// The built-in rule chain
pub fn builtin_rules(bounds: AmountBounds) -> Vec<Rule> {
    vec![
        Rule::new(
            PROTECTION_FLOOR,
            10,
            Evidence::ProtectionMarker,
            Adjustment::RaiseUrgencyToProtectionFloor,
            "protection marker sets a minimum urgency",
        )
        .with_confidence_delta(0.2),
        Rule::new(
            DEADLINE_ESCALATION,
            20,
            Evidence::Pattern(compile(DEADLINE_PATTERN)),
            Adjustment::RaiseUrgencyTo(UrgencyLevel::High),
            "explicit near-term deadline",
        )
        .with_confidence_delta(0.1),
        Rule::new(
            CRISIS_ESCALATION,
            30,
            Evidence::Phrases(Lexicon::new(CRISIS_PHRASES)),
            Adjustment::RaiseUrgencyTo(UrgencyLevel::Critical),
            "acute hardship happening now",
        )
        .with_confidence_delta(0.1),
        Rule::new(
            HEDGE_CAP,
            40,
            Evidence::Phrases((*HEDGING).clone()),
            Adjustment::CapUrgencyAt(UrgencyLevel::Medium),
            "caller says the need is not pressing",
        )
        .blocked_by(HEDGE_BLOCKERS)
        .yields_to(&[PROTECTION_FLOOR, DEADLINE_ESCALATION, CRISIS_ESCALATION])
        .with_confidence_delta(-0.1),
        Rule::new(
            GENERIC_CUE_CAP,
            50,
            Evidence::IntensityOnly(Lexicon::new(GENERIC_INTENSITY)),
            Adjustment::CapUrgencyAt(UrgencyLevel::High),
            "critical urgency resting on intensity words alone",
        )
        .yields_to(&[PROTECTION_FLOOR, DEADLINE_ESCALATION, CRISIS_ESCALATION])
        .with_confidence_delta(-0.1),
        Rule::new(
            SAFETY_OVERRIDE,
            60,
            Evidence::Phrases(ProtectionMarker::DomesticViolence.lexicon().clone()),
            Adjustment::SetCategory(NeedCategory::Safety),
            "personal safety outranks the stated need",
        )
        .with_confidence_delta(0.2),
        Rule::new(
            GENERIC_RECOVERY,
            70,
            Evidence::SubThresholdCategory,
            Adjustment::RecoverCategory,
            "weak category signal preferred over OTHER",
        )
        .with_confidence_delta(0.25),
        Rule::new(
            PLACE_OR_EMPLOYER_FILTER,
            80,
            Evidence::NameAfterCue(compile(PLACE_CUE)),
            Adjustment::ClearName,
            "extracted name is a place or employer",
        ),
        Rule::new(
            SIGN_OFF_RECOVERY,
            90,
            Evidence::CasedPattern(compile(SIGN_OFF)),
            Adjustment::NameFromCapture,
            "name given in closing sign-off",
        )
        .yields_to(&[PLACE_OR_EMPLOYER_FILTER])
        .with_confidence_delta(0.3),
        Rule::new(
            INCOME_REJECTION,
            100,
            Evidence::AmountStatedAsIncome,
            Adjustment::ClearAmount,
            "amount describes income, not the request",
        ),
        Rule::new(
            CONTEXTUAL_RECOVERY,
            110,
            Evidence::Pattern(compile(CONTEXTUAL_AMOUNT)),
            Adjustment::AmountFromCapture(bounds),
            "bare number tied to an expense",
        )
        .yields_to(&[INCOME_REJECTION])
        .with_confidence_delta(0.3),
        Rule::new(
            THIRD_PARTY_CALLER,
            120,
            Evidence::Pattern(compile(THIRD_PARTY)),
            Adjustment::RelationshipFromCapture,
            "caller asks for someone else",
        )
        .with_confidence_delta(0.2),
    ]
}
