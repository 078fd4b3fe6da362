//! Base extractors
//!
//! One total, deterministic function per field. Each returns a
//! [`Candidate`](crate::types::Candidate); a missing value with confidence 0
//! means the field falls back to its documented default.

pub mod amount;
pub mod category;
pub mod lexicon;
pub mod name;
pub mod number_words;
pub mod relationship;
pub mod urgency;

pub use amount::extract_amount;
pub use category::score_categories;
pub use name::extract_name;
pub use relationship::extract_relationship;
pub use urgency::extract_urgency;
