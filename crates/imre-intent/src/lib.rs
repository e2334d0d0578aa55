//! Clinical intent classification.
//!
//! Maps free-text utterances onto a fixed taxonomy of clinical intents with a
//! confidence score and a topical domain. Pure and total: classification
//! never fails.

pub mod classifier;
pub mod keywords;
pub mod types;

pub use classifier::IntentClassifier;
pub use types::{Domain, Intent, IntentType};
