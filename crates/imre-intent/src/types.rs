//! Intent value types.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Clinical intent categories: what the user is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Status,
    Training,
    Simulation,
    Knowledge,
    ClinicalReasoning,
    SmallTalk,
    Unknown,
}

impl IntentType {
    /// All categories in declared order. Earlier categories win score ties.
    pub const ALL: [IntentType; 7] = [
        IntentType::Status,
        IntentType::Training,
        IntentType::Simulation,
        IntentType::Knowledge,
        IntentType::ClinicalReasoning,
        IntentType::SmallTalk,
        IntentType::Unknown,
    ];
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentType::Status => write!(f, "status"),
            IntentType::Training => write!(f, "training"),
            IntentType::Simulation => write!(f, "simulation"),
            IntentType::Knowledge => write!(f, "knowledge"),
            IntentType::ClinicalReasoning => write!(f, "clinical_reasoning"),
            IntentType::SmallTalk => write!(f, "small_talk"),
            IntentType::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for IntentType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(IntentType::Status),
            "training" => Ok(IntentType::Training),
            "simulation" => Ok(IntentType::Simulation),
            "knowledge" => Ok(IntentType::Knowledge),
            "clinical_reasoning" => Ok(IntentType::ClinicalReasoning),
            "small_talk" => Ok(IntentType::SmallTalk),
            "unknown" => Ok(IntentType::Unknown),
            _ => Err(format!("Unknown intent type: {}", s)),
        }
    }
}

/// Topical domain derived from keyword presence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Cannabis,
    Nephrology,
    #[default]
    General,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Cannabis => write!(f, "cannabis"),
            Domain::Nephrology => write!(f, "nephrology"),
            Domain::General => write!(f, "general"),
        }
    }
}

/// Result of classifying one utterance. Produced fresh per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "type")]
    pub intent_type: IntentType,
    /// Confidence in [0, 1].
    pub confidence: f32,
    pub keywords: BTreeSet<String>,
    pub domain: Domain,
    pub raw_input: String,
}

impl Intent {
    /// True when the utterance is tagged with a clinical domain.
    pub fn is_domain_specific(&self) -> bool {
        self.domain != Domain::General
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_type_display_roundtrip() {
        for t in IntentType::ALL {
            let parsed: IntentType = t.to_string().parse().unwrap();
            assert_eq!(parsed, t);
        }
        assert!("chit_chat".parse::<IntentType>().is_err());
    }

    #[test]
    fn test_declared_order_ends_with_unknown() {
        assert_eq!(IntentType::ALL[0], IntentType::Status);
        assert_eq!(IntentType::ALL[6], IntentType::Unknown);
    }

    #[test]
    fn test_domain_default_is_general() {
        assert_eq!(Domain::default(), Domain::General);
        assert_eq!(Domain::Nephrology.to_string(), "nephrology");
    }

    #[test]
    fn test_intent_serializes_type_field() {
        let intent = Intent {
            intent_type: IntentType::ClinicalReasoning,
            confidence: 0.4,
            keywords: BTreeSet::new(),
            domain: Domain::Cannabis,
            raw_input: "x".to_string(),
        };
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["type"], "clinical_reasoning");
        assert_eq!(json["domain"], "cannabis");
        assert!(intent.is_domain_specific());
    }
}
