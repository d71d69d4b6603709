//! Intent classification for an active topic.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Utterance;

/// What kind of answer the user wants about a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// "What is X?" (the default).
    Definition,
    /// "What foods lower X?", "how do I improve it?"
    DietAdvice,
    /// "Which tests check X?"
    TestsNeeded,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Definition => write!(f, "definition"),
            Self::DietAdvice => write!(f, "diet_advice"),
            Self::TestsNeeded => write!(f, "tests_needed"),
        }
    }
}

pub const DIET_CUES: [&str; 6] = ["food", "eat", "diet", "lower", "improve", "advice"];
pub const TEST_CUES: [&str; 3] = ["test", "check", "monitor"];

/// Diet cues beat test cues; anything else is a definition request.
pub fn classify_intent(utterance: &Utterance) -> Intent {
    if utterance.contains_any(&DIET_CUES) {
        Intent::DietAdvice
    } else if utterance.contains_any(&TEST_CUES) {
        Intent::TestsNeeded
    } else {
        Intent::Definition
    }
}
