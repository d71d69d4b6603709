//! Response rendering for knowledge-base answers.
//!
//! Responses carry inline emphasis markers (`**bold**`, `*italic*`, emoji).
//! The engine treats them as opaque text; rendering them is the host's job.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::intent::classify_intent;
use super::{Answer, AnswerStage, Intent, StageKind, StageOutcome, Turn};
use crate::knowledge::Topic;

/// Hint appended to every definition answer.
pub const DEFINITION_TIP: &str = "💡 *Tip: Ask about 'foods' or 'tests' for this.*";

/// Plain-text output of one turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Response(String);

impl Response {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Response {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Render one knowledge-base field for the given intent.
pub fn render(topic: &Topic, intent: Intent) -> Response {
    let title = topic.id.title();
    let text = match intent {
        Intent::DietAdvice => format!("🍎 **Diet & Advice for {title}:** {}", topic.diet_advice),
        Intent::TestsNeeded => format!("🩺 **Tests for {title}:** {}", topic.recommended_tests),
        Intent::Definition => format!("**{title}:** {}\n\n{DEFINITION_TIP}", topic.definition),
    };
    Response(text)
}

/// Answers from the knowledge base whenever a topic is active.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopicAnswer;

impl AnswerStage for TopicAnswer {
    fn kind(&self) -> StageKind {
        StageKind::TopicAnswer
    }

    fn answer(&self, turn: &Turn<'_>) -> StageOutcome<Answer> {
        let Some(topic) = turn.topic else {
            return StageOutcome::Pass;
        };
        let intent = classify_intent(turn.utterance);
        StageOutcome::Resolved(Answer::new(render(topic, intent), Some(intent)))
    }
}
