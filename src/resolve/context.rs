//! Context carry-over for follow-ups such as "how do I improve it?".

use super::{StageOutcome, Turn, TopicStage};
use crate::knowledge::TopicId;

/// Words that mark a follow-up about the previous topic.
pub const ANAPHORA_CUES: [&str; 6] = ["that", "it", "this", "improve", "diet", "food"];

/// Reuses the session's last topic when the utterance names none but leans
/// on context. Runs only after extraction found nothing, and never changes
/// the remembered topic itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextResolver;

impl TopicStage for ContextResolver {
    fn name(&self) -> &'static str {
        "context-resolver"
    }

    fn resolve_topic(&self, turn: &Turn<'_>) -> StageOutcome<TopicId> {
        let Some(last) = turn.last_topic else {
            return StageOutcome::Pass;
        };
        if !turn.knowledge.contains(last) {
            tracing::debug!(topic = %last, "remembered topic not in knowledge base");
            return StageOutcome::Pass;
        }
        if turn.utterance.contains_any(&ANAPHORA_CUES) {
            StageOutcome::Resolved(last.clone())
        } else {
            StageOutcome::Pass
        }
    }
}
