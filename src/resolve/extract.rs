//! Topic extraction: first knowledge-base topic with a keyword in the utterance.

use super::{StageOutcome, Turn, TopicStage};
use crate::knowledge::{KnowledgeBase, TopicId};

/// Walks topics in knowledge-base order; first match wins.
///
/// "is sugar related to blood pressure?" resolves to `glucose`, not `bp`,
/// because `glucose` is declared first.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopicExtractor;

impl TopicExtractor {
    pub fn extract<'k>(knowledge: &'k KnowledgeBase, normalized: &str) -> Option<&'k TopicId> {
        knowledge.topics().find_map(|topic| {
            topic.matched_keyword(normalized).map(|keyword| {
                tracing::trace!(topic = %topic.id, keyword, "keyword matched");
                &topic.id
            })
        })
    }
}

impl TopicStage for TopicExtractor {
    fn name(&self) -> &'static str {
        "topic-extractor"
    }

    fn resolve_topic(&self, turn: &Turn<'_>) -> StageOutcome<TopicId> {
        match Self::extract(turn.knowledge, turn.utterance.text()) {
            Some(id) => StageOutcome::Resolved(id.clone()),
            None => StageOutcome::Pass,
        }
    }
}
