//! Contextual intent resolution: one utterance plus session state in, one
//! response out.
//!
//! Resolution runs as two ordered chains of stages. Each stage either
//! resolves or passes, and the first stage that resolves wins:
//!
//! 1. **Topic stages** pick the active topic:
//!    [`TopicExtractor`] (keywords in the utterance), then
//!    [`ContextResolver`] (carry the last topic for "it"/"that"/"improve").
//! 2. The session's last topic is updated once, before any answering.
//! 3. **Answer stages** produce the text:
//!    [`PersonalDataOverride`] (the user's own values, short-circuits),
//!    [`TopicAnswer`] (intent classification + formatting), then
//!    [`Fallback`] (always resolves).
//!
//! ## Worked example
//!
//! Turn 1, "what is glucose?": extractor resolves `glucose`, state
//! remembers it, the override does not trigger, `TopicAnswer` classifies
//! `Definition` → "**Glucose:** Glucose is the main sugar ...".
//!
//! Turn 2, "how do I improve it?": no keyword, the context resolver carries
//! `glucose`, "improve" classifies as `DietAdvice` → "🍎 **Diet & Advice
//! for Glucose:** ...".

pub mod context;
pub mod extract;
pub mod fallback;
pub mod format;
pub mod intent;
pub mod normalize;
pub mod personal;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;
use crate::conversation::ConversationState;
use crate::error::SilentRiskResult;
use crate::knowledge::{KnowledgeBase, KnowledgeResult, Topic, TopicId};
use crate::snapshot::HealthSnapshot;

pub use context::ContextResolver;
pub use extract::TopicExtractor;
pub use fallback::Fallback;
pub use format::{Response, TopicAnswer};
pub use intent::Intent;
pub use normalize::Utterance;
pub use personal::{OverrideRule, OverrideTable, PersonalDataOverride};

// ── Stage contracts ─────────────────────────────────────────────────────

/// Result of evaluating one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Resolved(T),
    Pass,
}

/// Read-only view of the turn handed to every stage.
#[derive(Debug, Clone, Copy)]
pub struct Turn<'a> {
    pub utterance: &'a Utterance,
    pub knowledge: &'a KnowledgeBase,
    pub snapshot: &'a HealthSnapshot,
    /// Topic remembered from earlier turns (after this turn's update when
    /// seen by answer stages).
    pub last_topic: Option<&'a TopicId>,
    /// The active topic; always `None` while topic stages run.
    pub topic: Option<&'a Topic>,
}

/// A stage that may select the active topic.
pub trait TopicStage: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve_topic(&self, turn: &Turn<'_>) -> StageOutcome<TopicId>;
}

/// A stage that may produce the turn's response.
pub trait AnswerStage: Send + Sync {
    fn kind(&self) -> StageKind;
    fn answer(&self, turn: &Turn<'_>) -> StageOutcome<Answer>;
}

/// Text produced by an answer stage, with the intent it answered, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub response: Response,
    pub intent: Option<Intent>,
    /// The stage could not answer precisely and used the fallback text.
    pub degraded: bool,
}

impl Answer {
    pub fn new(response: Response, intent: Option<Intent>) -> Self {
        Self {
            response,
            intent,
            degraded: false,
        }
    }

    /// Fallback text given in place of a precise answer.
    pub fn degraded(response: Response) -> Self {
        Self {
            response,
            intent: None,
            degraded: true,
        }
    }
}

/// Which answer stage produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    PersonalData,
    TopicAnswer,
    Fallback,
}

impl StageKind {
    pub const fn name(&self) -> &'static str {
        match self {
            StageKind::PersonalData => "personal-data",
            StageKind::TopicAnswer => "topic-answer",
            StageKind::Fallback => "fallback",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything one turn produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub response: Response,
    /// Active topic of the turn, whichever stage answered.
    pub topic: Option<TopicId>,
    /// Set only when the knowledge base answered.
    pub intent: Option<Intent>,
    pub stage: StageKind,
}

// ── Engine ──────────────────────────────────────────────────────────────

/// The resolution pipeline over a fixed knowledge base.
///
/// Immutable after construction and shareable across sessions; the only
/// mutable state is the caller's [`ConversationState`].
pub struct ResolutionEngine {
    knowledge: KnowledgeBase,
    topic_stages: Vec<Box<dyn TopicStage>>,
    answer_stages: Vec<Box<dyn AnswerStage>>,
}

impl fmt::Debug for ResolutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("knowledge", &self.knowledge.name())
            .field("stages", &self.stage_order())
            .finish()
    }
}

impl ResolutionEngine {
    /// Build the standard pipeline. Fails if an override rule names a topic
    /// the knowledge base lacks.
    pub fn new(knowledge: KnowledgeBase, overrides: OverrideTable) -> KnowledgeResult<Self> {
        overrides.validate(&knowledge)?;
        tracing::info!(
            knowledge = knowledge.name(),
            topics = knowledge.len(),
            overrides = overrides.len(),
            "resolution engine ready"
        );
        Ok(Self {
            knowledge,
            topic_stages: vec![Box::new(TopicExtractor), Box::new(ContextResolver)],
            answer_stages: vec![
                Box::new(PersonalDataOverride::new(overrides)),
                Box::new(TopicAnswer),
                Box::new(Fallback),
            ],
        })
    }

    /// Bundled knowledge base with the built-in glucose override.
    pub fn bundled() -> KnowledgeResult<Self> {
        Self::new(KnowledgeBase::bundled()?, OverrideTable::builtin())
    }

    /// Knowledge base and extra override rules taken from configuration.
    ///
    /// The built-in glucose rule is dropped when an external knowledge base
    /// has no glucose topic; configured rules must always match a topic.
    pub fn from_config(config: &ChatConfig) -> SilentRiskResult<Self> {
        let knowledge = match &config.knowledge_base {
            Some(path) => KnowledgeBase::load(path)?,
            None => KnowledgeBase::bundled()?,
        };
        let builtin = OverrideRule::glucose();
        let base = if knowledge.contains(&builtin.topic) {
            OverrideTable::builtin()
        } else {
            tracing::warn!(topic = %builtin.topic, "knowledge base lacks topic, built-in override disabled");
            OverrideTable::empty()
        };
        let overrides = base.with_rules(config.overrides.iter().cloned());
        Ok(Self::new(knowledge, overrides)?)
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Stage names in evaluation order, topic stages first.
    pub fn stage_order(&self) -> Vec<&'static str> {
        self.topic_stages
            .iter()
            .map(|s| s.name())
            .chain(self.answer_stages.iter().map(|s| s.kind().name()))
            .collect()
    }

    /// Resolve one utterance. Never fails; updates `state.last_topic` when a
    /// topic is active.
    pub fn resolve(
        &self,
        utterance: &str,
        state: &mut ConversationState,
        snapshot: &HealthSnapshot,
    ) -> Resolution {
        let utterance = Utterance::new(utterance);
        tracing::debug!(utterance = utterance.text(), "resolving turn");

        let topic_id = {
            let turn = Turn {
                utterance: &utterance,
                knowledge: &self.knowledge,
                snapshot,
                last_topic: state.last_topic(),
                topic: None,
            };
            self.topic_stages
                .iter()
                .find_map(|stage| match stage.resolve_topic(&turn) {
                    StageOutcome::Resolved(id) => {
                        tracing::debug!(stage = stage.name(), topic = %id, "topic resolved");
                        Some(id)
                    }
                    StageOutcome::Pass => None,
                })
        };

        if let Some(id) = &topic_id {
            state.remember(id.clone());
        }

        let turn = Turn {
            utterance: &utterance,
            knowledge: &self.knowledge,
            snapshot,
            last_topic: state.last_topic(),
            topic: topic_id.as_ref().and_then(|id| self.knowledge.lookup(id)),
        };

        for stage in &self.answer_stages {
            if let StageOutcome::Resolved(answer) = stage.answer(&turn) {
                let kind = if answer.degraded {
                    StageKind::Fallback
                } else {
                    stage.kind()
                };
                tracing::debug!(stage = %stage.kind(), answered_as = %kind, intent = ?answer.intent, "turn answered");
                return Resolution {
                    response: answer.response,
                    topic: topic_id,
                    intent: answer.intent,
                    stage: kind,
                };
            }
        }

        // The standard chain ends in `Fallback`, which always resolves.
        Resolution {
            response: fallback::fallback_response(&utterance),
            topic: topic_id,
            intent: None,
            stage: StageKind::Fallback,
        }
    }

    /// By-value form: consumes the state and hands back the updated one.
    pub fn resolve_turn(
        &self,
        utterance: &str,
        mut state: ConversationState,
        snapshot: &HealthSnapshot,
    ) -> (Response, ConversationState) {
        let resolution = self.resolve(utterance, &mut state, snapshot);
        (resolution.response, state)
    }
}
