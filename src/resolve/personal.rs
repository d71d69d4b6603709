//! Personal-data override: answers "what's my sugar score?" from the user's
//! own measurements instead of the knowledge base.
//!
//! Rules are keyed by topic id, like the knowledge base, and evaluated in
//! table order. Only glucose is built in; configuration may append more.
//! A triggered rule short-circuits the rest of the answer chain whatever
//! topic was extracted.

use serde::{Deserialize, Serialize};

use super::fallback::fallback_response;
use super::{Answer, AnswerStage, Response, StageKind, StageOutcome, Turn, Utterance};
use crate::knowledge::{KnowledgeBase, KnowledgeError, KnowledgeResult, TopicId};
use crate::snapshot::{MetricKind, format_value};

/// Clinical threshold for fasting glucose, mg/dL. Strictly above is high.
pub const GLUCOSE_HIGH_THRESHOLD: f64 = 140.0;

const DEFAULT_HIGH_TEMPLATE: &str = "Your {label} of {value} {unit} is high. Consult a doctor.";
const DEFAULT_NORMAL_TEMPLATE: &str = "Your {label} ({value}) is normal.";

fn default_personal_cues() -> Vec<String> {
    vec!["my".into(), "score".into()]
}
fn default_high_template() -> String {
    DEFAULT_HIGH_TEMPLATE.into()
}
fn default_normal_template() -> String {
    DEFAULT_NORMAL_TEMPLATE.into()
}

/// One metric that can be answered from the snapshot.
///
/// Triggers when the utterance contains any `personal_cues` entry AND any
/// `metric_cues` entry. Templates may use `{label}`, `{value}` and `{unit}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub topic: TopicId,
    pub metric: MetricKind,
    #[serde(default = "default_personal_cues")]
    pub personal_cues: Vec<String>,
    pub metric_cues: Vec<String>,
    pub threshold: f64,
    #[serde(default = "default_high_template")]
    pub high_template: String,
    #[serde(default = "default_normal_template")]
    pub normal_template: String,
}

impl OverrideRule {
    /// The built-in rule: ("my" or "score") and ("glucose" or "sugar").
    pub fn glucose() -> Self {
        Self {
            topic: TopicId::from("glucose"),
            metric: MetricKind::Glucose,
            personal_cues: default_personal_cues(),
            metric_cues: vec!["glucose".into(), "sugar".into()],
            threshold: GLUCOSE_HIGH_THRESHOLD,
            high_template: default_high_template(),
            normal_template: default_normal_template(),
        }
    }

    pub fn triggers(&self, utterance: &Utterance) -> bool {
        utterance.contains_any(&self.personal_cues) && utterance.contains_any(&self.metric_cues)
    }

    pub fn is_high(&self, value: f64) -> bool {
        value > self.threshold
    }

    pub fn render(&self, value: f64) -> Response {
        let template = if self.is_high(value) {
            &self.high_template
        } else {
            &self.normal_template
        };
        Response::new(
            template
                .replace("{label}", self.metric.label())
                .replace("{value}", &format_value(value))
                .replace("{unit}", self.metric.unit()),
        )
    }

    fn validate(&self, knowledge: &KnowledgeBase) -> KnowledgeResult<()> {
        let invalid = |message: &str| KnowledgeError::InvalidOverride {
            id: self.topic.to_string(),
            message: message.to_string(),
        };
        if !knowledge.contains(&self.topic) {
            return Err(KnowledgeError::UnknownTopic {
                id: self.topic.to_string(),
            });
        }
        for (name, cues) in [
            ("personal_cues", &self.personal_cues),
            ("metric_cues", &self.metric_cues),
        ] {
            if cues.is_empty() {
                return Err(invalid(&format!("{name} is empty")));
            }
            if cues.iter().any(|c| c.is_empty() || *c != c.to_lowercase()) {
                return Err(invalid(&format!("{name} must be non-empty lowercase strings")));
            }
        }
        if !self.threshold.is_finite() {
            return Err(invalid("threshold is not a finite number"));
        }
        Ok(())
    }
}

/// Ordered set of override rules.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideTable {
    rules: Vec<OverrideRule>,
}

impl OverrideTable {
    /// Glucose only.
    pub fn builtin() -> Self {
        Self {
            rules: vec![OverrideRule::glucose()],
        }
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append rules after the existing ones; earlier rules keep priority.
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = OverrideRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule triggered by the utterance.
    pub fn find(&self, utterance: &Utterance) -> Option<&OverrideRule> {
        self.rules.iter().find(|r| r.triggers(utterance))
    }

    pub fn validate(&self, knowledge: &KnowledgeBase) -> KnowledgeResult<()> {
        self.rules.iter().try_for_each(|r| r.validate(knowledge))
    }
}

impl Default for OverrideTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Answer stage backed by an [`OverrideTable`].
#[derive(Debug, Clone)]
pub struct PersonalDataOverride {
    table: OverrideTable,
}

impl PersonalDataOverride {
    pub fn new(table: OverrideTable) -> Self {
        Self { table }
    }
}

impl AnswerStage for PersonalDataOverride {
    fn kind(&self) -> StageKind {
        StageKind::PersonalData
    }

    fn answer(&self, turn: &Turn<'_>) -> StageOutcome<Answer> {
        let Some(rule) = self.table.find(turn.utterance) else {
            return StageOutcome::Pass;
        };

        let answer = match turn.snapshot.metric(rule.metric) {
            Some(value) => Answer::new(rule.render(value), None),
            None => {
                // No reading to quote: answer generically rather than from the KB.
                tracing::warn!(
                    topic = %rule.topic,
                    metric = %rule.metric,
                    "personal-data question without a measured value"
                );
                Answer::degraded(fallback_response(turn.utterance))
            }
        };

        StageOutcome::Resolved(answer)
    }
}
