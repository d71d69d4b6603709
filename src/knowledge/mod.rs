//! Health knowledge base: the closed set of topics the assistant can explain.
//!
//! A knowledge base is a TOML-defined, ordered list of [`Topic`]s. One pack is
//! bundled into the binary (`data/knowledge/topics.toml`); an external file
//! with the same layout can replace it through configuration.
//!
//! Topic order is significant: the topic extractor walks topics in file order
//! and the first topic with a matching keyword wins. Keyword matching is a
//! plain substring test against the normalized utterance, so `"rest"` also
//! matches inside `"interest"` and `"alt"` inside `"health"`. That behaviour
//! is kept as-is; see [`Topic::matches`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Errors ──────────────────────────────────────────────────────────────

#[derive(Debug, Error, Diagnostic)]
pub enum KnowledgeError {
    #[error("failed to parse knowledge base \"{source_name}\": {message}")]
    #[diagnostic(
        code(silentrisk::knowledge::parse),
        help("Check the TOML syntax. Each `[[topics]]` entry needs id, keywords, definition, diet_advice and recommended_tests.")
    )]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("failed to read knowledge base file: {path}")]
    #[diagnostic(
        code(silentrisk::knowledge::io),
        help("Ensure the file exists and is readable, or remove `knowledge_base` from the config to use the bundled topics.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("knowledge base \"{source_name}\" defines no topics")]
    #[diagnostic(
        code(silentrisk::knowledge::empty),
        help("Add at least one `[[topics]]` entry.")
    )]
    Empty { source_name: String },

    #[error("topic #{index} has an empty id")]
    #[diagnostic(
        code(silentrisk::knowledge::empty_id),
        help("Every topic needs a stable, non-empty id such as \"glucose\".")
    )]
    EmptyId { index: usize },

    #[error("duplicate topic id \"{id}\"")]
    #[diagnostic(
        code(silentrisk::knowledge::duplicate),
        help("Topic ids must be unique. Merge the keywords into one entry or rename one of them.")
    )]
    DuplicateTopic { id: String },

    #[error("topic \"{id}\" has no keywords")]
    #[diagnostic(
        code(silentrisk::knowledge::no_keywords),
        help("A topic without keywords can never be matched. Add at least one lowercase keyword.")
    )]
    NoKeywords { id: String },

    #[error("topic \"{id}\" has an invalid keyword \"{keyword}\"")]
    #[diagnostic(
        code(silentrisk::knowledge::invalid_keyword),
        help("Keywords are matched against lowercased input, so they must be non-empty and lowercase.")
    )]
    InvalidKeyword { id: String, keyword: String },

    #[error("topic \"{id}\" is missing its {field} text")]
    #[diagnostic(
        code(silentrisk::knowledge::missing_text),
        help("Fill in definition, diet_advice and recommended_tests for every topic.")
    )]
    MissingText { id: String, field: &'static str },

    #[error("override rule refers to unknown topic \"{id}\"")]
    #[diagnostic(
        code(silentrisk::knowledge::unknown_topic),
        help("Override rules are keyed by topic id. Use one of the ids listed by `silentrisk topics`.")
    )]
    UnknownTopic { id: String },

    #[error("override rule for topic \"{id}\" is invalid: {message}")]
    #[diagnostic(
        code(silentrisk::knowledge::invalid_override),
        help("Override rules need non-empty lowercase personal_cues and metric_cues, and a finite threshold.")
    )]
    InvalidOverride { id: String, message: String },
}

pub type KnowledgeResult<T> = std::result::Result<T, KnowledgeError>;

// ── Topic ───────────────────────────────────────────────────────────────

/// Stable key of a topic, e.g. `glucose` or `bp`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(String);

impl TopicId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display title: first letter uppercased, the rest untouched.
    ///
    /// This is not title-casing: `heartrate` becomes `Heartrate`, `bp`
    /// becomes `Bp`.
    pub fn title(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TopicId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A health metric with its explanation, advice and test list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    /// Lowercase phrases; any one contained in the utterance selects the topic.
    pub keywords: Vec<String>,
    pub definition: String,
    pub diet_advice: String,
    pub recommended_tests: String,
}

impl Topic {
    /// Substring match of any keyword against an already-normalized utterance.
    ///
    /// Not a whole-word match: "fasting" and "alt" match inside longer words.
    pub fn matches(&self, normalized: &str) -> bool {
        self.matched_keyword(normalized).is_some()
    }

    /// The first keyword (in declaration order) found in the utterance.
    pub fn matched_keyword(&self, normalized: &str) -> Option<&str> {
        self.keywords
            .iter()
            .map(String::as_str)
            .find(|k| normalized.contains(k))
    }

    fn validate(&self, index: usize) -> KnowledgeResult<()> {
        let id = self.id.as_str();
        if id.trim().is_empty() {
            return Err(KnowledgeError::EmptyId { index });
        }
        if self.keywords.is_empty() {
            return Err(KnowledgeError::NoKeywords { id: id.into() });
        }
        if let Some(bad) = self
            .keywords
            .iter()
            .find(|k| k.is_empty() || **k != k.to_lowercase())
        {
            return Err(KnowledgeError::InvalidKeyword {
                id: id.into(),
                keyword: bad.clone(),
            });
        }
        for (field, text) in [
            ("definition", &self.definition),
            ("diet_advice", &self.diet_advice),
            ("recommended_tests", &self.recommended_tests),
        ] {
            if text.trim().is_empty() {
                return Err(KnowledgeError::MissingText {
                    id: id.into(),
                    field,
                });
            }
        }
        Ok(())
    }
}

// ── TOML deserialization helpers ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct KnowledgeToml {
    #[serde(default)]
    knowledge: Option<KnowledgeMeta>,
    #[serde(default)]
    topics: Vec<Topic>,
}

#[derive(Debug, Deserialize)]
struct KnowledgeMeta {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

const BUNDLED_TOML: &str = include_str!("../../data/knowledge/topics.toml");

/// Where a knowledge base came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeSource {
    /// Embedded in the binary via `include_str!`.
    Bundled,
    /// Loaded from a file on disk.
    External(PathBuf),
}

// ── Knowledge base ──────────────────────────────────────────────────────

/// Read-only, ordered registry of topics.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    name: String,
    version: Option<String>,
    source: KnowledgeSource,
    topics: Vec<Topic>,
    index: HashMap<TopicId, usize>,
}

impl KnowledgeBase {
    /// The knowledge base shipped with the crate.
    pub fn bundled() -> KnowledgeResult<Self> {
        Self::from_toml_str(BUNDLED_TOML, KnowledgeSource::Bundled)
    }

    /// Load a knowledge base from a TOML file.
    pub fn load(path: &Path) -> KnowledgeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| KnowledgeError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content, KnowledgeSource::External(path.to_path_buf()))
    }

    /// Parse and validate a knowledge base from TOML text.
    pub fn from_toml_str(toml_str: &str, source: KnowledgeSource) -> KnowledgeResult<Self> {
        let source_name = match &source {
            KnowledgeSource::Bundled => "bundled".to_string(),
            KnowledgeSource::External(path) => path.display().to_string(),
        };
        let parsed: KnowledgeToml = toml::from_str(toml_str).map_err(|e| KnowledgeError::Parse {
            source_name: source_name.clone(),
            message: e.to_string(),
        })?;
        let (name, version) = match parsed.knowledge {
            Some(meta) => (meta.name, meta.version),
            None => (source_name.clone(), None),
        };
        let kb = Self::from_topics(name, parsed.topics)?;
        tracing::debug!(source = %source_name, topics = kb.len(), "knowledge base loaded");
        Ok(Self {
            version,
            source,
            ..kb
        })
    }

    /// Build a knowledge base from topics in resolution order.
    pub fn from_topics(name: impl Into<String>, topics: Vec<Topic>) -> KnowledgeResult<Self> {
        let name = name.into();
        if topics.is_empty() {
            return Err(KnowledgeError::Empty { source_name: name });
        }

        let mut index = HashMap::with_capacity(topics.len());
        for (i, topic) in topics.iter().enumerate() {
            topic.validate(i)?;
            if index.insert(topic.id.clone(), i).is_some() {
                return Err(KnowledgeError::DuplicateTopic {
                    id: topic.id.to_string(),
                });
            }
        }

        Ok(Self {
            name,
            version: None,
            source: KnowledgeSource::Bundled,
            topics,
            index,
        })
    }

    pub fn lookup(&self, id: &TopicId) -> Option<&Topic> {
        self.index.get(id).map(|&i| &self.topics[i])
    }

    /// Lookup by raw id string.
    pub fn get(&self, id: &str) -> Option<&Topic> {
        self.lookup(&TopicId::from(id))
    }

    pub fn contains(&self, id: &TopicId) -> bool {
        self.index.contains_key(id)
    }

    /// Topics in resolution order.
    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.topics.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &TopicId> {
        self.topics.iter().map(|t| &t.id)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn source(&self) -> &KnowledgeSource {
        &self.source
    }
}
