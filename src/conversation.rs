//! Conversation state and session ownership.
//!
//! The only memory carried between turns is the last resolved topic. Each
//! session owns its [`ConversationState`] exclusively; nothing is shared
//! across sessions except the read-only [`ResolutionEngine`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};

use crate::knowledge::TopicId;
use crate::resolve::{Resolution, ResolutionEngine};
use crate::snapshot::HealthSnapshot;

/// Default first message of a session.
pub const DEFAULT_GREETING: &str = "Hello! I'm your SilentRisk AI. I can analyze your current indicators. Ask me about your glucose or heart metrics.";

// ── ConversationState ────────────────────────────────────────────────────

/// Per-session memory: the most recently resolved topic, nothing more.
///
/// Set on every turn that resolves a topic and never cleared otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    last_topic: Option<TopicId>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known topic, e.g. when restoring a client-held session.
    pub fn with_last_topic(topic: impl Into<TopicId>) -> Self {
        Self {
            last_topic: Some(topic.into()),
        }
    }

    pub fn last_topic(&self) -> Option<&TopicId> {
        self.last_topic.as_ref()
    }

    pub(crate) fn remember(&mut self, topic: TopicId) {
        self.last_topic = Some(topic);
    }
}

// ── Session ──────────────────────────────────────────────────────────────

/// One conversation: an engine handle plus that conversation's state.
#[derive(Debug, Clone)]
pub struct Session {
    engine: Arc<ResolutionEngine>,
    state: ConversationState,
    greeting: String,
}

impl Session {
    pub fn new(engine: Arc<ResolutionEngine>, greeting: impl Into<String>) -> Self {
        Self {
            engine,
            state: ConversationState::new(),
            greeting: greeting.into(),
        }
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Resolve one turn. The next turn is not accepted until this returns.
    pub fn ask(&mut self, utterance: &str, snapshot: &HealthSnapshot) -> Resolution {
        self.engine.resolve(utterance, &mut self.state, snapshot)
    }
}

// ── SessionStore ─────────────────────────────────────────────────────────

/// Default idle time after which [`SessionStore::sweep`] drops a session.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct SessionEntry {
    state: ConversationState,
    last_seen: Instant,
}

/// Outcome of one turn handled by a [`SessionStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTurn {
    pub resolution: Resolution,
    /// The store held no state for this id before the turn.
    pub started: bool,
}

/// Conversation states keyed by session id, for hosts serving many users.
///
/// Each entry is locked only for the duration of its own turn; sessions
/// never observe each other's topics. A new id is only stored once one of
/// its turns resolves a topic, and idle sessions are dropped by
/// [`sweep`](Self::sweep).
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, SessionEntry>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_SESSION_IDLE)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Resolve a turn for `session_id`.
    ///
    /// Lookup, resolution and insertion happen under one entry lock, so two
    /// concurrent first turns for the same id see exactly one `started`.
    pub fn resolve(
        &self,
        engine: &ResolutionEngine,
        session_id: &str,
        utterance: &str,
        snapshot: &HealthSnapshot,
    ) -> StoredTurn {
        match self.sessions.entry(session_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.last_seen = Instant::now();
                StoredTurn {
                    resolution: engine.resolve(utterance, &mut entry.state, snapshot),
                    started: false,
                }
            }
            Entry::Vacant(vacant) => {
                let mut state = ConversationState::new();
                let resolution = engine.resolve(utterance, &mut state, snapshot);
                let started = state.last_topic().is_some();
                if started {
                    vacant.insert(SessionEntry {
                        state,
                        last_seen: Instant::now(),
                    });
                }
                StoredTurn {
                    resolution,
                    started,
                }
            }
        }
    }

    /// Current state of a session, if it exists.
    pub fn state(&self, session_id: &str) -> Option<ConversationState> {
        self.sessions.get(session_id).map(|e| e.state.clone())
    }

    /// Drop a session. Returns whether it existed.
    pub fn end(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Drop sessions idle longer than the timeout as of `now`. Returns how
    /// many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| now.saturating_duration_since(entry.last_seen) < self.idle_timeout);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.sessions.len(), "idle sessions swept");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
