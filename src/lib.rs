// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # silentrisk
//!
//! Contextual intent resolution for the SilentRisk health-metrics assistant.
//!
//! ## Architecture
//!
//! - **Knowledge base** (`knowledge`): Ordered topics with keywords and three answer texts
//! - **Resolution** (`resolve`): Topic stages then answer stages, first resolver wins
//! - **Conversation** (`conversation`): Per-session last-topic memory and a session store
//! - **Snapshot** (`snapshot`): The user's own measurements, leniently parsed from JSON
//! - **Recommendations** (`recommend`): Rule-based lifestyle advice and risk category
//! - **Config** (`config`): TOML chat settings and extra override rules
//!
//! ## Library usage
//!
//! ```no_run
//! use silentrisk::conversation::ConversationState;
//! use silentrisk::resolve::ResolutionEngine;
//! use silentrisk::snapshot::{HealthSnapshot, MetricKind};
//!
//! let engine = ResolutionEngine::bundled().unwrap();
//! let mut state = ConversationState::new();
//! let snapshot = HealthSnapshot::default().with(MetricKind::Glucose, 150.0);
//!
//! let first = engine.resolve("what is glucose?", &mut state, &snapshot);
//! let second = engine.resolve("how do I improve it?", &mut state, &snapshot);
//! println!("{}\n{}", first.response, second.response);
//! ```

pub mod config;
pub mod conversation;
pub mod error;
pub mod knowledge;
pub mod recommend;
pub mod resolve;
pub mod snapshot;
