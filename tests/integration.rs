//! End-to-end tests for turn resolution.
//!
//! These drive the public engine API the way a chat host would: one
//! conversation state per session, a snapshot per turn, and the response
//! text compared against the bundled knowledge base.

use std::sync::Arc;

use silentrisk::config::ChatConfig;
use silentrisk::conversation::{ConversationState, Session, SessionStore};
use silentrisk::knowledge::{KnowledgeBase, TopicId};
use silentrisk::recommend::{RiskCategory, recommend};
use silentrisk::resolve::fallback::{GENERIC_HELP, RISK_EXPLANATION};
use silentrisk::resolve::{Intent, ResolutionEngine, StageKind, Utterance};
use silentrisk::snapshot::{HealthSnapshot, MetricKind};

fn engine() -> ResolutionEngine {
    ResolutionEngine::bundled().unwrap()
}

fn glucose(value: f64) -> HealthSnapshot {
    HealthSnapshot::default().with(MetricKind::Glucose, value)
}

#[test]
fn keyword_selects_topic_and_updates_state() {
    let engine = engine();
    let kb = engine.knowledge();
    let topics: Vec<_> = kb.topics().collect();

    for (i, topic) in topics.iter().enumerate() {
        for keyword in &topic.keywords {
            let utterance = Utterance::new(keyword);
            // Skip keywords an earlier topic also claims ("bpm" contains "bp").
            if topics[..i]
                .iter()
                .any(|earlier| earlier.matches(utterance.text()))
            {
                continue;
            }
            let mut state = ConversationState::new();
            let r = engine.resolve(keyword, &mut state, &HealthSnapshot::default());
            assert_eq!(r.topic.as_ref(), Some(&topic.id), "keyword {keyword:?}");
            assert_eq!(state.last_topic(), Some(&topic.id), "keyword {keyword:?}");
        }
    }
}

#[test]
fn improve_carries_last_topic() {
    let engine = engine();
    let mut state = ConversationState::with_last_topic("glucose");
    let r = engine.resolve("How can I improve?", &mut state, &HealthSnapshot::default());
    assert_eq!(r.topic, Some(TopicId::from("glucose")));
    assert_eq!(r.intent, Some(Intent::DietAdvice));
    assert!(r.response.as_str().starts_with("🍎 **Diet & Advice for Glucose:**"));
    assert_eq!(state.last_topic(), Some(&TopicId::from("glucose")));
}

#[test]
fn new_keyword_beats_remembered_topic() {
    let engine = engine();
    let mut state = ConversationState::with_last_topic("glucose");
    let r = engine.resolve("how do I improve my sleep", &mut state, &HealthSnapshot::default());
    assert_eq!(r.topic, Some(TopicId::from("sleep")));
    assert_eq!(r.intent, Some(Intent::DietAdvice));
    assert!(r.response.as_str().starts_with("🍎 **Diet & Advice for Sleep:**"));
    assert_eq!(state.last_topic(), Some(&TopicId::from("sleep")));
}

#[test]
fn cholesterol_foods_is_diet_advice() {
    let engine = engine();
    let mut state = ConversationState::new();
    let r = engine.resolve(
        "what foods lower my cholesterol",
        &mut state,
        &HealthSnapshot::default(),
    );
    assert_eq!(r.topic, Some(TopicId::from("cholesterol")));
    assert_eq!(r.intent, Some(Intent::DietAdvice));
    let advice = &engine.knowledge().get("cholesterol").unwrap().diet_advice;
    assert_eq!(
        r.response.as_str(),
        format!("🍎 **Diet & Advice for Cholesterol:** {advice}")
    );
}

#[test]
fn liver_tests_is_tests_needed() {
    let engine = engine();
    let mut state = ConversationState::new();
    let r = engine.resolve("what tests check my liver", &mut state, &HealthSnapshot::default());
    assert_eq!(r.topic, Some(TopicId::from("liver")));
    assert_eq!(r.intent, Some(Intent::TestsNeeded));
    assert_eq!(
        r.response.as_str(),
        "🩺 **Tests for Liver:** Liver Function Test (LFT), Ultrasound, FibroScan."
    );
}

#[test]
fn sugar_score_reads_snapshot() {
    let engine = engine();

    let mut state = ConversationState::new();
    let high = engine.resolve("my sugar score", &mut state, &glucose(150.0));
    assert_eq!(high.stage, StageKind::PersonalData);
    assert!(high.response.as_str().contains("150"));
    assert!(high.response.as_str().contains("Consult a doctor"));

    let mut state = ConversationState::new();
    let normal = engine.resolve("my sugar score", &mut state, &glucose(95.0));
    assert_eq!(normal.response.as_str(), "Your glucose (95) is normal.");
}

#[test]
fn sugar_score_without_reading_falls_back() {
    let engine = engine();
    let mut state = ConversationState::new();
    let r = engine.resolve("my sugar score", &mut state, &HealthSnapshot::default());
    assert_eq!(r.response.as_str(), RISK_EXPLANATION);
    assert_eq!(r.stage, StageKind::Fallback);
    assert_eq!(r.intent, None);
}

#[test]
fn gibberish_gets_generic_help() {
    let engine = engine();
    let mut state = ConversationState::new();
    let r = engine.resolve("asdfgh", &mut state, &HealthSnapshot::default());
    assert_eq!(r.response.as_str(), GENERIC_HELP);
    assert_eq!(r.stage, StageKind::Fallback);
    assert_eq!(state.last_topic(), None);
}

#[test]
fn empty_utterance_gets_generic_help() {
    let engine = engine();
    let mut state = ConversationState::new();
    let r = engine.resolve("   ", &mut state, &HealthSnapshot::default());
    assert_eq!(r.response.as_str(), GENERIC_HELP);
}

#[test]
fn risk_question_explains_model() {
    let engine = engine();
    let mut state = ConversationState::new();
    let r = engine.resolve("How is my risk computed?", &mut state, &HealthSnapshot::default());
    assert_eq!(r.response.as_str(), RISK_EXPLANATION);
}

#[test]
fn same_turn_twice_gives_same_response() {
    let engine = engine();
    let snapshot = glucose(150.0);
    for utterance in ["what is bmi", "my sugar score", "asdfgh", "tell me about that"] {
        let start = ConversationState::with_last_topic("sleep");
        let (a, state_a) = engine.resolve_turn(utterance, start.clone(), &snapshot);
        let (b, state_b) = engine.resolve_turn(utterance, start, &snapshot);
        assert_eq!(a, b, "utterance {utterance:?}");
        assert_eq!(state_a, state_b);
    }
}

#[test]
fn first_match_order_is_pinned() {
    let engine = engine();
    let ids: Vec<&str> = engine.knowledge().ids().map(|id| id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "glucose",
            "bp",
            "cholesterol",
            "heartrate",
            "bmi",
            "insulin",
            "stress",
            "sleep",
            "liver"
        ]
    );

    let cases = [
        ("does sugar raise blood pressure", "glucose"),
        ("stress and sleep", "stress"),
        ("insulin and weight", "bmi"),
        ("cholesterol vs pulse", "cholesterol"),
        ("is fatigue a symptom", "cholesterol"),
        ("is my health ok", "liver"),
    ];
    for (utterance, expected) in cases {
        let mut state = ConversationState::new();
        let r = engine.resolve(utterance, &mut state, &HealthSnapshot::default());
        assert_eq!(r.topic, Some(TopicId::from(expected)), "utterance {utterance:?}");
    }
}

#[test]
fn multi_turn_session() {
    let mut session = Session::new(Arc::new(engine()), "Hi.");
    let snapshot = glucose(180.0);

    let r = session.ask("what is glucose?", &snapshot);
    assert!(r.response.as_str().starts_with("**Glucose:** "));

    let r = session.ask("what tests for this?", &snapshot);
    assert!(r.response.as_str().starts_with("🩺 **Tests for Glucose:**"));

    let r = session.ask("is my sugar ok?", &snapshot);
    assert_eq!(
        r.response.as_str(),
        "Your glucose of 180 mg/dL is high. Consult a doctor."
    );

    let r = session.ask("and my stress?", &snapshot);
    assert_eq!(r.topic, Some(TopicId::from("stress")));
    assert_eq!(session.state().last_topic(), Some(&TopicId::from("stress")));
}

#[test]
fn concurrent_sessions_stay_isolated() {
    let engine = Arc::new(engine());
    let store = Arc::new(SessionStore::new());
    let topics = ["glucose", "bp", "sleep", "liver"];

    let handles: Vec<_> = topics
        .iter()
        .map(|topic| {
            let engine = Arc::clone(&engine);
            let store = Arc::clone(&store);
            let topic = topic.to_string();
            std::thread::spawn(move || {
                let snap = HealthSnapshot::default();
                store.resolve(&engine, &topic, &format!("what is {topic}"), &snap);
                store
                    .resolve(&engine, &topic, "tell me more about that", &snap)
                    .resolution
            })
        })
        .collect();

    for (handle, topic) in handles.into_iter().zip(topics) {
        let r = handle.join().unwrap();
        assert_eq!(r.topic, Some(TopicId::from(topic)));
    }
    assert_eq!(store.len(), topics.len());
}

#[test]
fn gibberish_sessions_are_not_retained() {
    let engine = engine();
    let store = SessionStore::new();
    for i in 0..10_000 {
        store.resolve(&engine, &format!("s{i}"), "asdfgh", &HealthSnapshot::default());
    }
    assert!(store.is_empty());

    let first = store.resolve(&engine, "s1", "what is bmi", &HealthSnapshot::default());
    assert!(first.started);
    assert_eq!(store.len(), 1);
}

#[test]
fn config_with_external_knowledge_base() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("kidney.toml"),
        r#"
[knowledge]
name = "Renal"

[[topics]]
id = "kidney"
keywords = ["kidney", "creatinine"]
definition = "Kidneys filter waste from blood."
diet_advice = "Drink water and limit salt."
recommended_tests = "Serum creatinine, eGFR."
"#,
    )
    .unwrap();
    let config_path = dir.path().join("silentrisk.toml");
    std::fs::write(
        &config_path,
        "knowledge_base = \"kidney.toml\"\ntyping_delay_ms = 0\n",
    )
    .unwrap();

    let config = ChatConfig::load(&config_path).unwrap();
    let engine = ResolutionEngine::from_config(&config).unwrap();
    assert_eq!(engine.knowledge().name(), "Renal");

    let mut state = ConversationState::new();
    let r = engine.resolve("what tests monitor my kidney", &mut state, &HealthSnapshot::default());
    assert_eq!(r.response.as_str(), "🩺 **Tests for Kidney:** Serum creatinine, eGFR.");

    // "eat" inside "creatinine" is a diet cue, and diet cues win.
    let r = engine.resolve("check my creatinine", &mut state, &HealthSnapshot::default());
    assert_eq!(r.intent, Some(Intent::DietAdvice));

    // No glucose topic, so the built-in override is off.
    let r = engine.resolve("my sugar score", &mut state, &glucose(150.0));
    assert_eq!(r.stage, StageKind::Fallback);
}

#[test]
fn configured_override_answers_from_snapshot() {
    let config: ChatConfig = toml::from_str(
        r#"
[[overrides]]
topic = "bp"
metric = "systolic_bp"
metric_cues = ["blood pressure"]
threshold = 130.0
"#,
    )
    .unwrap();
    let engine = ResolutionEngine::from_config(&config).unwrap();
    let snapshot = HealthSnapshot::from_json(r#"{"heart": {"trestbps": "128"}}"#).unwrap();

    let mut state = ConversationState::new();
    let r = engine.resolve("what's my blood pressure?", &mut state, &snapshot);
    assert_eq!(r.response.as_str(), "Your blood pressure (128) is normal.");
    assert_eq!(state.last_topic(), Some(&TopicId::from("bp")));
}

#[test]
fn bundled_knowledge_base_is_complete() {
    let kb = KnowledgeBase::bundled().unwrap();
    assert_eq!(kb.len(), 9);
    for topic in kb.topics() {
        assert!(!topic.keywords.is_empty());
        assert!(topic.keywords.iter().all(|k| *k == k.to_lowercase()));
    }
}

#[test]
fn snapshot_drives_recommendations() {
    let snapshot = HealthSnapshot::from_json(
        r#"{"diabetes": {"Glucose": 150, "bmi": 27}, "heart": {"chol": 190, "trestbps": 120}}"#,
    )
    .unwrap();
    let recs = recommend(&snapshot);
    assert_eq!(recs.category, RiskCategory::High);
    assert_eq!(
        recs.do_list,
        vec![
            "Prioritize complex carbs (oats, quinoa) over refined sugars.",
            "Take a 15-minute walk after meals to stabilize blood sugar.",
            "Incorporate strength training 2x a week.",
        ]
    );
    assert_eq!(recs.avoid_list, vec!["Sugary drinks and processed snacks."]);
}
