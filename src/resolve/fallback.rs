//! Fallback answers when no topic is active.

use super::{Answer, AnswerStage, Response, StageKind, StageOutcome, Turn, Utterance};

pub const RISK_CUES: [&str; 2] = ["risk", "score"];

pub const RISK_EXPLANATION: &str =
    "Your scores are calculated using a Random Forest model trained on the Kaggle health dataset.";

pub const GENERIC_HELP: &str = "I can explain any input field (Glucose, BP, BMI, Liver Enzymes, Stress, etc.). Try asking: 'What foods lower BP?' or 'What is Bilirubin?'";

/// Risk/score questions get the model explanation, everything else the help text.
pub fn fallback_response(utterance: &Utterance) -> Response {
    if utterance.contains_any(&RISK_CUES) {
        Response::new(RISK_EXPLANATION)
    } else {
        Response::new(GENERIC_HELP)
    }
}

/// Last stage of the chain; always resolves.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fallback;

impl AnswerStage for Fallback {
    fn kind(&self) -> StageKind {
        StageKind::Fallback
    }

    fn answer(&self, turn: &Turn<'_>) -> StageOutcome<Answer> {
        StageOutcome::Resolved(Answer::new(fallback_response(turn.utterance), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_help_verbatim() {
        assert_eq!(fallback_response(&Utterance::new("asdfgh")).as_str(), GENERIC_HELP);
        assert_eq!(fallback_response(&Utterance::new("")).as_str(), GENERIC_HELP);
    }

    #[test]
    fn risk_questions() {
        assert_eq!(
            fallback_response(&Utterance::new("How is my RISK computed?")).as_str(),
            RISK_EXPLANATION
        );
        assert_eq!(
            fallback_response(&Utterance::new("what's a good score")).as_str(),
            RISK_EXPLANATION
        );
    }
}
