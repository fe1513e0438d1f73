//! Reply interpreter
//!
//! Turns a talent's reply thread into a structured interpretation through the
//! completion client. The provider's answer is validated strictly: it must be
//! one JSON object with exactly `status`, `score`, `score_reason` and
//! `current_location`. Anything else is a contract error and the thread is
//! retried later. Unknown status values are not errors; they map to `pending`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::app::interpretation_prompt::{build_prompt, SYSTEM_PROMPT};
use crate::app::outreach_config::LOCATION_NOT_MENTIONED;
use crate::domain::entities::{InvitationId, InvitationStatus};
use crate::domain::ports::CompletionClient;
use crate::error::LlmError;

/// The reply messages of one invitation, oldest first
#[derive(Debug, Clone)]
pub struct ReplyThread {
    pub invitation_id: InvitationId,
    pub messages: Vec<String>,
}

/// A validated interpretation of a reply thread
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpretation {
    pub status: InvitationStatus,
    /// Status exactly as the provider wrote it
    pub raw_status: String,
    pub score: i32,
    pub score_reason: String,
    /// `None` when the thread mentions no location
    pub current_location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawInterpretation {
    status: String,
    score: i32,
    score_reason: String,
    current_location: String,
}

/// Validate a provider response against the interpretation contract
pub fn parse_interpretation(raw: &str) -> Result<Interpretation, LlmError> {
    let parsed: RawInterpretation = serde_json::from_str(raw.trim())
        .map_err(|e| LlmError::Contract(format!("{}: {}", e, truncate(raw, 200))))?;

    let status = match parsed.status.parse::<InvitationStatus>() {
        Ok(status) => status,
        Err(_) => {
            tracing::warn!(
                status = %parsed.status,
                "Interpreter returned an unsupported status, treating as pending"
            );
            InvitationStatus::Pending
        }
    };

    let score_reason = parsed.score_reason.trim().to_string();
    if score_reason.is_empty() {
        return Err(LlmError::Contract("score_reason is empty".to_string()));
    }

    let location = parsed.current_location.trim();
    let current_location = (!location.is_empty()
        && !location.eq_ignore_ascii_case(LOCATION_NOT_MENTIONED))
    .then(|| location.to_string());

    Ok(Interpretation {
        status,
        raw_status: parsed.status,
        score: parsed.score,
        score_reason,
        current_location,
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub struct ReplyInterpreter<LC>
where
    LC: CompletionClient,
{
    llm: Arc<LC>,
}

impl<LC> ReplyInterpreter<LC>
where
    LC: CompletionClient,
{
    pub fn new(llm: Arc<LC>) -> Self {
        Self { llm }
    }

    /// Interpret a whole thread in one provider call
    pub async fn interpret(&self, thread: &ReplyThread) -> Result<Interpretation, LlmError> {
        if thread.messages.is_empty() {
            return Err(LlmError::Contract(format!(
                "Invitation {} has no reply to interpret",
                thread.invitation_id
            )));
        }

        let prompt = build_prompt(&thread.messages);
        let raw = self.llm.complete_json(SYSTEM_PROMPT, &prompt).await?;
        let interpretation = parse_interpretation(&raw)?;

        tracing::debug!(
            invitation_id = %thread.invitation_id,
            status = %interpretation.status,
            score = interpretation.score,
            score_reason = %interpretation.score_reason,
            "Reply thread interpreted"
        );

        Ok(interpretation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedCompletionClient;

    #[test]
    fn parses_a_valid_response() {
        let raw = r#"{"status":"confirmed","score":5,"score_reason":"enthusiastic_yes","current_location":"Lisbon"}"#;
        let parsed = parse_interpretation(raw).unwrap();

        assert_eq!(parsed.status, InvitationStatus::Confirmed);
        assert_eq!(parsed.score, 5);
        assert_eq!(parsed.score_reason, "enthusiastic_yes");
        assert_eq!(parsed.current_location.as_deref(), Some("Lisbon"));
    }

    #[test]
    fn default_location_means_not_mentioned() {
        let raw = r#"{"status":"maybe","score":0,"score_reason":"neutral_reply","current_location":"Default"}"#;
        assert_eq!(parse_interpretation(raw).unwrap().current_location, None);

        let blank = r#"{"status":"maybe","score":0,"score_reason":"neutral_reply","current_location":" "}"#;
        assert_eq!(parse_interpretation(blank).unwrap().current_location, None);
    }

    #[test]
    fn out_of_vocabulary_status_maps_to_pending() {
        for status in ["optout", "interested", "moved"] {
            let raw = format!(
                r#"{{"status":"{}","score":1,"score_reason":"x","current_location":"default"}}"#,
                status
            );
            let parsed = parse_interpretation(&raw).unwrap();
            assert_eq!(parsed.status, InvitationStatus::Pending);
            assert_eq!(parsed.raw_status, status);
        }
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let raw = "\n  {\"status\":\"declined\",\"score\":-2,\"score_reason\":\"busy\",\"current_location\":\"default\"}\n";
        assert_eq!(
            parse_interpretation(raw).unwrap().status,
            InvitationStatus::Declined
        );
    }

    #[test]
    fn extra_prose_is_a_contract_violation() {
        let raw = r#"Sure! {"status":"confirmed","score":5,"score_reason":"yes","current_location":"default"}"#;
        assert!(matches!(parse_interpretation(raw), Err(LlmError::Contract(_))));

        let trailing = r#"{"status":"confirmed","score":5,"score_reason":"yes","current_location":"default"} thanks"#;
        assert!(matches!(
            parse_interpretation(trailing),
            Err(LlmError::Contract(_))
        ));
    }

    #[test]
    fn missing_or_extra_fields_are_contract_violations() {
        let missing = r#"{"status":"confirmed","score":5,"score_reason":"yes"}"#;
        assert!(matches!(
            parse_interpretation(missing),
            Err(LlmError::Contract(_))
        ));

        let extra = r#"{"status":"confirmed","score":5,"score_reason":"yes","current_location":"default","mood":"happy"}"#;
        assert!(matches!(parse_interpretation(extra), Err(LlmError::Contract(_))));
    }

    #[test]
    fn non_integer_score_is_a_contract_violation() {
        let raw = r#"{"status":"confirmed","score":"high","score_reason":"yes","current_location":"default"}"#;
        assert!(parse_interpretation(raw).is_err());

        let fractional = r#"{"status":"confirmed","score":2.5,"score_reason":"yes","current_location":"default"}"#;
        assert!(parse_interpretation(fractional).is_err());
    }

    #[test]
    fn non_json_is_a_contract_violation() {
        assert!(matches!(
            parse_interpretation("I think they said yes"),
            Err(LlmError::Contract(_))
        ));
        assert!(matches!(parse_interpretation(""), Err(LlmError::Contract(_))));
    }

    #[tokio::test]
    async fn interpret_sends_the_whole_thread() {
        let llm = Arc::new(ScriptedCompletionClient::new().default_response(
            r#"{"status":"maybe","score":1,"score_reason":"asks_details","current_location":"default"}"#,
        ));
        let interpreter = ReplyInterpreter::new(llm.clone());
        let thread = ReplyThread {
            invitation_id: InvitationId(5),
            messages: vec!["what time?".to_string(), "and where?".to_string()],
        };

        let result = interpreter.interpret(&thread).await.unwrap();

        assert_eq!(result.status, InvitationStatus::Maybe);
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("what time?\n\nand where?"));
    }

    #[tokio::test]
    async fn provider_failure_is_propagated() {
        let llm = Arc::new(ScriptedCompletionClient::failing());
        let interpreter = ReplyInterpreter::new(llm);
        let thread = ReplyThread {
            invitation_id: InvitationId(5),
            messages: vec!["yes".to_string()],
        };

        assert!(interpreter.interpret(&thread).await.is_err());
    }

    #[tokio::test]
    async fn empty_thread_is_not_sent() {
        let llm = Arc::new(ScriptedCompletionClient::new());
        let interpreter = ReplyInterpreter::new(llm.clone());
        let thread = ReplyThread {
            invitation_id: InvitationId(5),
            messages: vec![],
        };

        assert!(interpreter.interpret(&thread).await.is_err());
        assert!(llm.prompts().is_empty());
    }
}
