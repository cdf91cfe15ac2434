//! Claim scoping: clarification and brief
//!
//! Clarification decides whether the conversation holds a checkable claim.
//! The brief writer turns the conversation into one first-person claim
//! statement. Both see the whole conversation, so a resubmission after a
//! clarifying question is judged with the earlier turns in view.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Boundary, FactCheckError};
use crate::llm::{complete_structured, LanguageModel, Validate};
use crate::research::{ClaimStatement, FactCheckPrompts};

const SCOPE_PREAMBLE: &str = "You are a careful fact-checking editor. Answer only with the JSON object requested.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Ordered user/assistant turns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message {
            role: Role::User,
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message {
            role: Role::Assistant,
            content: content.into(),
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_user(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

impl fmt::Display for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, message) in self.messages.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let speaker = match message.role {
                Role::User => "Human",
                Role::Assistant => "AI",
            };
            write!(f, "{}: {}", speaker, message.content)?;
        }
        Ok(())
    }
}

/// Whether text is punctuated as a question.
///
/// Only a trailing `?` counts. Statements opening with "WHO", "Will" or
/// "May" are ordinary claims; anything subtler is left to the model.
pub fn is_interrogative(text: &str) -> bool {
    text.trim_end().ends_with('?')
}

/// Result of the clarification step
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Clarification {
    pub need_clarification: bool,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub verification: String,
}

impl Clarification {
    pub fn ask(question: impl Into<String>) -> Self {
        Self {
            need_clarification: true,
            question: question.into(),
            verification: String::new(),
        }
    }

    pub fn proceed(verification: impl Into<String>) -> Self {
        Self {
            need_clarification: false,
            question: String::new(),
            verification: verification.into(),
        }
    }
}

impl Validate for Clarification {
    fn validate(&self) -> Result<(), String> {
        if self.need_clarification && self.question.trim().is_empty() {
            return Err("clarification requested without a question".to_string());
        }
        Ok(())
    }
}

#[async_trait]
pub trait Clarifier: Send + Sync {
    async fn clarify(&self, conversation: &Conversation) -> Result<Clarification, FactCheckError>;
}

#[async_trait]
pub trait BriefWriter: Send + Sync {
    async fn write_brief(&self, conversation: &Conversation) -> Result<ClaimStatement, FactCheckError>;
}

/// Model-backed clarifier with a question guard in front of it
pub struct ModelClarifier {
    model: Arc<dyn LanguageModel>,
}

impl ModelClarifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    fn question_for(input: &str) -> String {
        format!(
            "\"{}\" reads as a question. Please restate it as the exact claim you want checked, \
             in statement form, with any context you have (timeframe, location, people, organization).",
            input.trim()
        )
    }
}

#[async_trait]
impl Clarifier for ModelClarifier {
    async fn clarify(&self, conversation: &Conversation) -> Result<Clarification, FactCheckError> {
        if let Some(latest) = conversation.last_user().filter(|t| is_interrogative(t)) {
            debug!("Latest user turn is a question, asking for a statement");
            return Ok(Clarification::ask(Self::question_for(latest)));
        }

        complete_structured(
            self.model.as_ref(),
            Boundary::Clarification,
            SCOPE_PREAMBLE,
            &FactCheckPrompts::clarify(&conversation.to_string()),
        )
        .await
    }
}

#[derive(Debug, Deserialize)]
struct BriefOutput {
    #[serde(alias = "claim_statement")]
    claim: String,
}

impl Validate for BriefOutput {
    fn validate(&self) -> Result<(), String> {
        let claim = self.claim.trim();
        if claim.is_empty() {
            return Err("claim statement is empty".to_string());
        }
        if claim.ends_with('?') {
            return Err("claim statement is phrased as a question".to_string());
        }
        Ok(())
    }
}

/// Model-backed brief writer
pub struct ModelBriefWriter {
    model: Arc<dyn LanguageModel>,
}

impl ModelBriefWriter {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl BriefWriter for ModelBriefWriter {
    async fn write_brief(&self, conversation: &Conversation) -> Result<ClaimStatement, FactCheckError> {
        let output: BriefOutput = complete_structured(
            self.model.as_ref(),
            Boundary::Brief,
            SCOPE_PREAMBLE,
            &FactCheckPrompts::brief(&conversation.to_string()),
        )
        .await?;
        Ok(ClaimStatement::new(output.claim))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedModel {
        reply: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LanguageModel for FixedModel {
        async fn complete(&self, _p: &str, _q: &str) -> Result<String, FactCheckError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_string())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn model(reply: &'static str) -> Arc<FixedModel> {
        Arc::new(FixedModel {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_is_interrogative() {
        assert!(is_interrogative("Is the earth flat?"));
        assert!(is_interrogative("the moon is cheese?  "));
        assert!(!is_interrogative("Israel joined the UN in 1949."));
        assert!(!is_interrogative("Both WHO and CDC recommended mask mandates in 2020"));
        assert!(!is_interrogative("WHO declared COVID-19 a pandemic on 11 March 2020."));
        assert!(!is_interrogative("Will Smith slapped Chris Rock at the 2022 Oscars."));
        assert!(!is_interrogative("May 2020 was the hottest May on record."));
    }

    #[tokio::test]
    async fn test_claims_opening_with_question_words_reach_model() {
        let proceed = r#"{"need_clarification": false, "question": "", "verification": "Checking now."}"#;
        for claim in [
            "WHO declared COVID-19 a pandemic on 11 March 2020.",
            "Will Smith slapped Chris Rock at the 2022 Oscars.",
            "May 2020 was the hottest May on record.",
        ] {
            let m = model(proceed);
            let mut conv = Conversation::new();
            conv.push_user(claim);

            let clarification = ModelClarifier::new(m.clone()).clarify(&conv).await.unwrap();
            assert!(!clarification.need_clarification, "{} was treated as a question", claim);
            assert_eq!(m.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_conversation_rendering() {
        let mut conv = Conversation::new();
        conv.push_user("Is X true?");
        conv.push_assistant("Please restate.");
        conv.push_user("X is true in 2020.");
        assert_eq!(conv.to_string(), "Human: Is X true?\nAI: Please restate.\nHuman: X is true in 2020.");
        assert_eq!(conv.last_user(), Some("X is true in 2020."));
    }

    #[tokio::test]
    async fn test_question_short_circuits_without_model_call() {
        let m = model("unused");
        let mut conv = Conversation::new();
        conv.push_user("Is X true?");

        let clarification = ModelClarifier::new(m.clone()).clarify(&conv).await.unwrap();
        assert!(clarification.need_clarification);
        assert!(clarification.question.contains("Is X true?"));
        assert_eq!(m.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_statement_goes_to_model() {
        let m = model(r#"{"need_clarification": false, "question": "", "verification": "Checking now."}"#);
        let mut conv = Conversation::new();
        conv.push_user("Nigeria's inflation rate hit 30% in July 2025");

        let clarification = ModelClarifier::new(m.clone()).clarify(&conv).await.unwrap();
        assert!(!clarification.need_clarification);
        assert_eq!(clarification.verification, "Checking now.");
        assert_eq!(m.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clarification_without_question_rejected() {
        let m = model(r#"{"need_clarification": true, "question": ""}"#);
        let mut conv = Conversation::new();
        conv.push_user("Something happened");
        let err = ModelClarifier::new(m).clarify(&conv).await.unwrap_err();
        assert!(err.is_schema_violation());
    }

    #[tokio::test]
    async fn test_brief_accepts_alias_and_rejects_questions() {
        let mut conv = Conversation::new();
        conv.push_user("WHO recommended masks in 2020");

        let ok = ModelBriefWriter::new(model(r#"{"claim_statement": "I claim that WHO recommended masks in 2020."}"#))
            .write_brief(&conv)
            .await
            .unwrap();
        assert_eq!(ok.as_str(), "I claim that WHO recommended masks in 2020.");

        let err = ModelBriefWriter::new(model(r#"{"claim": "Did WHO recommend masks?"}"#))
            .write_brief(&conv)
            .await
            .unwrap_err();
        assert!(err.is_schema_violation());
    }
}
