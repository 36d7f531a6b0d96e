//! Backend-assisted guard with a structured verdict

use agentgate_core::Context;
use agentgate_llm::{CompletionRequest, LLMRouter, Message, ResponseSchema};
use async_trait::async_trait;

use crate::{Decision, Guard, GuardError, GuardSubject, Result};

/// Shown when a request is not about banking
pub const OFF_TOPIC_NOTICE: &str =
    "Sorry, I can only handle bank-related queries like balance checks or fund transfers.";

/// Asks the inference backend whether a subject trips a policy
///
/// The backend must answer with `{"<tripwire_field>": bool, "reason": string}`.
/// `true` means the subject violates the policy and is denied.
pub struct ClassifierGuard {
    name: String,
    llm: LLMRouter,
    instructions: String,
    tripwire_field: String,
    notice: String,
}

impl ClassifierGuard {
    pub fn new(
        name: impl Into<String>,
        llm: LLMRouter,
        instructions: impl Into<String>,
        tripwire_field: impl Into<String>,
        notice: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            llm,
            instructions: instructions.into(),
            tripwire_field: tripwire_field.into(),
            notice: notice.into(),
        }
    }

    /// Input guard: denies queries unrelated to banking
    pub fn bank_relevance(llm: LLMRouter) -> Self {
        Self::new(
            "bank_relevance",
            llm,
            "You are the Guardrail Agent. Determine if the user query is related to banking \
             tasks (balance checks, transfers).\n\
             Set is_not_bank_related=true if it is not about banking, otherwise false.\n\
             Explain your verdict briefly in reason.",
            "is_not_bank_related",
            OFF_TOPIC_NOTICE,
        )
    }

    /// Output guard: denies replies that apologise
    pub fn no_apology(llm: LLMRouter) -> Self {
        Self::new(
            "no_apology",
            llm,
            "You are the Guardrail Agent. Validate the assistant's output before it is shown to the user.\n\
             Rules:\n\
             1) The text must not contain apology words such as 'sorry', 'apologize', or 'apologies'.\n\
             2) If found, set contains_banned_words=true and explain why.\n\
             3) Otherwise set contains_banned_words=false and explain why it is safe.",
            "contains_banned_words",
            "The support reply was withheld by the output policy. Please try rephrasing your question.",
        )
    }

    pub fn schema(&self) -> ResponseSchema {
        let mut properties = serde_json::Map::new();
        properties.insert(
            self.tripwire_field.clone(),
            serde_json::json!({"type": "boolean"}),
        );
        properties.insert("reason".to_string(), serde_json::json!({"type": "string"}));

        ResponseSchema::new(
            format!("{}_verdict", self.name),
            serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": [self.tripwire_field, "reason"],
                "additionalProperties": false
            }),
        )
    }

    /// Validate a raw backend verdict into a `Decision`
    pub fn parse_verdict(&self, raw: &serde_json::Value) -> Result<Decision> {
        let tripped = raw
            .get(&self.tripwire_field)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| GuardError::InvalidVerdict {
                message: format!("missing boolean field '{}'", self.tripwire_field),
            })?;

        let reason = raw
            .get("reason")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|r| !r.is_empty());

        Ok(if tripped {
            Decision::deny(reason.unwrap_or(&self.notice))
        } else {
            Decision::allow(reason.unwrap_or("verdict: allowed"))
        })
    }
}

#[async_trait]
impl<S: GuardSubject + Sync + ?Sized> Guard<S> for ClassifierGuard {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, subject: &S, _context: &Context) -> Result<Decision> {
        let request = CompletionRequest::new(vec![Message::user(subject.subject_text())])
            .with_system(self.instructions.clone())
            .with_response_schema(self.schema())
            .with_temperature(0.0);

        let response = self.llm.complete(request).await?;

        let verdict = response
            .json()
            .map_err(|e| GuardError::InvalidVerdict {
                message: e.to_string(),
            })
            .and_then(|raw| self.parse_verdict(&raw));

        match verdict {
            Ok(decision) => Ok(decision),
            // Fail closed: an unreadable verdict cannot vouch for the subject.
            Err(GuardError::InvalidVerdict { message }) => {
                tracing::warn!(guard = %self.name, %message, "unreadable verdict, denying");
                Ok(Decision::deny(self.notice.clone()))
            }
            Err(e) => Err(e),
        }
    }

    fn rejection_notice(&self) -> &str {
        &self.notice
    }
}
