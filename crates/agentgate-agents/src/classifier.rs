//! Backend-assisted request classification

use agentgate_core::{Category, Context, Request};
use agentgate_kernel::{Classifier, ClassifyError};
use agentgate_llm::{CompletionRequest, LLMRouter, Message, ResponseSchema};
use async_trait::async_trait;

/// Asks the backend to pick one of a fixed list of categories
///
/// Answers outside the list, and answers that are not JSON, fall back to the
/// default category. Only backend failures are errors.
pub struct LlmClassifier {
    name: String,
    llm: LLMRouter,
    instructions: String,
    categories: Vec<Category>,
    default: Category,
}

impl LlmClassifier {
    pub fn new(
        name: impl Into<String>,
        llm: LLMRouter,
        instructions: impl Into<String>,
        categories: impl IntoIterator<Item = impl Into<Category>>,
        default: impl Into<Category>,
    ) -> Self {
        Self {
            name: name.into(),
            llm,
            instructions: instructions.into(),
            categories: categories.into_iter().map(Into::into).collect(),
            default: default.into(),
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    fn schema(&self) -> ResponseSchema {
        let names: Vec<&str> = self.categories.iter().map(|c| c.as_str()).collect();
        ResponseSchema::new(
            format!("{}_category", self.name),
            serde_json::json!({
                "type": "object",
                "properties": {
                    "category": {"type": "string", "enum": names}
                },
                "required": ["category"],
                "additionalProperties": false
            }),
        )
    }

    /// Map a raw answer onto a known category
    pub fn resolve(&self, answer: &str) -> Category {
        let candidate = Category::new(answer);
        if self.categories.contains(&candidate) {
            candidate
        } else {
            tracing::warn!(classifier = %self.name, answer, default = %self.default, "unknown category, using default");
            self.default.clone()
        }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(&self, request: &Request, _context: &Context) -> Result<Category, ClassifyError> {
        let completion = CompletionRequest::new(vec![Message::user(request.message())])
            .with_system(self.instructions.clone())
            .with_response_schema(self.schema())
            .with_temperature(0.0);
        let response = self.llm.complete(completion).await?;

        let answer = response
            .json()
            .ok()
            .and_then(|v| v.get("category").and_then(|c| c.as_str()).map(str::to_string))
            .unwrap_or_else(|| response.content.clone());

        Ok(self.resolve(&answer))
    }
}
