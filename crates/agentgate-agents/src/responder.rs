//! Plain text responder

use agentgate_core::{Context, Reply, Request};
use agentgate_kernel::{Handler, HandlerError};
use agentgate_llm::{CompletionRequest, LLMRouter, Message};
use async_trait::async_trait;

/// Handler that answers with a single completion
pub struct Responder {
    name: String,
    description: String,
    instructions: String,
    llm: LLMRouter,
}

impl Responder {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        instructions: impl Into<String>,
        llm: LLMRouter,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instructions: instructions.into(),
            llm,
        }
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }
}

#[async_trait]
impl Handler for Responder {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, request: &Request, _context: &Context) -> Result<Reply, HandlerError> {
        let completion = CompletionRequest::new(vec![Message::user(request.message())])
            .with_system(self.instructions.clone());
        let response = self.llm.complete(completion).await?;
        Ok(Reply::text(&self.name, response.content))
    }
}
