//! Support desk: keyword triage to general, billing or technical

use std::sync::Arc;

use agentgate_core::{Category, Context};
use agentgate_guard::ClassifierGuard;
use agentgate_kernel::{
    ClassifyingRoute, DispatchGate, Enablement, GateBuildError, KeywordClassifier, Route,
};
use agentgate_llm::LLMRouter;
use async_trait::async_trait;

use crate::tools::{missing_arg, string_arg, Tool, ToolBox, ToolHandler};

/// `refund`/`bill` is billing; restarts and failures are technical
pub fn triage() -> KeywordClassifier {
    KeywordClassifier::new("triage", Category::general())
        .rule(Category::BILLING, ["refund", "bill"])
        .rule(
            Category::TECHNICAL,
            ["restart", "not working", "error", "issue", "problem"],
        )
}

pub struct GeneralInfoTool;

#[async_trait]
impl Tool for GeneralInfoTool {
    fn name(&self) -> &str {
        "general_info"
    }

    fn description(&self) -> &str {
        "General lookup for questions that need background information."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {"query": {"type": "string"}},
            "required": ["query"]
        })
    }

    async fn call(&self, args: &serde_json::Value, _context: &Context) -> String {
        match string_arg(args, "query") {
            Some(query) => format!(
                "I found some useful general information about '{}'. It may help you with your question.",
                query
            ),
            None => missing_arg("query"),
        }
    }
}

pub struct RefundTool;

#[async_trait]
impl Tool for RefundTool {
    fn name(&self) -> &str {
        "refund"
    }

    fn description(&self) -> &str {
        "Process a refund for the current customer. Premium customers only."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn call(&self, _args: &serde_json::Value, context: &Context) -> String {
        let name = context.name().unwrap_or("customer");
        if !context.tier.is_premium() {
            return format!("Refunds are only available for premium users, {}.", name);
        }
        format!("Refund successfully processed for {}.", name)
    }
}

pub struct RestartServicesTool;

#[async_trait]
impl Tool for RestartServicesTool {
    fn name(&self) -> &str {
        "restart_services"
    }

    fn description(&self) -> &str {
        "Restart a named service."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {"service": {"type": "string", "description": "Service to restart"}},
            "required": ["service"]
        })
    }

    async fn call(&self, args: &serde_json::Value, _context: &Context) -> String {
        match string_arg(args, "service") {
            Some(service) => format!("Your {} is restarting", service),
            None => missing_arg("service"),
        }
    }
}

pub fn support_gate(llm: LLMRouter) -> Result<DispatchGate, GateBuildError> {
    let general = ToolHandler::new(
        "general",
        "General questions",
        "You are a concise and helpful general-support agent.\n\
         Answer general questions clearly. Use the general_info tool when it adds value.",
        llm.clone(),
        ToolBox::new().with(GeneralInfoTool),
    );

    let billing = ToolHandler::new(
        "billing",
        "Billing and refunds",
        "You are the billing specialist. Handle billing and refunds only.\n\
         If the user mentions a refund, ALWAYS call the refund tool.",
        llm.clone(),
        ToolBox::new().with_gated(RefundTool, Enablement::premium_only()),
    );

    let technical = ToolHandler::new(
        "technical",
        "Restarts, errors and other technical problems",
        "You are the technical-support specialist.\n\
         If the user asks to restart something or reports errors or problems, use the \
         restart_services tool.",
        llm.clone(),
        ToolBox::new().with_gated(
            RestartServicesTool,
            Enablement::category_is(Category::TECHNICAL),
        ),
    );

    DispatchGate::builder("support")
        .output_guard(ClassifierGuard::no_apology(llm))
        .handler(general)
        .gated_handler(billing, Enablement::premium_only())
        .gated_handler(technical, Enablement::category_is(Category::TECHNICAL))
        .route(Route::classifying(
            ClassifyingRoute::new(Arc::new(triage()))
                .map(Category::GENERAL, "general")
                .map(Category::BILLING, "billing")
                .map(Category::TECHNICAL, "technical")
                .fallback_to("general"),
        ))
        .build()
}
