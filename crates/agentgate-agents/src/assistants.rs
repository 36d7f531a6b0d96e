//! Single-purpose assistants built from responders

use std::sync::Arc;

use agentgate_core::Category;
use agentgate_kernel::{ClassifyingRoute, DispatchGate, GateBuildError, Route};
use agentgate_llm::LLMRouter;

use crate::classifier::LlmClassifier;
use crate::responder::Responder;

pub const DEFAULT_WRITER_PROMPT: &str =
    "Write a short essay about Pakistan current situation in simple English.";

pub fn writer_gate(llm: LLMRouter) -> Result<DispatchGate, GateBuildError> {
    DispatchGate::builder("writer")
        .handler(Responder::new(
            "writer",
            "Stories, poems and essays",
            "You are a helpful writer agent. Generate stories, poems, essay etc.",
            llm,
        ))
        .route(Route::fixed("writer"))
        .build()
}

pub fn smart_store_gate(llm: LLMRouter) -> Result<DispatchGate, GateBuildError> {
    DispatchGate::builder("smart_store")
        .handler(Responder::new(
            "smart_store",
            "Product suggestions for a need or symptom",
            "You are a helpful smart store agent. Suggest a product based on the user's need. \
             If the user says 'I have a headache', suggest a medicine and explain why.",
            llm,
        ))
        .route(Route::fixed("smart_store"))
        .build()
}

/// Math or English expert, chosen by the backend
pub fn tutor_gate(llm: LLMRouter) -> Result<DispatchGate, GateBuildError> {
    let classifier = LlmClassifier::new(
        "tutor",
        llm.clone(),
        "You are a smart distributor. Based on the user's input, answer 'math' for math \
         problems or 'english' for English-related queries.",
        [Category::MATH, Category::ENGLISH],
        Category::ENGLISH,
    );

    DispatchGate::builder("tutor")
        .handler(Responder::new(
            "math",
            "Math problems",
            "You are a helpful agent. Solve any math related problems.",
            llm.clone(),
        ))
        .handler(Responder::new(
            "english",
            "Summaries and English problems",
            "You are a helpful agent. Summarize any text and solve English related problems.",
            llm,
        ))
        .route(Route::classifying(
            ClassifyingRoute::new(Arc::new(classifier))
                .map(Category::MATH, "math")
                .map(Category::ENGLISH, "english")
                .fallback_to("english"),
        ))
        .build()
}

/// Mood reading or activity suggestion, chosen by the backend
pub fn mood_gate(llm: LLMRouter) -> Result<DispatchGate, GateBuildError> {
    let classifier = LlmClassifier::new(
        "mood",
        llm.clone(),
        "You triage messages about feelings. Answer 'mood' when the user describes how they \
         feel, or 'activity' when they ask for a suggestion of what to do.",
        [Category::MOOD, Category::ACTIVITY],
        Category::MOOD,
    );

    DispatchGate::builder("mood")
        .handler(Responder::new(
            "mood",
            "Reads the user's mood",
            "You are a helpful mood analyzer agent. Identify the user's mood from their message.",
            llm.clone(),
        ))
        .handler(Responder::new(
            "activity",
            "Suggests an activity for the user's mood",
            "You are a helpful activity agent. Suggest the best activity according to the user's mood.",
            llm,
        ))
        .route(Route::classifying(
            ClassifyingRoute::new(Arc::new(classifier))
                .map(Category::MOOD, "mood")
                .map(Category::ACTIVITY, "activity")
                .fallback_to("mood"),
        ))
        .build()
}
