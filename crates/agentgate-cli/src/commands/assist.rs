//! Single-gate assistants: writer, tutor, country, mood, smart store

use std::sync::Arc;

use agentgate_agents::{
    country_gate, mood_gate, smart_store_gate, tutor_gate, writer_gate, RestCountriesClient,
    DEFAULT_WRITER_PROMPT,
};
use agentgate_llm::ProviderKind;

use super::{text_or_prompt, Session};
use crate::display;

pub async fn write(session: &Session, prompt: Option<String>) -> anyhow::Result<()> {
    let llm = session.backend(ProviderKind::OpenRouter)?;
    let gate = writer_gate(llm)?;
    let prompt = prompt.unwrap_or_else(|| DEFAULT_WRITER_PROMPT.to_string());

    display::section("Writer");
    display::labeled("Prompt", &prompt);
    session.run(&gate, &prompt, None).await?;
    Ok(())
}

pub async fn tutor(session: &Session, query: Option<String>) -> anyhow::Result<()> {
    let gate = tutor_gate(session.backend(ProviderKind::Gemini)?)?;
    let query = text_or_prompt(query, "Enter your question (Math or English related)")?;

    display::section("Tutor");
    let dispatch = session.run(&gate, &query, None).await?;
    if let Some(route) = &dispatch.route {
        display::info(&format!("answered by the {} expert", route.handler));
    }
    Ok(())
}

pub async fn country(session: &Session, query: Option<String>) -> anyhow::Result<()> {
    let gate = country_gate(
        session.backend(ProviderKind::Gemini)?,
        Arc::new(RestCountriesClient::new()?),
    )?;
    let query = text_or_prompt(query, "Do you want to know about any country")?;

    display::section("Country Info");
    session.run(&gate, &query, None).await?;
    Ok(())
}

pub async fn mood(session: &Session, message: Option<String>) -> anyhow::Result<()> {
    let gate = mood_gate(session.backend(ProviderKind::Gemini)?)?;
    let message = text_or_prompt(message, "How do you feel today? / Should I suggest anything to you?")?;

    display::section("Mood");
    session.run(&gate, &message, None).await?;
    Ok(())
}

pub async fn store(session: &Session, need: Option<String>) -> anyhow::Result<()> {
    let gate = smart_store_gate(session.backend(ProviderKind::Gemini)?)?;
    let need = text_or_prompt(need, "Describe your need or symptom")?;

    display::section("Smart Store");
    session.run(&gate, &need, None).await?;
    Ok(())
}
