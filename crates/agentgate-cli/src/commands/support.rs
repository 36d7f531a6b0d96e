//! Console support desk

use agentgate_agents::support_gate;
use agentgate_core::{Context, Identity, Tier};
use agentgate_llm::ProviderKind;

use super::{text_or_prompt, Session};
use crate::display;

pub async fn run(
    session: &Session,
    name: Option<String>,
    premium: Option<bool>,
    query: Option<String>,
) -> anyhow::Result<()> {
    let gate = support_gate(session.backend(ProviderKind::Gemini)?)?;
    display::section("Console-Based Support Agent System");

    let name = text_or_prompt(name, "Enter your name")?;
    let tier = match premium {
        Some(true) => Tier::Premium,
        Some(false) => Tier::Standard,
        None => Tier::from_answer(&text_or_prompt(None, "Are you a premium user? (yes/no)")?),
    };
    let query = text_or_prompt(query, "Enter your query")?;

    let context = Context::new()
        .with_identity(Identity::new(name))
        .with_tier(tier);

    let dispatch = session.run(&gate, &query, Some(context)).await?;

    if let Some(category) = dispatch.context.category() {
        display::info(&format!("issue type: {}", category));
    }
    Ok(())
}
