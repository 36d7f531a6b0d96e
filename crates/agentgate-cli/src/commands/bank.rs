//! Bank assistant scenarios

use agentgate_agents::bank::{DEMO_PIN, DEMO_USER};
use agentgate_agents::{balance_gate, bank_gate, transfer_gate};
use agentgate_core::{Context, Identity};
use agentgate_guard::OFF_TOPIC_NOTICE;
use agentgate_kernel::GuardStage;
use agentgate_ledger::AccountStore;
use agentgate_llm::ProviderKind;

use super::Session;
use crate::display;

const BALANCE_PROMPT: &str = "What is my balance? This is my account number 9876543";
const TRANSFER_PROMPT: &str = "Transfer $1000 from account 9876543 to account 3456789.";
const OFF_TOPIC_PROMPT: &str = "What's the weather today?";

pub async fn run(session: &Session) -> anyhow::Result<()> {
    let llm = session.backend(ProviderKind::Gemini)?;
    let store = AccountStore::demo();
    let user = Context::new().with_identity(Identity::new(DEMO_USER).with_pin(DEMO_PIN));

    display::section("Balance Inquiry");
    let gate = balance_gate(llm.clone(), store.clone())?;
    session.run(&gate, BALANCE_PROMPT, Some(user.clone())).await?;

    display::section("Fund Transfer");
    let gate = transfer_gate(llm.clone(), store.clone())?;
    session.run(&gate, TRANSFER_PROMPT, Some(user.clone())).await?;

    display::section("Accounts After Transfer");
    display::accounts(&store.snapshot().await);

    display::section("Invalid Input");
    let gate = bank_gate(llm, store)?;
    match gate
        .dispatch(agentgate_core::Request::new(OFF_TOPIC_PROMPT), Some(user))
        .await
    {
        Ok(dispatch) => {
            if session.show_trace {
                display::trace(&dispatch);
            }
            match dispatch.outcome.rejection() {
                Some(rejection) if rejection.stage == GuardStage::Input => {
                    tracing::info!(guard = %rejection.guard, explanation = %rejection.explanation, "off-topic request rejected");
                    println!();
                    println!("{}", OFF_TOPIC_NOTICE);
                    println!();
                }
                _ => display::outcome(&dispatch.outcome),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "off-topic dispatch failed");
            println!();
            println!("{}", OFF_TOPIC_NOTICE);
            println!();
        }
    }

    Ok(())
}
