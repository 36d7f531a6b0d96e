//! Display utilities for the CLI

use agentgate_kernel::{Dispatch, GuardStage, Outcome};
use agentgate_ledger::Account;
use colored::*;

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", "━".repeat(60).bright_black());
    println!(" {}", title.bright_white().bold());
    println!("{}", "━".repeat(60).bright_black());
}

/// Print an error message
pub fn error(message: &str) {
    println!("  {} {}", "✗".bright_red(), message.bright_red());
}

/// Print an info message
pub fn info(message: &str) {
    println!("  {} {}", "→".bright_blue(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("  {} {}", "⚠".yellow(), message.yellow());
}

/// Print a labeled value
pub fn labeled(label: &str, value: &str) {
    println!("  {}: {}", label.bright_white(), value.bright_cyan());
}

/// Print the caller-facing result of a dispatch
pub fn outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Reply(reply) => {
            println!();
            println!("{}", reply.text);
            println!();
        }
        Outcome::Rejected(rejection) => {
            let stage = match rejection.stage {
                GuardStage::Input => "request",
                GuardStage::Output => "reply",
            };
            warning(&format!("{} rejected by '{}'", stage, rejection.guard));
            println!();
            println!("{}", rejection.explanation);
            println!();
        }
    }
}

/// Dump the dispatch trace as pretty JSON
pub fn trace(dispatch: &Dispatch) {
    match serde_json::to_string_pretty(&dispatch.trace) {
        Ok(json) => println!("{}", json.bright_black()),
        Err(e) => error(&format!("could not render trace: {}", e)),
    }
}

pub fn accounts(accounts: &[Account]) {
    println!("  {:<10} {:<10} {:>18}", "Account".bright_white(), "Name".bright_white(), "Balance".bright_white());
    println!("  {}", "─".repeat(40).bright_black());
    for account in accounts {
        println!(
            "  {:<10} {:<10} {:>18}",
            account.number.as_str(),
            account.name,
            format!("${:.2}", account.balance).bright_cyan()
        );
    }
}
