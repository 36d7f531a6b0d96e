//! Bank assistant: balance and transfer tools over the account store

use std::str::FromStr;

use agentgate_core::{Category, Context};
use agentgate_guard::{ClassifierGuard, InjectionGuard, KeywordGuard};
use agentgate_kernel::{
    ClassifyingRoute, DispatchGate, DispatchGateBuilder, Enablement, GateBuildError, Route,
};
use agentgate_ledger::{AccountNumber, AccountStore, TransferError};
use agentgate_llm::LLMRouter;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::classifier::LlmClassifier;
use crate::tools::{missing_arg, string_arg, Tool, ToolBox, ToolHandler};

/// Demo credentials that unlock the bank tools
pub const DEMO_USER: &str = "Arisha";
pub const DEMO_PIN: u32 = 1234;

const MAX_AMOUNT_SCALE: usize = 28;

pub fn demo_enablement() -> Enablement {
    Enablement::authenticated(DEMO_USER, DEMO_PIN)
}

pub struct CheckBalanceTool {
    store: AccountStore,
}

impl CheckBalanceTool {
    pub fn new(store: AccountStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CheckBalanceTool {
    fn name(&self) -> &str {
        "check_balance"
    }

    fn description(&self) -> &str {
        "Check the balance for a given account number."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "account_number": {"type": "string", "description": "7-digit account number"}
            },
            "required": ["account_number"]
        })
    }

    async fn call(&self, args: &serde_json::Value, _context: &Context) -> String {
        let Some(raw) = string_arg(args, "account_number") else {
            return missing_arg("account_number");
        };
        let Ok(number) = AccountNumber::parse(&raw) else {
            return "Invalid account number. It must be a 7-digit number.".to_string();
        };
        match self.store.balance(&number).await {
            Ok(balance) => format!("Your account balance is ${:.2}.", balance),
            Err(_) => "Account not found.".to_string(),
        }
    }
}

pub struct TransferFundsTool {
    store: AccountStore,
}

impl TransferFundsTool {
    pub fn new(store: AccountStore) -> Self {
        Self { store }
    }
}

/// Decimal amount; `None` when the text is not numeric or needs more
/// precision than `Decimal` holds
fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if let Some((_, fraction)) = raw.split_once('.') {
        let digits = fraction
            .split(|c: char| c == 'e' || c == 'E')
            .next()
            .unwrap_or_default()
            .trim_end_matches('0');
        if digits.len() > MAX_AMOUNT_SCALE {
            return None;
        }
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

#[async_trait]
impl Tool for TransferFundsTool {
    fn name(&self) -> &str {
        "transfer_funds"
    }

    fn description(&self) -> &str {
        "Handle fund transfers between accounts."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "from_account": {"type": "string", "description": "7-digit source account number"},
                "to_account": {"type": "string", "description": "7-digit destination account number"},
                "amount": {"type": "string", "description": "Amount to transfer, e.g. 1000"}
            },
            "required": ["from_account", "to_account", "amount"]
        })
    }

    async fn call(&self, args: &serde_json::Value, _context: &Context) -> String {
        let (Some(from), Some(to)) = (string_arg(args, "from_account"), string_arg(args, "to_account")) else {
            return "Invalid account number(s). Must be 7-digit numbers.".to_string();
        };
        let (Ok(from), Ok(to)) = (AccountNumber::parse(&from), AccountNumber::parse(&to)) else {
            return "Invalid account number(s). Must be 7-digit numbers.".to_string();
        };
        let Some(raw_amount) = string_arg(args, "amount") else {
            return missing_arg("amount");
        };
        let Some(amount) = parse_amount(&raw_amount) else {
            return "Invalid amount. Please enter a numeric value.".to_string();
        };

        match self.store.apply_transfer(&from, &to, amount).await {
            Ok(receipt) => format!(
                "Successfully transferred ${:.2} from account {} to account {}.",
                receipt.amount, receipt.from, receipt.to
            ),
            Err(TransferError::InvalidAmount { .. }) => "Amount must be positive.".to_string(),
            Err(TransferError::SameAccount { .. }) => {
                "Cannot transfer funds to the same account.".to_string()
            }
            Err(TransferError::AccountNotFound { .. }) => "One or both accounts not found.".to_string(),
            Err(TransferError::InsufficientFunds { .. }) => {
                "Insufficient funds for the transfer.".to_string()
            }
        }
    }
}

fn balance_handler(llm: LLMRouter, store: AccountStore) -> ToolHandler {
    ToolHandler::new(
        "balance",
        "Balance inquiries for a 7-digit account number",
        "Handle customer requests to check their account balance. Ensure user authentication \
         and valid account numbers.",
        llm,
        ToolBox::new().with_gated(CheckBalanceTool::new(store), demo_enablement()),
    )
}

fn transfer_handler(llm: LLMRouter, store: AccountStore) -> ToolHandler {
    ToolHandler::new(
        "transfer",
        "Fund transfers between two 7-digit accounts",
        "Handle customer requests to transfer funds. Validate account numbers, amounts, and \
         ensure sufficient funds.",
        llm,
        ToolBox::new().with_gated(TransferFundsTool::new(store), demo_enablement()),
    )
}

/// Injection check, bank relevance check, sensitive data filter
fn guarded(name: &str, llm: &LLMRouter) -> DispatchGateBuilder {
    DispatchGate::builder(name)
        .input_guard(InjectionGuard::new())
        .input_guard(ClassifierGuard::bank_relevance(llm.clone()))
        .output_guard(KeywordGuard::sensitive_data())
}

pub fn balance_gate(llm: LLMRouter, store: AccountStore) -> Result<DispatchGate, GateBuildError> {
    guarded("balance", &llm)
        .gated_handler(balance_handler(llm, store), demo_enablement())
        .route(Route::fixed("balance"))
        .build()
}

pub fn transfer_gate(llm: LLMRouter, store: AccountStore) -> Result<DispatchGate, GateBuildError> {
    guarded("transfer", &llm)
        .gated_handler(transfer_handler(llm, store), demo_enablement())
        .route(Route::fixed("transfer"))
        .build()
}

/// Routes to balance or transfer; anything else is a routing failure
pub fn bank_gate(llm: LLMRouter, store: AccountStore) -> Result<DispatchGate, GateBuildError> {
    let classifier = LlmClassifier::new(
        "bank",
        llm.clone(),
        "Route customer queries to the appropriate desk. Answer 'balance' for balance \
         inquiries and 'transfer' for fund transfers.",
        [Category::BALANCE, Category::TRANSFER],
        Category::GENERAL,
    );

    guarded("bank", &llm)
        .gated_handler(balance_handler(llm.clone(), store.clone()), demo_enablement())
        .gated_handler(transfer_handler(llm, store), demo_enablement())
        .route(Route::classifying(
            ClassifyingRoute::new(Arc::new(classifier))
                .map(Category::BALANCE, "balance")
                .map(Category::TRANSFER, "transfer"),
        ))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn arisha() -> Context {
        Context::new().with_identity(agentgate_core::Identity::new(DEMO_USER).with_pin(DEMO_PIN))
    }

    #[tokio::test]
    async fn test_check_balance_messages() {
        let tool = CheckBalanceTool::new(AccountStore::demo());
        let ctx = arisha();

        let ok = tool.call(&serde_json::json!({"account_number": "9876543"}), &ctx).await;
        assert_eq!(ok, "Your account balance is $100000000.00.");

        let ok = tool.call(&serde_json::json!({"account_number": "3456789"}), &ctx).await;
        assert_eq!(ok, "Your account balance is $5000.00.");

        let bad = tool.call(&serde_json::json!({"account_number": "12345"}), &ctx).await;
        assert_eq!(bad, "Invalid account number. It must be a 7-digit number.");

        let missing = tool.call(&serde_json::json!({"account_number": "1111111"}), &ctx).await;
        assert_eq!(missing, "Account not found.");
    }

    #[tokio::test]
    async fn test_transfer_messages() {
        let store = AccountStore::demo();
        let tool = TransferFundsTool::new(store.clone());
        let ctx = arisha();

        let ok = tool
            .call(
                &serde_json::json!({"from_account": "9876543", "to_account": "3456789", "amount": "1000"}),
                &ctx,
            )
            .await;
        assert_eq!(ok, "Successfully transferred $1000.00 from account 9876543 to account 3456789.");
        assert_eq!(
            store.balance(&AccountNumber::parse("3456789").unwrap()).await.unwrap(),
            dec!(6000.00)
        );

        let cases = [
            (serde_json::json!({"from_account": "98765", "to_account": "3456789", "amount": "1"}),
             "Invalid account number(s). Must be 7-digit numbers."),
            (serde_json::json!({"from_account": "9876543", "to_account": "3456789", "amount": "lots"}),
             "Invalid amount. Please enter a numeric value."),
            (serde_json::json!({"from_account": "9876543", "to_account": "3456789", "amount": "-5"}),
             "Amount must be positive."),
            (serde_json::json!({"from_account": "9876543", "to_account": "1111111", "amount": "5"}),
             "One or both accounts not found."),
            (serde_json::json!({"from_account": "3456789", "to_account": "9876543", "amount": 999999}),
             "Insufficient funds for the transfer."),
        ];
        let settled = store.snapshot().await;
        for (args, expected) in cases {
            assert_eq!(tool.call(&args, &ctx).await, expected);
            assert_eq!(store.snapshot().await, settled, "refused transfer moved funds: {}", expected);
        }
        assert_eq!(
            store.balance(&AccountNumber::parse("9876543").unwrap()).await.unwrap(),
            dec!(99999000)
        );

        assert_eq!(store.history().await.len(), 1);
    }

    #[test]
    fn test_parse_amount_refuses_lossy_input() {
        assert_eq!(parse_amount("1000"), Some(dec!(1000)));
        assert_eq!(parse_amount(" 12.50 "), Some(dec!(12.50)));
        assert_eq!(parse_amount("1e3"), Some(dec!(1000)));
        assert_eq!(parse_amount("0.1000000000000000000000000000000"), Some(dec!(0.1)));
        assert_eq!(parse_amount("0.0000000000000000000000000000001"), None);
        assert_eq!(parse_amount("lots"), None);
    }

    #[tokio::test]
    async fn test_transfer_too_precise_amount_is_invalid() {
        let store = AccountStore::demo();
        let tool = TransferFundsTool::new(store.clone());
        let args = serde_json::json!({
            "from_account": "9876543",
            "to_account": "3456789",
            "amount": "0.0000000000000000000000000000001"
        });

        assert_eq!(
            tool.call(&args, &arisha()).await,
            "Invalid amount. Please enter a numeric value."
        );
        assert!(store.history().await.is_empty());
    }

    #[test]
    fn test_tools_hidden_from_strangers() {
        let tools = ToolBox::new().with_gated(CheckBalanceTool::new(AccountStore::demo()), demo_enablement());
        assert_eq!(tools.specs(&arisha()).len(), 1);
        assert!(tools.specs(&Context::new()).is_empty());

        let wrong_pin = Context::new().with_identity(agentgate_core::Identity::new(DEMO_USER).with_pin(1111));
        assert!(tools.specs(&wrong_pin).is_empty());
    }
}
