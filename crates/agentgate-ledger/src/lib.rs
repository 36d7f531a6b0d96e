//! agentgate Ledger - in-memory account store
//!
//! Accounts are keyed by a 7-digit account number and hold a decimal balance.
//!
//! # Invariants
//!
//! 1. No negative balances
//! 2. A transfer either moves the full amount or changes nothing
//! 3. Both sides of a transfer are checked and updated under one write lock

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors that can occur in account store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid account number: {input}")]
    InvalidAccountNumber { input: String },

    #[error("Account not found: {account}")]
    AccountNotFound { account: String },

    #[error("Account already exists: {account}")]
    AccountExists { account: String },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },
}

/// Reasons a transfer is refused; nothing changes when one is returned
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: Decimal },

    #[error("Cannot transfer from an account to itself: {account}")]
    SameAccount { account: AccountNumber },

    #[error("Account not found: {account}")]
    AccountNotFound { account: AccountNumber },

    #[error("Insufficient funds: have {available}, need {required}")]
    InsufficientFunds { available: Decimal, required: Decimal },
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Seven ASCII digits
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountNumber(String);

impl AccountNumber {
    pub fn parse(input: &str) -> Result<Self> {
        if input.len() == 7 && input.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(input.to_string()))
        } else {
            Err(LedgerError::InvalidAccountNumber {
                input: input.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountNumber {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub number: AccountNumber,
    pub name: String,
    pub balance: Decimal,
}

impl Account {
    pub fn new(number: AccountNumber, name: impl Into<String>, balance: Decimal) -> Self {
        Self {
            number,
            name: name.into(),
            balance,
        }
    }
}

/// Record of a completed transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub receipt_id: String,
    pub from: AccountNumber,
    pub to: AccountNumber,
    pub amount: Decimal,
    pub from_balance_after: Decimal,
    pub to_balance_after: Decimal,
    pub executed_at: DateTime<Utc>,
}

#[derive(Default)]
struct StoreState {
    accounts: BTreeMap<AccountNumber, Account>,
    history: Vec<TransferReceipt>,
}

/// Shared in-memory account table
#[derive(Clone, Default)]
pub struct AccountStore {
    state: Arc<RwLock<StoreState>>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let state = StoreState {
            accounts: accounts
                .into_iter()
                .map(|a| (a.number.clone(), a))
                .collect(),
            history: Vec::new(),
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// The two demo accounts used by the bank assistant
    pub fn demo() -> Self {
        Self::with_accounts([
            Account::new(AccountNumber("9876543".to_string()), "Arisha", dec!(100000000)),
            Account::new(AccountNumber("3456789".to_string()), "Abrish", dec!(5000.00)),
        ])
    }

    pub async fn open(&self, account: Account) -> Result<()> {
        if account.balance.is_sign_negative() {
            return Err(LedgerError::InvalidAmount {
                message: format!("opening balance {} is negative", account.balance),
            });
        }
        let mut state = self.state.write().await;
        if state.accounts.contains_key(&account.number) {
            return Err(LedgerError::AccountExists {
                account: account.number.to_string(),
            });
        }
        tracing::debug!(account = %account.number, "account opened");
        state.accounts.insert(account.number.clone(), account);
        Ok(())
    }

    pub async fn get(&self, number: &AccountNumber) -> Option<Account> {
        self.state.read().await.accounts.get(number).cloned()
    }

    pub async fn balance(&self, number: &AccountNumber) -> Result<Decimal> {
        self.state
            .read()
            .await
            .accounts
            .get(number)
            .map(|a| a.balance)
            .ok_or_else(|| LedgerError::AccountNotFound {
                account: number.to_string(),
            })
    }

    /// All accounts ordered by account number
    pub async fn snapshot(&self) -> Vec<Account> {
        self.state.read().await.accounts.values().cloned().collect()
    }

    pub async fn history(&self) -> Vec<TransferReceipt> {
        self.state.read().await.history.clone()
    }

    /// Move `amount` from one account to another
    ///
    /// All checks and both balance updates happen under a single write lock.
    pub async fn apply_transfer(
        &self,
        from: &AccountNumber,
        to: &AccountNumber,
        amount: Decimal,
    ) -> std::result::Result<TransferReceipt, TransferError> {
        if amount <= Decimal::ZERO {
            return Err(TransferError::InvalidAmount { amount });
        }
        if from == to {
            return Err(TransferError::SameAccount {
                account: from.clone(),
            });
        }

        let mut state = self.state.write().await;

        let available = state
            .accounts
            .get(from)
            .map(|a| a.balance)
            .ok_or_else(|| TransferError::AccountNotFound {
                account: from.clone(),
            })?;
        if !state.accounts.contains_key(to) {
            return Err(TransferError::AccountNotFound { account: to.clone() });
        }
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                available,
                required: amount,
            });
        }

        let mut from_balance_after = Decimal::ZERO;
        if let Some(source) = state.accounts.get_mut(from) {
            source.balance -= amount;
            from_balance_after = source.balance;
        }
        let mut to_balance_after = Decimal::ZERO;
        if let Some(target) = state.accounts.get_mut(to) {
            target.balance += amount;
            to_balance_after = target.balance;
        }

        let receipt = TransferReceipt {
            receipt_id: format!("txn_{}", Uuid::new_v4()),
            from: from.clone(),
            to: to.clone(),
            amount,
            from_balance_after,
            to_balance_after,
            executed_at: Utc::now(),
        };
        state.history.push(receipt.clone());

        tracing::info!(
            receipt_id = %receipt.receipt_id,
            from = %from,
            to = %to,
            amount = %amount,
            "transfer applied"
        );

        Ok(receipt)
    }
}
