//! Error types for core operations

use thiserror::Error;

use crate::context::Category;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Category already assigned: {existing} (attempted {attempted})")]
    CategoryAlreadyAssigned {
        existing: Category,
        attempted: Category,
    },
}
