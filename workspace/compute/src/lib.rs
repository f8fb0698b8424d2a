//! Core services of SmartSpend: categories, transactions, budgets and identity.
//!
//! Every service is a thin, stateless struct borrowing a `DatabaseConnection`;
//! construct one per request with `::new(&db)`.

pub mod budgets;
pub mod categories;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod transactions;

#[cfg(test)]
mod testing;

pub use budgets::BudgetEngine;
pub use categories::CategoryStore;
pub use error::{ComputeError, ConflictKind, Result};
pub use identity::IdentityService;
pub use transactions::TransactionStore;
