//! SeaORM entities for the SmartSpend data model.
//! Users own sessions, categories, transactions and budgets; default categories have no owner.

pub mod budget;
pub mod category;
pub mod session;
pub mod transaction;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::budget::Entity as Budget;
    pub use super::category::Entity as Category;
    pub use super::session::Entity as Session;
    pub use super::transaction::Entity as Transaction;
    pub use super::user::Entity as User;
}
