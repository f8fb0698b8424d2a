use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use model::entities::{
    budget::{self, BudgetPeriod},
    category,
    transaction::{self, TransactionKind},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{ComputeError, ConflictKind, Result, conflict_or_database, is_foreign_key_violation};
use crate::metrics::{self, MonthlyBucket};

/// Fields accepted when creating or replacing a category.
/// Missing color and icon fall back to the system defaults.
#[derive(Debug, Clone, Default)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// A visible category with lifetime totals of the caller's transactions.
#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub category: category::Model,
    pub is_custom: bool,
    pub transaction_count: u64,
    pub total_expenses: Decimal,
    pub total_income: Decimal,
}

/// A visible category paired with one of its active budgets, if any.
#[derive(Debug, Clone)]
pub struct CategoryBudgetRow {
    pub category: category::Model,
    pub is_custom: bool,
    pub budget_id: Option<i32>,
    pub budget_amount: Option<Decimal>,
    pub budget_period: Option<BudgetPeriod>,
    pub budget_start_date: Option<NaiveDate>,
    pub budget_end_date: Option<NaiveDate>,
    /// Expenses inside the budget window, or inside the trailing month when there is no budget.
    pub spent_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStats {
    pub expense_count: u64,
    pub income_count: u64,
    pub total_expenses: Decimal,
    pub total_income: Decimal,
    pub avg_expense: Decimal,
    pub avg_income: Decimal,
}

/// Condition selecting categories `user_id` may see: system defaults plus their own.
pub fn visible_to(user_id: i32) -> Condition {
    Condition::any()
        .add(category::Column::IsDefault.eq(true))
        .add(category::Column::UserId.eq(user_id))
}

/// Owns system-default and user-defined categories.
pub struct CategoryStore<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CategoryStore<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, owner_id: i32, input: CategoryInput) -> Result<category::Model> {
        trace!("Creating category for user {}", owner_id);

        if self.owner_has_name(owner_id, &input.name, None).await? {
            warn!("User {} already has a category named '{}'", owner_id, input.name);
            return Err(ComputeError::Conflict(ConflictKind::DuplicateCategory));
        }

        let now = Utc::now().naive_utc();
        let model = category::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            color: Set(input.color.unwrap_or_else(|| category::DEFAULT_COLOR.to_string())),
            icon: Set(input.icon.unwrap_or_else(|| category::DEFAULT_ICON.to_string())),
            user_id: Set(Some(owner_id)),
            is_default: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db)
        .await
        .map_err(|e| conflict_or_database(e, ConflictKind::DuplicateCategory))?;

        info!("Category created with ID: {}", model.id);
        Ok(model)
    }

    /// Visible when owned by the caller or a system default.
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: i32, caller_id: i32) -> Result<Option<category::Model>> {
        let found = category::Entity::find_by_id(id)
            .filter(visible_to(caller_id))
            .one(self.db)
            .await?;
        if found.is_none() {
            debug!("Category {} not visible to user {}", id, caller_id);
        }
        Ok(found)
    }

    pub async fn list_defaults(&self) -> Result<Vec<category::Model>> {
        Ok(category::Entity::find()
            .filter(category::Column::IsDefault.eq(true))
            .order_by_asc(category::Column::Name)
            .all(self.db)
            .await?)
    }

    /// Defaults first, then alphabetical, each with lifetime expense and income totals.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, caller_id: i32) -> Result<Vec<CategorySummary>> {
        let categories = self.visible_categories(caller_id).await?;

        let transactions = transaction::Entity::find()
            .filter(transaction::Column::UserId.eq(caller_id))
            .all(self.db)
            .await?;
        debug!(
            "Aggregating {} transactions over {} categories",
            transactions.len(),
            categories.len()
        );

        let mut totals: HashMap<i32, (u64, Decimal, Decimal)> = HashMap::new();
        for tx in transactions {
            let entry = totals
                .entry(tx.category_id)
                .or_insert((0, Decimal::ZERO, Decimal::ZERO));
            entry.0 += 1;
            match tx.kind {
                TransactionKind::Expense => entry.1 += tx.amount,
                TransactionKind::Income => entry.2 += tx.amount,
            }
        }

        Ok(categories
            .into_iter()
            .map(|category| {
                let (count, expenses, income) = totals
                    .get(&category.id)
                    .copied()
                    .unwrap_or((0, Decimal::ZERO, Decimal::ZERO));
                CategorySummary {
                    is_custom: !category.is_default,
                    category,
                    transaction_count: count,
                    total_expenses: metrics::normalize_amount(expenses),
                    total_income: metrics::normalize_amount(income),
                }
            })
            .collect())
    }

    /// One row per (category, active budget); categories without an active budget appear once.
    #[instrument(skip(self))]
    pub async fn list_with_budgets(
        &self,
        caller_id: i32,
        today: NaiveDate,
    ) -> Result<Vec<CategoryBudgetRow>> {
        let categories = self.visible_categories(caller_id).await?;

        let budgets = budget::Entity::find()
            .filter(budget::Column::UserId.eq(caller_id))
            .filter(budget::Column::IsActive.eq(true))
            .order_by_asc(budget::Column::StartDate)
            .order_by_asc(budget::Column::Id)
            .all(self.db)
            .await?;

        let expenses = transaction::Entity::find()
            .filter(transaction::Column::UserId.eq(caller_id))
            .filter(transaction::Column::Kind.eq(TransactionKind::Expense))
            .all(self.db)
            .await?;

        let spent_between = |category_id: i32, start: NaiveDate, end: NaiveDate| {
            let total: Decimal = expenses
                .iter()
                .filter(|tx| tx.category_id == category_id && tx.date >= start && tx.date <= end)
                .map(|tx| tx.amount)
                .sum();
            metrics::normalize_amount(total)
        };

        let fallback_start = metrics::trailing_start(today, 1);
        let mut rows = Vec::with_capacity(categories.len());
        for category in categories {
            let own_budgets: Vec<&budget::Model> = budgets
                .iter()
                .filter(|b| b.category_id == category.id)
                .collect();

            if own_budgets.is_empty() {
                rows.push(CategoryBudgetRow {
                    spent_amount: spent_between(category.id, fallback_start, today),
                    is_custom: !category.is_default,
                    category,
                    budget_id: None,
                    budget_amount: None,
                    budget_period: None,
                    budget_start_date: None,
                    budget_end_date: None,
                });
                continue;
            }

            for b in own_budgets {
                rows.push(CategoryBudgetRow {
                    category: category.clone(),
                    is_custom: !category.is_default,
                    budget_id: Some(b.id),
                    budget_amount: Some(metrics::normalize_amount(b.amount)),
                    budget_period: Some(b.period),
                    budget_start_date: Some(b.start_date),
                    budget_end_date: Some(b.end_date),
                    spent_amount: spent_between(category.id, b.start_date, b.end_date),
                });
            }
        }

        Ok(rows)
    }

    /// Full replace of the editable fields. Returns `false` for foreign categories;
    /// defaults are refused with `Validation`.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn update(&self, id: i32, caller_id: i32, input: CategoryInput) -> Result<bool> {
        let Some(existing) = self.find_owned(id, caller_id).await? else {
            self.refuse_default(id, "modify").await?;
            warn!("Category {} is not editable by user {}", id, caller_id);
            return Ok(false);
        };

        if existing.name != input.name && self.owner_has_name(caller_id, &input.name, Some(id)).await? {
            warn!("Rename of category {} collides with '{}'", id, input.name);
            return Err(ComputeError::Conflict(ConflictKind::DuplicateCategory));
        }

        let mut active: category::ActiveModel = existing.into();
        active.name = Set(input.name);
        active.description = Set(input.description);
        active.color = Set(input.color.unwrap_or_else(|| category::DEFAULT_COLOR.to_string()));
        active.icon = Set(input.icon.unwrap_or_else(|| category::DEFAULT_ICON.to_string()));
        active.updated_at = Set(Utc::now().naive_utc());
        active
            .update(self.db)
            .await
            .map_err(|e| conflict_or_database(e, ConflictKind::DuplicateCategory))?;

        info!("Category {} updated", id);
        Ok(true)
    }

    /// Removes an owned category. Refused while any transaction references it, and for defaults.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32, caller_id: i32) -> Result<bool> {
        let Some(existing) = self.find_owned(id, caller_id).await? else {
            self.refuse_default(id, "delete").await?;
            warn!("Category {} is not deletable by user {}", id, caller_id);
            return Ok(false);
        };

        let transaction_count = self.transaction_count(id).await?;
        if transaction_count > 0 {
            warn!("Category {} still has {} transactions", id, transaction_count);
            return Err(ComputeError::HasTransactions {
                category_id: id,
                transaction_count,
            });
        }

        match existing.delete(self.db).await {
            Ok(_) => {
                info!("Category {} deleted", id);
                Ok(true)
            }
            // A transaction slipped in between the check and the delete
            Err(e) if is_foreign_key_violation(&e) => Err(ComputeError::HasTransactions {
                category_id: id,
                transaction_count: self.transaction_count(id).await?.max(1),
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn can_access(&self, id: i32, caller_id: i32) -> Result<bool> {
        Ok(self.find_by_id(id, caller_id).await?.is_some())
    }

    /// Counts, totals and averages inside `[start, end]`. `None` when the category is not visible.
    #[instrument(skip(self))]
    pub async fn stats(
        &self,
        id: i32,
        caller_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<CategoryStats>> {
        if !self.can_access(id, caller_id).await? {
            return Ok(None);
        }

        let transactions = transaction::Entity::find()
            .filter(transaction::Column::UserId.eq(caller_id))
            .filter(transaction::Column::CategoryId.eq(id))
            .filter(transaction::Column::Date.between(start, end))
            .all(self.db)
            .await?;

        let (mut expense_count, mut income_count) = (0u64, 0u64);
        let (mut total_expenses, mut total_income) = (Decimal::ZERO, Decimal::ZERO);
        for tx in transactions {
            match tx.kind {
                TransactionKind::Expense => {
                    expense_count += 1;
                    total_expenses += tx.amount;
                }
                TransactionKind::Income => {
                    income_count += 1;
                    total_income += tx.amount;
                }
            }
        }

        Ok(Some(CategoryStats {
            expense_count,
            income_count,
            total_expenses: metrics::normalize_amount(total_expenses),
            total_income: metrics::normalize_amount(total_income),
            avg_expense: metrics::average(total_expenses, expense_count),
            avg_income: metrics::average(total_income, income_count),
        }))
    }

    /// Month/kind buckets of the caller's transactions in this category over the trailing `months`.
    #[instrument(skip(self))]
    pub async fn usage_over_time(
        &self,
        id: i32,
        caller_id: i32,
        months: u32,
        today: NaiveDate,
    ) -> Result<Vec<MonthlyBucket>> {
        let since = metrics::trailing_start(today, months);
        let transactions = transaction::Entity::find()
            .filter(transaction::Column::UserId.eq(caller_id))
            .filter(transaction::Column::CategoryId.eq(id))
            .filter(transaction::Column::Date.gte(since))
            .all(self.db)
            .await?;

        Ok(metrics::bucket_by_month(
            transactions.into_iter().map(|tx| (tx.date, tx.kind, tx.amount)),
        ))
    }

    async fn visible_categories(&self, caller_id: i32) -> Result<Vec<category::Model>> {
        Ok(category::Entity::find()
            .filter(visible_to(caller_id))
            .order_by_desc(category::Column::IsDefault)
            .order_by_asc(category::Column::Name)
            .all(self.db)
            .await?)
    }

    async fn find_owned(&self, id: i32, caller_id: i32) -> Result<Option<category::Model>> {
        Ok(category::Entity::find_by_id(id)
            .filter(category::Column::UserId.eq(caller_id))
            .filter(category::Column::IsDefault.eq(false))
            .one(self.db)
            .await?)
    }

    async fn refuse_default(&self, id: i32, action: &str) -> Result<()> {
        let is_default = category::Entity::find_by_id(id)
            .filter(category::Column::IsDefault.eq(true))
            .one(self.db)
            .await?
            .is_some();
        if is_default {
            warn!("Refusing to {} default category {}", action, id);
            return Err(ComputeError::Validation(format!("Cannot {action} default categories")));
        }
        Ok(())
    }

    async fn owner_has_name(&self, owner_id: i32, name: &str, except: Option<i32>) -> Result<bool> {
        let mut query = category::Entity::find()
            .filter(category::Column::UserId.eq(owner_id))
            .filter(category::Column::Name.eq(name));
        if let Some(id) = except {
            query = query.filter(category::Column::Id.ne(id));
        }
        Ok(query.count(self.db).await? > 0)
    }

    async fn transaction_count(&self, category_id: i32) -> Result<u64> {
        Ok(transaction::Entity::find()
            .filter(transaction::Column::CategoryId.eq(category_id))
            .count(self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{date, dec, insert_transaction, insert_user, setup_db};

    fn groceries() -> CategoryInput {
        CategoryInput {
            name: "Groceries".to_string(),
            description: Some("Weekly shopping".to_string()),
            color: Some("#ff0000".to_string()),
            icon: None,
        }
    }

    #[tokio::test]
    async fn create_applies_defaults_and_rejects_duplicate_names() {
        let db = setup_db().await;
        let user = insert_user(&db, "cat@example.com").await;
        let store = CategoryStore::new(&db);

        let created = store.create(user.id, groceries()).await.unwrap();
        assert_eq!(created.color, "#ff0000");
        assert_eq!(created.icon, category::DEFAULT_ICON);
        assert!(!created.is_default);

        let err = store.create(user.id, groceries()).await.unwrap_err();
        assert!(matches!(err, ComputeError::Conflict(ConflictKind::DuplicateCategory)));

        // Another user may reuse the name
        let other = insert_user(&db, "other@example.com").await;
        store.create(other.id, groceries()).await.unwrap();
    }

    #[tokio::test]
    async fn visibility_is_defaults_plus_own() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice@example.com").await;
        let bob = insert_user(&db, "bob@example.com").await;
        let store = CategoryStore::new(&db);

        let mine = store.create(alice.id, groceries()).await.unwrap();
        let default = store.list_defaults().await.unwrap().remove(0);

        assert!(store.can_access(mine.id, alice.id).await.unwrap());
        assert!(!store.can_access(mine.id, bob.id).await.unwrap());
        assert!(store.can_access(default.id, bob.id).await.unwrap());
        assert!(store.find_by_id(mine.id, bob.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_puts_defaults_first_and_totals_lifetime_amounts() {
        let db = setup_db().await;
        let user = insert_user(&db, "list@example.com").await;
        let store = CategoryStore::new(&db);
        let mine = store.create(user.id, groceries()).await.unwrap();

        insert_transaction(&db, user.id, mine.id, TransactionKind::Expense, "12.50", date(2020, 1, 1)).await;
        insert_transaction(&db, user.id, mine.id, TransactionKind::Expense, "7.50", date(2024, 5, 1)).await;
        insert_transaction(&db, user.id, mine.id, TransactionKind::Income, "3.00", date(2024, 5, 2)).await;

        let listed = store.list_for_user(user.id).await.unwrap();
        assert_eq!(listed.len(), 11);
        assert!(listed[..10].iter().all(|c| !c.is_custom));
        let names: Vec<&str> = listed[..10].iter().map(|c| c.category.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        let last = listed.last().unwrap();
        assert_eq!(last.category.id, mine.id);
        assert!(last.is_custom);
        assert_eq!(last.transaction_count, 3);
        assert_eq!(last.total_expenses, dec("20.00"));
        assert_eq!(last.total_income, dec("3.00"));
    }

    #[tokio::test]
    async fn defaults_and_foreign_categories_are_immutable() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice@example.com").await;
        let bob = insert_user(&db, "bob@example.com").await;
        let store = CategoryStore::new(&db);
        let mine = store.create(alice.id, groceries()).await.unwrap();
        let default = store.list_defaults().await.unwrap().remove(0);

        let rename = CategoryInput {
            name: "Renamed".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            store.update(default.id, alice.id, rename.clone()).await.unwrap_err(),
            ComputeError::Validation(_)
        ));
        assert!(matches!(
            store.delete(default.id, alice.id).await.unwrap_err(),
            ComputeError::Validation(_)
        ));
        assert!(store.find_by_id(default.id, alice.id).await.unwrap().is_some());

        assert!(!store.update(mine.id, bob.id, rename.clone()).await.unwrap());
        assert!(!store.delete(mine.id, bob.id).await.unwrap());

        assert!(store.update(mine.id, alice.id, rename).await.unwrap());
        let updated = store.find_by_id(mine.id, alice.id).await.unwrap().unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.color, category::DEFAULT_COLOR);
        assert_eq!(updated.description, None);
    }

    #[tokio::test]
    async fn rename_onto_existing_name_conflicts() {
        let db = setup_db().await;
        let user = insert_user(&db, "rename@example.com").await;
        let store = CategoryStore::new(&db);
        store.create(user.id, groceries()).await.unwrap();
        let pets = store
            .create(
                user.id,
                CategoryInput {
                    name: "Pets".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = store.update(pets.id, user.id, groceries()).await.unwrap_err();
        assert!(matches!(err, ComputeError::Conflict(ConflictKind::DuplicateCategory)));
    }

    #[tokio::test]
    async fn delete_is_blocked_while_transactions_exist() {
        let db = setup_db().await;
        let user = insert_user(&db, "delete@example.com").await;
        let store = CategoryStore::new(&db);
        let mine = store.create(user.id, groceries()).await.unwrap();
        insert_transaction(&db, user.id, mine.id, TransactionKind::Expense, "9.99", date(2024, 1, 2)).await;
        insert_transaction(&db, user.id, mine.id, TransactionKind::Income, "1.00", date(2024, 1, 3)).await;

        let err = store.delete(mine.id, user.id).await.unwrap_err();
        match err {
            ComputeError::HasTransactions {
                category_id,
                transaction_count,
            } => {
                assert_eq!(category_id, mine.id);
                assert_eq!(transaction_count, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.find_by_id(mine.id, user.id).await.unwrap().is_some());

        let empty = store
            .create(
                user.id,
                CategoryInput {
                    name: "Unused".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(store.delete(empty.id, user.id).await.unwrap());
        assert!(store.find_by_id(empty.id, user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stats_are_scoped_to_the_window() {
        let db = setup_db().await;
        let user = insert_user(&db, "stats@example.com").await;
        let store = CategoryStore::new(&db);
        let mine = store.create(user.id, groceries()).await.unwrap();

        insert_transaction(&db, user.id, mine.id, TransactionKind::Expense, "10.00", date(2024, 1, 1)).await;
        insert_transaction(&db, user.id, mine.id, TransactionKind::Expense, "20.00", date(2024, 1, 31)).await;
        insert_transaction(&db, user.id, mine.id, TransactionKind::Income, "5.00", date(2024, 1, 15)).await;
        insert_transaction(&db, user.id, mine.id, TransactionKind::Expense, "99.00", date(2024, 2, 1)).await;

        let stats = store
            .stats(mine.id, user.id, date(2024, 1, 1), date(2024, 1, 31))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.expense_count, 2);
        assert_eq!(stats.income_count, 1);
        assert_eq!(stats.total_expenses, dec("30.00"));
        assert_eq!(stats.avg_expense, dec("15.00"));
        assert_eq!(stats.avg_income, dec("5.00"));

        let stranger = insert_user(&db, "stranger@example.com").await;
        assert!(store
            .stats(mine.id, stranger.id, date(2024, 1, 1), date(2024, 1, 31))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn usage_over_time_covers_trailing_months() {
        let db = setup_db().await;
        let user = insert_user(&db, "usage@example.com").await;
        let store = CategoryStore::new(&db);
        let mine = store.create(user.id, groceries()).await.unwrap();

        insert_transaction(&db, user.id, mine.id, TransactionKind::Expense, "10.00", date(2024, 6, 3)).await;
        insert_transaction(&db, user.id, mine.id, TransactionKind::Expense, "15.00", date(2024, 4, 20)).await;
        insert_transaction(&db, user.id, mine.id, TransactionKind::Expense, "50.00", date(2023, 1, 1)).await;

        let usage = store
            .usage_over_time(mine.id, user.id, 6, date(2024, 6, 15))
            .await
            .unwrap();
        let months: Vec<&str> = usage.iter().map(|b| b.month.as_str()).collect();
        assert_eq!(months, vec!["2024-06", "2024-04"]);
    }

    #[tokio::test]
    async fn list_with_budgets_scopes_spending_per_budget() {
        let db = setup_db().await;
        let user = insert_user(&db, "budgets@example.com").await;
        let store = CategoryStore::new(&db);
        let mine = store.create(user.id, groceries()).await.unwrap();

        crate::testing::insert_budget(&db, user.id, mine.id, "500.00", date(2024, 1, 1), date(2024, 1, 31)).await;
        insert_transaction(&db, user.id, mine.id, TransactionKind::Expense, "40.00", date(2024, 1, 10)).await;
        insert_transaction(&db, user.id, mine.id, TransactionKind::Expense, "60.00", date(2024, 2, 10)).await;

        let rows = store.list_with_budgets(user.id, date(2024, 2, 15)).await.unwrap();
        assert_eq!(rows.len(), 11);

        let budgeted = rows.iter().find(|r| r.category.id == mine.id).unwrap();
        assert_eq!(budgeted.budget_amount, Some(dec("500.00")));
        assert_eq!(budgeted.spent_amount, dec("40.00"));

        let unbudgeted = rows.iter().filter(|r| r.budget_id.is_none()).count();
        assert_eq!(unbudgeted, 10);
    }

    #[tokio::test]
    async fn list_with_budgets_ignores_inactive_budgets() {
        let db = setup_db().await;
        let user = insert_user(&db, "paused@example.com").await;
        let store = CategoryStore::new(&db);
        let mine = store.create(user.id, groceries()).await.unwrap();

        let budget_id =
            crate::testing::insert_budget(&db, user.id, mine.id, "500.00", date(2024, 2, 1), date(2024, 2, 29)).await;
        crate::BudgetEngine::new(&db)
            .toggle_status(budget_id, user.id)
            .await
            .unwrap();
        insert_transaction(&db, user.id, mine.id, TransactionKind::Expense, "25.00", date(2024, 2, 10)).await;

        let rows = store.list_with_budgets(user.id, date(2024, 2, 15)).await.unwrap();
        let own: Vec<_> = rows.iter().filter(|r| r.category.id == mine.id).collect();
        assert_eq!(own.len(), 1);
        assert!(own[0].budget_id.is_none());
        assert!(own[0].budget_amount.is_none());
        assert!(own[0].budget_period.is_none());
        // Falls back to the trailing month ending today
        assert_eq!(own[0].spent_amount, dec("25.00"));
    }
}
