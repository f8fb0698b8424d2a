//! Budget definitions and the spending metrics derived from them.
//!
//! Spending is never stored. Every view is recomputed from the owner's expense
//! transactions that share the budget's category and fall inside its inclusive window.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use model::entities::{
    budget::{self, BudgetPeriod},
    category,
    transaction::{self, TransactionKind},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::categories::CategoryStore;
use crate::error::{ComputeError, ConflictKind, Result, conflict_or_database};
use crate::metrics::{self, SpendingMetrics};

pub const DEFAULT_ALERT_THRESHOLD: u32 = 80;

#[derive(Debug, Clone)]
pub struct NewBudget {
    pub category_id: i32,
    pub amount: Decimal,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Full replacement of a budget's mutable fields.
#[derive(Debug, Clone)]
pub struct BudgetChanges {
    pub amount: Decimal,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BudgetFilter {
    pub is_active: Option<bool>,
    pub period: Option<BudgetPeriod>,
    pub category_id: Option<i32>,
}

/// A budget with its category display fields and derived spending.
#[derive(Debug, Clone)]
pub struct BudgetView {
    pub budget: budget::Model,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
    pub category_icon: Option<String>,
    pub metrics: SpendingMetrics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetSummary {
    pub total_budgets: u64,
    pub active_budgets: u64,
    pub total_budget_amount: Decimal,
    pub total_spent: Decimal,
    pub avg_usage_percentage: Decimal,
}

/// Stateless service computing budget views against a store handle.
pub struct BudgetEngine<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> BudgetEngine<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, new), fields(category_id = new.category_id, amount = %new.amount))]
    pub async fn create(&self, owner_id: i32, new: NewBudget) -> Result<BudgetView> {
        trace!("Creating budget for user {}", owner_id);
        validate_window(new.amount, new.start_date, new.end_date)?;

        if !CategoryStore::new(self.db).can_access(new.category_id, owner_id).await? {
            warn!("Category {} not accessible to user {}", new.category_id, owner_id);
            return Err(ComputeError::InvalidReference(format!(
                "category {} is not accessible",
                new.category_id
            )));
        }

        let duplicates = budget::Entity::find()
            .filter(budget::Column::UserId.eq(owner_id))
            .filter(budget::Column::CategoryId.eq(new.category_id))
            .filter(budget::Column::Period.eq(new.period))
            .filter(budget::Column::StartDate.eq(new.start_date))
            .count(self.db)
            .await?;
        if duplicates > 0 {
            warn!(
                "Budget for category {} ({}) starting {} already exists",
                new.category_id,
                new.period.as_str(),
                new.start_date
            );
            return Err(ComputeError::Conflict(ConflictKind::DuplicateBudget));
        }

        let now = Utc::now().naive_utc();
        let model = budget::ActiveModel {
            category_id: Set(new.category_id),
            user_id: Set(owner_id),
            amount: Set(new.amount),
            period: Set(new.period),
            start_date: Set(new.start_date),
            end_date: Set(new.end_date),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db)
        .await
        .map_err(|e| conflict_or_database(e, ConflictKind::DuplicateBudget))?;

        info!("Budget created with ID: {}", model.id);
        self.get_with_spending(model.id, owner_id)
            .await?
            .ok_or(ComputeError::NotFound("Budget"))
    }

    #[instrument(skip(self))]
    pub async fn get_with_spending(&self, id: i32, owner_id: i32) -> Result<Option<BudgetView>> {
        let row = budget::Entity::find_by_id(id)
            .filter(budget::Column::UserId.eq(owner_id))
            .find_also_related(category::Entity)
            .one(self.db)
            .await?;

        match row {
            Some(row) => Ok(self.with_spending(owner_id, vec![row]).await?.pop()),
            None => {
                debug!("Budget {} not found for user {}", id, owner_id);
                Ok(None)
            }
        }
    }

    /// Newest first.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, owner_id: i32, filter: &BudgetFilter) -> Result<Vec<BudgetView>> {
        let mut query = budget::Entity::find().filter(budget::Column::UserId.eq(owner_id));
        if let Some(is_active) = filter.is_active {
            query = query.filter(budget::Column::IsActive.eq(is_active));
        }
        if let Some(period) = filter.period {
            query = query.filter(budget::Column::Period.eq(period));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(budget::Column::CategoryId.eq(category_id));
        }

        let rows = query
            .order_by_desc(budget::Column::CreatedAt)
            .order_by_desc(budget::Column::Id)
            .find_also_related(category::Entity)
            .all(self.db)
            .await?;
        self.with_spending(owner_id, rows).await
    }

    /// Active budgets whose window contains `today`, highest usage first.
    #[instrument(skip(self))]
    pub async fn current(&self, owner_id: i32, today: NaiveDate) -> Result<Vec<BudgetView>> {
        let rows = budget::Entity::find()
            .filter(budget::Column::UserId.eq(owner_id))
            .filter(budget::Column::IsActive.eq(true))
            .filter(budget::Column::StartDate.lte(today))
            .filter(budget::Column::EndDate.gte(today))
            .order_by_asc(budget::Column::Id)
            .find_also_related(category::Entity)
            .all(self.db)
            .await?;

        let mut views = self.with_spending(owner_id, rows).await?;
        sort_by_usage(&mut views);
        Ok(views)
    }

    /// Full replace. Returns `false` when absent or not owned.
    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: i32, owner_id: i32, changes: BudgetChanges) -> Result<bool> {
        validate_window(changes.amount, changes.start_date, changes.end_date)?;

        let Some(existing) = self.find_owned(id, owner_id).await? else {
            warn!("Budget {} not found for user {}", id, owner_id);
            return Ok(false);
        };

        let collisions = budget::Entity::find()
            .filter(budget::Column::UserId.eq(owner_id))
            .filter(budget::Column::CategoryId.eq(existing.category_id))
            .filter(budget::Column::Period.eq(changes.period))
            .filter(budget::Column::StartDate.eq(changes.start_date))
            .filter(budget::Column::Id.ne(id))
            .count(self.db)
            .await?;
        if collisions > 0 {
            warn!("Update of budget {} collides with an existing budget", id);
            return Err(ComputeError::Conflict(ConflictKind::DuplicateBudget));
        }

        let mut active: budget::ActiveModel = existing.into();
        active.amount = Set(changes.amount);
        active.period = Set(changes.period);
        active.start_date = Set(changes.start_date);
        active.end_date = Set(changes.end_date);
        active.is_active = Set(changes.is_active);
        active.updated_at = Set(Utc::now().naive_utc());
        active
            .update(self.db)
            .await
            .map_err(|e| conflict_or_database(e, ConflictKind::DuplicateBudget))?;

        info!("Budget {} updated", id);
        Ok(true)
    }

    /// Flips the active flag and returns the recomputed view.
    #[instrument(skip(self))]
    pub async fn toggle_status(&self, id: i32, owner_id: i32) -> Result<BudgetView> {
        let existing = self
            .find_owned(id, owner_id)
            .await?
            .ok_or(ComputeError::NotFound("Budget"))?;

        let is_active = !existing.is_active;
        let mut active: budget::ActiveModel = existing.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now().naive_utc());
        active.update(self.db).await?;

        info!("Budget {} is now {}", id, if is_active { "active" } else { "inactive" });
        self.get_with_spending(id, owner_id)
            .await?
            .ok_or(ComputeError::NotFound("Budget"))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32, owner_id: i32) -> Result<bool> {
        let Some(existing) = self.find_owned(id, owner_id).await? else {
            warn!("Budget {} not found for user {}", id, owner_id);
            return Ok(false);
        };
        existing.delete(self.db).await?;
        info!("Budget {} deleted", id);
        Ok(true)
    }

    /// Current budgets at or above `threshold` percent usage, highest first.
    #[instrument(skip(self))]
    pub async fn alerts(
        &self,
        owner_id: i32,
        threshold: Decimal,
        today: NaiveDate,
    ) -> Result<Vec<BudgetView>> {
        let alerts: Vec<BudgetView> = self
            .current(owner_id, today)
            .await?
            .into_iter()
            .filter(|view| view.metrics.usage_percentage >= threshold)
            .collect();
        debug!("{} budget(s) at or above {}%", alerts.len(), threshold);
        Ok(alerts)
    }

    /// Aggregates over every budget the user has, active or not.
    #[instrument(skip(self))]
    pub async fn summary(&self, owner_id: i32) -> Result<BudgetSummary> {
        let views = self.list_for_user(owner_id, &BudgetFilter::default()).await?;

        let total_budgets = views.len() as u64;
        let active_budgets = views.iter().filter(|v| v.budget.is_active).count() as u64;
        let total_budget_amount: Decimal = views.iter().map(|v| v.budget.amount).sum();
        let total_spent: Decimal = views.iter().map(|v| v.metrics.spent).sum();
        let usage_total: Decimal = views.iter().map(|v| v.metrics.usage_percentage).sum();

        Ok(BudgetSummary {
            total_budgets,
            active_budgets,
            total_budget_amount: metrics::normalize_amount(total_budget_amount),
            total_spent: metrics::normalize_amount(total_spent),
            avg_usage_percentage: metrics::average(usage_total, total_budgets),
        })
    }

    async fn find_owned(&self, id: i32, owner_id: i32) -> Result<Option<budget::Model>> {
        Ok(budget::Entity::find_by_id(id)
            .filter(budget::Column::UserId.eq(owner_id))
            .one(self.db)
            .await?)
    }

    /// Attaches spending to each budget, keeping the input order.
    /// Expenses are fetched once for the union of categories and windows.
    async fn with_spending(
        &self,
        owner_id: i32,
        rows: Vec<(budget::Model, Option<category::Model>)>,
    ) -> Result<Vec<BudgetView>> {
        let (Some(from), Some(to)) = (
            rows.iter().map(|(b, _)| b.start_date).min(),
            rows.iter().map(|(b, _)| b.end_date).max(),
        ) else {
            return Ok(Vec::new());
        };
        let category_ids: HashSet<i32> = rows.iter().map(|(b, _)| b.category_id).collect();

        let expenses = transaction::Entity::find()
            .filter(transaction::Column::UserId.eq(owner_id))
            .filter(transaction::Column::Kind.eq(TransactionKind::Expense))
            .filter(transaction::Column::CategoryId.is_in(category_ids))
            .filter(transaction::Column::Date.between(from, to))
            .all(self.db)
            .await?;
        trace!(
            "Computing spending for {} budget(s) from {} expense(s)",
            rows.len(),
            expenses.len()
        );

        Ok(rows
            .into_iter()
            .map(|(mut budget, category)| {
                let (count, spent) = expenses
                    .iter()
                    .filter(|tx| tx.category_id == budget.category_id && budget.covers(tx.date))
                    .fold((0u64, Decimal::ZERO), |(count, sum), tx| (count + 1, sum + tx.amount));

                budget.amount = metrics::normalize_amount(budget.amount);
                BudgetView {
                    metrics: SpendingMetrics::new(budget.amount, spent, count),
                    budget,
                    category_name: category.as_ref().map(|c| c.name.clone()),
                    category_color: category.as_ref().map(|c| c.color.clone()),
                    category_icon: category.map(|c| c.icon),
                }
            })
            .collect())
    }
}

fn validate_window(amount: Decimal, start: NaiveDate, end: NaiveDate) -> Result<()> {
    metrics::check_amount(amount)?;
    if end <= start {
        return Err(ComputeError::Validation(
            "End date must be after start date".to_string(),
        ));
    }
    Ok(())
}

fn sort_by_usage(views: &mut [BudgetView]) {
    views.sort_by(|a, b| b.metrics.usage_percentage.cmp(&a.metrics.usage_percentage));
}
