use std::collections::HashMap;
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use model::entities::{
    category,
    transaction::{self, TransactionKind},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    sea_query::{Expr, Func, LikeExpr},
};
use tracing::{debug, info, instrument, trace, warn};

use crate::categories::{CategoryStore, visible_to};
use crate::error::{ComputeError, Result};
use crate::metrics::{self, MonthlyBucket};

/// Columns a listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Date,
    Amount,
    Title,
    CreatedAt,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "date" => Ok(SortKey::Date),
            "amount" => Ok(SortKey::Amount),
            "title" => Ok(SortKey::Title),
            "created_at" => Ok(SortKey::CreatedAt),
            other => Err(format!(
                "Invalid sort key: {}. Valid values are: date, amount, title, created_at",
                other
            )),
        }
    }
}

impl SortKey {
    fn column(self) -> transaction::Column {
        match self {
            SortKey::Date => transaction::Column::Date,
            SortKey::Amount => transaction::Column::Amount,
            SortKey::Title => transaction::Column::Title,
            SortKey::CreatedAt => transaction::Column::CreatedAt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("Invalid sort order: {}. Valid values are: asc, desc", other)),
        }
    }
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// Composable listing filters. Every `None` imposes no constraint.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub category_id: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    /// Substring over title and description. Case folding is ASCII-only, matching SQLite's `lower()`.
    pub search: Option<String>,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Mutable fields of a transaction; used for both create and full-replace update.
#[derive(Debug, Clone)]
pub struct TransactionInput {
    pub title: String,
    pub amount: Decimal,
    pub category_id: i32,
    pub kind: TransactionKind,
    pub description: Option<String>,
    pub date: NaiveDate,
}

/// A transaction joined with its category's display fields.
#[derive(Debug, Clone)]
pub struct TransactionView {
    pub transaction: transaction::Model,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
    pub category_icon: Option<String>,
}

impl TransactionView {
    fn new(mut transaction: transaction::Model, category: Option<category::Model>) -> Self {
        transaction.amount = metrics::normalize_amount(transaction.amount);
        Self {
            transaction,
            category_name: category.as_ref().map(|c| c.name.clone()),
            category_color: category.as_ref().map(|c| c.color.clone()),
            category_icon: category.map(|c| c.icon),
        }
    }
}

/// Totals of one category over a date range.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category_id: i32,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub transaction_count: u64,
    pub total_amount: Decimal,
}

/// Overview of a date range plus six months of trends.
#[derive(Debug, Clone)]
pub struct TransactionStats {
    pub total_expenses: Decimal,
    pub total_transactions: u64,
    pub category_summary: Vec<CategoryTotal>,
    pub monthly_trends: Vec<MonthlyBucket>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

const STATS_TREND_MONTHS: u32 = 6;

/// Owns expense and income records. Every query is scoped to a single owner.
pub struct TransactionStore<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TransactionStore<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(title = %input.title, amount = %input.amount))]
    pub async fn create(&self, owner_id: i32, input: TransactionInput) -> Result<TransactionView> {
        trace!("Creating transaction for user {}", owner_id);
        self.check_input(owner_id, &input).await?;

        let now = Utc::now().naive_utc();
        let model = transaction::ActiveModel {
            title: Set(input.title),
            amount: Set(input.amount),
            category_id: Set(input.category_id),
            kind: Set(input.kind),
            description: Set(input.description),
            date: Set(input.date),
            user_id: Set(owner_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        info!("Transaction created with ID: {}", model.id);
        self.find_by_id(model.id, owner_id)
            .await?
            .ok_or(ComputeError::NotFound("Transaction"))
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: i32, owner_id: i32) -> Result<Option<TransactionView>> {
        let found = transaction::Entity::find_by_id(id)
            .filter(transaction::Column::UserId.eq(owner_id))
            .find_also_related(category::Entity)
            .one(self.db)
            .await?;
        Ok(found.map(|(tx, category)| TransactionView::new(tx, category)))
    }

    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        owner_id: i32,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionView>> {
        let order: Order = filter.sort_order.into();
        let mut query = Self::filtered(owner_id, filter)
            .order_by(filter.sort_by.column(), order.clone())
            .order_by(transaction::Column::Id, order);

        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = filter.offset {
            query = query.offset(offset);
        }

        let rows = query.find_also_related(category::Entity).all(self.db).await?;
        debug!("Listed {} transactions for user {}", rows.len(), owner_id);
        Ok(rows
            .into_iter()
            .map(|(tx, category)| TransactionView::new(tx, category))
            .collect())
    }

    /// Same filters as [`Self::list_for_user`], ignoring sort and pagination.
    pub async fn count(&self, owner_id: i32, filter: &TransactionFilter) -> Result<u64> {
        Ok(Self::filtered(owner_id, filter).count(self.db).await?)
    }

    /// Full replace of every mutable field. Returns `false` when absent or not owned.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn update(&self, id: i32, owner_id: i32, input: TransactionInput) -> Result<bool> {
        let Some(existing) = self.find_owned(id, owner_id).await? else {
            warn!("Transaction {} not found for user {}", id, owner_id);
            return Ok(false);
        };
        self.check_input(owner_id, &input).await?;

        let mut active: transaction::ActiveModel = existing.into();
        active.title = Set(input.title);
        active.amount = Set(input.amount);
        active.category_id = Set(input.category_id);
        active.kind = Set(input.kind);
        active.description = Set(input.description);
        active.date = Set(input.date);
        active.updated_at = Set(Utc::now().naive_utc());
        active.update(self.db).await?;

        info!("Transaction {} updated", id);
        Ok(true)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32, owner_id: i32) -> Result<bool> {
        let Some(existing) = self.find_owned(id, owner_id).await? else {
            warn!("Transaction {} not found for user {}", id, owner_id);
            return Ok(false);
        };
        existing.delete(self.db).await?;
        info!("Transaction {} deleted", id);
        Ok(true)
    }

    /// Totals per visible category in `[start, end]`.
    /// Categories with no matching rows appear only when they are system defaults.
    #[instrument(skip(self))]
    pub async fn summary_by_category(
        &self,
        owner_id: i32,
        start: NaiveDate,
        end: NaiveDate,
        kind: Option<TransactionKind>,
    ) -> Result<Vec<CategoryTotal>> {
        let categories = category::Entity::find()
            .filter(visible_to(owner_id))
            .all(self.db)
            .await?;

        let mut query = transaction::Entity::find()
            .filter(transaction::Column::UserId.eq(owner_id))
            .filter(transaction::Column::Date.between(start, end));
        if let Some(kind) = kind {
            query = query.filter(transaction::Column::Kind.eq(kind));
        }
        let transactions = query.all(self.db).await?;

        let mut totals: HashMap<i32, (u64, Decimal)> = HashMap::new();
        for tx in transactions {
            let entry = totals.entry(tx.category_id).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += tx.amount;
        }

        let mut summary: Vec<CategoryTotal> = categories
            .into_iter()
            .filter_map(|category| {
                let (count, total) = totals.get(&category.id).copied().unwrap_or_default();
                if count == 0 && !category.is_default {
                    return None;
                }
                Some(CategoryTotal {
                    category_id: category.id,
                    name: category.name,
                    color: category.color,
                    icon: category.icon,
                    transaction_count: count,
                    total_amount: metrics::normalize_amount(total),
                })
            })
            .collect();

        summary.sort_by(|a, b| {
            b.total_amount
                .cmp(&a.total_amount)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(summary)
    }

    /// Month/kind buckets over the trailing `months`, most recent month first.
    #[instrument(skip(self))]
    pub async fn monthly_trends(
        &self,
        owner_id: i32,
        months: u32,
        today: NaiveDate,
    ) -> Result<Vec<MonthlyBucket>> {
        let transactions = transaction::Entity::find()
            .filter(transaction::Column::UserId.eq(owner_id))
            .filter(transaction::Column::Date.gte(metrics::trailing_start(today, months)))
            .all(self.db)
            .await?;

        Ok(metrics::bucket_by_month(
            transactions.into_iter().map(|tx| (tx.date, tx.kind, tx.amount)),
        ))
    }

    /// Most recently recorded, not most recently dated.
    #[instrument(skip(self))]
    pub async fn recent(&self, owner_id: i32, limit: u64) -> Result<Vec<TransactionView>> {
        let rows = transaction::Entity::find()
            .filter(transaction::Column::UserId.eq(owner_id))
            .order_by_desc(transaction::Column::CreatedAt)
            .order_by_desc(transaction::Column::Id)
            .limit(limit)
            .find_also_related(category::Entity)
            .all(self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(tx, category)| TransactionView::new(tx, category))
            .collect())
    }

    /// Per-category totals of every kind for `[start, end]` and six months of trends ending `today`.
    /// `total_expenses` sums expenses only; `total_transactions` counts every kind.
    #[instrument(skip(self))]
    pub async fn stats(
        &self,
        owner_id: i32,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<TransactionStats> {
        let category_summary = self.summary_by_category(owner_id, start, end, None).await?;
        let expenses = self
            .summary_by_category(owner_id, start, end, Some(TransactionKind::Expense))
            .await?;
        let monthly_trends = self
            .monthly_trends(owner_id, STATS_TREND_MONTHS, today)
            .await?;

        Ok(TransactionStats {
            total_expenses: expenses.iter().map(|c| c.total_amount).sum(),
            total_transactions: category_summary.iter().map(|c| c.transaction_count).sum(),
            category_summary,
            monthly_trends,
            start_date: start,
            end_date: end,
        })
    }

    fn filtered(owner_id: i32, filter: &TransactionFilter) -> Select<transaction::Entity> {
        let mut condition = Condition::all().add(transaction::Column::UserId.eq(owner_id));

        if let Some(kind) = filter.kind {
            condition = condition.add(transaction::Column::Kind.eq(kind));
        }
        if let Some(category_id) = filter.category_id {
            condition = condition.add(transaction::Column::CategoryId.eq(category_id));
        }
        if let Some(start) = filter.start_date {
            condition = condition.add(transaction::Column::Date.gte(start));
        }
        if let Some(end) = filter.end_date {
            condition = condition.add(transaction::Column::Date.lte(end));
        }
        if let Some(min) = filter.min_amount {
            condition = condition.add(transaction::Column::Amount.gte(min));
        }
        if let Some(max) = filter.max_amount {
            condition = condition.add(transaction::Column::Amount.lte(max));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            condition = condition.add(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col((transaction::Entity, transaction::Column::Title)))).like(pattern.clone()))
                    .add(Expr::expr(Func::lower(Expr::col((transaction::Entity, transaction::Column::Description)))).like(pattern)),
            );
        }

        transaction::Entity::find().filter(condition)
    }

    async fn find_owned(&self, id: i32, owner_id: i32) -> Result<Option<transaction::Model>> {
        Ok(transaction::Entity::find_by_id(id)
            .filter(transaction::Column::UserId.eq(owner_id))
            .one(self.db)
            .await?)
    }

    async fn check_input(&self, owner_id: i32, input: &TransactionInput) -> Result<()> {
        metrics::check_amount(input.amount)?;
        if !CategoryStore::new(self.db).can_access(input.category_id, owner_id).await? {
            warn!("Category {} not accessible to user {}", input.category_id, owner_id);
            return Err(ComputeError::InvalidReference(format!(
                "category {} is not accessible",
                input.category_id
            )));
        }
        Ok(())
    }
}

const LIKE_ESCAPE: char = '\\';

/// `%search%` with the user's `%`, `_` and escape characters taken literally.
fn like_pattern(search: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c.to_ascii_lowercase());
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape(LIKE_ESCAPE)
}
